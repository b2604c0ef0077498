use toml::Value;

use super::{Deserialized, OptionValue};
use crate::error::ValidationError;

/// A number within a range
///
/// `step` is how far one notch of the slider moves. Values are not forced onto
/// step multiples, stored values outside the range are clamped into it.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderOption {
    value: f64,
    default: f64,
    min: f64,
    max: f64,
    step: f64,
    is_integer: bool,
}

impl SliderOption {
    pub fn new(value: f64, min: f64, max: f64, step: f64) -> Self {
        Self {
            value,
            default: value,
            min,
            max,
            step,
            is_integer: true,
        }
    }

    pub fn non_integer(mut self) -> Self {
        self.is_integer = false;
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn default_value(&self) -> f64 {
        self.default
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn is_integer(&self) -> bool {
        self.is_integer
    }

    pub(crate) fn has_fractional_fields(&self) -> bool {
        self.is_integer
            && [self.value, self.min, self.max, self.step]
                .iter()
                .any(|x| x.fract() != 0.0)
    }

    fn normalize(&self, raw: f64) -> f64 {
        let clamped = raw.clamp(self.min, self.max);
        if self.is_integer {
            clamped.round()
        } else {
            clamped
        }
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Integer(i) => *i as f64,
        Value::Float(f) => *f,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (!number.is_nan()).then_some(number)
}

impl OptionValue for SliderOption {
    fn serialize(&self) -> Option<Value> {
        if self.is_integer {
            Some(Value::Integer(self.value.round() as i64))
        } else {
            Some(Value::Float(self.value))
        }
    }

    fn deserialize(&mut self, path: &str, value: &Value) -> Deserialized {
        match parse_number(value) {
            Some(raw) => {
                let new = self.normalize(raw);
                let changed = new != self.value;
                self.value = new;
                Deserialized::changed(changed)
            }
            None => Deserialized::rejected(path, value),
        }
    }

    fn validate(&self, identifier: &str) -> Result<(), ValidationError> {
        // Negated comparisons so NaN fails them too
        if !(self.min <= self.max) {
            return Err(ValidationError::SliderRange {
                option: identifier.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        if !(self.step > 0.0 && self.step <= self.max - self.min) {
            return Err(ValidationError::SliderStep {
                option: identifier.to_string(),
                step: self.step,
                min: self.min,
                max: self.max,
            });
        }
        if !(self.min..=self.max).contains(&self.default) {
            return Err(ValidationError::SliderDefault {
                option: identifier.to_string(),
                value: self.default,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.value = self.default;
    }
}
