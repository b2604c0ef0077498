use toml::Value;

use super::{Deserialized, OptionValue};
use crate::error::ValidationError;

/// An on/off option
#[derive(Debug, Clone, PartialEq)]
pub struct BoolOption {
    value: bool,
    default: bool,
    true_text: Option<String>,
    false_text: Option<String>,
}

impl BoolOption {
    pub fn new(value: bool) -> Self {
        Self {
            value,
            default: value,
            true_text: None,
            false_text: None,
        }
    }

    /// Override the labels the menu shows for each state
    pub fn with_text(mut self, true_text: impl Into<String>, false_text: impl Into<String>) -> Self {
        self.true_text = Some(true_text.into());
        self.false_text = Some(false_text.into());
        self
    }

    pub fn value(&self) -> bool {
        self.value
    }

    pub fn default_value(&self) -> bool {
        self.default
    }

    pub fn true_text(&self) -> Option<&str> {
        self.true_text.as_deref()
    }

    pub fn false_text(&self) -> Option<&str> {
        self.false_text.as_deref()
    }
}

fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::Integer(i) => Some(*i != 0),
        Value::Float(f) => Some(*f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Some(true),
            "false" | "off" | "no" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

impl OptionValue for BoolOption {
    fn serialize(&self) -> Option<Value> {
        Some(Value::Boolean(self.value))
    }

    fn deserialize(&mut self, path: &str, value: &Value) -> Deserialized {
        match parse_bool(value) {
            Some(new) => {
                let changed = new != self.value;
                self.value = new;
                Deserialized::changed(changed)
            }
            None => Deserialized::rejected(path, value),
        }
    }

    fn validate(&self, _identifier: &str) -> Result<(), ValidationError> {
        Ok(())
    }

    fn reset(&mut self) {
        self.value = self.default;
    }
}
