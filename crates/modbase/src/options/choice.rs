use toml::Value;

use super::{Deserialized, OptionValue};
use crate::error::ValidationError;

/// The value and choice list shared by spinners and dropdowns
#[derive(Debug, Clone, PartialEq)]
struct Choices {
    value: String,
    default: String,
    choices: Vec<String>,
}

impl Choices {
    fn new<S: Into<String>>(value: impl Into<String>, choices: impl IntoIterator<Item = S>) -> Self {
        let value = value.into();
        Self {
            default: value.clone(),
            value,
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    fn deserialize(&mut self, path: &str, value: &Value) -> Deserialized {
        let candidate = match value {
            Value::String(s) => s.clone(),
            Value::Integer(_) | Value::Float(_) | Value::Boolean(_) => value.to_string(),
            _ => return Deserialized::rejected(path, value),
        };

        if !self.choices.contains(&candidate) {
            return Deserialized::rejected(path, value);
        }

        let changed = candidate != self.value;
        self.value = candidate;
        Deserialized::changed(changed)
    }

    fn validate(&self, identifier: &str) -> Result<(), ValidationError> {
        if self.choices.is_empty() {
            return Err(ValidationError::NoChoices {
                option: identifier.to_string(),
            });
        }
        if !self.choices.contains(&self.default) {
            return Err(ValidationError::DefaultNotAChoice {
                option: identifier.to_string(),
                value: self.default.clone(),
            });
        }
        Ok(())
    }

    fn position(&self) -> Option<usize> {
        self.choices.iter().position(|c| *c == self.value)
    }
}

/// Cycles through its choices with left and right
#[derive(Debug, Clone, PartialEq)]
pub struct SpinnerOption {
    inner: Choices,
    wrap_enabled: bool,
}

impl SpinnerOption {
    pub fn new<S: Into<String>>(value: impl Into<String>, choices: impl IntoIterator<Item = S>) -> Self {
        Self {
            inner: Choices::new(value, choices),
            wrap_enabled: false,
        }
    }

    /// Let the spinner go from the last choice back to the first
    pub fn wrap(mut self) -> Self {
        self.wrap_enabled = true;
        self
    }

    pub fn value(&self) -> &str {
        &self.inner.value
    }

    pub fn default_value(&self) -> &str {
        &self.inner.default
    }

    pub fn choices(&self) -> &[String] {
        &self.inner.choices
    }

    pub fn wrap_enabled(&self) -> bool {
        self.wrap_enabled
    }

    /// The choice `offset` steps away from the current one, respecting wrapping
    pub fn step(&self, offset: isize) -> Option<&str> {
        let len = self.inner.choices.len() as isize;
        let current = self.inner.position()? as isize;
        let target = current + offset;
        let target = if self.wrap_enabled {
            target.rem_euclid(len)
        } else {
            target.clamp(0, len - 1)
        };
        self.inner.choices.get(target as usize).map(String::as_str)
    }
}

impl OptionValue for SpinnerOption {
    fn serialize(&self) -> Option<Value> {
        Some(Value::String(self.inner.value.clone()))
    }

    fn deserialize(&mut self, path: &str, value: &Value) -> Deserialized {
        self.inner.deserialize(path, value)
    }

    fn validate(&self, identifier: &str) -> Result<(), ValidationError> {
        self.inner.validate(identifier)
    }

    fn reset(&mut self) {
        self.inner.value = self.inner.default.clone();
    }
}

/// Picks one choice from a list
#[derive(Debug, Clone, PartialEq)]
pub struct DropdownOption {
    inner: Choices,
}

impl DropdownOption {
    pub fn new<S: Into<String>>(value: impl Into<String>, choices: impl IntoIterator<Item = S>) -> Self {
        Self {
            inner: Choices::new(value, choices),
        }
    }

    pub fn value(&self) -> &str {
        &self.inner.value
    }

    pub fn default_value(&self) -> &str {
        &self.inner.default
    }

    pub fn choices(&self) -> &[String] {
        &self.inner.choices
    }
}

impl OptionValue for DropdownOption {
    fn serialize(&self) -> Option<Value> {
        Some(Value::String(self.inner.value.clone()))
    }

    fn deserialize(&mut self, path: &str, value: &Value) -> Deserialized {
        self.inner.deserialize(path, value)
    }

    fn validate(&self, identifier: &str) -> Result<(), ValidationError> {
        self.inner.validate(identifier)
    }

    fn reset(&mut self) {
        self.inner.value = self.inner.default.clone();
    }
}
