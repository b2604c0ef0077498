use toml::Value;

use super::{Deserialized, OptionValue};
use crate::error::ValidationError;

/// Arbitrary persisted data that never appears in a menu
#[derive(Debug, Clone, PartialEq)]
pub struct HiddenOption {
    value: Value,
    default: Value,
}

impl HiddenOption {
    pub fn new(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            default: value.clone(),
            value,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl OptionValue for HiddenOption {
    fn serialize(&self) -> Option<Value> {
        Some(self.value.clone())
    }

    fn deserialize(&mut self, _path: &str, value: &Value) -> Deserialized {
        let changed = *value != self.value;
        self.value = value.clone();
        Deserialized::changed(changed)
    }

    fn validate(&self, _identifier: &str) -> Result<(), ValidationError> {
        Ok(())
    }

    fn reset(&mut self) {
        self.value = self.default.clone();
    }
}
