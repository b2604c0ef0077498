use std::fmt;

use toml::Value;

use super::{Deserialized, OnPress, OptionValue};
use crate::error::ValidationError;

/// A menu entry that runs a callback when pressed and stores nothing
#[derive(Clone, Default)]
pub struct ButtonOption {
    on_press: Option<OnPress>,
}

impl ButtonOption {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_on_press(&mut self, on_press: OnPress) {
        self.on_press = Some(on_press);
    }

    pub(crate) fn on_press(&self) -> Option<OnPress> {
        self.on_press.clone()
    }
}

impl fmt::Debug for ButtonOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonOption")
            .field("has_callback", &self.on_press.is_some())
            .finish()
    }
}

impl OptionValue for ButtonOption {
    fn serialize(&self) -> Option<Value> {
        None
    }

    fn deserialize(&mut self, _path: &str, _value: &Value) -> Deserialized {
        Deserialized::unchanged()
    }

    fn validate(&self, _identifier: &str) -> Result<(), ValidationError> {
        Ok(())
    }

    fn reset(&mut self) {}
}
