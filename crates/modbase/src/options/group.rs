use toml::Value;
use tracing::debug;

use super::{Deserialized, ModOption, OptionValue};
use crate::error::ValidationError;

/// A set of child options, persisted as a table keyed by child identifier
#[derive(Debug, Clone)]
pub struct GroupOption {
    children: Vec<ModOption>,
}

impl GroupOption {
    pub fn new(children: Vec<ModOption>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[ModOption] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [ModOption] {
        &mut self.children
    }

    /// Apply a stored table. Children missing from it keep their values, keys
    /// with no matching child are ignored.
    ///
    /// When not `tolerant`, a single rejected child rejects the whole table and
    /// no child changes.
    pub(crate) fn merge(&mut self, path: &str, value: &Value, tolerant: bool) -> Deserialized {
        let Value::Table(table) = value else {
            return Deserialized::rejected(path, value);
        };

        let mut staged = self.children.clone();
        let mut result = Deserialized::unchanged();
        for (key, child_value) in table {
            match staged.iter_mut().find(|c| c.identifier() == key) {
                Some(child) => result.merge(child.deserialize_at(Some(path), child_value, tolerant)),
                None => debug!(
                    target: "options",
                    group = %path,
                    key = %key,
                    "Ignoring stored value with no matching option"
                ),
            }
        }

        if !tolerant && !result.warnings.is_empty() {
            result.changed = false;
            return result;
        }
        self.children = staged;
        result
    }
}

impl OptionValue for GroupOption {
    fn serialize(&self) -> Option<Value> {
        let table = self
            .children
            .iter()
            .filter_map(|child| Some((child.identifier().to_string(), child.serialize()?)))
            .collect::<toml::Table>();
        Some(Value::Table(table))
    }

    fn deserialize(&mut self, path: &str, value: &Value) -> Deserialized {
        self.merge(path, value, false)
    }

    fn validate(&self, _identifier: &str) -> Result<(), ValidationError> {
        self.children.iter().try_for_each(ModOption::validate)
    }

    fn reset(&mut self) {
        self.children.iter_mut().for_each(ModOption::reset);
    }
}
