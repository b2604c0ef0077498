use std::path::PathBuf;

use thiserror::Error;

/// The kinds of component a mod can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ComponentKind {
    Option,
    Keybind,
    Command,
    Hook,
}

/// A component was declared with settings that can never work
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("slider option '{option}' has a step of {step}, which must be positive and fit its range {min}..={max}")]
    SliderStep {
        option: String,
        step: f64,
        min: f64,
        max: f64,
    },

    #[error("slider option '{option}' has a minimum of {min} above its maximum of {max}")]
    SliderRange { option: String, min: f64, max: f64 },

    #[error("slider option '{option}' defaults to {value}, outside its range {min}..={max}")]
    SliderDefault {
        option: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("option '{option}' has no choices")]
    NoChoices { option: String },

    #[error("option '{option}' defaults to '{value}', which is not one of its choices")]
    DefaultNotAChoice { option: String, value: String },

    #[error("command name '{command}' is empty or contains whitespace")]
    CommandName { command: String },
}

/// Two components of the same kind share a name within one mod
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mod '{mod_name}' declares {kind} '{name}' more than once")]
pub struct DuplicateNameError {
    pub mod_name: String,
    pub kind: ComponentKind,
    pub name: String,
}

/// Errors that abort building (and therefore registering) a mod
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("mod template has no name")]
    MissingName,

    #[error("mod '{mod_name}': {source}")]
    Validation {
        mod_name: String,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    DuplicateName(#[from] DuplicateNameError),
}

/// A stored value could not be applied to an option
///
/// Never fatal: the option keeps (or falls back to) its default and the rest
/// of the mod keeps working.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid value for option '{option}'")]
pub struct SerializationWarning {
    /// Dotted path of the option, e.g. `hud.clock_format`
    pub option: String,
    /// The rejected value, rendered as TOML
    pub value: String,
}

impl SerializationWarning {
    pub fn new(option: impl Into<String>, value: &toml::Value) -> Self {
        Self {
            option: option.into(),
            value: value.to_string(),
        }
    }
}

/// Failure writing a settings record to disk
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to write settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode settings for {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },
}

/// Errors from operating on a live mod
#[derive(Debug, Error)]
pub enum ModError {
    #[error("mod '{mod_name}' has no option '{path}'")]
    UnknownOption { mod_name: String, path: String },

    #[error("mod '{mod_name}' has no keybind '{identifier}'")]
    UnknownKeybind {
        mod_name: String,
        identifier: String,
    },

    #[error("option '{path}' on mod '{mod_name}' is not a button")]
    NotAButton { mod_name: String, path: String },

    #[error(transparent)]
    InvalidValue(#[from] SerializationWarning),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
