//! Typed, persisted, user-configurable values owned by a mod
//!
//! Every variant implements [`OptionValue`], which is the one contract the
//! settings layer relies on: turn the current value into TOML, take a TOML
//! value back, check the declaration makes sense, and reset to the default.
//! [`ModOption`] wraps a variant with the display metadata every option shares.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{SerializationWarning, ValidationError};
use crate::mod_def::{Mod, ModRef};

mod button;
mod choice;
mod group;
mod hidden;
mod slider;
mod toggle;

pub use button::ButtonOption;
pub use choice::{DropdownOption, SpinnerOption};
pub use group::GroupOption;
pub use hidden::HiddenOption;
pub use slider::SliderOption;
pub use toggle::BoolOption;

/// Called after an option's value changed through [`Mod::set_option_value`]
pub type OnChange = Arc<dyn Fn(&Mod, &toml::Value) + Send + Sync>;

/// Called when a button option is pressed
pub type OnPress = Arc<dyn Fn(&Mod) + Send + Sync>;

/// Result of applying a stored value to an option
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deserialized {
    pub changed: bool,
    pub warnings: Vec<SerializationWarning>,
}

impl Deserialized {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn changed(changed: bool) -> Self {
        Self {
            changed,
            warnings: Vec::new(),
        }
    }

    pub fn rejected(path: &str, value: &toml::Value) -> Self {
        Self {
            changed: false,
            warnings: vec![SerializationWarning::new(path, value)],
        }
    }

    pub fn merge(&mut self, other: Deserialized) {
        self.changed |= other.changed;
        self.warnings.extend(other.warnings);
    }
}

/// Contract shared by every option variant
pub trait OptionValue {
    /// The value to persist, or `None` if this option has nothing to store
    fn serialize(&self) -> Option<toml::Value>;

    /// Apply a stored value. Invalid input leaves the value untouched and is
    /// reported as a warning.
    fn deserialize(&mut self, path: &str, value: &toml::Value) -> Deserialized;

    /// Check the declaration itself, independent of the current value
    fn validate(&self, identifier: &str) -> Result<(), ValidationError>;

    /// Restore the declared default
    fn reset(&mut self);
}

#[derive(Debug, Clone)]
pub enum OptionKind {
    Bool(BoolOption),
    Slider(SliderOption),
    Spinner(SpinnerOption),
    Dropdown(DropdownOption),
    /// Children shown inline under a title
    Group(GroupOption),
    /// Children shown in their own submenu
    Nested(GroupOption),
    Hidden(HiddenOption),
    Button(ButtonOption),
}

impl OptionKind {
    fn value(&self) -> &dyn OptionValue {
        match self {
            OptionKind::Bool(o) => o,
            OptionKind::Slider(o) => o,
            OptionKind::Spinner(o) => o,
            OptionKind::Dropdown(o) => o,
            OptionKind::Group(o) | OptionKind::Nested(o) => o,
            OptionKind::Hidden(o) => o,
            OptionKind::Button(o) => o,
        }
    }

    fn value_mut(&mut self) -> &mut dyn OptionValue {
        match self {
            OptionKind::Bool(o) => o,
            OptionKind::Slider(o) => o,
            OptionKind::Spinner(o) => o,
            OptionKind::Dropdown(o) => o,
            OptionKind::Group(o) | OptionKind::Nested(o) => o,
            OptionKind::Hidden(o) => o,
            OptionKind::Button(o) => o,
        }
    }

    fn group(&self) -> Option<&GroupOption> {
        match self {
            OptionKind::Group(g) | OptionKind::Nested(g) => Some(g),
            _ => None,
        }
    }

    fn group_mut(&mut self) -> Option<&mut GroupOption> {
        match self {
            OptionKind::Group(g) | OptionKind::Nested(g) => Some(g),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct ModOption {
    identifier: String,
    display_name: Option<String>,
    description: String,
    description_title: Option<String>,
    is_hidden: bool,
    on_change: Option<OnChange>,
    owner: Option<ModRef>,
    kind: OptionKind,
}

impl ModOption {
    pub fn new(identifier: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: None,
            description: String::new(),
            description_title: None,
            is_hidden: false,
            on_change: None,
            owner: None,
            kind,
        }
    }

    pub fn bool(identifier: impl Into<String>, value: bool) -> Self {
        Self::new(identifier, OptionKind::Bool(BoolOption::new(value)))
    }

    /// An integer slider. Fails unless `step` is positive and no wider than
    /// the range, and `value` lies within it.
    #[track_caller]
    pub fn slider(
        identifier: impl Into<String>,
        value: f64,
        min: f64,
        max: f64,
        step: f64,
    ) -> Result<Self, ValidationError> {
        Self::new_slider(identifier.into(), SliderOption::new(value, min, max, step))
    }

    /// A slider whose value is not rounded to whole numbers
    #[track_caller]
    pub fn float_slider(
        identifier: impl Into<String>,
        value: f64,
        min: f64,
        max: f64,
        step: f64,
    ) -> Result<Self, ValidationError> {
        Self::new_slider(
            identifier.into(),
            SliderOption::new(value, min, max, step).non_integer(),
        )
    }

    #[track_caller]
    fn new_slider(identifier: String, slider: SliderOption) -> Result<Self, ValidationError> {
        slider.validate(&identifier)?;
        if slider.has_fractional_fields() {
            let caller = std::panic::Location::caller();
            warn!(
                target: "options",
                option = %identifier,
                declared_at = %caller,
                "Slider has non-integer fields despite being an integer slider, values will be rounded"
            );
        }
        Ok(Self::new(identifier, OptionKind::Slider(slider)))
    }

    pub fn spinner<S: Into<String>>(
        identifier: impl Into<String>,
        value: impl Into<String>,
        choices: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            identifier,
            OptionKind::Spinner(SpinnerOption::new(value, choices)),
        )
    }

    pub fn dropdown<S: Into<String>>(
        identifier: impl Into<String>,
        value: impl Into<String>,
        choices: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            identifier,
            OptionKind::Dropdown(DropdownOption::new(value, choices)),
        )
    }

    pub fn group(identifier: impl Into<String>, children: Vec<ModOption>) -> Self {
        Self::new(identifier, OptionKind::Group(GroupOption::new(children)))
    }

    pub fn nested(identifier: impl Into<String>, children: Vec<ModOption>) -> Self {
        Self::new(identifier, OptionKind::Nested(GroupOption::new(children)))
    }

    /// A value that is persisted but never shown, for mods to store their own data
    pub fn hidden(identifier: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        let mut option = Self::new(identifier, OptionKind::Hidden(HiddenOption::new(value)));
        option.is_hidden = true;
        option
    }

    pub fn button(identifier: impl Into<String>) -> Self {
        Self::new(identifier, OptionKind::Button(ButtonOption::new()))
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn description_title(mut self, title: impl Into<String>) -> Self {
        self.description_title = Some(title.into());
        self
    }

    pub fn hide(mut self) -> Self {
        self.is_hidden = true;
        self
    }

    #[track_caller]
    pub fn on_change(mut self, callback: impl Fn(&Mod, &toml::Value) + Send + Sync + 'static) -> Self {
        if self.on_change.is_some() {
            let caller = std::panic::Location::caller();
            warn!(
                target: "options",
                option = %self.identifier,
                declared_at = %caller,
                "Replacing an existing on change callback"
            );
        }
        self.on_change = Some(Arc::new(callback));
        self
    }

    /// Set the press callback of a button option. Ignored for other kinds.
    #[track_caller]
    pub fn on_press(mut self, callback: impl Fn(&Mod) + Send + Sync + 'static) -> Self {
        match &mut self.kind {
            OptionKind::Button(button) => button.set_on_press(Arc::new(callback)),
            _ => {
                let caller = std::panic::Location::caller();
                warn!(
                    target: "options",
                    option = %self.identifier,
                    declared_at = %caller,
                    "on_press set on an option which is not a button"
                );
            }
        }
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn get_display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.identifier)
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }

    pub fn get_description_title(&self) -> &str {
        self.description_title
            .as_deref()
            .unwrap_or_else(|| self.get_display_name())
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    pub fn kind(&self) -> &OptionKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut OptionKind {
        &mut self.kind
    }

    /// The mod this option belongs to, once it has been built into one
    pub fn owner(&self) -> Option<Mod> {
        self.owner.as_ref().and_then(ModRef::upgrade)
    }

    pub fn children(&self) -> &[ModOption] {
        self.kind.group().map(GroupOption::children).unwrap_or(&[])
    }

    pub(crate) fn on_change_callback(&self) -> Option<OnChange> {
        self.on_change.clone()
    }

    pub fn serialize(&self) -> Option<toml::Value> {
        self.kind.value().serialize()
    }

    /// Strictly apply a value: invalid input is rejected and nothing changes
    pub fn deserialize(&mut self, value: &toml::Value) -> Deserialized {
        self.deserialize_at(None, value, false)
    }

    /// Apply a stored value, tolerating format drift: invalid input falls back
    /// to the default, groups ignore unknown keys and keep missing ones.
    pub fn load(&mut self, value: &toml::Value) -> Deserialized {
        self.deserialize_at(None, value, true)
    }

    pub(crate) fn deserialize_at(
        &mut self,
        parent: Option<&str>,
        value: &toml::Value,
        tolerant: bool,
    ) -> Deserialized {
        let path = match parent {
            Some(parent) => format!("{}.{}", parent, self.identifier),
            None => self.identifier.clone(),
        };

        if let Some(group) = self.kind.group_mut() {
            return group.merge(&path, value, tolerant);
        }

        let mut result = self.kind.value_mut().deserialize(&path, value);
        if tolerant && !result.warnings.is_empty() {
            let before = self.serialize();
            self.kind.value_mut().reset();
            result.changed |= self.serialize() != before;
            debug!(target: "options", option = %path, "Falling back to the default value");
        }
        result
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.kind.value().validate(&self.identifier)
    }

    pub fn reset(&mut self) {
        self.kind.value_mut().reset();
    }

    /// Set the owning mod on this option and every descendant
    pub(crate) fn attach(&mut self, owner: &ModRef) {
        debug_assert!(
            self.owner.is_none(),
            "option '{}' attached to a mod twice",
            self.identifier
        );
        self.owner = Some(owner.clone());
        if let Some(group) = self.kind.group_mut() {
            for child in group.children_mut() {
                child.attach(owner);
            }
        }
    }

    /// Look up a descendant by dotted path, starting with this option's identifier
    pub(crate) fn find(&self, path: &[&str]) -> Option<&ModOption> {
        match path {
            [] => None,
            [head] => (*head == self.identifier).then_some(self),
            [head, rest @ ..] if *head == self.identifier => self
                .children()
                .iter()
                .find_map(|child| child.find(rest)),
            _ => None,
        }
    }

    pub(crate) fn find_mut(&mut self, path: &[&str]) -> Option<&mut ModOption> {
        match path {
            [] => None,
            [head] => (*head == self.identifier).then_some(self),
            [head, rest @ ..] if *head == self.identifier => self
                .kind
                .group_mut()?
                .children_mut()
                .iter_mut()
                .find_map(|child| child.find_mut(rest)),
            _ => None,
        }
    }
}

impl fmt::Debug for ModOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModOption")
            .field("identifier", &self.identifier)
            .field("is_hidden", &self.is_hidden)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Find an option by dotted path (`group.child`) within a list of options
pub(crate) fn find_option<'a>(options: &'a [ModOption], path: &str) -> Option<&'a ModOption> {
    let parts: Vec<&str> = path.split('.').collect();
    options.iter().find_map(|option| option.find(&parts))
}

pub(crate) fn find_option_mut<'a>(
    options: &'a mut [ModOption],
    path: &str,
) -> Option<&'a mut ModOption> {
    let parts: Vec<&str> = path.split('.').collect();
    options.iter_mut().find_map(|option| option.find_mut(&parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ModOption> {
        vec![
            ModOption::bool("enabled_thing", false),
            ModOption::group(
                "hud",
                vec![
                    ModOption::bool("show_clock", true),
                    ModOption::nested(
                        "clock",
                        vec![ModOption::dropdown("format", "24h", ["12h", "24h"])],
                    ),
                ],
            ),
        ]
    }

    #[test]
    fn test_find_by_dotted_path() {
        let options = sample();
        assert!(find_option(&options, "enabled_thing").is_some());
        assert!(find_option(&options, "hud.show_clock").is_some());
        assert!(find_option(&options, "hud.clock.format").is_some());
        assert!(find_option(&options, "hud.missing").is_none());
        assert!(find_option(&options, "show_clock").is_none());
    }

    #[test]
    fn test_display_metadata_defaults() {
        let option = ModOption::bool("skip_intro", false);
        assert_eq!(option.get_display_name(), "skip_intro");
        assert_eq!(option.get_description_title(), "skip_intro");

        let option = option.display_name("Skip Intro");
        assert_eq!(option.get_description_title(), "Skip Intro");

        let option = option.description_title("About");
        assert_eq!(option.get_description_title(), "About");
    }

    #[test]
    fn test_load_falls_back_to_default() {
        let mut option = ModOption::spinner("difficulty", "Normal", ["Easy", "Normal", "Hard"]);
        option.deserialize(&toml::Value::String("Hard".into()));

        let result = option.load(&toml::Value::String("Nightmare".into()));
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].option, "difficulty");
        assert!(result.changed);
        assert_eq!(option.serialize(), Some(toml::Value::String("Normal".into())));
    }

    #[test]
    fn test_strict_deserialize_keeps_value() {
        let mut option = ModOption::spinner("difficulty", "Normal", ["Easy", "Normal", "Hard"]);
        option.deserialize(&toml::Value::String("Hard".into()));

        let result = option.deserialize(&toml::Value::String("Nightmare".into()));
        assert_eq!(result.warnings.len(), 1);
        assert!(!result.changed);
        assert_eq!(option.serialize(), Some(toml::Value::String("Hard".into())));
    }

    #[test]
    fn test_nested_warning_paths() {
        let mut options = sample();
        let hud = &mut options[1];
        let value: toml::Value = toml::from_str::<toml::Table>(
            r#"
            show_clock = false
            [clock]
            format = "36h"
            "#,
        )
        .unwrap()
        .into();

        let result = hud.load(&value);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].option, "hud.clock.format");
        assert!(result.changed);
    }

    #[test]
    fn test_hidden_option_is_hidden() {
        assert!(ModOption::hidden("launches", 0).is_hidden());
        assert!(!ModOption::bool("visible", true).is_hidden());
    }
}
