//! Named, rebindable key bindings
//!
//! A keybind only tracks its own state. Actually listening for the key is the
//! job of the host's [`KeybindBackend`], which is told whenever a keybind is
//! enabled, disabled or rebound.

use std::fmt;
use std::sync::Arc;

use crate::host::KeybindBackend;
use crate::mod_def::{Mod, ModRef};

/// The kind of input event a key produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum_macros::Display)]
pub enum InputEvent {
    #[default]
    Pressed,
    Released,
    Repeat,
    DoubleClick,
    Axis,
}

impl InputEvent {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "pressed" | "press" => Some(Self::Pressed),
            "released" | "release" => Some(Self::Released),
            "repeat" => Some(Self::Repeat),
            "doubleclick" | "double_click" => Some(Self::DoubleClick),
            "axis" => Some(Self::Axis),
            _ => None,
        }
    }
}

/// Returned by keybind callbacks. `Block` asks the host not to pass the input
/// on to the game, if its backend supports that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeybindSignal {
    #[default]
    Continue,
    Block,
}

pub type KeybindCallback = Arc<dyn Fn(&Mod, InputEvent) -> KeybindSignal + Send + Sync>;

/// What happens when the key fires
#[derive(Clone)]
pub enum KeybindAction {
    Callback(KeybindCallback),
    /// Run one of the owning mod's commands with no arguments
    Command(String),
}

impl fmt::Debug for KeybindAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeybindAction::Callback(_) => f.write_str("Callback"),
            KeybindAction::Command(name) => f.debug_tuple("Command").field(name).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Keybind {
    identifier: String,
    key: Option<String>,
    default_key: Option<String>,
    is_enabled: bool,
    display_name: Option<String>,
    description: String,
    description_title: Option<String>,
    is_hidden: bool,
    is_rebindable: bool,
    event_filter: Option<InputEvent>,
    action: Option<KeybindAction>,
    owner: Option<ModRef>,
}

impl Keybind {
    pub fn new(identifier: impl Into<String>, key: Option<&str>) -> Self {
        let key = key.map(str::to_string);
        Self {
            identifier: identifier.into(),
            default_key: key.clone(),
            key,
            is_enabled: false,
            display_name: None,
            description: String::new(),
            description_title: None,
            is_hidden: false,
            is_rebindable: true,
            event_filter: Some(InputEvent::Pressed),
            action: None,
            owner: None,
        }
    }

    /// Run `callback` on presses (or whatever the event filter allows)
    pub fn on_press(mut self, callback: impl Fn(&Mod) -> KeybindSignal + Send + Sync + 'static) -> Self {
        self.action = Some(KeybindAction::Callback(Arc::new(move |m, _| callback(m))));
        self
    }

    /// Run `callback` on every event, clearing the event filter
    pub fn on_event(
        mut self,
        callback: impl Fn(&Mod, InputEvent) -> KeybindSignal + Send + Sync + 'static,
    ) -> Self {
        self.event_filter = None;
        self.action = Some(KeybindAction::Callback(Arc::new(callback)));
        self
    }

    /// Invoke the owning mod's command `name` when the key fires
    pub fn command(mut self, name: impl Into<String>) -> Self {
        self.action = Some(KeybindAction::Command(name.into()));
        self
    }

    pub fn event_filter(mut self, filter: Option<InputEvent>) -> Self {
        self.event_filter = filter;
        self
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

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }

    pub fn not_rebindable(mut self) -> Self {
        self.is_rebindable = false;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn default_key(&self) -> Option<&str> {
        self.default_key.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    pub fn is_rebindable(&self) -> bool {
        self.is_rebindable
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

    pub fn get_event_filter(&self) -> Option<InputEvent> {
        self.event_filter
    }

    pub fn action(&self) -> Option<&KeybindAction> {
        self.action.as_ref()
    }

    pub fn owner(&self) -> Option<Mod> {
        self.owner.as_ref().and_then(ModRef::upgrade)
    }

    /// Whether this keybind reacts to `event`
    pub fn accepts(&self, event: InputEvent) -> bool {
        self.event_filter.map_or(true, |filter| filter == event)
    }

    pub fn enable(&mut self, backend: &mut dyn KeybindBackend) {
        backend.enable(self);
        self.is_enabled = true;
    }

    pub fn disable(&mut self, backend: &mut dyn KeybindBackend) {
        backend.disable(self);
        self.is_enabled = false;
    }

    /// Change the bound key, letting the backend react first
    pub fn rebind(&mut self, new_key: Option<&str>, backend: &mut dyn KeybindBackend) {
        backend.rebind(self, new_key);
        self.set_key(new_key);
    }

    /// Change the key without involving a backend, used while loading settings
    pub(crate) fn set_key(&mut self, key: Option<&str>) {
        self.key = key.map(str::to_string);
    }

    pub(crate) fn attach(&mut self, owner: &ModRef) {
        debug_assert!(self.owner.is_none(), "keybind '{}' attached twice", self.identifier);
        self.owner = Some(owner.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingBackend {
        calls: Vec<String>,
    }

    impl KeybindBackend for RecordingBackend {
        fn enable(&mut self, keybind: &Keybind) {
            self.calls.push(format!("enable {}", keybind.identifier()));
        }

        fn disable(&mut self, keybind: &Keybind) {
            self.calls.push(format!("disable {}", keybind.identifier()));
        }

        fn rebind(&mut self, keybind: &Keybind, new_key: Option<&str>) {
            self.calls.push(format!(
                "rebind {} {:?} -> {:?}",
                keybind.identifier(),
                keybind.key(),
                new_key
            ));
        }
    }

    #[test]
    fn test_defaults() {
        let bind = Keybind::new("jump", Some("Space"));
        assert_eq!(bind.get_display_name(), "jump");
        assert_eq!(bind.get_event_filter(), Some(InputEvent::Pressed));
        assert!(bind.is_rebindable());
        assert!(!bind.is_enabled());
        assert!(bind.accepts(InputEvent::Pressed));
        assert!(!bind.accepts(InputEvent::Released));
    }

    #[test]
    fn test_on_event_accepts_everything() {
        let bind = Keybind::new("look", None).on_event(|_, _| KeybindSignal::Continue);
        assert!(bind.accepts(InputEvent::Axis));
        assert!(bind.accepts(InputEvent::Released));
    }

    #[test]
    fn test_backend_sees_old_key_on_rebind() {
        let mut backend = RecordingBackend::default();
        let mut bind = Keybind::new("jump", Some("Space"));

        bind.enable(&mut backend);
        bind.rebind(Some("J"), &mut backend);
        bind.disable(&mut backend);

        assert_eq!(bind.key(), Some("J"));
        assert_eq!(bind.default_key(), Some("Space"));
        assert!(!bind.is_enabled());
        assert_eq!(
            backend.calls,
            vec![
                "enable jump",
                "rebind jump Some(\"Space\") -> Some(\"J\")",
                "disable jump",
            ]
        );
    }
}
