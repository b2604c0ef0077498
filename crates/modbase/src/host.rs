//! Interfaces the host process implements for the framework

use tracing::error;

use crate::hook::{HookCallback, HookSlot};
use crate::keybinds::Keybind;

/// Identifies one installed hook callback so it can be removed again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(u64);

impl HookHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Attaches bound hook callbacks to the host's events
pub trait HookInstaller: Send {
    fn install(&mut self, event: &str, slot: HookSlot, callback: HookCallback) -> HookHandle;

    /// Remove a previously installed callback. Unknown handles are ignored.
    fn uninstall(&mut self, handle: HookHandle);
}

/// Wires keybinds into the host's input handling
///
/// The framework tracks keybind state itself and only calls these to let the
/// host react.
pub trait KeybindBackend: Send {
    fn enable(&mut self, keybind: &Keybind);

    fn disable(&mut self, keybind: &Keybind);

    /// Called before the keybind's key changes
    fn rebind(&mut self, _keybind: &Keybind, _new_key: Option<&str>) {}
}

/// Used when the host has not provided a keybind implementation
#[derive(Debug, Default)]
pub struct NoKeybindBackend;

impl KeybindBackend for NoKeybindBackend {
    fn enable(&mut self, keybind: &Keybind) {
        error!(
            target: "keybinds",
            keybind = %keybind.identifier(),
            "No keybind implementation loaded, unable to enable binds"
        );
    }

    fn disable(&mut self, keybind: &Keybind) {
        error!(
            target: "keybinds",
            keybind = %keybind.identifier(),
            "No keybind implementation loaded, unable to disable binds"
        );
    }
}

/// Everything the host supplies, passed explicitly to operations that need it
pub struct Host {
    pub hooks: Box<dyn HookInstaller>,
    pub keybinds: Box<dyn KeybindBackend>,
}

impl Host {
    pub fn new(hooks: impl HookInstaller + 'static, keybinds: impl KeybindBackend + 'static) -> Self {
        Self {
            hooks: Box::new(hooks),
            keybinds: Box::new(keybinds),
        }
    }
}

impl Default for Host {
    /// An in-process dispatcher and no keybind backend
    fn default() -> Self {
        Self::new(crate::hook::HookDispatcher::new(), NoKeybindBackend)
    }
}
