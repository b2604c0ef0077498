//! The live mod object
//!
//! A [`Mod`] is a cheap, clonable handle. Every component it owns holds a
//! [`ModRef`] back to it, set once while the mod is built.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use bitflags::bitflags;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::command::{Command, CommandError};
use crate::error::{ModError, SerializationWarning, SettingsError};
use crate::hook::{BoundHook, Hook, HookSlot};
use crate::host::{HookHandle, HookInstaller, Host, KeybindBackend};
use crate::keybinds::{InputEvent, Keybind, KeybindAction, KeybindSignal};
use crate::options::{self, ModOption, OptionKind};
use crate::settings;

/// Only affects where a mod is listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum_macros::Display)]
pub enum ModType {
    #[default]
    Standard,
    Library,
}

impl ModType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Standard" => Some(Self::Standard),
            "Library" => Some(Self::Library),
            _ => None,
        }
    }
}

bitflags! {
    /// The games a mod works with
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Game: u32 {
        const BL1 = 1 << 0;
        const BL2 = 1 << 1;
        const TPS = 1 << 2;
        const AODK = 1 << 3;
        const BL3 = 1 << 4;
        const WL = 1 << 5;

        const WILLOW1 = Self::BL1.bits();
        const WILLOW2 = Self::BL2.bits() | Self::TPS.bits() | Self::AODK.bits();
        const OAK = Self::BL3.bits() | Self::WL.bits();
    }
}

impl Default for Game {
    fn default() -> Self {
        Game::all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum_macros::Display)]
pub enum CoopSupport {
    #[default]
    Unknown,
    Incompatible,
    RequiresAllPlayers,
    ClientSide,
    HostOnly,
}

impl CoopSupport {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Unknown" => Some(Self::Unknown),
            "Incompatible" => Some(Self::Incompatible),
            "RequiresAllPlayers" => Some(Self::RequiresAllPlayers),
            "ClientSide" => Some(Self::ClientSide),
            "HostOnly" => Some(Self::HostOnly),
            _ => None,
        }
    }
}

/// Identity and metadata, fixed once a mod is built
#[derive(Debug, Clone, PartialEq)]
pub struct ModInfo {
    pub name: String,
    pub author: String,
    pub description: String,
    pub version: String,
    pub mod_type: ModType,
    pub supported_games: Game,
    pub coop_support: CoopSupport,
    /// Persist the enabled state and restore it on the next start
    pub auto_enable: bool,
    pub settings_file: Option<PathBuf>,
}

impl ModInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            author: "Unknown Author".to_string(),
            description: String::new(),
            version: "Unknown Version".to_string(),
            mod_type: ModType::default(),
            supported_games: Game::default(),
            coop_support: CoopSupport::default(),
            auto_enable: true,
            settings_file: None,
        }
    }
}

pub type LifecycleCallback = Arc<dyn Fn(&Mod) + Send + Sync>;

struct BoundEntry {
    hook: BoundHook,
    handle: Option<HookHandle>,
}

/// Mutable per-instance state, only touched under the mod's lock
pub(crate) struct ModState {
    pub(crate) enabled: bool,
    /// The enabled flag read from the settings file
    pub(crate) startup_enabled: bool,
    pub(crate) options: Vec<ModOption>,
    pub(crate) keybinds: Vec<Keybind>,
    pub(crate) commands: Vec<Command>,
    hooks: Vec<Hook>,
    bound: Vec<BoundEntry>,
}

struct ModInner {
    info: ModInfo,
    on_enable: Option<LifecycleCallback>,
    on_disable: Option<LifecycleCallback>,
    state: Mutex<ModState>,
}

#[derive(Clone)]
pub struct Mod {
    inner: Arc<ModInner>,
}

/// A non-owning reference to a [`Mod`], held by the mod's own components
#[derive(Clone)]
pub struct ModRef(Weak<ModInner>);

impl ModRef {
    pub fn upgrade(&self) -> Option<Mod> {
        self.0.upgrade().map(|inner| Mod { inner })
    }

    pub fn ptr_eq(&self, other: &ModRef) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ModRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(m) => write!(f, "ModRef({})", m.name()),
            None => f.write_str("ModRef(<dropped>)"),
        }
    }
}

/// Everything the build factory gathers for one instance
pub(crate) struct ModParts {
    pub info: ModInfo,
    pub on_enable: Option<LifecycleCallback>,
    pub on_disable: Option<LifecycleCallback>,
    pub options: Vec<ModOption>,
    pub keybinds: Vec<Keybind>,
    pub commands: Vec<Command>,
    pub hooks: Vec<Hook>,
}

impl Mod {
    /// Assemble a mod and point every component back at it
    pub(crate) fn from_parts(parts: ModParts) -> Self {
        let ModParts {
            info,
            on_enable,
            on_disable,
            mut options,
            mut keybinds,
            mut commands,
            hooks,
        } = parts;

        let inner = Arc::new_cyclic(|weak| {
            let owner = ModRef(weak.clone());
            options.iter_mut().for_each(|o| o.attach(&owner));
            keybinds.iter_mut().for_each(|k| k.attach(&owner));
            commands.iter_mut().for_each(|c| c.attach(&owner));

            ModInner {
                info,
                on_enable,
                on_disable,
                state: Mutex::new(ModState {
                    enabled: false,
                    startup_enabled: false,
                    options,
                    keybinds,
                    commands,
                    hooks,
                    bound: Vec::new(),
                }),
            }
        });
        Mod { inner }
    }

    pub fn downgrade(&self) -> ModRef {
        ModRef(Arc::downgrade(&self.inner))
    }

    /// Whether two handles point at the same mod
    pub fn ptr_eq(&self, other: &Mod) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn info(&self) -> &ModInfo {
        &self.inner.info
    }

    pub fn name(&self) -> &str {
        &self.inner.info.name
    }

    pub fn settings_file(&self) -> Option<&Path> {
        self.inner.info.settings_file.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    /// Whether the mod should be enabled as soon as it is registered
    pub fn should_auto_enable(&self) -> bool {
        self.inner.info.auto_enable && self.state().startup_enabled
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, ModState> {
        self.inner.state.lock()
    }

    // Options

    /// A snapshot of the mod's options
    pub fn options(&self) -> Vec<ModOption> {
        self.state().options.clone()
    }

    pub fn option(&self, path: &str) -> Option<ModOption> {
        options::find_option(&self.state().options, path).cloned()
    }

    pub fn option_value(&self, path: &str) -> Option<toml::Value> {
        options::find_option(&self.state().options, path)?.serialize()
    }

    pub fn bool_value(&self, path: &str) -> Option<bool> {
        match options::find_option(&self.state().options, path)?.kind() {
            OptionKind::Bool(b) => Some(b.value()),
            _ => None,
        }
    }

    pub fn number_value(&self, path: &str) -> Option<f64> {
        match options::find_option(&self.state().options, path)?.kind() {
            OptionKind::Slider(s) => Some(s.value()),
            _ => None,
        }
    }

    pub fn choice_value(&self, path: &str) -> Option<String> {
        match options::find_option(&self.state().options, path)?.kind() {
            OptionKind::Spinner(s) => Some(s.value().to_string()),
            OptionKind::Dropdown(d) => Some(d.value().to_string()),
            _ => None,
        }
    }

    /// Set an option from user input
    ///
    /// Invalid values are rejected and leave the option untouched. A change is
    /// saved before the option's change callback runs. Returns whether the
    /// value changed.
    pub fn set_option_value(&self, path: &str, value: impl Into<toml::Value>) -> Result<bool, ModError> {
        let value = value.into();

        let (callback, new_value) = {
            let mut state = self.state();
            let option = options::find_option_mut(&mut state.options, path).ok_or_else(|| {
                ModError::UnknownOption {
                    mod_name: self.name().to_string(),
                    path: path.to_string(),
                }
            })?;

            let mut result = option.deserialize(&value);
            if let Some(warning) = result.warnings.pop() {
                return Err(warning.into());
            }
            if !result.changed {
                return Ok(false);
            }
            (option.on_change_callback(), option.serialize())
        };

        let saved = self.save_settings();
        if let Err(e) = &saved {
            warn!(target: "settings", mod_name = %self.name(), error = %e, "Failed to save after option change");
        }
        if let (Some(callback), Some(new_value)) = (callback, new_value) {
            callback(self, &new_value);
        }
        saved?;
        Ok(true)
    }

    /// Restore every option to its default, then save
    pub fn reset_options(&self) -> Result<(), SettingsError> {
        let changed = {
            let mut state = self.state();
            state
                .options
                .iter_mut()
                .filter_map(|option| {
                    let before = option.serialize();
                    option.reset();
                    let after = option.serialize();
                    (before != after).then(|| (option.on_change_callback(), after))
                })
                .collect::<Vec<_>>()
        };

        let saved = self.save_settings();
        for (callback, value) in changed {
            if let (Some(callback), Some(value)) = (callback, value) {
                callback(self, &value);
            }
        }
        saved
    }

    pub fn press_button(&self, path: &str) -> Result<(), ModError> {
        let on_press = {
            let state = self.state();
            let option = options::find_option(&state.options, path).ok_or_else(|| {
                ModError::UnknownOption {
                    mod_name: self.name().to_string(),
                    path: path.to_string(),
                }
            })?;
            match option.kind() {
                OptionKind::Button(button) => button.on_press(),
                _ => {
                    return Err(ModError::NotAButton {
                        mod_name: self.name().to_string(),
                        path: path.to_string(),
                    })
                }
            }
        };

        if let Some(on_press) = on_press {
            on_press(self);
        }
        Ok(())
    }

    // Keybinds

    pub fn keybinds(&self) -> Vec<Keybind> {
        self.state().keybinds.clone()
    }

    pub fn keybind(&self, identifier: &str) -> Option<Keybind> {
        self.state()
            .keybinds
            .iter()
            .find(|k| k.identifier() == identifier)
            .cloned()
    }

    /// Change a keybind's key and save. Passing `None` unbinds it.
    pub fn rebind_keybind(
        &self,
        identifier: &str,
        new_key: Option<&str>,
        backend: &mut dyn KeybindBackend,
    ) -> Result<(), ModError> {
        {
            let mut state = self.state();
            let keybind = state
                .keybinds
                .iter_mut()
                .find(|k| k.identifier() == identifier)
                .ok_or_else(|| ModError::UnknownKeybind {
                    mod_name: self.name().to_string(),
                    identifier: identifier.to_string(),
                })?;
            keybind.rebind(new_key, backend);
        }
        self.save_settings()?;
        Ok(())
    }

    /// Identifiers of the enabled keybinds currently bound to `key`
    pub fn keybinds_for_key(&self, key: &str) -> Vec<String> {
        self.state()
            .keybinds
            .iter()
            .filter(|k| k.is_enabled() && k.key() == Some(key))
            .map(|k| k.identifier().to_string())
            .collect()
    }

    /// Run a keybind's action, if it is enabled and accepts `event`
    pub fn trigger_keybind(&self, identifier: &str, event: InputEvent) -> KeybindSignal {
        let action = {
            let state = self.state();
            state
                .keybinds
                .iter()
                .find(|k| k.identifier() == identifier && k.is_enabled() && k.accepts(event))
                .and_then(|k| k.action().cloned())
        };

        match action {
            Some(KeybindAction::Callback(callback)) => callback(self, event),
            Some(KeybindAction::Command(name)) => {
                if let Err(e) = self.invoke_command(&name, "") {
                    warn!(
                        target: "keybinds",
                        mod_name = %self.name(),
                        keybind = %identifier,
                        error = %e,
                        "Keybind command failed"
                    );
                }
                KeybindSignal::Continue
            }
            None => KeybindSignal::Continue,
        }
    }

    /// Trigger every enabled keybind on `key`. Blocks if any of them blocked.
    pub fn handle_key(&self, key: &str, event: InputEvent) -> KeybindSignal {
        let mut signal = KeybindSignal::Continue;
        for identifier in self.keybinds_for_key(key) {
            if self.trigger_keybind(&identifier, event) == KeybindSignal::Block {
                signal = KeybindSignal::Block;
            }
        }
        signal
    }

    // Commands

    pub fn commands(&self) -> Vec<Command> {
        self.state().commands.clone()
    }

    pub fn has_command(&self, word: &str) -> bool {
        self.state().commands.iter().any(|c| c.matches(word))
    }

    /// Run the command named (or aliased) `word` with an argument string
    pub fn invoke_command(&self, word: &str, raw_args: &str) -> Result<(), CommandError> {
        let command = self
            .state()
            .commands
            .iter()
            .find(|c| c.matches(word))
            .cloned()
            .ok_or_else(|| CommandError::Unknown(word.to_string()))?;
        command.invoke(self, raw_args)
    }

    // Hooks

    /// Bind every declared hook to this mod
    ///
    /// An existing binding with the same identifier is replaced: the old
    /// callback is deactivated and uninstalled first. If the mod is enabled
    /// the new callbacks are installed straight away.
    pub fn bind_hooks(&self, installer: &mut dyn HookInstaller) {
        let mut state = self.state();
        let enabled = state.enabled;
        let fresh = state
            .hooks
            .iter()
            .map(|hook| hook.bind(self))
            .collect::<Vec<_>>();

        for hook in fresh {
            if let Some(pos) = state
                .bound
                .iter()
                .position(|e| e.hook.identifier() == hook.identifier())
            {
                let old = state.bound.remove(pos);
                old.hook.deactivate();
                if let Some(handle) = old.handle {
                    installer.uninstall(handle);
                }
                debug!(target: "hooks", mod_name = %self.name(), hook = %hook.identifier(), "Rebinding hook");
            }

            let handle = enabled.then(|| {
                hook.activate();
                installer.install(hook.event(), hook.slot(), hook.callback())
            });
            state.bound.push(BoundEntry { hook, handle });
        }
    }

    /// Deactivate, uninstall and forget every bound hook
    pub fn unbind_hooks(&self, installer: &mut dyn HookInstaller) {
        let mut state = self.state();
        for entry in state.bound.drain(..) {
            entry.hook.deactivate();
            if let Some(handle) = entry.handle {
                installer.uninstall(handle);
            }
        }
    }

    /// Identifier, slot and active flag of every bound hook
    pub fn bound_hooks(&self) -> Vec<(String, HookSlot, bool)> {
        self.state()
            .bound
            .iter()
            .map(|e| (e.hook.identifier().to_string(), e.hook.slot(), e.hook.is_active()))
            .collect()
    }

    // Lifecycle

    /// Install hooks, enable keybinds, run the enable callback and save
    pub fn enable(&self, host: &mut Host) -> Result<(), SettingsError> {
        {
            let mut state = self.state();
            if state.enabled {
                return Ok(());
            }
            state.enabled = true;

            for entry in state.bound.iter_mut() {
                entry.hook.activate();
                entry.handle = Some(host.hooks.install(
                    entry.hook.event(),
                    entry.hook.slot(),
                    entry.hook.callback(),
                ));
            }
            for keybind in state.keybinds.iter_mut() {
                keybind.enable(host.keybinds.as_mut());
            }
        }

        info!(target: "registry", mod_name = %self.name(), "Enabled mod");
        if let Some(on_enable) = &self.inner.on_enable {
            on_enable(self);
        }
        self.save_settings()
    }

    /// Stop every hook and keybind before returning, then run the disable
    /// callback and save
    pub fn disable(&self, host: &mut Host) -> Result<(), SettingsError> {
        if !self.stop(host) {
            return Ok(());
        }
        info!(target: "registry", mod_name = %self.name(), "Disabled mod");
        if let Some(on_disable) = &self.inner.on_disable {
            on_disable(self);
        }
        self.save_settings()
    }

    /// Take the mod out of the host for good, without touching its settings
    ///
    /// Used when a mod is deregistered or replaced by a reload, where the
    /// saved enabled flag must survive for the next instance.
    pub(crate) fn shutdown(&self, host: &mut Host) {
        if self.stop(host) {
            if let Some(on_disable) = &self.inner.on_disable {
                on_disable(self);
            }
        }
        self.unbind_hooks(host.hooks.as_mut());
        debug!(target: "registry", mod_name = %self.name(), "Shut down mod");
    }

    /// Deactivate and uninstall hooks and disable keybinds. Returns false if
    /// the mod was not enabled.
    fn stop(&self, host: &mut Host) -> bool {
        let mut state = self.state();
        if !state.enabled {
            return false;
        }
        state.enabled = false;

        for entry in state.bound.iter_mut() {
            entry.hook.deactivate();
            if let Some(handle) = entry.handle.take() {
                host.hooks.uninstall(handle);
            }
        }
        for keybind in state.keybinds.iter_mut() {
            keybind.disable(host.keybinds.as_mut());
        }
        true
    }

    // Settings

    pub fn save_settings(&self) -> Result<(), SettingsError> {
        settings::save(self)
    }

    /// Reload options, keybind keys and the enabled flag from disk
    pub fn load_settings(&self) -> Vec<SerializationWarning> {
        settings::load(self)
    }
}

impl fmt::Debug for Mod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mod")
            .field("name", &self.name())
            .field("version", &self.inner.info.version)
            .finish_non_exhaustive()
    }
}
