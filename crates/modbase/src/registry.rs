//! The list of registered mods and everything that acts on all of them

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::command::CommandError;
use crate::error::{BuildError, SettingsError};
use crate::factory::ModTemplate;
use crate::host::Host;
use crate::keybinds::{InputEvent, KeybindSignal};
use crate::mod_def::{Mod, ModType};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("no mod named '{0}' is registered")]
    UnknownMod(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

struct Entry {
    m: Mod,
    /// Set for mods built by the registry, which get rebuilt on reload
    template: Option<ModTemplate>,
    is_base: bool,
}

/// Owns the host interfaces and every registered mod
pub struct ModRegistry {
    host: Host,
    settings_dir: Option<PathBuf>,
    entries: Vec<Entry>,
}

impl ModRegistry {
    pub fn new(host: Host, settings_dir: Option<PathBuf>) -> Self {
        Self {
            host,
            settings_dir,
            entries: Vec::new(),
        }
    }

    pub fn host_mut(&mut self) -> &mut Host {
        &mut self.host
    }

    pub fn settings_dir(&self) -> Option<&Path> {
        self.settings_dir.as_deref()
    }

    /// Every registered mod, in registration order
    pub fn mods(&self) -> Vec<Mod> {
        self.entries.iter().map(|e| e.m.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Mod> {
        self.entries
            .iter()
            .find(|e| e.m.name() == name)
            .map(|e| e.m.clone())
    }

    pub fn base_mod(&self) -> Option<Mod> {
        self.entries.iter().find(|e| e.is_base).map(|e| e.m.clone())
    }

    /// Register the framework's own mod, always listed first
    pub fn register_base_mod(&mut self, m: Mod) {
        self.insert(m, None, true);
    }

    pub fn register_mod(&mut self, m: Mod) {
        self.insert(m, None, false);
    }

    /// Build a mod from `template`, register it and keep the template for reloads
    pub fn build_and_register(&mut self, template: ModTemplate) -> Result<Mod, RegistryError> {
        self.build_entry(template, false)
    }

    pub fn build_and_register_base(&mut self, template: ModTemplate) -> Result<Mod, RegistryError> {
        self.build_entry(template, true)
    }

    fn build_entry(&mut self, template: ModTemplate, is_base: bool) -> Result<Mod, RegistryError> {
        let m = template.build(self.settings_dir.as_deref(), self.host.hooks.as_mut())?;
        self.insert(m.clone(), Some(template), is_base);
        Ok(m)
    }

    fn insert(&mut self, m: Mod, template: Option<ModTemplate>, is_base: bool) {
        // A settings file belongs to one mod, so whoever used it before goes
        let stale = self
            .entries
            .iter()
            .filter(|e| {
                e.m.ptr_eq(&m)
                    || (m.settings_file().is_some() && e.m.settings_file() == m.settings_file())
                    || (is_base && e.is_base)
            })
            .map(|e| e.m.clone())
            .collect::<Vec<_>>();
        let mut reinserted = false;
        for old in stale {
            debug!(target: "registry", mod_name = %old.name(), "Replacing previously registered mod");
            reinserted |= old.ptr_eq(&m);
            self.deregister_mod(&old);
        }
        // Shutting the mod down dropped its bindings
        if reinserted {
            m.bind_hooks(self.host.hooks.as_mut());
        }

        info!(target: "registry", mod_name = %m.name(), "Registered mod");
        let auto_enable = m.should_auto_enable();
        self.entries.push(Entry {
            m: m.clone(),
            template,
            is_base,
        });

        if auto_enable {
            if let Err(e) = m.enable(&mut self.host) {
                warn!(target: "registry", mod_name = %m.name(), error = %e, "Failed to save settings while auto-enabling");
            }
        }
    }

    /// Remove a mod, stopping its hooks and keybinds. Its settings file is left
    /// as it was. Returns false if it was not registered.
    pub fn deregister_mod(&mut self, m: &Mod) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.m.ptr_eq(m)) else {
            return false;
        };
        let entry = self.entries.remove(pos);
        entry.m.shutdown(&mut self.host);
        info!(target: "registry", mod_name = %entry.m.name(), "Deregistered mod");
        true
    }

    /// Mods in menu order: the base mod, then standard mods by name, then
    /// libraries by name
    pub fn ordered_mods(&self) -> Vec<Mod> {
        let mut entries = self.entries.iter().collect::<Vec<_>>();
        entries.sort_by(|a, b| compare_entries(a, b));
        entries.into_iter().map(|e| e.m.clone()).collect()
    }

    fn find(&self, name: &str) -> Result<Mod, RegistryError> {
        self.get(name)
            .ok_or_else(|| RegistryError::UnknownMod(name.to_string()))
    }

    pub fn enable_mod(&mut self, name: &str) -> Result<(), RegistryError> {
        let m = self.find(name)?;
        m.enable(&mut self.host)?;
        Ok(())
    }

    pub fn disable_mod(&mut self, name: &str) -> Result<(), RegistryError> {
        let m = self.find(name)?;
        m.disable(&mut self.host)?;
        Ok(())
    }

    /// Run a console line against the enabled mods' commands
    ///
    /// The first word picks the command, by name or alias, searching mods in
    /// menu order. The rest of the line is the command's argument string.
    pub fn run_console_line(&self, line: &str) -> Result<(), CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        let (word, args) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));

        let owner = self
            .ordered_mods()
            .into_iter()
            .find(|m| m.is_enabled() && m.has_command(word))
            .ok_or_else(|| CommandError::Unknown(word.to_string()))?;
        owner.invoke_command(word, args)
    }

    /// Pass a key event to every enabled mod. Blocks if any keybind blocked.
    pub fn handle_key(&self, key: &str, event: InputEvent) -> KeybindSignal {
        let mut signal = KeybindSignal::Continue;
        for m in self.ordered_mods().iter().filter(|m| m.is_enabled()) {
            if m.handle_key(key, event) == KeybindSignal::Block {
                signal = KeybindSignal::Block;
            }
        }
        signal
    }

    /// Tear down and rebuild every mod the registry built itself
    ///
    /// Rebuilt mods reload their settings, so anything enabled before comes
    /// back enabled. Mods registered directly are kept and have their hooks
    /// rebound in place. A template that fails to build is dropped and its
    /// error returned.
    pub fn reload(&mut self) -> Vec<BuildError> {
        info!(target: "registry", "Reloading mods");

        let entries = std::mem::take(&mut self.entries);
        let mut rebuild = Vec::new();
        for entry in entries {
            match entry.template {
                Some(template) => {
                    entry.m.shutdown(&mut self.host);
                    rebuild.push((template, entry.is_base));
                }
                None => {
                    entry.m.bind_hooks(self.host.hooks.as_mut());
                    self.entries.push(entry);
                }
            }
        }

        let mut failures = Vec::new();
        for (template, is_base) in rebuild {
            match template.build(self.settings_dir.as_deref(), self.host.hooks.as_mut()) {
                Ok(m) => self.insert(m, Some(template), is_base),
                Err(e) => {
                    error!(target: "registry", error = %e, "Failed to rebuild mod during reload");
                    failures.push(e);
                }
            }
        }
        failures
    }

    /// Shut every mod down and forget them
    pub fn teardown(&mut self) {
        for entry in std::mem::take(&mut self.entries) {
            entry.m.shutdown(&mut self.host);
        }
        info!(target: "registry", "Registry torn down");
    }
}

fn compare_entries(a: &Entry, b: &Entry) -> Ordering {
    let rank = |e: &Entry| match (e.is_base, e.m.info().mod_type) {
        (true, _) => 0,
        (false, ModType::Standard) => 1,
        (false, ModType::Library) => 2,
    };
    rank(a)
        .cmp(&rank(b))
        .then_with(|| a.m.name().to_lowercase().cmp(&b.m.name().to_lowercase()))
        .then_with(|| a.m.name().cmp(b.m.name()))
}
