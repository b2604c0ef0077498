//! Per-mod settings files
//!
//! Each mod with a settings file gets one TOML document:
//!
//! ```toml
//! enabled = true
//!
//! [options]
//! skip_intro = true
//!
//! [options.hud]
//! scale = 5
//!
//! [keybinds]
//! jump = "Space"
//! ```
//!
//! `enabled` is only written for mods with `auto_enable`, and an empty string
//! in `[keybinds]` means the key was explicitly unbound. Reading is tolerant:
//! anything missing keeps its current value and anything invalid is logged
//! and replaced by the default.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{SerializationWarning, SettingsError};
use crate::mod_def::Mod;

/// The on-disk shape of one mod's settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsRecord {
    pub enabled: Option<bool>,
    pub options: toml::Table,
    /// Empty string for an unbound key
    pub keybinds: BTreeMap<String, String>,
}

impl SettingsRecord {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.options.is_empty() && self.keybinds.is_empty()
    }

    /// Pull whatever is usable out of a parsed document
    pub fn from_table(mut table: toml::Table, path: &Path) -> Self {
        let enabled = match table.remove("enabled") {
            Some(toml::Value::Boolean(b)) => Some(b),
            Some(other) => {
                warn!(target: "settings", path = %path.display(), value = %other, "Ignoring non-boolean enabled flag");
                None
            }
            None => None,
        };

        let options = match table.remove("options") {
            Some(toml::Value::Table(t)) => t,
            Some(_) => {
                warn!(target: "settings", path = %path.display(), "Ignoring options entry which is not a table");
                toml::Table::new()
            }
            None => toml::Table::new(),
        };

        let keybinds = match table.remove("keybinds") {
            Some(toml::Value::Table(t)) => t
                .into_iter()
                .filter_map(|(identifier, key)| match key {
                    toml::Value::String(key) => Some((identifier, key)),
                    other => {
                        warn!(
                            target: "settings",
                            path = %path.display(),
                            keybind = %identifier,
                            value = %other,
                            "Ignoring keybind which is not a string"
                        );
                        None
                    }
                })
                .collect(),
            Some(_) => {
                warn!(target: "settings", path = %path.display(), "Ignoring keybinds entry which is not a table");
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        };

        Self {
            enabled,
            options,
            keybinds,
        }
    }

    pub fn to_table(&self) -> toml::Table {
        let mut table = toml::Table::new();
        if let Some(enabled) = self.enabled {
            table.insert("enabled".into(), toml::Value::Boolean(enabled));
        }
        if !self.options.is_empty() {
            table.insert("options".into(), toml::Value::Table(self.options.clone()));
        }
        if !self.keybinds.is_empty() {
            let keybinds = self
                .keybinds
                .iter()
                .map(|(k, v)| (k.clone(), toml::Value::String(v.clone())))
                .collect();
            table.insert("keybinds".into(), toml::Value::Table(keybinds));
        }
        table
    }

    /// Read a settings file. A missing or unparsable file reads as empty.
    pub fn read(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(target: "settings", path = %path.display(), "No settings file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(target: "settings", path = %path.display(), error = %e, "Failed to read settings file, using defaults");
                return Self::default();
            }
        };

        match toml::from_str::<toml::Table>(&contents) {
            Ok(table) => Self::from_table(table, path),
            Err(e) => {
                warn!(target: "settings", path = %path.display(), error = %e, "Failed to parse settings file, using defaults");
                Self::default()
            }
        }
    }

    /// Replace the file at `path` with this record, or delete it if empty
    ///
    /// The new contents go to a temporary file in the same directory which is
    /// then renamed over the old one, so readers only ever see a whole file.
    pub fn write(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source: std::io::Error| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        if self.is_empty() {
            return match std::fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_err(e)),
            };
        }

        let contents = toml::to_string_pretty(&self.to_table()).map_err(|source| SettingsError::Encode {
            path: path.to_path_buf(),
            source,
        })?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(contents.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

/// Build the record describing a mod's current state
pub fn record_for(m: &Mod) -> SettingsRecord {
    let state = m.state();

    let options = state
        .options
        .iter()
        .filter_map(|o| Some((o.identifier().to_string(), o.serialize()?)))
        .collect();

    let keybinds = state
        .keybinds
        .iter()
        .filter(|k| k.is_rebindable())
        .map(|k| (k.identifier().to_string(), k.key().unwrap_or_default().to_string()))
        .collect();

    SettingsRecord {
        enabled: m.info().auto_enable.then_some(state.enabled),
        options,
        keybinds,
    }
}

/// Apply a mod's settings file to it
///
/// Options and keybinds without an entry keep their values. Every rejected
/// stored value is logged and returned.
pub fn load(m: &Mod) -> Vec<SerializationWarning> {
    let Some(path) = m.settings_file() else {
        return Vec::new();
    };
    let record = SettingsRecord::read(path);
    let mut warnings = Vec::new();

    let mut state = m.state();
    for option in state.options.iter_mut() {
        if let Some(value) = record.options.get(option.identifier()) {
            warnings.extend(option.load(value).warnings);
        }
    }

    for keybind in state.keybinds.iter_mut() {
        if let Some(key) = record.keybinds.get(keybind.identifier()) {
            keybind.set_key((!key.is_empty()).then_some(key.as_str()));
        }
    }

    if let Some(enabled) = record.enabled {
        state.startup_enabled = enabled;
    }
    drop(state);

    for warning in &warnings {
        warn!(
            target: "settings",
            mod_name = %m.name(),
            option = %warning.option,
            value = %warning.value,
            "Invalid stored value, using the default"
        );
    }
    warnings
}

/// Write a mod's current state to its settings file
pub fn save(m: &Mod) -> Result<(), SettingsError> {
    let Some(path) = m.settings_file() else {
        return Ok(());
    };
    let record = record_for(m);
    record.write(path)?;
    debug!(target: "settings", mod_name = %m.name(), path = %path.display(), "Saved settings");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_table_tolerates_junk() {
        let table: toml::Table = toml::from_str(
            r#"
            enabled = "yes"
            stray = 1
            options = 4
            [keybinds]
            jump = "Space"
            crouch = 3
            "#,
        )
        .unwrap();

        let record = SettingsRecord::from_table(table, Path::new("junk.toml"));
        assert_eq!(record.enabled, None);
        assert!(record.options.is_empty());
        assert_eq!(record.keybinds.len(), 1);
        assert_eq!(record.keybinds["jump"], "Space");
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("mod.toml");

        let mut record = SettingsRecord {
            enabled: Some(true),
            ..Default::default()
        };
        record.options.insert("flag".into(), toml::Value::Boolean(true));
        record.keybinds.insert("jump".into(), String::new());

        record.write(&path).unwrap();
        assert_eq!(SettingsRecord::read(&path), record);
    }

    #[test]
    fn test_empty_record_deletes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mod.toml");
        std::fs::write(&path, "enabled = true\n").unwrap();

        SettingsRecord::default().write(&path).unwrap();
        assert!(!path.exists());

        // Deleting twice is fine
        SettingsRecord::default().write(&path).unwrap();
    }

    #[test]
    fn test_unparsable_reads_as_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mod.toml");
        std::fs::write(&path, "this is [not toml").unwrap();
        assert!(SettingsRecord::read(&path).is_empty());
    }
}
