use std::{fs, path::Path, path::PathBuf, time::Duration};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config file not found")]
    NotFound,
    #[error("failed to parse config: {0}")]
    ParseError(String),
    #[error("IO error reading config: {0}")]
    IoError(String),
}

/// Framework-wide settings for a host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkConfig {
    /// Where per-mod settings files live (default: <data dir>/settings)
    #[serde(default)]
    pub settings_dir: Option<PathBuf>,

    /// Where mods and their manifests live (default: <data dir>/mods)
    #[serde(default)]
    pub mods_dir: Option<PathBuf>,

    /// Whether update checks run at all (default: true)
    #[serde(default = "default_update_checks")]
    pub update_checks: bool,

    /// Seconds between update checks (default: 1 hour)
    #[serde(default = "default_update_check_interval")]
    pub update_check_interval_secs: u64,

    /// Also write logs to a file in the data directory
    #[serde(default)]
    pub log_to_file: bool,
}

fn default_update_checks() -> bool {
    true
}

fn default_update_check_interval() -> u64 {
    60 * 60
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            settings_dir: None,
            mods_dir: None,
            update_checks: default_update_checks(),
            update_check_interval_secs: default_update_check_interval(),
            log_to_file: false,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "modbase")
}

impl FrameworkConfig {
    pub fn config_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".modbase").join("config.toml"))
    }

    pub fn data_dir() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".modbase"))
    }

    /// Load from the default location
    pub fn load() -> Result<Self, ConfigLoadError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound);
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigLoadError::IoError(e.to_string()))?;
        let config =
            toml::from_str(&content).map_err(|e| ConfigLoadError::ParseError(e.to_string()))?;
        info!(target: "registry", "Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn settings_dir(&self) -> PathBuf {
        self.settings_dir
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("settings"))
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.mods_dir
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("mods"))
    }

    pub fn update_check_interval(&self) -> Duration {
        Duration::from_secs(self.update_check_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_fields_missing() {
        let config: FrameworkConfig = toml::from_str("log_to_file = true").unwrap();
        assert!(config.update_checks);
        assert_eq!(config.update_check_interval(), Duration::from_secs(3600));
        assert!(config.log_to_file);
        assert!(config.settings_dir().ends_with("settings"));
    }

    #[test]
    fn test_explicit_dirs() {
        let config: FrameworkConfig = toml::from_str(
            r#"
            settings_dir = "/tmp/modbase/settings"
            update_check_interval_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.settings_dir(), PathBuf::from("/tmp/modbase/settings"));
        assert_eq!(config.update_check_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        assert!(matches!(
            FrameworkConfig::load_from(&path),
            Err(ConfigLoadError::NotFound)
        ));

        fs::write(&path, "update_checks = \"sometimes\"").unwrap();
        assert!(matches!(
            FrameworkConfig::load_from(&path),
            Err(ConfigLoadError::ParseError(_))
        ));
    }
}
