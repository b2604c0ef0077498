//! Mods the reference host ships with, plus manifest-only mods found on disk

use std::fs;
use std::path::{Path, PathBuf};

use modbase::{
    value_parser, Arg, Command, Hook, HookSignal, Keybind, KeybindSignal, ModOption, ModTemplate,
    RemoteRelease, UpdateCheckError, UpdateSource,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Manifest file each mod directory may carry
pub const MANIFEST_FILE: &str = "mod.toml";

/// The host's own mod, listed first in every menu
pub fn base_template() -> ModTemplate {
    let version = Command::new("modbase_version", |m, _| {
        info!(target: "commands", "{} {}", m.name(), env!("VERSION_STRING"));
        Ok(())
    })
    .and_then(|c| c.alias("mbv"));

    let mut template = ModTemplate::new("Mod Menu")
        .author("modbase")
        .description("Lists installed mods and the framework version")
        .version(env!("CARGO_PKG_VERSION"))
        .option(ModOption::bool("show_libraries", false).display_name("Show Libraries"))
        .option(ModOption::hidden("launches", 0));

    match version {
        Ok(command) => template = template.command(command),
        Err(e) => warn!(target: "commands", error = %e, "Skipping version command"),
    }
    template
}

/// A small mod touching every kind of component
pub fn sprint_template() -> ModTemplate {
    let speed = ModOption::slider("speed", 100.0, 50.0, 300.0, 10.0).map(|o| {
        o.display_name("Sprint Speed")
            .description("Percentage of the normal sprint speed")
            .on_change(|m, value| {
                info!(target: "options", mod_name = %m.name(), speed = %value, "Sprint speed changed");
            })
    });

    let mut template = ModTemplate::new("Sprint Tweaks")
        .author("modbase")
        .description("Adjustable sprinting")
        .version("1.2.0")
        .option(ModOption::bool("infinite_stamina", false).display_name("Infinite Stamina"))
        .option(ModOption::spinner("mode", "Hold", ["Hold", "Toggle"]).display_name("Sprint Mode"))
        .option(ModOption::nested(
            "hud",
            vec![
                ModOption::bool("show_meter", true),
                ModOption::dropdown("meter_colour", "White", ["White", "Yellow", "Red"]),
            ],
        ))
        .option(ModOption::button("reset_speed").on_press(|m| {
            if let Err(e) = m.set_option_value("speed", 100) {
                warn!(target: "options", error = %e, "Failed to reset sprint speed");
            }
        }))
        .keybind(
            Keybind::new("toggle_stamina", Some("F6"))
                .display_name("Toggle Infinite Stamina")
                .on_press(|m| {
                    let current = m.bool_value("infinite_stamina").unwrap_or_default();
                    if let Err(e) = m.set_option_value("infinite_stamina", !current) {
                        warn!(target: "keybinds", error = %e, "Failed to toggle stamina");
                    }
                    KeybindSignal::Block
                }),
        )
        .keybind(Keybind::new("fast", Some("F7")).command("sprint_speed"))
        .hook(Hook::pre("drain_stamina", "player.stamina_drain", |m, _| {
            if m.bool_value("infinite_stamina") == Some(true) {
                HookSignal::Block
            } else {
                HookSignal::Continue
            }
        }))
        .hook(Hook::post("scale_speed", "player.sprint", |m, event| {
            let speed = m.number_value("speed").unwrap_or(100.0);
            if let Some(base) = event.ret.as_ref().and_then(toml::Value::as_float) {
                event.ret = Some(toml::Value::Float(base * speed / 100.0));
            }
            HookSignal::Continue
        }));

    match speed {
        Ok(option) => template = template.option(option),
        Err(e) => warn!(target: "options", error = %e, "Skipping sprint speed option"),
    }

    let command = Command::new("sprint_speed", |m, args| {
        let value = args.get_one::<u32>("percent").copied().unwrap_or(200);
        m.set_option_value("speed", value)?;
        Ok(())
    })
    .map(|c| {
        c.about("Set the sprint speed percentage")
            .arg(
                Arg::new("percent")
                    .value_parser(value_parser!(u32))
                    .help("Defaults to 200"),
            )
    });
    match command {
        Ok(command) => template.command(command),
        Err(e) => {
            warn!(target: "commands", error = %e, "Skipping sprint_speed command");
            template
        }
    }
}

/// Templates for every `<mods_dir>/<dir>/mod.toml`
///
/// These mods have metadata and settings but no behaviour of their own.
pub fn discover_manifests(mods_dir: &Path) -> Vec<ModTemplate> {
    let entries = match fs::read_dir(mods_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(target: "registry", path = %mods_dir.display(), error = %e, "No mods directory");
            return Vec::new();
        }
    };

    let mut manifests = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path().join(MANIFEST_FILE))
        .filter(|path| path.is_file())
        .collect::<Vec<PathBuf>>();
    manifests.sort();

    manifests
        .into_iter()
        .map(|path| {
            debug!(target: "registry", path = %path.display(), "Found mod manifest");
            ModTemplate::from_manifest(path)
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ReleaseFile {
    version: String,
    #[serde(default)]
    changelog: Option<String>,
}

/// Reads the latest release from a local TOML file
///
/// Stands in for a network fetch; a real host would query its release feed.
pub struct FileReleaseSource {
    path: PathBuf,
}

impl FileReleaseSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UpdateSource for FileReleaseSource {
    fn fetch(&self) -> Result<RemoteRelease, UpdateCheckError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| UpdateCheckError::Fetch(format!("{}: {e}", self.path.display())))?;
        let file: ReleaseFile = toml::from_str(&content)
            .map_err(|e| UpdateCheckError::Fetch(format!("{}: {e}", self.path.display())))?;

        let release = RemoteRelease::new(file.version);
        Ok(match file.changelog {
            Some(changelog) => release.with_changelog(changelog),
            None => release,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modbase::HookDispatcher;
    use tempfile::TempDir;

    #[test]
    fn test_demo_templates_build() {
        let mut dispatcher = HookDispatcher::new();
        let sprint = sprint_template().build(None, &mut dispatcher).unwrap();
        assert_eq!(sprint.number_value("speed"), Some(100.0));
        assert!(sprint.has_command("sprint_speed"));

        let base = base_template().build(None, &mut dispatcher).unwrap();
        assert!(base.has_command("mbv"));
    }

    #[test]
    fn test_sprint_command_sets_speed() {
        let sprint = sprint_template()
            .build(None, &mut HookDispatcher::new())
            .unwrap();
        sprint.invoke_command("sprint_speed", "150").unwrap();
        assert_eq!(sprint.number_value("speed"), Some(150.0));

        // Clamped to the slider's range
        sprint.invoke_command("sprint_speed", "900").unwrap();
        assert_eq!(sprint.number_value("speed"), Some(300.0));

        sprint.press_button("reset_speed").unwrap();
        assert_eq!(sprint.number_value("speed"), Some(100.0));
    }

    #[test]
    fn test_discover_manifests() {
        let dir = TempDir::new().unwrap();
        let with_manifest = dir.path().join("better_loot");
        fs::create_dir_all(&with_manifest).unwrap();
        fs::write(
            with_manifest.join(MANIFEST_FILE),
            "[project]\nname = \"Better Loot\"\nversion = \"0.3.0\"\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("no_manifest")).unwrap();

        let templates = discover_manifests(dir.path());
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].resolved_name().as_deref(), Some("Better Loot"));

        assert!(discover_manifests(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn test_file_release_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latest.toml");
        let source = FileReleaseSource::new(&path);
        assert!(matches!(source.fetch(), Err(UpdateCheckError::Fetch(_))));

        fs::write(&path, "version = \"1.3.0\"\nchangelog = \"Faster sprinting\"\n").unwrap();
        let release = source.fetch().unwrap();
        assert_eq!(release.version, "1.3.0");
        assert_eq!(release.changelog.as_deref(), Some("Faster sprinting"));
    }
}
