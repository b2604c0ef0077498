//! Turning a declaration template into a live mod
//!
//! A [`ModTemplate`] is inert: it holds metadata and an ordered list of
//! component declarations. Every build clones the declarations afresh, so two
//! mods built from the same template never share option values or keybind
//! state. Only the callbacks, which are immutable, are shared.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::command::Command;
use crate::error::{BuildError, ComponentKind, DuplicateNameError, ValidationError};
use crate::hook::Hook;
use crate::host::HookInstaller;
use crate::keybinds::Keybind;
use crate::manifest::{ManifestFields, ModManifest};
use crate::mod_def::{CoopSupport, Game, LifecycleCallback, Mod, ModInfo, ModParts, ModType};
use crate::options::ModOption;

/// One component declared on a template
#[derive(Debug, Clone)]
pub enum Declaration {
    Option(ModOption),
    Keybind(Keybind),
    Command(Command),
    Hook(Hook),
}

impl From<ModOption> for Declaration {
    fn from(option: ModOption) -> Self {
        Declaration::Option(option)
    }
}

impl From<Keybind> for Declaration {
    fn from(keybind: Keybind) -> Self {
        Declaration::Keybind(keybind)
    }
}

impl From<Command> for Declaration {
    fn from(command: Command) -> Self {
        Declaration::Command(command)
    }
}

impl From<Hook> for Declaration {
    fn from(hook: Hook) -> Self {
        Declaration::Hook(hook)
    }
}

#[derive(Clone, Default)]
pub struct ModTemplate {
    name: Option<String>,
    author: Option<String>,
    description: Option<String>,
    version: Option<String>,
    mod_type: Option<ModType>,
    supported_games: Option<Game>,
    coop_support: Option<CoopSupport>,
    auto_enable: Option<bool>,
    settings_file: Option<PathBuf>,
    manifest: Option<PathBuf>,
    on_enable: Option<LifecycleCallback>,
    on_disable: Option<LifecycleCallback>,
    declarations: Vec<Declaration>,
}

impl ModTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// A template whose metadata, name included, comes from a manifest
    pub fn from_manifest(path: impl Into<PathBuf>) -> Self {
        Self::default().with_manifest(path)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn mod_type(mut self, mod_type: ModType) -> Self {
        self.mod_type = Some(mod_type);
        self
    }

    pub fn supported_games(mut self, games: Game) -> Self {
        self.supported_games = Some(games);
        self
    }

    pub fn coop_support(mut self, coop_support: CoopSupport) -> Self {
        self.coop_support = Some(coop_support);
        self
    }

    pub fn auto_enable(mut self, auto_enable: bool) -> Self {
        self.auto_enable = Some(auto_enable);
        self
    }

    /// Use this settings file instead of one named after the mod
    pub fn settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_file = Some(path.into());
        self
    }

    /// Fill unset metadata from a `mod.toml`, re-read on every build
    pub fn with_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest = Some(path.into());
        self
    }

    pub fn on_enable(mut self, callback: impl Fn(&Mod) + Send + Sync + 'static) -> Self {
        self.on_enable = Some(Arc::new(callback));
        self
    }

    pub fn on_disable(mut self, callback: impl Fn(&Mod) + Send + Sync + 'static) -> Self {
        self.on_disable = Some(Arc::new(callback));
        self
    }

    pub fn declare(mut self, declaration: impl Into<Declaration>) -> Self {
        self.declarations.push(declaration.into());
        self
    }

    pub fn option(self, option: ModOption) -> Self {
        self.declare(option)
    }

    pub fn keybind(self, keybind: Keybind) -> Self {
        self.declare(keybind)
    }

    pub fn command(self, command: Command) -> Self {
        self.declare(command)
    }

    pub fn hook(self, hook: Hook) -> Self {
        self.declare(hook)
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// The name the built mod will have, if it can be resolved
    pub fn resolved_name(&self) -> Option<String> {
        self.name.clone().or_else(|| self.manifest_fields().name)
    }

    fn manifest_fields(&self) -> ManifestFields {
        self.manifest
            .as_deref()
            .and_then(ModManifest::load)
            .map(|m| m.resolve())
            .unwrap_or_default()
    }

    /// Resolve metadata: template values first, then the manifest
    fn resolve_info(&self, settings_dir: Option<&Path>) -> Result<ModInfo, BuildError> {
        let manifest = self.manifest_fields();
        let name = self
            .name
            .clone()
            .or(manifest.name)
            .ok_or(BuildError::MissingName)?;

        let mut info = ModInfo::new(name);
        if let Some(author) = self.author.clone().or(manifest.author) {
            info.author = author;
        }
        if let Some(description) = self.description.clone().or(manifest.description) {
            info.description = description;
        }
        if let Some(version) = self.version.clone().or(manifest.version) {
            info.version = version;
        }
        if let Some(mod_type) = self.mod_type.or(manifest.mod_type) {
            info.mod_type = mod_type;
        }
        if let Some(games) = self.supported_games.or(manifest.supported_games) {
            info.supported_games = games;
        }
        if let Some(coop) = self.coop_support.or(manifest.coop_support) {
            info.coop_support = coop;
        }
        if let Some(auto_enable) = self.auto_enable.or(manifest.auto_enable) {
            info.auto_enable = auto_enable;
        }
        info.settings_file = self
            .settings_file
            .clone()
            .or_else(|| settings_dir.map(|dir| dir.join(format!("{}.toml", info.name))));
        Ok(info)
    }

    /// The settings file a build would use
    pub fn resolved_settings_file(&self, settings_dir: Option<&Path>) -> Option<PathBuf> {
        self.resolve_info(settings_dir).ok()?.settings_file
    }

    pub fn build(
        &self,
        settings_dir: Option<&Path>,
        installer: &mut dyn HookInstaller,
    ) -> Result<Mod, BuildError> {
        build_mod(self, settings_dir, installer)
    }
}

/// Build one fully wired mod from a template
///
/// Clones every declaration, validates them, rejects duplicate names, loads
/// the settings file and binds every hook. Hooks stay inactive until the mod
/// is enabled.
pub fn build_mod(
    template: &ModTemplate,
    settings_dir: Option<&Path>,
    installer: &mut dyn HookInstaller,
) -> Result<Mod, BuildError> {
    let info = template.resolve_info(settings_dir)?;
    let mod_name = info.name.clone();

    let mut options = Vec::new();
    let mut keybinds = Vec::new();
    let mut commands = Vec::new();
    let mut hooks = Vec::new();
    for declaration in &template.declarations {
        match declaration {
            Declaration::Option(o) => options.push(o.clone()),
            Declaration::Keybind(k) => keybinds.push(k.clone()),
            Declaration::Command(c) => commands.push(c.clone()),
            Declaration::Hook(h) => hooks.push(h.clone()),
        }
    }

    let validation = |source: ValidationError| BuildError::Validation {
        mod_name: mod_name.clone(),
        source,
    };
    for option in &options {
        option.validate().map_err(validation)?;
    }
    for command in &commands {
        command.validate().map_err(validation)?;
    }

    check_duplicates(&mod_name, &options, &keybinds, &commands, &hooks)?;

    let m = Mod::from_parts(ModParts {
        info,
        on_enable: template.on_enable.clone(),
        on_disable: template.on_disable.clone(),
        options,
        keybinds,
        commands,
        hooks,
    });

    let warnings = m.load_settings();
    if !warnings.is_empty() {
        debug!(target: "registry", mod_name = %mod_name, count = warnings.len(), "Settings loaded with warnings");
    }
    m.bind_hooks(installer);

    info!(target: "registry", mod_name = %mod_name, version = %m.info().version, "Built mod");
    Ok(m)
}

fn first_duplicate<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}

fn duplicate_options(options: &[ModOption]) -> Option<&str> {
    first_duplicate(options.iter().map(ModOption::identifier)).or_else(|| {
        options
            .iter()
            .find_map(|option| duplicate_options(option.children()))
    })
}

fn check_duplicates(
    mod_name: &str,
    options: &[ModOption],
    keybinds: &[Keybind],
    commands: &[Command],
    hooks: &[Hook],
) -> Result<(), DuplicateNameError> {
    let duplicate = |kind: ComponentKind, name: &str| DuplicateNameError {
        mod_name: mod_name.to_string(),
        kind,
        name: name.to_string(),
    };

    if let Some(name) = duplicate_options(options) {
        return Err(duplicate(ComponentKind::Option, name));
    }
    if let Some(name) = first_duplicate(keybinds.iter().map(Keybind::identifier)) {
        return Err(duplicate(ComponentKind::Keybind, name));
    }
    if let Some(name) = first_duplicate(commands.iter().flat_map(|c| c.names())) {
        return Err(duplicate(ComponentKind::Command, name));
    }
    if let Some(name) = first_duplicate(hooks.iter().map(Hook::identifier)) {
        return Err(duplicate(ComponentKind::Hook, name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::HookDispatcher;

    #[test]
    fn test_missing_name() {
        let err = ModTemplate::default()
            .build(None, &mut HookDispatcher::new())
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingName));
    }

    #[test]
    fn test_duplicate_options_checked_per_level() {
        // The same identifier at different levels is fine
        let template = ModTemplate::new("levels")
            .option(ModOption::bool("scale", true))
            .option(ModOption::group("hud", vec![ModOption::bool("scale", true)]));
        assert!(template.build(None, &mut HookDispatcher::new()).is_ok());

        let template = ModTemplate::new("dupes").option(ModOption::group(
            "hud",
            vec![ModOption::bool("scale", true), ModOption::bool("scale", false)],
        ));
        let err = template.build(None, &mut HookDispatcher::new()).unwrap_err();
        assert!(matches!(
            err,
            BuildError::DuplicateName(DuplicateNameError { kind: ComponentKind::Option, ref name, .. }) if name == "scale"
        ));
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let template = ModTemplate::new("mixed")
            .option(ModOption::bool("jump", true))
            .keybind(Keybind::new("jump", Some("Space")));
        assert!(template.build(None, &mut HookDispatcher::new()).is_ok());
    }

    #[test]
    fn test_alias_collides_with_name() {
        let template = ModTemplate::new("aliases")
            .command(Command::new("heal", |_, _| Ok(())).unwrap())
            .command(
                Command::new("restore", |_, _| Ok(()))
                    .unwrap()
                    .alias("heal")
                    .unwrap(),
            );
        let err = template.build(None, &mut HookDispatcher::new()).unwrap_err();
        assert!(matches!(
            err,
            BuildError::DuplicateName(DuplicateNameError { kind: ComponentKind::Command, .. })
        ));
    }

    #[test]
    fn test_invalid_choice_names_option() {
        let template = ModTemplate::new("bad").option(ModOption::dropdown("colour", "Pink", ["Red"]));
        let err = template.build(None, &mut HookDispatcher::new()).unwrap_err();
        let BuildError::Validation { mod_name, source } = err else {
            panic!("expected a validation error");
        };
        assert_eq!(mod_name, "bad");
        assert!(source.to_string().contains("colour"));
    }

    #[test]
    fn test_settings_file_named_after_mod() {
        let template = ModTemplate::new("Skip Intro");
        assert_eq!(
            template.resolved_settings_file(Some(Path::new("/settings"))),
            Some(PathBuf::from("/settings/Skip Intro.toml"))
        );
        assert_eq!(template.resolved_settings_file(None), None);

        let template = template.settings_file("/elsewhere/intro.toml");
        assert_eq!(
            template.resolved_settings_file(Some(Path::new("/settings"))),
            Some(PathBuf::from("/elsewhere/intro.toml"))
        );
    }
}
