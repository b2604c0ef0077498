//! Line-based console driving a registry
//!
//! Lines starting with `/` are host builtins. Anything else is handed to the
//! registered mods' commands.

use std::time::Instant;

use anyhow::{anyhow, bail, Context};
use modbase::command::tokenize;
use modbase::{
    HookDispatcher, HookEvent, InputEvent, Keybind, KeybindBackend, ModRegistry, UpdateChecker,
    UpdateSource, UpdateState,
};
use tracing::{debug, error, info, warn};

use crate::demo::FileReleaseSource;

const HELP: &str = "\
/mods                       list registered mods
/enable <mod>               enable a mod
/disable <mod>              disable a mod
/options <mod>              show a mod's options
/set <mod> <option> <value> change an option
/button <mod> <option>      press a button option
/key <key> [event]          send a key event (pressed, released, repeat, ...)
/fire <event> [result]      run a hooked event
/reload                     rebuild every mod
/update                     check for updates now
/dismiss                    hide the update notification
/quit                       exit
<command> [args]            run a mod command";

/// A parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Empty,
    Help,
    Mods,
    Enable(String),
    Disable(String),
    Options(String),
    Set {
        mod_name: String,
        path: String,
        value: toml::Value,
    },
    Button {
        mod_name: String,
        path: String,
    },
    Key {
        key: String,
        event: InputEvent,
    },
    Fire {
        event: String,
        result: Option<toml::Value>,
    },
    Reload,
    Update,
    Dismiss,
    Quit,
    /// Not a builtin, goes to the mods' commands
    ModCommand(String),
}

/// Read a console value as TOML, falling back to a bare string
pub fn parse_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("v = {raw}"))
        .ok()
        .and_then(|mut table| table.remove("v"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

pub fn parse_line(line: &str) -> anyhow::Result<ConsoleInput> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ConsoleInput::Empty);
    }
    let Some(builtin) = line.strip_prefix('/') else {
        return Ok(ConsoleInput::ModCommand(line.to_string()));
    };

    let words = tokenize(builtin)?;
    let args = words.iter().map(String::as_str).collect::<Vec<_>>();
    let input = match args.as_slice() {
        ["help"] => ConsoleInput::Help,
        ["mods"] => ConsoleInput::Mods,
        ["enable", name] => ConsoleInput::Enable(name.to_string()),
        ["disable", name] => ConsoleInput::Disable(name.to_string()),
        ["options", name] => ConsoleInput::Options(name.to_string()),
        ["set", mod_name, path, value] => ConsoleInput::Set {
            mod_name: mod_name.to_string(),
            path: path.to_string(),
            value: parse_value(value),
        },
        ["button", mod_name, path] => ConsoleInput::Button {
            mod_name: mod_name.to_string(),
            path: path.to_string(),
        },
        ["key", key] => ConsoleInput::Key {
            key: key.to_string(),
            event: InputEvent::Pressed,
        },
        ["key", key, event] => ConsoleInput::Key {
            key: key.to_string(),
            event: InputEvent::from_name(event)
                .ok_or_else(|| anyhow!("unknown input event '{event}'"))?,
        },
        ["fire", event] => ConsoleInput::Fire {
            event: event.to_string(),
            result: None,
        },
        ["fire", event, result] => ConsoleInput::Fire {
            event: event.to_string(),
            result: Some(parse_value(result)),
        },
        ["reload"] => ConsoleInput::Reload,
        ["update"] => ConsoleInput::Update,
        ["dismiss"] => ConsoleInput::Dismiss,
        ["quit"] | ["exit"] => ConsoleInput::Quit,
        [] => ConsoleInput::Empty,
        [word, ..] => bail!("unknown or malformed builtin '/{word}', try /help"),
    };
    Ok(input)
}

/// Whether the console loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Stands in for the game's input system
#[derive(Debug, Default)]
pub struct ConsoleKeybindBackend;

impl KeybindBackend for ConsoleKeybindBackend {
    fn enable(&mut self, keybind: &Keybind) {
        debug!(target: "keybinds", keybind = %keybind.identifier(), key = ?keybind.key(), "Listening for key");
    }

    fn disable(&mut self, keybind: &Keybind) {
        debug!(target: "keybinds", keybind = %keybind.identifier(), key = ?keybind.key(), "Stopped listening for key");
    }

    fn rebind(&mut self, keybind: &Keybind, new_key: Option<&str>) {
        debug!(target: "keybinds", keybind = %keybind.identifier(), from = ?keybind.key(), to = ?new_key, "Rebound key");
    }
}

struct Updates {
    checker: UpdateChecker,
    source: FileReleaseSource,
}

/// Everything a running host owns
pub struct Session {
    registry: ModRegistry,
    dispatcher: HookDispatcher,
    updates: Option<Updates>,
}

impl Session {
    pub fn new(registry: ModRegistry, dispatcher: HookDispatcher) -> Self {
        Self {
            registry,
            dispatcher,
            updates: None,
        }
    }

    pub fn with_updates(mut self, checker: UpdateChecker, source: FileReleaseSource) -> Self {
        self.updates = Some(Updates { checker, source });
        self
    }

    pub fn registry(&self) -> &ModRegistry {
        &self.registry
    }

    /// Run one console line, reporting failures instead of returning them
    pub fn handle_line(&mut self, line: &str) -> Flow {
        let result = parse_line(line).and_then(|input| self.execute(input));
        match result {
            Ok(flow) => flow,
            Err(e) => {
                println!("{e:#}");
                Flow::Continue
            }
        }
    }

    pub fn execute(&mut self, input: ConsoleInput) -> anyhow::Result<Flow> {
        match input {
            ConsoleInput::Empty => {}
            ConsoleInput::Help => println!("{HELP}"),
            ConsoleInput::Mods => self.print_mods(),
            ConsoleInput::Enable(name) => self.registry.enable_mod(&name)?,
            ConsoleInput::Disable(name) => self.registry.disable_mod(&name)?,
            ConsoleInput::Options(name) => {
                let m = self.find_mod(&name)?;
                for option in m.options() {
                    match option.serialize() {
                        Some(value) => println!("{} = {}", option.identifier(), value),
                        None => println!("{} (button)", option.identifier()),
                    }
                }
            }
            ConsoleInput::Set {
                mod_name,
                path,
                value,
            } => {
                let m = self.find_mod(&mod_name)?;
                let changed = m
                    .set_option_value(&path, value)
                    .with_context(|| format!("failed to set {mod_name}.{path}"))?;
                if !changed {
                    println!("{path} unchanged");
                }
            }
            ConsoleInput::Button { mod_name, path } => {
                self.find_mod(&mod_name)?.press_button(&path)?;
            }
            ConsoleInput::Key { key, event } => {
                let signal = self.registry.handle_key(&key, event);
                debug!(target: "keybinds", %key, %event, ?signal, "Key handled");
            }
            ConsoleInput::Fire { event, result } => self.fire(&event, result),
            ConsoleInput::Reload => self.reload(),
            ConsoleInput::Update => {
                self.check_updates(Instant::now(), true);
            }
            ConsoleInput::Dismiss => {
                if let Some(updates) = &mut self.updates {
                    updates.checker.dismiss();
                }
            }
            ConsoleInput::Quit => return Ok(Flow::Quit),
            ConsoleInput::ModCommand(line) => self.registry.run_console_line(&line)?,
        }
        Ok(Flow::Continue)
    }

    fn find_mod(&self, name: &str) -> anyhow::Result<modbase::Mod> {
        self.registry
            .get(name)
            .ok_or_else(|| anyhow!("no mod named '{name}'"))
    }

    fn print_mods(&self) {
        for m in self.registry.ordered_mods() {
            let state = if m.is_enabled() { "enabled" } else { "disabled" };
            println!(
                "{:<24} {:<16} {:<9} {}",
                m.name(),
                m.info().version,
                state,
                m.info().mod_type
            );
        }
        if let Some(notification) = self.updates.as_ref().and_then(|u| u.checker.notification()) {
            println!("{notification}");
        }
    }

    fn fire(&self, event: &str, result: Option<toml::Value>) {
        let mut event = HookEvent::new(event);
        let outcome = self.dispatcher.dispatch(&mut event, |event| {
            event.ret = result;
        });
        if outcome.blocked {
            println!("{} blocked", event.name);
        } else {
            match &event.ret {
                Some(ret) => println!("{} -> {}", event.name, ret),
                None => println!("{} ran", event.name),
            }
        }
    }

    pub fn reload(&mut self) {
        let failures = self.registry.reload();
        for e in &failures {
            error!(target: "registry", error = %e, "Mod failed to reload");
        }
        info!(target: "registry", mods = self.registry.mods().len(), failed = failures.len(), "Reload finished");
    }

    /// Run an update check if one is due, or unconditionally with `force`
    pub fn check_updates(&mut self, now: Instant, force: bool) -> Option<UpdateState> {
        let updates = self.updates.as_mut()?;
        let source: &dyn UpdateSource = &updates.source;
        let state = if force {
            updates.checker.check(source, now)
        } else {
            updates.checker.poll(now, source)
        };
        if let Some(notification) = updates.checker.notification() {
            warn!(target: "update", "{notification}");
        }
        Some(state)
    }

    pub fn shutdown(&mut self) {
        self.registry.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::sprint_template;
    use modbase::Host;
    use std::time::Duration;
    use tempfile::TempDir;

    fn session(dir: &TempDir) -> Session {
        let dispatcher = HookDispatcher::new();
        let host = Host::new(dispatcher.clone(), ConsoleKeybindBackend);
        let mut registry = ModRegistry::new(host, Some(dir.path().to_path_buf()));
        registry.build_and_register(sprint_template()).unwrap();
        Session::new(registry, dispatcher)
    }

    #[test]
    fn test_parse_builtins() {
        assert_eq!(parse_line("  ").unwrap(), ConsoleInput::Empty);
        assert_eq!(parse_line("/mods").unwrap(), ConsoleInput::Mods);
        assert_eq!(
            parse_line("/enable \"Sprint Tweaks\"").unwrap(),
            ConsoleInput::Enable("Sprint Tweaks".into())
        );
        assert_eq!(
            parse_line("/set 'Sprint Tweaks' hud.show_meter false").unwrap(),
            ConsoleInput::Set {
                mod_name: "Sprint Tweaks".into(),
                path: "hud.show_meter".into(),
                value: toml::Value::Boolean(false),
            }
        );
        assert_eq!(
            parse_line("/key F6 released").unwrap(),
            ConsoleInput::Key {
                key: "F6".into(),
                event: InputEvent::Released,
            }
        );
        assert_eq!(
            parse_line("sprint_speed 150").unwrap(),
            ConsoleInput::ModCommand("sprint_speed 150".into())
        );
        assert!(parse_line("/key F6 wiggle").is_err());
        assert!(parse_line("/bogus").is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("12"), toml::Value::Integer(12));
        assert_eq!(parse_value("1.5"), toml::Value::Float(1.5));
        assert_eq!(parse_value("true"), toml::Value::Boolean(true));
        assert_eq!(parse_value("Toggle"), toml::Value::String("Toggle".into()));
    }

    #[test]
    fn test_session_drives_mods() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);

        assert_eq!(session.handle_line("/enable \"Sprint Tweaks\""), Flow::Continue);
        let m = session.registry().get("Sprint Tweaks").unwrap();
        assert!(m.is_enabled());

        session.handle_line("/set \"Sprint Tweaks\" mode Toggle");
        assert_eq!(m.choice_value("mode").as_deref(), Some("Toggle"));

        session.handle_line("/key F6");
        assert_eq!(m.bool_value("infinite_stamina"), Some(true));

        session.handle_line("/key F7");
        assert_eq!(m.number_value("speed"), Some(200.0));

        session.handle_line("sprint_speed 120");
        assert_eq!(m.number_value("speed"), Some(120.0));

        assert_eq!(session.handle_line("/quit"), Flow::Quit);
    }

    #[test]
    fn test_session_reload_keeps_mod_enabled() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);
        session.handle_line("/enable \"Sprint Tweaks\"");
        session.handle_line("/reload");

        assert_eq!(session.registry().mods().len(), 1);
        assert!(session.registry().get("Sprint Tweaks").unwrap().is_enabled());
    }

    #[test]
    fn test_session_update_checks() {
        let dir = TempDir::new().unwrap();
        let release = dir.path().join("latest.toml");
        std::fs::write(&release, "version = \"1.3.0\"\n").unwrap();

        let mut session = session(&dir);
        assert_eq!(session.check_updates(Instant::now(), false), None);

        let checker = UpdateChecker::new("1.2.0", Duration::from_secs(3600));
        let mut session = session.with_updates(checker, FileReleaseSource::new(&release));
        assert_eq!(
            session.check_updates(Instant::now(), false),
            Some(UpdateState::UpdateAvailable)
        );
    }
}
