//! Declarative mod framework for a live game host
//!
//! Mod authors describe a mod as a [`ModTemplate`]: metadata plus options,
//! keybinds, commands and hooks. The [`ModRegistry`] builds each template
//! into a live [`Mod`], loads its settings, binds its hooks and enables it if
//! it was enabled last time. The host supplies hook installation and keybind
//! handling through the traits in [`host`].

pub mod command;
pub mod config;
pub mod error;
pub mod factory;
pub mod hook;
pub mod host;
pub mod keybinds;
pub mod manifest;
pub mod mod_def;
pub mod options;
pub mod registry;
pub mod settings;
pub mod update;
pub mod version;

pub use command::{Command, CommandError, ParseError};
pub use config::{ConfigLoadError, FrameworkConfig};
pub use error::{
    BuildError, ComponentKind, DuplicateNameError, ModError, SerializationWarning, SettingsError,
    ValidationError,
};
pub use factory::{build_mod, Declaration, ModTemplate};
pub use hook::{BoundHook, DispatchOutcome, Hook, HookDispatcher, HookEvent, HookSignal, HookSlot};
pub use host::{HookHandle, HookInstaller, Host, KeybindBackend, NoKeybindBackend};
pub use keybinds::{InputEvent, Keybind, KeybindSignal};
pub use manifest::ModManifest;
pub use mod_def::{CoopSupport, Game, Mod, ModInfo, ModRef, ModType};
pub use options::{ModOption, OptionKind, OptionValue};
pub use registry::{ModRegistry, RegistryError};
pub use update::{RemoteRelease, UpdateCheckError, UpdateChecker, UpdateSource, UpdateState};
pub use version::ModVersion;

// Command argument declarations are clap's
pub use clap::{value_parser, Arg, ArgAction, ArgMatches};
