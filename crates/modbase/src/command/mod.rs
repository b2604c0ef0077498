//! Named console actions with clap-parsed arguments

use std::fmt;
use std::sync::Arc;

use clap::{Arg, ArgMatches};
use thiserror::Error;
use tracing::debug;

use crate::error::ValidationError;
use crate::mod_def::{Mod, ModRef};

mod tokenizer;

pub use tokenizer::{tokenize, TokenizeError};

pub type CommandCallback = Arc<dyn Fn(&Mod, &ArgMatches) -> anyhow::Result<()> + Send + Sync>;

/// Arguments did not match a command's contract, or help was requested
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{command}: {message}")]
pub struct ParseError {
    pub command: String,
    /// What went wrong, or the help text if that was what was asked for
    pub message: String,
    pub usage: String,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("command '{command}' failed: {source}")]
    Failed {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unknown command '{0}'")]
    Unknown(String),
}

#[derive(Clone)]
pub struct Command {
    name: String,
    aliases: Vec<String>,
    parser: clap::Command,
    callback: CommandCallback,
    owner: Option<ModRef>,
}

fn check_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(ValidationError::CommandName {
            command: name.to_string(),
        });
    }
    Ok(())
}

impl Command {
    pub fn new(
        name: impl Into<String>,
        callback: impl Fn(&Mod, &ArgMatches) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        check_name(&name)?;
        Ok(Self {
            parser: clap::Command::new(name.clone())
                .no_binary_name(true)
                .disable_version_flag(true),
            name,
            aliases: Vec::new(),
            callback: Arc::new(callback),
            owner: None,
        })
    }

    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.parser = self.parser.arg(arg);
        self
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.parser = self.parser.about(about.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Result<Self, ValidationError> {
        let alias = alias.into();
        check_name(&alias)?;
        self.aliases.push(alias);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The name followed by every alias
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn matches(&self, word: &str) -> bool {
        self.names().any(|name| name == word)
    }

    pub fn usage(&self) -> String {
        self.parser.clone().render_usage().to_string()
    }

    pub fn owner(&self) -> Option<Mod> {
        self.owner.as_ref().and_then(ModRef::upgrade)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.names().try_for_each(check_name)
    }

    /// Tokenize and parse an argument string without running anything
    pub fn parse(&self, raw: &str) -> Result<ArgMatches, ParseError> {
        let tokens = tokenize(raw).map_err(|e| ParseError {
            command: self.name.clone(),
            message: e.to_string(),
            usage: self.usage(),
        })?;

        self.parser
            .clone()
            .try_get_matches_from(tokens)
            .map_err(|e| ParseError {
                command: self.name.clone(),
                message: e.render().to_string().trim_end().to_string(),
                usage: self.usage(),
            })
    }

    /// Parse `raw` and run the callback against `owner`
    pub fn invoke(&self, owner: &Mod, raw: &str) -> Result<(), CommandError> {
        let matches = self.parse(raw)?;
        debug!(target: "commands", command = %self.name, args = %raw, "Running command");
        (self.callback)(owner, &matches).map_err(|source| CommandError::Failed {
            command: self.name.clone(),
            source,
        })
    }

    pub(crate) fn attach(&mut self, owner: &ModRef) {
        debug_assert!(self.owner.is_none(), "command '{}' attached twice", self.name);
        self.owner = Some(owner.clone());
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn give() -> Command {
        Command::new("give", |_, _| Ok(()))
            .unwrap()
            .about("Spawn an item")
            .arg(Arg::new("item").required(true))
            .arg(
                Arg::new("count")
                    .long("count")
                    .short('n')
                    .value_parser(clap::value_parser!(u32))
                    .default_value("1"),
            )
    }

    #[test]
    fn test_whitespace_in_name_rejected() {
        assert!(matches!(
            Command::new("two words", |_, _| Ok(())),
            Err(ValidationError::CommandName { .. })
        ));
        assert!(Command::new("", |_, _| Ok(())).is_err());
        assert!(give().alias("g ive").is_err());
    }

    #[test]
    fn test_parse_with_defaults() {
        let matches = give().parse("'Bee Shield'").unwrap();
        assert_eq!(matches.get_one::<String>("item").unwrap(), "Bee Shield");
        assert_eq!(*matches.get_one::<u32>("count").unwrap(), 1);

        let matches = give().parse("shield -n 3").unwrap();
        assert_eq!(*matches.get_one::<u32>("count").unwrap(), 3);
    }

    #[test]
    fn test_parse_failure_carries_usage() {
        let err = give().parse("").unwrap_err();
        assert_eq!(err.command, "give");
        assert!(err.usage.contains("give"));

        let err = give().parse("shield --count lots").unwrap_err();
        assert!(err.message.contains("lots"));
    }

    #[test]
    fn test_help_is_a_parse_error() {
        let err = give().parse("--help").unwrap_err();
        assert!(err.message.contains("Spawn an item"));
    }

    #[test]
    fn test_names_include_aliases() {
        let command = give().alias("spawn").unwrap();
        assert!(command.matches("give"));
        assert!(command.matches("spawn"));
        assert!(!command.matches("gift"));
    }
}
