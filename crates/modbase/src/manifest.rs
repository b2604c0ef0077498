//! Mod metadata read from a `mod.toml` next to the mod
//!
//! ```toml
//! [project]
//! name = "Skip Intro"
//! version = "1.2.0"
//! description = "Skips the intro movies"
//! authors = [{ name = "apple" }, { name = "juice" }]
//!
//! [tool.modbase]
//! mod_type = "Library"
//! supported_games = ["BL2", "TPS"]
//! coop_support = "ClientSide"
//! auto_enable = false
//! ```
//!
//! `[tool.modbase]` wins over `[project]` when both set a field. Anything the
//! template itself sets wins over both.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::mod_def::{CoopSupport, Game, ModType};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModManifest {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub tool: ToolSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectSection {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolSection {
    #[serde(default)]
    pub modbase: ModbaseSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModbaseSection {
    pub name: Option<String>,
    pub version: Option<String>,
    pub auto_enable: Option<bool>,
    pub mod_type: Option<String>,
    pub supported_games: Option<Vec<String>>,
    pub coop_support: Option<String>,
}

/// Metadata fields a manifest provided, after priority resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestFields {
    pub name: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub mod_type: Option<ModType>,
    pub supported_games: Option<Game>,
    pub coop_support: Option<CoopSupport>,
    pub auto_enable: Option<bool>,
}

impl ModManifest {
    /// Read a manifest. A missing or unparsable file yields `None`.
    pub fn load(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!(target: "registry", path = %path.display(), error = %e, "No mod manifest");
                return None;
            }
        };
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Option<Self> {
        match toml::from_str(content) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!(target: "registry", path = %path.display(), error = %e, "Failed to parse mod manifest");
                None
            }
        }
    }

    pub fn resolve(&self) -> ManifestFields {
        let tool = &self.tool.modbase;
        let project = &self.project;

        let author = (!project.authors.is_empty()).then(|| {
            project
                .authors
                .iter()
                .filter_map(|a| a.name.as_deref())
                .collect::<Vec<_>>()
                .join(", ")
        });

        let mod_type = tool.mod_type.as_deref().and_then(|name| {
            let parsed = ModType::from_name(name);
            if parsed.is_none() {
                warn!(target: "registry", mod_type = %name, "Unknown mod type in manifest");
            }
            parsed
        });

        let supported_games = tool.supported_games.as_ref().and_then(|names| {
            let games = names
                .iter()
                .filter_map(|name| {
                    let game = Game::from_name(name);
                    if game.is_none() {
                        warn!(target: "registry", game = %name, "Unknown game in manifest");
                    }
                    game
                })
                .fold(Game::empty(), |acc, g| acc | g);
            (!games.is_empty()).then_some(games)
        });

        let coop_support = tool.coop_support.as_deref().and_then(|name| {
            let parsed = CoopSupport::from_name(name);
            if parsed.is_none() {
                warn!(target: "registry", coop_support = %name, "Unknown coop support in manifest");
            }
            parsed
        });

        ManifestFields {
            name: tool.name.clone().or_else(|| project.name.clone()),
            author,
            description: project.description.clone(),
            version: tool.version.clone().or_else(|| project.version.clone()),
            mod_type,
            supported_games,
            coop_support,
            auto_enable: tool.auto_enable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> ManifestFields {
        ModManifest::parse(s, Path::new("mod.toml")).unwrap().resolve()
    }

    #[test]
    fn test_tool_section_wins() {
        let fields = parse(
            r#"
            [project]
            name = "project-name"
            version = "1.0.0"
            [tool.modbase]
            name = "Tool Name"
            "#,
        );
        assert_eq!(fields.name.as_deref(), Some("Tool Name"));
        assert_eq!(fields.version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_authors_joined() {
        let fields = parse(
            r#"
            [project]
            authors = [{ name = "apple" }, { email = "x@y.z" }, { name = "juice" }]
            "#,
        );
        assert_eq!(fields.author.as_deref(), Some("apple, juice"));
    }

    #[test]
    fn test_enums_and_unknown_names() {
        let fields = parse(
            r#"
            [tool.modbase]
            mod_type = "library"
            supported_games = ["BL2", "TPS", "Pong"]
            coop_support = "ClientSide"
            "#,
        );
        // Names are case sensitive
        assert_eq!(fields.mod_type, None);
        assert_eq!(fields.supported_games, Some(Game::BL2 | Game::TPS));
        assert_eq!(fields.coop_support, Some(CoopSupport::ClientSide));
    }

    #[test]
    fn test_unparsable_is_none() {
        assert!(ModManifest::parse("[project", Path::new("mod.toml")).is_none());
        assert!(ModManifest::load(Path::new("/definitely/not/here/mod.toml")).is_none());
    }
}
