//! Console configuration, importable and exportable as TOML.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config")]
    Parse(#[from] toml::de::Error),
    #[error("can't serialize config")]
    Serialize(#[from] toml::ser::Error),
}

/// Settings of a console, passed explicitly at construction.
///
/// Every field has a default, so a partial TOML document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name, shown in the default prompt.
    pub app_name: String,
    /// Primary prompt template. `{app}` and `{menu}` are substituted.
    pub prompt: String,
    /// Prompt used while reading the continuation of an incomplete line.
    pub continuation_prompt: String,
    /// Leave a blank line between the input and the command output.
    pub newline_before: bool,
    /// Leave a blank line between the command output and the next prompt.
    pub newline_after: bool,
    /// Leave the blank lines even when the input line was empty.
    pub newline_when_empty: bool,
    /// Characters that don't make a line non-empty.
    pub empty_chars: Vec<char>,
    pub highlight: HighlightConfig,
}

/// ANSI sequences used by the syntax highlighter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub command: String,
    pub flag: String,
    pub quote: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "console".to_string(),
            prompt: "{app}{menu} > ".to_string(),
            continuation_prompt: "> ".to_string(),
            newline_before: false,
            newline_after: false,
            newline_when_empty: false,
            empty_chars: vec![' ', '\t'],
            highlight: HighlightConfig::default(),
        }
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            command: "\x1b[32m".to_string(),
            flag: "\x1b[90m".to_string(),
            quote: "\x1b[33m".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Renders the primary prompt template for `menu`.
    ///
    /// The default menu renders as an empty name; other menus as ` [name]`.
    pub fn render_prompt(&self, menu: &str) -> String {
        let menu = if menu.is_empty() {
            String::new()
        } else {
            format!(" [{menu}]")
        };
        self.prompt
            .replace("{app}", &self.app_name)
            .replace("{menu}", &menu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_toml_falls_back_to_defaults() -> Result<(), anyhow::Error> {
        let config = Config::from_toml(
            r#"
            app_name = "sliver"
            newline_after = true

            [highlight]
            command = "\u001b[36m"
            "#,
        )?;
        assert_eq!(config.app_name, "sliver");
        assert!(config.newline_after);
        assert_eq!(config.empty_chars, [' ', '\t']);
        assert_eq!(config.highlight.command, "\x1b[36m");
        assert_eq!(config.highlight.flag, HighlightConfig::default().flag);
        Ok(())
    }

    #[test]
    fn test_export_then_load() -> Result<(), anyhow::Error> {
        let config = Config {
            newline_before: true,
            continuation_prompt: "... ".to_string(),
            ..Config::default()
        };
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(config.to_toml()?.as_bytes())?;
        assert_eq!(Config::load(file.path())?, config);
        Ok(())
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = Config::from_toml("newline_after = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_render_prompt() {
        let config = Config {
            app_name: "app".to_string(),
            ..Config::default()
        };
        assert_eq!(config.render_prompt(""), "app > ");
        assert_eq!(config.render_prompt("client"), "app [client] > ");
    }
}
