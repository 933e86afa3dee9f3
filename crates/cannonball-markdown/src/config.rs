//! Codec configuration
//!
//! ```toml
//! indent = "auto"                 # or "tabs", or { spaces = 2 }
//! write_indent = { spaces = 4 }   # "tabs" or { spaces = n }
//!                                 # (default: `indent` when fixed, else 4 spaces)
//!
//! [[tokens]]
//! token = "X"
//! variant = "Task"
//! status = "done"
//! ```
//!
//! `CANNONBALL_WRITE_INDENT` (`tabs` or a number of spaces) overrides
//! `write_indent` when the CLI loads its configuration.

use crate::error::{ConfigError, ConfigResult};
use crate::tokens::{TokenOverride, TokenTable};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding [`CodecConfig::write_indent`]
pub const WRITE_INDENT_ENV: &str = "CANNONBALL_WRITE_INDENT";

/// Indentation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentStyle {
    /// Detect from the first indented bullet (parsing only)
    #[default]
    Auto,
    /// One tab per level
    Tabs,
    /// `n` spaces per level
    Spaces(usize),
}

impl IndentStyle {
    /// Text of one indentation level; `None` for [`IndentStyle::Auto`]
    #[must_use]
    pub fn unit(self) -> Option<String> {
        match self {
            IndentStyle::Auto => None,
            IndentStyle::Tabs => Some("\t".to_string()),
            IndentStyle::Spaces(n) => Some(" ".repeat(n)),
        }
    }

    /// Parse `tabs`, `auto` or a space count
    ///
    /// # Errors
    /// [`ConfigError::InvalidIndent`] for anything else.
    pub fn parse(value: &str) -> ConfigResult<Self> {
        match value.trim() {
            "tabs" => Ok(IndentStyle::Tabs),
            "auto" => Ok(IndentStyle::Auto),
            n => n
                .parse::<usize>()
                .map(IndentStyle::Spaces)
                .map_err(|_| ConfigError::InvalidIndent(format!("'{value}' is not tabs, auto or a number"))),
        }
    }
}

/// Markdown codec settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Indentation expected when parsing
    pub indent: IndentStyle,
    /// Indentation written by the serializer; see [`CodecConfig::write_style`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_indent: Option<IndentStyle>,
    /// Additional bracket tokens
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<TokenOverride>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            indent: IndentStyle::Auto,
            write_indent: None,
            tokens: Vec::new(),
        }
    }
}

impl CodecConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// [`ConfigError::Toml`] for syntax or shape errors, plus anything
    /// [`CodecConfig::validate`] reports.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`CodecConfig::from_toml_str`].
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), tokens = config.tokens.len(), "codec config loaded");
        Ok(config)
    }

    /// Apply `CANNONBALL_WRITE_INDENT` if set
    ///
    /// # Errors
    /// [`ConfigError::InvalidIndent`] for unusable values.
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Ok(value) = std::env::var(WRITE_INDENT_ENV) {
            self.write_indent = Some(IndentStyle::parse(&value)?);
            self.validate()?;
        }
        Ok(())
    }

    /// Indentation the serializer writes
    ///
    /// An explicit `write_indent` wins. Otherwise a fixed `indent` is
    /// reused so the output parses under the same settings, and with
    /// `indent = auto` four spaces are written.
    #[must_use]
    pub fn write_style(&self) -> IndentStyle {
        match (self.write_indent, self.indent) {
            (Some(style), _) => style,
            (None, IndentStyle::Auto) => IndentStyle::Spaces(4),
            (None, fixed) => fixed,
        }
    }

    /// Check indentation settings and token overrides
    ///
    /// # Errors
    /// [`ConfigError::InvalidIndent`] for `write_indent = auto`, zero
    /// spaces, or a `write_indent` that a fixed `indent` would not read
    /// back; token errors from [`TokenTable::with_overrides`].
    pub fn validate(&self) -> ConfigResult<()> {
        match self.write_style() {
            IndentStyle::Auto => {
                return Err(ConfigError::InvalidIndent(
                    "write_indent must be tabs or a number of spaces".into(),
                ))
            }
            IndentStyle::Spaces(0) => {
                return Err(ConfigError::InvalidIndent("write_indent cannot be 0 spaces".into()))
            }
            _ => {}
        }
        if self.indent == IndentStyle::Spaces(0) {
            return Err(ConfigError::InvalidIndent("indent cannot be 0 spaces".into()));
        }
        if self.indent != IndentStyle::Auto && self.write_style() != self.indent {
            return Err(ConfigError::InvalidIndent(format!(
                "write_indent {:?} does not match indent {:?}",
                self.write_style(),
                self.indent
            )));
        }
        self.token_table().map(|_| ())
    }

    /// Token table with this config's overrides applied
    ///
    /// # Errors
    /// See [`TokenTable::with_overrides`].
    pub fn token_table(&self) -> ConfigResult<TokenTable> {
        TokenTable::with_overrides(&self.tokens)
    }
}
