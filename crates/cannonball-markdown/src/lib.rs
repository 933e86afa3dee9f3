//! Cannonball Markdown
//!
//! Bidirectional conversion between indented bullet outlines and
//! [`Document`]s.
//!
//! # Format
//!
//! ```text
//! - [?] Pick DB ^q1
//!     - [a] SQL
//!     - [a] NoSQL
//!     - [D] Use ^alt(NoSQL)
//! - [ ] Migrate data [[#^q1]]
//! ```
//!
//! Each non-blank line is an indentation prefix, a `-` bullet, an optional
//! bracket token selecting variant and explicit status, free text, then
//! optional `[[#^anchor]]` references, a `^alt(target)` choice and a
//! trailing `^anchor`. Lines without a bullet continue the previous entry.
//! A choice names its Alternative by anchor, by text, or as `#N`, the N-th
//! Alternative in document order. Markup characters inside text are
//! backslash-escaped.
//!
//! # Round trip
//!
//! Parsing the output of [`Codec::serialize`] reproduces a document whose
//! [`OutlineSnapshot`](cannonball_core::OutlineSnapshot) equals the
//! original's.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod escape;
pub mod lexer;
pub mod parser;
pub mod serializer;
pub mod tokens;

pub use config::{CodecConfig, IndentStyle};
pub use error::{ConfigError, ConfigResult};
pub use parser::Parser;
pub use serializer::Serializer;
pub use tokens::{Marker, TokenOverride, TokenTable};

use cannonball_core::{Document, Result};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configured markdown codec
#[derive(Debug, Clone)]
pub struct Codec {
    config: CodecConfig,
    tokens: TokenTable,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            config: CodecConfig::default(),
            tokens: TokenTable::standard(),
        }
    }
}

impl Codec {
    /// Build a codec from validated settings
    ///
    /// # Errors
    /// Anything [`CodecConfig::validate`] reports.
    pub fn new(config: CodecConfig) -> ConfigResult<Self> {
        config.validate()?;
        let tokens = config.token_table()?;
        Ok(Self { config, tokens })
    }

    /// Active settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Active token table
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    /// Parse markdown into a fully resolved and propagated document
    ///
    /// # Errors
    /// See [`Parser::parse`].
    pub fn parse(&self, input: &str) -> Result<Document> {
        Parser::new(&self.tokens, self.config.indent).parse(input)
    }

    /// Render a document as markdown
    #[must_use]
    pub fn serialize(&self, doc: &Document) -> String {
        let unit = self
            .config
            .write_style()
            .unit()
            .unwrap_or_else(|| "    ".to_string());
        Serializer::new(&self.tokens, unit).serialize(doc)
    }
}

/// Parse with the default codec
///
/// # Errors
/// See [`Parser::parse`].
pub fn parse(input: &str) -> Result<Document> {
    Codec::default().parse(input)
}

/// Serialize with the default codec
#[must_use]
pub fn serialize(doc: &Document) -> String {
    Codec::default().serialize(doc)
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for reading and writing outlines
    pub use crate::config::{CodecConfig, IndentStyle};
    pub use crate::error::ConfigError;
    pub use crate::{parse, serialize, Codec};
}
