//! Error types for codec configuration
//!
//! Parse failures are reported with the engine's own
//! [`GraphError`](cannonball_core::GraphError) taxonomy; this module only
//! covers loading and validating a [`CodecConfig`](crate::CodecConfig).

use std::path::PathBuf;

/// Configuration loading or validation failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for [`CodecConfig`](crate::CodecConfig)
    #[error("failed to parse codec config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Indentation setting cannot be used for the requested direction
    #[error("invalid indent: {0}")]
    InvalidIndent(String),

    /// A bracket token is mapped more than once
    #[error("duplicate status token '[{0}]'")]
    DuplicateToken(String),

    /// Token override is malformed or names a status outside the variant's
    /// vocabulary
    #[error("invalid token override '[{token}]': {reason}")]
    InvalidToken {
        /// Offending token
        token: String,
        /// What was wrong with it
        reason: String,
    },
}

impl ConfigError {
    /// Create invalid token error
    pub fn invalid_token(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
