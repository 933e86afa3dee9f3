//! Error types for the graph manager

use cannonball_core::GraphError;
use cannonball_markdown::ConfigError;

/// Failures surfaced by [`GraphManager`](crate::GraphManager)
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// Engine or codec error
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Codec configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Persistence collaborator failed
    #[error("store error for '{key}': {source}")]
    Store {
        /// Storage key
        key: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Snapshot JSON could not be read or written
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl ManagerError {
    /// Create store error for a key
    pub fn store(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Store {
            key: key.into(),
            source,
        }
    }

    /// Engine error, if this is one
    #[must_use]
    pub fn as_graph(&self) -> Option<&GraphError> {
        match self {
            Self::Graph(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for manager operations
pub type ManagerResult<T> = Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use cannonball_core::StructuralError;

    #[test]
    fn graph_errors_are_transparent() {
        let err: ManagerError = GraphError::from(StructuralError::RootImmutable).into();
        assert_eq!(
            err.to_string(),
            "structural error: the document root cannot be modified"
        );
        assert!(err.as_graph().is_some());
    }

    #[test]
    fn store_error_names_key() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = ManagerError::store("plan", io);
        assert_eq!(err.to_string(), "store error for 'plan': missing");
        assert!(err.as_graph().is_none());
    }
}
