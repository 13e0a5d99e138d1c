use crate::graph::GraphError;
use crate::storage::StorageError;
use thiserror::Error;

/// Engine layer error type for flagdeps.
///
/// Validation failures keep their typed [`GraphError`] so callers can match
/// on them; persistence failures wrap the [`StorageError`] of the backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The operation was rejected by graph validation.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A storage operation failed. Nothing was published.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// The validation failure, if this is one.
    pub fn as_graph(&self) -> Option<&GraphError> {
        match self {
            EngineError::Graph(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if a traversal was stopped by cancellation or its step
    /// limit.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            EngineError::Graph(GraphError::Cancelled)
                | EngineError::Graph(GraphError::TraversalLimitExceeded { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
