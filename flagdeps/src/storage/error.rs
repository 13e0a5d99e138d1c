use crate::core::{CoreError, FlagId};
use thiserror::Error;
use uuid::Uuid;

/// Storage layer error type for the flagdeps engine.
///
/// Wraps underlying database and decoding errors while preserving the
/// error chain for debugging.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// A database operation failed.
    #[cfg(feature = "sqlite")]
    #[error("database operation failed")]
    Database(#[from] sqlx::Error),

    /// Connecting to the backend failed or stored data could not be read.
    #[error("connection error: {0}")]
    Connection(String),

    /// A stored value could not be decoded into a domain type.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// A change set updated a flag the store does not hold.
    #[error("flag not found in storage: {0}")]
    FlagNotFound(FlagId),

    /// A change set removed a dependency the store does not hold.
    #[error("dependency not found in storage: {0}")]
    DependencyNotFound(Uuid),

    /// A change set would break a uniqueness constraint.
    #[error("storage conflict: {0}")]
    Conflict(String),

    /// The backend does not support the operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
