use thiserror::Error;

/// Core error type for the flagdeps domain model.
///
/// Raised when persisted or externally supplied values cannot be turned back
/// into domain types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoreError {
    /// An event kind string did not match any known kind.
    #[error("invalid event kind: {0}")]
    InvalidEventKind(String),

    /// A flag identifier could not be parsed.
    #[error("invalid flag id: {0}")]
    InvalidFlagId(String),

    /// A dependency or event identifier could not be parsed.
    #[error("invalid record id: {0}")]
    InvalidRecordId(String),

    /// A stored timestamp is outside the representable range.
    #[error("invalid timestamp: {0} ms")]
    InvalidTimestamp(i64),
}

pub type Result<T> = std::result::Result<T, CoreError>;
