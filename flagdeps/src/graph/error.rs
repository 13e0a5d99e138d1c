//! Error types for graph operations
//!
//! Every failure here is a recoverable, caller-facing validation result.
//! A failed operation leaves the graph exactly as it was.

use crate::core::FlagId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// The chain of flag titles a rejected edge would have closed into a cycle.
///
/// Starts and ends with the dependent flag of the proposed edge, for example
/// `B -> A -> B` when `A -> B` exists and `B -> A` is proposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclePath(Vec<String>);

impl CyclePath {
    pub fn new(titles: Vec<String>) -> Self {
        Self(titles)
    }

    pub fn titles(&self) -> &[String] {
        &self.0
    }

    /// Number of distinct flags taking part in the cycle.
    pub fn len(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CyclePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" -> "))
    }
}

/// Errors that can occur during graph operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GraphError {
    /// A flag with this title already exists
    #[error("a feature flag titled '{title}' already exists")]
    DuplicateTitle {
        /// The clashing title
        title: String,
    },

    /// The title is empty or too long
    #[error("invalid flag title '{title}': {reason}")]
    InvalidTitle {
        /// The rejected title
        title: String,
        /// Why it was rejected
        reason: String,
    },

    /// The edge already exists
    #[error("'{dependent_title}' already depends on '{source_title}'")]
    DuplicateEdge {
        /// Title of the dependent flag
        dependent_title: String,
        /// Title of the source flag
        source_title: String,
    },

    /// A dependency named a source flag title that does not exist
    #[error("source flag '{title}' does not exist")]
    UnknownSourceFlag {
        /// The missing title
        title: String,
    },

    /// A lookup by title found nothing
    #[error("feature flag '{title}' does not exist")]
    UnknownFlagTitle {
        /// The missing title
        title: String,
    },

    /// A lookup by id found nothing
    #[error("feature flag not found: {id}")]
    FlagNotFound {
        /// The missing id
        id: FlagId,
    },

    /// A dependency id is unknown
    #[error("dependency not found: {id}")]
    DependencyNotFound {
        /// The missing dependency id
        id: Uuid,
    },

    /// A flag was asked to depend on itself
    #[error("feature flag '{title}' cannot depend on itself")]
    SelfDependency {
        /// Title of the flag
        title: String,
    },

    /// The proposed edge would close a cycle
    #[error("dependency would form a cycle: {path}")]
    CycleDetected {
        /// The cycle the edge would have formed
        path: CyclePath,
    },

    /// Enabling was refused because dependencies are not active
    #[error("cannot enable '{flag}': {}", describe_blockers(.blockers))]
    UnmetDependencies {
        /// Title of the flag that was to be enabled
        flag: String,
        /// Titles of the flags blocking it
        blockers: Vec<String>,
    },

    /// The caller cancelled a traversal
    #[error("graph traversal cancelled")]
    Cancelled,

    /// A traversal visited more nodes than the configured budget
    #[error("graph traversal exceeded {limit} steps")]
    TraversalLimitExceeded {
        /// The configured budget
        limit: usize,
    },
}

fn describe_blockers(blockers: &[String]) -> String {
    if blockers.is_empty() {
        return "one or more of its dependencies (direct or indirect) is not active".to_string();
    }
    let quoted: Vec<String> = blockers.iter().map(|b| format!("'{}'", b)).collect();
    format!("blocked by {}", quoted.join(", "))
}

impl GraphError {
    pub fn duplicate_title(title: impl Into<String>) -> Self {
        Self::DuplicateTitle {
            title: title.into(),
        }
    }

    pub fn invalid_title(title: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTitle {
            title: title.into(),
            reason: reason.into(),
        }
    }

    pub fn duplicate_edge(dependent: impl Into<String>, source: impl Into<String>) -> Self {
        Self::DuplicateEdge {
            dependent_title: dependent.into(),
            source_title: source.into(),
        }
    }

    pub fn unknown_source(title: impl Into<String>) -> Self {
        Self::UnknownSourceFlag {
            title: title.into(),
        }
    }

    pub fn unknown_title(title: impl Into<String>) -> Self {
        Self::UnknownFlagTitle {
            title: title.into(),
        }
    }

    pub fn flag_not_found(id: FlagId) -> Self {
        Self::FlagNotFound { id }
    }

    pub fn dependency_not_found(id: Uuid) -> Self {
        Self::DependencyNotFound { id }
    }

    pub fn self_dependency(title: impl Into<String>) -> Self {
        Self::SelfDependency {
            title: title.into(),
        }
    }

    pub fn cycle(path: CyclePath) -> Self {
        Self::CycleDetected { path }
    }

    pub fn unmet_dependencies(flag: impl Into<String>, blockers: Vec<String>) -> Self {
        Self::UnmetDependencies {
            flag: flag.into(),
            blockers,
        }
    }
}
