use super::flag::{Actor, FlagId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A directed constraint: `dependent` cannot be active unless `source` is.
///
/// Titles are denormalized onto the edge because flag titles never change,
/// which keeps listing and error rendering free of extra lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    id: Uuid,
    dependent: FlagId,
    source: FlagId,
    dependent_title: String,
    source_title: String,
    creator: Option<Actor>,
    created_at: DateTime<Utc>,
}

impl Dependency {
    pub fn new(
        dependent: FlagId,
        dependent_title: impl Into<String>,
        source: FlagId,
        source_title: impl Into<String>,
        creator: Option<Actor>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            dependent,
            source,
            dependent_title: dependent_title.into(),
            source_title: source_title.into(),
            creator,
            created_at: Utc::now(),
        }
    }

    /// Rebuilds an edge from persisted fields.
    pub fn from_parts(
        id: Uuid,
        dependent: FlagId,
        dependent_title: String,
        source: FlagId,
        source_title: String,
        creator: Option<Actor>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            dependent,
            source,
            dependent_title,
            source_title,
            creator,
            created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dependent(&self) -> FlagId {
        self.dependent
    }

    pub fn source(&self) -> FlagId {
        self.source
    }

    pub fn dependent_title(&self) -> &str {
        &self.dependent_title
    }

    pub fn source_title(&self) -> &str {
        &self.source_title
    }

    pub fn creator(&self) -> Option<&Actor> {
        self.creator.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.dependent_title, self.source_title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_display() {
        let dep = Dependency::new(FlagId::new(), "flag_b", FlagId::new(), "flag_a", None);
        assert_eq!(dep.to_string(), "flag_b -> flag_a");
    }
}
