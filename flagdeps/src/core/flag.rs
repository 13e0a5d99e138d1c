use super::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier of a feature flag, assigned at creation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagId(Uuid);

impl FlagId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FlagId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FlagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for FlagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlagId({})", self.0)
    }
}

impl FromStr for FlagId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| CoreError::InvalidFlagId(s.to_string()))
    }
}

/// Identity of whoever triggered a change (a user name, a service account).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Actor {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A named unit of enable/disable intent.
///
/// `enabled` is the flag's own intent only. Whether the flag is actually
/// active also depends on its dependencies and is computed by the graph,
/// never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    id: FlagId,
    title: String,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Flag {
    /// Creates a new flag with a fresh id.
    pub fn new(title: impl Into<String>, enabled: bool) -> Self {
        let now = Utc::now();
        Self {
            id: FlagId::new(),
            title: title.into(),
            enabled,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a flag from persisted fields.
    pub fn from_parts(
        id: FlagId,
        title: String,
        enabled: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            enabled,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> FlagId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sets the enabled bit, bumping `updated_at` only on an actual change.
    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.updated_at = Utc::now();
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// A flag together with its computed activation and direct dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagStatus {
    pub flag: Flag,
    pub is_active: bool,
    /// Titles of the flags this flag directly depends on, in insertion order.
    pub dependencies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_id_round_trips_through_string() {
        let id = FlagId::new();
        let parsed: FlagId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_flag_id_rejects_garbage() {
        let result = "not-a-uuid".parse::<FlagId>();
        assert!(matches!(result, Err(CoreError::InvalidFlagId(_))));
    }

    #[test]
    fn test_set_enabled_bumps_updated_at_only_on_change() {
        let mut flag = Flag::new("checkout", false);
        let before = flag.updated_at();

        flag.set_enabled(false);
        assert_eq!(flag.updated_at(), before);

        flag.set_enabled(true);
        assert!(flag.is_enabled());
        assert!(flag.updated_at() >= before);
    }

    #[test]
    fn test_flag_display_is_title() {
        assert_eq!(Flag::new("flag_a", true).to_string(), "flag_a");
    }
}
