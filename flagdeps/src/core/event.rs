use super::error::{CoreError, Result};
use super::flag::{Actor, FlagId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Reason used for toggles that arrive without one.
pub const DEFAULT_TOGGLE_REASON: &str = "No reason provided.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Create,
    Toggle,
    AutoDisable,
    DependencyAdd,
    DependencyRemove,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Toggle => "toggle",
            EventKind::AutoDisable => "auto_disable",
            EventKind::DependencyAdd => "dependency_add",
            EventKind::DependencyRemove => "dependency_remove",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(EventKind::Create),
            "toggle" => Ok(EventKind::Toggle),
            "auto_disable" => Ok(EventKind::AutoDisable),
            "dependency_add" => Ok(EventKind::DependencyAdd),
            "dependency_remove" => Ok(EventKind::DependencyRemove),
            _ => Err(CoreError::InvalidEventKind(s.to_string())),
        }
    }
}

/// One entry of the append-only audit ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    id: Uuid,
    flag: FlagId,
    flag_title: String,
    kind: EventKind,
    actor: Option<Actor>,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        flag: FlagId,
        flag_title: impl Into<String>,
        kind: EventKind,
        actor: Option<Actor>,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            flag,
            flag_title: flag_title.into(),
            kind,
            actor,
            reason,
            created_at: Utc::now(),
        }
    }

    /// Rebuilds an event from persisted fields.
    pub fn from_parts(
        id: Uuid,
        flag: FlagId,
        flag_title: String,
        kind: EventKind,
        actor: Option<Actor>,
        reason: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            flag,
            flag_title,
            kind,
            actor,
            reason,
            created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn flag(&self) -> FlagId {
        self.flag
    }

    pub fn flag_title(&self) -> &str {
        &self.flag_title
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.flag_title, self.created_at)
    }
}
