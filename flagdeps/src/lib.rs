//! flagdeps: feature flags with dependencies
//!
//! `flagdeps` manages named boolean feature flags whose activation depends on
//! other flags. A flag is *active* only when it is enabled and every flag it
//! depends on, directly or transitively, is active.
//!
//! # Features
//!
//! - **Acyclic by construction**: every new edge is checked, and a rejected
//!   edge reports the cycle it would close (`B -> A -> B`)
//! - **Guarded enables**: a flag cannot be enabled while a dependency is off,
//!   and the error names the blocking flags
//! - **Cascading disables**: turning a flag off turns off every dependent
//!   that can no longer be active, each exactly once
//! - **Audit ledger**: every state change is recorded as an [`AuditEvent`]
//! - **Atomic writes**: each operation persists as one change set or not at all
//!
//! # Quick Start
//!
//! ```no_run
//! use flagdeps::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::open(
//!         Arc::new(InMemoryFlagStore::new()),
//!         Arc::new(InMemoryEventLog::new()),
//!         EngineConfig::default(),
//!     )
//!     .await?;
//!
//!     let auth = engine.create_flag("auth", true, None).await?;
//!     let dashboard = engine
//!         .create_flag_with_dependencies("dashboard", true, &["auth"], None)
//!         .await?;
//!
//!     engine.toggle_flag(auth.id(), Some("auth outage"), None).await?;
//!     assert!(!engine.is_active(dashboard.id()).await?);
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`core`]: domain types (flags, edges, audit events)
//! - [`graph`]: the in-memory graph and its algorithms (hides representation)
//! - [`storage`]: persistence and event sinks (hides database choice and schema)
//! - [`engine`]: the operation surface (hides locking and the write protocol)

pub mod core;
pub mod engine;
pub mod graph;
pub mod storage;

// Re-export commonly used types for convenience
pub use core::{
    Actor, AuditEvent, CoreError, Dependency, EventKind, Flag, FlagId, FlagStatus,
    DEFAULT_TOGGLE_REASON,
};

pub use engine::{Engine, EngineConfig, EngineError, Result as EngineResult};

pub use graph::{CyclePath, FlagGraph, GraphError, GraphResult, Traversal};

pub use storage::{
    ChangeSet, EventSink, FlagStore, InMemoryEventLog, InMemoryFlagStore,
    Result as StorageResult, StorageError,
};

#[cfg(feature = "sqlite")]
pub use storage::{PoolConfig, SqliteEventLog, SqliteFlagStore};

// Re-export dependencies used in public API
pub use tokio_util::sync::CancellationToken;
pub use uuid;

/// Prelude module for convenient glob imports
///
/// # Example
///
/// ```
/// use flagdeps::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{Actor, AuditEvent, Dependency, EventKind, Flag, FlagId, FlagStatus};

    pub use crate::engine::{Engine, EngineConfig, EngineError};

    pub use crate::graph::{CyclePath, GraphError};

    pub use crate::storage::{EventSink, FlagStore, InMemoryEventLog, InMemoryFlagStore};

    #[cfg(feature = "sqlite")]
    pub use crate::storage::{SqliteEventLog, SqliteFlagStore};

    pub use std::sync::Arc;
    pub use tokio_util::sync::CancellationToken;
}
