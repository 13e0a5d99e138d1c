//! Storage layer for the flagdeps engine.
//!
//! This module provides trait-based interfaces for persisting the flag graph
//! and the audit ledger, with multiple backend implementations:
//!
//! - [`InMemoryFlagStore`] / [`InMemoryEventLog`]: in-process storage for
//!   tests, demos and embedding
//! - [`SqliteFlagStore`] / [`SqliteEventLog`]: persistent SQLite storage with
//!   connection pooling (feature `sqlite`)
//!
//! # Example
//!
//! ```no_run
//! use flagdeps::storage::{FlagStore, InMemoryFlagStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryFlagStore::new();
//! let flags = store.load_flags().await?;
//! assert!(flags.is_empty());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

mod changes;
mod error;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod memory;

// Re-export public types
pub use changes::ChangeSet;
pub use error::{Result, StorageError};
pub use memory::{InMemoryEventLog, InMemoryFlagStore};

#[cfg(feature = "sqlite")]
pub use sqlite::{PoolConfig, SqliteEventLog, SqliteFlagStore};

use crate::core::{AuditEvent, Dependency, Flag, FlagId};

/// Trait for flag graph storage backends.
///
/// The engine loads the whole graph once and afterwards only writes change
/// sets, so backends never see traversal-time reads. Implementations must
/// be thread-safe.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// All flags, in creation order.
    async fn load_flags(&self) -> Result<Vec<Flag>>;

    /// All dependencies, in creation order.
    async fn load_dependencies(&self) -> Result<Vec<Dependency>>;

    /// Atomically applies one operation's writes.
    async fn apply(&self, changes: &ChangeSet) -> Result<()>;

    /// Deletes all flags and dependencies.
    async fn reset(&self) -> Result<()>;

    /// Closes the store.
    async fn close(&self) -> Result<()>;
}

/// Receiver for the engine's audit events.
///
/// Recording is the only required operation; reading the ledger back is
/// optional and returns `StorageError::Unsupported` by default.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Appends events in the given order.
    async fn record(&self, events: &[AuditEvent]) -> Result<()>;

    /// The whole ledger, oldest first.
    ///
    /// # Default Implementation
    ///
    /// Returns `StorageError::Unsupported`.
    async fn events(&self) -> Result<Vec<AuditEvent>> {
        Err(StorageError::Unsupported(
            "reading events not implemented for this sink".to_string(),
        ))
    }

    /// The ledger entries for one flag, oldest first.
    async fn events_for_flag(&self, flag: FlagId) -> Result<Vec<AuditEvent>> {
        let events = self.events().await?;
        Ok(events.into_iter().filter(|e| e.flag() == flag).collect())
    }
}

// Implement FlagStore for Box<dyn FlagStore> to allow type-erased storage
#[async_trait]
impl FlagStore for Box<dyn FlagStore> {
    async fn load_flags(&self) -> Result<Vec<Flag>> {
        (**self).load_flags().await
    }

    async fn load_dependencies(&self) -> Result<Vec<Dependency>> {
        (**self).load_dependencies().await
    }

    async fn apply(&self, changes: &ChangeSet) -> Result<()> {
        (**self).apply(changes).await
    }

    async fn reset(&self) -> Result<()> {
        (**self).reset().await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}

#[async_trait]
impl EventSink for Box<dyn EventSink> {
    async fn record(&self, events: &[AuditEvent]) -> Result<()> {
        (**self).record(events).await
    }

    async fn events(&self) -> Result<Vec<AuditEvent>> {
        (**self).events().await
    }

    async fn events_for_flag(&self, flag: FlagId) -> Result<Vec<AuditEvent>> {
        (**self).events_for_flag(flag).await
    }
}
