//! Core domain types for the flagdeps engine.
//!
//! # Domain Model
//! - [`Flag`]: a named boolean with its own enabled bit
//! - [`Dependency`]: a directed edge from a dependent flag to its source
//! - [`AuditEvent`] / [`EventKind`]: entries of the append-only audit ledger
//! - [`FlagStatus`]: a flag with its computed activation
//!
//! # Error Handling
//! - [`CoreError`]: parsing failures for persisted values

mod dependency;
mod error;
mod event;
mod flag;

pub use dependency::Dependency;
pub use error::{CoreError, Result};
pub use event::{AuditEvent, EventKind, DEFAULT_TOGGLE_REASON};
pub use flag::{Actor, Flag, FlagId, FlagStatus};
