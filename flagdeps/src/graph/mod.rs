//! Dependency graph for feature flags
//!
//! This module provides the flag and edge stores together with the
//! algorithms that keep them consistent:
//!
//! - Cycle detection on every edge insertion, reporting the offending path
//! - Memoized activation evaluation (`is_active`, `can_become_enabled`)
//! - Blocker collection explaining why a flag cannot be enabled
//! - Cascading auto-disable over dependents
//!
//! # Design Principles
//!
//! This module hides the graph representation (adjacency lists keyed by
//! flag id) and exposes only abstract operations. It does no I/O and no
//! locking: callers own the write scope around a mutation.

mod activation;
mod cascade;
mod cycle;
mod error;
mod flag_graph;
mod traversal;

pub use activation::Evaluator;
pub use cascade::{cascade_disable, AutoDisabled};
pub use cycle::would_create_cycle;
pub use error::{CyclePath, GraphError, GraphResult};
pub use flag_graph::{validate_title, FlagGraph, MAX_TITLE_LEN};
pub use traversal::Traversal;
