//! The flag engine: the operation surface over graph and storage.
//!
//! - config: engine tuning (traversal budget, cancellation)
//! - error: typed failures surfaced to callers
//! - flag_engine: write protocol (stage, persist, publish, emit) and queries

mod config;
mod error;
mod flag_engine;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use flag_engine::{auto_disable_reason, Engine};
