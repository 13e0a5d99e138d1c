//! Cooperative control over graph walks.
//!
//! The engine's algorithms are synchronous graph walks with no built-in size
//! bound. A [`Traversal`] is threaded through every walk and consulted once
//! per visited node, so callers can cancel a walk on a pathological graph or
//! cap its size.

use super::error::{GraphError, GraphResult};
use std::cell::Cell;
use tokio_util::sync::CancellationToken;

/// Per-operation traversal budget and cancellation handle.
///
/// One `Traversal` is meant to span a single logical operation; its step
/// counter accumulates across all walks performed on its behalf.
#[derive(Debug, Default)]
pub struct Traversal {
    cancel: Option<CancellationToken>,
    max_steps: Option<usize>,
    steps: Cell<usize>,
}

impl Traversal {
    /// A traversal with no cancellation and no step limit.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(cancel: Option<CancellationToken>, max_steps: Option<usize>) -> Self {
        Self {
            cancel,
            max_steps,
            steps: Cell::new(0),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Number of nodes visited so far.
    pub fn steps(&self) -> usize {
        self.steps.get()
    }

    /// Records one visited node, failing if the walk must stop.
    pub fn step(&self) -> GraphResult<()> {
        if let Some(token) = &self.cancel {
            if token.is_cancelled() {
                return Err(GraphError::Cancelled);
            }
        }

        let steps = self.steps.get() + 1;
        self.steps.set(steps);

        match self.max_steps {
            Some(limit) if steps > limit => Err(GraphError::TraversalLimitExceeded { limit }),
            _ => Ok(()),
        }
    }
}
