//! Cascading auto-disable.
//!
//! When flags are forced to disabled, every flag depending on them that can
//! no longer be active is forced to disabled as well, transitively. The walk
//! is breadth-first over incoming edges (source to dependents) and stops on
//! any branch whose flag is already disabled or still active.

use super::activation::Evaluator;
use super::error::GraphResult;
use super::flag_graph::FlagGraph;
use super::traversal::Traversal;
use crate::core::{Flag, FlagId};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// A flag turned off by a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoDisabled {
    /// The flag that was disabled
    pub flag: FlagId,
    /// The disabled source through which the cascade reached it
    pub via: FlagId,
}

/// Propagates a disable from `roots`, whose enabled bits are already false.
///
/// Each flag is disabled at most once per run. Returns the flags disabled,
/// in order. On error every flag touched by this run is restored.
pub fn cascade_disable(
    graph: &mut FlagGraph,
    roots: &[FlagId],
    traversal: &Traversal,
) -> GraphResult<Vec<AutoDisabled>> {
    let mut originals: Vec<Flag> = Vec::new();
    match propagate(graph, roots, traversal, &mut originals) {
        Ok(disabled) => Ok(disabled),
        Err(e) => {
            for flag in originals {
                graph.restore_flag(flag);
            }
            Err(e)
        }
    }
}

fn propagate(
    graph: &mut FlagGraph,
    roots: &[FlagId],
    traversal: &Traversal,
    originals: &mut Vec<Flag>,
) -> GraphResult<Vec<AutoDisabled>> {
    let mut seen: HashSet<FlagId> = roots.iter().copied().collect();
    let mut frontier: VecDeque<FlagId> = roots.iter().copied().collect();
    let mut disabled = Vec::new();

    while let Some(current) = frontier.pop_front() {
        traversal.step()?;

        let dependents = graph.dependents(current).to_vec();
        for dependent in dependents {
            if !seen.insert(dependent) {
                continue;
            }

            let flag = graph.flag(dependent)?;
            if !flag.is_enabled() {
                continue;
            }
            if Evaluator::new(graph, traversal).is_active(dependent)? {
                continue;
            }

            originals.push(flag.clone());
            graph.set_enabled(dependent, false)?;
            debug!(flag = %dependent, via = %current, "auto-disabled flag");
            disabled.push(AutoDisabled {
                flag: dependent,
                via: current,
            });
            frontier.push_back(dependent);
        }
    }

    Ok(disabled)
}
