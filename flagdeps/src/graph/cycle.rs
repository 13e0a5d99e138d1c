//! Cycle detection for proposed dependency edges.
//!
//! Edges point from a dependent to its source. Adding `dependent -> source`
//! closes a cycle exactly when `dependent` is already reachable from
//! `source` by following existing depends-on edges, so the search is a
//! depth-first walk from `source` looking for `dependent`.
//!
//! The walk is iterative with an explicit stack, which doubles as the path
//! of the current branch. Outgoing edges are explored in insertion order.

use super::error::{CyclePath, GraphResult};
use super::flag_graph::FlagGraph;
use super::traversal::Traversal;
use crate::core::FlagId;
use std::collections::HashSet;

/// Checks whether adding `dependent -> source` would create a cycle.
///
/// Returns the cycle that would be formed, as titles from `dependent`
/// through `source` and back to `dependent`. A self-loop is reported as the
/// trivial two-element path; callers reject self-loops before getting here.
pub fn would_create_cycle(
    graph: &FlagGraph,
    dependent: FlagId,
    source: FlagId,
    traversal: &Traversal,
) -> GraphResult<Option<CyclePath>> {
    if dependent == source {
        let title = title_of(graph, dependent);
        return Ok(Some(CyclePath::new(vec![title.clone(), title])));
    }

    match find_path(graph, source, dependent, traversal)? {
        Some(path) => {
            let mut titles = Vec::with_capacity(path.len() + 1);
            titles.push(title_of(graph, dependent));
            titles.extend(path.iter().map(|id| title_of(graph, *id)));
            Ok(Some(CyclePath::new(titles)))
        }
        None => Ok(None),
    }
}

/// Depth-first search from `start` along depends-on edges.
///
/// Returns the visited path `start, ..., target` when `target` is reachable.
fn find_path(
    graph: &FlagGraph,
    start: FlagId,
    target: FlagId,
    traversal: &Traversal,
) -> GraphResult<Option<Vec<FlagId>>> {
    let mut visited = HashSet::new();
    // (node, index of the next source to explore)
    let mut stack: Vec<(FlagId, usize)> = Vec::new();

    traversal.step()?;
    visited.insert(start);
    stack.push((start, 0));

    while let Some(&(node, next)) = stack.last() {
        let Some(&candidate) = graph.sources(node).get(next) else {
            stack.pop();
            continue;
        };
        if let Some(top) = stack.last_mut() {
            top.1 += 1;
        }

        if candidate == target {
            let mut path: Vec<FlagId> = stack.iter().map(|(id, _)| *id).collect();
            path.push(target);
            return Ok(Some(path));
        }

        if visited.insert(candidate) {
            traversal.step()?;
            stack.push((candidate, 0));
        }
    }

    Ok(None)
}

fn title_of(graph: &FlagGraph, id: FlagId) -> String {
    graph
        .get(id)
        .map(|flag| flag.title().to_string())
        .unwrap_or_else(|| id.to_string())
}
