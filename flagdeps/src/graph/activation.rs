//! Activation evaluation.
//!
//! A flag is active iff it is enabled and every flag it depends on is
//! active, recursively. One [`Evaluator`] covers one top-level query: its
//! memo map guarantees each flag is evaluated at most once, so diamonds of
//! shared dependencies cost linear rather than exponential time.

use super::error::GraphResult;
use super::flag_graph::FlagGraph;
use super::traversal::Traversal;
use crate::core::FlagId;
use std::collections::{HashMap, HashSet};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current DFS stack
    Visiting,
    Active,
    Inactive,
}

/// Memoizing activation evaluator over a borrowed graph.
#[derive(Debug)]
pub struct Evaluator<'g, 't> {
    graph: &'g FlagGraph,
    traversal: &'t Traversal,
    memo: HashMap<FlagId, Mark>,
}

impl<'g, 't> Evaluator<'g, 't> {
    pub fn new(graph: &'g FlagGraph, traversal: &'t Traversal) -> Self {
        Self {
            graph,
            traversal,
            memo: HashMap::new(),
        }
    }

    /// Returns whether the flag is enabled and all of its dependencies are
    /// active. Stops at the first inactive dependency.
    pub fn is_active(&mut self, id: FlagId) -> GraphResult<bool> {
        self.graph.flag(id)?;
        self.eval(id)
    }

    /// Returns whether the flag would be active if it were enabled, ignoring
    /// its own enabled bit.
    pub fn can_become_enabled(&mut self, id: FlagId) -> GraphResult<bool> {
        let flag = self.graph.flag(id)?;
        match self.memo.get(&id) {
            Some(Mark::Active) => return Ok(true),
            Some(Mark::Inactive) if flag.is_enabled() => return Ok(false),
            _ => {}
        }

        self.traversal.step()?;
        let previous = self.memo.insert(id, Mark::Visiting);
        let result = self.dependencies_active(id);
        // The flag's own mark reflects its enabled bit, which was ignored here.
        match previous {
            Some(mark) => self.memo.insert(id, mark),
            None => self.memo.remove(&id),
        };
        result
    }

    /// The first direct dependency of `id`, in edge order, that is not
    /// active. `None` when every dependency is active.
    pub fn first_inactive_source(&mut self, id: FlagId) -> GraphResult<Option<FlagId>> {
        self.graph.flag(id)?;
        let graph = self.graph;
        for &source in graph.sources(id) {
            if !self.eval(source)? {
                return Ok(Some(source));
            }
        }
        Ok(None)
    }

    /// Collects the flags keeping `id` from becoming active.
    ///
    /// Walks the full dependency set without short-circuiting. A disabled
    /// dependency is a blocker and is not descended into; an enabled
    /// dependency that cannot be active is descended into to find what
    /// blocks it. Results are deduplicated and in discovery order.
    pub fn blockers(&mut self, id: FlagId) -> GraphResult<Vec<FlagId>> {
        self.graph.flag(id)?;
        let mut visited = HashSet::new();
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        self.collect_blockers(id, &mut visited, &mut found, &mut seen)?;
        Ok(found)
    }

    fn eval(&mut self, id: FlagId) -> GraphResult<bool> {
        match self.memo.get(&id) {
            Some(Mark::Active) => return Ok(true),
            Some(Mark::Inactive) => return Ok(false),
            Some(Mark::Visiting) => {
                warn!(flag = %id, "flag revisited during activation evaluation, treating branch as inactive");
                return Ok(false);
            }
            None => {}
        }

        self.traversal.step()?;
        // Edges may reference a flag missing from externally loaded data.
        let enabled = self.graph.get(id).is_some_and(|flag| flag.is_enabled());
        if !enabled {
            self.memo.insert(id, Mark::Inactive);
            return Ok(false);
        }

        self.memo.insert(id, Mark::Visiting);
        let active = self.dependencies_active(id)?;
        let mark = if active { Mark::Active } else { Mark::Inactive };
        self.memo.insert(id, mark);
        Ok(active)
    }

    fn dependencies_active(&mut self, id: FlagId) -> GraphResult<bool> {
        let graph = self.graph;
        for &source in graph.sources(id) {
            if !self.eval(source)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn collect_blockers(
        &mut self,
        id: FlagId,
        visited: &mut HashSet<FlagId>,
        found: &mut Vec<FlagId>,
        seen: &mut HashSet<FlagId>,
    ) -> GraphResult<()> {
        if !visited.insert(id) {
            return Ok(());
        }
        self.traversal.step()?;

        let graph = self.graph;
        for &source in graph.sources(id) {
            let enabled = graph.get(source).is_some_and(|flag| flag.is_enabled());
            if !enabled {
                if seen.insert(source) {
                    found.push(source);
                }
            } else if !self.eval(source)? {
                self.collect_blockers(source, visited, found, seen)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Dependency, Flag};

    fn build(flags: &[(&str, bool)], edges: &[(usize, usize)]) -> (FlagGraph, Vec<FlagId>) {
        let mut graph = FlagGraph::new();
        let t = Traversal::unbounded();
        let ids: Vec<FlagId> = flags
            .iter()
            .map(|(title, enabled)| graph.add_flag(title, *enabled).unwrap().id())
            .collect();
        for (dependent, source) in edges {
            graph
                .add_dependency(ids[*dependent], ids[*source], None, &t)
                .unwrap();
        }
        (graph, ids)
    }

    #[test]
    fn test_no_dependencies() {
        let (graph, ids) = build(&[("on", true), ("off", false)], &[]);
        let t = Traversal::unbounded();
        assert!(Evaluator::new(&graph, &t).is_active(ids[0]).unwrap());
        assert!(!Evaluator::new(&graph, &t).is_active(ids[1]).unwrap());
    }

    #[test]
    fn test_transitive_dependency() {
        // c -> b -> a, a disabled
        let (graph, ids) = build(
            &[("a", false), ("b", true), ("c", true)],
            &[(1, 0), (2, 1)],
        );
        let t = Traversal::unbounded();
        let mut evaluator = Evaluator::new(&graph, &t);
        assert!(!evaluator.is_active(ids[2]).unwrap());
        assert!(!evaluator.is_active(ids[1]).unwrap());
    }

    #[test]
    fn test_multiple_dependencies() {
        let (graph, ids) = build(
            &[("a", true), ("b", true), ("c", true)],
            &[(2, 0), (2, 1)],
        );
        let t = Traversal::unbounded();
        assert!(graph.is_active(ids[2], &t).unwrap());

        let (graph, ids) = build(
            &[("a", true), ("b", false), ("c", true)],
            &[(2, 0), (2, 1)],
        );
        assert!(!graph.is_active(ids[2], &t).unwrap());
    }

    #[test]
    fn test_diamond_evaluates_each_flag_once() {
        // a depends on b and c, both depend on d
        let (graph, ids) = build(
            &[("a", true), ("b", true), ("c", true), ("d", true)],
            &[(0, 1), (0, 2), (1, 3), (2, 3)],
        );
        let t = Traversal::unbounded();
        assert!(Evaluator::new(&graph, &t).is_active(ids[0]).unwrap());
        assert_eq!(t.steps(), 4);
    }

    #[test]
    fn test_can_become_enabled_ignores_own_bit() {
        let (graph, ids) = build(&[("auth", true), ("dashboard", false)], &[(1, 0)]);
        let t = Traversal::unbounded();
        let mut evaluator = Evaluator::new(&graph, &t);
        assert!(!evaluator.is_active(ids[1]).unwrap());
        assert!(evaluator.can_become_enabled(ids[1]).unwrap());
        // the own mark is restored afterwards
        assert!(!evaluator.is_active(ids[1]).unwrap());
    }

    #[test]
    fn test_blockers_stop_at_disabled_flags() {
        // top -> mid -> root(disabled), top -> other(disabled), mid -> other
        let (graph, ids) = build(
            &[("root", false), ("mid", true), ("other", false), ("top", false)],
            &[(1, 0), (3, 1), (3, 2), (1, 2)],
        );
        let t = Traversal::unbounded();
        let blockers = Evaluator::new(&graph, &t).blockers(ids[3]).unwrap();
        assert_eq!(blockers, vec![ids[0], ids[2]]);
    }

    #[test]
    fn test_blockers_empty_when_satisfied() {
        let (graph, ids) = build(&[("a", true), ("b", false)], &[(1, 0)]);
        let t = Traversal::unbounded();
        assert!(Evaluator::new(&graph, &t).blockers(ids[1]).unwrap().is_empty());
    }

    #[test]
    fn test_cycle_in_loaded_data_is_inactive() {
        let a = Flag::new("a", true);
        let b = Flag::new("b", true);
        let edges = vec![
            Dependency::new(a.id(), "a", b.id(), "b", None),
            Dependency::new(b.id(), "b", a.id(), "a", None),
        ];
        let (a_id, b_id) = (a.id(), b.id());
        let graph = FlagGraph::from_parts(vec![a, b], edges).unwrap();

        let t = Traversal::unbounded();
        assert!(!graph.is_active(a_id, &t).unwrap());
        assert!(!graph.is_active(b_id, &t).unwrap());
        assert!(!graph.can_become_enabled(a_id, &t).unwrap());
    }
}
