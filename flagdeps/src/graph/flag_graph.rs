//! FlagGraph - the flag store and edge store in one explicit structure
//!
//! Flags are kept by id with a title index. Dependency edges point from a
//! dependent flag to the source flag it needs, and every node keeps both
//! directions of adjacency:
//! - `sources`: flags this flag depends on (followed by evaluation and
//!   cycle detection)
//! - `dependents`: flags depending on this flag (followed by the cascade)
//!
//! Both lists are kept in edge-insertion order so every traversal, and every
//! error message derived from one, is reproducible for identical inputs.
//!
//! The graph is loaded once per engine and traversed on plain identifiers;
//! no storage round-trips happen during a walk.

use super::activation::Evaluator;
use super::cascade::{self, AutoDisabled};
use super::cycle;
use super::error::{GraphError, GraphResult};
use super::traversal::Traversal;
use crate::core::{Actor, Dependency, Flag, FlagId, FlagStatus};
use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Longest accepted flag title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Trims a proposed title and checks it is non-empty and short enough.
pub fn validate_title(title: &str) -> GraphResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(GraphError::invalid_title(title, "title must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(GraphError::invalid_title(
            title,
            format!("title must be at most {} characters", MAX_TITLE_LEN),
        ));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone)]
struct FlagNode {
    flag: Flag,
    /// Flags this flag depends on (outgoing edges)
    sources: Vec<FlagId>,
    /// Flags that depend on this flag (incoming edges)
    dependents: Vec<FlagId>,
}

impl FlagNode {
    fn new(flag: Flag) -> Self {
        Self {
            flag,
            sources: Vec::new(),
            dependents: Vec::new(),
        }
    }
}

/// Flags plus the directed dependency edges between them.
///
/// # Example
///
/// ```
/// use flagdeps::graph::{FlagGraph, Traversal};
///
/// let mut graph = FlagGraph::new();
/// let auth = graph.add_flag("auth", true).unwrap();
/// let dashboard = graph.add_flag("dashboard", true).unwrap();
///
/// let traversal = Traversal::unbounded();
/// graph
///     .add_dependency(dashboard.id(), auth.id(), None, &traversal)
///     .unwrap();
/// assert!(graph.is_active(dashboard.id(), &traversal).unwrap());
///
/// let cascaded = graph.disable(auth.id(), &traversal).unwrap();
/// assert_eq!(cascaded.len(), 1);
/// assert!(!graph.flag(dashboard.id()).unwrap().is_enabled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FlagGraph {
    nodes: HashMap<FlagId, FlagNode>,
    titles: HashMap<String, FlagId>,
    /// Insertion order for deterministic iteration
    insertion_order: Vec<FlagId>,
    dependencies: HashMap<Uuid, Dependency>,
    /// Edge index keyed by (dependent, source)
    edges: HashMap<(FlagId, FlagId), Uuid>,
}

impl FlagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a graph from stored flags and edges.
    ///
    /// Edges are checked for dangling endpoints and duplicates but not for
    /// cycles: stored data is taken as given, and evaluation tolerates
    /// cycles by treating the repeated branch as inactive.
    pub fn from_parts(
        flags: impl IntoIterator<Item = Flag>,
        dependencies: impl IntoIterator<Item = Dependency>,
    ) -> GraphResult<Self> {
        let mut graph = Self::new();
        for flag in flags {
            graph.insert_flag(flag)?;
        }
        for dependency in dependencies {
            graph.insert_edge(dependency)?;
        }
        Ok(graph)
    }

    /// Returns the number of flags in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of dependency edges
    pub fn edge_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Creates a flag with a fresh id.
    ///
    /// Fails with `InvalidTitle` or `DuplicateTitle`.
    pub fn add_flag(&mut self, title: &str, enabled: bool) -> GraphResult<Flag> {
        let title = validate_title(title)?;
        let flag = Flag::new(title, enabled);
        self.insert_flag(flag.clone())?;
        Ok(flag)
    }

    /// Inserts an already constructed flag.
    pub fn insert_flag(&mut self, flag: Flag) -> GraphResult<()> {
        if self.titles.contains_key(flag.title()) || self.nodes.contains_key(&flag.id()) {
            return Err(GraphError::duplicate_title(flag.title()));
        }

        let id = flag.id();
        self.titles.insert(flag.title().to_string(), id);
        self.insertion_order.push(id);
        self.nodes.insert(id, FlagNode::new(flag));
        Ok(())
    }

    pub fn flag(&self, id: FlagId) -> GraphResult<&Flag> {
        self.get(id).ok_or_else(|| GraphError::flag_not_found(id))
    }

    pub fn get(&self, id: FlagId) -> Option<&Flag> {
        self.nodes.get(&id).map(|node| &node.flag)
    }

    pub fn flag_by_title(&self, title: &str) -> Option<&Flag> {
        self.titles.get(title).and_then(|id| self.get(*id))
    }

    pub fn contains_flag(&self, id: FlagId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Flags `id` directly depends on, in edge-insertion order.
    pub fn sources(&self, id: FlagId) -> &[FlagId] {
        self.nodes
            .get(&id)
            .map(|node| node.sources.as_slice())
            .unwrap_or(&[])
    }

    /// Flags directly depending on `id`, in edge-insertion order.
    pub fn dependents(&self, id: FlagId) -> &[FlagId] {
        self.nodes
            .get(&id)
            .map(|node| node.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Iterates flags in insertion order.
    pub fn flags(&self) -> impl Iterator<Item = &Flag> {
        self.insertion_order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .map(|node| &node.flag)
    }

    /// Flags sorted by title.
    pub fn flags_sorted(&self) -> Vec<&Flag> {
        let mut flags: Vec<&Flag> = self.flags().collect();
        flags.sort_by(|a, b| a.title().cmp(b.title()));
        flags
    }

    /// Iterates edges grouped by dependent (flag insertion order), then by
    /// edge insertion order.
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.insertion_order.iter().flat_map(move |dependent| {
            self.sources(*dependent).iter().filter_map(move |source| {
                self.edges
                    .get(&(*dependent, *source))
                    .and_then(|id| self.dependencies.get(id))
            })
        })
    }

    /// Edges sorted by (dependent title, source title).
    pub fn dependencies_sorted(&self) -> Vec<&Dependency> {
        let mut deps: Vec<&Dependency> = self.dependencies.values().collect();
        deps.sort_by(|a, b| {
            a.dependent_title()
                .cmp(b.dependent_title())
                .then_with(|| a.source_title().cmp(b.source_title()))
        });
        deps
    }

    pub fn dependency(&self, id: Uuid) -> Option<&Dependency> {
        self.dependencies.get(&id)
    }

    pub fn dependency_between(&self, dependent: FlagId, source: FlagId) -> Option<&Dependency> {
        self.edges
            .get(&(dependent, source))
            .and_then(|id| self.dependencies.get(id))
    }

    /// Adds a dependency: `dependent` depends on `source`.
    ///
    /// Returns an error if:
    /// - Either flag doesn't exist
    /// - The flag would depend on itself
    /// - The edge already exists
    /// - Adding the edge would close a cycle
    ///
    /// On error the graph is unchanged.
    pub fn add_dependency(
        &mut self,
        dependent: FlagId,
        source: FlagId,
        creator: Option<Actor>,
        traversal: &Traversal,
    ) -> GraphResult<Dependency> {
        let dependent_title = self.flag(dependent)?.title().to_string();
        if dependent == source {
            return Err(GraphError::self_dependency(dependent_title));
        }
        let source_title = self.flag(source)?.title().to_string();

        if self.edges.contains_key(&(dependent, source)) {
            return Err(GraphError::duplicate_edge(dependent_title, source_title));
        }

        if let Some(path) = cycle::would_create_cycle(self, dependent, source, traversal)? {
            return Err(GraphError::cycle(path));
        }

        let dependency = Dependency::new(dependent, dependent_title, source, source_title, creator);
        self.insert_edge(dependency.clone())?;
        Ok(dependency)
    }

    /// Inserts an edge without the cycle check.
    fn insert_edge(&mut self, dependency: Dependency) -> GraphResult<()> {
        let dependent = dependency.dependent();
        let source = dependency.source();
        if !self.nodes.contains_key(&dependent) {
            return Err(GraphError::flag_not_found(dependent));
        }
        if !self.nodes.contains_key(&source) {
            return Err(GraphError::flag_not_found(source));
        }
        if self.edges.contains_key(&(dependent, source)) {
            return Err(GraphError::duplicate_edge(
                dependency.dependent_title(),
                dependency.source_title(),
            ));
        }

        if let Some(node) = self.nodes.get_mut(&dependent) {
            node.sources.push(source);
        }
        if let Some(node) = self.nodes.get_mut(&source) {
            node.dependents.push(dependent);
        }
        self.edges.insert((dependent, source), dependency.id());
        self.dependencies.insert(dependency.id(), dependency);
        Ok(())
    }

    /// Removes an edge. Removal can never introduce a cycle.
    pub fn remove_dependency(&mut self, id: Uuid) -> GraphResult<Dependency> {
        let dependency = self
            .dependencies
            .remove(&id)
            .ok_or_else(|| GraphError::dependency_not_found(id))?;

        let dependent = dependency.dependent();
        let source = dependency.source();
        self.edges.remove(&(dependent, source));
        if let Some(node) = self.nodes.get_mut(&dependent) {
            node.sources.retain(|s| *s != source);
        }
        if let Some(node) = self.nodes.get_mut(&source) {
            node.dependents.retain(|d| *d != dependent);
        }
        Ok(dependency)
    }

    /// Returns true if the flag and all of its dependencies are enabled.
    pub fn is_active(&self, id: FlagId, traversal: &Traversal) -> GraphResult<bool> {
        Evaluator::new(self, traversal).is_active(id)
    }

    /// Returns true if the flag would be active were it enabled.
    pub fn can_become_enabled(&self, id: FlagId, traversal: &Traversal) -> GraphResult<bool> {
        Evaluator::new(self, traversal).can_become_enabled(id)
    }

    /// Flags preventing `id` from becoming active.
    pub fn blockers(&self, id: FlagId, traversal: &Traversal) -> GraphResult<Vec<FlagId>> {
        Evaluator::new(self, traversal).blockers(id)
    }

    /// The first dependency of `id`, in edge order, that is not active.
    pub fn first_inactive_source(
        &self,
        id: FlagId,
        traversal: &Traversal,
    ) -> GraphResult<Option<FlagId>> {
        Evaluator::new(self, traversal).first_inactive_source(id)
    }

    /// The flag with its computed activation and direct dependencies.
    pub fn status(&self, id: FlagId, traversal: &Traversal) -> GraphResult<FlagStatus> {
        self.status_with(&mut Evaluator::new(self, traversal), id)
    }

    /// Statuses of every flag, sorted by title.
    ///
    /// One evaluator is shared across all flags, so each flag is evaluated
    /// at most once for the whole listing.
    pub fn statuses(&self, traversal: &Traversal) -> GraphResult<Vec<FlagStatus>> {
        let mut evaluator = Evaluator::new(self, traversal);
        self.flags_sorted()
            .into_iter()
            .map(|flag| self.status_with(&mut evaluator, flag.id()))
            .collect()
    }

    fn status_with(
        &self,
        evaluator: &mut Evaluator<'_, '_>,
        id: FlagId,
    ) -> GraphResult<FlagStatus> {
        let flag = self.flag(id)?.clone();
        let is_active = evaluator.is_active(id)?;
        let dependencies = self
            .sources(id)
            .iter()
            .filter_map(|source| self.get(*source))
            .map(|source| source.title().to_string())
            .collect();
        Ok(FlagStatus {
            flag,
            is_active,
            dependencies,
        })
    }

    /// Enables a flag after checking its dependencies.
    ///
    /// Returns `Ok(false)` when the flag was already enabled. Fails with
    /// `UnmetDependencies` listing the blocking flags otherwise.
    pub fn enable(&mut self, id: FlagId, traversal: &Traversal) -> GraphResult<bool> {
        let flag = self.flag(id)?;
        if flag.is_enabled() {
            return Ok(false);
        }

        let mut evaluator = Evaluator::new(self, traversal);
        if !evaluator.can_become_enabled(id)? {
            let blockers = evaluator
                .blockers(id)?
                .into_iter()
                .filter_map(|blocker| self.get(blocker))
                .map(|blocker| blocker.title().to_string())
                .collect();
            return Err(GraphError::unmet_dependencies(flag.title(), blockers));
        }

        self.set_enabled(id, true)?;
        Ok(true)
    }

    /// Disables a flag and cascades to every dependent that can no longer
    /// be active.
    ///
    /// Returns the auto-disabled flags in the order they were disabled; the
    /// flag itself is not included. Disabling an already disabled flag is a
    /// no-op. On error the graph is restored to its previous state.
    pub fn disable(&mut self, id: FlagId, traversal: &Traversal) -> GraphResult<Vec<AutoDisabled>> {
        let original = self.flag(id)?.clone();
        if !original.is_enabled() {
            return Ok(Vec::new());
        }

        self.set_enabled(id, false)?;
        match cascade::cascade_disable(self, &[id], traversal) {
            Ok(cascaded) => Ok(cascaded),
            Err(e) => {
                self.restore_flag(original);
                Err(e)
            }
        }
    }

    /// Disables every enabled flag that can no longer be active.
    ///
    /// All flags are judged against the graph as it stands before the
    /// sweep, with one shared evaluator, so flags stuck in a cycle of
    /// loaded edges are caught as well. Disabling an inactive flag never
    /// deactivates an active one, so no further cascade is needed. Each
    /// entry's `via` is the first inactive source of the flag.
    ///
    /// On a consistent graph this changes nothing.
    pub fn reconcile(&mut self, traversal: &Traversal) -> GraphResult<Vec<AutoDisabled>> {
        let mut stale = Vec::new();
        {
            let mut evaluator = Evaluator::new(self, traversal);
            for flag in self.flags().filter(|flag| flag.is_enabled()) {
                let id = flag.id();
                if evaluator.is_active(id)? {
                    continue;
                }
                if let Some(via) = evaluator.first_inactive_source(id)? {
                    stale.push(AutoDisabled { flag: id, via });
                }
            }
        }

        for auto in &stale {
            self.set_enabled(auto.flag, false)?;
            debug!(flag = %auto.flag, via = %auto.via, "reconcile disabled flag");
        }
        Ok(stale)
    }

    /// Sets the enabled bit without any validation.
    ///
    /// Returns whether the bit changed.
    pub(crate) fn set_enabled(&mut self, id: FlagId, enabled: bool) -> GraphResult<bool> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| GraphError::flag_not_found(id))?;
        let changed = node.flag.is_enabled() != enabled;
        node.flag.set_enabled(enabled);
        Ok(changed)
    }

    /// Puts back a previously cloned flag, undoing changes to it.
    pub(crate) fn restore_flag(&mut self, flag: Flag) {
        if let Some(node) = self.nodes.get_mut(&flag.id()) {
            node.flag = flag;
        }
    }

    /// Renders the graph in Graphviz DOT format, edges pointing from
    /// dependent to source.
    pub fn to_dot(&self) -> String {
        let mut graph = DiGraph::<String, ()>::new();
        let mut node_indices = HashMap::new();

        for flag in self.flags() {
            let label = if flag.is_enabled() {
                flag.title().to_string()
            } else {
                format!("{} (disabled)", flag.title())
            };
            node_indices.insert(flag.id(), graph.add_node(label));
        }

        for dependency in self.dependencies() {
            if let (Some(&from), Some(&to)) = (
                node_indices.get(&dependency.dependent()),
                node_indices.get(&dependency.source()),
            ) {
                graph.add_edge(from, to, ());
            }
        }

        format!("{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(titles: &[(&str, bool)]) -> (FlagGraph, Vec<FlagId>) {
        let mut graph = FlagGraph::new();
        let ids = titles
            .iter()
            .map(|(title, enabled)| graph.add_flag(title, *enabled).unwrap().id())
            .collect();
        (graph, ids)
    }

    #[test]
    fn test_empty_graph() {
        let graph = FlagGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_add_flag() {
        let (graph, ids) = graph_with(&[("flag_a", true), ("flag_b", false)]);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.flag(ids[0]).unwrap().title(), "flag_a");
        assert!(!graph.flag(ids[1]).unwrap().is_enabled());
        assert_eq!(graph.flag_by_title("flag_b").unwrap().id(), ids[1]);
    }

    #[test]
    fn test_duplicate_title_error() {
        let (mut graph, _) = graph_with(&[("flag_a", true)]);
        let result = graph.add_flag("flag_a", false);
        assert!(matches!(result, Err(GraphError::DuplicateTitle { .. })));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_title_is_trimmed_and_validated() {
        let mut graph = FlagGraph::new();
        let flag = graph.add_flag("  spaced  ", true).unwrap();
        assert_eq!(flag.title(), "spaced");

        assert!(matches!(
            graph.add_flag("   ", true),
            Err(GraphError::InvalidTitle { .. })
        ));
        let long = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(matches!(
            graph.add_flag(&long, true),
            Err(GraphError::InvalidTitle { .. })
        ));
    }

    #[test]
    fn test_unknown_flag() {
        let graph = FlagGraph::new();
        let id = FlagId::new();
        assert_eq!(graph.flag(id), Err(GraphError::flag_not_found(id)));
    }

    #[test]
    fn test_add_dependency() {
        let (mut graph, ids) = graph_with(&[("flag_a", true), ("flag_b", true)]);
        let t = Traversal::unbounded();

        let dep = graph.add_dependency(ids[1], ids[0], None, &t).unwrap();
        assert_eq!(dep.to_string(), "flag_b -> flag_a");
        assert_eq!(graph.sources(ids[1]), &[ids[0]]);
        assert_eq!(graph.dependents(ids[0]), &[ids[1]]);
        assert_eq!(graph.dependency_between(ids[1], ids[0]), Some(&dep));
    }

    #[test]
    fn test_self_dependency_error() {
        let (mut graph, ids) = graph_with(&[("auth", true)]);
        let result = graph.add_dependency(ids[0], ids[0], None, &Traversal::unbounded());
        assert!(matches!(result, Err(GraphError::SelfDependency { .. })));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_duplicate_edge_error() {
        let (mut graph, ids) = graph_with(&[("flag_a", true), ("flag_b", true)]);
        let t = Traversal::unbounded();
        graph.add_dependency(ids[1], ids[0], None, &t).unwrap();

        let result = graph.add_dependency(ids[1], ids[0], None, &t);
        assert!(matches!(result, Err(GraphError::DuplicateEdge { .. })));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_cycle_detection() {
        let (mut graph, ids) = graph_with(&[("a", true), ("b", true), ("c", true)]);
        let t = Traversal::unbounded();
        graph.add_dependency(ids[1], ids[0], None, &t).unwrap();
        graph.add_dependency(ids[2], ids[1], None, &t).unwrap();

        // a depends on c would close a -> c -> b -> a
        let result = graph.add_dependency(ids[0], ids[2], None, &t);
        match result {
            Err(GraphError::CycleDetected { path }) => {
                assert_eq!(path.to_string(), "a -> c -> b -> a")
            }
            other => panic!("expected cycle, got {:?}", other),
        }
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_remove_dependency() {
        let (mut graph, ids) = graph_with(&[("a", true), ("b", true)]);
        let t = Traversal::unbounded();
        let dep = graph.add_dependency(ids[1], ids[0], None, &t).unwrap();

        let removed = graph.remove_dependency(dep.id()).unwrap();
        assert_eq!(removed, dep);
        assert!(graph.sources(ids[1]).is_empty());
        assert!(graph.dependents(ids[0]).is_empty());

        assert!(matches!(
            graph.remove_dependency(dep.id()),
            Err(GraphError::DependencyNotFound { .. })
        ));
    }

    #[test]
    fn test_sorted_listings() {
        let (mut graph, ids) = graph_with(&[("zeta", true), ("alpha", true), ("mid", true)]);
        let t = Traversal::unbounded();
        graph.add_dependency(ids[0], ids[2], None, &t).unwrap();
        graph.add_dependency(ids[0], ids[1], None, &t).unwrap();
        graph.add_dependency(ids[2], ids[1], None, &t).unwrap();

        let titles: Vec<&str> = graph.flags_sorted().iter().map(|f| f.title()).collect();
        assert_eq!(titles, vec!["alpha", "mid", "zeta"]);

        let edges: Vec<String> = graph
            .dependencies_sorted()
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(edges, vec!["mid -> alpha", "zeta -> alpha", "zeta -> mid"]);
    }

    #[test]
    fn test_enable_with_unmet_dependencies() {
        let (mut graph, ids) = graph_with(&[("auth", false), ("dashboard", false)]);
        let t = Traversal::unbounded();
        graph.add_dependency(ids[1], ids[0], None, &t).unwrap();

        let result = graph.enable(ids[1], &t);
        assert_eq!(
            result,
            Err(GraphError::unmet_dependencies(
                "dashboard",
                vec!["auth".to_string()]
            ))
        );
        assert!(!graph.flag(ids[1]).unwrap().is_enabled());

        assert!(graph.enable(ids[0], &t).unwrap());
        assert!(graph.enable(ids[1], &t).unwrap());
        assert!(!graph.enable(ids[1], &t).unwrap());
    }

    #[test]
    fn test_disable_cascades() {
        let (mut graph, ids) = graph_with(&[("a", true), ("b", true), ("c", true)]);
        let t = Traversal::unbounded();
        graph.add_dependency(ids[1], ids[0], None, &t).unwrap();
        graph.add_dependency(ids[2], ids[1], None, &t).unwrap();

        let cascaded = graph.disable(ids[0], &t).unwrap();
        let disabled: Vec<FlagId> = cascaded.iter().map(|c| c.flag).collect();
        assert_eq!(disabled, vec![ids[1], ids[2]]);
        assert!(graph.flags().all(|f| !f.is_enabled()));

        assert!(graph.disable(ids[0], &t).unwrap().is_empty());
    }

    #[test]
    fn test_disable_rolls_back_when_cancelled() {
        let (mut graph, ids) = graph_with(&[("a", true), ("b", true), ("c", true)]);
        let t = Traversal::unbounded();
        graph.add_dependency(ids[1], ids[0], None, &t).unwrap();
        graph.add_dependency(ids[2], ids[1], None, &t).unwrap();

        let tight = Traversal::unbounded().with_max_steps(2);
        let result = graph.disable(ids[0], &tight);
        assert!(matches!(
            result,
            Err(GraphError::TraversalLimitExceeded { .. })
        ));
        assert!(graph.flags().all(|f| f.is_enabled()));
    }

    #[test]
    fn test_from_parts_rejects_dangling_edge() {
        let a = Flag::new("a", true);
        let ghost = FlagId::new();
        let dep = Dependency::new(a.id(), "a", ghost, "ghost", None);
        let result = FlagGraph::from_parts(vec![a], vec![dep]);
        assert_eq!(result.unwrap_err(), GraphError::flag_not_found(ghost));
    }

    #[test]
    fn test_status() {
        let (mut graph, ids) = graph_with(&[("auth", true), ("db", false), ("dashboard", true)]);
        let t = Traversal::unbounded();
        graph.add_dependency(ids[2], ids[0], None, &t).unwrap();
        graph.add_dependency(ids[2], ids[1], None, &t).unwrap();

        let status = graph.status(ids[2], &t).unwrap();
        assert!(status.flag.is_enabled());
        assert!(!status.is_active);
        assert_eq!(status.dependencies, vec!["auth", "db"]);
    }

    #[test]
    fn test_statuses_evaluate_each_flag_once() {
        let titles: Vec<String> = (0..50).map(|i| format!("f{:02}", i)).collect();
        let flags: Vec<(&str, bool)> = titles.iter().map(|t| (t.as_str(), true)).collect();
        let (mut graph, ids) = graph_with(&flags);
        for pair in ids.windows(2) {
            graph
                .add_dependency(pair[0], pair[1], None, &Traversal::unbounded())
                .unwrap();
        }

        // Evaluating flag by flag would walk the chain 50 times.
        let t = Traversal::unbounded().with_max_steps(60);
        let statuses = graph.statuses(&t).unwrap();
        assert_eq!(statuses.len(), 50);
        assert_eq!(statuses[0].flag.title(), "f00");
        assert!(statuses.iter().all(|s| s.is_active));
    }

    #[test]
    fn test_reconcile_disables_loaded_cycle() {
        let a = Flag::new("a", true);
        let b = Flag::new("b", true);
        let c = Flag::new("c", true);
        let mut graph = FlagGraph::from_parts(
            vec![a.clone(), b.clone(), c.clone()],
            vec![
                Dependency::new(a.id(), "a", b.id(), "b", None),
                Dependency::new(b.id(), "b", a.id(), "a", None),
            ],
        )
        .unwrap();
        let t = Traversal::unbounded();

        let swept = graph.reconcile(&t).unwrap();
        assert_eq!(
            swept,
            vec![
                AutoDisabled { flag: a.id(), via: b.id() },
                AutoDisabled { flag: b.id(), via: a.id() },
            ]
        );
        assert!(!graph.flag(a.id()).unwrap().is_enabled());
        assert!(!graph.flag(b.id()).unwrap().is_enabled());
        assert!(graph.is_active(c.id(), &t).unwrap());
        assert!(graph.reconcile(&t).unwrap().is_empty());
    }

    #[test]
    fn test_to_dot() {
        let (mut graph, ids) = graph_with(&[("auth", true), ("dashboard", false)]);
        graph
            .add_dependency(ids[1], ids[0], None, &Traversal::unbounded())
            .unwrap();

        let dot = graph.to_dot();
        assert!(dot.contains("digraph"));
        assert!(dot.contains("auth"));
        assert!(dot.contains("dashboard (disabled)"));
        assert!(dot.contains("->"));
    }
}
