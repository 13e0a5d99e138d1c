use super::config::EngineConfig;
use super::error::Result;
use crate::core::{
    Actor, AuditEvent, Dependency, EventKind, Flag, FlagId, FlagStatus, DEFAULT_TOGGLE_REASON,
};
use crate::graph::{AutoDisabled, FlagGraph, GraphError, GraphResult, Traversal};
use crate::storage::{ChangeSet, EventSink, FlagStore};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, RwLockWriteGuard};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Reason attached to `auto_disable` events.
pub fn auto_disable_reason(source_title: &str) -> String {
    format!("auto-disabled: dependency '{}' is no longer active", source_title)
}

/// The result of validating and applying an operation to a copy of the graph.
struct Staged<T> {
    graph: FlagGraph,
    changes: ChangeSet,
    events: Vec<AuditEvent>,
    output: T,
}

/// Feature flag engine.
///
/// Holds the flag graph in memory and keeps it in step with a [`FlagStore`].
/// Writes are serialized by the graph's write lock and follow one shape:
/// validate and mutate a staged copy, persist its [`ChangeSet`], publish the
/// copy, then hand the operation's events to the [`EventSink`]. A failure at
/// any point before publication leaves both the graph and the store as they
/// were.
///
/// # Example
///
/// ```no_run
/// use flagdeps::prelude::*;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = Engine::open(
///     Arc::new(InMemoryFlagStore::new()),
///     Arc::new(InMemoryEventLog::new()),
///     EngineConfig::default(),
/// )
/// .await?;
///
/// let auth = engine.create_flag("auth", true, None).await?;
/// engine
///     .create_flag_with_dependencies("dashboard", true, &["auth"], None)
///     .await?;
///
/// engine.toggle_flag(auth.id(), Some("incident"), None).await?;
/// assert!(!engine.get_flag_by_title("dashboard").await?.flag.is_enabled());
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    graph: RwLock<FlagGraph>,
    store: Arc<dyn FlagStore>,
    sink: Arc<dyn EventSink>,
    config: EngineConfig,
    // Held from publication until the events are recorded, so events reach
    // the sink in commit order.
    emit_lock: Mutex<()>,
}

impl Engine {
    /// Loads the graph from `store` and returns a ready engine.
    ///
    /// Stored edges are taken as given; a cycle in stored data does not fail
    /// the load.
    pub async fn open(
        store: Arc<dyn FlagStore>,
        sink: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Result<Self> {
        let flags = store.load_flags().await?;
        let dependencies = store.load_dependencies().await?;
        let graph = FlagGraph::from_parts(flags, dependencies)?;

        info!(
            flags = graph.len(),
            dependencies = graph.edge_count(),
            "loaded flag graph"
        );

        Ok(Self {
            graph: RwLock::new(graph),
            store,
            sink,
            config,
            emit_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn traversal(&self) -> Traversal {
        Traversal::new(
            self.config.cancellation.clone(),
            self.config.max_traversal_steps,
        )
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Creates a flag with no dependencies.
    #[instrument(skip(self))]
    pub async fn create_flag(
        &self,
        title: &str,
        enabled: bool,
        actor: Option<Actor>,
    ) -> Result<Flag> {
        self.create_flag_with_dependencies(title, enabled, &[], actor)
            .await
    }

    /// Creates a flag and its edges to existing flags in one step.
    ///
    /// Nothing is committed unless the flag and all its edges are valid, and
    /// an enabled flag can only be created if its sources let it be active.
    #[instrument(skip(self))]
    pub async fn create_flag_with_dependencies(
        &self,
        title: &str,
        enabled: bool,
        sources: &[&str],
        actor: Option<Actor>,
    ) -> Result<Flag> {
        let graph = self.graph.write().await;
        let staged = self.stage_create(&graph, title, enabled, sources, actor)?;
        let flag = staged.output.clone();
        self.commit(graph, staged).await?;

        info!(flag = %flag.id(), title = flag.title(), enabled, "created flag");
        Ok(flag)
    }

    fn stage_create(
        &self,
        graph: &FlagGraph,
        title: &str,
        enabled: bool,
        sources: &[&str],
        actor: Option<Actor>,
    ) -> Result<Staged<Flag>> {
        let traversal = self.traversal();
        let mut staged = graph.clone();
        let mut changes = ChangeSet::new();
        let mut events = Vec::new();

        let flag = staged.add_flag(title, enabled)?;
        events.push(AuditEvent::new(
            flag.id(),
            flag.title(),
            EventKind::Create,
            actor.clone(),
            None,
        ));

        let mut dependencies = Vec::with_capacity(sources.len());
        for source_title in sources {
            let source = staged
                .flag_by_title(source_title.trim())
                .ok_or_else(|| GraphError::unknown_source(*source_title))?
                .id();
            let dependency = staged.add_dependency(flag.id(), source, actor.clone(), &traversal)?;
            events.push(AuditEvent::new(
                flag.id(),
                flag.title(),
                EventKind::DependencyAdd,
                actor.clone(),
                Some(dependency.to_string()),
            ));
            dependencies.push(dependency);
        }

        if enabled && !staged.can_become_enabled(flag.id(), &traversal)? {
            let blockers = titles(&staged, staged.blockers(flag.id(), &traversal)?);
            return Err(GraphError::unmet_dependencies(flag.title(), blockers).into());
        }

        changes.create_flag(flag.clone());
        for dependency in dependencies {
            changes.add_dependency(dependency);
        }

        Ok(Staged {
            graph: staged,
            changes,
            events,
            output: flag,
        })
    }

    /// Flips a flag's enabled bit.
    ///
    /// Enabling fails with `UnmetDependencies` if the flag's sources do not
    /// allow it to be active. Disabling auto-disables every dependent that
    /// can no longer be active before returning.
    #[instrument(skip(self))]
    pub async fn toggle_flag(
        &self,
        id: FlagId,
        reason: Option<&str>,
        actor: Option<Actor>,
    ) -> Result<Flag> {
        self.write_enabled(id, None, reason, actor).await
    }

    /// Sets a flag's enabled bit to `enabled`.
    ///
    /// Same rules as [`Engine::toggle_flag`]; a flag already in the requested
    /// state is returned unchanged and no event is recorded.
    #[instrument(skip(self))]
    pub async fn set_enabled(
        &self,
        id: FlagId,
        enabled: bool,
        reason: Option<&str>,
        actor: Option<Actor>,
    ) -> Result<Flag> {
        self.write_enabled(id, Some(enabled), reason, actor).await
    }

    async fn write_enabled(
        &self,
        id: FlagId,
        enabled: Option<bool>,
        reason: Option<&str>,
        actor: Option<Actor>,
    ) -> Result<Flag> {
        let graph = self.graph.write().await;
        let current = graph.flag(id)?.clone();
        let target = enabled.unwrap_or(!current.is_enabled());
        if target == current.is_enabled() {
            debug!(flag = %id, enabled = target, "flag already in requested state");
            return Ok(current);
        }

        let staged = self.stage_enabled(&graph, id, target, reason, actor)?;
        let flag = staged.output.clone();
        let cascaded = staged.changes.updated_flags.len().saturating_sub(1);
        self.commit(graph, staged).await?;

        info!(
            flag = %id,
            title = flag.title(),
            enabled = target,
            cascaded,
            "toggled flag"
        );
        Ok(flag)
    }

    fn stage_enabled(
        &self,
        graph: &FlagGraph,
        id: FlagId,
        enabled: bool,
        reason: Option<&str>,
        actor: Option<Actor>,
    ) -> Result<Staged<Flag>> {
        let traversal = self.traversal();
        let mut staged = graph.clone();
        let mut changes = ChangeSet::new();

        let cascaded = if enabled {
            staged.enable(id, &traversal)?;
            Vec::new()
        } else {
            staged.disable(id, &traversal)?
        };

        let flag = staged.flag(id)?.clone();
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_TOGGLE_REASON);
        changes.update_flag(flag.clone());
        let mut events = vec![AuditEvent::new(
            id,
            flag.title(),
            EventKind::Toggle,
            actor.clone(),
            Some(reason.to_string()),
        )];
        record_cascade(&staged, &cascaded, actor.as_ref(), &mut changes, &mut events)?;

        Ok(Staged {
            graph: staged,
            changes,
            events,
            output: flag,
        })
    }

    /// Makes `dependent` depend on `source`.
    ///
    /// If `dependent` is enabled but can no longer be active with the new
    /// edge, it is auto-disabled and the cascade runs from it.
    #[instrument(skip(self))]
    pub async fn add_dependency(
        &self,
        dependent: FlagId,
        source: FlagId,
        actor: Option<Actor>,
    ) -> Result<Dependency> {
        let graph = self.graph.write().await;
        let staged = self.stage_add_dependency(&graph, dependent, source, actor)?;
        let dependency = staged.output.clone();
        let disabled = staged.changes.updated_flags.len();
        self.commit(graph, staged).await?;

        info!(dependency = %dependency, disabled, "added dependency");
        Ok(dependency)
    }

    fn stage_add_dependency(
        &self,
        graph: &FlagGraph,
        dependent: FlagId,
        source: FlagId,
        actor: Option<Actor>,
    ) -> Result<Staged<Dependency>> {
        let traversal = self.traversal();
        let mut staged = graph.clone();
        let mut changes = ChangeSet::new();

        let dependency = staged.add_dependency(dependent, source, actor.clone(), &traversal)?;
        changes.add_dependency(dependency.clone());
        let mut events = vec![AuditEvent::new(
            dependent,
            dependency.dependent_title(),
            EventKind::DependencyAdd,
            actor.clone(),
            Some(dependency.to_string()),
        )];

        // Loaded data may leave the dependent enabled but already inactive;
        // the reason then names the older source that blocks it.
        let blocker = if staged.flag(dependent)?.is_enabled() {
            staged.first_inactive_source(dependent, &traversal)?
        } else {
            None
        };
        if let Some(blocker) = blocker {
            let blocker_title = staged.flag(blocker)?.title().to_string();
            let cascaded = staged.disable(dependent, &traversal)?;
            let flag = staged.flag(dependent)?.clone();
            changes.update_flag(flag.clone());
            events.push(AuditEvent::new(
                dependent,
                flag.title(),
                EventKind::AutoDisable,
                actor.clone(),
                Some(auto_disable_reason(&blocker_title)),
            ));
            record_cascade(&staged, &cascaded, actor.as_ref(), &mut changes, &mut events)?;
        }

        Ok(Staged {
            graph: staged,
            changes,
            events,
            output: dependency,
        })
    }

    /// Removes an edge. Removal never reduces activation, so nothing cascades.
    #[instrument(skip(self))]
    pub async fn remove_dependency(&self, id: Uuid, actor: Option<Actor>) -> Result<Dependency> {
        let graph = self.graph.write().await;

        let mut staged = graph.clone();
        let dependency = staged.remove_dependency(id)?;
        let mut changes = ChangeSet::new();
        changes.remove_dependency(id);
        let events = vec![AuditEvent::new(
            dependency.dependent(),
            dependency.dependent_title(),
            EventKind::DependencyRemove,
            actor,
            Some(dependency.to_string()),
        )];

        self.commit(
            graph,
            Staged {
                graph: staged,
                changes,
                events,
                output: (),
            },
        )
        .await?;

        info!(dependency = %dependency, "removed dependency");
        Ok(dependency)
    }

    /// Disables every enabled flag that can no longer be active.
    ///
    /// Only data loaded from outside the engine can leave such flags; on a
    /// graph maintained by the engine alone this commits and records
    /// nothing. Returns the flags disabled.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, actor: Option<Actor>) -> Result<Vec<FlagId>> {
        let graph = self.graph.write().await;

        let traversal = self.traversal();
        let mut staged = graph.clone();
        let cascaded = staged.reconcile(&traversal)?;
        if cascaded.is_empty() {
            debug!("reconcile found nothing to disable");
            return Ok(Vec::new());
        }

        let mut changes = ChangeSet::new();
        let mut events = Vec::with_capacity(cascaded.len());
        record_cascade(&staged, &cascaded, actor.as_ref(), &mut changes, &mut events)?;
        let disabled: Vec<FlagId> = cascaded.iter().map(|auto| auto.flag).collect();

        self.commit(
            graph,
            Staged {
                graph: staged,
                changes,
                events,
                output: (),
            },
        )
        .await?;

        warn!(count = disabled.len(), "reconcile disabled inconsistent flags");
        Ok(disabled)
    }

    /// Persists a staged operation, publishes it and records its events.
    async fn commit<T>(
        &self,
        mut graph: RwLockWriteGuard<'_, FlagGraph>,
        staged: Staged<T>,
    ) -> Result<()> {
        if !staged.changes.is_empty() {
            self.store.apply(&staged.changes).await?;
        }
        *graph = staged.graph;

        let _emit = self.emit_lock.lock().await;
        drop(graph);

        if staged.events.is_empty() {
            return Ok(());
        }
        // The change is committed; a sink failure cannot undo it.
        if let Err(e) = self.sink.record(&staged.events).await {
            error!(
                error = %e,
                events = staged.events.len(),
                "failed to record audit events"
            );
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub async fn get_flag(&self, id: FlagId) -> Result<FlagStatus> {
        let graph = self.graph.read().await;
        Ok(graph.status(id, &self.traversal())?)
    }

    /// Looks a flag up by its (trimmed) title.
    pub async fn get_flag_by_title(&self, title: &str) -> Result<FlagStatus> {
        let graph = self.graph.read().await;
        let id = graph
            .flag_by_title(title.trim())
            .ok_or_else(|| GraphError::unknown_title(title))?
            .id();
        Ok(graph.status(id, &self.traversal())?)
    }

    /// All flags with their activation, sorted by title.
    pub async fn list_flags(&self) -> Result<Vec<FlagStatus>> {
        let graph = self.graph.read().await;
        Ok(graph.statuses(&self.traversal())?)
    }

    pub async fn is_active(&self, id: FlagId) -> Result<bool> {
        let graph = self.graph.read().await;
        Ok(graph.is_active(id, &self.traversal())?)
    }

    /// All edges, sorted by dependent title then source title.
    pub async fn list_dependencies(&self) -> Result<Vec<Dependency>> {
        let graph = self.graph.read().await;
        Ok(graph.dependencies_sorted().into_iter().cloned().collect())
    }

    /// The flags keeping `id` from becoming active, in discovery order.
    pub async fn blockers(&self, id: FlagId) -> Result<Vec<Flag>> {
        let graph = self.graph.read().await;
        let blockers = graph.blockers(id, &self.traversal())?;
        Ok(blockers
            .into_iter()
            .filter_map(|blocker| graph.get(blocker).cloned())
            .collect())
    }

    /// Renders the graph in Graphviz DOT format.
    pub async fn to_dot(&self) -> String {
        self.graph.read().await.to_dot()
    }

    /// A copy of the current graph.
    pub async fn snapshot(&self) -> FlagGraph {
        self.graph.read().await.clone()
    }

    /// Closes the underlying store.
    pub async fn close(&self) -> Result<()> {
        self.store.close().await?;
        Ok(())
    }
}

/// Adds a cascade's flags to the change set and one `auto_disable` event per
/// flag to `events`.
fn record_cascade(
    graph: &FlagGraph,
    cascaded: &[AutoDisabled],
    actor: Option<&Actor>,
    changes: &mut ChangeSet,
    events: &mut Vec<AuditEvent>,
) -> GraphResult<()> {
    for auto in cascaded {
        let flag = graph.flag(auto.flag)?;
        let via = graph.flag(auto.via)?;
        changes.update_flag(flag.clone());
        events.push(AuditEvent::new(
            flag.id(),
            flag.title(),
            EventKind::AutoDisable,
            actor.cloned(),
            Some(auto_disable_reason(via.title())),
        ));
    }
    Ok(())
}

fn titles(graph: &FlagGraph, ids: Vec<FlagId>) -> Vec<String> {
    ids.into_iter()
        .filter_map(|id| graph.get(id))
        .map(|flag| flag.title().to_string())
        .collect()
}
