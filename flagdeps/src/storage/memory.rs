use super::{error::Result, error::StorageError, ChangeSet, EventSink, FlagStore};
use crate::core::{AuditEvent, Dependency, Flag, FlagId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

/// In-memory flag store using DashMap for concurrent access.
///
/// Reads go straight to the maps. Writes are serialized by a mutex so that a
/// change set is validated and applied as one unit. Every record carries a
/// sequence number, which restores creation order on load.
pub struct InMemoryFlagStore {
    flags: DashMap<FlagId, (u64, Flag)>,
    dependencies: DashMap<Uuid, (u64, Dependency)>,
    sequence: AtomicU64,
    write_lock: Mutex<()>,
}

impl InMemoryFlagStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self {
            flags: DashMap::new(),
            dependencies: DashMap::new(),
            sequence: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store pre-populated with flags and edges.
    ///
    /// Nothing is validated, which makes this the way to stage externally
    /// loaded data, inconsistencies included.
    pub fn with_data(
        flags: impl IntoIterator<Item = Flag>,
        dependencies: impl IntoIterator<Item = Dependency>,
    ) -> Self {
        let store = Self::new();
        for flag in flags {
            let seq = store.next_sequence();
            store.flags.insert(flag.id(), (seq, flag));
        }
        for dependency in dependencies {
            let seq = store.next_sequence();
            store.dependencies.insert(dependency.id(), (seq, dependency));
        }
        store
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Checks a change set against current contents without writing.
    fn validate(&self, changes: &ChangeSet) -> Result<()> {
        let mut titles: HashSet<String> = self
            .flags
            .iter()
            .map(|entry| entry.value().1.title().to_string())
            .collect();
        for flag in &changes.created_flags {
            if self.flags.contains_key(&flag.id()) || !titles.insert(flag.title().to_string()) {
                return Err(StorageError::Conflict(format!(
                    "flag '{}' already exists",
                    flag.title()
                )));
            }
        }

        let created: HashSet<FlagId> = changes.created_flags.iter().map(|f| f.id()).collect();
        for flag in &changes.updated_flags {
            if !self.flags.contains_key(&flag.id()) && !created.contains(&flag.id()) {
                return Err(StorageError::FlagNotFound(flag.id()));
            }
        }

        for id in &changes.removed_dependencies {
            if !self.dependencies.contains_key(id) {
                return Err(StorageError::DependencyNotFound(*id));
            }
        }

        let mut pairs: HashSet<(FlagId, FlagId)> = self
            .dependencies
            .iter()
            .filter(|entry| !changes.removed_dependencies.contains(entry.key()))
            .map(|entry| (entry.value().1.dependent(), entry.value().1.source()))
            .collect();
        for dependency in &changes.added_dependencies {
            for endpoint in [dependency.dependent(), dependency.source()] {
                if !self.flags.contains_key(&endpoint) && !created.contains(&endpoint) {
                    return Err(StorageError::FlagNotFound(endpoint));
                }
            }
            if !pairs.insert((dependency.dependent(), dependency.source())) {
                return Err(StorageError::Conflict(format!(
                    "dependency '{}' already exists",
                    dependency
                )));
            }
        }

        Ok(())
    }
}

impl Default for InMemoryFlagStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlagStore for InMemoryFlagStore {
    async fn load_flags(&self) -> Result<Vec<Flag>> {
        let mut flags: Vec<(u64, Flag)> = self
            .flags
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        flags.sort_by_key(|(seq, _)| *seq);
        Ok(flags.into_iter().map(|(_, flag)| flag).collect())
    }

    async fn load_dependencies(&self) -> Result<Vec<Dependency>> {
        let mut dependencies: Vec<(u64, Dependency)> = self
            .dependencies
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        dependencies.sort_by_key(|(seq, _)| *seq);
        Ok(dependencies.into_iter().map(|(_, dep)| dep).collect())
    }

    async fn apply(&self, changes: &ChangeSet) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.validate(changes)?;

        for flag in &changes.created_flags {
            let seq = self.next_sequence();
            self.flags.insert(flag.id(), (seq, flag.clone()));
        }
        for flag in &changes.updated_flags {
            if let Some(mut entry) = self.flags.get_mut(&flag.id()) {
                entry.1 = flag.clone();
            }
        }
        for id in &changes.removed_dependencies {
            self.dependencies.remove(id);
        }
        for dependency in &changes.added_dependencies {
            let seq = self.next_sequence();
            self.dependencies
                .insert(dependency.id(), (seq, dependency.clone()));
        }

        debug!(
            created = changes.created_flags.len(),
            updated = changes.updated_flags.len(),
            added = changes.added_dependencies.len(),
            removed = changes.removed_dependencies.len(),
            "applied change set"
        );
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.flags.clear();
        self.dependencies.clear();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// In-memory append-only audit ledger.
#[derive(Default)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryEventLog {
    /// Creates a new, empty event log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventSink for InMemoryEventLog {
    async fn record(&self, events: &[AuditEvent]) -> Result<()> {
        self.events.write().await.extend_from_slice(events);
        Ok(())
    }

    async fn events(&self) -> Result<Vec<AuditEvent>> {
        Ok(self.events.read().await.clone())
    }
}
