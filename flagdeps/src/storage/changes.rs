use crate::core::{Dependency, Flag};
use uuid::Uuid;

/// Everything one logical operation writes.
///
/// A store applies a change set atomically: all of it or none of it.
/// Within a set, new flags are written before new dependencies, so edges
/// may reference flags created in the same set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Flags created by the operation
    pub created_flags: Vec<Flag>,
    /// Flags whose enabled bit changed, in their final state
    pub updated_flags: Vec<Flag>,
    /// Dependencies added by the operation
    pub added_dependencies: Vec<Dependency>,
    /// Ids of dependencies removed by the operation
    pub removed_dependencies: Vec<Uuid>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.created_flags.is_empty()
            && self.updated_flags.is_empty()
            && self.added_dependencies.is_empty()
            && self.removed_dependencies.is_empty()
    }

    pub fn create_flag(&mut self, flag: Flag) -> &mut Self {
        self.created_flags.push(flag);
        self
    }

    /// Records the final state of an updated flag, replacing an earlier
    /// entry for the same flag.
    pub fn update_flag(&mut self, flag: Flag) -> &mut Self {
        if let Some(created) = self.created_flags.iter_mut().find(|f| f.id() == flag.id()) {
            *created = flag;
        } else if let Some(existing) = self.updated_flags.iter_mut().find(|f| f.id() == flag.id()) {
            *existing = flag;
        } else {
            self.updated_flags.push(flag);
        }
        self
    }

    pub fn add_dependency(&mut self, dependency: Dependency) -> &mut Self {
        self.added_dependencies.push(dependency);
        self
    }

    pub fn remove_dependency(&mut self, id: Uuid) -> &mut Self {
        self.removed_dependencies.push(id);
        self
    }
}
