//! In-memory repository implementation.
//!
//! Suitable for tests and local development. State lives behind an
//! `Arc<RwLock<...>>` so clones of the repository share one store, and the
//! same version check as the `PostgreSQL` implementation guards updates.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::RwLock;

use crate::domain::{NewTask, OwnerId, TaskId, TaskItem};
use crate::infrastructure::{
    RepositoryError, RepositoryFuture, TaskCountFilter, TaskRepository, sort_for_listing,
    sort_most_recent_first,
};

// =============================================================================
// In-Memory State
// =============================================================================

#[derive(Debug)]
struct TaskTable {
    rows: BTreeMap<TaskId, TaskItem>,
    next_id: i64,
}

impl TaskTable {
    const fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn owned_by<'a>(&'a self, owner: &'a OwnerId) -> impl Iterator<Item = &'a TaskItem> + 'a {
        self.rows.values().filter(move |task| task.is_owned_by(owner))
    }
}

// =============================================================================
// In-Memory Task Repository
// =============================================================================

/// In-memory implementation of `TaskRepository`.
///
/// # Example
///
/// ```ignore
/// let repository = InMemoryTaskRepository::new();
/// let stored = repository.insert(new_task).await?;
/// let found = repository.find_owned(stored.id, &stored.owner_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryTaskRepository {
    table: Arc<RwLock<TaskTable>>,
}

impl InMemoryTaskRepository {
    /// Creates a new empty in-memory task repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(TaskTable::new())),
        }
    }
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::significant_drop_tightening)]
impl TaskRepository for InMemoryTaskRepository {
    fn insert(&self, task: NewTask) -> RepositoryFuture<TaskItem> {
        let table = Arc::clone(&self.table);
        async move {
            let mut guard = table.write().await;
            let id = TaskId::new(guard.next_id);
            guard.next_id += 1;
            let stored = task.into_stored(id);
            guard.rows.insert(id, stored.clone());
            Ok(stored)
        }
        .boxed()
    }

    fn find_owned(&self, id: TaskId, owner: &OwnerId) -> RepositoryFuture<Option<TaskItem>> {
        let table = Arc::clone(&self.table);
        let owner = owner.clone();
        async move {
            let guard = table.read().await;
            Ok(guard
                .rows
                .get(&id)
                .filter(|task| task.is_owned_by(&owner))
                .cloned())
        }
        .boxed()
    }

    fn exists_owned(&self, id: TaskId, owner: &OwnerId) -> RepositoryFuture<bool> {
        let table = Arc::clone(&self.table);
        let owner = owner.clone();
        async move {
            let guard = table.read().await;
            Ok(guard
                .rows
                .get(&id)
                .is_some_and(|task| task.is_owned_by(&owner)))
        }
        .boxed()
    }

    fn list_owned(&self, owner: &OwnerId) -> RepositoryFuture<Vec<TaskItem>> {
        let table = Arc::clone(&self.table);
        let owner = owner.clone();
        async move {
            let mut tasks: Vec<TaskItem> = {
                let guard = table.read().await;
                guard.owned_by(&owner).cloned().collect()
            };
            sort_for_listing(&mut tasks);
            Ok(tasks)
        }
        .boxed()
    }

    fn list_recent(&self, owner: &OwnerId, limit: usize) -> RepositoryFuture<Vec<TaskItem>> {
        let table = Arc::clone(&self.table);
        let owner = owner.clone();
        async move {
            let mut tasks: Vec<TaskItem> = {
                let guard = table.read().await;
                guard.owned_by(&owner).cloned().collect()
            };
            sort_most_recent_first(&mut tasks);
            tasks.truncate(limit);
            Ok(tasks)
        }
        .boxed()
    }

    fn count_owned(&self, owner: &OwnerId, filter: TaskCountFilter) -> RepositoryFuture<u64> {
        let table = Arc::clone(&self.table);
        let owner = owner.clone();
        async move {
            let guard = table.read().await;
            let count = guard.owned_by(&owner).filter(|task| filter.matches(task)).count();
            Ok(count as u64)
        }
        .boxed()
    }

    fn update(&self, task: &TaskItem) -> RepositoryFuture<TaskItem> {
        let table = Arc::clone(&self.table);
        let task = task.clone();
        async move {
            let mut guard = table.write().await;
            let conflict = RepositoryError::ConcurrencyConflict {
                id: task.id,
                expected: task.version,
            };

            let Some(existing) = guard.rows.get_mut(&task.id) else {
                return Err(conflict);
            };
            if !existing.is_owned_by(&task.owner_id) || existing.version != task.version {
                return Err(conflict);
            }

            let updated = TaskItem {
                version: task.version + 1,
                ..task
            };
            *existing = updated.clone();
            Ok(updated)
        }
        .boxed()
    }

    fn delete_owned(&self, id: TaskId, owner: &OwnerId) -> RepositoryFuture<bool> {
        let table = Arc::clone(&self.table);
        let owner = owner.clone();
        async move {
            let mut guard = table.write().await;
            let owned = guard
                .rows
                .get(&id)
                .is_some_and(|task| task.is_owned_by(&owner));
            if owned {
                guard.rows.remove(&id);
            }
            Ok(owned)
        }
        .boxed()
    }
}

// =============================================================================
// Tests
// =============================================================================
