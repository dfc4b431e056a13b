//! Repository trait for the task store.
//!
//! Every query takes the owner explicitly; there is no way to reach a task
//! without naming the principal it belongs to. Methods return boxed futures
//! so the trait stays object safe and can be shared as
//! `Arc<dyn TaskRepository>` between handlers.

use chrono::NaiveDate;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::{NewTask, OwnerId, TaskId, TaskItem};

// =============================================================================
// Repository Error
// =============================================================================

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The row changed or vanished between load and save.
    #[error("Concurrency conflict on task {id}: expected version {expected}")]
    ConcurrencyConflict { id: TaskId, expected: u64 },

    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A stored row could not be mapped to a domain value.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Future returned by every repository operation.
pub type RepositoryFuture<T> = BoxFuture<'static, Result<T, RepositoryError>>;

// =============================================================================
// Count Filter
// =============================================================================

/// Subset of an owner's tasks to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCountFilter {
    /// Every task.
    All,
    /// Tasks whose status is completed.
    Completed,
    /// Tasks whose status is anything but completed.
    Pending,
    /// Pending tasks due strictly before `today`.
    Overdue { today: NaiveDate },
}

impl TaskCountFilter {
    /// Returns `true` if `task` falls into this subset.
    #[must_use]
    pub fn matches(self, task: &TaskItem) -> bool {
        match self {
            Self::All => true,
            Self::Completed => task.status.is_completed(),
            Self::Pending => !task.status.is_completed(),
            Self::Overdue { today } => task.is_overdue(today),
        }
    }
}

// =============================================================================
// Task Repository
// =============================================================================

/// Owner-scoped store for `TaskItem` records.
pub trait TaskRepository: Send + Sync {
    /// Inserts a new task, assigning its identifier and version 1.
    fn insert(&self, task: NewTask) -> RepositoryFuture<TaskItem>;

    /// Finds a task by identifier among the tasks of `owner`.
    ///
    /// A task that exists under a different owner is reported as `Ok(None)`,
    /// exactly like a task that does not exist.
    fn find_owned(&self, id: TaskId, owner: &OwnerId) -> RepositoryFuture<Option<TaskItem>>;

    /// Returns `true` if `owner` has a task with this identifier.
    fn exists_owned(&self, id: TaskId, owner: &OwnerId) -> RepositoryFuture<bool>;

    /// Lists all tasks of `owner`, ordered by due date ascending, then by
    /// creation time descending, then by identifier descending.
    fn list_owned(&self, owner: &OwnerId) -> RepositoryFuture<Vec<TaskItem>>;

    /// Lists at most `limit` tasks of `owner`, newest first.
    fn list_recent(&self, owner: &OwnerId, limit: usize) -> RepositoryFuture<Vec<TaskItem>>;

    /// Counts the tasks of `owner` matching `filter`.
    fn count_owned(&self, owner: &OwnerId, filter: TaskCountFilter) -> RepositoryFuture<u64>;

    /// Writes back a previously loaded task.
    ///
    /// The write only succeeds while the stored row still has `task.version`
    /// and belongs to `task.owner_id`; the stored version is then incremented
    /// and the updated task returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ConcurrencyConflict` if the row changed or
    /// vanished since it was loaded.
    fn update(&self, task: &TaskItem) -> RepositoryFuture<TaskItem>;

    /// Deletes a task of `owner`.
    ///
    /// Returns `Ok(true)` if the task was deleted, `Ok(false)` if `owner` has
    /// no such task.
    fn delete_owned(&self, id: TaskId, owner: &OwnerId) -> RepositoryFuture<bool>;
}

/// Orders tasks the way `TaskRepository::list_owned` promises.
pub fn sort_for_listing(tasks: &mut [TaskItem]) {
    tasks.sort_by(|left, right| {
        left.due_date
            .cmp(&right.due_date)
            .then_with(|| right.created_at.cmp(&left.created_at))
            .then_with(|| right.id.cmp(&left.id))
    });
}

/// Orders tasks newest first, the way `TaskRepository::list_recent` promises.
pub fn sort_most_recent_first(tasks: &mut [TaskItem]) {
    tasks.sort_by(|left, right| {
        right
            .created_at
            .cmp(&left.created_at)
            .then_with(|| right.id.cmp(&left.id))
    });
}

// =============================================================================
// Tests
// =============================================================================
