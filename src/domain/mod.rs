//! Domain module for task tracking.
//!
//! This module contains the task entity, its value objects, the lifecycle
//! rules applied before any store mutation, and the dashboard summary model.

pub mod dashboard;
pub mod lifecycle;
pub mod task;

pub use dashboard::{DEFAULT_RECENT_LIMIT, DashboardSummary};
pub use lifecycle::{
    FieldViolation, NormalizedInput, TaskField, TaskFields, TaskInput, ValidationErrors,
    apply_create_defaults, apply_edit, normalize, toggle_status, validate,
};
pub use task::{NewTask, OwnerId, Priority, TaskId, TaskItem, TaskStatus, Timestamp};
