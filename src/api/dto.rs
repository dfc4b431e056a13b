//! Data Transfer Objects for API requests and responses.
//!
//! This module contains DTOs that are separate from domain models,
//! providing a clean API contract.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DashboardSummary, TaskInput, TaskItem};

/// Priority names offered by the task forms, in display order.
pub const PRIORITY_CHOICES: [&str; 3] = ["Low", "Medium", "High"];

// =============================================================================
// Request DTOs
// =============================================================================

/// Request body for `POST /tasks/edit/{id}`.
///
/// The body repeats the task identifier; it must match the path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditTaskRequest {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub input: TaskInput,
}

// =============================================================================
// Task DTOs
// =============================================================================

/// Response DTO for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub priority: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    /// Pending and due before today (UTC).
    pub is_overdue: bool,
}

impl TaskResponse {
    /// Builds the response, judging overdue status against `today`.
    #[must_use]
    pub fn from_task(task: &TaskItem, today: NaiveDate) -> Self {
        Self {
            id: task.id.value(),
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            priority: task.priority.as_str().to_string(),
            status: task.status.as_str().to_string(),
            created_at: *task.created_at.as_datetime(),
            is_overdue: task.is_overdue(today),
        }
    }
}

/// Response for `GET /tasks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListView {
    pub tasks: Vec<TaskResponse>,
    pub csrf_token: String,
}

/// Response for `GET /tasks/details/{id}` and `GET /tasks/delete/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetailView {
    pub task: TaskResponse,
    pub csrf_token: String,
}

/// Response for `GET /tasks/create` and `GET /tasks/edit/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFormView {
    /// Present when editing an existing task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskResponse>,
    pub priorities: Vec<String>,
    pub csrf_token: String,
}

impl TaskFormView {
    /// Builds a form view, optionally prefilled with `task`.
    #[must_use]
    pub fn new(task: Option<TaskResponse>, csrf_token: String) -> Self {
        Self {
            task,
            priorities: PRIORITY_CHOICES.iter().map(ToString::to_string).collect(),
            csrf_token,
        }
    }
}

// =============================================================================
// Dashboard DTOs
// =============================================================================

/// Response for `GET /` and `GET /dashboard`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub pending_tasks: u64,
    pub overdue_tasks: u64,
    pub recent_tasks: Vec<TaskResponse>,
}

impl DashboardResponse {
    #[must_use]
    pub fn from_summary(summary: &DashboardSummary, today: NaiveDate) -> Self {
        Self {
            total_tasks: summary.total,
            completed_tasks: summary.completed,
            pending_tasks: summary.pending,
            overdue_tasks: summary.overdue,
            recent_tasks: summary
                .recent
                .iter()
                .map(|task| TaskResponse::from_task(task, today))
                .collect(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
