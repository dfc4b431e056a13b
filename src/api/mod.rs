//! API module for HTTP handlers.
//!
//! This module contains route definitions and request/response handlers.

pub mod csrf;
pub mod dashboard;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod ownership;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

pub use csrf::{CSRF_HEADER, CsrfGuard, CsrfKeyError};
pub use dashboard::{aggregate, dashboard};
pub use dto::{
    DashboardResponse, EditTaskRequest, TaskDetailView, TaskFormView, TaskListView, TaskResponse,
};
pub use error::{ApiError, ApiErrorResponse, FieldError};
pub use handlers::{
    AppConfig, AppConfigError, AppState, HealthResponse, create_form, create_task,
    delete_confirmation, delete_task, edit_form, edit_task, health_check, list_tasks,
    task_details, toggle_task_status,
};
pub use ownership::{CurrentOwner, MaybeOwner, VerifiedOwner};

/// Builds the application router with request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/dashboard", get(dashboard))
        .route("/health", get(health_check))
        // Task queries
        .route("/tasks", get(list_tasks))
        .route("/tasks/details/{id}", get(task_details))
        // Task mutations
        .route("/tasks/create", get(create_form).post(create_task))
        .route("/tasks/edit/{id}", get(edit_form).post(edit_task))
        .route(
            "/tasks/delete/{id}",
            get(delete_confirmation).post(delete_task),
        )
        .route("/tasks/toggle-status/{id}", post(toggle_task_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
