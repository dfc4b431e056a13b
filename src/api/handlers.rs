//! HTTP handlers for the task tracker.
//!
//! Every task handler follows the same order of checks: resolve the
//! principal (401 if absent), verify the anti-forgery token on POSTs (403),
//! then read the body, validate, and touch the store scoped to the owner.
//! Successful mutations answer `303 See Other` pointing at `/tasks`.

use std::env;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::HeaderName,
    response::Redirect,
};
use thiserror::Error;

use super::csrf::{CsrfGuard, CsrfKeyError};
use super::dto::{EditTaskRequest, TaskDetailView, TaskFormView, TaskListView, TaskResponse};
use super::error::ApiErrorResponse;
use super::ownership::{
    CurrentOwner, VerifiedOwner, list_owned, load_owned, parse_task_id, task_not_found,
};
use crate::domain::{
    DEFAULT_RECENT_LIMIT, OwnerId, TaskInput, TaskItem, Timestamp, apply_create_defaults,
    apply_edit, normalize, toggle_status, validate,
};
use crate::infrastructure::{RepositoryError, TaskRepository};

/// Where successful mutations redirect to.
pub const TASKS_PATH: &str = "/tasks";

/// Principal header used when `PRINCIPAL_HEADER` is not set.
pub const DEFAULT_PRINCIPAL_HEADER: &str = "x-authenticated-user";

// =============================================================================
// Application Configuration
// =============================================================================

/// Request-handling settings.
#[derive(Clone)]
pub struct AppConfig {
    /// Header the upstream identity layer puts the principal in.
    pub principal_header: HeaderName,
    /// Key for anti-forgery tokens; a random key is used when `None`.
    pub csrf_secret: Option<String>,
    /// Number of tasks in the dashboard's recent list.
    pub recent_tasks_limit: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("principal_header", &self.principal_header)
            .field("csrf_secret", &self.csrf_secret.as_ref().map(|_| "<redacted>"))
            .field("recent_tasks_limit", &self.recent_tasks_limit)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            principal_header: HeaderName::from_static(DEFAULT_PRINCIPAL_HEADER),
            csrf_secret: None,
            recent_tasks_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl AppConfig {
    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PRINCIPAL_HEADER`: header carrying the principal (default `x-authenticated-user`)
    /// - `CSRF_SECRET`: anti-forgery key (random per process when unset)
    /// - `RECENT_TASKS_LIMIT`: dashboard recent list size (default 5)
    ///
    /// # Errors
    ///
    /// Returns `AppConfigError` if a value is present but invalid.
    pub fn from_env() -> Result<Self, AppConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a configuration from an arbitrary variable source.
    ///
    /// Blank values are treated as absent.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let principal_header = match read("PRINCIPAL_HEADER") {
            Some(value) => HeaderName::from_bytes(value.to_ascii_lowercase().as_bytes())
                .map_err(|_| AppConfigError::InvalidPrincipalHeader(value))?,
            None => HeaderName::from_static(DEFAULT_PRINCIPAL_HEADER),
        };

        let recent_tasks_limit = match read("RECENT_TASKS_LIMIT") {
            Some(value) => value
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or(AppConfigError::InvalidRecentTasksLimit(value))?,
            None => DEFAULT_RECENT_LIMIT,
        };

        Ok(Self {
            principal_header,
            csrf_secret: read("CSRF_SECRET"),
            recent_tasks_limit,
        })
    }
}

/// Errors in the request-handling configuration.
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Invalid PRINCIPAL_HEADER: '{0}' is not a valid header name")]
    InvalidPrincipalHeader(String),

    #[error("Invalid RECENT_TASKS_LIMIT: '{0}'. Expected a positive integer")]
    InvalidRecentTasksLimit(String),

    #[error(transparent)]
    CsrfKey(#[from] CsrfKeyError),
}

// =============================================================================
// Application State
// =============================================================================

/// Shared application dependencies.
///
/// The repository is a trait object so the backend can be chosen at startup
/// by `RepositoryFactory`.
#[derive(Clone)]
pub struct AppState {
    pub task_repository: Arc<dyn TaskRepository>,
    pub csrf: CsrfGuard,
    pub config: AppConfig,
}

impl AppState {
    /// Creates the state, keying the anti-forgery guard from `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppConfigError::CsrfKey` if the key cannot be used.
    pub fn new(
        task_repository: Arc<dyn TaskRepository>,
        config: AppConfig,
    ) -> Result<Self, AppConfigError> {
        let csrf = if let Some(secret) = &config.csrf_secret {
            CsrfGuard::new(secret.as_bytes())?
        } else {
            tracing::warn!(
                "CSRF_SECRET is not set; using a random key, issued tokens will not survive a restart"
            );
            CsrfGuard::random()?
        };

        Ok(Self {
            task_repository,
            csrf,
            config,
        })
    }
}

// =============================================================================
// GET /health Handler
// =============================================================================

/// Health check response body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Health check endpoint.
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// =============================================================================
// Read Handlers
// =============================================================================

/// `GET /tasks`: the owner's tasks, due soonest first.
///
/// # Errors
///
/// 401 without a principal, 500 if the store fails.
pub async fn list_tasks(
    State(state): State<AppState>,
    CurrentOwner(owner): CurrentOwner,
) -> Result<Json<TaskListView>, ApiErrorResponse> {
    let tasks = list_owned(state.task_repository.as_ref(), &owner).await?;
    let today = Timestamp::now().date();

    Ok(Json(TaskListView {
        tasks: tasks
            .iter()
            .map(|task| TaskResponse::from_task(task, today))
            .collect(),
        csrf_token: state.csrf.issue(&owner),
    }))
}

/// `GET /tasks/details/{id}`.
///
/// # Errors
///
/// 401 without a principal, 404 if the owner has no such task.
pub async fn task_details(
    State(state): State<AppState>,
    CurrentOwner(owner): CurrentOwner,
    Path(id): Path<String>,
) -> Result<Json<TaskDetailView>, ApiErrorResponse> {
    detail_view(&state, &owner, &id).await.map(Json)
}

/// `GET /tasks/create`: an empty form.
///
/// # Errors
///
/// 401 without a principal.
pub async fn create_form(
    State(state): State<AppState>,
    CurrentOwner(owner): CurrentOwner,
) -> Result<Json<TaskFormView>, ApiErrorResponse> {
    Ok(Json(TaskFormView::new(None, state.csrf.issue(&owner))))
}

/// `GET /tasks/edit/{id}`: the form prefilled with the task.
///
/// # Errors
///
/// 401 without a principal, 404 if the owner has no such task.
pub async fn edit_form(
    State(state): State<AppState>,
    CurrentOwner(owner): CurrentOwner,
    Path(id): Path<String>,
) -> Result<Json<TaskFormView>, ApiErrorResponse> {
    let view = detail_view(&state, &owner, &id).await?;
    Ok(Json(TaskFormView::new(Some(view.task), view.csrf_token)))
}

/// `GET /tasks/delete/{id}`: the task to confirm deletion of.
///
/// # Errors
///
/// 401 without a principal, 404 if the owner has no such task.
pub async fn delete_confirmation(
    State(state): State<AppState>,
    CurrentOwner(owner): CurrentOwner,
    Path(id): Path<String>,
) -> Result<Json<TaskDetailView>, ApiErrorResponse> {
    detail_view(&state, &owner, &id).await.map(Json)
}

async fn detail_view(
    state: &AppState,
    owner: &OwnerId,
    segment: &str,
) -> Result<TaskDetailView, ApiErrorResponse> {
    let id = parse_task_id(segment)?;
    let task = load_owned(state.task_repository.as_ref(), id, owner).await?;

    Ok(TaskDetailView {
        task: TaskResponse::from_task(&task, Timestamp::now().date()),
        csrf_token: state.csrf.issue(owner),
    })
}

// =============================================================================
// Mutation Handlers
// =============================================================================

/// `POST /tasks/create`.
///
/// Status, creation time and owner are set by the server; the body cannot
/// supply them.
///
/// # Errors
///
/// 401 without a principal, 403 on a bad anti-forgery token, 422 with every
/// field violation and the normalized input when validation fails.
pub async fn create_task(
    State(state): State<AppState>,
    VerifiedOwner(owner): VerifiedOwner,
    body: Result<Json<TaskInput>, JsonRejection>,
) -> Result<Redirect, ApiErrorResponse> {
    let Json(input) = body?;
    let normalized = normalize(input);
    let fields = validate(&normalized).map_err(|errors| {
        tracing::warn!(owner = %owner, %errors, "Rejected invalid task");
        ApiErrorResponse::validation_failed(errors, &normalized)
    })?;

    let task = apply_create_defaults(fields, owner, Timestamp::now());
    let stored = state.task_repository.insert(task).await?;

    tracing::info!(task_id = %stored.id, owner = %stored.owner_id, "Task created");
    Ok(Redirect::to(TASKS_PATH))
}

/// `POST /tasks/edit/{id}`.
///
/// Only title, description, due date and priority change.
///
/// # Errors
///
/// 401 without a principal, 403 on a bad anti-forgery token, 404 with
/// `MALFORMED_REQUEST` if the body's `id` is missing or differs from the
/// path, 404 if the owner has no such task, 422 when validation fails, 500
/// if the task changed concurrently and still exists.
pub async fn edit_task(
    State(state): State<AppState>,
    VerifiedOwner(owner): VerifiedOwner,
    Path(segment): Path<String>,
    body: Result<Json<EditTaskRequest>, JsonRejection>,
) -> Result<Redirect, ApiErrorResponse> {
    let id = parse_task_id(&segment)?;
    let Json(request) = body?;
    if request.id != Some(id.value()) {
        tracing::warn!(task_id = %id, body_id = ?request.id, "Edit request names another task");
        return Err(ApiErrorResponse::malformed_request(
            "Task id in the body does not match the path",
        ));
    }

    let existing = load_owned(state.task_repository.as_ref(), id, &owner).await?;

    let normalized = normalize(request.input);
    let fields = validate(&normalized).map_err(|errors| {
        tracing::warn!(task_id = %id, owner = %owner, %errors, "Rejected invalid edit");
        ApiErrorResponse::validation_failed(errors, &normalized)
    })?;
    let updated = save_changes(&state, &apply_edit(existing, fields)).await?;

    tracing::info!(task_id = %updated.id, owner = %owner, "Task updated");
    Ok(Redirect::to(TASKS_PATH))
}

/// `POST /tasks/delete/{id}`.
///
/// # Errors
///
/// 401 without a principal, 403 on a bad anti-forgery token, 404 if the
/// owner has no such task.
pub async fn delete_task(
    State(state): State<AppState>,
    VerifiedOwner(owner): VerifiedOwner,
    Path(segment): Path<String>,
) -> Result<Redirect, ApiErrorResponse> {
    let id = parse_task_id(&segment)?;
    if !state.task_repository.delete_owned(id, &owner).await? {
        tracing::debug!(task_id = %id, owner = %owner, "Nothing to delete");
        return Err(ApiErrorResponse::not_found(task_not_found(id)));
    }

    tracing::info!(task_id = %id, owner = %owner, "Task deleted");
    Ok(Redirect::to(TASKS_PATH))
}

/// `POST /tasks/toggle-status/{id}`: flips between Pending and Completed.
///
/// # Errors
///
/// 401 without a principal, 403 on a bad anti-forgery token, 404 if the
/// owner has no such task, 500 if the task changed concurrently and still
/// exists.
pub async fn toggle_task_status(
    State(state): State<AppState>,
    VerifiedOwner(owner): VerifiedOwner,
    Path(segment): Path<String>,
) -> Result<Redirect, ApiErrorResponse> {
    let id = parse_task_id(&segment)?;
    let existing = load_owned(state.task_repository.as_ref(), id, &owner).await?;
    let updated = save_changes(&state, &toggle_status(existing)).await?;

    tracing::info!(task_id = %id, owner = %owner, status = %updated.status, "Task status toggled");
    Ok(Redirect::to(TASKS_PATH))
}

/// Writes back a loaded task.
///
/// A version conflict is resolved by checking whether the task still exists:
/// if it was deleted meanwhile the request gets 404, otherwise the conflict
/// is unrecoverable and reported as 500.
async fn save_changes(state: &AppState, task: &TaskItem) -> Result<TaskItem, ApiErrorResponse> {
    match state.task_repository.update(task).await {
        Ok(updated) => Ok(updated),
        Err(RepositoryError::ConcurrencyConflict { id, expected }) => {
            if state.task_repository.exists_owned(id, &task.owner_id).await? {
                tracing::error!(
                    task_id = %id,
                    owner = %task.owner_id,
                    expected_version = expected,
                    "Task was modified concurrently"
                );
                Err(ApiErrorResponse::internal_error(
                    "The task was modified by another request",
                ))
            } else {
                tracing::warn!(task_id = %id, owner = %task.owner_id, "Task deleted during update");
                Err(ApiErrorResponse::not_found(task_not_found(id)))
            }
        }
        Err(error) => Err(error.into()),
    }
}

// =============================================================================
// Tests
// =============================================================================
