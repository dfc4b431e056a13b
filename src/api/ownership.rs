//! Ownership guard.
//!
//! Resolves the acting principal from the request and scopes every task
//! lookup to it. A task owned by someone else is indistinguishable from a
//! task that does not exist.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderName, request::Parts},
};

use super::error::ApiErrorResponse;
use super::handlers::AppState;
use crate::domain::{OwnerId, TaskId, TaskItem};
use crate::infrastructure::TaskRepository;

// =============================================================================
// Principal Resolution
// =============================================================================

/// Reads the principal from `header`.
///
/// Missing, non-UTF-8 and blank values all resolve to `None`.
#[must_use]
pub fn resolve_current_owner(headers: &HeaderMap, header: &HeaderName) -> Option<OwnerId> {
    headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .and_then(OwnerId::new)
}

/// Like [`resolve_current_owner`], but answers an anonymous request with the
/// authentication challenge.
///
/// # Errors
///
/// Returns a 401 `ApiErrorResponse` if no principal is present.
pub fn require_owner(
    headers: &HeaderMap,
    header: &HeaderName,
) -> Result<OwnerId, ApiErrorResponse> {
    resolve_current_owner(headers, header).ok_or_else(|| {
        tracing::debug!("Rejected anonymous request");
        ApiErrorResponse::authentication_required()
    })
}

/// Extractor for the signed-in principal; rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct CurrentOwner(pub OwnerId);

impl FromRequestParts<AppState> for CurrentOwner {
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_owner(&parts.headers, &state.config.principal_header).map(Self)
    }
}

/// Extractor for the principal, if any.
#[derive(Debug, Clone)]
pub struct MaybeOwner(pub Option<OwnerId>);

impl FromRequestParts<AppState> for MaybeOwner {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_current_owner(
            &parts.headers,
            &state.config.principal_header,
        )))
    }
}

/// Extractor for state-changing requests: the signed-in principal whose
/// anti-forgery token checked out.
///
/// Runs before the body is read, so a rejected request never reaches the store.
#[derive(Debug, Clone)]
pub struct VerifiedOwner(pub OwnerId);

impl FromRequestParts<AppState> for VerifiedOwner {
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let owner = require_owner(&parts.headers, &state.config.principal_header)?;
        state.csrf.verify_request(&owner, &parts.headers)?;
        Ok(Self(owner))
    }
}

// =============================================================================
// Owner-Scoped Queries
// =============================================================================

/// Parses a path segment as a task identifier.
///
/// # Errors
///
/// Returns 404 for anything that is not an integer.
pub fn parse_task_id(segment: &str) -> Result<TaskId, ApiErrorResponse> {
    TaskId::parse(segment).ok_or_else(|| ApiErrorResponse::not_found(task_not_found(segment)))
}

/// Loads a task of `owner`.
///
/// # Errors
///
/// Returns 404 if the task does not exist or belongs to someone else, and
/// 500 if the store fails.
pub async fn load_owned(
    repository: &dyn TaskRepository,
    id: TaskId,
    owner: &OwnerId,
) -> Result<TaskItem, ApiErrorResponse> {
    repository.find_owned(id, owner).await?.ok_or_else(|| {
        tracing::debug!(task_id = %id, owner = %owner, "Task not found for owner");
        ApiErrorResponse::not_found(task_not_found(id))
    })
}

/// Lists the tasks of `owner`, ordered by due date, then newest first.
///
/// # Errors
///
/// Returns 500 if the store fails.
pub async fn list_owned(
    repository: &dyn TaskRepository,
    owner: &OwnerId,
) -> Result<Vec<TaskItem>, ApiErrorResponse> {
    Ok(repository.list_owned(owner).await?)
}

pub(super) fn task_not_found(id: impl std::fmt::Display) -> String {
    format!("Task {id} not found")
}

// =============================================================================
// Tests
// =============================================================================
