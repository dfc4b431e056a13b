//! Dashboard aggregation.
//!
//! The four counts and the recent list are independent queries, so they run
//! concurrently and are combined afterward.

use axum::{Json, extract::State};
use chrono::NaiveDate;

use super::dto::DashboardResponse;
use super::error::ApiErrorResponse;
use super::handlers::AppState;
use super::ownership::MaybeOwner;
use crate::domain::{DashboardSummary, OwnerId, Timestamp};
use crate::infrastructure::{RepositoryError, TaskCountFilter, TaskRepository};

/// Builds the dashboard summary for `owner`.
///
/// # Errors
///
/// Returns the first repository error encountered.
pub async fn aggregate(
    repository: &dyn TaskRepository,
    owner: &OwnerId,
    today: NaiveDate,
    recent_limit: usize,
) -> Result<DashboardSummary, RepositoryError> {
    let (total, completed, pending, overdue, recent) = tokio::try_join!(
        repository.count_owned(owner, TaskCountFilter::All),
        repository.count_owned(owner, TaskCountFilter::Completed),
        repository.count_owned(owner, TaskCountFilter::Pending),
        repository.count_owned(owner, TaskCountFilter::Overdue { today }),
        repository.list_recent(owner, recent_limit),
    )?;

    Ok(DashboardSummary {
        total,
        completed,
        pending,
        overdue,
        recent,
    })
}

/// `GET /` and `GET /dashboard`.
///
/// Anonymous visitors get an all-zero summary instead of a challenge.
///
/// # Errors
///
/// Returns 500 if the store fails.
pub async fn dashboard(
    State(state): State<AppState>,
    MaybeOwner(owner): MaybeOwner,
) -> Result<Json<DashboardResponse>, ApiErrorResponse> {
    let today = Timestamp::now().date();

    let summary = match owner {
        Some(owner) => {
            let summary = aggregate(
                state.task_repository.as_ref(),
                &owner,
                today,
                state.config.recent_tasks_limit,
            )
            .await?;
            tracing::debug!(
                owner = %owner,
                total = summary.total,
                overdue = summary.overdue,
                "Dashboard computed"
            );
            summary
        }
        None => DashboardSummary::empty(),
    };

    Ok(Json(DashboardResponse::from_summary(&summary, today)))
}
