//! Dashboard summary model.

use super::task::TaskItem;

/// Number of recent tasks shown on the dashboard unless configured otherwise.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Aggregate counts over one owner's tasks plus the most recently created ones.
///
/// The counts are gathered by independent queries and may disagree with each
/// other when tasks change while they are being computed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    pub total: u64,
    pub completed: u64,
    /// Tasks whose status is anything other than completed.
    pub pending: u64,
    /// Pending tasks whose due date lies strictly before today (UTC).
    pub overdue: u64,
    /// Newest first.
    pub recent: Vec<TaskItem>,
}

impl DashboardSummary {
    /// Summary shown when no principal is signed in.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}
