//! Property tests for the dashboard counts.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use task_tracker::api::aggregate;
use task_tracker::domain::{DashboardSummary, NewTask, OwnerId, Priority, TaskStatus, Timestamp};
use task_tracker::infrastructure::{InMemoryTaskRepository, TaskRepository};

/// Fixed reference day; due dates are generated around it.
fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

/// `(owner index, days after 2024-06-01, completed)` per task.
fn tasks_strategy() -> impl Strategy<Value = Vec<(usize, u64, bool)>> {
    prop::collection::vec((0_usize..2, 0_u64..30, any::<bool>()), 0..40)
}

fn summarize(tasks: &[(usize, u64, bool)], limit: usize) -> DashboardSummary {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    runtime.block_on(async {
        let repository = InMemoryTaskRepository::new();
        let base = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        for (index, (owner, offset, completed)) in tasks.iter().enumerate() {
            let status = if *completed {
                TaskStatus::Completed
            } else {
                TaskStatus::Pending
            };
            repository
                .insert(NewTask {
                    title: format!("Task {index}"),
                    description: "Generated task".to_string(),
                    due_date: base.checked_add_days(Days::new(*offset)).unwrap(),
                    priority: Priority::Medium,
                    status,
                    created_at: Timestamp::now(),
                    owner_id: OwnerId::new(format!("owner-{owner}")).unwrap(),
                })
                .await
                .unwrap();
        }

        aggregate(&repository, &OwnerId::new("owner-0").unwrap(), today(), limit)
            .await
            .unwrap()
    })
}

proptest! {
    /// Pending and completed partition the owner's tasks.
    #[test]
    fn pending_is_total_minus_completed(tasks in tasks_strategy(), limit in 1_usize..8) {
        let summary = summarize(&tasks, limit);
        let owned = tasks.iter().filter(|(owner, _, _)| *owner == 0).count();

        prop_assert_eq!(summary.total, owned as u64);
        prop_assert_eq!(summary.pending, summary.total - summary.completed);
        prop_assert_eq!(summary.recent.len(), owned.min(limit));
    }

    /// Only pending tasks due strictly before today are overdue.
    #[test]
    fn overdue_never_exceeds_pending(tasks in tasks_strategy()) {
        let summary = summarize(&tasks, 5);
        let base = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let expected = tasks
            .iter()
            .filter(|(owner, offset, completed)| {
                *owner == 0
                    && !completed
                    && base.checked_add_days(Days::new(*offset)).unwrap() < today()
            })
            .count();

        prop_assert!(summary.overdue <= summary.pending);
        prop_assert_eq!(summary.overdue, expected as u64);
    }
}
