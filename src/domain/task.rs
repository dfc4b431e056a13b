//! Task domain model.
//!
//! This module contains the `TaskItem` entity and the value objects it is
//! built from. Every task belongs to exactly one owner.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Value Objects - Newtypes
// =============================================================================

/// Unique identifier for a task.
///
/// Identifiers are assigned by the store when a task is inserted and never
/// change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// Creates a `TaskId` from a raw store identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Parses an identifier from a path segment.
    ///
    /// Returns `None` for anything that is not a plain integer, so callers can
    /// treat malformed identifiers the same way as unknown ones.
    #[must_use]
    pub fn parse(segment: &str) -> Option<Self> {
        segment.trim().parse::<i64>().ok().map(Self)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Opaque identifier of the principal that owns a task.
///
/// The value comes from the identity layer in front of this service and is
/// never parsed or interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Creates an `OwnerId`, rejecting blank identifiers.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value: String = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A timestamp wrapper for `DateTime<Utc>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a `Timestamp` from a `DateTime<Utc>`.
    #[must_use]
    pub const fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Returns the inner `DateTime<Utc>`.
    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the current time as a `Timestamp`.
    ///
    /// **Note**: This reads the system clock. Lifecycle functions take the
    /// timestamp as an argument instead of calling this themselves.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the UTC calendar date of this timestamp.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Error returned when a stored or submitted enum value is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {kind} value: '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

/// The status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    /// Task is still open.
    #[default]
    Pending,
    /// Task has been done.
    Completed,
}

impl TaskStatus {
    /// Returns the canonical text stored for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
        }
    }

    /// Reads a stored status.
    ///
    /// A trimmed, case-insensitive "Completed" is `Completed`; every other
    /// value counts as `Pending`.
    #[must_use]
    pub fn from_stored(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case(Self::Completed.as_str()) {
            Self::Completed
        } else {
            Self::Pending
        }
    }

    /// Returns `true` if the status is `Completed`.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns the other status.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Completed => Self::Pending,
            Self::Pending => Self::Completed,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// The priority level of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority, used when none is given.
    #[default]
    Medium,
    /// High priority.
    High,
}

impl Priority {
    /// Returns the canonical text for this priority.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    /// Parses the exact canonical names `Low`, `Medium` and `High`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            _ => Err(UnknownVariant {
                kind: "priority",
                value: value.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// =============================================================================
// Task
// =============================================================================

/// A task that has not been stored yet.
///
/// Produced by the lifecycle rules; the store assigns the identifier and the
/// initial version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub status: TaskStatus,
    pub created_at: Timestamp,
    pub owner_id: OwnerId,
}

impl NewTask {
    /// Attaches a store-assigned identifier, producing a version 1 `TaskItem`.
    #[must_use]
    pub fn into_stored(self, id: TaskId) -> TaskItem {
        TaskItem {
            id,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            priority: self.priority,
            status: self.status,
            created_at: self.created_at,
            owner_id: self.owner_id,
            version: 1,
        }
    }
}

/// A stored task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    /// Store-assigned identifier.
    pub id: TaskId,
    /// Trimmed title, 3 to 100 characters.
    pub title: String,
    /// Trimmed description, 5 to 1000 characters.
    pub description: String,
    /// Calendar date the task is due.
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub status: TaskStatus,
    /// Set once when the task is created.
    pub created_at: Timestamp,
    /// Principal the task belongs to.
    pub owner_id: OwnerId,
    /// Row version for optimistic concurrency.
    pub version: u64,
}

impl TaskItem {
    /// Returns `true` if the task is owned by `owner`.
    #[must_use]
    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner_id == owner
    }

    /// Returns `true` if the task is not completed and its due date is
    /// strictly before `today`.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_completed() && self.due_date < today
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample_task(status: TaskStatus, due_date: NaiveDate) -> TaskItem {
        NewTask {
            title: "Buy milk".to_string(),
            description: "2% milk, 1 gallon".to_string(),
            due_date,
            priority: Priority::Medium,
            status,
            created_at: Timestamp::now(),
            owner_id: OwnerId::new("alice").unwrap(),
        }
        .into_stored(TaskId::new(1))
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[rstest]
    #[case("7", Some(7))]
    #[case(" 42 ", Some(42))]
    #[case("abc", None)]
    #[case("", None)]
    #[case("1.5", None)]
    fn test_task_id_parse(#[case] segment: &str, #[case] expected: Option<i64>) {
        assert_eq!(TaskId::parse(segment), expected.map(TaskId::new));
    }

    #[rstest]
    fn test_owner_id_rejects_blank() {
        assert!(OwnerId::new("").is_none());
        assert!(OwnerId::new("   ").is_none());
        assert_eq!(OwnerId::new(" bob ").unwrap().as_str(), "bob");
    }

    #[rstest]
    #[case("Completed", TaskStatus::Completed)]
    #[case("completed", TaskStatus::Completed)]
    #[case("  COMPLETED ", TaskStatus::Completed)]
    #[case("Pending", TaskStatus::Pending)]
    #[case("", TaskStatus::Pending)]
    #[case("Archived", TaskStatus::Pending)]
    fn test_task_status_from_stored(#[case] stored: &str, #[case] expected: TaskStatus) {
        assert_eq!(TaskStatus::from_stored(stored), expected);
    }

    #[rstest]
    fn test_task_status_toggled_is_involution() {
        for status in [TaskStatus::Pending, TaskStatus::Completed] {
            assert_ne!(status.toggled(), status);
            assert_eq!(status.toggled().toggled(), status);
        }
    }

    #[rstest]
    #[case("Low", Priority::Low)]
    #[case("Medium", Priority::Medium)]
    #[case("High", Priority::High)]
    fn test_priority_from_str(#[case] text: &str, #[case] expected: Priority) {
        assert_eq!(text.parse::<Priority>().unwrap(), expected);
        assert_eq!(expected.as_str(), text);
    }

    #[rstest]
    #[case("low")]
    #[case("Critical")]
    #[case(" High")]
    fn test_priority_from_str_rejects_non_canonical(#[case] text: &str) {
        assert!(text.parse::<Priority>().is_err());
    }

    #[rstest]
    fn test_new_task_into_stored_starts_at_version_one() {
        let task = sample_task(TaskStatus::Pending, date(2024, 1, 1));
        assert_eq!(task.id, TaskId::new(1));
        assert_eq!(task.version, 1);
    }

    #[rstest]
    fn test_is_overdue() {
        let today = date(2024, 6, 10);
        assert!(sample_task(TaskStatus::Pending, date(2024, 6, 9)).is_overdue(today));
        assert!(!sample_task(TaskStatus::Pending, date(2024, 6, 10)).is_overdue(today));
        assert!(!sample_task(TaskStatus::Completed, date(2024, 6, 9)).is_overdue(today));
    }

    #[rstest]
    fn test_task_serialization() {
        let task = sample_task(TaskStatus::Completed, date(2024, 1, 1));
        let json = serde_json::to_value(&task).expect("Failed to serialize");
        assert_eq!(json["id"], 1);
        assert_eq!(json["status"], "Completed");
        assert_eq!(json["priority"], "Medium");
        assert_eq!(json["due_date"], "2024-01-01");
        assert_eq!(json["owner_id"], "alice");
    }
}
