//! Task lifecycle rules.
//!
//! Every task passes through these functions before it reaches the store:
//! input is normalized, validated as a whole, and only then turned into a
//! `NewTask` or applied to an existing `TaskItem`. All functions here are
//! pure; the owner and the current time are passed in by the caller.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::task::{NewTask, OwnerId, Priority, TaskItem, TaskStatus, Timestamp};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MIN_CHARS: usize = 5;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// Priority substituted when the submitted one is blank.
pub const DEFAULT_PRIORITY: &str = "Medium";

/// Accepted due date format.
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Input
// =============================================================================

/// Client-editable task fields as submitted.
///
/// Server-managed fields (status, creation time, owner, version) have no
/// place here, so a client cannot supply them.
///
/// Every field is read as raw text so that a badly typed or unparseable value
/// surfaces as a validation violation next to the others rather than failing
/// the whole body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskInput {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub priority: Option<String>,
}

/// Reads any JSON value as text: strings as-is, `null` as absent, anything
/// else in its JSON form.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

/// Task input after whitespace normalization and priority defaulting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedInput {
    pub title: String,
    pub description: String,
    /// As submitted, trimmed; parsed by [`validate`].
    pub due_date: String,
    pub priority: String,
}

/// Validated client-editable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub priority: Priority,
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Client-editable field a violation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    Title,
    Description,
    DueDate,
    Priority,
}

impl TaskField {
    /// Returns the wire name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::DueDate => "due_date",
            Self::Priority => "priority",
        }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: TaskField,
    pub message: &'static str,
}

impl FieldViolation {
    const fn new(field: TaskField, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Every validation failure found in one submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task validation failed with {} violation(s)", .violations.len())]
pub struct ValidationErrors {
    pub violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    /// Returns `true` if any violation refers to `field`.
    #[must_use]
    pub fn has_field(&self, field: TaskField) -> bool {
        self.violations.iter().any(|violation| violation.field == field)
    }

    /// Returns the messages reported for `field`.
    pub fn messages_for(&self, field: TaskField) -> impl Iterator<Item = &'static str> + '_ {
        self.violations
            .iter()
            .filter(move |violation| violation.field == field)
            .map(|violation| violation.message)
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Trims the text fields and defaults a blank priority to `Medium`.
#[must_use]
pub fn normalize(input: TaskInput) -> NormalizedInput {
    let trimmed = |value: Option<String>| {
        value
            .as_deref()
            .map_or_else(String::new, |text| text.trim().to_string())
    };

    let priority = match input.priority.as_deref().map(str::trim) {
        Some(priority) if !priority.is_empty() => priority.to_string(),
        _ => DEFAULT_PRIORITY.to_string(),
    };

    NormalizedInput {
        title: trimmed(input.title),
        description: trimmed(input.description),
        due_date: trimmed(input.due_date),
        priority,
    }
}

/// Validates normalized input, collecting every violation.
///
/// The same rules apply to creating and editing a task.
///
/// # Errors
///
/// Returns [`ValidationErrors`] listing all violations, in field order.
pub fn validate(input: &NormalizedInput) -> Result<TaskFields, ValidationErrors> {
    let mut violations = Vec::new();

    check_text(
        &input.title,
        TaskField::Title,
        TITLE_MIN_CHARS..=TITLE_MAX_CHARS,
        "Title is required.",
        "Title must be between 3 and 100 characters.",
        &mut violations,
    );
    check_text(
        &input.description,
        TaskField::Description,
        DESCRIPTION_MIN_CHARS..=DESCRIPTION_MAX_CHARS,
        "Description is required.",
        "Description must be between 5 and 1000 characters.",
        &mut violations,
    );

    let due_date = if input.due_date.is_empty() {
        violations.push(FieldViolation::new(
            TaskField::DueDate,
            "Due date is required.",
        ));
        None
    } else {
        let parsed = NaiveDate::parse_from_str(&input.due_date, DUE_DATE_FORMAT).ok();
        if parsed.is_none() {
            violations.push(FieldViolation::new(
                TaskField::DueDate,
                "Due date must be a valid date (YYYY-MM-DD).",
            ));
        }
        parsed
    };

    let priority = input.priority.parse::<Priority>().ok();
    if priority.is_none() {
        violations.push(FieldViolation::new(
            TaskField::Priority,
            "Priority must be Low, Medium, or High.",
        ));
    }

    match (due_date, priority) {
        (Some(due_date), Some(priority)) if violations.is_empty() => Ok(TaskFields {
            title: input.title.clone(),
            description: input.description.clone(),
            due_date,
            priority,
        }),
        _ => Err(ValidationErrors { violations }),
    }
}

fn check_text(
    value: &str,
    field: TaskField,
    length: std::ops::RangeInclusive<usize>,
    required_message: &'static str,
    length_message: &'static str,
    violations: &mut Vec<FieldViolation>,
) {
    if value.is_empty() {
        violations.push(FieldViolation::new(field, required_message));
    } else if !length.contains(&value.chars().count()) {
        violations.push(FieldViolation::new(field, length_message));
    }
}

/// Builds a new task owned by `owner`, created at `now`, in `Pending` status.
#[must_use]
pub fn apply_create_defaults(fields: TaskFields, owner: OwnerId, now: Timestamp) -> NewTask {
    NewTask {
        title: fields.title,
        description: fields.description,
        due_date: fields.due_date,
        priority: fields.priority,
        status: TaskStatus::Pending,
        created_at: now,
        owner_id: owner,
    }
}

/// Copies the client-editable fields onto an existing task.
///
/// Identifier, status, creation time, owner and version are left as they are.
#[must_use]
pub fn apply_edit(existing: TaskItem, fields: TaskFields) -> TaskItem {
    TaskItem {
        title: fields.title,
        description: fields.description,
        due_date: fields.due_date,
        priority: fields.priority,
        ..existing
    }
}

/// Flips a task between `Pending` and `Completed`.
#[must_use]
pub fn toggle_status(task: TaskItem) -> TaskItem {
    TaskItem {
        status: task.status.toggled(),
        ..task
    }
}

// =============================================================================
// Tests
// =============================================================================
