//! `PostgreSQL` repository implementation.
//!
//! Tasks are stored one row per task with plain columns. Every statement
//! filters on `owner_id`, and updates additionally filter on `version` so a
//! stale write touches zero rows instead of overwriting a newer one.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS task_items (
//!     id BIGSERIAL PRIMARY KEY,
//!     title VARCHAR(100) NOT NULL,
//!     description VARCHAR(1000) NOT NULL,
//!     due_date DATE NOT NULL,
//!     priority VARCHAR(16) NOT NULL,
//!     status VARCHAR(16) NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     owner_id TEXT NOT NULL,
//!     version BIGINT NOT NULL DEFAULT 1
//! );
//! CREATE INDEX IF NOT EXISTS idx_task_items_owner ON task_items(owner_id);
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use futures::FutureExt;
use sqlx::PgPool;

use crate::domain::{NewTask, OwnerId, Priority, TaskId, TaskItem, TaskStatus, Timestamp};
use crate::infrastructure::{RepositoryError, RepositoryFuture, TaskCountFilter, TaskRepository};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS task_items (\
     id BIGSERIAL PRIMARY KEY, \
     title VARCHAR(100) NOT NULL, \
     description VARCHAR(1000) NOT NULL, \
     due_date DATE NOT NULL, \
     priority VARCHAR(16) NOT NULL, \
     status VARCHAR(16) NOT NULL, \
     created_at TIMESTAMPTZ NOT NULL, \
     owner_id TEXT NOT NULL, \
     version BIGINT NOT NULL DEFAULT 1)";

const CREATE_OWNER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_task_items_owner ON task_items(owner_id)";

/// Mirrors `TaskStatus::from_stored`.
const COMPLETED_PREDICATE: &str = "LOWER(TRIM(status)) = 'completed'";

const SELECT_COLUMNS: &str =
    "SELECT id, title, description, due_date, priority, status, created_at, owner_id, version \
     FROM task_items";

fn database_error(error: sqlx::Error) -> RepositoryError {
    RepositoryError::DatabaseError(error.to_string())
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: String,
    due_date: NaiveDate,
    priority: String,
    status: String,
    created_at: DateTime<Utc>,
    owner_id: String,
    version: i64,
}

impl TryFrom<TaskRow> for TaskItem {
    type Error = RepositoryError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let priority = row
            .priority
            .parse::<Priority>()
            .map_err(|error| RepositoryError::SerializationError(error.to_string()))?;
        let owner_id = OwnerId::new(row.owner_id).ok_or_else(|| {
            RepositoryError::SerializationError(format!("task {} has a blank owner", row.id))
        })?;
        let version = u64::try_from(row.version).map_err(|_| {
            RepositoryError::SerializationError(format!(
                "task {} has negative version {}",
                row.id, row.version
            ))
        })?;

        Ok(Self {
            id: TaskId::new(row.id),
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            priority,
            status: TaskStatus::from_stored(&row.status),
            created_at: Timestamp::from_datetime(row.created_at),
            owner_id,
            version,
        })
    }
}

fn rows_into_tasks(rows: Vec<TaskRow>) -> Result<Vec<TaskItem>, RepositoryError> {
    rows.into_iter().map(TaskItem::try_from).collect()
}

fn version_to_database(version: u64) -> Result<i64, RepositoryError> {
    i64::try_from(version)
        .map_err(|_| RepositoryError::SerializationError(format!("version {version} overflows")))
}

// =============================================================================
// PostgreSQL Task Repository
// =============================================================================

/// `PostgreSQL` implementation of `TaskRepository`.
///
/// # Example
///
/// ```ignore
/// let pool = PgPool::connect("postgres://localhost/tasks").await?;
/// let repository = PostgresTaskRepository::new(pool);
/// repository.ensure_schema().await?;
/// ```
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    /// Creates a new `PostgreSQL` task repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `task_items` table and its owner index if they are absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DatabaseError` if either statement fails.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        sqlx::query(CREATE_OWNER_INDEX)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        Ok(())
    }
}

impl TaskRepository for PostgresTaskRepository {
    fn insert(&self, task: NewTask) -> RepositoryFuture<TaskItem> {
        let pool = self.pool.clone();

        async move {
            let (id,): (i64,) = sqlx::query_as(
                "INSERT INTO task_items \
                 (title, description, due_date, priority, status, created_at, owner_id, version) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, 1) RETURNING id",
            )
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.due_date)
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .bind(*task.created_at.as_datetime())
            .bind(task.owner_id.as_str())
            .fetch_one(&pool)
            .await
            .map_err(database_error)?;

            Ok(task.into_stored(TaskId::new(id)))
        }
        .boxed()
    }

    fn find_owned(&self, id: TaskId, owner: &OwnerId) -> RepositoryFuture<Option<TaskItem>> {
        let pool = self.pool.clone();
        let owner = owner.clone();

        async move {
            let row: Option<TaskRow> =
                sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1 AND owner_id = $2"))
                    .bind(id.value())
                    .bind(owner.as_str())
                    .fetch_optional(&pool)
                    .await
                    .map_err(database_error)?;

            row.map(TaskItem::try_from).transpose()
        }
        .boxed()
    }

    fn exists_owned(&self, id: TaskId, owner: &OwnerId) -> RepositoryFuture<bool> {
        let pool = self.pool.clone();
        let owner = owner.clone();

        async move {
            let (exists,): (bool,) = sqlx::query_as(
                "SELECT EXISTS(SELECT 1 FROM task_items WHERE id = $1 AND owner_id = $2)",
            )
            .bind(id.value())
            .bind(owner.as_str())
            .fetch_one(&pool)
            .await
            .map_err(database_error)?;

            Ok(exists)
        }
        .boxed()
    }

    fn list_owned(&self, owner: &OwnerId) -> RepositoryFuture<Vec<TaskItem>> {
        let pool = self.pool.clone();
        let owner = owner.clone();

        async move {
            let rows: Vec<TaskRow> = sqlx::query_as(&format!(
                "{SELECT_COLUMNS} WHERE owner_id = $1 \
                 ORDER BY due_date ASC, created_at DESC, id DESC"
            ))
            .bind(owner.as_str())
            .fetch_all(&pool)
            .await
            .map_err(database_error)?;

            rows_into_tasks(rows)
        }
        .boxed()
    }

    fn list_recent(&self, owner: &OwnerId, limit: usize) -> RepositoryFuture<Vec<TaskItem>> {
        let pool = self.pool.clone();
        let owner = owner.clone();

        async move {
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows: Vec<TaskRow> = sqlx::query_as(&format!(
                "{SELECT_COLUMNS} WHERE owner_id = $1 \
                 ORDER BY created_at DESC, id DESC LIMIT $2"
            ))
            .bind(owner.as_str())
            .bind(limit)
            .fetch_all(&pool)
            .await
            .map_err(database_error)?;

            rows_into_tasks(rows)
        }
        .boxed()
    }

    fn count_owned(&self, owner: &OwnerId, filter: TaskCountFilter) -> RepositoryFuture<u64> {
        let pool = self.pool.clone();
        let owner = owner.clone();

        async move {
            let sql = match filter {
                TaskCountFilter::All => {
                    "SELECT COUNT(*) FROM task_items WHERE owner_id = $1".to_string()
                }
                TaskCountFilter::Completed => format!(
                    "SELECT COUNT(*) FROM task_items \
                     WHERE owner_id = $1 AND {COMPLETED_PREDICATE}"
                ),
                TaskCountFilter::Pending => format!(
                    "SELECT COUNT(*) FROM task_items \
                     WHERE owner_id = $1 AND NOT {COMPLETED_PREDICATE}"
                ),
                TaskCountFilter::Overdue { .. } => format!(
                    "SELECT COUNT(*) FROM task_items \
                     WHERE owner_id = $1 AND NOT {COMPLETED_PREDICATE} AND due_date < $2"
                ),
            };

            let mut query = sqlx::query_as::<_, (i64,)>(&sql).bind(owner.as_str());
            if let TaskCountFilter::Overdue { today } = filter {
                query = query.bind(today);
            }

            let (count,): (i64,) = query.fetch_one(&pool).await.map_err(database_error)?;

            #[allow(clippy::cast_sign_loss)]
            Ok(count as u64)
        }
        .boxed()
    }

    fn update(&self, task: &TaskItem) -> RepositoryFuture<TaskItem> {
        let pool = self.pool.clone();
        let task = task.clone();

        async move {
            let expected_version = version_to_database(task.version)?;

            let result = sqlx::query(
                "UPDATE task_items SET \
                 title = $1, description = $2, due_date = $3, priority = $4, status = $5, \
                 version = version + 1 \
                 WHERE id = $6 AND owner_id = $7 AND version = $8",
            )
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.due_date)
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .bind(task.id.value())
            .bind(task.owner_id.as_str())
            .bind(expected_version)
            .execute(&pool)
            .await
            .map_err(database_error)?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::ConcurrencyConflict {
                    id: task.id,
                    expected: task.version,
                });
            }

            Ok(TaskItem {
                version: task.version + 1,
                ..task
            })
        }
        .boxed()
    }

    fn delete_owned(&self, id: TaskId, owner: &OwnerId) -> RepositoryFuture<bool> {
        let pool = self.pool.clone();
        let owner = owner.clone();

        async move {
            let result = sqlx::query("DELETE FROM task_items WHERE id = $1 AND owner_id = $2")
                .bind(id.value())
                .bind(owner.as_str())
                .execute(&pool)
                .await
                .map_err(database_error)?;

            Ok(result.rows_affected() > 0)
        }
        .boxed()
    }
}

// =============================================================================
// Tests
// =============================================================================
