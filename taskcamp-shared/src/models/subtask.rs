/// Subtask model and database operations
///
/// Subtasks are checklist items under a task. Their completion flags drive
/// the owning task's derived status, so every handler that mutates a subtask
/// follows up with `Task::recompute_status`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subtasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     is_completed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::UserSummary;

/// Subtask model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subtask {
    /// Unique subtask ID (UUID v4)
    pub id: Uuid,

    /// Task the subtask belongs to
    pub task_id: Uuid,

    /// Subtask title
    pub title: String,

    /// Completion flag; drives the owning task's status
    pub is_completed: bool,

    /// Member who created the subtask
    pub created_by: Uuid,

    /// When the subtask was created
    pub created_at: DateTime<Utc>,

    /// When the subtask was last updated
    pub updated_at: DateTime<Utc>,
}

/// A subtask joined with its creator's public profile
///
/// Returned by the task detail and subtask listing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SubtaskWithCreator {
    /// The subtask itself
    #[serde(flatten)]
    pub subtask: Subtask,

    /// Public profile of the member who created it
    pub creator: Option<UserSummary>,
}

impl Subtask {
    /// Creates a new subtask under a task
    pub async fn create(
        pool: &PgPool,
        task_id: Uuid,
        title: &str,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let subtask = sqlx::query_as::<_, Subtask>(
            r#"
            INSERT INTO subtasks (task_id, title, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, title, is_completed, created_by, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(title.trim())
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        Ok(subtask)
    }

    /// Lists a task's subtasks with creator profiles, oldest first
    pub async fn list_detailed(
        pool: &PgPool,
        task_id: Uuid,
    ) -> Result<Vec<SubtaskWithCreator>, sqlx::Error> {
        let subtasks = sqlx::query_as::<_, Subtask>(
            r#"
            SELECT id, task_id, title, is_completed, created_by, created_at, updated_at
            FROM subtasks
            WHERE task_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        let creator_ids: Vec<Uuid> = subtasks.iter().map(|s| s.created_by).collect();

        let summaries = sqlx::query_as::<_, UserSummary>(
            "SELECT id, email, username, full_name, avatar_url FROM users WHERE id = ANY($1)",
        )
        .bind(&creator_ids)
        .fetch_all(pool)
        .await?;

        let by_id: std::collections::HashMap<Uuid, UserSummary> =
            summaries.into_iter().map(|u| (u.id, u)).collect();

        Ok(subtasks
            .into_iter()
            .map(|subtask| {
                let creator = by_id.get(&subtask.created_by).cloned();
                SubtaskWithCreator { subtask, creator }
            })
            .collect())
    }

    /// Renames a subtask
    ///
    /// Title is the only editable field; completion goes through
    /// [`set_completed`](Subtask::set_completed) so the status recomputation
    /// cannot be skipped.
    ///
    /// # Returns
    ///
    /// The updated subtask if found, None otherwise
    pub async fn update_title(
        pool: &PgPool,
        task_id: Uuid,
        subtask_id: Uuid,
        title: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let subtask = sqlx::query_as::<_, Subtask>(
            r#"
            UPDATE subtasks
            SET title = $3, updated_at = NOW()
            WHERE id = $1 AND task_id = $2
            RETURNING id, task_id, title, is_completed, created_by, created_at, updated_at
            "#,
        )
        .bind(subtask_id)
        .bind(task_id)
        .bind(title.trim())
        .fetch_optional(pool)
        .await?;

        Ok(subtask)
    }

    /// Sets a subtask's completion flag
    ///
    /// # Returns
    ///
    /// The updated subtask if found, None otherwise
    pub async fn set_completed(
        pool: &PgPool,
        task_id: Uuid,
        subtask_id: Uuid,
        is_completed: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let subtask = sqlx::query_as::<_, Subtask>(
            r#"
            UPDATE subtasks
            SET is_completed = $3, updated_at = NOW()
            WHERE id = $1 AND task_id = $2
            RETURNING id, task_id, title, is_completed, created_by, created_at, updated_at
            "#,
        )
        .bind(subtask_id)
        .bind(task_id)
        .bind(is_completed)
        .fetch_optional(pool)
        .await?;

        Ok(subtask)
    }

    /// Deletes a subtask
    ///
    /// # Returns
    ///
    /// True if the subtask was deleted, false if it didn't exist
    pub async fn delete(
        pool: &PgPool,
        task_id: Uuid,
        subtask_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subtasks WHERE id = $1 AND task_id = $2")
            .bind(subtask_id)
            .bind(task_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtask_serializes_completion() {
        let subtask = Subtask {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            title: "Write docs".to_string(),
            is_completed: true,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&subtask).unwrap();
        assert_eq!(json["is_completed"], true);
        assert_eq!(json["title"], "Write docs");
    }

    // Integration tests for database operations are in taskcamp-api/tests/
}
