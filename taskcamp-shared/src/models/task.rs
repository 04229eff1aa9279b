/// Task model, attachments, and the derived-status state machine
///
/// Tasks belong to a project and are always assigned to exactly one member.
/// Each task carries an ordered list of attachments (JSONB) and a status
/// that is recomputed from its subtasks' completion counts after every
/// subtask mutation.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'done');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     assigned_to UUID NOT NULL REFERENCES users(id),
///     assigned_by UUID NOT NULL REFERENCES users(id),
///     status task_status NOT NULL DEFAULT 'todo',
///     attachments JSONB NOT NULL DEFAULT '[]'::jsonb,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Status
///
/// `status` can be written directly through [`Task::update`], but once a
/// task has subtasks the subtask system owns it: any completion change (or
/// subtask create/delete) triggers [`Task::recompute_status`], which
/// overwrites whatever was set manually.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::UserSummary;

/// Task status, derived from subtask completion once subtasks exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// No subtask completed yet (or no subtasks at all)
    Todo,

    /// Some, but not all, subtasks completed
    InProgress,

    /// Every subtask completed
    Done,
}

impl TaskStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    /// Derives the status from subtask completion counts
    ///
    /// A task with no subtasks stays Todo until someone sets its status
    /// directly.
    pub fn derive(completed: i64, total: i64) -> Self {
        if total == 0 || completed == 0 {
            TaskStatus::Todo
        } else if completed == total {
            TaskStatus::Done
        } else {
            TaskStatus::InProgress
        }
    }
}

/// A file attached to a task
///
/// Attachments live in remote storage; the task row only keeps the
/// bookkeeping needed to serve and later delete them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Storage gateway file ID (used for deletion)
    pub file_id: String,

    /// Public URL to the file
    pub url: String,

    /// Storage path within the gateway
    pub path: String,

    /// Optional thumbnail URL (images only)
    pub thumbnail: Option<String>,
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID (UUID v4)
    pub id: Uuid,

    /// Project the task belongs to
    pub project_id: Uuid,

    /// Task title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Member the task is assigned to
    pub assigned_to: Uuid,

    /// Member who assigned the task
    pub assigned_by: Uuid,

    /// Current status
    pub status: TaskStatus,

    /// Ordered list of attachments
    pub attachments: Json<Vec<Attachment>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    /// Task title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Member to assign the task to (must be a project member)
    pub assigned_to: Uuid,

    /// Initial subtask titles, created alongside the task
    #[serde(default)]
    pub subtasks: Vec<String>,
}

/// Input for updating a task (partial update)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    /// New title (if provided)
    pub title: Option<String>,

    /// New description (if provided)
    pub description: Option<String>,

    /// New assignee (if provided; must be a project member)
    pub assigned_to: Option<Uuid>,

    /// Direct status write; overwritten by the next subtask mutation
    pub status: Option<TaskStatus>,
}

/// A task together with its assignee's public profile
#[derive(Debug, Clone, Serialize)]
pub struct TaskWithAssignee {
    /// The task itself
    #[serde(flatten)]
    pub task: Task,

    /// Public profile of the assigned member
    pub assignee: Option<UserSummary>,
}

const TASK_COLUMNS: &str = "id, project_id, title, description, assigned_to, assigned_by, \
     status, attachments, created_at, updated_at";

impl Task {
    /// Creates a task, its initial subtasks, and attachments in one transaction
    ///
    /// `assigned_by` is the acting member; initial subtasks are credited to
    /// them as well. A freshly created task always starts as Todo because
    /// new subtasks are incomplete. Attachments are expected to already be
    /// uploaded; this only records their bookkeeping.
    pub async fn create_with_subtasks(
        pool: &PgPool,
        project_id: Uuid,
        data: CreateTask,
        attachments: Vec<Attachment>,
        assigned_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO tasks (project_id, title, description, assigned_to, assigned_by, attachments)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {TASK_COLUMNS}"
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .bind(data.title.trim())
            .bind(data.description)
            .bind(data.assigned_to)
            .bind(assigned_by)
            .bind(Json(attachments))
            .fetch_one(&mut *tx)
            .await?;

        for title in &data.subtasks {
            sqlx::query("INSERT INTO subtasks (task_id, title, created_by) VALUES ($1, $2, $3)")
                .bind(task.id)
                .bind(title.trim())
                .bind(assigned_by)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(task)
    }

    /// Finds a task by ID, scoped to a project
    ///
    /// Scoping by project keeps cross-project IDs from resolving, so a
    /// member of one project cannot probe another project's tasks.
    pub async fn find_in_project(
        pool: &PgPool,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND project_id = $2");

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(task_id)
            .bind(project_id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Lists a project's tasks with assignee profiles, newest first
    pub async fn list_detailed(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<TaskWithAssignee>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 ORDER BY created_at DESC"
        );

        let tasks = sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await?;

        let assignee_ids: Vec<Uuid> = tasks.iter().map(|t| t.assigned_to).collect();

        let summaries = sqlx::query_as::<_, UserSummary>(
            "SELECT id, email, username, full_name, avatar_url FROM users WHERE id = ANY($1)",
        )
        .bind(&assignee_ids)
        .fetch_all(pool)
        .await?;

        let by_id: std::collections::HashMap<Uuid, UserSummary> =
            summaries.into_iter().map(|u| (u.id, u)).collect();

        Ok(tasks
            .into_iter()
            .map(|task| {
                let assignee = by_id.get(&task.assigned_to).cloned();
                TaskWithAssignee { task, assignee }
            })
            .collect())
    }

    /// Updates a task (partial update)
    ///
    /// A direct status write here sticks only until the next subtask
    /// mutation recomputes it.
    ///
    /// # Returns
    ///
    /// The updated task if found, None if the task doesn't exist in the
    /// project
    pub async fn update(
        pool: &PgPool,
        project_id: Uuid,
        task_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks
             SET title = COALESCE($3, title),
                 description = COALESCE($4, description),
                 assigned_to = COALESCE($5, assigned_to),
                 status = COALESCE($6, status),
                 updated_at = NOW()
             WHERE id = $1 AND project_id = $2
             RETURNING {TASK_COLUMNS}"
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(task_id)
            .bind(project_id)
            .bind(data.title.map(|t| t.trim().to_string()))
            .bind(data.description)
            .bind(data.assigned_to)
            .bind(data.status)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Deletes a task (subtasks cascade)
    ///
    /// Remote attachment cleanup is the caller's concern and must happen
    /// before this call.
    pub async fn delete(
        pool: &PgPool,
        project_id: Uuid,
        task_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND project_id = $2")
            .bind(task_id)
            .bind(project_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Recomputes a task's status from its subtasks' completion counts
    ///
    /// Called after every subtask mutation (create, delete, completion
    /// change). Overwrites any manually set status.
    ///
    /// # Returns
    ///
    /// The freshly derived status
    pub async fn recompute_status(pool: &PgPool, task_id: Uuid) -> Result<TaskStatus, sqlx::Error> {
        let (total, completed): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE is_completed)
            FROM subtasks
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .fetch_one(pool)
        .await?;

        let status = TaskStatus::derive(completed, total);

        sqlx::query("UPDATE tasks SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(task_id)
            .bind(status)
            .execute(pool)
            .await?;

        Ok(status)
    }

    /// Appends an attachment to a task's attachment list
    ///
    /// # Returns
    ///
    /// The updated task if found, None if the task doesn't exist in the
    /// project
    pub async fn add_attachment(
        pool: &PgPool,
        project_id: Uuid,
        task_id: Uuid,
        attachment: &Attachment,
    ) -> Result<Option<Self>, sqlx::Error> {
        let value = serde_json::to_value(attachment).map_err(|e| sqlx::Error::Encode(e.into()))?;

        let query = format!(
            "UPDATE tasks
             SET attachments = attachments || $3::jsonb,
                 updated_at = NOW()
             WHERE id = $1 AND project_id = $2
             RETURNING {TASK_COLUMNS}"
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(task_id)
            .bind(project_id)
            .bind(value)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Removes an attachment from a task's attachment list by file ID
    ///
    /// # Returns
    ///
    /// The updated task if found, None if the task doesn't exist in the
    /// project
    pub async fn remove_attachment(
        pool: &PgPool,
        project_id: Uuid,
        task_id: Uuid,
        file_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks
             SET attachments = COALESCE(
                     (SELECT jsonb_agg(a)
                      FROM jsonb_array_elements(attachments) a
                      WHERE a->>'file_id' <> $3),
                     '[]'::jsonb),
                 updated_at = NOW()
             WHERE id = $1 AND project_id = $2
             RETURNING {TASK_COLUMNS}"
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(task_id)
            .bind(project_id)
            .bind(file_id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Collects every attachment file ID in a project
    ///
    /// Used before project deletion to sweep remote storage.
    pub async fn attachment_file_ids(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT a->>'file_id'
            FROM tasks, jsonb_array_elements(attachments) a
            WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    /// Collects attachment file IDs on tasks assigned to one member
    ///
    /// Used before a member leaves, since their assigned tasks (and the
    /// files hanging off them) are deleted with them.
    pub async fn attachment_file_ids_for_assignee(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT a->>'file_id'
            FROM tasks, jsonb_array_elements(attachments) a
            WHERE project_id = $1 AND assigned_to = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }
}
