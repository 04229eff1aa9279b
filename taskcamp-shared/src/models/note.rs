/// Project note model and database operations
///
/// Notes are free-form text pinned to a project. Any member can read them;
/// writing is restricted to project admins at the handler level. Each note
/// remembers who touched it last.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE project_notes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     content TEXT NOT NULL,
///     last_updated_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::UserSummary;

/// Project note model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectNote {
    /// Unique note ID (UUID v4)
    pub id: Uuid,

    /// Project the note belongs to
    pub project_id: Uuid,

    /// Note content
    pub content: String,

    /// Member who last created or edited the note
    pub last_updated_by: Uuid,

    /// When the note was created
    pub created_at: DateTime<Utc>,

    /// When the note was last updated
    pub updated_at: DateTime<Utc>,
}

/// A note joined with the profile of whoever last touched it
#[derive(Debug, Clone, Serialize)]
pub struct NoteDetail {
    /// The note itself
    #[serde(flatten)]
    pub note: ProjectNote,

    /// Public profile of the last editor
    pub last_editor: Option<UserSummary>,
}

impl ProjectNote {
    /// Creates a new note in a project
    pub async fn create(
        pool: &PgPool,
        project_id: Uuid,
        content: &str,
        author: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let note = sqlx::query_as::<_, ProjectNote>(
            r#"
            INSERT INTO project_notes (project_id, content, last_updated_by)
            VALUES ($1, $2, $3)
            RETURNING id, project_id, content, last_updated_by, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(content)
        .bind(author)
        .fetch_one(pool)
        .await?;

        Ok(note)
    }

    /// Finds a note by ID, scoped to a project
    pub async fn find_in_project(
        pool: &PgPool,
        project_id: Uuid,
        note_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let note = sqlx::query_as::<_, ProjectNote>(
            r#"
            SELECT id, project_id, content, last_updated_by, created_at, updated_at
            FROM project_notes
            WHERE id = $1 AND project_id = $2
            "#,
        )
        .bind(note_id)
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

        Ok(note)
    }

    /// Finds a note with its last-editor profile
    pub async fn find_detailed(
        pool: &PgPool,
        project_id: Uuid,
        note_id: Uuid,
    ) -> Result<Option<NoteDetail>, sqlx::Error> {
        let note = match Self::find_in_project(pool, project_id, note_id).await? {
            Some(note) => note,
            None => return Ok(None),
        };

        let last_editor = sqlx::query_as::<_, UserSummary>(
            "SELECT id, email, username, full_name, avatar_url FROM users WHERE id = $1",
        )
        .bind(note.last_updated_by)
        .fetch_optional(pool)
        .await?;

        Ok(Some(NoteDetail { note, last_editor }))
    }

    /// Lists a project's notes with last-editor profiles, newest first
    pub async fn list_detailed(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<NoteDetail>, sqlx::Error> {
        let notes = sqlx::query_as::<_, ProjectNote>(
            r#"
            SELECT id, project_id, content, last_updated_by, created_at, updated_at
            FROM project_notes
            WHERE project_id = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        let editor_ids: Vec<Uuid> = notes.iter().map(|n| n.last_updated_by).collect();

        let summaries = sqlx::query_as::<_, UserSummary>(
            "SELECT id, email, username, full_name, avatar_url FROM users WHERE id = ANY($1)",
        )
        .bind(&editor_ids)
        .fetch_all(pool)
        .await?;

        let by_id: std::collections::HashMap<Uuid, UserSummary> =
            summaries.into_iter().map(|u| (u.id, u)).collect();

        Ok(notes
            .into_iter()
            .map(|note| {
                let last_editor = by_id.get(&note.last_updated_by).cloned();
                NoteDetail { note, last_editor }
            })
            .collect())
    }

    /// Replaces a note's content and records the editor
    ///
    /// # Returns
    ///
    /// The updated note if found, None otherwise
    pub async fn update_content(
        pool: &PgPool,
        project_id: Uuid,
        note_id: Uuid,
        content: &str,
        editor: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let note = sqlx::query_as::<_, ProjectNote>(
            r#"
            UPDATE project_notes
            SET content = $3, last_updated_by = $4, updated_at = NOW()
            WHERE id = $1 AND project_id = $2
            RETURNING id, project_id, content, last_updated_by, created_at, updated_at
            "#,
        )
        .bind(note_id)
        .bind(project_id)
        .bind(content)
        .bind(editor)
        .fetch_optional(pool)
        .await?;

        Ok(note)
    }

    /// Deletes a note
    ///
    /// # Returns
    ///
    /// True if the note was deleted, false if it didn't exist
    pub async fn delete(
        pool: &PgPool,
        project_id: Uuid,
        note_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_notes WHERE id = $1 AND project_id = $2")
            .bind(note_id)
            .bind(project_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
