/// Project model and database operations
///
/// Projects are the unit of collaboration: every task, note, and membership
/// hangs off one. Creating a project also enrolls the creator as its first
/// admin, in the same transaction, so a project can never exist without an
/// administrator.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Memberships, tasks, and notes reference `projects(id)` with
/// `ON DELETE CASCADE`, so deleting the row tears the whole tree down.
///
/// # Example
///
/// ```no_run
/// use taskcamp_shared::models::project::{CreateProject, Project};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let project = Project::create(&pool, CreateProject {
///     name: "Website Redesign".to_string(),
///     description: Some("Q3 marketing site refresh".to_string()),
/// }, user_id).await?;
///
/// let mine = Project::list_for_user(&pool, user_id).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::membership::ProjectRole;

/// Project model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID (UUID v4)
    pub id: Uuid,

    /// Project name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// User who created the project
    pub created_by: Uuid,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new project
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    /// Project name
    pub name: String,

    /// Optional description
    pub description: Option<String>,
}

/// Input for updating a project (partial update)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    /// New name (if provided)
    pub name: Option<String>,

    /// New description (if provided)
    pub description: Option<String>,
}

/// A project as seen in the caller's project listing
///
/// Joins in the caller's own role and the current member count.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectOverview {
    /// Project ID
    pub id: Uuid,

    /// Project name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// User who created the project
    pub created_by: Uuid,

    /// The caller's role in this project
    pub role: ProjectRole,

    /// Number of members in the project
    pub member_count: i64,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last updated
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Creates a new project with the creator enrolled as admin
    ///
    /// The project row and the admin membership are inserted in one
    /// transaction.
    pub async fn create(
        pool: &PgPool,
        data: CreateProject,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(data.name.trim())
        .bind(data.description)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO project_members (project_id, user_id, role) VALUES ($1, $2, 'admin')",
        )
        .bind(project.id)
        .bind(created_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(project)
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, created_by, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Checks whether a project exists
    pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let (found,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await?;

        Ok(found)
    }

    /// Updates a project (partial update)
    ///
    /// Only provided fields are changed.
    ///
    /// # Returns
    ///
    /// The updated project if found, None if the project doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name.map(|n| n.trim().to_string()))
        .bind(data.description)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Deletes a project
    ///
    /// Memberships, tasks, subtasks, and notes cascade at the database
    /// level. Remote attachment cleanup is the caller's concern and must
    /// happen before this call.
    ///
    /// # Returns
    ///
    /// True if the project was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the projects a user belongs to, with role and member count
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ProjectOverview>, sqlx::Error> {
        let projects = sqlx::query_as::<_, ProjectOverview>(
            r#"
            SELECT p.id, p.name, p.description, p.created_by,
                   pm.role,
                   (SELECT COUNT(*) FROM project_members c WHERE c.project_id = p.id) AS member_count,
                   p.created_at, p.updated_at
            FROM projects p
            JOIN project_members pm ON pm.project_id = p.id
            WHERE pm.user_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }
}
