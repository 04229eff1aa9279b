/// Project membership model and database operations
///
/// Membership is the many-to-many relationship between users and projects,
/// and carries the role that drives every project-scoped permission check.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('admin', 'project_admin', 'member');
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role project_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **admin**: Full control over the project, its members, and notes
/// - **project_admin**: Can manage tasks and attachments
/// - **member**: Can read everything and work with subtasks
///
/// Roles are a closed enum; a membership row can never hold a value outside
/// these three.
///
/// # Example
///
/// ```no_run
/// use taskcamp_shared::models::membership::{CreateMembership, ProjectMember, ProjectRole};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let member = ProjectMember::create(&pool, CreateMembership {
///     project_id,
///     user_id,
///     role: ProjectRole::Member,
/// }).await?;
///
/// let role = ProjectMember::get_role(&pool, project_id, user_id).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::UserSummary;

/// Roles a user can hold within a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    /// Full control: project settings, members, notes, tasks
    Admin,

    /// Can manage tasks and attachments, but not the project itself
    ProjectAdmin,

    /// Can read everything and create/update subtasks
    Member,
}

impl ProjectRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Admin => "admin",
            ProjectRole::ProjectAdmin => "project_admin",
            ProjectRole::Member => "member",
        }
    }

    /// Whether this role is in the admin tier (Admin or ProjectAdmin)
    ///
    /// Admin-tier roles can create, update, and delete tasks, and can flip
    /// subtask completion on tasks they are not assigned to.
    pub fn is_admin_tier(&self) -> bool {
        matches!(self, ProjectRole::Admin | ProjectRole::ProjectAdmin)
    }
}

/// Role sets used by handlers when calling `auth::authorization::authorize`
pub const ANY_ROLE: &[ProjectRole] = &[
    ProjectRole::Admin,
    ProjectRole::ProjectAdmin,
    ProjectRole::Member,
];

/// Admin only
pub const ADMIN_ONLY: &[ProjectRole] = &[ProjectRole::Admin];

/// Admin or ProjectAdmin
pub const ADMIN_TIER: &[ProjectRole] = &[ProjectRole::Admin, ProjectRole::ProjectAdmin];

/// Membership row linking a user to a project with a role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the project
    pub role: ProjectRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role to assign (defaults to Member)
    #[serde(default = "default_role")]
    pub role: ProjectRole,
}

fn default_role() -> ProjectRole {
    ProjectRole::Member
}

/// A project member joined with the user's public profile
///
/// This is the shape returned by the member listing endpoint.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MemberDetail {
    /// Project ID
    pub project_id: Uuid,

    /// Role within the project
    pub role: ProjectRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,

    /// Public user profile
    #[sqlx(flatten)]
    pub user: UserSummary,
}

impl ProjectMember {
    /// Creates a new membership (adds user to project)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Membership already exists (primary key violation)
    /// - Project or user doesn't exist (foreign key violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateMembership) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, ProjectMember>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING project_id, user_id, role, created_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(pool)
        .await?;

        Ok(membership)
    }

    /// Finds a specific membership by project and user
    pub async fn find(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT project_id, user_id, role, created_at
            FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Gets a user's role in a project
    ///
    /// # Returns
    ///
    /// The user's role if they are a member, None otherwise
    pub async fn get_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectRole>, sqlx::Error> {
        let role: Option<ProjectRole> = sqlx::query_scalar(
            r#"
            SELECT role FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Updates a user's role in a project
    ///
    /// # Returns
    ///
    /// The updated membership if found, None if the membership doesn't exist
    pub async fn update_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, ProjectMember>(
            r#"
            UPDATE project_members
            SET role = $3
            WHERE project_id = $1 AND user_id = $2
            RETURNING project_id, user_id, role, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Deletes a membership (removes user from project)
    ///
    /// # Returns
    ///
    /// True if membership was deleted, false if membership didn't exist
    pub async fn delete(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
                .bind(project_id)
                .bind(user_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists all members of a project with their public user profiles
    pub async fn list_details(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<MemberDetail>, sqlx::Error> {
        let members = sqlx::query_as::<_, MemberDetail>(
            r#"
            SELECT pm.project_id, pm.role, pm.created_at,
                   u.id, u.email, u.username, u.full_name, u.avatar_url
            FROM project_members pm
            JOIN users u ON u.id = pm.user_id
            WHERE pm.project_id = $1
            ORDER BY pm.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Counts members holding the Admin role in a project
    ///
    /// Used by the last-admin invariant: a project must always keep at least
    /// one Admin.
    pub async fn count_admins(pool: &PgPool, project_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM project_members WHERE project_id = $1 AND role = 'admin'",
        )
        .bind(project_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Removes a member from a project together with the tasks assigned to them
    ///
    /// Deletes the actor's assigned tasks (subtasks cascade) and the
    /// membership row in a single transaction, so a failure leaves both in
    /// place. Attachment cleanup in remote storage is the caller's concern
    /// and must happen before this call.
    ///
    /// # Returns
    ///
    /// The number of tasks that were deleted, or None if the membership
    /// didn't exist.
    pub async fn leave(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<u64>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let tasks_deleted =
            sqlx::query("DELETE FROM tasks WHERE project_id = $1 AND assigned_to = $2")
                .bind(project_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        let removed =
            sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
                .bind(project_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        if removed == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(tasks_deleted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_role_as_str() {
        assert_eq!(ProjectRole::Admin.as_str(), "admin");
        assert_eq!(ProjectRole::ProjectAdmin.as_str(), "project_admin");
        assert_eq!(ProjectRole::Member.as_str(), "member");
    }

    #[test]
    fn test_admin_tier() {
        assert!(ProjectRole::Admin.is_admin_tier());
        assert!(ProjectRole::ProjectAdmin.is_admin_tier());
        assert!(!ProjectRole::Member.is_admin_tier());
    }

    #[test]
    fn test_role_serde_names() {
        assert_eq!(
            serde_json::to_string(&ProjectRole::ProjectAdmin).unwrap(),
            "\"project_admin\""
        );
        let role: ProjectRole = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, ProjectRole::Admin);
    }

    #[test]
    fn test_role_set_contents() {
        assert_eq!(ANY_ROLE.len(), 3);
        assert_eq!(ADMIN_ONLY, &[ProjectRole::Admin]);
        assert!(ADMIN_TIER.contains(&ProjectRole::ProjectAdmin));
        assert!(!ADMIN_TIER.contains(&ProjectRole::Member));
    }

    #[test]
    fn test_create_membership_default_role() {
        assert_eq!(default_role(), ProjectRole::Member);
    }

    // Integration tests for database operations are in taskcamp-api/tests/
}
