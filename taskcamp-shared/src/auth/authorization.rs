/// Authorization helpers and permission checks
///
/// This module provides utilities for role-based access control (RBAC) on
/// project-scoped resources.
///
/// # Permission Model
///
/// Every project route runs the same gate, in order:
///
/// 1. **Project existence**: the project must exist (404 otherwise)
/// 2. **Membership**: the caller must be a member of the project (403)
/// 3. **Role**: the caller's role must be in the route's allowed set (403)
///
/// Role sets come from `models::membership` (`ANY_ROLE`, `ADMIN_TIER`,
/// `ADMIN_ONLY`). Subtask completion has one extra wrinkle on top of the
/// gate: a plain member may only flip subtasks on tasks assigned to them,
/// expressed by [`can_update_subtask_status`].
///
/// # Example
///
/// ```no_run
/// use taskcamp_shared::auth::authorization::authorize;
/// use taskcamp_shared::models::membership::ADMIN_TIER;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid, project_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// // Only admins and project admins may pass
/// let role = authorize(&pool, user_id, project_id, ADMIN_TIER).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::membership::{ProjectMember, ProjectRole};
use crate::models::project::Project;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// The project doesn't exist
    #[error("Project {0} not found")]
    ProjectNotFound(Uuid),

    /// User is not a member of the project
    #[error("Not a member of project {0}")]
    NotMember(Uuid),

    /// User's role is not in the allowed set for this operation
    #[error("Role {role:?} is not allowed to perform this operation")]
    RoleNotAllowed {
        /// The role the caller actually holds
        role: ProjectRole,
    },

    /// Removing or demoting this member would leave the project adminless
    #[error("Cannot remove the last admin of a project")]
    LastAdmin,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Runs the standard project authorization gate
///
/// Checks existence, membership, and role, in that order, so a caller
/// probing a project they don't belong to learns only that it exists.
///
/// # Returns
///
/// The caller's role, for handlers that branch on it afterwards
pub async fn authorize(
    pool: &PgPool,
    user_id: Uuid,
    project_id: Uuid,
    allowed: &[ProjectRole],
) -> Result<ProjectRole, AuthzError> {
    if !Project::exists(pool, project_id).await? {
        return Err(AuthzError::ProjectNotFound(project_id));
    }

    let role = ProjectMember::get_role(pool, project_id, user_id)
        .await?
        .ok_or(AuthzError::NotMember(project_id))?;

    if !allowed.contains(&role) {
        return Err(AuthzError::RoleNotAllowed { role });
    }

    Ok(role)
}

/// Enforces the last-admin invariant before removing or demoting a member
///
/// A project must always keep at least one Admin. Only fires when the
/// targeted member is currently an Admin and no other Admin exists.
pub async fn ensure_not_last_admin(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<(), AuthzError> {
    let role = ProjectMember::get_role(pool, project_id, user_id).await?;

    if role == Some(ProjectRole::Admin) {
        let admins = ProjectMember::count_admins(pool, project_id).await?;
        if admins <= 1 {
            return Err(AuthzError::LastAdmin);
        }
    }

    Ok(())
}

/// Whether an actor may flip a subtask's completion flag
///
/// Admin-tier roles may touch any task's subtasks; plain members only the
/// tasks assigned to them.
pub fn can_update_subtask_status(role: ProjectRole, actor_id: Uuid, assigned_to: Uuid) -> bool {
    role.is_admin_tier() || actor_id == assigned_to
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_tier_can_update_any_subtask() {
        let actor = Uuid::new_v4();
        let someone_else = Uuid::new_v4();

        assert!(can_update_subtask_status(
            ProjectRole::Admin,
            actor,
            someone_else
        ));
        assert!(can_update_subtask_status(
            ProjectRole::ProjectAdmin,
            actor,
            someone_else
        ));
    }

    #[test]
    fn test_member_can_update_own_task_subtasks() {
        let actor = Uuid::new_v4();
        assert!(can_update_subtask_status(ProjectRole::Member, actor, actor));
    }

    #[test]
    fn test_member_cannot_update_others_subtasks() {
        let actor = Uuid::new_v4();
        let someone_else = Uuid::new_v4();
        assert!(!can_update_subtask_status(
            ProjectRole::Member,
            actor,
            someone_else
        ));
    }

    #[test]
    fn test_authz_error_display() {
        let project_id = Uuid::new_v4();

        let err = AuthzError::ProjectNotFound(project_id);
        assert!(err.to_string().contains("not found"));

        let err = AuthzError::NotMember(project_id);
        assert!(err.to_string().contains("Not a member"));

        let err = AuthzError::RoleNotAllowed {
            role: ProjectRole::Member,
        };
        assert!(err.to_string().contains("not allowed"));

        let err = AuthzError::LastAdmin;
        assert!(err.to_string().contains("last admin"));
    }
}
