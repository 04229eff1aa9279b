/// Project membership endpoints
///
/// # Endpoints
///
/// - `GET    /v1/projects/:id/members` - List members (any member)
/// - `POST   /v1/projects/:id/members` - Add a member by email (admin)
/// - `PUT    /v1/projects/:id/members/:user_id` - Change a member's role (admin)
/// - `DELETE /v1/projects/:id/members/:user_id` - Remove a member (admin)
///
/// Role changes and removals both honor the last-admin invariant: a
/// project can never end up without an Admin.

use crate::{
    app::{AppState, AuthContext},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskcamp_shared::{
    auth::authorization::{authorize, ensure_not_last_admin},
    models::{
        membership::{
            CreateMembership, MemberDetail, ProjectMember, ProjectRole, ADMIN_ONLY, ANY_ROLE,
        },
        task::Task,
        user::User,
    },
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Add member request
#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    /// Email of the user to add (must already have an account)
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Role to assign (defaults to member)
    #[serde(default = "default_member_role")]
    pub role: ProjectRole,
}

fn default_member_role() -> ProjectRole {
    ProjectRole::Member
}

/// Update member role request
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    /// The new role
    pub role: ProjectRole,
}

/// Removal summary
#[derive(Debug, Serialize)]
pub struct RemoveMemberResponse {
    /// Number of tasks (assigned to the removed member) that were deleted
    pub tasks_deleted: u64,

    /// Attachment file IDs that could not be removed from remote storage
    pub orphaned_files: Vec<String>,
}

/// Lists a project's members with their public profiles
pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberDetail>>> {
    authorize(&state.db, auth.user_id, project_id, ANY_ROLE).await?;

    let members = ProjectMember::list_details(&state.db, project_id).await?;
    Ok(Json(members))
}

/// Adds a member to a project by email; admin only
///
/// # Errors
///
/// - `404 Not Found`: No account with that email
/// - `409 Conflict`: Already a member
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<ProjectMember>)> {
    req.validate()?;
    authorize(&state.db, auth.user_id, project_id, ADMIN_ONLY).await?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No user with that email".to_string()))?;

    let membership = ProjectMember::create(
        &state.db,
        CreateMembership {
            project_id,
            user_id: user.id,
            role: req.role,
        },
    )
    .await?;

    info!(
        project_id = %project_id,
        user_id = %user.id,
        role = membership.role.as_str(),
        "Member added"
    );

    Ok((StatusCode::CREATED, Json(membership)))
}

/// Changes a member's role; admin only
///
/// Demoting the last Admin is rejected with 409.
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Json<ProjectMember>> {
    authorize(&state.db, auth.user_id, project_id, ADMIN_ONLY).await?;

    if req.role != ProjectRole::Admin {
        ensure_not_last_admin(&state.db, project_id, user_id).await?;
    }

    let membership = ProjectMember::update_role(&state.db, project_id, user_id, req.role)
        .await?
        .ok_or_else(|| ApiError::NotFound("Membership not found".to_string()))?;

    info!(
        project_id = %project_id,
        user_id = %user_id,
        role = membership.role.as_str(),
        "Member role updated"
    );

    Ok(Json(membership))
}

/// Removes a member from a project; admin only
///
/// Works like a forced leave: the member's assigned tasks go with them
/// (remote attachments swept first, best effort), and the last Admin
/// cannot be removed.
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<RemoveMemberResponse>> {
    authorize(&state.db, auth.user_id, project_id, ADMIN_ONLY).await?;
    ensure_not_last_admin(&state.db, project_id, user_id).await?;

    let file_ids = Task::attachment_file_ids_for_assignee(&state.db, project_id, user_id).await?;
    let orphaned_files = state.storage.bulk_delete(&file_ids).await;

    let tasks_deleted = ProjectMember::leave(&state.db, project_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Membership not found".to_string()))?;

    info!(
        project_id = %project_id,
        user_id = %user_id,
        removed_by = %auth.user_id,
        tasks_deleted,
        "Member removed"
    );

    Ok(Json(RemoveMemberResponse {
        tasks_deleted,
        orphaned_files,
    }))
}
