/// Project endpoints
///
/// # Endpoints
///
/// - `GET    /v1/projects` - List the caller's projects
/// - `POST   /v1/projects` - Create a project (caller becomes admin)
/// - `GET    /v1/projects/:id` - Project detail (any member)
/// - `PUT    /v1/projects/:id` - Update name/description (admin)
/// - `DELETE /v1/projects/:id` - Delete project and everything in it (admin)
/// - `POST   /v1/projects/:id/leave` - Leave, taking your assigned tasks with you

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
        membership::{ProjectMember, ProjectRole, ADMIN_ONLY, ANY_ROLE},
        project::{CreateProject, Project, ProjectOverview, UpdateProject},
        task::Task,
    },
};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    /// Project name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Optional description
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
}

/// Update project request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    /// New name (if provided)
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    /// New description (if provided)
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
}

/// Project detail response: the project plus the caller's role
#[derive(Debug, Serialize)]
pub struct ProjectDetailResponse {
    /// The project
    #[serde(flatten)]
    pub project: Project,

    /// The caller's role in it
    pub role: ProjectRole,
}

/// Deletion summary
#[derive(Debug, Serialize)]
pub struct DeleteProjectResponse {
    /// Whether the project row was removed
    pub deleted: bool,

    /// Attachment file IDs that could not be removed from remote storage
    pub orphaned_files: Vec<String>,
}

/// Leave summary
#[derive(Debug, Serialize)]
pub struct LeaveProjectResponse {
    /// Number of tasks (assigned to the leaver) that were deleted
    pub tasks_deleted: u64,

    /// Attachment file IDs that could not be removed from remote storage
    pub orphaned_files: Vec<String>,
}

/// Lists the caller's projects with role and member count
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ProjectOverview>>> {
    let projects = Project::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(projects))
}

/// Creates a project; the caller becomes its first admin
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    req.validate()?;

    let project = Project::create(
        &state.db,
        CreateProject {
            name: req.name,
            description: req.description,
        },
        auth.user_id,
    )
    .await?;

    info!(project_id = %project.id, user_id = %auth.user_id, "Project created");

    Ok((StatusCode::CREATED, Json(project)))
}

/// Returns a project; any member may look
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ProjectDetailResponse>> {
    let role = authorize(&state.db, auth.user_id, project_id, ANY_ROLE).await?;

    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Json(ProjectDetailResponse { project, role }))
}

/// Updates a project; admin only
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate()?;
    authorize(&state.db, auth.user_id, project_id, ADMIN_ONLY).await?;

    let project = Project::update(
        &state.db,
        project_id,
        UpdateProject {
            name: req.name,
            description: req.description,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

/// Deletes a project and everything in it; admin only
///
/// Remote attachments are swept first, best effort: files the gateway
/// refuses to delete are reported as `orphaned_files` rather than blocking
/// the deletion.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<DeleteProjectResponse>> {
    authorize(&state.db, auth.user_id, project_id, ADMIN_ONLY).await?;

    let file_ids = Task::attachment_file_ids(&state.db, project_id).await?;
    let orphaned_files = state.storage.bulk_delete(&file_ids).await;

    if !orphaned_files.is_empty() {
        warn!(
            project_id = %project_id,
            orphaned = orphaned_files.len(),
            "Some attachments could not be removed from storage"
        );
    }

    let deleted = Project::delete(&state.db, project_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    info!(project_id = %project_id, user_id = %auth.user_id, "Project deleted");

    Ok(Json(DeleteProjectResponse {
        deleted,
        orphaned_files,
    }))
}

/// Leaves a project
///
/// Tasks assigned to the leaver are deleted with them (their remote
/// attachments swept first, best effort). The last admin cannot leave.
pub async fn leave_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<LeaveProjectResponse>> {
    authorize(&state.db, auth.user_id, project_id, ANY_ROLE).await?;
    ensure_not_last_admin(&state.db, project_id, auth.user_id).await?;

    let file_ids =
        Task::attachment_file_ids_for_assignee(&state.db, project_id, auth.user_id).await?;
    let orphaned_files = state.storage.bulk_delete(&file_ids).await;

    let tasks_deleted = ProjectMember::leave(&state.db, project_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Membership not found".to_string()))?;

    info!(
        project_id = %project_id,
        user_id = %auth.user_id,
        tasks_deleted,
        "Member left project"
    );

    Ok(Json(LeaveProjectResponse {
        tasks_deleted,
        orphaned_files,
    }))
}
