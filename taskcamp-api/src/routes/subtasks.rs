/// Subtask endpoints
///
/// # Endpoints
///
/// - `GET    /v1/projects/:id/tasks/:task_id/subtasks` - List with creators (any member)
/// - `POST   /v1/projects/:id/tasks/:task_id/subtasks` - Create (admin tier)
/// - `PUT    /v1/projects/:id/tasks/:task_id/subtasks/:subtask_id` - Rename (admin tier)
/// - `PATCH  /v1/projects/:id/tasks/:task_id/subtasks/:subtask_id/status` - Flip completion
/// - `DELETE /v1/projects/:id/tasks/:task_id/subtasks/:subtask_id` - Delete (admin tier)
///
/// Completion is the one operation plain members get, and only on tasks
/// assigned to them. Create, delete, and completion flips end with a
/// status recomputation on the owning task, so the derived state machine
/// can never go stale; a rename leaves the task status untouched.

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
    auth::authorization::{authorize, can_update_subtask_status},
    models::{
        membership::{ADMIN_TIER, ANY_ROLE},
        subtask::{Subtask, SubtaskWithCreator},
        task::{Task, TaskStatus},
    },
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Create subtask request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubtaskRequest {
    /// Subtask title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
}

/// Rename subtask request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSubtaskRequest {
    /// New title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
}

/// Completion flip request
#[derive(Debug, Deserialize)]
pub struct UpdateSubtaskStatusRequest {
    /// The new completion flag
    pub is_completed: bool,
}

/// A subtask mutation response carrying the recomputed task status
#[derive(Debug, Serialize)]
pub struct SubtaskResponse {
    /// The subtask after the mutation
    #[serde(flatten)]
    pub subtask: Subtask,

    /// The owning task's freshly derived status
    pub task_status: TaskStatus,
}

/// Deletion response carrying the recomputed task status
#[derive(Debug, Serialize)]
pub struct DeleteSubtaskResponse {
    /// Whether the subtask was removed
    pub deleted: bool,

    /// The owning task's freshly derived status
    pub task_status: TaskStatus,
}

/// Resolves the task or 404s, scoped to the project
async fn require_task(state: &AppState, project_id: Uuid, task_id: Uuid) -> ApiResult<Task> {
    Task::find_in_project(&state.db, project_id, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// Lists a task's subtasks with creator profiles
pub async fn list_subtasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Vec<SubtaskWithCreator>>> {
    authorize(&state.db, auth.user_id, project_id, ANY_ROLE).await?;
    require_task(&state, project_id, task_id).await?;

    let subtasks = Subtask::list_detailed(&state.db, task_id).await?;
    Ok(Json(subtasks))
}

/// Creates a subtask; admin tier only
///
/// Adding an (incomplete) subtask recomputes the owning task's status,
/// which can knock a Done task back to InProgress.
pub async fn create_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<CreateSubtaskRequest>,
) -> ApiResult<(StatusCode, Json<SubtaskResponse>)> {
    req.validate()?;
    authorize(&state.db, auth.user_id, project_id, ADMIN_TIER).await?;
    require_task(&state, project_id, task_id).await?;

    let subtask = Subtask::create(&state.db, task_id, &req.title, auth.user_id).await?;
    let task_status = Task::recompute_status(&state.db, task_id).await?;

    info!(task_id = %task_id, subtask_id = %subtask.id, "Subtask created");

    Ok((
        StatusCode::CREATED,
        Json(SubtaskResponse {
            subtask,
            task_status,
        }),
    ))
}

/// Renames a subtask; admin tier only
///
/// Title-only by design: completion goes through the status endpoint so
/// the recomputation can't be bypassed.
pub async fn update_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id, subtask_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(req): Json<UpdateSubtaskRequest>,
) -> ApiResult<Json<Subtask>> {
    req.validate()?;
    authorize(&state.db, auth.user_id, project_id, ADMIN_TIER).await?;
    require_task(&state, project_id, task_id).await?;

    let subtask = Subtask::update_title(&state.db, task_id, subtask_id, &req.title)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subtask not found".to_string()))?;

    Ok(Json(subtask))
}

/// Flips a subtask's completion flag
///
/// Admin tier may flip any subtask; a plain member only those on tasks
/// assigned to them. The owning task's status is recomputed afterwards.
pub async fn update_subtask_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id, subtask_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(req): Json<UpdateSubtaskStatusRequest>,
) -> ApiResult<Json<SubtaskResponse>> {
    let role = authorize(&state.db, auth.user_id, project_id, ANY_ROLE).await?;
    let task = require_task(&state, project_id, task_id).await?;

    if !can_update_subtask_status(role, auth.user_id, task.assigned_to) {
        return Err(ApiError::Forbidden(
            "Only the assignee or a project admin can update this subtask".to_string(),
        ));
    }

    let subtask = Subtask::set_completed(&state.db, task_id, subtask_id, req.is_completed)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subtask not found".to_string()))?;

    let task_status = Task::recompute_status(&state.db, task_id).await?;

    info!(
        task_id = %task_id,
        subtask_id = %subtask_id,
        is_completed = req.is_completed,
        task_status = task_status.as_str(),
        "Subtask status updated"
    );

    Ok(Json(SubtaskResponse {
        subtask,
        task_status,
    }))
}

/// Deletes a subtask; admin tier only
///
/// Removing a subtask recomputes the owning task's status; deleting the
/// last incomplete one can flip the task to Done.
pub async fn delete_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id, subtask_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<DeleteSubtaskResponse>> {
    authorize(&state.db, auth.user_id, project_id, ADMIN_TIER).await?;
    require_task(&state, project_id, task_id).await?;

    let deleted = Subtask::delete(&state.db, task_id, subtask_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Subtask not found".to_string()));
    }

    let task_status = Task::recompute_status(&state.db, task_id).await?;

    info!(task_id = %task_id, subtask_id = %subtask_id, "Subtask deleted");

    Ok(Json(DeleteSubtaskResponse {
        deleted,
        task_status,
    }))
}
