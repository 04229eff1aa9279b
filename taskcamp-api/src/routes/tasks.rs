/// Task endpoints
///
/// # Endpoints
///
/// - `GET    /v1/projects/:id/tasks` - List tasks with assignees (any member)
/// - `POST   /v1/projects/:id/tasks` - Create a task, multipart (admin tier)
/// - `GET    /v1/projects/:id/tasks/:task_id` - Task detail with subtasks (any member)
/// - `PUT    /v1/projects/:id/tasks/:task_id` - Update a task (admin tier)
/// - `DELETE /v1/projects/:id/tasks/:task_id` - Delete a task (admin tier)
/// - `POST   /v1/projects/:id/tasks/:task_id/attachments` - Upload attachments (admin tier)
/// - `DELETE /v1/projects/:id/tasks/:task_id/attachments/:file_id` - Remove one (admin tier)
///
/// Task creation is `multipart/form-data`: a `payload` part carrying the
/// JSON body plus any number of `attachments` file parts. Attachment
/// removal deletes from remote storage FIRST and keeps the bookkeeping
/// entry if the gateway refuses, so a file is never forgotten while it
/// still exists remotely.

use crate::{
    app::{AppState, AuthContext},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use taskcamp_shared::{
    auth::authorization::authorize,
    gateway::{
        storage::{StoredFile, UploadMetadata},
        GatewayError,
    },
    models::{
        membership::{ProjectMember, ADMIN_TIER, ANY_ROLE},
        subtask::{Subtask, SubtaskWithCreator},
        task::{Attachment, CreateTask, Task, TaskWithAssignee, UpdateTask},
        user::User,
    },
};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// JSON payload of the multipart task-create request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Task title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    /// Optional description
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    /// Member to assign the task to
    pub assigned_to: Uuid,

    /// Initial subtask titles
    #[serde(default)]
    pub subtasks: Vec<String>,
}

/// Update task request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    /// New title (if provided)
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    /// New description (if provided)
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    /// New assignee (if provided; must be a project member)
    pub assigned_to: Option<Uuid>,

    /// Direct status write; overwritten by the next subtask mutation
    pub status: Option<taskcamp_shared::models::task::TaskStatus>,
}

/// Task detail: the task, its assignee, and its subtasks with creators
#[derive(Debug, Serialize)]
pub struct TaskDetailResponse {
    /// The task with assignee profile
    #[serde(flatten)]
    pub task: TaskWithAssignee,

    /// Subtasks, oldest first
    pub subtasks: Vec<SubtaskWithCreator>,
}

/// Deletion summary
#[derive(Debug, Serialize)]
pub struct DeleteTaskResponse {
    /// Whether the task row was removed
    pub deleted: bool,

    /// Attachment file IDs that could not be removed from remote storage
    pub orphaned_files: Vec<String>,
}

/// A file part pulled out of a multipart body
struct FilePart {
    file_name: String,
    content_type: String,
    data: Bytes,
}

/// Splits a task multipart body into its JSON payload and file parts
///
/// Parts may arrive in any order, so everything is buffered before the
/// payload is interpreted.
async fn read_task_multipart(
    mut multipart: Multipart,
) -> ApiResult<(Option<String>, Vec<FilePart>)> {
    let mut payload = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("payload") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable payload: {}", e)))?;
                payload = Some(text);
            }
            Some("attachments") => {
                let file_name = field
                    .file_name()
                    .unwrap_or("attachment")
                    .to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable file part: {}", e)))?;

                files.push(FilePart {
                    file_name,
                    content_type,
                    data,
                });
            }
            other => {
                return Err(ApiError::BadRequest(format!(
                    "Unexpected multipart field: {}",
                    other.unwrap_or("<unnamed>")
                )));
            }
        }
    }

    Ok((payload, files))
}

fn attachment_from_stored(stored: StoredFile) -> Attachment {
    Attachment {
        file_id: stored.file_id,
        url: stored.url,
        path: stored.path,
        thumbnail: stored.thumbnail,
    }
}

/// Uploads file parts to the storage gateway
async fn upload_files(state: &AppState, files: Vec<FilePart>) -> ApiResult<Vec<Attachment>> {
    let mut attachments = Vec::with_capacity(files.len());

    for file in files {
        let stored = state
            .storage
            .upload(
                file.data,
                UploadMetadata {
                    file_name: file.file_name,
                    folder: "taskcamp/tasks".to_string(),
                    content_type: file.content_type,
                },
            )
            .await?;

        attachments.push(attachment_from_stored(stored));
    }

    Ok(attachments)
}

/// Verifies that a prospective assignee belongs to the project
async fn require_assignee_membership(
    state: &AppState,
    project_id: Uuid,
    assignee: Uuid,
) -> ApiResult<()> {
    let member = ProjectMember::find(&state.db, project_id, assignee).await?;
    if member.is_none() {
        return Err(ApiError::BadRequest(
            "Assignee is not a member of this project".to_string(),
        ));
    }
    Ok(())
}

/// Lists a project's tasks with assignee profiles
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TaskWithAssignee>>> {
    authorize(&state.db, auth.user_id, project_id, ANY_ROLE).await?;

    let tasks = Task::list_detailed(&state.db, project_id).await?;
    Ok(Json(tasks))
}

/// Creates a task with optional initial subtasks and attachments
///
/// Multipart: `payload` (JSON) + any number of `attachments` file parts.
/// Files are uploaded before the task is written, so a storage outage
/// fails the request without leaving a half-recorded task.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Task>)> {
    authorize(&state.db, auth.user_id, project_id, ADMIN_TIER).await?;

    let (payload, files) = read_task_multipart(multipart).await?;
    let payload =
        payload.ok_or_else(|| ApiError::BadRequest("Missing payload part".to_string()))?;

    let req: CreateTaskRequest = serde_json::from_str(&payload)
        .map_err(|e| ApiError::BadRequest(format!("Invalid payload JSON: {}", e)))?;
    req.validate()?;

    require_assignee_membership(&state, project_id, req.assigned_to).await?;

    let attachments = upload_files(&state, files).await?;

    let task = Task::create_with_subtasks(
        &state.db,
        project_id,
        CreateTask {
            title: req.title,
            description: req.description,
            assigned_to: req.assigned_to,
            subtasks: req.subtasks,
        },
        attachments,
        auth.user_id,
    )
    .await?;

    info!(
        project_id = %project_id,
        task_id = %task.id,
        assigned_to = %task.assigned_to,
        "Task created"
    );

    Ok((StatusCode::CREATED, Json(task)))
}

/// Returns a task with its assignee and subtasks
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<TaskDetailResponse>> {
    authorize(&state.db, auth.user_id, project_id, ANY_ROLE).await?;

    let task = Task::find_in_project(&state.db, project_id, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let subtasks = Subtask::list_detailed(&state.db, task_id).await?;
    let assignee = User::find_by_id(&state.db, task.assigned_to)
        .await?
        .map(|u| u.summary());

    Ok(Json(TaskDetailResponse {
        task: TaskWithAssignee { task, assignee },
        subtasks,
    }))
}

/// Updates a task; admin tier only
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;
    authorize(&state.db, auth.user_id, project_id, ADMIN_TIER).await?;

    if let Some(assignee) = req.assigned_to {
        require_assignee_membership(&state, project_id, assignee).await?;
    }

    let task = Task::update(
        &state.db,
        project_id,
        task_id,
        UpdateTask {
            title: req.title,
            description: req.description,
            assigned_to: req.assigned_to,
            status: req.status,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}

/// Deletes a task; admin tier only
///
/// Its attachments are swept from remote storage first, best effort.
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<DeleteTaskResponse>> {
    authorize(&state.db, auth.user_id, project_id, ADMIN_TIER).await?;

    let task = Task::find_in_project(&state.db, project_id, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let file_ids: Vec<String> = task
        .attachments
        .0
        .iter()
        .map(|a| a.file_id.clone())
        .collect();
    let orphaned_files = state.storage.bulk_delete(&file_ids).await;

    if !orphaned_files.is_empty() {
        warn!(
            task_id = %task_id,
            orphaned = orphaned_files.len(),
            "Some attachments could not be removed from storage"
        );
    }

    let deleted = Task::delete(&state.db, project_id, task_id).await?;

    info!(project_id = %project_id, task_id = %task_id, "Task deleted");

    Ok(Json(DeleteTaskResponse {
        deleted,
        orphaned_files,
    }))
}

/// Uploads additional attachments to a task; admin tier only
///
/// Multipart with any number of `attachments` file parts.
pub async fn add_attachments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    multipart: Multipart,
) -> ApiResult<Json<Task>> {
    authorize(&state.db, auth.user_id, project_id, ADMIN_TIER).await?;

    // Task must exist before anything is uploaded
    Task::find_in_project(&state.db, project_id, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let (_, files) = read_task_multipart(multipart).await?;
    if files.is_empty() {
        return Err(ApiError::BadRequest("No attachments provided".to_string()));
    }

    let attachments = upload_files(&state, files).await?;

    let mut updated = None;
    for attachment in &attachments {
        updated = Task::add_attachment(&state.db, project_id, task_id, attachment).await?;
    }

    let task =
        updated.ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    info!(
        task_id = %task_id,
        count = attachments.len(),
        "Attachments added"
    );

    Ok(Json(task))
}

/// Removes one attachment from a task; admin tier only
///
/// The remote delete happens first. If the gateway refuses, the entry
/// stays on the task so the file is never orphaned-but-forgotten. A
/// gateway "not found" is treated as already-deleted and the entry is
/// dropped.
pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id, file_id)): Path<(Uuid, Uuid, String)>,
) -> ApiResult<Json<Task>> {
    authorize(&state.db, auth.user_id, project_id, ADMIN_TIER).await?;

    let task = Task::find_in_project(&state.db, project_id, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let known = task.attachments.0.iter().any(|a| a.file_id == file_id);
    if !known {
        return Err(ApiError::NotFound("Attachment not found".to_string()));
    }

    match state.storage.delete(&file_id).await {
        Ok(()) => {}
        Err(GatewayError::NotFound(_)) => {
            warn!(file_id = %file_id, "Attachment already absent from storage");
        }
        Err(e) => return Err(e.into()),
    }

    let task = Task::remove_attachment(&state.db, project_id, task_id, &file_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    info!(task_id = %task_id, file_id = %file_id, "Attachment removed");

    Ok(Json(task))
}
