/// Project note endpoints
///
/// # Endpoints
///
/// - `GET    /v1/projects/:id/notes` - List notes (any member)
/// - `GET    /v1/projects/:id/notes/:note_id` - Fetch one note (any member)
/// - `POST   /v1/projects/:id/notes` - Create a note (admin)
/// - `PUT    /v1/projects/:id/notes/:note_id` - Update a note (admin)
/// - `DELETE /v1/projects/:id/notes/:note_id` - Delete a note (admin)

use crate::{
    app::{AppState, AuthContext},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskcamp_shared::{
    auth::authorization::authorize,
    models::{
        membership::{ADMIN_ONLY, ANY_ROLE},
        note::{NoteDetail, ProjectNote},
    },
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Create or update note request
#[derive(Debug, Deserialize, Validate)]
pub struct NoteRequest {
    /// Note content
    #[validate(length(min = 1, max = 10000, message = "Content must be 1-10000 characters"))]
    pub content: String,
}

/// Lists a project's notes with last-editor profiles
pub async fn list_notes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<NoteDetail>>> {
    authorize(&state.db, auth.user_id, project_id, ANY_ROLE).await?;

    let notes = ProjectNote::list_detailed(&state.db, project_id).await?;
    Ok(Json(notes))
}

/// Fetches a single note with its last-editor profile
pub async fn get_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, note_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<NoteDetail>> {
    authorize(&state.db, auth.user_id, project_id, ANY_ROLE).await?;

    let note = ProjectNote::find_detailed(&state.db, project_id, note_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;

    Ok(Json(note))
}

/// Creates a note; admin only
pub async fn create_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<NoteRequest>,
) -> ApiResult<(StatusCode, Json<ProjectNote>)> {
    req.validate()?;
    authorize(&state.db, auth.user_id, project_id, ADMIN_ONLY).await?;

    let note = ProjectNote::create(&state.db, project_id, &req.content, auth.user_id).await?;

    info!(project_id = %project_id, note_id = %note.id, "Note created");

    Ok((StatusCode::CREATED, Json(note)))
}

/// Replaces a note's content; admin only
pub async fn update_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, note_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<NoteRequest>,
) -> ApiResult<Json<ProjectNote>> {
    req.validate()?;
    authorize(&state.db, auth.user_id, project_id, ADMIN_ONLY).await?;

    let note =
        ProjectNote::update_content(&state.db, project_id, note_id, &req.content, auth.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;

    Ok(Json(note))
}

/// Deletes a note; admin only
pub async fn delete_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, note_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    authorize(&state.db, auth.user_id, project_id, ADMIN_ONLY).await?;

    let deleted = ProjectNote::delete(&state.db, project_id, note_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Note not found".to_string()));
    }

    info!(project_id = %project_id, note_id = %note_id, "Note deleted");

    Ok(StatusCode::NO_CONTENT)
}
