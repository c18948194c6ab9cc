//! File and note endpoints

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use vault_core::{FileId, FilePatch, FileStats, NewFile, NoteFile, Preview, VaultId};

use crate::AppState;
use crate::error::{ApiError, ApiResult};

const INVALID_FILE: &str = "Invalid file data";
const FILE_NOT_FOUND: &str = "File not found";

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FileId>,
) -> ApiResult<Json<NoteFile>> {
    state
        .service
        .get_file(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(FILE_NOT_FOUND))
}

pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FileId>,
) -> ApiResult<Json<Preview>> {
    Ok(Json(state.service.preview(id).await?))
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FileId>,
) -> ApiResult<Json<FileStats>> {
    Ok(Json(state.service.stats(id).await?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewFile>, JsonRejection>,
) -> ApiResult<Json<NoteFile>> {
    let Json(file) = payload.map_err(|_| ApiError::BadRequest(INVALID_FILE))?;
    Ok(Json(state.service.create_file(file).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    vault_id: VaultId,
    #[serde(default)]
    parent_id: Option<FileId>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

pub async fn create_note(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewNote>, JsonRejection>,
) -> ApiResult<Json<NoteFile>> {
    let Json(note) = payload.map_err(|_| ApiError::BadRequest(INVALID_FILE))?;
    let file = state
        .service
        .create_note(note.vault_id, note.parent_id, &note.title, &note.content)
        .await?;
    Ok(Json(file))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FileId>,
    payload: Result<Json<FilePatch>, JsonRejection>,
) -> ApiResult<Json<NoteFile>> {
    let Json(patch) = payload.map_err(|_| ApiError::BadRequest(INVALID_FILE))?;
    state
        .service
        .update_file(id, patch)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(FILE_NOT_FOUND))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FileId>,
) -> ApiResult<Json<Value>> {
    if !state.service.delete_file(id).await? {
        return Err(ApiError::NotFound(FILE_NOT_FOUND));
    }
    Ok(Json(json!({ "message": "File deleted successfully" })))
}
