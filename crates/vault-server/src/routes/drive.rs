//! Drive endpoints: browse folders, read and write remote content, import.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use vault_core::{DriveError, ImportReport, RemoteDrive, RemoteFile, RemoteFolder};

use crate::AppState;
use crate::error::{ApiError, ApiResult};

fn drive(state: &AppState) -> ApiResult<&Arc<dyn RemoteDrive>> {
    state
        .service
        .mirror()
        .drive()
        .ok_or(ApiError::from(DriveError::NotConnected))
}

pub async fn folders(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<RemoteFolder>>> {
    Ok(Json(drive(&state)?.list_folders().await?))
}

pub async fn files(
    State(state): State<Arc<AppState>>,
    Path(folder_id): Path<String>,
) -> ApiResult<Json<Vec<RemoteFile>>> {
    Ok(Json(drive(&state)?.list_files(&folder_id).await?))
}

pub async fn read(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let content = drive(&state)?.read(&file_id).await?;
    Ok(Json(json!({ "content": content })))
}

#[derive(Deserialize)]
pub struct ContentBody {
    content: String,
}

pub async fn write(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    payload: Result<Json<ContentBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload.map_err(|_| ApiError::BadRequest("Invalid content"))?;
    drive(&state)?.write(&file_id, &body.content).await?;
    Ok(Json(json!({ "id": file_id })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBody {
    folder_id: String,
    #[serde(default)]
    name: Option<String>,
}

pub async fn import(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ImportBody>, JsonRejection>,
) -> ApiResult<Json<ImportReport>> {
    let Json(body) = payload.map_err(|_| ApiError::BadRequest("Invalid import request"))?;
    Ok(Json(
        state
            .service
            .import_vault(&body.folder_id, body.name)
            .await?,
    ))
}
