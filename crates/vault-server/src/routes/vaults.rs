//! Vault endpoints

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::Deserialize;
use vault_core::{NewVault, NoteFile, SyncReport, TreeNode, Vault, VaultId, VaultPatch};

use crate::AppState;
use crate::error::{ApiError, ApiResult};

const INVALID_VAULT: &str = "Invalid vault data";

pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Vault>>> {
    Ok(Json(state.service.list_vaults().await?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewVault>, JsonRejection>,
) -> ApiResult<Json<Vault>> {
    let Json(vault) = payload.map_err(|_| ApiError::BadRequest(INVALID_VAULT))?;
    let vault = state.service.create_vault(vault).await.map_err(|e| {
        tracing::debug!("Rejected vault: {}", e);
        ApiError::BadRequest(INVALID_VAULT)
    })?;
    Ok(Json(vault))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<VaultId>,
    payload: Result<Json<VaultPatch>, JsonRejection>,
) -> ApiResult<Json<Vault>> {
    let Json(patch) = payload.map_err(|_| ApiError::BadRequest(INVALID_VAULT))?;
    state
        .service
        .update_vault(id, patch)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Vault not found"))
}

pub async fn sync(
    State(state): State<Arc<AppState>>,
    Path(id): Path<VaultId>,
) -> ApiResult<Json<SyncReport>> {
    Ok(Json(state.service.sync_vault(id).await?))
}

pub async fn files(
    State(state): State<Arc<AppState>>,
    Path(id): Path<VaultId>,
) -> ApiResult<Json<Vec<NoteFile>>> {
    Ok(Json(state.service.files(id).await?))
}

#[derive(Deserialize)]
pub struct TreeParams {
    q: Option<String>,
}

pub async fn tree(
    State(state): State<Arc<AppState>>,
    Path(id): Path<VaultId>,
    Query(params): Query<TreeParams>,
) -> ApiResult<Json<Vec<TreeNode>>> {
    Ok(Json(state.service.tree(id, params.q.as_deref()).await?))
}

#[derive(Deserialize)]
pub struct ResolveParams {
    target: String,
}

pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<VaultId>,
    Query(params): Query<ResolveParams>,
) -> ApiResult<Json<NoteFile>> {
    state
        .service
        .resolve_link(id, &params.target)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("No file matches the link"))
}
