//! JSON API over a note vault.
//!
//! Provides:
//! - Vault and file CRUD backed by the in-memory store
//! - Explorer tree, link resolution and rendered previews
//! - Google Drive browsing, import and best-effort mirroring

pub mod config;
pub mod drive_http;
pub mod error;
mod routes;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;
use vault_core::{AutoSaveConfig, NoteService};

/// Shared application state
pub struct AppState {
    pub service: NoteService,
    pub autosave: AutoSaveConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/settings", get(routes::settings))
        // Vaults
        .route("/api/vaults", get(routes::vaults::list).post(routes::vaults::create))
        .route("/api/vaults/{id}", put(routes::vaults::update))
        .route("/api/vaults/{id}/sync", post(routes::vaults::sync))
        .route("/api/vaults/{id}/files", get(routes::vaults::files))
        .route("/api/vaults/{id}/tree", get(routes::vaults::tree))
        .route("/api/vaults/{id}/resolve", get(routes::vaults::resolve))
        // Files
        .route("/api/files", post(routes::files::create))
        .route(
            "/api/files/{id}",
            get(routes::files::get)
                .put(routes::files::update)
                .delete(routes::files::delete),
        )
        .route("/api/files/{id}/preview", get(routes::files::preview))
        .route("/api/files/{id}/stats", get(routes::files::stats))
        .route("/api/notes", post(routes::files::create_note))
        // Drive
        .route("/api/drive/folders", get(routes::drive::folders))
        .route("/api/drive/files/{folder_id}", get(routes::drive::files))
        .route(
            "/api/drive/file/{file_id}/content",
            get(routes::drive::read).put(routes::drive::write),
        )
        .route("/api/drive/import", post(routes::drive::import))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
