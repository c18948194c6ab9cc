pub mod drive;
pub mod files;
pub mod vaults;

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

/// Settings the editor needs from the server.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    autosave_delay_ms: u64,
    drive_connected: bool,
}

pub async fn settings(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(Settings {
        autosave_delay_ms: state.autosave.delay.as_millis() as u64,
        drive_connected: state.service.mirror().is_enabled(),
    })
}
