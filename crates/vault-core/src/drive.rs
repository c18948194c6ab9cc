//! Cloud-drive seam.
//!
//! `RemoteDrive` is what the mirror and the import/sync flows talk to. The
//! HTTP implementation lives in the server; `InMemoryDrive` backs the tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const TEXT_MIME_TYPE: &str = "text/plain";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DriveError {
    #[error("No drive connected")]
    NotConnected,

    #[error("Remote file not found: {0}")]
    NotFound(String),

    #[error("Drive rejected the access token")]
    Unauthorized,

    #[error("Drive request failed: {0}")]
    Request(String),

    #[error("Unexpected drive response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, DriveError>;

/// A file listed in a drive folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl RemoteFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Markdown notes are the only files imported into a vault.
    pub fn is_markdown(&self) -> bool {
        !self.is_folder() && self.name.to_lowercase().ends_with(".md")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFolder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
}

#[async_trait]
pub trait RemoteDrive: Send + Sync {
    /// Every folder the token can see.
    async fn list_folders(&self) -> Result<Vec<RemoteFolder>>;

    /// Direct children of `folder_id`.
    async fn list_files(&self, folder_id: &str) -> Result<Vec<RemoteFile>>;

    async fn read(&self, file_id: &str) -> Result<String>;

    /// Replace the content of an existing file.
    async fn write(&self, file_id: &str, content: &str) -> Result<()>;

    /// Create a text file in `folder_id`.
    async fn create(&self, folder_id: &str, name: &str, content: &str) -> Result<RemoteFile>;

    async fn delete(&self, file_id: &str) -> Result<()>;
}

#[async_trait]
impl<T: RemoteDrive + ?Sized> RemoteDrive for Arc<T> {
    async fn list_folders(&self) -> Result<Vec<RemoteFolder>> {
        (**self).list_folders().await
    }

    async fn list_files(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        (**self).list_files(folder_id).await
    }

    async fn read(&self, file_id: &str) -> Result<String> {
        (**self).read(file_id).await
    }

    async fn write(&self, file_id: &str, content: &str) -> Result<()> {
        (**self).write(file_id, content).await
    }

    async fn create(&self, folder_id: &str, name: &str, content: &str) -> Result<RemoteFile> {
        (**self).create(folder_id, name, content).await
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        (**self).delete(file_id).await
    }
}

#[derive(Default)]
struct DriveState {
    folders: BTreeMap<String, RemoteFolder>,
    files: BTreeMap<String, (RemoteFile, String)>,
}

/// In-memory drive for tests. `set_offline(true)` makes every call fail.
#[derive(Default)]
pub struct InMemoryDrive {
    state: RwLock<DriveState>,
    offline: AtomicBool,
}

impl InMemoryDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_folder(&self, name: &str) -> RemoteFolder {
        let folder = RemoteFolder {
            id: new_id(),
            name: name.to_string(),
            parents: Vec::new(),
        };
        self.write_state()
            .folders
            .insert(folder.id.clone(), folder.clone());
        folder
    }

    /// Add a file directly, bypassing the offline switch.
    pub fn add_file(&self, folder_id: &str, name: &str, content: &str) -> RemoteFile {
        let file = RemoteFile {
            id: new_id(),
            name: name.to_string(),
            mime_type: TEXT_MIME_TYPE.to_string(),
            modified_time: Some(Utc::now()),
            parents: vec![folder_id.to_string()],
        };
        self.write_state()
            .files
            .insert(file.id.clone(), (file.clone(), content.to_string()));
        file
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Current content of a file, regardless of the offline switch.
    pub fn content(&self, file_id: &str) -> Option<String> {
        self.read_state()
            .files
            .get(file_id)
            .map(|(_, content)| content.clone())
    }

    pub fn file_count(&self) -> usize {
        self.read_state().files.len()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DriveError::Request("drive is offline".to_string()));
        }
        Ok(())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, DriveState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, DriveState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl RemoteDrive for InMemoryDrive {
    async fn list_folders(&self) -> Result<Vec<RemoteFolder>> {
        self.check_online()?;
        Ok(self.read_state().folders.values().cloned().collect())
    }

    async fn list_files(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        self.check_online()?;
        let state = self.read_state();
        if !state.folders.contains_key(folder_id) {
            return Err(DriveError::NotFound(folder_id.to_string()));
        }
        Ok(state
            .files
            .values()
            .filter(|(f, _)| f.parents.iter().any(|p| p == folder_id))
            .map(|(f, _)| f.clone())
            .collect())
    }

    async fn read(&self, file_id: &str) -> Result<String> {
        self.check_online()?;
        self.content(file_id)
            .ok_or_else(|| DriveError::NotFound(file_id.to_string()))
    }

    async fn write(&self, file_id: &str, content: &str) -> Result<()> {
        self.check_online()?;
        let mut state = self.write_state();
        let (file, body) = state
            .files
            .get_mut(file_id)
            .ok_or_else(|| DriveError::NotFound(file_id.to_string()))?;
        file.modified_time = Some(Utc::now());
        *body = content.to_string();
        Ok(())
    }

    async fn create(&self, folder_id: &str, name: &str, content: &str) -> Result<RemoteFile> {
        self.check_online()?;
        if !self.read_state().folders.contains_key(folder_id) {
            return Err(DriveError::NotFound(folder_id.to_string()));
        }
        Ok(self.add_file(folder_id, name, content))
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        self.check_online()?;
        self.write_state()
            .files
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| DriveError::NotFound(file_id.to_string()))
    }
}
