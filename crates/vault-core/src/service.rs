//! The write path for vaults and notes.
//!
//! Every change goes through `NoteService`, which updates the store first and
//! then mirrors the change to the drive. Mirroring never fails a call.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::autosave::{NoteSink, SinkError};
use crate::drive::{DriveError, RemoteDrive, RemoteFile};
use crate::events::{EditorEvent, EventBus};
use crate::markdown::{FileStats, sanitize_filename};
use crate::mirror::Mirror;
use crate::model::{FileId, FilePatch, NewFile, NewVault, NoteFile, Vault, VaultId, VaultPatch};
use crate::preview::Preview;
use crate::store::{Store, StoreError};
use crate::tree::{TreeError, TreeNode, build_tree, search_tree};

/// Concurrent drive requests per import or sync
const DRIVE_CONCURRENCY: usize = 4;

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Vault not found: {0}")]
    VaultNotFound(VaultId),

    #[error("File not found: {0}")]
    FileNotFound(FileId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Drive(#[from] DriveError),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub vault: Vault,
    pub imported: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub vault: Vault,
    /// Local notes written to the drive
    pub pushed: usize,
    /// Remote notes new to the vault
    pub imported: usize,
    pub failed: usize,
}

pub struct NoteService {
    store: Arc<dyn Store>,
    mirror: Mirror,
    events: Arc<EventBus>,
}

impl NoteService {
    pub fn new(store: Arc<dyn Store>, mirror: Mirror, events: Arc<EventBus>) -> Self {
        Self {
            store,
            mirror,
            events,
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub async fn list_vaults(&self) -> Result<Vec<Vault>> {
        Ok(self.store.list_vaults().await?)
    }

    pub async fn get_vault(&self, id: VaultId) -> Result<Option<Vault>> {
        Ok(self.store.get_vault(id).await?)
    }

    pub async fn create_vault(&self, vault: NewVault) -> Result<Vault> {
        let vault = self.store.create_vault(vault).await?;
        info!("Created vault {} ({})", vault.id, vault.name);
        Ok(vault)
    }

    pub async fn update_vault(&self, id: VaultId, patch: VaultPatch) -> Result<Option<Vault>> {
        Ok(self.store.update_vault(id, patch).await?)
    }

    pub async fn files(&self, vault_id: VaultId) -> Result<Vec<NoteFile>> {
        self.require_vault(vault_id).await?;
        Ok(self.store.files_in_vault(vault_id).await?)
    }

    pub async fn get_file(&self, id: FileId) -> Result<Option<NoteFile>> {
        Ok(self.store.get_file(id).await?)
    }

    /// Create a file, publishing new notes of a connected vault.
    pub async fn create_file(&self, file: NewFile) -> Result<NoteFile> {
        let vault = self.require_vault(file.vault_id).await?;
        let created = self.store.create_file(file).await?;
        debug!("Created {} in vault {}", created.path, vault.id);

        let Some(remote_id) = self.mirror.publish(&vault, &created).await else {
            return Ok(created);
        };
        let patch = FilePatch {
            drive_file_id: Some(Some(remote_id)),
            ..FilePatch::default()
        };
        Ok(self.store.update_file(created.id, patch).await?.unwrap_or(created))
    }

    /// Create a note named after `title` inside `parent` (or the vault root).
    ///
    /// The title is stripped of characters not allowed in file names and
    /// gets a `.md` extension. An empty title becomes "Untitled"; a taken
    /// name gets a numeric suffix.
    pub async fn create_note(
        &self,
        vault_id: VaultId,
        parent: Option<FileId>,
        title: &str,
        content: &str,
    ) -> Result<NoteFile> {
        let parent = match parent {
            Some(id) => Some(self.store.get_file(id).await?.ok_or(
                StoreError::InvalidParent {
                    parent: id,
                    reason: "does not exist",
                },
            )?),
            None => None,
        };

        let cleaned = sanitize_filename(title);
        let stem = cleaned.strip_suffix(".md").unwrap_or(&cleaned).trim();
        let stem = if stem.is_empty() { UNTITLED } else { stem };

        let siblings: HashSet<String> = self
            .store
            .files_in_vault(vault_id)
            .await?
            .into_iter()
            .map(|f| f.path)
            .collect();

        let mut suffix = 0;
        let file = loop {
            let name = match suffix {
                0 => format!("{stem}.md"),
                n => format!("{stem} {n}.md"),
            };
            let mut file = NewFile::note(vault_id, &name, content);
            if let Some(parent) = &parent {
                file = file.in_folder(parent);
            }
            if !siblings.contains(&file.path) {
                break file;
            }
            suffix += 1;
        };

        self.create_file(file).await
    }

    /// Apply a patch; content changes are pushed to the drive copy.
    pub async fn update_file(&self, id: FileId, patch: FilePatch) -> Result<Option<NoteFile>> {
        let content_changed = patch.content.is_some();
        let Some(updated) = self.store.update_file(id, patch).await? else {
            return Ok(None);
        };
        if content_changed {
            self.mirror.push(&updated).await;
        }
        Ok(Some(updated))
    }

    /// Delete a file or a folder with everything in it.
    ///
    /// Returns false if there was nothing to delete.
    pub async fn delete_file(&self, id: FileId) -> Result<bool> {
        let removed = self.store.delete_file(id).await?;
        for file in &removed {
            self.mirror.remove(file).await;
        }
        if !removed.is_empty() {
            debug!("Deleted {} file(s) starting at {}", removed.len(), id);
        }
        Ok(!removed.is_empty())
    }

    /// Explorer tree, optionally narrowed to names containing `query`.
    pub async fn tree(&self, vault_id: VaultId, query: Option<&str>) -> Result<Vec<TreeNode>> {
        let files = self.files(vault_id).await?;
        let tree = match query.map(str::trim) {
            Some(q) if !q.is_empty() => search_tree(&files, q)?,
            _ => build_tree(&files)?,
        };
        Ok(tree)
    }

    pub async fn resolve_link(&self, vault_id: VaultId, target: &str) -> Result<Option<NoteFile>> {
        let files = self.files(vault_id).await?;
        let resolved = wiki_links::resolve_link(target, &files).map(|r| r.candidate.clone());
        if resolved.is_none() {
            warn!("Link {:?} matches no file in vault {}", target, vault_id);
        }
        Ok(resolved)
    }

    pub async fn preview(&self, id: FileId) -> Result<Preview> {
        let file = self
            .store
            .get_file(id)
            .await?
            .ok_or(ServiceError::FileNotFound(id))?;
        Ok(Preview::of(&file.content))
    }

    pub async fn stats(&self, id: FileId) -> Result<FileStats> {
        let file = self
            .store
            .get_file(id)
            .await?
            .ok_or(ServiceError::FileNotFound(id))?;
        Ok(FileStats::of(&file.name, &file.content))
    }

    /// Create a connected vault from a drive folder, with its markdown notes.
    ///
    /// A failed listing fails the import; a note that cannot be read is
    /// skipped and counted.
    pub async fn import_vault(
        &self,
        folder_id: &str,
        name: Option<String>,
    ) -> Result<ImportReport> {
        let drive = self.drive()?;
        let remote = drive.list_files(folder_id).await?;

        let name = match name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name,
            None => folder_name(drive.as_ref(), folder_id).await,
        };
        let vault = self
            .create_vault(NewVault {
                name,
                folder_id: folder_id.to_string(),
                is_connected: true,
            })
            .await?;

        let notes: Vec<_> = remote.into_iter().filter(RemoteFile::is_markdown).collect();
        let (imported, failed) = self.import_remote(drive.as_ref(), &vault, notes).await;
        info!(
            "Imported {} note(s) into vault {} ({} failed)",
            imported, vault.id, failed
        );

        Ok(ImportReport {
            vault,
            imported,
            failed,
        })
    }

    /// Reconcile a vault with its drive folder.
    ///
    /// Pushes every mirrored note, publishes notes without a remote copy,
    /// imports remote notes not yet in the vault, then records whether the
    /// folder was reachable and refreshes `last_sync`.
    pub async fn sync_vault(&self, vault_id: VaultId) -> Result<SyncReport> {
        let drive = self.drive()?;
        let vault = self.require_vault(vault_id).await?;
        let files = self.store.files_in_vault(vault_id).await?;

        let mirrored: Vec<_> = files
            .iter()
            .filter(|f| !f.is_folder && f.drive_file_id.is_some())
            .map(|file| self.mirror.push(file))
            .collect();
        let pushes = stream::iter(mirrored)
            .buffer_unordered(DRIVE_CONCURRENCY)
            .collect::<Vec<bool>>()
            .await;
        let mut pushed = pushes.iter().filter(|ok| **ok).count();
        let mut failed = pushes.len() - pushed;

        let mut imported = 0;
        let connected = match drive.list_files(&vault.folder_id).await {
            Ok(remote) => {
                let connected_vault = Vault {
                    is_connected: true,
                    ..vault.clone()
                };
                for file in files.iter().filter(|f| !f.is_folder && f.drive_file_id.is_none()) {
                    match self.mirror.publish(&connected_vault, file).await {
                        Some(remote_id) => {
                            let patch = FilePatch {
                                drive_file_id: Some(Some(remote_id)),
                                ..FilePatch::default()
                            };
                            self.store.update_file(file.id, patch).await?;
                            pushed += 1;
                        }
                        None => failed += 1,
                    }
                }

                let known: HashSet<&str> = files
                    .iter()
                    .filter_map(|f| f.drive_file_id.as_deref())
                    .collect();
                let new_notes: Vec<_> = remote
                    .into_iter()
                    .filter(|r| r.is_markdown() && !known.contains(r.id.as_str()))
                    .collect();
                let (ok, bad) = self.import_remote(drive.as_ref(), &vault, new_notes).await;
                imported = ok;
                failed += bad;
                true
            }
            Err(e) => {
                warn!(
                    "Drive folder {} of vault {} unreachable: {}",
                    vault.folder_id, vault.id, e
                );
                false
            }
        };

        let patch = VaultPatch {
            is_connected: Some(connected),
            ..VaultPatch::default()
        };
        let vault = self
            .store
            .update_vault(vault_id, patch)
            .await?
            .ok_or(ServiceError::VaultNotFound(vault_id))?;

        info!(
            "Synced vault {}: {} pushed, {} imported, {} failed",
            vault.id, pushed, imported, failed
        );
        self.events.emit(EditorEvent::Synced {
            vault_id,
            pushed,
            imported,
            failed,
        });

        Ok(SyncReport {
            vault,
            pushed,
            imported,
            failed,
        })
    }

    /// Fetch remote notes and add them at the vault root.
    /// Returns (imported, failed).
    async fn import_remote(
        &self,
        drive: &dyn RemoteDrive,
        vault: &Vault,
        notes: Vec<RemoteFile>,
    ) -> (usize, usize) {
        let fetched: Vec<_> = stream::iter(notes)
            .map(|remote| async move {
                let content = drive.read(&remote.id).await;
                (remote, content)
            })
            .buffer_unordered(DRIVE_CONCURRENCY)
            .collect()
            .await;

        let mut imported = 0;
        let mut failed = 0;
        for (remote, content) in fetched {
            let content = match content {
                Ok(content) => content,
                Err(e) => {
                    warn!("Failed to read {} ({}) from drive: {}", remote.name, remote.id, e);
                    failed += 1;
                    continue;
                }
            };
            let mut file = NewFile::note(vault.id, &remote.name, &content);
            file.drive_file_id = Some(remote.id.clone());
            match self.store.create_file(file).await {
                Ok(_) => imported += 1,
                Err(e) => {
                    warn!("Skipping drive file {}: {}", remote.name, e);
                    failed += 1;
                }
            }
        }
        (imported, failed)
    }

    fn drive(&self) -> Result<Arc<dyn RemoteDrive>> {
        self.mirror
            .drive()
            .cloned()
            .ok_or(ServiceError::Drive(DriveError::NotConnected))
    }

    async fn require_vault(&self, id: VaultId) -> Result<Vault> {
        self.store
            .get_vault(id)
            .await?
            .ok_or(ServiceError::VaultNotFound(id))
    }
}

async fn folder_name(drive: &dyn RemoteDrive, folder_id: &str) -> String {
    match drive.list_folders().await {
        Ok(folders) => folders
            .into_iter()
            .find(|f| f.id == folder_id)
            .map(|f| f.name)
            .unwrap_or_else(|| folder_id.to_string()),
        Err(e) => {
            warn!("Failed to look up name of drive folder {}: {}", folder_id, e);
            folder_id.to_string()
        }
    }
}

#[async_trait]
impl NoteSink for NoteService {
    async fn persist(
        &self,
        file_id: FileId,
        content: &str,
    ) -> std::result::Result<DateTime<Utc>, SinkError> {
        let file = self
            .store
            .get_file(file_id)
            .await
            .map_err(|e| SinkError::Rejected(e.to_string()))?
            .ok_or(SinkError::NotFound(file_id))?;
        if file.is_folder {
            return Err(SinkError::NotANote(file_id));
        }

        let saved = self
            .update_file(file_id, FilePatch::content(content))
            .await
            .map_err(|e| SinkError::Rejected(e.to_string()))?
            .ok_or(SinkError::NotFound(file_id))?;
        Ok(saved.last_modified)
    }
}
