//! Record store for vaults and files.
//!
//! `Store` is the persistence seam; `MemStore` is the in-memory system of
//! record used by the server and the tests.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use crate::demo;
use crate::model::{FileId, FilePatch, NewFile, NewVault, NoteFile, Vault, VaultId, VaultPatch};
use crate::tree::creates_cycle;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Invalid {entity}: {reason}")]
    Invalid {
        entity: &'static str,
        reason: String,
    },

    #[error("Vault not found: {0}")]
    VaultNotFound(VaultId),

    #[error("Invalid parent {parent}: {reason}")]
    InvalidParent {
        parent: FileId,
        reason: &'static str,
    },

    #[error("Path already exists in vault {vault_id}: {path}")]
    PathTaken { vault_id: VaultId, path: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Vault and file persistence.
///
/// Lookups of a missing record return `Ok(None)`; errors are reserved for
/// rejected writes. Listings are ordered by id.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_vault(&self, id: VaultId) -> Result<Option<Vault>>;

    async fn create_vault(&self, vault: NewVault) -> Result<Vault>;

    /// Apply `patch` and refresh `last_sync`.
    async fn update_vault(&self, id: VaultId, patch: VaultPatch) -> Result<Option<Vault>>;

    async fn list_vaults(&self) -> Result<Vec<Vault>>;

    async fn get_file(&self, id: FileId) -> Result<Option<NoteFile>>;

    async fn get_file_by_path(&self, vault_id: VaultId, path: &str) -> Result<Option<NoteFile>>;

    async fn create_file(&self, file: NewFile) -> Result<NoteFile>;

    async fn update_file(&self, id: FileId, patch: FilePatch) -> Result<Option<NoteFile>>;

    /// Delete a file, and everything below it for a folder.
    ///
    /// Returns the removed records, parents before children; empty if `id`
    /// did not exist.
    async fn delete_file(&self, id: FileId) -> Result<Vec<NoteFile>>;

    async fn files_in_vault(&self, vault_id: VaultId) -> Result<Vec<NoteFile>>;

    /// Direct children of `parent`, or the vault root for `None`.
    async fn files_in_parent(
        &self,
        vault_id: VaultId,
        parent: Option<FileId>,
    ) -> Result<Vec<NoteFile>>;
}

struct Tables {
    vaults: BTreeMap<VaultId, Vault>,
    files: BTreeMap<FileId, NoteFile>,
    next_vault_id: VaultId,
    next_file_id: FileId,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            vaults: BTreeMap::new(),
            files: BTreeMap::new(),
            next_vault_id: 1,
            next_file_id: 1,
        }
    }
}

impl Tables {
    fn insert_vault(&mut self, vault: NewVault) -> Result<Vault> {
        require_text("vault", "name", &vault.name)?;

        let id = self.next_vault_id;
        self.next_vault_id += 1;
        let vault = Vault {
            id,
            name: vault.name,
            folder_id: vault.folder_id,
            is_connected: vault.is_connected,
            last_sync: Some(Utc::now()),
        };
        self.vaults.insert(id, vault.clone());
        Ok(vault)
    }

    fn insert_file(&mut self, file: NewFile) -> Result<NoteFile> {
        require_text("file", "name", &file.name)?;
        require_text("file", "path", &file.path)?;
        if !self.vaults.contains_key(&file.vault_id) {
            return Err(StoreError::VaultNotFound(file.vault_id));
        }
        self.check_path_free(file.vault_id, &file.path, None)?;
        if let Some(parent) = file.parent_id {
            self.check_parent(file.vault_id, parent)?;
        }

        let id = self.next_file_id;
        self.next_file_id += 1;
        let file = NoteFile {
            id,
            vault_id: file.vault_id,
            name: file.name,
            path: file.path,
            content: file.content,
            drive_file_id: file.drive_file_id,
            is_folder: file.is_folder,
            parent_id: file.parent_id,
            last_modified: Utc::now(),
        };
        self.files.insert(id, file.clone());
        Ok(file)
    }

    fn patch_file(&mut self, id: FileId, patch: FilePatch) -> Result<Option<NoteFile>> {
        let Some(existing) = self.files.get(&id) else {
            return Ok(None);
        };
        let vault_id = existing.vault_id;

        if let Some(name) = &patch.name {
            require_text("file", "name", name)?;
        }
        if let Some(path) = &patch.path {
            require_text("file", "path", path)?;
            self.check_path_free(vault_id, path, Some(id))?;
        }
        if let Some(Some(parent)) = patch.parent_id {
            self.check_parent(vault_id, parent)?;
            if creates_cycle(|f| self.files.get(&f).and_then(|f| f.parent_id), id, parent) {
                return Err(StoreError::InvalidParent {
                    parent,
                    reason: "would place a folder inside itself",
                });
            }
        }
        if patch.is_folder == Some(false) && self.files.values().any(|f| f.parent_id == Some(id)) {
            return Err(StoreError::Invalid {
                entity: "file",
                reason: format!("{id} still has children and must stay a folder"),
            });
        }

        let Some(file) = self.files.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            file.name = name;
        }
        if let Some(path) = patch.path {
            file.path = path;
        }
        if let Some(content) = patch.content {
            file.content = content;
        }
        if let Some(drive_file_id) = patch.drive_file_id {
            file.drive_file_id = drive_file_id;
        }
        if let Some(is_folder) = patch.is_folder {
            file.is_folder = is_folder;
        }
        if let Some(parent_id) = patch.parent_id {
            file.parent_id = parent_id;
        }
        file.last_modified = Utc::now();
        Ok(Some(file.clone()))
    }

    fn remove_file(&mut self, id: FileId) -> Vec<NoteFile> {
        let mut removed = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(file) = self.files.remove(&next) {
                pending.extend(
                    self.files
                        .values()
                        .filter(|f| f.parent_id == Some(next))
                        .map(|f| f.id),
                );
                removed.push(file);
            }
        }
        removed
    }

    fn check_path_free(&self, vault_id: VaultId, path: &str, except: Option<FileId>) -> Result<()> {
        let taken = self
            .files
            .values()
            .any(|f| f.vault_id == vault_id && f.path == path && Some(f.id) != except);
        if taken {
            return Err(StoreError::PathTaken {
                vault_id,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn check_parent(&self, vault_id: VaultId, parent: FileId) -> Result<()> {
        let reason = match self.files.get(&parent) {
            None => "does not exist",
            Some(p) if !p.is_folder => "is not a folder",
            Some(p) if p.vault_id != vault_id => "belongs to another vault",
            Some(_) => return Ok(()),
        };
        Err(StoreError::InvalidParent { parent, reason })
    }
}

fn require_text(entity: &'static str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::Invalid {
            entity,
            reason: format!("{field} must not be empty"),
        });
    }
    Ok(())
}

/// In-memory store. Create one per process and share it behind an `Arc`.
#[derive(Default)]
pub struct MemStore {
    tables: RwLock<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the demo vault.
    pub fn with_demo_data() -> Result<Self> {
        let store = Self::new();
        {
            let mut tables = store.write();
            let vault = tables.insert_vault(demo::vault())?;
            for file in demo::root_notes(vault.id) {
                tables.insert_file(file)?;
            }
            let folder = tables.insert_file(NewFile::folder(vault.id, demo::FOLDER_NAME))?;
            for file in demo::folder_notes(vault.id) {
                tables.insert_file(file.in_folder(&folder))?;
            }
            debug!("Seeded demo vault {} ({})", vault.id, vault.name);
        }
        Ok(store)
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Store for MemStore {
    async fn get_vault(&self, id: VaultId) -> Result<Option<Vault>> {
        Ok(self.read().vaults.get(&id).cloned())
    }

    async fn create_vault(&self, vault: NewVault) -> Result<Vault> {
        self.write().insert_vault(vault)
    }

    async fn update_vault(&self, id: VaultId, patch: VaultPatch) -> Result<Option<Vault>> {
        if let Some(name) = &patch.name {
            require_text("vault", "name", name)?;
        }
        let mut tables = self.write();
        let Some(vault) = tables.vaults.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            vault.name = name;
        }
        if let Some(folder_id) = patch.folder_id {
            vault.folder_id = folder_id;
        }
        if let Some(is_connected) = patch.is_connected {
            vault.is_connected = is_connected;
        }
        vault.last_sync = Some(Utc::now());
        Ok(Some(vault.clone()))
    }

    async fn list_vaults(&self) -> Result<Vec<Vault>> {
        Ok(self.read().vaults.values().cloned().collect())
    }

    async fn get_file(&self, id: FileId) -> Result<Option<NoteFile>> {
        Ok(self.read().files.get(&id).cloned())
    }

    async fn get_file_by_path(&self, vault_id: VaultId, path: &str) -> Result<Option<NoteFile>> {
        Ok(self
            .read()
            .files
            .values()
            .find(|f| f.vault_id == vault_id && f.path == path)
            .cloned())
    }

    async fn create_file(&self, file: NewFile) -> Result<NoteFile> {
        self.write().insert_file(file)
    }

    async fn update_file(&self, id: FileId, patch: FilePatch) -> Result<Option<NoteFile>> {
        self.write().patch_file(id, patch)
    }

    async fn delete_file(&self, id: FileId) -> Result<Vec<NoteFile>> {
        Ok(self.write().remove_file(id))
    }

    async fn files_in_vault(&self, vault_id: VaultId) -> Result<Vec<NoteFile>> {
        Ok(self
            .read()
            .files
            .values()
            .filter(|f| f.vault_id == vault_id)
            .cloned()
            .collect())
    }

    async fn files_in_parent(
        &self,
        vault_id: VaultId,
        parent: Option<FileId>,
    ) -> Result<Vec<NoteFile>> {
        Ok(self
            .read()
            .files
            .values()
            .filter(|f| f.vault_id == vault_id && f.parent_id == parent)
            .cloned()
            .collect())
    }
}
