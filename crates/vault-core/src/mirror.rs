//! Best-effort copy of local edits to the cloud drive.
//!
//! Every method logs a failure at `warn` and carries on. The local store is
//! the system of record; a drive outage must never fail a local write.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::drive::RemoteDrive;
use crate::model::{NoteFile, Vault};

#[derive(Clone, Default)]
pub struct Mirror {
    drive: Option<Arc<dyn RemoteDrive>>,
}

impl Mirror {
    pub fn new(drive: Arc<dyn RemoteDrive>) -> Self {
        Self { drive: Some(drive) }
    }

    /// A mirror with no drive behind it; every call is a no-op.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.drive.is_some()
    }

    pub fn drive(&self) -> Option<&Arc<dyn RemoteDrive>> {
        self.drive.as_ref()
    }

    /// Push a file's current content to its remote copy.
    ///
    /// Returns whether the remote write happened.
    pub async fn push(&self, file: &NoteFile) -> bool {
        let (Some(drive), Some(remote_id)) = (&self.drive, &file.drive_file_id) else {
            return false;
        };
        match drive.write(remote_id, &file.content).await {
            Ok(()) => {
                debug!("Mirrored {} to {}", file.path, remote_id);
                true
            }
            Err(e) => {
                warn!("Failed to mirror {} to drive: {}", file.path, e);
                false
            }
        }
    }

    /// Create a remote copy of a note in the vault's folder.
    ///
    /// Only notes of a connected vault are published; folders are not.
    /// Returns the new remote id.
    pub async fn publish(&self, vault: &Vault, file: &NoteFile) -> Option<String> {
        let drive = self.drive.as_ref()?;
        if !vault.is_connected || file.is_folder || file.drive_file_id.is_some() {
            return None;
        }
        match drive.create(&vault.folder_id, &file.name, &file.content).await {
            Ok(remote) => {
                debug!("Published {} as {}", file.path, remote.id);
                Some(remote.id)
            }
            Err(e) => {
                warn!("Failed to publish {} to drive: {}", file.path, e);
                None
            }
        }
    }

    /// Delete a file's remote copy, if it has one.
    pub async fn remove(&self, file: &NoteFile) {
        let (Some(drive), Some(remote_id)) = (&self.drive, &file.drive_file_id) else {
            return;
        };
        if let Err(e) = drive.delete(remote_id).await {
            warn!("Failed to delete {} from drive: {}", file.path, e);
        }
    }
}
