//! Vault and file records plus their insert/patch shapes.
//!
//! Wire names are camelCase to match the JSON API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use wiki_links::LinkCandidate;

pub type VaultId = u64;
pub type FileId = u64;

/// A note vault backed by a cloud-drive folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: VaultId,
    pub name: String,
    /// Remote folder the vault mirrors to
    pub folder_id: String,
    pub is_connected: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVault {
    pub name: String,
    pub folder_id: String,
    #[serde(default)]
    pub is_connected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_connected: Option<bool>,
}

/// A note or folder inside a vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFile {
    pub id: FileId,
    pub vault_id: VaultId,
    /// File name with extension: "Welcome.md"
    pub name: String,
    /// Vault path with leading slash: "/Notes/Daily Note.md"
    pub path: String,
    pub content: String,
    /// Id of the mirrored file in the cloud drive
    pub drive_file_id: Option<String>,
    pub is_folder: bool,
    /// Containing folder; `None` for the vault root
    pub parent_id: Option<FileId>,
    pub last_modified: DateTime<Utc>,
}

impl LinkCandidate for NoteFile {
    fn link_name(&self) -> &str {
        &self.name
    }

    fn link_path(&self) -> &str {
        &self.path
    }

    fn is_folder(&self) -> bool {
        self.is_folder
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub vault_id: VaultId,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub drive_file_id: Option<String>,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub parent_id: Option<FileId>,
}

impl NewFile {
    /// A markdown note at the vault root.
    pub fn note(vault_id: VaultId, name: &str, content: &str) -> Self {
        Self {
            vault_id,
            name: name.to_string(),
            path: format!("/{}", name),
            content: content.to_string(),
            drive_file_id: None,
            is_folder: false,
            parent_id: None,
        }
    }

    /// An empty folder at the vault root.
    pub fn folder(vault_id: VaultId, name: &str) -> Self {
        Self {
            is_folder: true,
            ..Self::note(vault_id, name, "")
        }
    }

    pub fn in_folder(mut self, parent: &NoteFile) -> Self {
        self.path = format!("{}/{}", parent.path.trim_end_matches('/'), self.name);
        self.parent_id = Some(parent.id);
        self
    }
}

/// Partial file update. Nullable fields use a nested `Option` so that
/// "absent" (leave as is) and `null` (clear) are distinct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub drive_file_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_folder: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub parent_id: Option<Option<FileId>>,
}

impl FilePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

/// A field that is present in the input, possibly as `null`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
