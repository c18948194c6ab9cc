//! vault-core: note vaults with autosave and cloud-drive mirroring.
//!
//! This crate provides:
//! - The vault/file model and the `Store` seam with an in-memory store
//! - The explorer tree built from parent ids
//! - Debounced autosave and the editor session around it
//! - Markdown preview with wiki links turned into navigable anchors
//! - `RemoteDrive` and the best-effort `Mirror` used by `NoteService`

pub mod autosave;
mod demo;
pub mod drive;
pub mod editor;
pub mod events;
pub mod markdown;
pub mod mirror;
pub mod model;
pub mod preview;
pub mod service;
pub mod store;
pub mod tree;

pub use autosave::{
    AutoSaveConfig, AutoSaver, NoteSink, SaveOutcome, SaveSchedule, SaveStatus, SinkError,
};
pub use drive::{DriveError, InMemoryDrive, RemoteDrive, RemoteFile, RemoteFolder};
pub use editor::{EditorError, EditorSession};
pub use events::{EditorEvent, EventBus, Subscription};
pub use markdown::{FileStats, TextStats};
pub use mirror::Mirror;
pub use model::{FileId, FilePatch, NewFile, NewVault, NoteFile, Vault, VaultId, VaultPatch};
pub use preview::Preview;
pub use service::{ImportReport, NoteService, ServiceError, SyncReport};
pub use store::{MemStore, Store, StoreError};
pub use tree::{TreeError, TreeNode};
