//! Editor events and the bus that delivers them.
//!
//! `EditorEvent` carries what the UI surfaces to the user: save results as
//! toast notices and sync summaries. Wrap the bus in `Arc` to subscribe.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{FileId, VaultId};

pub const SAVE_FAILED_TITLE: &str = "Save Failed";
pub const SAVE_FAILED_DESCRIPTION: &str = "Failed to save changes. Please try again.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    /// A note's content reached the store.
    #[serde(rename_all = "camelCase")]
    Saved {
        file_id: FileId,
        saved_at: DateTime<Utc>,
    },
    /// A save failed; shown to the user as a destructive toast.
    #[serde(rename_all = "camelCase")]
    SaveFailed {
        file_id: FileId,
        title: String,
        description: String,
    },
    /// A vault finished syncing with its drive folder.
    #[serde(rename_all = "camelCase")]
    Synced {
        vault_id: VaultId,
        pushed: usize,
        imported: usize,
        failed: usize,
    },
}

impl EditorEvent {
    pub fn save_failed(file_id: FileId) -> Self {
        EditorEvent::SaveFailed {
            file_id,
            title: SAVE_FAILED_TITLE.to_string(),
            description: SAVE_FAILED_DESCRIPTION.to_string(),
        }
    }
}

/// Subscription handle that unsubscribes automatically when dropped.
pub struct Subscription {
    bus: Weak<EventBus>,
    id: usize,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.id);
        }
    }
}

type Callback = Arc<dyn Fn(EditorEvent) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    callbacks: RwLock<Vec<(usize, Callback)>>,
    next_id: AtomicUsize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events. Returns `Subscription` that unsubscribes on drop.
    pub fn subscribe(
        self: &Arc<Self>,
        callback: impl Fn(EditorEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(callback)));
        Subscription {
            bus: Arc::downgrade(self),
            id,
        }
    }

    fn unsubscribe(&self, id: usize) {
        // try_write: Drop may run while emit holds the read lock during unwinding
        if let Ok(mut guard) = self.callbacks.try_write() {
            guard.retain(|(i, _)| *i != id);
        }
    }

    pub fn emit(&self, event: EditorEvent) {
        // Snapshot so a callback may subscribe without deadlocking
        let callbacks: Vec<_> = self
            .callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(event.clone());
        }
    }
}
