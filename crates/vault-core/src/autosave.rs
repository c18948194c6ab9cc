//! Debounced autosave for one open note.
//!
//! Every edit re-arms a timer; the note is written once the buffer has been
//! quiet for the configured delay. Only one write is in flight at a time, and
//! a write requested while another runs is dropped. When a write finishes and
//! the buffer has moved on, a fresh window is armed so the newer text still
//! reaches the sink.
//!
//! Timers are spawned tasks tagged with a generation number. Re-arming bumps
//! the generation, and a timer that wakes with a stale one exits; no task is
//! ever aborted while it is persisting.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::events::{EditorEvent, EventBus};
use crate::model::FileId;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSaveConfig {
    /// Quiet period after the last edit before writing
    pub delay: Duration,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("File not found: {0}")]
    NotFound(FileId),

    #[error("File {0} is a folder")]
    NotANote(FileId),

    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Where an autosave writes to.
#[async_trait]
pub trait NoteSink: Send + Sync {
    /// Store `content` as the note's body. Returns the save time.
    async fn persist(&self, file_id: FileId, content: &str) -> Result<DateTime<Utc>, SinkError>;
}

#[async_trait]
impl<T: NoteSink + ?Sized> NoteSink for Arc<T> {
    async fn persist(&self, file_id: FileId, content: &str) -> Result<DateTime<Utc>, SinkError> {
        (**self).persist(file_id, content).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(DateTime<Utc>),
    /// Buffer already matches what was persisted
    Clean,
    /// Another save was in flight
    Suppressed,
    Failed(SinkError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStatus {
    pub is_saving: bool,
    pub last_saved: Option<DateTime<Utc>>,
    pub has_unsaved_changes: bool,
}

/// Deadline bookkeeping for the debounce window, free of any runtime.
///
/// `touch` starts a new window and returns its generation; `fire` accepts
/// only the newest generation, once.
#[derive(Debug, Clone)]
pub struct SaveSchedule {
    delay: Duration,
    generation: u64,
    deadline: Option<Instant>,
}

impl SaveSchedule {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            deadline: None,
        }
    }

    pub fn touch(&mut self, now: Instant) -> (u64, Instant) {
        self.generation += 1;
        let deadline = now + self.delay;
        self.deadline = Some(deadline);
        (self.generation, deadline)
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        self.deadline = None;
    }

    /// Claim the window armed as `generation` once `now` reaches its
    /// deadline. False if it was re-armed, cancelled, already fired or is not
    /// due yet.
    pub fn fire(&mut self, generation: u64, now: Instant) -> bool {
        if generation != self.generation || !self.is_due(now) {
            return false;
        }
        self.deadline = None;
        true
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

struct State {
    content: String,
    persisted: String,
    saving: bool,
    last_saved: Option<DateTime<Utc>>,
    schedule: SaveSchedule,
}

struct Inner {
    file_id: FileId,
    sink: Arc<dyn NoteSink>,
    events: Arc<EventBus>,
    state: Mutex<State>,
}

/// Autosave state for one open note. Clones share the same state.
///
/// Edits and saves spawn tokio tasks, so call them from within a runtime.
#[derive(Clone)]
pub struct AutoSaver {
    inner: Arc<Inner>,
}

impl AutoSaver {
    pub fn new(
        file_id: FileId,
        persisted: String,
        sink: Arc<dyn NoteSink>,
        config: AutoSaveConfig,
        events: Arc<EventBus>,
    ) -> Self {
        let state = State {
            content: persisted.clone(),
            persisted,
            saving: false,
            last_saved: None,
            schedule: SaveSchedule::new(config.delay),
        };
        Self {
            inner: Arc::new(Inner {
                file_id,
                sink,
                events,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn file_id(&self) -> FileId {
        self.inner.file_id
    }

    pub fn content(&self) -> String {
        self.inner.lock().content.clone()
    }

    /// Record an edit and (re)start the debounce window.
    ///
    /// Editing back to the persisted text cancels the pending write.
    pub fn on_change(&self, content: String) {
        let mut state = self.inner.lock();
        if content == state.persisted {
            state.content = content;
            state.schedule.cancel();
            return;
        }
        state.content = content;
        let (generation, deadline) = state.schedule.touch(Instant::now());
        drop(state);

        Inner::arm(&self.inner, generation, deadline);
    }

    /// Save now, unless a save is already in flight.
    pub async fn save(&self) -> SaveOutcome {
        // Run detached so that dropping this future cannot leave the
        // in-flight flag set.
        let inner = Arc::clone(&self.inner);
        match tokio::spawn(async move { Inner::save(&inner).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Save task for file {} failed: {}", self.inner.file_id, e);
                SaveOutcome::Failed(SinkError::Rejected(e.to_string()))
            }
        }
    }

    /// Unload hook: drop the pending timer and save immediately.
    pub async fn flush(&self) -> SaveOutcome {
        self.inner.lock().schedule.cancel();
        debug!("Flushing file {}", self.inner.file_id);
        self.save().await
    }

    pub fn status(&self) -> SaveStatus {
        let state = self.inner.lock();
        SaveStatus {
            is_saving: state.saving,
            last_saved: state.last_saved,
            has_unsaved_changes: state.content != state.persisted,
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn arm(inner: &Arc<Inner>, generation: u64, deadline: Instant) {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let due = inner.lock().schedule.fire(generation, Instant::now());
            if due {
                Inner::save(&inner).await;
            }
        });
    }

    async fn save(inner: &Arc<Inner>) -> SaveOutcome {
        let snapshot = {
            let mut state = inner.lock();
            if state.saving {
                debug!("Save of file {} already in flight; skipping", inner.file_id);
                return SaveOutcome::Suppressed;
            }
            state.schedule.cancel();
            if state.content == state.persisted {
                return SaveOutcome::Clean;
            }
            state.saving = true;
            state.content.clone()
        };

        let result = inner.sink.persist(inner.file_id, &snapshot).await;

        let rearm = {
            let mut state = inner.lock();
            state.saving = false;
            if let Ok(saved_at) = &result {
                state.persisted = snapshot.clone();
                state.last_saved = Some(*saved_at);
            }
            if state.content != snapshot && state.schedule.deadline().is_none() {
                Some(state.schedule.touch(Instant::now()))
            } else {
                None
            }
        };
        if let Some((generation, deadline)) = rearm {
            Inner::arm(inner, generation, deadline);
        }

        match result {
            Ok(saved_at) => {
                debug!("Saved file {}", inner.file_id);
                inner.events.emit(EditorEvent::Saved {
                    file_id: inner.file_id,
                    saved_at,
                });
                SaveOutcome::Saved(saved_at)
            }
            Err(e) => {
                error!("Failed to save file {}: {}", inner.file_id, e);
                inner.events.emit(EditorEvent::save_failed(inner.file_id));
                SaveOutcome::Failed(e)
            }
        }
    }
}
