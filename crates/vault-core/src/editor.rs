//! One open note: buffer, preview and autosave together.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, warn};
use wiki_links::{parse_wikilink_href, resolve_link};

use crate::autosave::{AutoSaveConfig, AutoSaver, NoteSink, SaveOutcome, SaveStatus};
use crate::events::EventBus;
use crate::markdown::TextStats;
use crate::model::{FileId, NoteFile};
use crate::preview::Preview;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("{0} is a folder and cannot be edited")]
    NotEditable(String),
}

pub struct EditorSession {
    file_id: FileId,
    name: String,
    path: String,
    saver: AutoSaver,
    /// Rendered preview of the current buffer, dropped on every edit
    preview: Mutex<Option<Preview>>,
}

impl EditorSession {
    pub fn open(
        file: &NoteFile,
        sink: Arc<dyn NoteSink>,
        config: AutoSaveConfig,
        events: Arc<EventBus>,
    ) -> Result<Self, EditorError> {
        if file.is_folder {
            return Err(EditorError::NotEditable(file.path.clone()));
        }
        debug!("Opening {} for editing", file.path);
        Ok(Self {
            file_id: file.id,
            name: file.name.clone(),
            path: file.path.clone(),
            saver: AutoSaver::new(file.id, file.content.clone(), sink, config, events),
            preview: Mutex::new(None),
        })
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> String {
        self.saver.content()
    }

    pub fn set_content(&self, content: impl Into<String>) {
        self.saver.on_change(content.into());
        *self.cached() = None;
    }

    pub fn preview(&self) -> Preview {
        let mut cached = self.cached();
        cached
            .get_or_insert_with(|| Preview::of(&self.saver.content()))
            .clone()
    }

    /// Markdown with wiki links rewritten to `wikilink:` links.
    pub fn preview_markdown(&self) -> String {
        self.preview().markdown
    }

    pub fn preview_html(&self) -> String {
        self.preview().html
    }

    /// Resolve a clicked preview link against the vault's files.
    ///
    /// A miss is logged and yields `None`; the editor stays where it is.
    pub fn follow_link<'a>(&self, href: &str, files: &'a [NoteFile]) -> Option<&'a NoteFile> {
        let Some(target) = parse_wikilink_href(href) else {
            debug!("Ignoring non-wiki link {}", href);
            return None;
        };
        match resolve_link(&target, files) {
            Some(resolution) => {
                debug!(
                    "Link {:?} in {} resolved to {} ({:?})",
                    target, self.path, resolution.candidate.path, resolution.kind
                );
                Some(resolution.candidate)
            }
            None => {
                warn!("Link {:?} in {} matches no file", target, self.path);
                None
            }
        }
    }

    pub fn stats(&self) -> TextStats {
        TextStats::of(&self.saver.content())
    }

    pub async fn save(&self) -> SaveOutcome {
        self.saver.save().await
    }

    /// Call before the editor goes away.
    pub async fn flush(&self) -> SaveOutcome {
        self.saver.flush().await
    }

    pub fn status(&self) -> SaveStatus {
        self.saver.status()
    }

    fn cached(&self) -> MutexGuard<'_, Option<Preview>> {
        self.preview.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosave::SinkError;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::time::Duration;

    #[derive(Default)]
    struct MemorySink {
        saved: Mutex<Vec<(FileId, String)>>,
    }

    #[async_trait]
    impl NoteSink for MemorySink {
        async fn persist(
            &self,
            file_id: FileId,
            content: &str,
        ) -> Result<DateTime<Utc>, SinkError> {
            self.saved
                .lock()
                .unwrap()
                .push((file_id, content.to_string()));
            Ok(Utc::now())
        }
    }

    fn file(id: FileId, name: &str, path: &str, is_folder: bool) -> NoteFile {
        NoteFile {
            id,
            vault_id: 1,
            name: name.into(),
            path: path.into(),
            content: format!("# {name}"),
            drive_file_id: None,
            is_folder,
            parent_id: None,
            last_modified: Utc::now(),
        }
    }

    fn open(file: &NoteFile, sink: &Arc<MemorySink>) -> EditorSession {
        EditorSession::open(
            file,
            sink.clone(),
            AutoSaveConfig::default(),
            Arc::new(EventBus::new()),
        )
        .unwrap()
    }

    #[test]
    fn folders_cannot_be_opened() {
        let folder = file(1, "Notes", "/Notes", true);
        let result = EditorSession::open(
            &folder,
            Arc::new(MemorySink::default()),
            AutoSaveConfig::default(),
            Arc::new(EventBus::new()),
        );
        assert!(matches!(result, Err(EditorError::NotEditable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn edits_refresh_preview_and_autosave() {
        let sink = Arc::new(MemorySink::default());
        let note = file(1, "Welcome.md", "/Welcome.md", false);
        let session = open(&note, &sink);

        assert_eq!(session.preview_markdown(), "# Welcome.md");
        session.set_content("Go to [[Another Note]]");
        assert_eq!(
            session.preview_markdown(),
            "Go to [Another Note](wikilink:Another%20Note)"
        );
        assert!(session.preview_html().contains("data-target=\"Another Note\""));
        assert!(session.status().has_unsaved_changes);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(
            sink.saved.lock().unwrap().clone(),
            vec![(1, "Go to [[Another Note]]".to_string())]
        );
        assert!(!session.status().has_unsaved_changes);
    }

    #[tokio::test]
    async fn flush_saves_pending_edit() {
        let sink = Arc::new(MemorySink::default());
        let note = file(4, "Daily Note.md", "/Notes/Daily Note.md", false);
        let session = open(&note, &sink);

        session.set_content("unsaved");
        assert!(matches!(session.flush().await, SaveOutcome::Saved(_)));
        assert_eq!(sink.saved.lock().unwrap().len(), 1);
    }

    #[test]
    fn follow_link_resolves_or_stays() {
        let sink = Arc::new(MemorySink::default());
        let files = vec![
            file(1, "Welcome.md", "/Welcome.md", false),
            file(2, "Notes", "/Notes", true),
            file(3, "Daily Note.md", "/Notes/Daily Note.md", false),
        ];
        let session = open(&files[0], &sink);

        let hit = session.follow_link("wikilink:Daily%20Note", &files);
        assert_eq!(hit.map(|f| f.id), Some(3));
        assert!(session.follow_link("wikilink:Missing", &files).is_none());
        assert!(session.follow_link("https://example.com", &files).is_none());
        assert!(session.follow_link("wikilink:Notes", &files).is_none());
    }

    #[test]
    fn stats_track_the_buffer() {
        let sink = Arc::new(MemorySink::default());
        let note = file(1, "A.md", "/A.md", false);
        let session = open(&note, &sink);
        assert_eq!(session.stats().words, 2);
    }
}
