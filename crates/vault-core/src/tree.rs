//! Builds the explorer tree from the flat parent-id list.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{FileId, NoteFile};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Folder cycle detected through files {0:?}")]
    Cycle(Vec<FileId>),
}

/// A file in the explorer tree. Content is left out; fetch it per file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: FileId,
    pub name: String,
    pub path: String,
    pub is_folder: bool,
    pub children: Vec<TreeNode>,
}

/// Build the tree for one vault's files.
///
/// Roots are files without a parent, plus files whose parent is not in
/// `files`, which is logged as a broken link. Children are ordered folders
/// first, then by case-insensitive name. A parent chain that loops back on
/// itself is an error.
pub fn build_tree(files: &[NoteFile]) -> Result<Vec<TreeNode>, TreeError> {
    assemble(files, true)
}

/// Explorer search: the tree of files whose name contains `query`.
///
/// Hits inside folders that did not match are listed at the root.
pub fn search_tree(files: &[NoteFile], query: &str) -> Result<Vec<TreeNode>, TreeError> {
    assemble(&filter_by_name(files, query), false)
}

fn assemble(files: &[NoteFile], complete: bool) -> Result<Vec<TreeNode>, TreeError> {
    let by_id: HashMap<FileId, &NoteFile> = files.iter().map(|f| (f.id, f)).collect();
    let mut children: HashMap<FileId, Vec<&NoteFile>> = HashMap::new();
    let mut roots = Vec::new();

    for file in files {
        match file.parent_id {
            Some(parent) if by_id.contains_key(&parent) => {
                children.entry(parent).or_default().push(file)
            }
            Some(parent) => {
                if complete {
                    warn!(
                        "File {} ({}) has missing parent {}; listing at root",
                        file.id, file.path, parent
                    );
                } else {
                    debug!("Listing {} at root; parent {} filtered out", file.path, parent);
                }
                roots.push(file);
            }
            None => roots.push(file),
        }
    }

    let mut visited = HashSet::new();
    let nodes = build_level(roots, &children, &mut visited);

    // Every file reachable from a root has been visited; the rest sit on, or
    // hang below, a parent cycle.
    if let Some(stray) = files.iter().find(|f| !visited.contains(&f.id)) {
        return Err(TreeError::Cycle(find_cycle(stray.id, &by_id)));
    }

    Ok(nodes)
}

fn build_level(
    mut level: Vec<&NoteFile>,
    children: &HashMap<FileId, Vec<&NoteFile>>,
    visited: &mut HashSet<FileId>,
) -> Vec<TreeNode> {
    sort_entries(&mut level);
    level
        .into_iter()
        .map(|file| {
            visited.insert(file.id);
            let kids = children.get(&file.id).cloned().unwrap_or_default();
            TreeNode {
                id: file.id,
                name: file.name.clone(),
                path: file.path.clone(),
                is_folder: file.is_folder,
                children: build_level(kids, children, visited),
            }
        })
        .collect()
}

fn sort_entries(files: &mut [&NoteFile]) {
    files.sort_by(|a, b| {
        b.is_folder
            .cmp(&a.is_folder)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Walk parent links from `start` until an id repeats; return the loop.
fn find_cycle(start: FileId, by_id: &HashMap<FileId, &NoteFile>) -> Vec<FileId> {
    let mut order = Vec::new();
    let mut seen = HashMap::new();
    let mut current = Some(start);

    while let Some(id) = current {
        if let Some(&pos) = seen.get(&id) {
            return order[pos..].to_vec();
        }
        seen.insert(id, order.len());
        order.push(id);
        current = by_id.get(&id).and_then(|f| f.parent_id);
    }

    // Unreachable for files left over by build_tree; report the chain anyway
    order
}

/// Whether re-parenting `file` under `new_parent` would close a loop.
///
/// `parent_of` looks up the current parent of any file id.
pub fn creates_cycle(
    parent_of: impl Fn(FileId) -> Option<FileId>,
    file: FileId,
    new_parent: FileId,
) -> bool {
    let mut seen = HashSet::new();
    let mut current = Some(new_parent);
    while let Some(id) = current {
        if id == file {
            return true;
        }
        if !seen.insert(id) {
            // Pre-existing loop that does not involve `file`
            return false;
        }
        current = parent_of(id);
    }
    false
}

/// Slice form of [`creates_cycle`].
pub fn would_create_cycle(files: &[NoteFile], file: FileId, new_parent: FileId) -> bool {
    let parents: HashMap<FileId, Option<FileId>> =
        files.iter().map(|f| (f.id, f.parent_id)).collect();
    creates_cycle(|id| parents.get(&id).copied().flatten(), file, new_parent)
}

/// Explorer search: files whose name contains `query`, ignoring case.
pub fn filter_by_name(files: &[NoteFile], query: &str) -> Vec<NoteFile> {
    let query = query.to_lowercase();
    files
        .iter()
        .filter(|f| f.name.to_lowercase().contains(&query))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Warnings logged while running `f`.
    fn warnings_during(f: impl FnOnce()) -> String {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn entry(id: FileId, name: &str, is_folder: bool, parent_id: Option<FileId>) -> NoteFile {
        NoteFile {
            id,
            vault_id: 1,
            name: name.to_string(),
            path: format!("/{}", name),
            content: String::new(),
            drive_file_id: None,
            is_folder,
            parent_id,
            last_modified: Utc::now(),
        }
    }

    fn names(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn nests_children_under_folders() {
        let files = vec![
            entry(1, "Welcome.md", false, None),
            entry(2, "Notes", true, None),
            entry(3, "Daily.md", false, Some(2)),
        ];
        let tree = build_tree(&files).unwrap();

        assert_eq!(names(&tree), vec!["Notes", "Welcome.md"]);
        assert_eq!(names(&tree[0].children), vec!["Daily.md"]);
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn orders_folders_first_then_name() {
        let files = vec![
            entry(1, "b.md", false, None),
            entry(2, "Zeta", true, None),
            entry(3, "A.md", false, None),
            entry(4, "alpha", true, None),
        ];
        let tree = build_tree(&files).unwrap();
        assert_eq!(names(&tree), vec!["alpha", "Zeta", "A.md", "b.md"]);
    }

    #[test]
    fn orphans_become_roots() {
        let files = vec![entry(3, "Daily.md", false, Some(99))];
        let logs = warnings_during(|| {
            let tree = build_tree(&files).unwrap();
            assert_eq!(names(&tree), vec!["Daily.md"]);
        });
        assert!(logs.contains("missing parent 99"), "{logs}");
    }

    #[test]
    fn search_lists_nested_hits_at_root_quietly() {
        let files = vec![
            entry(1, "Welcome.md", false, None),
            entry(2, "Notes", true, None),
            entry(3, "Daily Note.md", false, Some(2)),
            entry(4, "Another Note.md", false, None),
        ];
        let logs = warnings_during(|| {
            let tree = search_tree(&files, "DAILY").unwrap();
            assert_eq!(names(&tree), vec!["Daily Note.md"]);
            assert!(tree[0].children.is_empty());
        });
        assert!(logs.is_empty(), "{logs}");
    }

    #[test]
    fn detects_cycles() {
        let files = vec![
            entry(1, "Root.md", false, None),
            entry(2, "A", true, Some(3)),
            entry(3, "B", true, Some(2)),
            entry(4, "Under.md", false, Some(3)),
        ];
        let err = build_tree(&files).unwrap_err();
        let TreeError::Cycle(mut ids) = err;
        ids.sort();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn detects_self_parent() {
        let files = vec![entry(5, "Loop", true, Some(5))];
        assert_eq!(build_tree(&files), Err(TreeError::Cycle(vec![5])));
    }

    #[test]
    fn cycle_check_for_reparenting() {
        let files = vec![
            entry(1, "A", true, None),
            entry(2, "B", true, Some(1)),
            entry(3, "C", true, Some(2)),
        ];
        assert!(would_create_cycle(&files, 1, 3));
        assert!(would_create_cycle(&files, 2, 2));
        assert!(!would_create_cycle(&files, 3, 1));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let files = vec![
            entry(1, "Welcome.md", false, None),
            entry(2, "Another Note.md", false, None),
        ];
        let hits = filter_by_name(&files, "NOTE");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }
}
