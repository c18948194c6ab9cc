//! Parser, renderer and resolver for Obsidian-style wiki links
//!
//! Supports:
//! - Basic links: `[[Note]]`
//! - Aliases: `[[Note|Display Text]]`
//! - Headers: `[[Note#Header]]`
//! - Block references: `[[Note#^block-id]]`
//! - Embeds: `![[Note]]`
//! - Paths: `[[folder/Note]]`
//!
//! Links inside fenced code blocks and inline code spans are ignored.

mod render;
mod resolve;
mod scan;

pub use render::{parse_wikilink_href, process_wiki_links, wikilink_href, WIKILINK_SCHEME};
pub use resolve::{resolve_link, LinkCandidate, MatchKind, Resolution};

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A parsed wiki link from markdown content.
///
/// Field naming follows Rust's `std::path::Path` conventions where applicable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiLink {
    /// Raw text before the `|`, exactly as written: "folder/Note.md#Header"
    pub target: String,
    /// The note name without path or extension: "Note" (like `Path::file_stem()`)
    pub name: String,
    /// The parent directory path: "private/knowledge" or None for root (like `Path::parent()`)
    pub parent: Option<String>,
    /// File extension without the dot: "md" or None (like `Path::extension()`)
    pub extension: Option<String>,
    /// Header reference if present: "Header Section"
    pub header: Option<String>,
    /// Block ID if present: "block-123"
    pub block_id: Option<String>,
    /// Display alias if present and non-empty: "my custom text"
    pub alias: Option<String>,
    /// Whether this is an embed (`![[...]]`)
    pub is_embed: bool,
    /// Byte range of the whole link in the source, including `!` for embeds
    pub span: Range<usize>,
}

impl WikiLink {
    /// Returns the file name with extension if present: "Note.md" or "Note"
    pub fn file_name(&self) -> String {
        match &self.extension {
            Some(ext) => format!("{}.{}", self.name, ext),
            None => self.name.clone(),
        }
    }

    /// Returns the full path without fragment: "private/knowledge/Note.md"
    pub fn path(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}/{}", parent, self.file_name()),
            None => self.file_name(),
        }
    }

    /// Returns alias if present, otherwise the raw target
    pub fn display_text(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.target)
    }
}

/// Parse all wiki links from markdown content
pub fn parse_wiki_links(content: &str) -> Vec<WikiLink> {
    scan::find_links(content)
        .into_iter()
        .map(|m| parse_link_content(&content[m.inner.clone()], m.is_embed, m.span))
        .collect()
}

/// Raw targets of every wiki link, in document order (duplicates kept)
pub fn extract_wiki_links(content: &str) -> Vec<String> {
    scan::find_links(content)
        .into_iter()
        .map(|m| split_target(&content[m.inner]).0.to_string())
        .collect()
}

/// Extract all unique note names from wiki links in content
pub fn extract_linked_notes(content: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    parse_wiki_links(content)
        .into_iter()
        .filter(|link| seen.insert(link.name.clone()))
        .map(|link| link.name)
        .collect()
}

/// Split inner link text on `|` into (target, alias): the first field is the
/// target, the second the alias, later fields are dropped.
/// An empty alias counts as no alias.
pub(crate) fn split_target(inner: &str) -> (&str, Option<&str>) {
    let mut fields = inner.split('|');
    let target = fields.next().unwrap_or(inner);
    let alias = fields.next().filter(|alias| !alias.is_empty());
    (target, alias)
}

/// Parse the content inside [[ ]] into a WikiLink
fn parse_link_content(content: &str, is_embed: bool, span: Range<usize>) -> WikiLink {
    let (target, alias) = split_target(content);
    let (path_part, header, block_id) = parse_fragment(target);
    let (parent, name, extension) = parse_path(path_part);

    WikiLink {
        target: target.to_string(),
        name,
        parent,
        extension,
        header,
        block_id,
        alias: alias.map(str::to_string),
        is_embed,
        span,
    }
}

/// Split a target into its path and any fragment (header or block reference).
/// Returns (path_part, header, block_id)
pub(crate) fn parse_fragment(target: &str) -> (&str, Option<String>, Option<String>) {
    if let Some(block_pos) = target.find("#^") {
        let block_id = &target[block_pos + 2..];
        return (&target[..block_pos], None, Some(block_id.to_string()));
    }

    if let Some(header_pos) = target.find('#') {
        let header = &target[header_pos + 1..];
        return (&target[..header_pos], Some(header.to_string()), None);
    }

    (target, None, None)
}

/// Parse a path string into parent, name, and extension
fn parse_path(path: &str) -> (Option<String>, String, Option<String>) {
    let path = path.trim();

    let (parent, file_name) = match path.rfind('/') {
        Some(slash_pos) => (Some(path[..slash_pos].to_string()), &path[slash_pos + 1..]),
        None => (None, path),
    };

    // Split at the last dot; a leading dot is part of the name
    match file_name.rfind('.') {
        Some(dot_pos) if dot_pos > 0 => (
            parent,
            file_name[..dot_pos].to_string(),
            Some(file_name[dot_pos + 1..].to_string()),
        ),
        _ => (parent, file_name.to_string(), None),
    }
}
