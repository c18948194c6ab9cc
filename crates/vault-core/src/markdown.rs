//! Plain-text helpers for note bodies and file names.

use serde::Serialize;

pub const WORDS_PER_MINUTE: usize = 200;

const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Counts shown in the editor status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStats {
    pub words: usize,
    pub characters: usize,
    pub lines: usize,
    pub reading_minutes: usize,
}

impl TextStats {
    pub fn of(content: &str) -> Self {
        let words = word_count(content);
        Self {
            words,
            characters: content.chars().count(),
            lines: line_count(content),
            reading_minutes: words.div_ceil(WORDS_PER_MINUTE),
        }
    }
}

/// Status-bar summary of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    #[serde(flatten)]
    pub text: TextStats,
    pub bytes: u64,
    /// `bytes` for display: "1.5 KB"
    pub size: String,
    /// Slug of the name without its `.md` extension
    pub slug: String,
}

impl FileStats {
    pub fn of(name: &str, content: &str) -> Self {
        let bytes = content.len() as u64;
        let stem = name.strip_suffix(".md").unwrap_or(name);
        Self {
            text: TextStats::of(content),
            bytes,
            size: format_file_size(bytes),
            slug: slugify(stem),
        }
    }
}

pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

/// Lines separated by `\n`; the empty string is one line.
pub fn line_count(content: &str) -> usize {
    content.split('\n').count()
}

/// Drop characters that are not allowed in file names, then trim.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !INVALID_FILENAME_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Lowercase ASCII slug: runs of anything else collapse to one `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Human-readable size using 1024-based units, up to two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
