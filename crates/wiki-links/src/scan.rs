//! Locates `[[...]]` spans in markdown, skipping fenced code blocks and inline
//! code spans.
//!
//! All delimiters are ASCII, so the scanner walks bytes and every index it
//! returns is a valid `char` boundary.

use std::ops::Range;

/// A `[[...]]` occurrence found in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkMatch {
    /// Whole link including brackets and a leading `!` for embeds
    pub span: Range<usize>,
    /// Text between `[[` and `]]`
    pub inner: Range<usize>,
    pub is_embed: bool,
}

impl LinkMatch {
    /// Span of the bracketed part only (without the embed `!`).
    pub fn bracket_span(&self) -> Range<usize> {
        let start = if self.is_embed {
            self.span.start + 1
        } else {
            self.span.start
        };
        start..self.span.end
    }
}

/// Find every wiki link outside of code.
///
/// A link is `[[`, one or more bytes other than `]` (newlines included), then
/// `]]`. When a candidate fails to close, scanning resumes one byte later, so
/// `[[[Note]]` yields a link whose inner text is `[Note`.
pub(crate) fn find_links(content: &str) -> Vec<LinkMatch> {
    let bytes = content.as_bytes();
    let code = code_ranges(content);
    let mut code = code.iter().peekable();
    let mut links = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        while code.peek().is_some_and(|r| r.end <= i) {
            code.next();
        }
        let code_start = match code.peek() {
            Some(r) if r.start <= i => {
                i = r.end;
                continue;
            }
            Some(r) => r.start,
            None => bytes.len(),
        };

        if bytes[i] == b'[' && bytes[i + 1] == b'[' {
            let inner_start = i + 2;
            let mut j = inner_start;
            while j < bytes.len() && bytes[j] != b']' {
                j += 1;
            }
            let closed = j + 1 < bytes.len() && bytes[j] == b']' && bytes[j + 1] == b']';
            if closed && j > inner_start && j + 2 <= code_start {
                let is_embed = i > 0 && bytes[i - 1] == b'!';
                let start = if is_embed { i - 1 } else { i };
                links.push(LinkMatch {
                    span: start..j + 2,
                    inner: inner_start..j,
                    is_embed,
                });
                i = j + 2;
                continue;
            }
        }
        i += 1;
    }

    links
}

/// Byte ranges covered by fenced code blocks and inline code spans, in order.
pub(crate) fn code_ranges(content: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    // (fence byte, fence length, block start)
    let mut fence: Option<(u8, usize, usize)> = None;
    let mut prose_start = 0;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        match fence {
            Some((ch, len, start)) => {
                if closes_fence(line, ch, len) {
                    ranges.push(start..offset);
                    fence = None;
                    prose_start = offset;
                }
            }
            None => {
                if let Some((ch, len)) = opens_fence(line) {
                    inline_code_ranges(content, prose_start..line_start, &mut ranges);
                    fence = Some((ch, len, line_start));
                }
            }
        }
    }

    match fence {
        // Unterminated fences run to the end of the document
        Some((_, _, start)) => ranges.push(start..content.len()),
        None => inline_code_ranges(content, prose_start..content.len(), &mut ranges),
    }

    ranges
}

fn fence_indent(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches(' ');
    (line.len() - rest.len() <= 3).then_some(rest)
}

fn opens_fence(line: &str) -> Option<(u8, usize)> {
    let rest = fence_indent(line)?;
    let ch = *rest.as_bytes().first()?;
    if ch != b'`' && ch != b'~' {
        return None;
    }
    let len = rest.bytes().take_while(|&b| b == ch).count();
    if len < 3 {
        return None;
    }
    // Backtick fences may not carry backticks in their info string
    if ch == b'`' && rest[len..].contains('`') {
        return None;
    }
    Some((ch, len))
}

fn closes_fence(line: &str, ch: u8, len: usize) -> bool {
    let Some(rest) = fence_indent(line) else {
        return false;
    };
    let run = rest.bytes().take_while(|&b| b == ch).count();
    run >= len && rest[run..].trim().is_empty()
}

/// Inline code: a backtick run closed by the next run of the same length.
/// An unmatched run is literal text.
fn inline_code_ranges(content: &str, region: Range<usize>, out: &mut Vec<Range<usize>>) {
    let bytes = content.as_bytes();
    let mut i = region.start;

    while i < region.end {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let open = i;
        while i < region.end && bytes[i] == b'`' {
            i += 1;
        }
        let run = i - open;

        let mut j = i;
        while j < region.end {
            if bytes[j] != b'`' {
                j += 1;
                continue;
            }
            let close = j;
            while j < region.end && bytes[j] == b'`' {
                j += 1;
            }
            if j - close == run {
                out.push(open..j);
                i = j;
                break;
            }
        }
    }
}
