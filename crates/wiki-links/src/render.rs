//! Rewrites wiki links into standard markdown links.
//!
//! `[[Target]]` becomes `[Target](wikilink:Target)` and `[[Target|Display]]`
//! becomes `[Display](wikilink:Target)`. The target is percent-encoded so it
//! is always a valid link destination; [`parse_wikilink_href`] reverses it.

use crate::scan::find_links;
use crate::split_target;

/// URL scheme marking a rendered wiki link.
pub const WIKILINK_SCHEME: &str = "wikilink:";

/// Replace every wiki link outside of code with a `wikilink:` markdown link.
///
/// Everything else is copied through unchanged. The output contains no wiki
/// links, so applying this twice is the same as applying it once. For embeds
/// only the bracketed part is rewritten; the leading `!` stays.
pub fn process_wiki_links(content: &str) -> String {
    let links = find_links(content);
    if links.is_empty() {
        return content.to_string();
    }

    let mut out = String::with_capacity(content.len() + links.len() * 16);
    let mut last = 0;

    for link in links {
        let span = link.bracket_span();
        out.push_str(&content[last..span.start]);

        let (target, alias) = split_target(&content[link.inner]);
        out.push('[');
        push_escaped(&mut out, alias.unwrap_or(target));
        out.push_str("](");
        out.push_str(&wikilink_href(target));
        out.push(')');

        last = span.end;
    }

    out.push_str(&content[last..]);
    out
}

/// Build the href for a raw target: `wikilink:` + percent-encoded target.
pub fn wikilink_href(target: &str) -> String {
    format!("{}{}", WIKILINK_SCHEME, urlencoding::encode(target))
}

/// Recover the raw target from a `wikilink:` href.
///
/// Returns `None` for any other scheme or undecodable input.
pub fn parse_wikilink_href(href: &str) -> Option<String> {
    let encoded = href.strip_prefix(WIKILINK_SCHEME)?;
    urlencoding::decode(encoded).ok().map(|target| target.into_owned())
}

/// Link text escaping: brackets would end the text early, a trailing
/// backslash would swallow the closing bracket.
fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        if matches!(ch, '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
}
