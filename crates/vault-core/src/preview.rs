//! Preview rendering: wiki links rewritten, then markdown to HTML.
//!
//! Rewritten links carry a `wikilink:` destination. Those become anchors the
//! editor intercepts instead of navigating:
//! `<a href="#" class="wikilink" data-target="Another Note">…</a>`.
//!
//! Raw HTML in a note is rendered as escaped text, never as markup.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};
use serde::Serialize;
use wiki_links::{parse_wikilink_href, process_wiki_links};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    /// Markdown with wiki links rewritten
    pub markdown: String,
    pub html: String,
}

impl Preview {
    pub fn of(raw: &str) -> Self {
        let markdown = process_wiki_links(raw);
        let html = markdown_to_html(&markdown);
        Self { markdown, html }
    }
}

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Render markdown whose wiki links were already rewritten.
pub fn markdown_to_html(markdown: &str) -> String {
    // One entry per open link or image: whether it was a wiki link
    let mut open: Vec<bool> = Vec::new();

    let events = Parser::new_ext(markdown, options()).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link { ref dest_url, .. }) => match parse_wikilink_href(dest_url) {
            Some(target) => {
                open.push(true);
                wiki_anchor(&target, false)
            }
            None => {
                open.push(false);
                event
            }
        },
        Event::Start(Tag::Image { ref dest_url, .. }) => match parse_wikilink_href(dest_url) {
            Some(target) => {
                open.push(true);
                wiki_anchor(&target, true)
            }
            None => {
                open.push(false);
                event
            }
        },
        Event::End(TagEnd::Link | TagEnd::Image) if open.pop() == Some(true) => {
            Event::InlineHtml(CowStr::Borrowed("</a>"))
        }
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

fn wiki_anchor(target: &str, embed: bool) -> Event<'static> {
    let class = if embed { "wikilink embed" } else { "wikilink" };
    Event::InlineHtml(CowStr::from(format!(
        r##"<a href="#" class="{}" data-target="{}">"##,
        class,
        escape_attr(target)
    )))
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_html(raw: &str) -> String {
        Preview::of(raw).html
    }

    #[test]
    fn wiki_links_become_anchors() {
        let html = render_html("See [[Another Note|the other one]].");
        assert_eq!(
            html,
            "<p>See <a href=\"#\" class=\"wikilink\" data-target=\"Another Note\">the other one</a>.</p>\n"
        );
    }

    #[test]
    fn regular_links_are_untouched() {
        let html = render_html("[site](https://example.com) and [[Welcome]]");
        assert!(html.contains("<a href=\"https://example.com\">site</a>"));
        assert!(html.contains("data-target=\"Welcome\">Welcome</a>"));
    }

    #[test]
    fn embeds_render_as_embed_anchors() {
        let html = render_html("![[pic.png]]");
        assert_eq!(
            html,
            "<p><a href=\"#\" class=\"wikilink embed\" data-target=\"pic.png\">pic.png</a></p>\n"
        );
    }

    #[test]
    fn target_is_attribute_escaped() {
        let html = render_html(r#"[[say "hi" & <bye>]]"#);
        assert!(html.contains(r#"data-target="say &quot;hi&quot; &amp; &lt;bye&gt;""#));
        assert!(html.contains("&lt;bye&gt;</a>"));
        assert!(!html.contains("<bye>"));
    }

    #[test]
    fn inline_html_is_escaped() {
        let html = render_html("hi <script>alert(1)</script> [[A|<img src=x onerror=alert(2)>]]");
        assert!(!html.contains("<script>"), "{html}");
        assert!(!html.contains("<img"), "{html}");
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"), "{html}");
        assert!(html.contains("data-target=\"A\">&lt;img src=x onerror=alert(2)&gt;</a>"), "{html}");
    }

    #[test]
    fn html_blocks_are_escaped() {
        let html = render_html("<div onclick=\"steal()\">\nboo\n</div>\n\nafter [[Welcome]]");
        assert!(!html.contains("<div"), "{html}");
        assert!(html.contains("&lt;div"), "{html}");
        assert!(html.contains("class=\"wikilink\" data-target=\"Welcome\""), "{html}");
    }

    #[test]
    fn code_keeps_brackets() {
        let html = render_html("```\n[[x]]\n```\n");
        assert!(html.contains("[[x]]"));
        assert!(!html.contains("wikilink"));
    }

    #[test]
    fn task_lists_and_tables_render() {
        let html = render_html("- [ ] todo\n- [x] done\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains("<table>"));
    }

    #[test]
    fn preview_keeps_both_forms() {
        let preview = Preview::of("[[Welcome]]");
        assert_eq!(preview.markdown, "[Welcome](wikilink:Welcome)");
        assert!(preview.html.contains("class=\"wikilink\""));
    }
}
