//! Markup helpers: escaping, sanitising, previews and plain-text flattening.
//!
//! Every text source is normalised into an HTML fragment before rendering.
//! These helpers are pure `&str → String` functions so each can be tested on
//! its own.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;
use scraper::{ElementRef, Html};

/// Preview shown when a fragment has no heading, paragraph or image.
pub const EMPTY_PREVIEW: &str = "<p>(no preview)</p>";

/// Maximum number of block elements kept in a preview.
pub const PREVIEW_BLOCKS: usize = 3;

/// Escape the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

static RE_ACTIVE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(script|iframe|object|embed)").unwrap());

/// Neutralise script-like opening tags by escaping their `<`.
///
/// The tag text survives as visible characters; it just never becomes an
/// element when the fragment is parsed.
pub fn sanitize_html(html: &str) -> String {
    RE_ACTIVE_TAG.replace_all(html, "&lt;$1").into_owned()
}

/// Markdown → HTML with tables, strikethrough and task lists enabled.
pub fn markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(text, options);
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Plain text wrapped in a preformatted block.
pub fn text_to_pre_html(text: &str) -> String {
    format!("<pre>{}</pre>", escape_html(text))
}

/// Keep the first [`PREVIEW_BLOCKS`] top-level headings (h1–h3),
/// paragraphs and images of a fragment.
pub fn limit_preview(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let pieces: Vec<String> = fragment
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "h1" | "h2" | "h3" | "p" | "img"))
        .take(PREVIEW_BLOCKS)
        .map(|el| el.html())
        .collect();

    if pieces.is_empty() {
        EMPTY_PREVIEW.to_string()
    } else {
        pieces.concat()
    }
}

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Trim `text` and turn every whitespace run into a single space.
pub fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// All text content of a fragment with whitespace runs collapsed.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    collapse_whitespace(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(collapse_whitespace("  two\n\tcups   flour "), "two cups flour");
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn escape_covers_quotes() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom's & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom&#039;s &amp; Jerry&#039;s&lt;/a&gt;"
        );
    }

    #[test]
    fn sanitize_neutralises_scripts_any_case() {
        let out = sanitize_html("<p>ok</p><SCRIPT>alert(1)</SCRIPT><iframe src=x>");
        assert!(!out.contains("<SCRIPT"));
        assert!(!out.contains("<iframe"));
        assert!(out.contains("&lt;SCRIPT"));
        assert!(out.starts_with("<p>ok</p>"));
    }

    #[test]
    fn sanitized_script_never_becomes_an_element() {
        let html = sanitize_html("<script>alert(1)</script><p>Body</p>");
        let frag = Html::parse_fragment(&html);
        let names: Vec<_> = frag
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .map(|e| e.value().name().to_string())
            .collect();
        assert!(!names.iter().any(|n| n == "script"), "{names:?}");
    }

    #[test]
    fn markdown_produces_blocks() {
        let html = markdown_to_html("# Title\nBody text");
        assert!(html.contains("<h1>Title</h1>"), "{html}");
        assert!(html.contains("<p>Body text</p>"), "{html}");
    }

    #[test]
    fn preview_keeps_three_blocks() {
        let html = "<h1>A</h1><ul><li>skip</li></ul><p>B</p><h2>C</h2><p>D</p>";
        assert_eq!(limit_preview(html), "<h1>A</h1><p>B</p><h2>C</h2>");
    }

    #[test]
    fn preview_of_pre_block_is_placeholder() {
        assert_eq!(limit_preview(&text_to_pre_html("eggs")), EMPTY_PREVIEW);
        assert_eq!(limit_preview(""), EMPTY_PREVIEW);
    }

    #[test]
    fn text_is_flattened() {
        let html = "<h1>Title</h1>\n<p>Body\n   text</p>";
        assert_eq!(html_to_text(html), "Title Body text");
    }

    #[test]
    fn pre_block_escapes_content() {
        assert_eq!(text_to_pre_html("1 < 2"), "<pre>1 &lt; 2</pre>");
    }
}
