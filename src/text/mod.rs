//! HTML-to-text normalization for downloaded text files.
//!
//! Some catalog "text" files are actually HTML-wrapped. When the caller
//! opts in, downloaded text content is sniffed and, if it is HTML,
//! converted to plain text. Two conversion tiers exist:
//!
//! - [`HtmlToTextConverter::structured`]: full DOM parse; `script` and
//!   `style` subtrees are dropped entirely (tags and their text), block
//!   elements emit line breaks.
//! - [`HtmlToTextConverter::tag_stripping`]: regex-based fallback with a
//!   weaker guarantee on malformed HTML; it still removes `script`/`style`
//!   bodies before stripping the remaining tags.
//!
//! The variant is chosen at construction time; callers never branch on
//! capability themselves.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node};
use tracing::{debug, trace};

/// How far into the content the HTML sniff looks.
const SNIFF_WINDOW: usize = 1024;

/// Markers that identify HTML content (matched case-insensitively near the
/// start of the content).
const HTML_MARKERS: [&str; 3] = ["<!doctype", "<html", "<body"];

/// Elements whose entire subtree (including text) is dropped.
const DROPPED_ELEMENTS: [&str; 2] = ["script", "style"];

/// Elements that terminate a line of output text.
const BLOCK_ELEMENTS: [&str; 17] = [
    "p", "div", "br", "li", "ul", "ol", "table", "tr", "h1", "h2", "h3", "h4", "h5", "h6",
    "blockquote", "pre", "section",
];

#[allow(clippy::expect_used)]
static SCRIPT_STYLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // (?is): case-insensitive, dot matches newlines - bodies span lines.
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>")
        .expect("script/style regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static BLOCK_TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(p|div|br|li|ul|ol|table|tr|h[1-6]|blockquote|pre|section)\b[^>]*>")
        .expect("block tag regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static ANY_TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex is valid")); // Static pattern, safe to panic

/// Converts HTML-wrapped content to plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlToTextConverter {
    /// DOM-based conversion (preferred).
    Structured,
    /// Regex-based conversion (fallback tier).
    TagStripping,
}

impl HtmlToTextConverter {
    /// Creates the structured (DOM) converter.
    #[must_use]
    pub fn structured() -> Self {
        Self::Structured
    }

    /// Creates the tag-stripping fallback converter.
    #[must_use]
    pub fn tag_stripping() -> Self {
        Self::TagStripping
    }

    /// Normalizes content if it is HTML; passes everything else through
    /// unchanged.
    ///
    /// Detection looks for a doctype/`<html>`/`<body>` marker within the
    /// first [`SNIFF_WINDOW`] bytes, case-insensitively.
    #[must_use]
    pub fn normalize_if_html<'a>(&self, content: &'a [u8]) -> Cow<'a, [u8]> {
        if !looks_like_html(content) {
            trace!("content is not HTML, passing through");
            return Cow::Borrowed(content);
        }

        let html = String::from_utf8_lossy(content);
        let text = self.convert(&html);
        debug!(
            html_bytes = content.len(),
            text_bytes = text.len(),
            "normalized HTML content to plain text"
        );
        Cow::Owned(text.into_bytes())
    }

    /// Converts an HTML string to plain text.
    #[must_use]
    pub fn convert(&self, html: &str) -> String {
        match self {
            Self::Structured => dom_to_text(html),
            Self::TagStripping => strip_tags(html),
        }
    }
}

/// Returns true when the content starts like an HTML document.
#[must_use]
pub fn looks_like_html(content: &[u8]) -> bool {
    let window = &content[..content.len().min(SNIFF_WINDOW)];
    let head = String::from_utf8_lossy(window).to_lowercase();
    HTML_MARKERS.iter().any(|marker| head.contains(marker))
}

/// DOM walk: text nodes concatenated, dropped subtrees skipped, block
/// elements delimited by newlines. Entity decoding is handled by the
/// parser itself.
fn dom_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    collect_text(document.root_element(), &mut out);
    collapse_blank_lines(&out)
}

fn collect_text(element: scraper::ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if DROPPED_ELEMENTS.contains(&name) {
        return;
    }

    let block = BLOCK_ELEMENTS.contains(&name);
    if block && !out.ends_with('\n') {
        out.push('\n');
    }
    for child in element.children() {
        if let Some(child_element) = scraper::ElementRef::wrap(child) {
            collect_text(child_element, out);
        } else if let Node::Text(text) = child.value() {
            out.push_str(text);
        }
        // Comments, doctypes and processing instructions contribute nothing.
    }
    if block && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Regex fallback: remove script/style bodies, turn block tags into line
/// breaks, strip the rest, decode the common entities.
fn strip_tags(html: &str) -> String {
    let without_scripts = SCRIPT_STYLE_PATTERN.replace_all(html, "");
    let with_breaks = BLOCK_TAG_PATTERN.replace_all(&without_scripts, "\n");
    let stripped = ANY_TAG_PATTERN.replace_all(&with_breaks, "");
    let decoded = decode_basic_entities(&stripped);
    collapse_blank_lines(&decoded)
}

fn decode_basic_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Trims each line and drops blank ones; tag boundaries produce plenty of
/// stray newlines that would otherwise litter the output.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(trimmed);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str =
        "<html><body><script>var x = 1;</script><p>Hi</p><style>p{color:red}</style></body></html>";

    fn both() -> [HtmlToTextConverter; 2] {
        [
            HtmlToTextConverter::structured(),
            HtmlToTextConverter::tag_stripping(),
        ]
    }

    // ==================== Detection ====================

    #[test]
    fn test_detects_doctype() {
        assert!(looks_like_html(b"<!DOCTYPE html><html></html>"));
    }

    #[test]
    fn test_detects_html_tag_case_insensitive() {
        assert!(looks_like_html(b"  \n<HTML><head></head>"));
    }

    #[test]
    fn test_detects_bare_body() {
        assert!(looks_like_html(b"<body>text</body>"));
    }

    #[test]
    fn test_plain_text_not_detected() {
        assert!(!looks_like_html(b"Chapter 1\n\nIt was the best of times."));
    }

    #[test]
    fn test_marker_beyond_window_not_detected() {
        let mut content = vec![b' '; 2048];
        content.extend_from_slice(b"<html>");
        assert!(!looks_like_html(&content));
    }

    // ==================== Pass-through ====================

    #[test]
    fn test_non_html_passes_through_unchanged() {
        let content = b"The quick brown fox. <not html";
        for converter in both() {
            let out = converter.normalize_if_html(content);
            assert_eq!(out.as_ref(), content);
            assert!(matches!(out, Cow::Borrowed(_)));
        }
    }

    // ==================== Conversion ====================

    #[test]
    fn test_strips_script_and_style_bodies() {
        for converter in both() {
            let out = converter.convert(SAMPLE);
            assert!(out.contains("Hi"), "{converter:?}: {out}");
            assert!(!out.contains("script"), "{converter:?}: {out}");
            assert!(!out.contains("var x"), "{converter:?}: {out}");
            assert!(!out.contains("color"), "{converter:?}: {out}");
            assert!(!out.contains('<'), "{converter:?}: {out}");
        }
    }

    #[test]
    fn test_block_elements_produce_line_breaks() {
        let html = "<html><body><p>one</p><p>two</p><div>three</div></body></html>";
        for converter in both() {
            let out = converter.convert(html);
            let lines: Vec<_> = out.lines().collect();
            assert_eq!(lines, vec!["one", "two", "three"], "{converter:?}");
        }
    }

    #[test]
    fn test_inline_elements_do_not_break_lines() {
        let html = "<html><body><p>one <b>bold</b> word</p></body></html>";
        let out = HtmlToTextConverter::structured().convert(html);
        assert_eq!(out, "one bold word");
    }

    #[test]
    fn test_normalize_if_html_converts() {
        for converter in both() {
            let out = converter.normalize_if_html(SAMPLE.as_bytes());
            let text = String::from_utf8(out.into_owned()).unwrap();
            assert!(text.contains("Hi"));
            assert!(!text.contains("script"));
        }
    }

    #[test]
    fn test_fallback_decodes_basic_entities() {
        let html = "<html><body><p>Tom &amp; Jerry &lt;3</p></body></html>";
        let out = HtmlToTextConverter::tag_stripping().convert(html);
        assert!(out.contains("Tom & Jerry <3"), "out: {out}");
    }

    #[test]
    fn test_structured_handles_malformed_html() {
        // Unclosed tags should not panic or lose the visible text.
        let html = "<html><body><p>open <div>nested";
        let out = HtmlToTextConverter::structured().convert(html);
        assert!(out.contains("open"));
        assert!(out.contains("nested"));
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb\n"), "a\nb");
        assert_eq!(collapse_blank_lines("  padded  \n"), "padded");
        assert_eq!(collapse_blank_lines(""), "");
    }
}
