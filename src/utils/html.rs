//! HTML text helpers used by the markup engine and the entry document.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

const ESCAPE_CHARS: [char; 4] = ['&', '<', '>', '"'];

/// Escape text or attribute content. Borrows when nothing needs escaping.
pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(ESCAPE_CHARS) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());
static PRESERVED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(pre|textarea|script|style)\b.*?</(pre|textarea|script|style)>").unwrap());

/// Remove `<!-- ... -->` comments.
pub fn strip_comments(html: &str) -> String {
    COMMENT.replace_all(html, "").into_owned()
}

/// Collapse whitespace between and inside tags.
///
/// `pre`, `textarea`, `script` and `style` bodies are left untouched.
pub fn collapse_whitespace(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for m in PRESERVED.find_iter(html) {
        out.push_str(&collapse_segment(&html[last..m.start()]));
        out.push_str(m.as_str());
        last = m.end();
    }
    out.push_str(&collapse_segment(&html[last..]));
    out.trim().to_string()
}

fn collapse_segment(segment: &str) -> String {
    let tight = BETWEEN_TAGS.replace_all(segment, "><");
    let mut out: &str = &tight;
    // Segments border tags on both sides of a preserved block.
    if out.trim_end().ends_with('>') {
        out = out.trim_end();
    }
    if out.trim_start().starts_with('<') {
        out = out.trim_start();
    }
    WHITESPACE_RUN.replace_all(out, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>&\""), "&lt;b&gt;&amp;&quot;");
        assert!(matches!(escape("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_comments() {
        let html = "<p>a</p><!-- note\n spans --><p>b</p>";
        assert_eq!(strip_comments(html), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_collapse_whitespace_keeps_pre() {
        let html = "<div>\n    <p>a   b</p>\n</div>\n<pre>  keep\n  me</pre>";
        assert_eq!(
            collapse_whitespace(html),
            "<div><p>a b</p></div><pre>  keep\n  me</pre>"
        );
    }
}
