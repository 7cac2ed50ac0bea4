//! Output helpers for presentation layers: byte sizes, text truncation and
//! HTML-safe URL rendering.
//!
//! Everything here is pure and allocation-light; none of it touches the
//! network.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Unit labels for [`pretty_size`], 1024-based.
const SIZE_UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

const SIZE_SCALE: f64 = 1024.0;

/// Marker appended by [`truncate`] when text is shortened.
pub const ELLIPSIS: &str = "...";

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Characters that may not appear in a URL rendered into an HTML attribute.
static UNSAFE_ATTRIBUTE_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"[^a-zA-Z0-9_\-`.~:/?#\[\]@!$&'()*+,;=%\p{M}’]")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"<[^>]+>"));

/// Formats a byte count with binary units.
///
/// Sizes below 2048 bytes are printed as a whole number of bytes. Larger
/// sizes use the smallest unit (KB through EB) whose value stays below 2048,
/// with two decimals.
///
/// ```
/// use preview_fetch::format::pretty_size;
///
/// assert_eq!(pretty_size(1023), "1023 B");
/// assert_eq!(pretty_size(2048), "2.00 KB");
/// ```
#[must_use]
pub fn pretty_size(bytes: u64) -> String {
    if bytes < 2 * 1024 {
        return format!("{bytes} {}", SIZE_UNITS[0]);
    }

    #[allow(clippy::cast_precision_loss)]
    let size = bytes as f64;
    let mut divisor = SIZE_SCALE;
    for unit in &SIZE_UNITS[1..SIZE_UNITS.len() - 1] {
        if size < 2.0 * divisor * SIZE_SCALE {
            return format!("{:.2} {unit}", size / divisor);
        }
        divisor *= SIZE_SCALE;
    }
    format!("{:.2} {}", size / divisor, SIZE_UNITS[SIZE_UNITS.len() - 1])
}

/// Shortens `text` to at most `max_len` characters plus [`ELLIPSIS`].
///
/// The cut happens at the last whitespace at or before `max_len`; without
/// one, the text is cut hard at `max_len`. Text that already fits is
/// returned unchanged.
#[must_use]
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .take(max_len + 1)
        .filter(|(_, ch)| ch.is_whitespace())
        .last()
        .map(|(index, _)| index)
        .or_else(|| text.char_indices().nth(max_len).map(|(index, _)| index))
        .unwrap_or(text.len());

    format!("{}{ELLIPSIS}", &text[..cut])
}

/// Makes an already-encoded URL safe to drop into an HTML attribute.
///
/// Spaces become `%20`, quotes become entities, and anything outside the
/// URL-safe allow-list is removed.
#[must_use]
pub fn normalize_for_html_attribute(url: &str) -> String {
    let escaped = url
        .replace(' ', "%20")
        .replace('\'', "&apos;")
        .replace('"', "&quot;");
    UNSAFE_ATTRIBUTE_CHARS_RE
        .replace_all(&escaped, "")
        .into_owned()
}

/// Replaces markup tags with spaces and drops newlines.
#[must_use]
pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, " ").replace('\n', "")
}

/// Returns true for empty or whitespace-only text.
#[must_use]
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Resolves an image or link reference found on `page_url` to an absolute URL.
///
/// Returns the value as-is if it already starts with `http://` or `https://`;
/// protocol-relative `//...` values take the page's scheme; anything else is
/// joined against the page URL.
#[must_use]
pub fn absolute_url(value: &str, page_url: &Url) -> Option<String> {
    let value = value.trim();
    let lowered = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("{}:{value}", page_url.scheme()));
    }
    page_url.join(value).ok().map(|url| url.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_size_bytes_below_two_kilobytes() {
        assert_eq!(pretty_size(0), "0 B");
        assert_eq!(pretty_size(1023), "1023 B");
        assert_eq!(pretty_size(2047), "2047 B");
    }

    #[test]
    fn test_pretty_size_scales_units() {
        assert_eq!(pretty_size(2048), "2.00 KB");
        assert_eq!(pretty_size(1024 * 1024), "1024.00 KB");
        assert_eq!(pretty_size(2 * 1024 * 1024), "2.00 MB");
        assert_eq!(pretty_size(1024_u64.pow(3) * 3), "3.00 GB");
        assert_eq!(pretty_size(1024_u64.pow(4) * 5), "5.00 TB");
    }

    #[test]
    fn test_pretty_size_largest_values_use_exabytes() {
        assert_eq!(pretty_size(1024_u64.pow(6) * 4), "4.00 EB");
        assert_eq!(pretty_size(u64::MAX), "16.00 EB");
    }

    #[test]
    fn test_truncate_cuts_at_last_space() {
        assert_eq!(truncate("the quick brown fox", 12), "the quick...");
    }

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("short", 12), "short");
        assert_eq!(truncate("exactly12chr", 12), "exactly12chr");
    }

    #[test]
    fn test_truncate_hard_cut_without_whitespace() {
        assert_eq!(truncate("abcdefghijklmnop", 5), "abcde...");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        assert_eq!(truncate("ééééé ééééé", 7), "ééééé...");
    }

    #[test]
    fn test_normalize_for_html_attribute_escapes_quotes_and_spaces() {
        assert_eq!(
            normalize_for_html_attribute(r#"https://example.com/a b?q="x"&r='y'"#),
            "https://example.com/a%20b?q=&quot;x&quot;&r=&apos;y&apos;"
        );
    }

    #[test]
    fn test_normalize_for_html_attribute_strips_unsafe_chars() {
        assert_eq!(
            normalize_for_html_attribute("https://example.com/<script>{x}|"),
            "https://example.com/scriptx"
        );
    }

    #[test]
    fn test_normalize_for_html_attribute_keeps_reserved_chars() {
        let url = "https://example.com/p;a=1?x=[1]&y=(2)#frag!~";
        assert_eq!(normalize_for_html_attribute(url), url);
    }

    #[test]
    fn test_strip_tags_replaces_markup() {
        assert_eq!(strip_tags("<b>bold</b>\ntext"), " bold text");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank(" \t\n"));
        assert!(!is_blank(" x "));
    }

    #[test]
    fn test_absolute_url_variants() {
        let page = Url::parse("https://example.com/articles/post.html").unwrap();
        assert_eq!(
            absolute_url("https://cdn.example.com/a.png", &page).as_deref(),
            Some("https://cdn.example.com/a.png")
        );
        assert_eq!(
            absolute_url("//cdn.example.com/a.png", &page).as_deref(),
            Some("https://cdn.example.com/a.png")
        );
        assert_eq!(
            absolute_url("/img/a.png", &page).as_deref(),
            Some("https://example.com/img/a.png")
        );
        assert_eq!(
            absolute_url("a.png", &page).as_deref(),
            Some("https://example.com/articles/a.png")
        );
    }
}
