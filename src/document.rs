//! Parsed HTML document with the few queries link previews need.
//!
//! Parsing never fails: an absent or empty body yields an empty document,
//! so a best-effort fetch that came back with nothing is still a valid input.

use scraper::{Html, Selector};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::format::{absolute_url, is_blank, normalize_for_html_attribute, strip_tags, truncate};

/// Longest description kept in [`PageMetadata`], in characters.
pub const DESCRIPTION_MAX_LEN: usize = 300;

const CANONICAL_LINK_SELECTOR: &str = r#"link[rel="canonical"]"#;
const IGNORE_CANONICAL_SELECTOR: &str = r#"meta[property="og:ignore_canonical"]"#;

/// An HTML document.
///
/// Holds a parsed tree that is not `Send`; keep it out of state that
/// crosses an `.await`.
#[derive(Debug)]
pub struct Document {
    html: Html,
}

/// Preview metadata extracted from a document, ready for HTML output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
    pub canonical_url: Option<String>,
}

impl Document {
    /// Parses a body as HTML, replacing invalid UTF-8.
    #[must_use]
    pub fn parse(bytes: Option<&[u8]>) -> Self {
        let source = bytes.map(String::from_utf8_lossy).unwrap_or_default();
        Self {
            html: Html::parse_document(&source),
        }
    }

    /// Returns the `attr` value of the first element matching `selector`
    /// that has it.
    #[must_use]
    pub fn select_attr(&self, selector: &str, attr: &str) -> Option<String> {
        let parsed = match Selector::parse(selector) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(selector, error = %e, "invalid selector");
                return None;
            }
        };
        self.html
            .select(&parsed)
            .find_map(|element| element.value().attr(attr))
            .map(str::to_string)
    }

    /// Returns the trimmed text of the first element matching `selector`.
    #[must_use]
    pub fn select_text(&self, selector: &str) -> Option<String> {
        let parsed = Selector::parse(selector).ok()?;
        let element = self.html.select(&parsed).next()?;
        let text = element.text().collect::<String>();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// The `href` of `<link rel="canonical">`, if present and not blank.
    #[must_use]
    pub fn canonical_link(&self) -> Option<String> {
        self.select_attr(CANONICAL_LINK_SELECTOR, "href")
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
    }

    /// True when the page opts out of canonical redirection with
    /// `<meta property="og:ignore_canonical" content="true">`.
    #[must_use]
    pub fn ignores_canonical(&self) -> bool {
        self.select_attr(IGNORE_CANONICAL_SELECTOR, "content")
            .is_some_and(|content| content == "true")
    }

    /// Reads `<meta property=key>` or `<meta name=key>` content, stripped of
    /// markup. Blank values count as absent.
    #[must_use]
    pub fn meta_value(&self, key: &str) -> Option<String> {
        [
            format!(r#"meta[property="{key}"]"#),
            format!(r#"meta[name="{key}"]"#),
        ]
        .iter()
        .filter_map(|selector| self.select_attr(selector, "content"))
        .find(|value| !is_blank(value))
        .map(|value| strip_tags(&value).trim().to_string())
    }

    /// Collects preview metadata, resolving relative references against
    /// `page_url`.
    #[must_use]
    pub fn metadata(&self, page_url: &Url) -> PageMetadata {
        let title = self
            .meta_value("og:title")
            .or_else(|| self.meta_value("twitter:title"))
            .or_else(|| self.select_text("title"));

        let description = self
            .meta_value("og:description")
            .or_else(|| self.meta_value("twitter:description"))
            .or_else(|| self.meta_value("description"))
            .map(|text| truncate(&text, DESCRIPTION_MAX_LEN));

        let image = self
            .meta_value("og:image")
            .or_else(|| self.meta_value("twitter:image"))
            .and_then(|src| absolute_url(&src, page_url))
            .map(|src| normalize_for_html_attribute(&src));

        let canonical_url = self
            .canonical_link()
            .and_then(|href| absolute_url(&href, page_url))
            .map(|href| normalize_for_html_attribute(&href));

        PageMetadata {
            title,
            description,
            image,
            site_name: self.meta_value("og:site_name"),
            canonical_url,
        }
    }
}
