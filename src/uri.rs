//! Component-aware percent-encoding for URIs (RFC 3986).
//!
//! A URI is split into its five components and each one is encoded with its
//! own allowed character set, so a `?` inside a fragment or a `/` inside a
//! path survive while spaces, quotes and non-ASCII bytes are escaped. Escape
//! triples that are already present (`%2F`, `%c3`) pass through untouched;
//! they are not re-cased, so `encode` is not idempotent over inputs that mix
//! `%c3` and `%C3` spellings of the same byte.
//!
//! # Example
//!
//! ```
//! use preview_fetch::uri;
//!
//! let encoded = uri::encode("https://example.com/a b?q=ü#top");
//! assert_eq!(encoded, "https://example.com/a%20b?q=%C3%BC#top");
//! assert_eq!(uri::decode(&encoded), "https://example.com/a b?q=ü#top");
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::format::compile_static_regex;

/// RFC 3986 appendix B. Matches every string.
static URI_COMPONENTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?s)^(([^:/?#]+):)?(//([^/?#]*))?([^?#]*)(\?([^#]*))?(#(.*))?$")
});

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// The five URI components.
///
/// Optional components distinguish "absent" from "empty": `http://h/p?`
/// has an empty query, `http://h/p` has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriComponents<S> {
    pub scheme: Option<S>,
    pub authority: Option<S>,
    pub path: S,
    pub query: Option<S>,
    pub fragment: Option<S>,
}

/// Which component a piece of text belongs to; selects the allowed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Scheme,
    Authority,
    Path,
    Query,
    Fragment,
}

impl Component {
    /// Returns true if `byte` may appear unescaped in this component.
    #[must_use]
    pub fn allows(self, byte: u8) -> bool {
        match self {
            Self::Scheme => byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'-' | b'.'),
            Self::Authority => {
                is_unreserved(byte)
                    || is_sub_delim(byte)
                    || matches!(byte, b':' | b'@' | b'[' | b']')
            }
            Self::Path => {
                is_unreserved(byte) || is_sub_delim(byte) || matches!(byte, b':' | b'@' | b'/')
            }
            Self::Query => {
                is_unreserved(byte)
                    || matches!(byte, b'$' | b'&' | b'*' | b',' | b'=' | b':' | b'@' | b'?')
            }
            Self::Fragment => {
                is_unreserved(byte) || is_sub_delim(byte) || matches!(byte, b':' | b'/' | b'?')
            }
        }
    }
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

fn is_sub_delim(byte: u8) -> bool {
    matches!(
        byte,
        b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'='
    )
}

/// Splits `uri` into its components without validating or normalizing them.
#[must_use]
pub fn split(uri: &str) -> UriComponents<&str> {
    let captures = URI_COMPONENTS_RE.captures(uri);
    let group = |index: usize| {
        captures
            .as_ref()
            .and_then(|caps| caps.get(index))
            .map(|m| m.as_str())
    };

    UriComponents {
        scheme: group(2),
        authority: group(4),
        path: group(5).unwrap_or(uri),
        query: group(7),
        fragment: group(9),
    }
}

impl UriComponents<&str> {
    /// Encodes every component with its own allowed set.
    #[must_use]
    pub fn encoded(&self) -> UriComponents<String> {
        UriComponents {
            scheme: self.scheme.map(|s| encode_component(s, Component::Scheme)),
            authority: self
                .authority
                .map(|s| encode_component(s, Component::Authority)),
            path: encode_component(self.path, Component::Path),
            query: self.query.map(|s| encode_component(s, Component::Query)),
            fragment: self
                .fragment
                .map(|s| encode_component(s, Component::Fragment)),
        }
    }
}

impl<S: AsRef<str>> fmt::Display for UriComponents<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{}:", scheme.as_ref())?;
        }
        if let Some(authority) = &self.authority {
            write!(f, "//{}", authority.as_ref())?;
        }
        f.write_str(self.path.as_ref())?;
        if let Some(query) = &self.query {
            write!(f, "?{}", query.as_ref())?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment.as_ref())?;
        }
        Ok(())
    }
}

/// Percent-encodes a URI, component by component.
#[must_use]
pub fn encode(uri: &str) -> String {
    split(uri).encoded().to_string()
}

/// Percent-encodes `input` for use as the given component.
///
/// Bytes outside the component's allowed set become `%XX` with upper-case
/// hex. A `%` that starts a valid escape is kept as-is; a stray `%` is
/// escaped to `%25`.
#[must_use]
pub fn encode_component(input: &str, component: Component) -> String {
    let bytes = input.as_bytes();
    let mut encoded = String::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        let byte = bytes[index];
        if byte == b'%' && is_escape_at(bytes, index) {
            encoded.push_str(&input[index..index + 3]);
            index += 3;
            continue;
        }
        if component.allows(byte) {
            encoded.push(char::from(byte));
        } else {
            push_escape(&mut encoded, byte);
        }
        index += 1;
    }

    encoded
}

fn is_escape_at(bytes: &[u8], index: usize) -> bool {
    matches!(
        bytes.get(index + 1..index + 3),
        Some([high, low]) if high.is_ascii_hexdigit() && low.is_ascii_hexdigit()
    )
}

fn push_escape(out: &mut String, byte: u8) {
    out.push('%');
    out.push(char::from(HEX_UPPER[usize::from(byte >> 4)]));
    out.push(char::from(HEX_UPPER[usize::from(byte & 0x0F)]));
}

/// Reverses percent-encoding in a single pass, ignoring component boundaries.
///
/// Invalid escapes are left as they are; byte sequences that do not form
/// valid UTF-8 after decoding are replaced with U+FFFD.
#[must_use]
pub fn decode(input: &str) -> String {
    let decoded = urlencoding::decode_binary(input.as_bytes());
    String::from_utf8_lossy(&decoded).into_owned()
}
