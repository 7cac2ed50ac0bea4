//! Default User-Agent string for fetch traffic.
//!
//! Identifies the tool and links back to the project so site operators can
//! reach us (good citizenship; RFC 9308).

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/preview-fetch";

/// Default User-Agent for preview fetches.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("preview-fetch/{version} (link-preview; +{PROJECT_UA_URL})")
}
