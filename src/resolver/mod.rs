//! Canonical-link resolution for fetched pages.
//!
//! A page may name a preferred URL for itself with `<link rel="canonical">`.
//! [`CanonicalResolver`] fetches the requested page, and when it points
//! somewhere else, fetches the canonical target once and returns that
//! document instead.
//!
//! # Architecture
//!
//! - [`PageFetcher`] - Async trait the resolver fetches through; implemented
//!   by [`BoundedFetcher`]
//! - [`CanonicalResolver`] - Primary fetch, decision, optional second fetch
//! - [`CanonicalDecision`] - Pure decision derived from a parsed document
//!
//! # Example
//!
//! ```no_run
//! use preview_fetch::config::FetchOptions;
//! use preview_fetch::resolver::CanonicalResolver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = CanonicalResolver::from_options(FetchOptions::default())?;
//! let page = resolver.fetch_page("https://example.com/article?ref=feed").await?;
//! println!("resolved to {}", page.url);
//! # Ok(())
//! # }
//! ```

mod canonical;
mod utils;

pub use canonical::{CanonicalDecision, CanonicalResolver, IGNORE_CANONICAL_HOSTS, ResolvedPage};
pub use utils::{canonical_host, host_matches_exemption};

use async_trait::async_trait;

use crate::fetch::{BoundedFetcher, FetchError, FetchRequest};

/// Source of page bytes for the resolver.
///
/// Implementations must be safe to share across tasks. Tests substitute a
/// recording fake.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the full body for `request`.
    async fn fetch_page(&self, request: FetchRequest) -> Result<Vec<u8>, FetchError>;
}

#[async_trait]
impl PageFetcher for BoundedFetcher {
    async fn fetch_page(&self, request: FetchRequest) -> Result<Vec<u8>, FetchError> {
        self.fetch_request(request).await
    }
}
