//! Canonical resolver: primary fetch, decision, optional canonical re-fetch.

use std::sync::Arc;

use reqwest::header::HeaderMap;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::PageFetcher;
use super::utils::host_matches_exemption;
use crate::config::FetchOptions;
use crate::document::Document;
use crate::fetch::{BoundedFetcher, FetchError, FetchRequest, without_credentials};

/// Hosts whose canonical links are never followed by default.
pub const IGNORE_CANONICAL_HOSTS: [&str; 1] = ["www.instagram.com"];

/// Whether a document's canonical link should be fetched, and where to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalDecision {
    pub should_follow: bool,
    pub target_url: Option<Url>,
}

impl CanonicalDecision {
    const STAY: Self = Self {
        should_follow: false,
        target_url: None,
    };

    /// Decides from the document fetched for `page_url`.
    ///
    /// Follows only when the page has not opted out, its host is not
    /// exempt, and the canonical link resolves to a different host or path.
    #[must_use]
    pub fn evaluate(document: &Document, page_url: &Url, ignored_hosts: &[String]) -> Self {
        if document.ignores_canonical() {
            debug!(url = %page_url, "page opted out of canonical redirection");
            return Self::STAY;
        }

        let host = page_url.host_str().unwrap_or_default();
        if ignored_hosts
            .iter()
            .any(|exempt| host_matches_exemption(host, exempt))
        {
            debug!(url = %page_url, host, "host exempt from canonical redirection");
            return Self::STAY;
        }

        let Some(href) = document.canonical_link() else {
            return Self::STAY;
        };
        let target = match page_url.join(&href) {
            Ok(target) if matches!(target.scheme(), "http" | "https") => target,
            _ => {
                debug!(url = %page_url, href, "unusable canonical link");
                return Self::STAY;
            }
        };

        if target.host_str() == page_url.host_str() && target.path() == page_url.path() {
            return Self::STAY;
        }

        Self {
            should_follow: true,
            target_url: Some(target),
        }
    }
}

/// Outcome of a resolution: the URL the body belongs to and the body itself.
///
/// `body` is `None` when the primary fetch failed. Unlike [`Document`] this
/// value is `Send`, so it can be returned across tasks and parsed later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPage {
    pub url: Url,
    pub body: Option<Vec<u8>>,
    pub followed_canonical: bool,
}

impl ResolvedPage {
    /// Parses the body; an absent body gives an empty document.
    #[must_use]
    pub fn document(&self) -> Document {
        Document::parse(self.body.as_deref())
    }
}

/// Fetches pages and follows their canonical link once.
#[derive(Clone)]
pub struct CanonicalResolver {
    fetcher: Arc<dyn PageFetcher>,
    ignored_hosts: Vec<String>,
}

impl std::fmt::Debug for CanonicalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonicalResolver")
            .field("ignored_hosts", &self.ignored_hosts)
            .finish_non_exhaustive()
    }
}

impl CanonicalResolver {
    /// Creates a resolver over `fetcher` with the default exemption set.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            ignored_hosts: IGNORE_CANONICAL_HOSTS
                .iter()
                .map(|host| (*host).to_string())
                .collect(),
        }
    }

    /// Builds a [`BoundedFetcher`] from `options` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be built.
    pub fn from_options(options: FetchOptions) -> Result<Self, FetchError> {
        Ok(Self::new(Arc::new(BoundedFetcher::new(options)?)))
    }

    /// Replaces the exemption set.
    #[must_use]
    pub fn with_ignored_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Hosts whose canonical links are never followed.
    #[must_use]
    pub fn ignored_hosts(&self) -> &[String] {
        &self.ignored_hosts
    }

    /// Fetches `url` and returns the canonical document.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `url` is not an absolute
    /// http(s) URL. Fetch failures degrade to an empty or original document.
    pub async fn fetch_document(&self, url: &str) -> Result<Document, FetchError> {
        self.fetch_document_with_headers(url, &HeaderMap::new())
            .await
    }

    /// Like [`fetch_document`](Self::fetch_document), sending `headers` on
    /// both fetches.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `url` is not an absolute http(s) URL.
    pub async fn fetch_document_with_headers(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<Document, FetchError> {
        let page = self.resolve_with_headers(url, headers).await?;
        Ok(page.document())
    }

    /// Resolves `url` to the page to preview, keeping the raw body.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `url` is not an absolute http(s) URL.
    pub async fn fetch_page(&self, url: &str) -> Result<ResolvedPage, FetchError> {
        self.resolve_with_headers(url, &HeaderMap::new()).await
    }

    /// Primary fetch, canonical decision, and at most one more fetch.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `url` is not an absolute http(s) URL.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn resolve_with_headers(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<ResolvedPage, FetchError> {
        let page_url = Url::parse(url)
            .ok()
            .filter(|parsed| matches!(parsed.scheme(), "http" | "https") && parsed.has_host())
            .ok_or_else(|| FetchError::invalid_url(url))?;

        let primary = self.fetch_best_effort(&page_url, headers).await;

        // The parsed tree is not Send; drop it before the next await.
        let target = {
            let document = Document::parse(primary.as_deref());
            CanonicalDecision::evaluate(&document, &page_url, &self.ignored_hosts).target_url
        };

        let Some(target) = target else {
            return Ok(ResolvedPage {
                url: page_url,
                body: primary,
                followed_canonical: false,
            });
        };

        info!(from = %page_url, to = %target, "following canonical link");
        let headers = if target.origin() == page_url.origin() {
            headers.clone()
        } else {
            without_credentials(headers)
        };
        let request = FetchRequest::new(target.as_str()).with_headers(headers);
        match self.fetcher.fetch_page(request).await {
            Ok(body) => Ok(ResolvedPage {
                url: target,
                body: Some(body),
                followed_canonical: true,
            }),
            Err(e) => {
                warn!(
                    canonical = %target,
                    error = %e,
                    "canonical fetch failed; keeping original page"
                );
                Ok(ResolvedPage {
                    url: page_url,
                    body: primary,
                    followed_canonical: false,
                })
            }
        }
    }

    async fn fetch_best_effort(&self, url: &Url, headers: &HeaderMap) -> Option<Vec<u8>> {
        let request = FetchRequest::new(url.as_str()).with_headers(headers.clone());
        match self.fetcher.fetch_page(request).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(url = %url, error = %e, kind = ?e.kind(), "primary fetch failed");
                None
            }
        }
    }
}
