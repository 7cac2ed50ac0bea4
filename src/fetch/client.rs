//! Bounded HTTP fetcher.
//!
//! [`BoundedFetcher`] performs a GET, follows redirects by hand under a
//! decrementing budget, relays `Set-Cookie` values to the next hop, and
//! streams the body through a [`StreamState`] that enforces the size cap and
//! wall-clock budget.

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use reqwest::header::{
    AUTHORIZATION, CONTENT_LENGTH, COOKIE, HeaderMap, HeaderName, HeaderValue, LOCATION,
    PROXY_AUTHORIZATION, SET_COOKIE,
};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, info, instrument, warn};
use url::{Origin, Url};

use super::constants::{
    DEFAULT_REQUESTED_REDIRECTS, EXTENDED_REDIRECT_STATUSES, REDIRECT_STATUSES,
};
use super::error::FetchError;
use super::stream::{StreamLimit, StreamState};
use crate::config::FetchOptions;

/// One logical fetch: a location plus the context threaded through redirects.
///
/// # Example
///
/// ```
/// use preview_fetch::fetch::FetchRequest;
///
/// let request = FetchRequest::new("/next")
///     .with_origin_host("https://example.com")
///     .with_redirect_limit(2)
///     .with_cookie("session=abc");
/// assert_eq!(request.location(), "/next");
/// ```
#[derive(Debug, Clone)]
pub struct FetchRequest {
    location: String,
    redirect_limit: Option<u32>,
    origin_host: Option<String>,
    cookie_header: Option<String>,
    headers: HeaderMap,
}

impl FetchRequest {
    /// Creates a request for `location` with default budget and no extra headers.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            redirect_limit: None,
            origin_host: None,
            cookie_header: None,
            headers: HeaderMap::new(),
        }
    }

    /// Asks for a redirect budget; capped by the configured limit.
    #[must_use]
    pub fn with_redirect_limit(mut self, limit: u32) -> Self {
        self.redirect_limit = Some(limit);
        self
    }

    /// Base (`scheme://host[:port]`) for resolving a host-relative location.
    #[must_use]
    pub fn with_origin_host(mut self, origin_host: impl Into<String>) -> Self {
        self.origin_host = Some(origin_host.into());
        self
    }

    /// `Cookie` header value for the first hop.
    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie_header = Some(cookie.into());
        self
    }

    /// Adds a caller header.
    ///
    /// `Authorization`, `Proxy-Authorization` and `Cookie` are dropped once a
    /// redirect leaves the origin of the first hop.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the caller headers, with the same credential rule
    /// as [`with_header`](Self::with_header).
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// The location this request starts from.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Caller headers, before any cross-origin stripping.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Caller headers withheld from hops to an origin other than the first.
static CREDENTIAL_HEADERS: [HeaderName; 3] = [AUTHORIZATION, PROXY_AUTHORIZATION, COOKIE];

/// Outcome of a single request in a redirect chain.
enum Hop {
    Redirected {
        location: String,
        cookie: Option<String>,
    },
    Streaming {
        response: Response,
        started_at: Instant,
    },
}

/// HTTP fetcher with redirect, size and time budgets.
///
/// Create once and reuse: the inner client pools connections, and the
/// options are immutable for the fetcher's lifetime. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct BoundedFetcher {
    client: Client,
    options: Arc<FetchOptions>,
}

impl BoundedFetcher {
    /// Builds a fetcher from the given options.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(options: FetchOptions) -> Result<Self, FetchError> {
        let client = build_client(&options).map_err(FetchError::client_build)?;
        Ok(Self {
            client,
            options: Arc::new(options),
        })
    }

    /// The options this fetcher enforces.
    #[must_use]
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Fetches `url` with the default redirect budget and no extra headers.
    ///
    /// # Errors
    ///
    /// See [`fetch_request`](Self::fetch_request).
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch_request(FetchRequest::new(url)).await
    }

    /// Fetches a request, following redirects until a 2xx body is read.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if:
    /// - the location is not an absolute http(s) URL and cannot be resolved
    ///   against the origin host
    /// - the redirect budget runs out
    /// - the server answers with a status that is neither 2xx nor a followed redirect
    /// - the body exceeds the size cap or the wall-clock budget
    /// - the connection fails
    #[instrument(skip(self, request), fields(url = %request.location))]
    pub async fn fetch_request(&self, request: FetchRequest) -> Result<Vec<u8>, FetchError> {
        let FetchRequest {
            mut location,
            redirect_limit,
            mut origin_host,
            mut cookie_header,
            headers,
        } = request;

        let limit = self.effective_redirect_limit(redirect_limit);
        let mut remaining = limit;
        let mut first_origin: Option<Origin> = None;

        loop {
            if remaining == 0 {
                warn!(url = %location, limit, "redirect limit exhausted");
                return Err(FetchError::redirect_limit_exceeded(location, limit));
            }

            let url = resolve_location(&location, origin_host.as_deref())?;
            let first = first_origin.get_or_insert_with(|| url.origin());
            let hop_headers = if *first == url.origin() {
                headers.clone()
            } else {
                debug!(url = %url, "cross-origin hop; withholding caller credentials");
                without_credentials(&headers)
            };

            match self.send_hop(&url, cookie_header.as_deref(), hop_headers).await? {
                Hop::Redirected { location: next, cookie } => {
                    remaining -= 1;
                    debug!(from = %url, to = %next, remaining, "following redirect");
                    origin_host = Some(url.origin().ascii_serialization());
                    cookie_header = cookie;
                    location = next;
                }
                Hop::Streaming {
                    response,
                    started_at,
                } => {
                    let body = self.read_body(&url, response, started_at).await?;
                    info!(url = %url, bytes = body.len(), "fetch complete");
                    return Ok(body);
                }
            }
        }
    }

    /// Asks the server for the size of `url` without downloading it.
    ///
    /// Returns `None` when the response is not 2xx or carries no usable
    /// `Content-Length`. Redirects are not followed.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` for an invalid URL or a transport failure.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn content_length(&self, url: &str) -> Result<Option<u64>, FetchError> {
        let parsed = resolve_location(url, None)?;
        let response = self
            .client
            .head(parsed.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_transport(parsed.as_str(), e))?;

        if !response.status().is_success() {
            debug!(
                status = response.status().as_u16(),
                "no content length for non-success response"
            );
            return Ok(None);
        }

        Ok(response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok()))
    }

    fn effective_redirect_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(DEFAULT_REQUESTED_REDIRECTS)
            .min(self.options.redirect_limit)
    }

    fn follows_redirect(&self, status: StatusCode) -> bool {
        let code = status.as_u16();
        REDIRECT_STATUSES.contains(&code)
            || (self.options.follow_extended_redirects
                && EXTENDED_REDIRECT_STATUSES.contains(&code))
    }

    async fn send_hop(
        &self,
        url: &Url,
        cookie: Option<&str>,
        headers: HeaderMap,
    ) -> Result<Hop, FetchError> {
        let mut request = self.client.get(url.clone()).headers(headers);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let started_at = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_transport(url.as_str(), e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(Hop::Streaming {
                response,
                started_at,
            });
        }

        if self.follows_redirect(status) {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| FetchError::missing_location(url.as_str(), status.as_u16()))?;
            let cookie = relay_cookie(response.headers());
            return Ok(Hop::Redirected { location, cookie });
        }

        debug!(url = %url, status = status.as_u16(), "terminal error status");
        Err(FetchError::http_status(url.as_str(), status.as_u16()))
    }

    async fn read_body(
        &self,
        url: &Url,
        response: Response,
        started_at: Instant,
    ) -> Result<Vec<u8>, FetchError> {
        let mut state = StreamState::new(
            started_at,
            self.options.max_download_bytes(),
            self.options.timeout,
        );
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| FetchError::from_transport(url.as_str(), e))?;
            if let Err(limit) = state.push(&chunk) {
                warn!(url = %url, bytes = state.bytes_written(), ?limit, "discarding partial body");
                return Err(match limit {
                    StreamLimit::TooLarge { limit_bytes } => {
                        FetchError::payload_too_large(url.as_str(), limit_bytes)
                    }
                    StreamLimit::TimedOut => FetchError::timeout(url.as_str()),
                });
            }
        }

        Ok(state.finish())
    }
}

/// Resolves a location to an absolute http(s) URL, using `origin_host` for
/// host-relative values.
fn resolve_location(location: &str, origin_host: Option<&str>) -> Result<Url, FetchError> {
    let url = match Url::parse(location) {
        Ok(url) if url.has_host() => url,
        _ => origin_host
            .and_then(|origin| Url::parse(origin).ok())
            .and_then(|origin| origin.join(location).ok())
            .ok_or_else(|| FetchError::invalid_url(location))?,
    };

    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(FetchError::invalid_url(location));
    }
    Ok(url)
}

/// Collects the `name=value` part of every `Set-Cookie` into a `Cookie` value.
fn relay_cookie(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|raw| raw.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();

    (!pairs.is_empty()).then(|| pairs.join("; "))
}

/// Copy of `headers` without [`CREDENTIAL_HEADERS`].
pub(crate) fn without_credentials(headers: &HeaderMap) -> HeaderMap {
    let mut stripped = headers.clone();
    for name in &CREDENTIAL_HEADERS {
        stripped.remove(name);
    }
    stripped
}

fn build_client(options: &FetchOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .connect_timeout(options.connect_timeout)
        .read_timeout(options.timeout)
        .redirect(Policy::none())
        .gzip(true);

    if let Some(user_agent) = &options.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }

    if options.accept_invalid_certs {
        warn!("TLS certificate verification disabled; fetched content can be intercepted");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_location_absolute() {
        let url = resolve_location("https://example.com/a?b=1", None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/a?b=1");
    }

    #[test]
    fn test_resolve_location_relative_uses_origin() {
        let url = resolve_location("/next/page", Some("http://127.0.0.1:8080")).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/next/page");
    }

    #[test]
    fn test_resolve_location_relative_without_origin_fails() {
        let err = resolve_location("/next", None).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn test_resolve_location_rejects_non_http_scheme() {
        assert!(matches!(
            resolve_location("ftp://example.com/file", None),
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            resolve_location("mailto:a@example.com", Some("https://example.com")),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_relay_cookie_keeps_name_value_pairs() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("s=1; Path=/; HttpOnly"));
        headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(relay_cookie(&headers).as_deref(), Some("s=1; theme=dark"));
    }

    #[test]
    fn test_relay_cookie_none_without_set_cookie() {
        assert_eq!(relay_cookie(&HeaderMap::new()), None);
    }

    #[test]
    fn test_without_credentials_keeps_other_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        headers.insert(PROXY_AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        headers.insert(COOKIE, HeaderValue::from_static("sid=1"));
        headers.insert("accept-language", HeaderValue::from_static("de"));

        let stripped = without_credentials(&headers);
        assert_eq!(stripped.len(), 1);
        assert_eq!(stripped.get("accept-language").unwrap(), "de");
        assert_eq!(headers.len(), 4);
    }

    #[test]
    fn test_effective_redirect_limit_capped_by_options() {
        let fetcher = BoundedFetcher::new(FetchOptions {
            redirect_limit: 3,
            ..FetchOptions::default()
        })
        .unwrap();
        assert_eq!(fetcher.effective_redirect_limit(None), 3);
        assert_eq!(fetcher.effective_redirect_limit(Some(10)), 3);
        assert_eq!(fetcher.effective_redirect_limit(Some(2)), 2);
    }

    #[test]
    fn test_follows_redirect_statuses() {
        let legacy = BoundedFetcher::new(FetchOptions::default()).unwrap();
        assert!(legacy.follows_redirect(StatusCode::MOVED_PERMANENTLY));
        assert!(legacy.follows_redirect(StatusCode::FOUND));
        assert!(!legacy.follows_redirect(StatusCode::SEE_OTHER));
        assert!(!legacy.follows_redirect(StatusCode::PERMANENT_REDIRECT));

        let extended = BoundedFetcher::new(FetchOptions {
            follow_extended_redirects: true,
            ..FetchOptions::default()
        })
        .unwrap();
        assert!(extended.follows_redirect(StatusCode::SEE_OTHER));
        assert!(extended.follows_redirect(StatusCode::TEMPORARY_REDIRECT));
        assert!(extended.follows_redirect(StatusCode::PERMANENT_REDIRECT));
        assert!(!extended.follows_redirect(StatusCode::NOT_MODIFIED));
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_url_without_network() {
        let fetcher = BoundedFetcher::new(FetchOptions::default()).unwrap();
        let result = fetcher.fetch("definitely-not-a-url").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_fetch_with_zero_budget_makes_no_request() {
        let fetcher = BoundedFetcher::new(FetchOptions::default()).unwrap();
        let result = fetcher
            .fetch_request(FetchRequest::new("http://127.0.0.1:9/never").with_redirect_limit(0))
            .await;
        assert!(matches!(
            result,
            Err(FetchError::RedirectLimitExceeded { limit: 0, .. })
        ));
    }
}
