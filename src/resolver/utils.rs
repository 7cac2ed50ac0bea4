//! Host normalization shared by the resolver.

/// Normalizes a host string: trim, lowercase, strip leading "www." and trailing '.'.
#[must_use]
pub fn canonical_host(host: &str) -> String {
    host.trim()
        .to_ascii_lowercase()
        .trim_start_matches("www.")
        .trim_end_matches('.')
        .to_string()
}

/// Returns true if `host` is the exempt host or one of its subdomains.
///
/// Both sides go through [`canonical_host`], so `www.Example.com` and
/// `m.example.com` both match an exemption of `www.example.com`.
#[must_use]
pub fn host_matches_exemption(host: &str, exempt: &str) -> bool {
    let host = canonical_host(host);
    let exempt = canonical_host(exempt);
    if host.is_empty() || exempt.is_empty() {
        return false;
    }
    host == exempt
        || host
            .strip_suffix(exempt.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}
