//! Constants for the fetch module (timeouts, size caps, redirect policy).

use std::time::Duration;

/// Default HTTP connect timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default read timeout and wall-clock budget for streaming a body (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default configured ceiling for redirect hops.
pub const DEFAULT_REDIRECT_LIMIT: u32 = 5;

/// Redirect budget used when a caller does not ask for one.
pub const DEFAULT_REQUESTED_REDIRECTS: u32 = 5;

/// Default download cap in kilobytes (10 MB).
pub const DEFAULT_MAX_DOWNLOAD_KB: u64 = 10 * 1024;

/// Redirect status codes that are always followed.
pub const REDIRECT_STATUSES: [u16; 2] = [301, 302];

/// Redirect status codes followed only when extended redirects are enabled.
pub const EXTENDED_REDIRECT_STATUSES: [u16; 3] = [303, 307, 308];
