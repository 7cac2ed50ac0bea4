//! Bounded HTTP fetching for link previews.
//!
//! This module retrieves a remote resource into memory under three budgets:
//! a redirect count, a byte cap enforced while streaming, and a wall-clock
//! limit. Failures never hand back a partial body.
//!
//! # Features
//!
//! - Manual redirect following (301/302, optionally 303/307/308) with
//!   host-relative `Location` support
//! - `Set-Cookie` relay to the next hop
//! - Caller credentials withheld once a redirect leaves the starting origin
//! - Independent connect and read timeouts from [`FetchOptions`](crate::config::FetchOptions)
//! - Typed failures split into policy, HTTP, transport and input kinds
//!
//! # Example
//!
//! ```no_run
//! use preview_fetch::config::FetchOptions;
//! use preview_fetch::fetch::BoundedFetcher;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = BoundedFetcher::new(FetchOptions::default())?;
//! let body = fetcher.fetch("https://example.com/article").await?;
//! println!("fetched {} bytes", body.len());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod stream;

pub use client::{BoundedFetcher, FetchRequest};
pub(crate) use client::without_credentials;
pub use error::{FailureKind, FetchError};
