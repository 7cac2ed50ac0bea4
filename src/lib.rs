//! Preview Fetch Library
//!
//! Fetches web pages for link previews under strict budgets and extracts
//! what a preview card needs.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - Bounded HTTP fetcher (redirect, size and time budgets)
//! - [`resolver`] - Canonical-link resolution on top of the fetcher
//! - [`document`] - Parsed HTML and preview metadata
//! - [`uri`] - RFC 3986 component-aware percent encoding
//! - [`format`] - Size, truncation and attribute formatting helpers
//! - [`config`] - Fetch options and the config file

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod document;
pub mod fetch;
pub mod format;
pub mod resolver;
pub mod uri;
mod user_agent;

// Re-export commonly used types
pub use config::FetchOptions;
pub use document::{Document, PageMetadata};
pub use fetch::{BoundedFetcher, FailureKind, FetchError, FetchRequest};
pub use format::{normalize_for_html_attribute, pretty_size, truncate};
pub use resolver::{CanonicalResolver, PageFetcher, ResolvedPage};
