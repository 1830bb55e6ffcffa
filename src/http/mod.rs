//! HTTP client module
//!
//! Provides the configured `reqwest` clients and the helpers shared by all
//! connector operations.
//!
//! # Features
//!
//! - **JSON Requests**: Common headers, session cookie, Basic credentials
//! - **URL Resolution**: Relative paths and percent-encoded path segments
//! - **Error Bodies**: Extraction of the server's `error` message
//! - **Cancellation**: Racing requests against a `CancellationToken`

mod client;

pub use client::{
    cancellable, ensure_http_scheme, error_message, json_headers, parse_body, HttpClient,
};
