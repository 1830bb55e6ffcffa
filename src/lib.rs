// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # hydra-connect
//!
//! An async client for the REST API of the Hydra continuous integration
//! service, plus a command-line front end.
//!
//! ## Features
//!
//! - **Sessions**: Log in with a username and password, reuse the
//!   `hydra_session` token via `HYDRA_SESSION`
//! - **HTTP Basic**: For servers behind a Basic-auth proxy
//! - **Typed Operations**: Projects, jobsets, evaluations, builds, queue and
//!   admin endpoints, with percent-encoded identifiers
//! - **Streaming Downloads**: Build logs, products and reproduce scripts,
//!   written chunk by chunk into any `AsyncWrite`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hydra_connect::{ConnectorConfig, HydraConnector, ProjectSettings, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut hydra = HydraConnector::new(ConnectorConfig::from_env("https://hydra.example.org"))?;
//!     hydra.login("admin", "secret").await?;
//!
//!     let settings = ProjectSettings::new("Foobar", "Foobar project").visible(true);
//!     hydra.create_or_update_project("foobar", &settings).await?;
//!
//!     let project = hydra.query_project("foobar").await?;
//!     println!("{}", project["displayname"]);
//!
//!     let mut log = tokio::io::stdout();
//!     hydra.download_raw_build_log("42", &mut log).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        HydraConnector                       │
//! │  login/logout    get/put/delete    typed ops    downloads   │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//! ┌──────────────┬──────────────┴──────────┬────────────────────┐
//! │     Auth     │          HTTP           │      Download      │
//! ├──────────────┼─────────────────────────┼────────────────────┤
//! │ Session      │ JSON headers            │ Manual redirects   │
//! │ Basic        │ URL resolution          │ Chunk streaming    │
//! │ Set-Cookie   │ Cancellation, timeouts  │ Hop limit          │
//! └──────────────┴─────────────────────────┴────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the connector
pub mod error;

/// Common types and type aliases
pub mod types;

/// Session token and Basic credentials
pub mod auth;

/// HTTP client and request helpers
pub mod http;

/// Connector configuration
pub mod config;

/// The Hydra connector
pub mod connector;

/// Streaming downloads with redirect handling
pub mod download;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use auth::{BasicCredentials, SessionToken};
pub use config::ConnectorConfig;
pub use connector::HydraConnector;
pub use download::DownloadOptions;
pub use tokio_util::sync::CancellationToken;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
