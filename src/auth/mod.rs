//! Authentication module
//!
//! Supports: HTTP Basic credentials and the Hydra session cookie.
//!
//! The session token is obtained by `HydraConnector::login` and parsed out
//! of the `Set-Cookie` response headers by [`extract_session`].

mod cookie;
mod types;

pub use cookie::{extract_session, parse_set_cookie};
pub use types::{BasicCredentials, SessionToken, SESSION_COOKIE, SESSION_TOKEN_LEN};
