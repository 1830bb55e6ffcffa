//! Credential types
//!
//! Basic credentials configured up front, and the session token obtained
//! from (or restored for) the Hydra server.

use reqwest::RequestBuilder;
use std::fmt;

/// Name of the cookie carrying the Hydra session id
pub const SESSION_COOKIE: &str = "hydra_session";

/// Number of characters kept from the session cookie value
pub const SESSION_TOKEN_LEN: usize = 40;

/// HTTP Basic authentication credentials
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Attach an `Authorization: Basic` header to a request
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        req.basic_auth(&self.username, Some(&self.password))
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Opaque Hydra session id
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a token obtained elsewhere (e.g. restored from `HYDRA_SESSION`)
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Build a token from a raw cookie value, keeping at most
    /// [`SESSION_TOKEN_LEN`] characters
    pub fn from_cookie_value(value: &str) -> Option<Self> {
        let token: String = value.trim().chars().take(SESSION_TOKEN_LEN).collect();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value for the `cookie` request header
    pub fn cookie_header(&self) -> String {
        format!("{SESSION_COOKIE}={}", self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a short prefix, enough to tell sessions apart in logs
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "SessionToken({prefix}...)")
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
