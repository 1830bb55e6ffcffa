//! HTTP client for the Hydra API
//!
//! Wraps two `reqwest` clients built from one `ConnectorConfig`:
//! - a JSON client that follows redirects and applies the request timeout
//! - a raw client with redirects disabled, used by downloads that track
//!   their own redirect hops

use crate::auth::{BasicCredentials, SessionToken};
use crate::config::ConnectorConfig;
use crate::error::{Error, Result};
use crate::types::{JsonValue, Method};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE};
use reqwest::{redirect, Client, RequestBuilder};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use url::Url;

const APPLICATION_JSON: &str = "application/json";

/// Redirect limit for JSON requests, which `reqwest` follows itself
const JSON_MAX_REDIRECTS: usize = 10;

/// HTTP client bound to a Hydra base URL
pub struct HttpClient {
    json: Client,
    raw: Client,
    base_url: Url,
    basic_auth: Option<BasicCredentials>,
    timeout: Duration,
}

impl HttpClient {
    /// Build the clients for the given configuration
    pub fn new(config: &ConnectorConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url)?;

        let json = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(redirect::Policy::limited(JSON_MAX_REDIRECTS))
            .build()?;

        let raw = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            json,
            raw,
            base_url,
            basic_auth: config.basic_auth.clone(),
            timeout: config.timeout,
        })
    }

    /// Base URL of the Hydra instance
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Value for the `Referer` header the server's CSRF check expects
    pub fn referer(&self) -> String {
        format!("{}/", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Resolve a relative path (e.g. `"project/foo"`) against the base URL
    pub fn url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }

        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Build a URL from path segments, percent-encoding each one
    ///
    /// An empty segment list yields the base URL with a trailing slash.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::config(format!("Cannot use {} as a base URL", self.base_url)))?;
            path.pop_if_empty();
            if segments.is_empty() {
                path.push("");
            } else {
                path.extend(segments);
            }
        }
        Ok(url)
    }

    /// Start a JSON request: Basic credentials (if any) and the timeout applied
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        trace!(%method, %url, "building request");
        let req = self.json.request(method.into(), url).timeout(self.timeout);
        match &self.basic_auth {
            Some(creds) => creds.apply(req),
            None => req,
        }
    }

    /// Start a raw GET for downloads
    ///
    /// Basic credentials are only sent to the base URL's origin so that a
    /// redirect to another host does not receive them.
    pub fn raw_get(&self, url: Url) -> RequestBuilder {
        let same_origin = url.origin() == self.base_url.origin();
        let req = self.raw.get(url);
        match &self.basic_auth {
            Some(creds) if same_origin => creds.apply(req),
            _ => req,
        }
    }

    /// Whether Basic credentials are configured
    pub fn has_basic_auth(&self) -> bool {
        self.basic_auth.is_some()
    }

    /// Map a transport error, turning timeouts into [`Error::Timeout`]
    pub fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            Error::Http(err)
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_basic_auth", &self.basic_auth.is_some())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Headers carried by every JSON request
pub fn json_headers(session: Option<&SessionToken>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));

    if let Some(token) = session.filter(|t| !t.is_empty()) {
        if let Ok(value) = HeaderValue::from_str(&token.cookie_header()) {
            headers.insert(COOKIE, value);
        }
    }

    headers
}

/// Parse a successful response body; an empty body becomes `null` and a
/// body that is not JSON is passed through as a string
pub fn parse_body(body: &[u8]) -> JsonValue {
    if body.iter().all(u8::is_ascii_whitespace) {
        return JsonValue::Null;
    }

    serde_json::from_slice(body)
        .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(body).into_owned()))
}

/// Extract the server's `error` message from a failed response body
pub fn error_message(body: &[u8]) -> Option<String> {
    let value: JsonValue = serde_json::from_slice(body).ok()?;
    value
        .get("error")
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
}

/// Run `fut` unless `cancel` fires first
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        res = fut => res,
    }
}

/// Check that a URL uses a scheme the connector can speak
pub fn ensure_http_scheme(url: &Url) -> Result<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::UnsupportedProtocol {
            scheme: other.to_string(),
        }),
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    if base_url.trim().is_empty() {
        return Err(Error::config("No Hydra URL has been specified"));
    }

    let url = Url::parse(base_url.trim())?;
    ensure_http_scheme(&url)?;
    if url.cannot_be_a_base() {
        return Err(Error::config(format!("Cannot use {url} as a base URL")));
    }
    Ok(url)
}
