//! Hydra connector
//!
//! `HydraConnector` maps every Hydra REST endpoint the CLI needs onto one
//! async method. Responses are handed back as opaque JSON; failures are
//! classified by status code into [`Error`] variants.
//!
//! Requests carry `Accept`/`Content-Type: application/json` and, once a
//! session is established, the `hydra_session` cookie. Downloads go through
//! [`crate::download`] instead and do not forward the cookie.

use crate::auth::{extract_session, SessionToken};
use crate::config::ConnectorConfig;
use crate::download::{download, DownloadOptions};
use crate::error::{Error, Result};
use crate::http::{cancellable, error_message, json_headers, parse_body, HttpClient};
use crate::types::{JsonValue, Method};
use reqwest::header::REFERER;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Client for a single Hydra instance
#[derive(Debug)]
pub struct HydraConnector {
    http: HttpClient,
    session: Option<SessionToken>,
    max_redirects: u32,
    download_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl HydraConnector {
    /// Create a connector from a configuration
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        let http = HttpClient::new(&config)?;

        Ok(Self {
            http,
            session: config.session,
            max_redirects: config.max_redirects,
            download_timeout: config.download_timeout,
            cancel: CancellationToken::new(),
        })
    }

    /// Create a connector for `base_url` with default settings
    pub fn with_url(base_url: impl Into<String>) -> Result<Self> {
        Self::new(ConnectorConfig::new(base_url))
    }

    /// Abort in-flight and future calls when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that aborts this connector's calls when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Base URL of the Hydra instance
    pub fn base_url(&self) -> &Url {
        self.http.base_url()
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Current session token, if any
    pub fn session(&self) -> Option<&SessionToken> {
        self.session.as_ref().filter(|t| !t.is_empty())
    }

    /// Use a session obtained earlier (e.g. from `HYDRA_SESSION`)
    pub fn set_session(&mut self, token: impl Into<String>) {
        self.session = Some(SessionToken::new(token));
    }

    /// Forget the current session without contacting the server
    pub fn clear_session(&mut self) {
        self.session = None;
    }

    /// Authenticate with a username and password
    ///
    /// On success the session token is stored on the connector and returned.
    /// The connector's state is left untouched on failure.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<SessionToken> {
        let url = self.http.endpoint(&["login"])?;
        let request = self
            .http
            .request(Method::POST, url)
            .headers(json_headers(self.session()))
            .header(REFERER, self.http.referer())
            .json(&json!({
                "username": username,
                "password": password,
            }));

        let (status, headers, body) = cancellable(&self.cancel, async {
            let response = request.send().await.map_err(|e| self.http.classify(e))?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(|e| self.http.classify(e))?;
            Ok::<_, Error>((status, headers, body))
        })
        .await?;

        if status != StatusCode::OK {
            let message = error_message(&body).unwrap_or_else(|| status.to_string());
            debug!(status = status.as_u16(), "login rejected");
            return Err(Error::auth(message));
        }

        let token = extract_session(&headers).ok_or(Error::SessionCookieMissing)?;
        info!(user = username, "logged in");
        self.session = Some(token.clone());
        Ok(token)
    }

    /// Terminate the current session
    ///
    /// Only a `204 No Content` answer counts as success; the session token is
    /// cleared afterwards.
    pub async fn logout(&mut self) -> Result<()> {
        let url = self.http.endpoint(&["logout"])?;
        let request = self
            .http
            .request(Method::POST, url)
            .headers(json_headers(self.session()))
            .header(REFERER, self.http.referer());

        let status = cancellable(&self.cancel, async {
            let response = request.send().await.map_err(|e| self.http.classify(e))?;
            Ok::<_, Error>(response.status())
        })
        .await?;

        if status != StatusCode::NO_CONTENT {
            return Err(Error::LogoutFailed {
                status: status.as_u16(),
            });
        }

        info!("logged out");
        self.session = Some(SessionToken::default());
        Ok(())
    }

    // ========================================================================
    // Generic operations
    // ========================================================================

    /// GET a path relative to the base URL
    pub async fn get(&self, path: &str) -> Result<JsonValue> {
        let url = self.http.url(path)?;
        self.execute::<()>(Method::GET, url, None).await
    }

    /// PUT a JSON body to a path relative to the base URL
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<JsonValue> {
        let url = self.http.url(path)?;
        self.execute(Method::PUT, url, Some(body)).await
    }

    /// DELETE a path relative to the base URL
    pub async fn delete(&self, path: &str) -> Result<JsonValue> {
        let url = self.http.url(path)?;
        self.execute::<()>(Method::DELETE, url, None).await
    }

    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<JsonValue> {
        debug!(%method, %url, "hydra request");

        let mut request = self
            .http
            .request(method, url)
            .headers(json_headers(self.session()));
        if let Some(body) = body {
            request = request.json(body);
        }

        let (status, body) = cancellable(&self.cancel, async {
            let response = request.send().await.map_err(|e| self.http.classify(e))?;
            let status = response.status();
            let body = response.bytes().await.map_err(|e| self.http.classify(e))?;
            Ok::<_, Error>((status, body))
        })
        .await?;

        if status.is_success() {
            Ok(parse_body(&body))
        } else {
            Err(Error::operation(method, status.as_u16(), error_message(&body)))
        }
    }

    async fn get_at(&self, segments: &[&str]) -> Result<JsonValue> {
        let url = self.http.endpoint(segments)?;
        self.execute::<()>(Method::GET, url, None).await
    }

    async fn put_at<B: Serialize + ?Sized>(&self, segments: &[&str], body: &B) -> Result<JsonValue> {
        let url = self.http.endpoint(segments)?;
        self.execute(Method::PUT, url, Some(body)).await
    }

    async fn delete_at(&self, segments: &[&str]) -> Result<JsonValue> {
        let url = self.http.endpoint(segments)?;
        self.execute::<()>(Method::DELETE, url, None).await
    }

    // ========================================================================
    // Queue and status
    // ========================================================================

    /// All builds in the queue
    pub async fn show_queue(&self) -> Result<JsonValue> {
        self.get_at(&["queue"]).await
    }

    /// Builds currently running
    pub async fn show_status(&self) -> Result<JsonValue> {
        self.get_at(&["status"]).await
    }

    /// Number of builds in the queue
    pub async fn show_num_of_builds_in_queue(&self) -> Result<JsonValue> {
        self.get_at(&["api", "nrqueue"]).await
    }

    // ========================================================================
    // Projects
    // ========================================================================

    /// Overview of all projects
    pub async fn query_projects(&self) -> Result<JsonValue> {
        self.get_at(&[]).await
    }

    /// Properties of a project, including its jobsets and releases
    pub async fn query_project(&self, project_id: &str) -> Result<JsonValue> {
        self.get_at(&["project", project_id]).await
    }

    /// Create a project, or update it when the id already exists
    ///
    /// Requires a session with sufficient privileges.
    pub async fn create_or_update_project<B: Serialize + ?Sized>(
        &self,
        project_id: &str,
        settings: &B,
    ) -> Result<JsonValue> {
        self.put_at(&["project", project_id], settings).await
    }

    pub async fn delete_project(&self, project_id: &str) -> Result<JsonValue> {
        self.delete_at(&["project", project_id]).await
    }

    // ========================================================================
    // Jobsets and evaluations
    // ========================================================================

    pub async fn query_jobset(&self, project_id: &str, jobset_id: &str) -> Result<JsonValue> {
        self.get_at(&["jobset", project_id, jobset_id]).await
    }

    /// Create a jobset, or update it when it already exists
    pub async fn create_or_update_jobset<B: Serialize + ?Sized>(
        &self,
        project_id: &str,
        jobset_id: &str,
        settings: &B,
    ) -> Result<JsonValue> {
        self.put_at(&["jobset", project_id, jobset_id], settings)
            .await
    }

    pub async fn delete_jobset(&self, project_id: &str, jobset_id: &str) -> Result<JsonValue> {
        self.delete_at(&["jobset", project_id, jobset_id]).await
    }

    /// Evaluations of a jobset
    pub async fn query_evaluations(&self, project_id: &str, jobset_id: &str) -> Result<JsonValue> {
        self.get_at(&["jobset", project_id, jobset_id, "evals"])
            .await
    }

    pub async fn query_evaluation(&self, eval_id: &str) -> Result<JsonValue> {
        self.get_at(&["eval", eval_id]).await
    }

    /// Cancel every build of an evaluation
    pub async fn cancel_builds(&self, eval_id: &str) -> Result<JsonValue> {
        self.get_at(&["eval", eval_id, "cancel"]).await
    }

    /// Bump the priority of every build of an evaluation
    pub async fn bump_evaluation_priorities(&self, eval_id: &str) -> Result<JsonValue> {
        self.get_at(&["eval", eval_id, "bump"]).await
    }

    pub async fn restart_aborted_builds(&self, eval_id: &str) -> Result<JsonValue> {
        self.get_at(&["eval", eval_id, "restart_aborted"]).await
    }

    pub async fn restart_failed_builds(&self, eval_id: &str) -> Result<JsonValue> {
        self.get_at(&["eval", eval_id, "restart_failed"]).await
    }

    // ========================================================================
    // Builds
    // ========================================================================

    pub async fn query_build(&self, build_id: &str) -> Result<JsonValue> {
        self.get_at(&["build", build_id]).await
    }

    /// Restart a failed build
    pub async fn restart_build(&self, build_id: &str) -> Result<JsonValue> {
        self.get_at(&["build", build_id, "restart"]).await
    }

    /// Cancel a scheduled build
    pub async fn cancel_build(&self, build_id: &str) -> Result<JsonValue> {
        self.get_at(&["build", build_id, "cancel"]).await
    }

    pub async fn bump_build_priority(&self, build_id: &str) -> Result<JsonValue> {
        self.get_at(&["build", build_id, "bump"]).await
    }

    /// Protect a build product from garbage collection
    pub async fn keep_build_product(&self, build_id: &str, product_id: &str) -> Result<JsonValue> {
        self.get_at(&["build", build_id, "keep", product_id])
            .await
    }

    // ========================================================================
    // Administration
    // ========================================================================

    pub async fn clear_vcs_caches(&self) -> Result<JsonValue> {
        self.get_at(&["admin", "clear-vcs-cache"]).await
    }

    pub async fn clear_failed_builds_cache(&self) -> Result<JsonValue> {
        self.get_at(&["admin", "clear-failed-cache"]).await
    }

    pub async fn clear_non_current_builds_from_queue(&self) -> Result<JsonValue> {
        self.get_at(&["admin", "clear-queue-non-current"]).await
    }

    // ========================================================================
    // Downloads
    // ========================================================================

    /// Stream the resource at `path` into `sink`, following redirects
    ///
    /// Returns the number of bytes written.
    pub async fn download_file<W>(&self, path: &str, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let url = self.http.url(path)?;
        self.download_url(url, sink).await
    }

    /// Download a build product
    pub async fn download_build_product<W>(
        &self,
        build_id: &str,
        product_id: &str,
        sink: &mut W,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let url = self
            .http
            .endpoint(&["build", build_id, "download", product_id])?;
        self.download_url(url, sink).await
    }

    /// Download the raw log of a build
    pub async fn download_raw_build_log<W>(&self, build_id: &str, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let url = self.http.endpoint(&["build", build_id, "log", "raw"])?;
        self.download_url(url, sink).await
    }

    /// Download a script that reproduces a build locally
    pub async fn download_build_reproduce_script<W>(
        &self,
        build_id: &str,
        sink: &mut W,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let url = self.http.endpoint(&["build", build_id, "reproduce"])?;
        self.download_url(url, sink).await
    }

    async fn download_url<W>(&self, url: Url, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let options = DownloadOptions {
            max_redirects: self.max_redirects,
            timeout: self.download_timeout,
        };
        download(&self.http, url, sink, options, &self.cancel).await
    }
}
