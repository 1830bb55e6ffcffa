//! Streaming file downloads
//!
//! Build logs, reproduce scripts and build products are fetched with a raw
//! GET (no JSON headers, no session cookie) and piped chunk by chunk into an
//! `AsyncWrite` sink. Redirects are followed here rather than by `reqwest`
//! so the hop count and the credentials sent along can be controlled.

use crate::error::{Error, Result};
use crate::http::{cancellable, ensure_http_scheme, HttpClient};
use futures::StreamExt;
use reqwest::header::LOCATION;
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Settings for a single download
#[derive(Debug, Clone, Copy)]
pub struct DownloadOptions {
    /// Maximum number of redirect hops
    pub max_redirects: u32,
    /// Total time limit, including every hop and the body
    pub timeout: Option<Duration>,
}

/// Download `url` into `sink`, returning the number of bytes written
///
/// The sink is flushed and shut down once the body has been written. It is
/// not touched at all when the server answers with an error status.
pub async fn download<W>(
    http: &HttpClient,
    url: Url,
    sink: &mut W,
    options: DownloadOptions,
    cancel: &CancellationToken,
) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let transfer = follow_and_stream(http, url, sink, options.max_redirects, cancel);

    match options.timeout {
        Some(limit) => tokio::time::timeout(limit, transfer)
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: limit.as_millis() as u64,
            })?,
        None => transfer.await,
    }
}

async fn follow_and_stream<W>(
    http: &HttpClient,
    mut url: Url,
    sink: &mut W,
    max_redirects: u32,
    cancel: &CancellationToken,
) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut hops = 0;

    loop {
        ensure_http_scheme(&url)?;
        debug!(%url, hops, "download request");

        let request = http.raw_get(url.clone());
        let response =
            cancellable(cancel, async { request.send().await.map_err(Error::Http) }).await?;
        let status = response.status();

        if is_followed_redirect(status) {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or(Error::MissingRedirectLocation {
                    status: status.as_u16(),
                })?;

            if hops >= max_redirects {
                return Err(Error::TooManyRedirects { max: max_redirects });
            }

            hops += 1;
            url = url.join(location)?;
            debug!(%url, status = status.as_u16(), "following redirect");
            continue;
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(Error::DownloadFailed {
                status: status.as_u16(),
            });
        }

        return pipe(response, sink, cancel).await;
    }
}

/// Redirect statuses a download follows
fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

async fn pipe<W>(response: Response, sink: &mut W, cancel: &CancellationToken) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut body = response.bytes_stream();
    let mut written = 0u64;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            next = body.next() => next,
        };

        let Some(chunk) = next else { break };
        let chunk = chunk?;
        sink.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    sink.flush().await?;
    sink.shutdown().await?;
    debug!(bytes = written, "download complete");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectorConfig;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options() -> DownloadOptions {
        DownloadOptions {
            max_redirects: 5,
            timeout: None,
        }
    }

    #[test]
    fn test_followed_redirects() {
        for code in [301, 302, 303, 307, 308] {
            assert!(is_followed_redirect(StatusCode::from_u16(code).unwrap()));
        }
        assert!(!is_followed_redirect(StatusCode::NOT_MODIFIED));
        assert!(!is_followed_redirect(StatusCode::OK));
    }

    #[tokio::test]
    async fn test_download_streams_body() {
        let mock_server = MockServer::start().await;
        let body: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();

        Mock::given(method("GET"))
            .and(path("/build/7/log/raw"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&mock_server)
            .await;

        let http = HttpClient::new(&ConnectorConfig::new(mock_server.uri())).unwrap();
        let url = http.url("build/7/log/raw").unwrap();
        let mut sink = Vec::new();

        let written = download(&http, url, &mut sink, options(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(sink, body);
    }

    #[tokio::test]
    async fn test_download_redirect_without_location() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/build/1/reproduce"))
            .respond_with(ResponseTemplate::new(302))
            .mount(&mock_server)
            .await;

        let http = HttpClient::new(&ConnectorConfig::new(mock_server.uri())).unwrap();
        let url = http.url("build/1/reproduce").unwrap();
        let mut sink = Vec::new();

        let err = download(&http, url, &mut sink, options(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingRedirectLocation { status: 302 }));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_download_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/build/1/download/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let http = HttpClient::new(&ConnectorConfig::new(mock_server.uri())).unwrap();
        let url = http.url("build/1/download/1").unwrap();
        let mut sink = Vec::new();
        let opts = DownloadOptions {
            max_redirects: 5,
            timeout: Some(Duration::from_millis(50)),
        };

        let err = download(&http, url, &mut sink, opts, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_download_cancelled_before_start() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
            .mount(&mock_server)
            .await;

        let http = HttpClient::new(&ConnectorConfig::new(mock_server.uri())).unwrap();
        let url = http.url("build/1/log/raw").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut sink = Vec::new();

        let err = download(&http, url, &mut sink, options(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(sink.is_empty());
    }
}
