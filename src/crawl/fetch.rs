//! HTTP fetch capability for the crawl.
//!
//! One request per call, no redirect management beyond what the client is
//! configured with, and no retries: a transient failure is exactly the kind
//! of server behaviour a conformance run must report, so it is surfaced
//! as-is rather than smoothed over.

use futures::StreamExt;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Hard cap on response body size. Feeds beyond this are not plausible.
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a single URI.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("response too large")]
    ResponseTooLarge,
}

/// A fully received HTTP response: status, declared content type, body.
#[derive(Debug)]
pub struct Fetched {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Issues a GET with the given Accept header and reads the whole body.
///
/// Non-2xx statuses are not errors here — content-negotiation probes need
/// to inspect 406 responses — so callers check `status` themselves.
pub async fn fetch(
    client: &reqwest::Client,
    url: &Url,
    accept: &str,
    timeout: Duration,
) -> Result<Fetched, FetchError> {
    let response = tokio::time::timeout(
        timeout,
        client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, accept)
            .send(),
    )
    .await
    .map_err(|_| FetchError::Timeout)?
    .map_err(FetchError::Network)?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let body = read_limited_bytes(response, MAX_BODY_SIZE).await?;

    tracing::debug!(
        uri = %url,
        status = %status,
        content_type = content_type.as_deref().unwrap_or("-"),
        bytes = body.len(),
        "fetched"
    );

    Ok(Fetched {
        status,
        content_type,
        body,
    })
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_passes_accept_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .and(header("accept", "application/atom+xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<feed/>", "application/atom+xml"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/feed", server.uri())).unwrap();
        let client = reqwest::Client::new();
        let fetched = fetch(&client, &url, "application/atom+xml", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(fetched.status, StatusCode::OK);
        assert_eq!(fetched.content_type.as_deref(), Some("application/atom+xml"));
        assert_eq!(fetched.body, b"<feed/>");
    }

    #[tokio::test]
    async fn test_fetch_preserves_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(406))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/r", server.uri())).unwrap();
        let client = reqwest::Client::new();
        let fetched = fetch(&client, &url, "application/x-unknown", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(fetched.status, StatusCode::NOT_ACCEPTABLE);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; MAX_BODY_SIZE + 1]))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/big", server.uri())).unwrap();
        let client = reqwest::Client::new();
        let result = fetch(&client, &url, "application/atom+xml", Duration::from_secs(5)).await;
        assert!(matches!(result, Err(FetchError::ResponseTooLarge)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // port 1 is never listening
        let url = Url::parse("http://127.0.0.1:1/feed").unwrap();
        let client = reqwest::Client::new();
        let result = fetch(&client, &url, "application/atom+xml", Duration::from_secs(5)).await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }
}
