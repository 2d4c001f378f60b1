//! The HTTP seam between the GitHub client and the network.
//!
//! Every API call goes through [`HttpTransport`]. Production code uses the
//! reqwest-backed transport; unit tests substitute an in-memory one that
//! replays canned responses keyed by URL.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Header name/value pairs in wire order.
pub type Headers = Vec<(String, String)>;

/// First value of header `name`, compared case-insensitively.
#[must_use]
pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find_map(|(key, value)| key.eq_ignore_ascii_case(name).then_some(value.as_str()))
}

/// An outgoing GET request. The API is read-only, so there is no method field.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Headers,
    /// Overrides the transport's default timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

// The Authorization header holds the token; only header names are printed.
impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("HttpRequest")
            .field("url", &self.url)
            .field("headers", &names)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// A response whose body has been read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        is_success(self.status)
    }
}

/// A response whose body is read incrementally, for archives that should
/// never be held in memory whole.
pub struct StreamingResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: BoxStream<'static, Result<Vec<u8>, HttpError>>,
}

impl StreamingResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        is_success(self.status)
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    /// Connecting, sending or waiting for the response head failed.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The connection broke while the body was being read.
    #[error("reading response body failed: {0}")]
    Body(String),

    #[error("building HTTP client failed: {0}")]
    Client(String),

    #[error("no canned response for {url}")]
    Unmocked { url: String },
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform the request and read the whole body.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;

    /// Perform the request and return the body as a chunk stream.
    async fn send_streaming(&self, request: HttpRequest) -> Result<StreamingResponse, HttpError>;
}

pub mod reqwest_transport {
    use super::*;

    use futures::StreamExt;

    /// Transport over a shared `reqwest::Client`.
    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }

        /// Build a client with the crate user agent and a default timeout.
        pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
            reqwest::Client::builder()
                .user_agent(concat!("ghbackup/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()
                .map(Self::new)
                .map_err(|e| HttpError::Client(e.to_string()))
        }

        async fn open(&self, request: HttpRequest) -> Result<Response, HttpError> {
            let HttpRequest {
                url,
                headers,
                timeout,
            } = request;

            let mut builder = self.client.get(&url);
            for (name, value) in &headers {
                builder = builder.header(name, value);
            }
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }

            // Only the URL can surface in reqwest's message; headers never do.
            let inner = builder.send().await.map_err(|e| HttpError::Request {
                url: url.clone(),
                message: e.without_url().to_string(),
            })?;

            let headers = inner
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    let value = value.to_str().ok()?;
                    Some((name.as_str().to_string(), value.to_string()))
                })
                .collect();

            Ok(Response {
                status: inner.status().as_u16(),
                headers,
                inner,
            })
        }
    }

    struct Response {
        status: u16,
        headers: Headers,
        inner: reqwest::Response,
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let Response {
                status,
                headers,
                inner,
            } = self.open(request).await?;
            let body = inner
                .bytes()
                .await
                .map_err(|e| HttpError::Body(e.without_url().to_string()))?;

            Ok(HttpResponse {
                status,
                headers,
                body: body.to_vec(),
            })
        }

        async fn send_streaming(
            &self,
            request: HttpRequest,
        ) -> Result<StreamingResponse, HttpError> {
            let Response {
                status,
                headers,
                inner,
            } = self.open(request).await?;
            let body = inner
                .bytes_stream()
                .map(|chunk| match chunk {
                    Ok(bytes) => Ok(bytes.to_vec()),
                    Err(e) => Err(HttpError::Body(e.without_url().to_string())),
                })
                .boxed();

            Ok(StreamingResponse {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(test)]
pub(crate) use mock::MockTransport;
