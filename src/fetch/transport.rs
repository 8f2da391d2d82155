//! HTTP transport used by the fetcher

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;

use super::FetchError;

/// Options for a single request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method
    pub method: Method,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
    /// Request body, sent as-is
    pub body: Option<String>,
    /// Per-request timeout enforced by the transport
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            body: None,
            timeout: None,
        }
    }
}

impl RequestOptions {
    /// A GET request accepting JSON
    pub fn get() -> Self {
        Self::default()
    }

    /// A POST request carrying a JSON body
    pub fn post_json(body: &serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body.to_string()),
            ..Self::default()
        }
        .with_header("Content-Type", "application/json")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A fully-read HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Numeric status code
    pub status: u16,
    /// Canonical reason phrase for the status
    pub status_text: String,
    /// Response body
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self {
            status,
            status_text,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Sends a request and reads the whole response
///
/// Implementations report connection-level failures as
/// [`FetchError::Transport`] and return every HTTP status, including errors,
/// as an `HttpResponse`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, FetchError>;
}

/// Transport backed by `reqwest`
///
/// Relative urls such as `/api/profile` are resolved against the origin set
/// with [`ReqwestTransport::with_origin`]. Without one they fail to send.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
    origin: Option<Url>,
}

impl ReqwestTransport {
    /// Create a transport with a default HTTP client
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            origin: None,
        }
    }

    /// Create a transport with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            origin: None,
        }
    }

    /// Resolve relative urls against `origin`
    pub fn with_origin(mut self, origin: Url) -> Self {
        self.origin = Some(origin);
        self
    }

    fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        let resolved = match (Url::parse(url), &self.origin) {
            (Ok(absolute), _) => Ok(absolute),
            (Err(_), Some(origin)) => origin.join(url),
            (Err(_), None) => {
                return Err(FetchError::transport(format!(
                    "relative url {} has no origin",
                    url
                )))
            }
        };
        resolved.map_err(|e| FetchError::transport(format!("invalid url {}: {}", url, e)))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, FetchError> {
        let url = self.resolve(url)?;
        let mut request = self.client.request(options.method.clone(), url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body: text,
        })
    }
}
