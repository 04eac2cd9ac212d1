// src/utils/http.rs

//! HTTP request/response primitives and the reqwest-backed transport.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// HTTP method of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An immutable, replayable request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Create a POST request carrying a JSON body.
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Full URL including the encoded query string.
    pub fn full_url(&self) -> Result<Url> {
        if self.query.is_empty() {
            Ok(Url::parse(&self.url)?)
        } else {
            Ok(Url::parse_with_params(&self.url, &self.query)?)
        }
    }

    /// Short description for log lines.
    pub fn describe(&self) -> String {
        self.full_url()
            .map(|u| u.to_string())
            .unwrap_or_else(|_| self.url.clone())
    }
}

/// A received response; status handling is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body, reporting shape mismatches as protocol errors.
    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| AppError::protocol(context, e))
    }
}

/// Category of a network-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    /// The request could not be built; replaying it cannot help
    Invalid,
    Other,
}

/// A failure before any HTTP status was received.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind != TransportErrorKind::Invalid
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else if e.is_builder() {
            TransportErrorKind::Invalid
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, e.to_string())
    }
}

/// Opaque request/response primitive.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a transport from the HTTP settings.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }

    fn header_map(headers: &[(String, String)]) -> std::result::Result<HeaderMap, TransportError> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::new(TransportErrorKind::Invalid, e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::new(TransportErrorKind::Invalid, e.to_string()))?;
            map.append(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let url = request
            .full_url()
            .map_err(|e| TransportError::new(TransportErrorKind::Invalid, e.to_string()))?;
        let headers = Self::header_map(&request.headers)?;

        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        let builder = match &request.body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string()),
            None => builder,
        };

        let response = builder.headers(headers).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_url_encodes_query() {
        let request = HttpRequest::get("https://clist.by/api/v4/problem/")
            .query("resource", "codeforces.com")
            .query("name", "A + B");
        assert_eq!(
            request.full_url().unwrap().as_str(),
            "https://clist.by/api/v4/problem/?resource=codeforces.com&name=A+%2B+B"
        );
    }

    #[test]
    fn test_full_url_without_query() {
        let request = HttpRequest::get("https://kenkoooo.com/atcoder/resources/problems.json");
        assert_eq!(
            request.describe(),
            "https://kenkoooo.com/atcoder/resources/problems.json"
        );
    }

    #[test]
    fn test_response_json_shape_mismatch_is_protocol_error() {
        let response = HttpResponse::new(200, "{\"objects\": 3}");
        let decoded: Result<Vec<u32>> = response.json("clist");
        assert!(matches!(
            decoded,
            Err(AppError::UpstreamProtocol { .. })
        ));
    }

    #[test]
    fn test_invalid_transport_error_is_not_transient() {
        assert!(!TransportError::new(TransportErrorKind::Invalid, "bad header").is_transient());
        assert!(TransportError::new(TransportErrorKind::Timeout, "slow").is_transient());
    }
}
