//! JSON-over-HTTP client.
//!
//! A thin wrapper over [`reqwest::Client`] with a bounded timeout on every
//! request. Two call styles are offered:
//!
//! - [`HttpClient::send_json`] returns the raw status and body, for callers
//!   that decide themselves what a response means (the pattern router).
//! - [`HttpClient::get_json`] / [`HttpClient::post_json`] fail on non-2xx
//!   and decode the body, for typed web APIs (Slack).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{TransportError, TransportResult};

/// Timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Method
// =============================================================================

/// HTTP methods accepted for outbound calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl FromStr for HttpMethod {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            _ => Err(TransportError::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// Converts configured `name -> value` pairs into a [`HeaderMap`].
pub fn build_headers(headers: &HashMap<String, String>) -> TransportResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| TransportError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| TransportError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

// =============================================================================
// Client
// =============================================================================

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Shared HTTP client. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a client whose requests time out after `timeout`
    /// ([`DEFAULT_TIMEOUT`] if `None`).
    pub fn new(timeout: Option<Duration>) -> TransportResult<Self> {
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends `body` as JSON and returns whatever the server answered.
    ///
    /// `Content-Type: application/json` is set first; `headers` may
    /// override it. The body is sent for GET requests too.
    pub async fn send_json(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &HeaderMap,
        body: &Value,
    ) -> TransportResult<HttpReply> {
        let mut all_headers = HeaderMap::new();
        all_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in headers {
            all_headers.insert(name.clone(), value.clone());
        }

        let payload = serde_json::to_vec(body).map_err(|e| TransportError::request(url, e))?;
        let request = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        }
        .headers(all_headers)
        .body(payload);

        debug!(%method, url, "Sending JSON request");
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::request(url, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::request(url, e))?;
        trace!(url, status, bytes = body.len(), "Received response");
        Ok(HttpReply { status, body })
    }

    /// Performs a GET with query parameters and decodes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        bearer: Option<&str>,
        query: &[(&str, &str)],
    ) -> TransportResult<T> {
        let request = self.client.get(url).query(query);
        self.execute(url, request, bearer).await
    }

    /// Performs a POST with a JSON body and decodes the JSON response.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &Value,
    ) -> TransportResult<T> {
        let request = self.client.post(url).json(body);
        self.execute(url, request, bearer).await
    }

    /// Fetches `url` and returns the raw body.
    pub async fn get_bytes(&self, url: &str) -> TransportResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::request(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::request(url, e))?;
        Ok(bytes.to_vec())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        url: &str,
        mut request: RequestBuilder,
        bearer: Option<&str>,
    ) -> TransportResult<T> {
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::request(url, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::request(url, e))?;
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| TransportError::decode(url, e))
    }
}
