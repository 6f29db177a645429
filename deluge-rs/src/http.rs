//! Blocking HTTP client used by the network built-ins.
//!
//! A thin layer over [`reqwest::blocking::Client`]: the client is built once
//! with the configured `User-Agent` and timeout, and every request is turned
//! into a plain [`Response`] (status, headers, decoded body) so the built-ins
//! never see reqwest types.  Compressed bodies are decoded by reqwest.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = concat!("deluge-rs/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL `{0}`")]
    InvalidUrl(String),

    #[error("invalid HTTP method `{0}`")]
    InvalidMethod(String),

    #[error("HTTP client unavailable: {0}")]
    Client(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: &str, url: &str) -> Self {
        Request {
            method: method.to_ascii_uppercase(),
            url: url.to_owned(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body and its content type.
    pub fn json(mut self, body: &serde_json::Value) -> Self {
        if !self.has_header("content-type") {
            self.headers
                .push(("Content-Type".to_owned(), "application/json".to_owned()));
        }
        self.body = Some(body.to_string().into_bytes());
        self
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// Body as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// First header named `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Blocking client.  Cheap to clone: clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    user_agent: String,
    timeout: Duration,
    /// A client that failed to build keeps its error so `send` can report it.
    inner: Result<reqwest::blocking::Client, String>,
}

impl Default for HttpClient {
    fn default() -> Self {
        HttpClient::new(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }
}

impl HttpClient {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        let user_agent = user_agent.into();
        let inner = reqwest::blocking::Client::builder()
            .user_agent(user_agent.as_str())
            .timeout(timeout)
            .build()
            .map_err(|e| e.to_string());
        HttpClient {
            user_agent,
            timeout,
            inner,
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `req` and wait for the whole response.
    pub fn send(&self, req: &Request) -> Result<Response, HttpError> {
        let client = self
            .inner
            .as_ref()
            .map_err(|e| HttpError::Client(e.clone()))?;
        let url = reqwest::Url::parse(&req.url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| HttpError::InvalidUrl(req.url.clone()))?;
        let method = reqwest::Method::from_bytes(req.method.as_bytes())
            .map_err(|_| HttpError::InvalidMethod(req.method.clone()))?;

        debug!(method = %req.method, url = %req.url, "http request");
        let mut builder = client.request(method, url);
        for (k, v) in &req.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        if let Some(body) = &req.body {
            builder = builder.body(body.clone());
        }
        let resp = builder.send()?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_owned())))
            .collect();
        let body = resp.bytes()?.to_vec();
        debug!(status, bytes = body.len(), "http response");
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
