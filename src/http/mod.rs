//! HTTP requests through an external `curl` process.

pub mod subprocess;

use std::fmt;

use async_trait::async_trait;

use crate::error::TransportError;

pub use subprocess::{CurlTransport, check_curl_installed};

/// Product-identifying `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("gitscribe/", env!("CARGO_PKG_VERSION"));

/// `Editor-Version` header expected by the Copilot endpoints. Must name an
/// editor the `vscode-chat` integration accepts.
pub const EDITOR_VERSION: &str = "vscode/1.96.0";

/// HTTP methods used by the providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Header value by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw result of the HTTP subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl HttpResponse {
    /// The response body, or the process diagnostics when it failed.
    pub fn into_body(self) -> Result<String, TransportError> {
        if self.exit_code != 0 {
            return Err(TransportError::NonZeroExit {
                code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            });
        }
        Ok(self.stdout)
    }
}

/// Capability to perform an HTTP request.
///
/// This abstraction allows mocking the curl subprocess in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}
