//! HTTP request/response types and the transport seam.
//!
//! # Design
//! Requests and responses are plain data. `Endpoint` builds an `HttpRequest`
//! with a path relative to the API base, hands it to a `Transport`, and
//! classifies the `HttpResponse` that comes back. Every HTTP status is
//! returned as data; a `Transport` only fails when no response was obtained.
//!
//! All fields use owned types so requests can be customized by callers and
//! replayed across retry attempts.

use crate::error::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `path` is relative to the endpoint's API base and may carry a query
/// string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Executes requests against a server.
///
/// Implementations must return every HTTP status as an `HttpResponse` and
/// reserve `Err` for failures where no response was obtained.
pub trait Transport: Send {
    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}
