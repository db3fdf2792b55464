//! Error types for endpoint operations.
//!
//! # Design
//! `TransportError` covers failures below HTTP: the request never produced a
//! status, could not be sent at all, or the body that came back could not be
//! read as JSON. Everything
//! that did produce a status is classified by `EndpointError`: 404 gets its
//! own variant, an envelope whose `meta.status` is not `"success"` becomes
//! `Application`, and any other status lands in `UnexpectedStatus` with the
//! raw code and body for debugging.

use thiserror::Error;

/// Failures raised by a `Transport` before any status classification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established or was dropped.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The transport gave up waiting for the server.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The response body could not be read or parsed.
    #[error("response parsing failed: {0}")]
    Parse(String),

    /// The request itself is unusable: bad URL, invalid header, redirect
    /// loop and the like. Sending it again fails the same way.
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Connection and timeout failures are worth another attempt; a body
    /// that failed to parse or an unusable request will fail the same way
    /// again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Connection(_) | TransportError::Timeout(_))
    }
}

/// Errors returned by `Endpoint` and `Resource` operations.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// The request could not be completed at the transport level.
    #[error("API transport failure after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The server returned 404.
    #[error("missing record")]
    NotFound,

    /// The server answered in the success range but the envelope's
    /// `meta.status` was not `"success"`.
    #[error("endpoint failure: {}", message.as_deref().unwrap_or("no message"))]
    Application { message: Option<String> },

    /// The server returned a status outside 200..=310 other than 404.
    #[error("unexpected HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The operation is not provided by this resource type.
    #[error("{0} is not implemented for this resource")]
    NotImplemented(&'static str),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl EndpointError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EndpointError::NotFound)
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            EndpointError::NotFound => Some(404),
            EndpointError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
