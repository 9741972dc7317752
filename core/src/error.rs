//! Error types for the ranking service client.
//!
//! # Design
//! Every variant aborts the current request; nothing here is retried. OS-level
//! failures keep the raw OS error code alongside the system message so callers
//! can tell a refused connect from an unreachable network. Response framing and
//! content problems live in `ProtocolError` so the FFI layer (and tests) can
//! match on them without string comparison.
//!
//! A failed connect on the GET path (timeout or refusal) is not an error: it
//! yields `Ok(None)` from `HttpClient::request`.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors returned by the client core.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The url could not be split into host, port and path.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Address lookup failed or returned no IPv4 records.
    #[error("DNS resolution failed for '{host}': {reason}")]
    Dns { host: String, reason: String },

    /// Every candidate was probed and none accepted a connection.
    #[error("none of the {attempted} address(es) resolved for '{host}' answered the probe")]
    NoReachableCandidate { host: String, attempted: usize },

    /// Socket creation or configuration failed.
    #[error("socket {operation} failed (os error {code:?}): {message}")]
    Socket {
        operation: &'static str,
        code: Option<i32>,
        message: String,
    },

    /// Connect was refused, timed out where that is fatal, or the socket hit an
    /// unexpected condition while talking to the peer.
    #[error("connection to {addr} failed (os error {code:?}): {message}")]
    Connection {
        addr: SocketAddr,
        code: Option<i32>,
        message: String,
    },

    /// The response was malformed, incomplete or not JSON.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Request parameters could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ClientError {
    pub(crate) fn socket(operation: &'static str, err: &io::Error) -> Self {
        ClientError::Socket {
            operation,
            code: err.raw_os_error(),
            message: err.to_string(),
        }
    }

    pub(crate) fn connection(addr: SocketAddr, err: &io::Error) -> Self {
        ClientError::Connection {
            addr,
            code: err.raw_os_error(),
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        ClientError::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// Response-level failures. The body is discarded in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The peer closed, or the receive cap was reached, before the header
    /// terminator and the full `Content-Length` body were seen.
    #[error("incomplete response")]
    IncompleteResponse,

    /// The accumulated response grew past the configured byte cap.
    #[error("response exceeds {limit} bytes")]
    ResponseTooLarge { limit: usize },

    /// `Content-Type` is missing or does not contain `application/json`.
    #[error("unsupported content type: {}", .0.as_deref().unwrap_or("<missing>"))]
    UnsupportedContentType(Option<String>),

    /// The body is not valid JSON.
    #[error("invalid json body: {0}")]
    InvalidJsonBody(String),
}
