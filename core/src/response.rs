//! Response assembly and decoding.
//!
//! # Design
//! `IncomingResponse` accumulates raw bytes and derives its header fields the
//! first time the header terminator shows up. A response is complete only when
//! the terminator has been seen *and* `Content-Length` body bytes are present;
//! the body is exactly those bytes, so surplus data never changes the outcome.
//! Without a parseable `Content-Length` a response can never complete, which is why
//! `ResponseReader` bounds the loop by a receive count and a byte cap and
//! reports `IncompleteResponse` instead of handing back a truncated body.
//!
//! The content-type check happens after the body is fully drained.

use serde_json::Value;

use crate::config::ClientConfig;
use crate::connection::Transport;
use crate::error::{ClientError, ProtocolError};

pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomingResponse {
    raw: Vec<u8>,
    header_end: Option<usize>,
    status: Option<u16>,
    content_length: Option<usize>,
    content_type: Option<String>,
}

impl IncomingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received chunk and update the derived fields.
    pub fn push(&mut self, chunk: &[u8]) {
        // The terminator may straddle the previous chunk boundary.
        let search_from = self.raw.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
        self.raw.extend_from_slice(chunk);

        if self.header_end.is_none() {
            if let Some(pos) = find(&self.raw[search_from..], HEADER_TERMINATOR) {
                let end = search_from + pos + HEADER_TERMINATOR.len();
                self.parse_head(end);
                self.header_end = Some(end);
            }
        }
    }

    fn parse_head(&mut self, end: usize) {
        let head = String::from_utf8_lossy(&self.raw[..end - HEADER_TERMINATOR.len()]).into_owned();
        let mut lines = head.split("\r\n");
        self.status = lines.next().and_then(parse_status_line);

        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") && self.content_length.is_none() {
                self.content_length = value.parse().ok();
            } else if name.eq_ignore_ascii_case("content-type") && self.content_type.is_none() {
                self.content_type = Some(value.to_string());
            }
        }
    }

    /// True once the header block and at least `Content-Length` body bytes
    /// have arrived.
    pub fn is_complete(&self) -> bool {
        match (self.header_end, self.content_length) {
            (Some(end), Some(expected)) => self.raw.len() - end >= expected,
            _ => false,
        }
    }

    /// Bytes after the header terminator, capped at `Content-Length` (empty
    /// until the terminator is seen). Anything past the declared length is
    /// not part of the body.
    pub fn body(&self) -> &[u8] {
        match (self.header_end, self.content_length) {
            (Some(end), Some(expected)) => &self.raw[end..self.raw.len().min(end + expected)],
            (Some(end), None) => &self.raw[end..],
            (None, _) => &[],
        }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Offset of the first body byte.
    pub fn header_end(&self) -> Option<usize> {
        self.header_end
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Validate the content type and decode the body as JSON.
    pub fn json(&self) -> Result<Value, ProtocolError> {
        match self.content_type.as_deref() {
            Some(ct) if ct.to_ascii_lowercase().contains("application/json") => {}
            other => return Err(ProtocolError::UnsupportedContentType(other.map(str::to_owned))),
        }
        serde_json::from_slice(self.body()).map_err(|e| ProtocolError::InvalidJsonBody(e.to_string()))
    }
}

fn parse_status_line(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Drives a `Transport` until a complete response has been assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseReader {
    max_iterations: usize,
    max_bytes: usize,
}

impl Default for ResponseReader {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl ResponseReader {
    pub fn new(max_iterations: usize, max_bytes: usize) -> Self {
        Self {
            max_iterations,
            max_bytes,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.max_receive_iterations, config.max_response_bytes)
    }

    /// Receive until the response is complete, the cap is hit, or the
    /// transport fails.
    pub fn read<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<IncomingResponse, ClientError> {
        let mut response = IncomingResponse::new();

        for _ in 0..self.max_iterations {
            let chunk = transport.receive()?;
            response.push(&chunk);

            if response.len() > self.max_bytes {
                return Err(ProtocolError::ResponseTooLarge { limit: self.max_bytes }.into());
            }
            if response.is_complete() {
                tracing::debug!(
                    "response complete: status={:?} body={} bytes",
                    response.status(),
                    response.body().len()
                );
                return Ok(response);
            }
        }

        tracing::debug!(
            "giving up after {} receive calls with {} bytes buffered",
            self.max_iterations,
            response.len()
        );
        Err(ProtocolError::IncompleteResponse.into())
    }

    /// `read` followed by content-type validation and JSON decoding.
    pub fn read_json<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<Value, ClientError> {
        Ok(self.read(transport)?.json()?)
    }
}
