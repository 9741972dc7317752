//! HTTP/1.1 request serialization.
//!
//! # Design
//! An `OutgoingRequest` describes a request as plain data (method, target,
//! ordered headers, optional body) and is turned into wire bytes exactly once
//! by `into_bytes`. Only the subset the ranking service needs is produced:
//! GET with a query string and POST with a JSON body. There is no
//! percent-encoding; query values must already be URL-safe.
//!
//! `Content-Length` is computed from the very buffer that becomes the body,
//! so the two cannot disagree.

use std::fmt;

use serde_json::Value;

use crate::error::ClientError;
use crate::resolver::Endpoint;

pub const CRLF: &str = "\r\n";

/// Request parameters: query pairs for GET, JSON object members for POST.
pub type Params = serde_json::Map<String, Value>;

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

/// A request ready to be serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    method: Method,
    target: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl OutgoingRequest {
    /// GET `path`, appending `params` as `?k1=v1&k2=v2`.
    pub fn get(endpoint: &Endpoint, path: &str, params: &Params) -> Result<Self, ClientError> {
        let mut target = normalize_path(path);
        if !params.is_empty() {
            target.push('?');
            target.push_str(&query_string(params)?);
        }
        Ok(Self {
            method: Method::Get,
            target,
            headers: vec![host_header(endpoint)],
            body: None,
        })
    }

    /// POST `body` as JSON to `path`.
    pub fn post(endpoint: &Endpoint, path: &str, body: &Value) -> Result<Self, ClientError> {
        let body = serde_json::to_vec(body).map_err(|e| ClientError::Serialization(e.to_string()))?;
        Ok(Self {
            method: Method::Post,
            target: normalize_path(path),
            headers: vec![
                host_header(endpoint),
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Content-Length".to_string(), body.len().to_string()),
            ],
            body: Some(body),
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Path plus query string, as sent on the request line.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Serialize to the request line, headers, blank line and body.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut head = format!("{} {} HTTP/1.1{CRLF}", self.method, self.target);
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}{CRLF}"));
        }
        head.push_str(CRLF);

        let mut bytes = head.into_bytes();
        if let Some(body) = self.body {
            bytes.extend_from_slice(&body);
        }
        bytes
    }
}

/// Serialize a GET request for `path` with `params` as the query string.
pub fn build_get(endpoint: &Endpoint, path: &str, params: &Params) -> Result<Vec<u8>, ClientError> {
    Ok(OutgoingRequest::get(endpoint, path, params)?.into_bytes())
}

/// Serialize a POST request carrying `body` as JSON.
pub fn build_post(endpoint: &Endpoint, path: &str, body: &Value) -> Result<Vec<u8>, ClientError> {
    Ok(OutgoingRequest::post(endpoint, path, body)?.into_bytes())
}

fn host_header(endpoint: &Endpoint) -> (String, String) {
    ("Host".to_string(), endpoint.to_string())
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn query_string(params: &Params) -> Result<String, ClientError> {
    let pairs = params
        .iter()
        .map(|(key, value)| Ok(format!("{key}={}", query_value(key, value)?)))
        .collect::<Result<Vec<_>, ClientError>>()?;
    Ok(pairs.join("&"))
}

/// Strings are sent verbatim, other scalars in their JSON spelling.
fn query_value(key: &str, value: &Value) -> Result<String, ClientError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(ClientError::Serialization(format!(
            "query parameter '{key}' must be a scalar"
        ))),
    }
}
