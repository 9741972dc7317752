//! Request orchestration: url → address → socket → bytes → JSON.
//!
//! # Design
//! `HttpClient` holds only its configuration and the process-wide
//! `NetContext`; every request creates, uses and closes its own `Connection`,
//! so independent requests may run on different threads without sharing any
//! socket state.
//!
//! GET waits for a complete response and returns its JSON body, or `None` if
//! the connect timed out or was refused. POST is fire-and-forget: the connection is closed
//! right after the bytes are handed to the OS, and a failed connect is an
//! error because nothing could have been delivered.

use serde_json::Value;

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::ClientError;
use crate::http::{Method, OutgoingRequest, Params};
use crate::net::NetContext;
use crate::resolver::{self, AddressCandidate, Endpoint};
use crate::response::{IncomingResponse, ResponseReader};

#[derive(Debug, Clone)]
pub struct HttpClient {
    config: ClientConfig,
    net: &'static NetContext,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            net: NetContext::acquire(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn net(&self) -> &'static NetContext {
        self.net
    }

    /// Issue `method` against `url`.
    ///
    /// GET encodes `params` as the query string and returns the decoded body
    /// (`None` when the connect fails). POST sends `params` as a JSON object and
    /// always returns `None` on success.
    pub fn request(&self, url: &str, method: Method, params: &Params) -> Result<Option<Value>, ClientError> {
        match method {
            Method::Get => self.get(url, params),
            Method::Post => self.post(url, params).map(|()| None),
        }
    }

    pub fn get(&self, url: &str, params: &Params) -> Result<Option<Value>, ClientError> {
        let (endpoint, path) = resolver::split_url(url)?;
        let request = OutgoingRequest::get(&endpoint, &path, params)?;

        let (candidate, mut connection) = self.open(&endpoint)?;
        let connected = match connection.connect(&candidate, self.config.connect_timeout) {
            Ok(connected) => connected,
            Err(e @ ClientError::Connection { .. }) => {
                tracing::warn!("GET {url}: {e}");
                false
            }
            Err(e) => return Err(e),
        };
        if !connected {
            connection.close();
            return Ok(None);
        }

        let exchanged = self.exchange(&mut connection, request);
        connection.close();
        let response = exchanged?;

        if let Some(status) = response.status().filter(|s| !(200..300).contains(s)) {
            tracing::warn!("GET {url} answered with status {status}");
        }
        Ok(Some(response.json()?))
    }

    pub fn post(&self, url: &str, params: &Params) -> Result<(), ClientError> {
        let (endpoint, path) = resolver::split_url(url)?;
        let request = OutgoingRequest::post(&endpoint, &path, &Value::Object(params.clone()))?;

        let (candidate, mut connection) = self.open(&endpoint)?;
        if !connection.connect(&candidate, self.config.connect_timeout)? {
            connection.close();
            return Err(ClientError::Connection {
                addr: candidate.addr,
                code: None,
                message: format!("connect timed out after {:?}", self.config.connect_timeout),
            });
        }

        let sent = send(&mut connection, request);
        connection.close();
        sent
    }

    fn open(&self, endpoint: &Endpoint) -> Result<(AddressCandidate, Connection), ClientError> {
        let candidate = resolver::resolve(endpoint, &self.config)?;
        let connection = Connection::for_candidate(&candidate)?;
        Ok((candidate, connection))
    }

    fn exchange(&self, connection: &mut Connection, request: OutgoingRequest) -> Result<IncomingResponse, ClientError> {
        send(connection, request)?;
        ResponseReader::from_config(&self.config).read(connection)
    }
}

fn send(connection: &mut Connection, request: OutgoingRequest) -> Result<(), ClientError> {
    let method = request.method();
    let target = request.target().to_string();
    let bytes = request.into_bytes();

    let sent = connection.send(&bytes)?;
    if sent < bytes.len() {
        tracing::warn!("{method} {target}: only {sent} of {} bytes were sent", bytes.len());
    } else {
        tracing::debug!("{method} {target}: sent {sent} bytes");
    }
    Ok(())
}
