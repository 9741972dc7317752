//! Raw-socket HTTP/1.1 client core for the online ranking service.
//!
//! # Overview
//! Submits and queries player scores over plain TCP without an HTTP library:
//! the url is resolved to an IPv4 address, a socket is connected under a
//! timeout, the request is serialized by hand, and the response is read off
//! the wire until its `Content-Length` is satisfied.
//!
//! # Design
//! - `resolver` turns `host[:port]` into address candidates and probes them.
//! - `connection` owns one socket per request (`Created → Connected → Closed`).
//! - `http` serializes GET (query string) and POST (JSON body) requests.
//! - `response` assembles and validates the response bytes.
//! - `client::HttpClient` drives the pipeline and is the only entry point most
//!   callers need.
//! - No pooling, redirects, TLS, chunked encoding or compression.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod net;
pub mod resolver;
pub mod response;

pub use client::HttpClient;
pub use config::{CandidateSelection, ClientConfig};
pub use connection::{Connection, ConnectionState, Transport};
pub use error::{ClientError, ProtocolError};
pub use http::{Method, OutgoingRequest, Params};
pub use net::NetContext;
pub use resolver::{AddressCandidate, Endpoint};
pub use response::{IncomingResponse, ResponseReader};
