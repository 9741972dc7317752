//! Endpoint parsing and IPv4 address resolution.
//!
//! # Design
//! A url is split into an `Endpoint` at the *last* `:` of its authority, so
//! IPv6 literals are not supported; this client only speaks IPv4.
//!
//! Resolution asks the system resolver for the host's addresses and keeps the
//! IPv4 ones. Candidates are probed with a short connect before one is chosen;
//! `CandidateSelection` decides whether the probe results matter.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};

use socket2::{Domain, Protocol, Type};

use crate::config::{CandidateSelection, ClientConfig};
use crate::connection::Connection;
use crate::error::ClientError;

pub const DEFAULT_PORT: u16 = 80;

/// Host and TCP port of the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host[:port]`, defaulting the port to 80.
    pub fn parse(authority: &str) -> Result<Self, ClientError> {
        parse_authority(authority, authority)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Split `[http://]host[:port][/path]` into an endpoint and a request path.
/// The path defaults to `/`.
pub fn split_url(url: &str) -> Result<(Endpoint, String), ClientError> {
    let trimmed = url.trim();
    let rest = match trimmed.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("http") => rest,
        Some((scheme, _)) => {
            return Err(ClientError::invalid_url(url, format!("unsupported scheme '{scheme}'")));
        }
        None => trimmed,
    };

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };

    Ok((parse_authority(url, authority)?, path.to_string()))
}

fn parse_authority(url: &str, authority: &str) -> Result<Endpoint, ClientError> {
    let (host, port) = match authority.rfind(':') {
        Some(i) => {
            let port = authority[i + 1..]
                .parse::<u16>()
                .map_err(|_| ClientError::invalid_url(url, format!("invalid port '{}'", &authority[i + 1..])))?;
            (&authority[..i], port)
        }
        None => (authority, DEFAULT_PORT),
    };

    if host.is_empty() {
        return Err(ClientError::invalid_url(url, "missing host"));
    }
    Ok(Endpoint::new(host, port))
}

/// One resolved address and the socket parameters needed to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCandidate {
    pub addr: SocketAddr,
    pub family: Domain,
    pub socket_type: Type,
    pub protocol: Protocol,
    /// Name the address was looked up under.
    pub canonical_name: String,
}

impl AddressCandidate {
    pub fn ipv4_tcp(addr: SocketAddr, name: &str) -> Self {
        Self {
            addr,
            family: Domain::IPV4,
            socket_type: Type::STREAM,
            protocol: Protocol::TCP,
            canonical_name: name.to_string(),
        }
    }
}

/// Look up every IPv4/TCP address of `endpoint`, in resolver order.
pub fn lookup(endpoint: &Endpoint) -> Result<Vec<AddressCandidate>, ClientError> {
    let dns_error = |reason: String| ClientError::Dns {
        host: endpoint.host().to_string(),
        reason,
    };

    let addrs = (endpoint.host(), endpoint.port())
        .to_socket_addrs()
        .map_err(|e| dns_error(e.to_string()))?;

    let mut candidates: Vec<AddressCandidate> = Vec::new();
    for addr in addrs.filter(SocketAddr::is_ipv4) {
        if !candidates.iter().any(|c| c.addr == addr) {
            candidates.push(AddressCandidate::ipv4_tcp(addr, endpoint.host()));
        }
    }

    if candidates.is_empty() {
        return Err(dns_error("no IPv4 address records".to_string()));
    }
    tracing::debug!("resolved {endpoint} to {} candidate(s)", candidates.len());
    Ok(candidates)
}

/// Resolve `endpoint` and pick one candidate according to `config`.
pub fn resolve(endpoint: &Endpoint, config: &ClientConfig) -> Result<AddressCandidate, ClientError> {
    select(endpoint, lookup(endpoint)?, config)
}

fn select(
    endpoint: &Endpoint,
    candidates: Vec<AddressCandidate>,
    config: &ClientConfig,
) -> Result<AddressCandidate, ClientError> {
    let attempted = candidates.len();
    let no_candidate = || ClientError::NoReachableCandidate {
        host: endpoint.host().to_string(),
        attempted,
    };

    match config.candidate_selection {
        CandidateSelection::FirstRecord => {
            for candidate in &candidates {
                probe(candidate, config);
            }
            candidates.into_iter().next().ok_or_else(no_candidate)
        }
        CandidateSelection::FirstReachable if attempted == 1 => {
            candidates.into_iter().next().ok_or_else(no_candidate)
        }
        CandidateSelection::FirstReachable => candidates
            .into_iter()
            .find(|candidate| probe(candidate, config))
            .ok_or_else(no_candidate),
    }
}

/// Open a throwaway socket to `candidate` and report whether it accepted.
fn probe(candidate: &AddressCandidate, config: &ClientConfig) -> bool {
    let mut conn = match Connection::for_candidate(candidate) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::debug!("probe of {} skipped: {e}", candidate.addr);
            return false;
        }
    };
    let alive = match conn.connect(candidate, config.probe_timeout) {
        Ok(alive) => alive,
        Err(e) => {
            tracing::debug!("probe of {} failed: {e}", candidate.addr);
            false
        }
    };
    conn.close();
    tracing::debug!("probe of {} ({}): alive={alive}", candidate.addr, candidate.canonical_name);
    alive
}
