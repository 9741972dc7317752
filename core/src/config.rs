//! Client tuning knobs.
//!
//! Defaults reproduce the reference client: a 5 s connect timeout, 1 s liveness
//! probes and at most 1024 receive calls per response. `from_env` lets a host
//! application override them without recompiling.

use std::time::Duration;

/// Timeout applied to the real connect of every request.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Timeout applied to each liveness probe during resolution.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Upper bound on `receive()` calls spent assembling one response.
pub const DEFAULT_MAX_RECEIVE_ITERATIONS: usize = 1024;

/// Upper bound on the bytes accumulated for one response.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// How the resolver picks among several address records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CandidateSelection {
    /// Probe every record for diagnostics, then return the first record
    /// whatever the probes said.
    FirstRecord,
    /// Return the first record that answered its probe; fail if none did.
    #[default]
    FirstReachable,
}

impl CandidateSelection {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first-record" => Some(CandidateSelection::FirstRecord),
            "first-reachable" => Some(CandidateSelection::FirstReachable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Zero means a blocking connect with no timeout.
    pub connect_timeout: Duration,
    pub probe_timeout: Duration,
    pub candidate_selection: CandidateSelection,
    pub max_receive_iterations: usize,
    pub max_response_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            candidate_selection: CandidateSelection::default(),
            max_receive_iterations: DEFAULT_MAX_RECEIVE_ITERATIONS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl ClientConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_candidate_selection(mut self, selection: CandidateSelection) -> Self {
        self.candidate_selection = selection;
        self
    }

    pub fn with_max_receive_iterations(mut self, iterations: usize) -> Self {
        self.max_receive_iterations = iterations;
        self
    }

    pub fn with_max_response_bytes(mut self, bytes: usize) -> Self {
        self.max_response_bytes = bytes;
        self
    }

    /// Build a config from `ORS_*` environment variables, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var(&lookup, "ORS_CONNECT_TIMEOUT_MS", |v| v.parse::<u64>().ok()) {
            config.connect_timeout = Duration::from_millis(ms);
        }
        // A zero probe timeout would turn the probe into a blocking connect.
        if let Some(ms) = parse_var(&lookup, "ORS_PROBE_TIMEOUT_MS", |v| {
            v.parse::<u64>().ok().filter(|ms| *ms > 0)
        }) {
            config.probe_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var(&lookup, "ORS_MAX_RECEIVE_ITERATIONS", |v| {
            v.parse::<usize>().ok().filter(|n| *n > 0)
        }) {
            config.max_receive_iterations = n;
        }
        if let Some(n) = parse_var(&lookup, "ORS_MAX_RESPONSE_BYTES", |v| {
            v.parse::<usize>().ok().filter(|n| *n > 0)
        }) {
            config.max_response_bytes = n;
        }
        if let Some(selection) = parse_var(&lookup, "ORS_CANDIDATE_SELECTION", CandidateSelection::parse) {
            config.candidate_selection = selection;
        }

        config
    }
}

fn parse_var<F, T, P>(lookup: &F, key: &str, parse: P) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let raw = lookup(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        tracing::warn!("ignoring invalid value {raw:?} for {key}");
    }
    parsed
}
