//! End-to-end behaviour over real sockets against scripted peers.
//!
//! Each test binds an ephemeral port, lets a helper thread play the server
//! side byte for byte, and checks both what the client sent and what it made
//! of the reply.

mod common;

use std::time::{Duration, Instant};

use common::{close_after_request, header_end, params, refused_url, reply_with, serve_once, SCORE_RESPONSE};
use ors_core::{
    AddressCandidate, ClientConfig, ClientError, Connection, HttpClient, Method, Params, ProtocolError,
};
use serde_json::{json, Value};

/// Routed nowhere on typical networks; connects either hang or fail fast.
const BLACKHOLE: &str = "10.255.255.1:80";

#[test]
fn get_returns_parsed_json_body() {
    let (url, request) = serve_once(reply_with(vec![SCORE_RESPONSE.as_bytes().to_vec()]));

    let value = HttpClient::new().request(&url, Method::Get, &Params::new()).unwrap();
    assert_eq!(value, Some(json!({"score": 10})));

    let sent = String::from_utf8(request.recv().unwrap()).unwrap();
    assert_eq!(sent, format!("GET / HTTP/1.1\r\nHost: {url}\r\n\r\n"));
}

#[test]
fn get_sends_params_as_query_string() {
    let (url, request) = serve_once(reply_with(vec![SCORE_RESPONSE.as_bytes().to_vec()]));

    let query = params(json!({"limit": "3", "uuid": "abc"}));
    HttpClient::new().get(&format!("http://{url}/ranking"), &query).unwrap();

    let sent = String::from_utf8(request.recv().unwrap()).unwrap();
    assert!(sent.starts_with("GET /ranking?limit=3&uuid=abc HTTP/1.1\r\n"), "{sent}");
}

#[test]
fn chunked_delivery_matches_single_write() {
    let bytes = SCORE_RESPONSE.as_bytes();
    let chunks: Vec<Vec<u8>> = bytes.chunks(7).map(<[u8]>::to_vec).collect();
    let (url, _) = serve_once(reply_with(chunks));

    let value = HttpClient::new().get(&url, &Params::new()).unwrap();
    assert_eq!(value, Some(json!({"score": 10})));
}

#[test]
fn peer_closing_without_reply_is_incomplete() {
    let (url, _) = serve_once(close_after_request());

    let err = HttpClient::new().get(&url, &Params::new()).unwrap_err();
    assert!(
        matches!(err, ClientError::Protocol(ProtocolError::IncompleteResponse)),
        "{err}"
    );
}

#[test]
fn missing_content_length_is_incomplete() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{\"score\": 10}".to_vec();
    let (url, _) = serve_once(reply_with(vec![raw]));

    let err = HttpClient::new().get(&url, &Params::new()).unwrap_err();
    assert!(
        matches!(err, ClientError::Protocol(ProtocolError::IncompleteResponse)),
        "{err}"
    );
}

#[test]
fn text_plain_is_rejected() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 13\r\n\r\n{\"score\": 10}".to_vec();
    let (url, _) = serve_once(reply_with(vec![raw]));

    let err = HttpClient::new().get(&url, &Params::new()).unwrap_err();
    assert!(
        matches!(err, ClientError::Protocol(ProtocolError::UnsupportedContentType(_))),
        "{err}"
    );
}

#[test]
fn post_sends_framed_json_and_returns_without_reading() {
    let (url, request) = serve_once(close_after_request());
    let body = params(json!({"score": 250, "user_name": "myname", "uuid": "6f1c"}));

    let result = HttpClient::new().request(&url, Method::Post, &body).unwrap();
    assert_eq!(result, None);

    let sent = request.recv().unwrap();
    let end = header_end(&sent).unwrap();
    let head = String::from_utf8(sent[..end].to_vec()).unwrap();
    let payload = &sent[end..];

    assert!(head.starts_with(&format!("POST / HTTP/1.1\r\nHost: {url}\r\n")), "{head}");
    assert!(head.contains("Content-Type: application/json\r\n"));
    assert!(head.contains(&format!("Content-Length: {}\r\n", payload.len())));
    let reparsed: Value = serde_json::from_slice(payload).unwrap();
    assert_eq!(reparsed, Value::Object(body));
}

#[test]
fn refused_connect_is_empty_for_get_and_an_error_for_post() {
    let client = HttpClient::new();

    let value = client.request(&refused_url(), Method::Get, &Params::new()).unwrap();
    assert_eq!(value, None);

    let err = client.request(&refused_url(), Method::Post, &Params::new()).unwrap_err();
    assert!(matches!(err, ClientError::Connection { .. }), "{err}");
}

#[test]
fn timed_connect_to_blackhole_is_bounded() {
    let addr = BLACKHOLE.parse().unwrap();
    let candidate = AddressCandidate::ipv4_tcp(addr, "blackhole");
    let mut conn = Connection::for_candidate(&candidate).unwrap();

    let started = Instant::now();
    let outcome = conn.connect(&candidate, Duration::from_millis(200));
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_millis(1500), "took {elapsed:?}");
    match outcome {
        Ok(connected) => {
            assert!(!connected);
            assert!(elapsed >= Duration::from_millis(150), "returned after {elapsed:?}");
        }
        // Sandboxes without a route report unreachable networks immediately.
        Err(err) => assert!(matches!(err, ClientError::Connection { .. }), "{err}"),
    }
}

#[test]
fn get_connect_timeout_yields_no_result() {
    let client = HttpClient::with_config(ClientConfig::default().with_connect_timeout(Duration::from_millis(200)));

    let started = Instant::now();
    let value = client.get(BLACKHOLE, &Params::new()).unwrap();
    assert!(started.elapsed() < Duration::from_millis(1500));
    assert_eq!(value, None);
}

#[test]
fn post_connect_timeout_is_an_error() {
    let client = HttpClient::with_config(ClientConfig::default().with_connect_timeout(Duration::from_millis(200)));

    let err = client
        .post(BLACKHOLE, &params(json!({"score": 1})))
        .unwrap_err();
    assert!(matches!(err, ClientError::Connection { .. }), "{err}");
}
