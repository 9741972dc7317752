//! Every request path must hand its socket back.
//!
//! `NetContext` counters are process-wide, so this binary holds a single test
//! and runs the scenarios one after another.

mod common;

use common::{close_after_request, params, refused_url, reply_with, serve_once, SCORE_RESPONSE};
use ors_core::{HttpClient, NetContext, Params};
use serde_json::json;

#[test]
fn sockets_are_released_on_every_path() {
    let net = NetContext::acquire();
    let client = HttpClient::new();
    let baseline = net.live_sockets();
    let opened_before = net.opened_sockets();

    // successful GET
    let (url, _) = serve_once(reply_with(vec![SCORE_RESPONSE.as_bytes().to_vec()]));
    assert!(client.get(&url, &Params::new()).unwrap().is_some());
    assert_eq!(net.live_sockets(), baseline);

    // GET whose peer hangs up
    let (url, _) = serve_once(close_after_request());
    assert!(client.get(&url, &Params::new()).is_err());
    assert_eq!(net.live_sockets(), baseline);

    // GET with an unacceptable body
    let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 4\r\n\r\nnope".to_vec();
    let (url, _) = serve_once(reply_with(vec![raw]));
    assert!(client.get(&url, &Params::new()).is_err());
    assert_eq!(net.live_sockets(), baseline);

    // POST
    let (url, request) = serve_once(close_after_request());
    client.post(&url, &params(json!({"score": 5}))).unwrap();
    request.recv().unwrap();
    assert_eq!(net.live_sockets(), baseline);

    // refused connects
    assert_eq!(client.get(&refused_url(), &Params::new()).unwrap(), None);
    assert!(client.post(&refused_url(), &Params::new()).is_err());
    assert_eq!(net.live_sockets(), baseline);

    assert_eq!(net.opened_sockets() - opened_before, 6);
}
