//! Scripted TCP peers shared by the socket-level integration tests.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use ors_core::Params;
use serde_json::Value;

pub const SCORE_RESPONSE: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 13\r\n\r\n{\"score\": 10}";

/// Accept one connection on an ephemeral port, hand it to `handler`, and
/// return the `host:port` url plus a channel carrying the request bytes the
/// handler observed.
pub fn serve_once<F>(handler: F) -> (String, mpsc::Receiver<Vec<u8>>)
where
    F: FnOnce(TcpStream) -> Vec<u8> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = listener.local_addr().unwrap().to_string();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let _ = tx.send(handler(stream));
    });
    (url, rx)
}

/// Read the request, then write each chunk with a short pause in between.
pub fn reply_with(chunks: Vec<Vec<u8>>) -> impl FnOnce(TcpStream) -> Vec<u8> + Send + 'static {
    move |mut stream| {
        let request = read_request(&mut stream);
        for chunk in chunks {
            stream.write_all(&chunk).unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_millis(5));
        }
        request
    }
}

/// Read the request and hang up without answering.
pub fn close_after_request() -> impl FnOnce(TcpStream) -> Vec<u8> + Send + 'static {
    |mut stream| read_request(&mut stream)
}

/// Read one request: the header block plus `Content-Length` body bytes.
pub fn read_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        if let Some(end) = header_end(&data) {
            let wanted = content_length(&data[..end]).unwrap_or(0);
            if data.len() >= end + wanted {
                return data;
            }
        }
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            return data;
        }
        data.extend_from_slice(&buf[..n]);
    }
}

pub fn header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn content_length(head: &[u8]) -> Option<usize> {
    String::from_utf8_lossy(head).lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("content-length")
            .then(|| value.trim().parse().ok())
            .flatten()
    })
}

pub fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// An address that is bound and then released, so connects are refused.
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = listener.local_addr().unwrap().to_string();
    drop(listener);
    url
}
