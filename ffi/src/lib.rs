//! C-ABI wrapper around `ors-core`.
//!
//! # Overview
//! Exposes the ranking client through `extern "C"` functions so C/C++ game
//! code can submit and query scores without knowing anything about Rust.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Parameters travel as a JSON object in a C string; the GET result comes
//!   back as JSON text inside a single `FfiOrsResult` envelope.
//! - The C caller owns all returned pointers and must call the matching
//!   `ors_*_free` / `ors_free_result` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;
use std::time::Duration;

use ors_core::{ClientConfig, HttpClient, Params};
use serde_json::Value;

use types::*;

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client configured from the `ORS_*` environment variables.
///
/// Returns null if an internal panic occurs. The caller must free the
/// returned pointer with `ors_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn ors_client_new() -> *mut FfiOrsClient {
    catch_unwind(|| into_handle(ClientConfig::from_env())).unwrap_or(std::ptr::null_mut())
}

/// Like `ors_client_new`, with the connect timeout set to `timeout_ms`.
/// A timeout of 0 makes connects block until the OS gives up.
#[unsafe(no_mangle)]
pub extern "C" fn ors_client_new_with_timeout(timeout_ms: u32) -> *mut FfiOrsClient {
    catch_unwind(|| {
        let config = ClientConfig::from_env().with_connect_timeout(Duration::from_millis(u64::from(timeout_ms)));
        into_handle(config)
    })
    .unwrap_or(std::ptr::null_mut())
}

fn into_handle(config: ClientConfig) -> *mut FfiOrsClient {
    Box::into_raw(Box::new(FfiOrsClient {
        inner: HttpClient::with_config(config),
    }))
}

/// Free a client created by `ors_client_new*`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn ors_client_free(client: *mut FfiOrsClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Issue `method` against `url` (`host[:port][/path]`).
///
/// `params_json` must be a JSON object or null (no parameters). For GET its
/// members become the query string; for POST it is the request body.
/// The result is never null; free it with `ors_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn ors_request(
    client: *const FfiOrsClient,
    url: *const c_char,
    method: FfiMethod,
    params_json: *const c_char,
) -> *mut FfiOrsResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiOrsResult::null_arg("client");
        }
        if url.is_null() {
            return FfiOrsResult::null_arg("url");
        }
        let client = unsafe { &*client };
        let Ok(url) = unsafe { CStr::from_ptr(url) }.to_str() else {
            return FfiOrsResult::error(FfiErrorCode::InvalidUrl, "url is not valid UTF-8".to_string());
        };
        let params = match parse_params(params_json) {
            Ok(params) => params,
            Err(reason) => return FfiOrsResult::error(FfiErrorCode::InvalidParams, format!("invalid params: {reason}")),
        };

        match client.inner.request(url, method.into(), &params) {
            Ok(body) => FfiOrsResult::ok(body),
            Err(e) => FfiOrsResult::from_error(&e),
        }
    })
    .unwrap_or_else(|_| FfiOrsResult::panic("panic in ors_request"))
}

fn parse_params(params_json: *const c_char) -> Result<Params, String> {
    if params_json.is_null() {
        return Ok(Params::new());
    }
    let text = unsafe { CStr::from_ptr(params_json) }
        .to_str()
        .map_err(|e| e.to_string())?;
    match serde_json::from_str(text).map_err(|e| e.to_string())? {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected a JSON object, got {other}")),
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiOrsResult` returned by `ors_request`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn ors_free_result(result: *mut FfiOrsResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.body.is_null() {
            drop(unsafe { CString::from_raw(result.body) });
        }
    });
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
