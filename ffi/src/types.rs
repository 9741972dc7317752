//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! The client handle is opaque; results come back in a single heap-allocated
//! envelope that the C caller releases with `ors_free_result`. Strings cross
//! the boundary as NUL-terminated `*mut c_char` owned by the envelope.

use std::ffi::CString;
use std::os::raw::c_char;

use ors_core::{ClientError, HttpClient, Method};
use serde_json::Value;

/// Opaque handle to an `HttpClient`. C callers receive a pointer to this
/// and pass it back into `ors_request`.
pub struct FfiOrsClient {
    pub(crate) inner: HttpClient,
}

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiMethod {
    Get = 0,
    Post = 1,
}

impl From<FfiMethod> for Method {
    fn from(m: FfiMethod) -> Self {
        match m {
            FfiMethod::Get => Method::Get,
            FfiMethod::Post => Method::Post,
        }
    }
}

/// Error codes returned in `FfiOrsResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    InvalidUrl = 1,
    Dns = 2,
    NoReachableCandidate = 3,
    Socket = 4,
    Connection = 5,
    Protocol = 6,
    Serialization = 7,
    InvalidParams = 8,
    NullArg = 9,
    Panic = 10,
}

impl From<&ClientError> for FfiErrorCode {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::InvalidUrl { .. } => FfiErrorCode::InvalidUrl,
            ClientError::Dns { .. } => FfiErrorCode::Dns,
            ClientError::NoReachableCandidate { .. } => FfiErrorCode::NoReachableCandidate,
            ClientError::Socket { .. } => FfiErrorCode::Socket,
            ClientError::Connection { .. } => FfiErrorCode::Connection,
            ClientError::Protocol(_) => FfiErrorCode::Protocol,
            ClientError::Serialization(_) => FfiErrorCode::Serialization,
        }
    }
}

/// Result envelope for `ors_request`.
///
/// On success `error_code` is `Ok` and `error_message` is null; `body` holds
/// the JSON text of a GET response, or is null for POST and for a GET whose
/// connect failed. On failure `body` is null and `error_message` describes
/// the problem.
#[repr(C)]
pub struct FfiOrsResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub body: *mut c_char,
}

impl FfiOrsResult {
    pub(crate) fn ok(body: Option<Value>) -> *mut Self {
        let body = match body {
            Some(value) => c_string(value.to_string()),
            None => std::ptr::null_mut(),
        };
        Self::boxed(FfiErrorCode::Ok, std::ptr::null_mut(), body)
    }

    pub(crate) fn from_error(err: &ClientError) -> *mut Self {
        Self::boxed(err.into(), c_string(err.to_string()), std::ptr::null_mut())
    }

    pub(crate) fn error(error_code: FfiErrorCode, msg: String) -> *mut Self {
        Self::boxed(error_code, c_string(msg), std::ptr::null_mut())
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        let msg = format!("null argument: {name}");
        Self::boxed(FfiErrorCode::NullArg, c_string(msg), std::ptr::null_mut())
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::Panic, c_string(msg.to_string()), std::ptr::null_mut())
    }

    fn boxed(error_code: FfiErrorCode, error_message: *mut c_char, body: *mut c_char) -> *mut Self {
        Box::into_raw(Box::new(FfiOrsResult {
            error_code,
            error_message,
            body,
        }))
    }
}

/// Hand a Rust string to C. Interior NULs cannot be represented and are dropped.
fn c_string(s: String) -> *mut c_char {
    let s = if s.contains('\0') { s.replace('\0', "") } else { s };
    CString::new(s).unwrap_or_default().into_raw()
}
