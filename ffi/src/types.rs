//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Options come in as borrowed C data: strings are NUL-terminated, lists are
//! pointer + length, and every callback is a nullable function pointer that
//! receives the caller's `user_data`. Responses go out as borrowed views
//! (`FfiResponse`, `FfiError`) that live only for the duration of the
//! callback, so nothing crossing the boundary needs a matching free call.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use launcher_core::{DispatchError, Dispatcher, HttpResponse, ResponseType};

/// Opaque handle to a `Dispatcher`.
pub struct FfiDispatcher {
    pub(crate) inner: Dispatcher,
}

/// A single header or query parameter.
#[repr(C)]
pub struct FfiPair {
    pub key: *const c_char,
    pub value: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiResponseType {
    Json = 0,
    Text = 1,
    Bytes = 2,
}

impl From<FfiResponseType> for ResponseType {
    fn from(t: FfiResponseType) -> Self {
        match t {
            FfiResponseType::Json => ResponseType::Json,
            FfiResponseType::Text => ResponseType::Text,
            FfiResponseType::Bytes => ResponseType::Bytes,
        }
    }
}

/// How a form field's bytes should be sent.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiFormKind {
    /// UTF-8 text sent as a plain part.
    Scalar = 0,
    /// A JSON document sent as an `application/json` part.
    Json = 1,
    /// A file sent with `filename` and `content_type`.
    File = 2,
}

#[repr(C)]
pub struct FfiFormField {
    pub name: *const c_char,
    pub kind: FfiFormKind,
    pub value: *const u8,
    pub value_len: usize,
    /// Only read for `File`.
    pub filename: *const c_char,
    /// Only read for `File`; defaults to `application/octet-stream`.
    pub content_type: *const c_char,
}

/// Borrowed view of a response, valid only during the callback.
#[repr(C)]
pub struct FfiResponse {
    pub status: u16,
    pub headers: *const FfiPair,
    pub headers_len: u32,
    pub body: *const u8,
    pub body_len: usize,
}

/// Codes returned by entry points (argument problems) and carried by
/// `FfiError` (request failures).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    NullArg = 1,
    InvalidUtf8 = 2,
    InvalidJson = 3,
    Panic = 4,
    Status = 5,
    Timeout = 6,
    Network = 7,
    InvalidUrl = 8,
    Payload = 9,
    Serialization = 10,
}

/// Borrowed view of a request failure, valid only during the callback.
///
/// `response` is non-null only for `Status` errors.
#[repr(C)]
pub struct FfiError {
    pub code: FfiErrorCode,
    pub message: *const c_char,
    pub http_status: u16,
    pub response: *const FfiResponse,
}

pub type FfiStatusValidator = Option<extern "C" fn(status: u16, user_data: *mut c_void) -> bool>;
pub type FfiResponseValidator = Option<extern "C" fn(response: *const FfiResponse, user_data: *mut c_void) -> bool>;
pub type FfiResponseCallback = Option<extern "C" fn(response: *const FfiResponse, user_data: *mut c_void)>;
pub type FfiHeadersCallback = Option<extern "C" fn(headers: *const FfiPair, len: u32, user_data: *mut c_void)>;
pub type FfiDataCallback = Option<extern "C" fn(data: *const u8, len: usize, user_data: *mut c_void)>;
pub type FfiErrorCallback = Option<extern "C" fn(error: *const FfiError, user_data: *mut c_void)>;
pub type FfiProgressCallback = Option<extern "C" fn(loaded: u64, total: u64, user_data: *mut c_void)>;

/// Request options as C data. Null pointers mean "absent"; `timeout_ms == 0`
/// means the default timeout. When `form_fields_len > 0` the form fields are
/// the payload and `data_json` is ignored.
#[repr(C)]
pub struct FfiRequestOptions {
    pub url: *const c_char,
    pub base_url: *const c_char,
    pub headers: *const FfiPair,
    pub headers_len: u32,
    pub params: *const FfiPair,
    pub params_len: u32,
    pub data_json: *const c_char,
    pub form_fields: *const FfiFormField,
    pub form_fields_len: u32,
    pub timeout_ms: u64,
    pub response_type: FfiResponseType,
    pub user_data: *mut c_void,
    pub validate_status: FfiStatusValidator,
    pub validate_response: FfiResponseValidator,
    pub handle_response: FfiResponseCallback,
    pub handle_response_headers: FfiHeadersCallback,
    pub handle_response_data: FfiDataCallback,
    pub handle_error_response: FfiResponseCallback,
    pub handle_error_response_data: FfiDataCallback,
    pub handle_error: FfiErrorCallback,
    pub on_upload_progress: FfiProgressCallback,
}

/// Owns C copies of header pairs for as long as the view is alive.
pub(crate) struct PairsView {
    _strings: Vec<CString>,
    pairs: Vec<FfiPair>,
}

impl PairsView {
    pub(crate) fn new(headers: &[(String, String)]) -> Self {
        let mut strings = Vec::with_capacity(headers.len() * 2);
        let mut pairs = Vec::with_capacity(headers.len());
        for (k, v) in headers {
            let key = c_string(k);
            let value = c_string(v);
            pairs.push(FfiPair {
                key: key.as_ptr(),
                value: value.as_ptr(),
            });
            strings.push(key);
            strings.push(value);
        }
        Self {
            _strings: strings,
            pairs,
        }
    }

    pub(crate) fn as_ptr(&self) -> *const FfiPair {
        if self.pairs.is_empty() {
            std::ptr::null()
        } else {
            self.pairs.as_ptr()
        }
    }

    pub(crate) fn len(&self) -> u32 {
        self.pairs.len() as u32
    }
}

/// Owns everything an `FfiResponse` points at.
pub(crate) struct ResponseView {
    _headers: PairsView,
    _body: Vec<u8>,
    pub(crate) raw: FfiResponse,
}

impl ResponseView {
    pub(crate) fn new(response: &HttpResponse) -> Self {
        let headers = PairsView::new(&response.headers);
        let body = response.data.to_bytes();
        let raw = FfiResponse {
            status: response.status,
            headers: headers.as_ptr(),
            headers_len: headers.len(),
            body: bytes_ptr(&body),
            body_len: body.len(),
        };
        Self {
            _headers: headers,
            _body: body,
            raw,
        }
    }
}

/// Owns everything an `FfiError` points at.
pub(crate) struct ErrorView {
    _message: CString,
    _response: Option<Box<ResponseView>>,
    pub(crate) raw: FfiError,
}

impl ErrorView {
    pub(crate) fn new(err: &DispatchError) -> Self {
        let code = match err {
            DispatchError::Status { .. } => FfiErrorCode::Status,
            DispatchError::Timeout(_) => FfiErrorCode::Timeout,
            DispatchError::Network(_) => FfiErrorCode::Network,
            DispatchError::InvalidUrl(_) => FfiErrorCode::InvalidUrl,
            DispatchError::Payload(_) => FfiErrorCode::Payload,
            DispatchError::Serialization(_) => FfiErrorCode::Serialization,
        };
        let message = c_string(&err.to_string());
        let response = err.response().map(|r| Box::new(ResponseView::new(r)));
        let raw = FfiError {
            code,
            message: message.as_ptr(),
            http_status: err.status().unwrap_or(0),
            response: response
                .as_ref()
                .map_or(std::ptr::null(), |view| &view.raw as *const FfiResponse),
        };
        Self {
            _message: message,
            _response: response,
            raw,
        }
    }
}

pub(crate) fn bytes_ptr(bytes: &[u8]) -> *const u8 {
    if bytes.is_empty() {
        std::ptr::null()
    } else {
        bytes.as_ptr()
    }
}

/// Interior NULs cannot be represented; such strings are cut at the first NUL.
pub(crate) fn c_string(s: &str) -> CString {
    let end = s.find('\0').unwrap_or(s.len());
    CString::new(&s[..end]).unwrap_or_default()
}
