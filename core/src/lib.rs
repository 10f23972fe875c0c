//! Callback-driven convenience layer over a blocking HTTP client.
//!
//! # Overview
//! Callers describe a request with `RequestOptions` (URL, headers, payload,
//! timeout, response type) plus optional callbacks, then call one of the verb
//! helpers. The helper normalizes the options, encodes the payload (JSON or
//! multipart), runs the request through a `Transport`, and routes the result
//! to the callbacks. Nothing is returned; unhandled outcomes go to a
//! replaceable `Fallback` that logs them.
//!
//! # Design
//! - `Dispatcher` is stateless apart from its transport and fallback; cloning
//!   it is cheap and calls never interact.
//! - The transport boundary is a trait taking a fully resolved `HttpRequest`,
//!   so dispatch logic is tested without a network.
//! - Form payloads are classified into `FormPart` variants before encoding.
//! - The free functions below use a process-wide dispatcher backed by `ureq`.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fallback;
pub mod http;
pub mod options;
pub mod payload;
pub mod transport;

use once_cell::sync::Lazy;

pub use config::{RequestConfig, DEFAULT_RESPONSE_TYPE, DEFAULT_TIMEOUT};
pub use dispatcher::{is_ok_status, Dispatcher};
pub use error::{DispatchError, TransportError};
pub use fallback::{Fallback, LogFallback};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RawResponse, ResponseData, ResponseType, UploadProgress};
pub use options::{Handlers, RequestOptions};
pub use payload::{FilePart, FormData, FormPart, FormValue, Payload};
pub use transport::{Transport, UreqTransport};

static DEFAULT_DISPATCHER: Lazy<Dispatcher> = Lazy::new(Dispatcher::default);

/// `Dispatcher::get` on the process-wide dispatcher.
pub fn get(options: RequestOptions) {
    DEFAULT_DISPATCHER.get(options)
}

/// `Dispatcher::post` on the process-wide dispatcher.
pub fn post(options: RequestOptions) {
    DEFAULT_DISPATCHER.post(options)
}

/// `Dispatcher::post_form_data` on the process-wide dispatcher.
pub fn post_form_data(options: RequestOptions) {
    DEFAULT_DISPATCHER.post_form_data(options)
}

/// `Dispatcher::put` on the process-wide dispatcher.
pub fn put(options: RequestOptions) {
    DEFAULT_DISPATCHER.put(options)
}

/// `Dispatcher::delete` on the process-wide dispatcher.
pub fn delete(options: RequestOptions) {
    DEFAULT_DISPATCHER.delete(options)
}

/// `Dispatcher::request` on the process-wide dispatcher.
pub fn request(options: RequestOptions) {
    DEFAULT_DISPATCHER.request(options)
}
