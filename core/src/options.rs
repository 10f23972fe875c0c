//! Caller-facing request options.
//!
//! # Design
//! Every optional callback is an explicit `Option<Box<dyn ...>>` field; the
//! dispatcher checks presence and calls. Handlers are `FnOnce` because an
//! options value is consumed by exactly one request and each handler runs at
//! most once. The two predicates and the progress hook can be called
//! repeatedly, so they are `Fn`/`FnMut`. Everything is `Send` so a whole call
//! can be moved to another thread.
//!
//! Fields are public and `RequestOptions` implements `Default`, so callers can
//! use struct-update syntax; the builder methods are shorthands for the same.

use std::fmt;
use std::time::Duration;

use crate::error::DispatchError;
use crate::http::{HttpMethod, HttpResponse, Pairs, ResponseData, ResponseType, UploadProgress};
use crate::payload::Payload;

pub type StatusValidator = Box<dyn Fn(u16) -> bool + Send>;
pub type ResponseValidator = Box<dyn FnOnce(&HttpResponse) -> bool + Send>;
pub type ResponseHandler = Box<dyn FnOnce(&HttpResponse) + Send>;
pub type HeadersHandler = Box<dyn FnOnce(&[(String, String)]) + Send>;
pub type DataHandler = Box<dyn FnOnce(&ResponseData) + Send>;
pub type ErrorHandler = Box<dyn FnOnce(&DispatchError) + Send>;
pub type ProgressHandler = Box<dyn FnMut(&UploadProgress) + Send>;

/// Options for a single request.
#[derive(Default)]
pub struct RequestOptions {
    pub url: String,
    pub base_url: Option<String>,
    /// Only honored by `Dispatcher::request`; the verb helpers pick their own.
    pub method: Option<HttpMethod>,
    pub headers: Pairs,
    pub params: Pairs,
    pub data: Option<Payload>,
    pub timeout: Option<Duration>,
    pub response_type: Option<ResponseType>,
    pub on_upload_progress: Option<ProgressHandler>,
    pub validate_status: Option<StatusValidator>,
    pub handlers: Handlers,
}

/// Response and error callbacks, each invoked only if present.
#[derive(Default)]
pub struct Handlers {
    /// Business validation. Returning false routes to the error-response handlers.
    pub validate_response: Option<ResponseValidator>,
    pub handle_response: Option<ResponseHandler>,
    /// Called on both the success and the error-response path.
    pub handle_response_headers: Option<HeadersHandler>,
    pub handle_response_data: Option<DataHandler>,
    pub handle_error_response: Option<ResponseHandler>,
    pub handle_error_response_data: Option<DataHandler>,
    pub handle_error: Option<ErrorHandler>,
}

impl RequestOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn data(mut self, data: impl Into<Payload>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn on_upload_progress(mut self, f: impl FnMut(&UploadProgress) + Send + 'static) -> Self {
        self.on_upload_progress = Some(Box::new(f));
        self
    }

    pub fn validate_status(mut self, f: impl Fn(u16) -> bool + Send + 'static) -> Self {
        self.validate_status = Some(Box::new(f));
        self
    }

    pub fn validate_response(mut self, f: impl FnOnce(&HttpResponse) -> bool + Send + 'static) -> Self {
        self.handlers.validate_response = Some(Box::new(f));
        self
    }

    pub fn on_response(mut self, f: impl FnOnce(&HttpResponse) + Send + 'static) -> Self {
        self.handlers.handle_response = Some(Box::new(f));
        self
    }

    pub fn on_response_headers(mut self, f: impl FnOnce(&[(String, String)]) + Send + 'static) -> Self {
        self.handlers.handle_response_headers = Some(Box::new(f));
        self
    }

    pub fn on_response_data(mut self, f: impl FnOnce(&ResponseData) + Send + 'static) -> Self {
        self.handlers.handle_response_data = Some(Box::new(f));
        self
    }

    pub fn on_error_response(mut self, f: impl FnOnce(&HttpResponse) + Send + 'static) -> Self {
        self.handlers.handle_error_response = Some(Box::new(f));
        self
    }

    pub fn on_error_response_data(mut self, f: impl FnOnce(&ResponseData) + Send + 'static) -> Self {
        self.handlers.handle_error_response_data = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&DispatchError) + Send + 'static) -> Self {
        self.handlers.handle_error = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("url", &self.url)
            .field("base_url", &self.base_url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .field("response_type", &self.response_type)
            .field("on_upload_progress", &self.on_upload_progress.is_some())
            .field("validate_status", &self.validate_status.is_some())
            .field("handlers", &self.handlers)
            .finish()
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("validate_response", &self.validate_response.is_some())
            .field("handle_response", &self.handle_response.is_some())
            .field("handle_response_headers", &self.handle_response_headers.is_some())
            .field("handle_response_data", &self.handle_response_data.is_some())
            .field("handle_error_response", &self.handle_error_response.is_some())
            .field("handle_error_response_data", &self.handle_error_response_data.is_some())
            .field("handle_error", &self.handle_error.is_some())
            .finish()
    }
}
