//! Verb helpers and the shared `send` primitive.
//!
//! # Design
//! `Dispatcher` holds a transport and, optionally, its own fallback; it keeps
//! no state between calls. Each verb helper shapes a `RequestConfig` from the
//! caller's options and hands it to `send`, which executes the request and
//! routes the outcome to exactly one of two channels:
//!
//! - transport failure (setup error, network error, timeout, or a status
//!   rejected by `validate_status`) → `handle_error`, else the fallback;
//! - a received response → business validation, then either the success
//!   handlers or the error-response handlers (else the fallback).
//!
//! Nothing is returned to the caller. Callbacks run on the calling thread
//! before the helper returns.

use std::sync::Arc;

use tracing::debug;

use crate::config::RequestConfig;
use crate::error::DispatchError;
use crate::fallback::{self, Fallback};
use crate::http::{HttpMethod, HttpResponse, UploadProgress};
use crate::options::{Handlers, RequestOptions};
use crate::payload::{self, JSON_CONTENT_TYPE};
use crate::transport::{Transport, UreqTransport};

const CONTENT_TYPE: &str = "Content-Type";

/// Callback-driven request dispatcher.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    fallback: Option<Arc<dyn Fallback>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(UreqTransport::new())
    }
}

impl Dispatcher {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            fallback: None,
        }
    }

    /// Use `fallback` instead of the process-wide one.
    pub fn with_fallback(mut self, fallback: Arc<dyn Fallback>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// GET with query params. The method is left unset and resolves to GET.
    pub fn get(&self, options: RequestOptions) {
        let (mut config, leftovers) = RequestConfig::whitelist(options);
        config.params = leftovers.params;
        self.send(config);
    }

    /// DELETE with query params.
    pub fn delete(&self, options: RequestOptions) {
        let (mut config, leftovers) = RequestConfig::whitelist(options);
        config.method = Some(HttpMethod::Delete);
        config.params = leftovers.params;
        self.send(config);
    }

    /// POST with a JSON body.
    pub fn post(&self, options: RequestOptions) {
        self.send_json(HttpMethod::Post, options);
    }

    /// PUT with a JSON body.
    pub fn put(&self, options: RequestOptions) {
        self.send_json(HttpMethod::Put, options);
    }

    /// POST with a multipart body, reporting upload progress.
    pub fn post_form_data(&self, options: RequestOptions) {
        let (mut config, leftovers) = RequestConfig::whitelist(options);
        config.method = Some(HttpMethod::Post);
        config.on_upload_progress = leftovers.on_upload_progress;

        let boundary = payload::boundary();
        let parts = payload::form_parts(leftovers.data);
        config.set_header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"));
        config.body = Some(payload::encode_multipart(&parts, &boundary));
        self.send(config);
    }

    /// Any method, with every option honored. A payload is JSON-encoded and
    /// labeled as JSON only when it produces a body.
    pub fn request(&self, options: RequestOptions) {
        let (mut config, leftovers) = RequestConfig::whitelist(options);
        config.method = leftovers.method;
        config.params = leftovers.params;
        config.on_upload_progress = leftovers.on_upload_progress;
        match payload::encode_json(leftovers.data) {
            Ok(Some(body)) => {
                config.set_header(CONTENT_TYPE, JSON_CONTENT_TYPE);
                config.body = Some(body);
            }
            Ok(None) => {}
            Err(err) => return self.fail(config.handlers, err),
        }
        self.send(config);
    }

    fn send_json(&self, method: HttpMethod, options: RequestOptions) {
        let (mut config, leftovers) = RequestConfig::whitelist(options);
        config.method = Some(method);
        config.set_header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        match payload::encode_json(leftovers.data) {
            Ok(body) => config.body = body,
            Err(err) => return self.fail(config.handlers, err),
        }
        self.send(config);
    }

    /// Execute `config` and route the outcome to its callbacks.
    pub fn send(&self, mut config: RequestConfig) {
        let request = match config.resolve() {
            Ok(request) => request,
            Err(err) => return self.fail(config.handlers, err),
        };
        debug!(method = %request.method, url = %request.url, "dispatching request");

        let fallback = self.fallback();
        let mut on_progress = config.on_upload_progress.take();
        let mut progress = |p: UploadProgress| match on_progress.as_mut() {
            Some(f) => f(&p),
            None => fallback.on_upload_progress(&p),
        };

        let raw = match self.transport.execute(&request, &mut progress) {
            Ok(raw) => raw,
            Err(err) => return self.fail(config.handlers, err.into_dispatch(request.timeout)),
        };
        let response = HttpResponse::from_raw(raw, request.response_type);

        let status_ok = match &config.validate_status {
            Some(validate) => validate(response.status),
            None => is_ok_status(response.status),
        };
        if !status_ok {
            let err = DispatchError::Status {
                status: response.status,
                response: Box::new(response),
            };
            return self.fail(config.handlers, err);
        }

        self.route_response(config.handlers, &response);
    }

    /// Business validation and success/error-response dispatch.
    fn route_response(&self, handlers: Handlers, response: &HttpResponse) {
        if !validate_globally(response) {
            return;
        }
        let Handlers {
            validate_response,
            handle_response,
            handle_response_headers,
            handle_response_data,
            handle_error_response,
            handle_error_response_data,
            handle_error: _,
        } = handlers;

        let valid = validate_response.map_or(true, |validate| validate(response));
        if valid {
            if let Some(f) = handle_response {
                f(response);
            }
            if let Some(f) = handle_response_headers {
                f(&response.headers);
            }
            if let Some(f) = handle_response_data {
                f(&response.data);
            }
        } else if handle_error_response.is_some() || handle_error_response_data.is_some() {
            if let Some(f) = handle_error_response {
                f(response);
            }
            if let Some(f) = handle_response_headers {
                f(&response.headers);
            }
            if let Some(f) = handle_error_response_data {
                f(&response.data);
            }
        } else {
            self.fallback().on_error_data(&response.data);
        }
    }

    fn fail(&self, handlers: Handlers, err: DispatchError) {
        debug!(error = %err, "request failed");
        match handlers.handle_error {
            Some(f) => f(&err),
            None => self.fallback().on_error(&err),
        }
    }

    fn fallback(&self) -> Arc<dyn Fallback> {
        match &self.fallback {
            Some(fallback) => fallback.clone(),
            None => fallback::global(),
        }
    }
}

/// Default `validate_status`: any 2xx.
pub fn is_ok_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Validation applied to every response before the caller's own.
fn validate_globally(_response: &HttpResponse) -> bool {
    true
}
