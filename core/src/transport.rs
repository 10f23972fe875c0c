//! The seam between the dispatcher and the library that does network I/O.
//!
//! # Design
//! A `Transport` executes one fully resolved `HttpRequest` and returns the
//! status, headers and raw body. It never judges status codes; a 500 is a
//! perfectly good `RawResponse`. Timeouts and connection failures are the
//! only errors it reports.
//!
//! `UreqTransport` is the stock implementation. It builds an agent per
//! request so each call gets its own global timeout, and turns off ureq's
//! status-as-error behavior so every status comes back as data.

use std::io;

use tracing::debug;

use crate::error::TransportError;
use crate::http::{HttpRequest, Pairs, RawResponse, UploadProgress};

/// Executes HTTP requests.
pub trait Transport: Send + Sync {
    /// Perform `request`, reporting body upload progress to `progress`.
    fn execute(
        &self,
        request: &HttpRequest,
        progress: &mut dyn FnMut(UploadProgress),
    ) -> Result<RawResponse, TransportError>;
}

/// Blocking transport backed by `ureq`.
#[derive(Debug, Default, Clone)]
pub struct UreqTransport {
    _private: (),
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn agent(&self, request: &HttpRequest) -> ureq::Agent {
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(request.timeout))
            .build()
            .new_agent()
    }
}

impl Transport for UreqTransport {
    fn execute(
        &self,
        request: &HttpRequest,
        progress: &mut dyn FnMut(UploadProgress),
    ) -> Result<RawResponse, TransportError> {
        let agent = self.agent(request);

        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let result = match &request.body {
            Some(body) => {
                let total = body.len() as u64;
                progress(UploadProgress { loaded: 0, total });
                let req = builder.body(body.as_slice()).map_err(invalid_request)?;
                let result = agent.run(req);
                if result.is_ok() {
                    progress(UploadProgress { loaded: total, total });
                }
                result
            }
            None => {
                let req = builder.body(()).map_err(invalid_request)?;
                agent.run(req)
            }
        };
        let mut response = result.map_err(from_ureq)?;

        let status = response.status().as_u16();
        let headers: Pairs = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.body_mut().read_to_vec().map_err(from_ureq)?;
        debug!(status, bytes = body.len(), url = %request.url, "response received");

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn invalid_request(err: ureq::http::Error) -> TransportError {
    TransportError::Network(format!("invalid request: {err}"))
}

fn from_ureq(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(e) if e.kind() == io::ErrorKind::TimedOut => TransportError::Timeout,
        other => TransportError::Network(other.to_string()),
    }
}
