//! Error types for the dispatcher and its transport seam.
//!
//! # Design
//! Nothing here is ever returned to the code that started a request. A
//! `DispatchError` is built on the transport-failure path and handed by
//! reference to `handle_error` (or the default handler). `Status` keeps the
//! rejected response so a handler can still look at what the server said.

use std::time::Duration;

use thiserror::Error;

use crate::http::HttpResponse;

/// Failures delivered to `handle_error`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The response status was rejected by `validate_status`.
    #[error("request failed with status code {status}")]
    Status {
        status: u16,
        response: Box<HttpResponse>,
    },

    #[error("timeout of {}ms exceeded", .0.as_millis())]
    Timeout(Duration),

    /// Connection, DNS or I/O failure reported by the transport.
    #[error("network error: {0}")]
    Network(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The payload cannot be encoded for the chosen verb.
    #[error("invalid payload: {0}")]
    Payload(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DispatchError {
    /// The response behind a status rejection, if any.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            DispatchError::Status { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures a `Transport` may report. Status codes are never errors here.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("timed out")]
    Timeout,

    #[error("{0}")]
    Network(String),
}

impl TransportError {
    pub(crate) fn into_dispatch(self, timeout: Duration) -> DispatchError {
        match self {
            TransportError::Timeout => DispatchError::Timeout(timeout),
            TransportError::Network(msg) => DispatchError::Network(msg),
        }
    }
}
