//! Normalized request configuration.
//!
//! # Design
//! `RequestConfig::whitelist` copies the fixed set of fields every verb
//! shares. Each verb then adds only what it needs (params, data, method, the
//! progress hook); anything else the caller set is dropped. Defaults for
//! method, timeout and response type are applied last, in `resolve`, so a
//! config can still tell "unset" apart from "set to the default".

use std::time::Duration;

use url::Url;

use crate::error::DispatchError;
use crate::http::{set_header, HttpMethod, HttpRequest, Pairs, ResponseType};
use crate::options::{Handlers, ProgressHandler, RequestOptions, StatusValidator};

pub const DEFAULT_METHOD: HttpMethod = HttpMethod::Get;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_RESPONSE_TYPE: ResponseType = ResponseType::Json;

/// Request configuration after a verb helper has shaped it.
#[derive(Default)]
pub struct RequestConfig {
    pub url: String,
    pub base_url: Option<String>,
    pub method: Option<HttpMethod>,
    pub headers: Pairs,
    pub params: Pairs,
    /// Already encoded for the wire.
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
    pub response_type: Option<ResponseType>,
    pub on_upload_progress: Option<ProgressHandler>,
    pub validate_status: Option<StatusValidator>,
    pub handlers: Handlers,
}

/// Fields of `RequestOptions` that the whitelist does not copy.
///
/// Verb helpers pick from these; whatever they leave is discarded.
#[derive(Default)]
pub struct Leftovers {
    pub method: Option<HttpMethod>,
    pub params: Pairs,
    pub data: Option<crate::payload::Payload>,
    pub on_upload_progress: Option<ProgressHandler>,
}

impl RequestConfig {
    /// Copy the shared whitelist out of `options`.
    pub fn whitelist(options: RequestOptions) -> (Self, Leftovers) {
        let RequestOptions {
            url,
            base_url,
            method,
            headers,
            params,
            data,
            timeout,
            response_type,
            on_upload_progress,
            validate_status,
            handlers,
        } = options;
        let config = Self {
            url,
            base_url,
            headers,
            timeout,
            response_type,
            validate_status,
            handlers,
            ..Default::default()
        };
        let leftovers = Leftovers {
            method,
            params,
            data,
            on_upload_progress,
        };
        (config, leftovers)
    }

    pub(crate) fn set_header(&mut self, name: &str, value: impl Into<String>) {
        set_header(&mut self.headers, name, value);
    }

    /// Apply defaults and build the request the transport will execute.
    pub fn resolve(&mut self) -> Result<HttpRequest, DispatchError> {
        let url = build_url(self.base_url.as_deref(), &self.url, &self.params)?;
        Ok(HttpRequest {
            method: self.method.unwrap_or(DEFAULT_METHOD),
            url,
            headers: self.headers.clone(),
            body: self.body.take(),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            response_type: self.response_type.unwrap_or(DEFAULT_RESPONSE_TYPE),
        })
    }
}

/// Join `base_url` and `url` and append `params` as a query string.
///
/// An absolute `url` ignores `base_url`, and a protocol-relative `//host/..`
/// takes only its scheme. Otherwise the two are joined with a single slash,
/// whatever slashes either side already carries.
pub fn build_url(base_url: Option<&str>, url: &str, params: &[(String, String)]) -> Result<String, DispatchError> {
    let mut parsed = match base_url {
        Some(base) if url.starts_with("//") => Url::parse(base)?.join(url)?,
        Some(base) if !is_absolute(url) => Url::parse(&combine(base, url))?,
        _ => Url::parse(url)?,
    };
    if !params.is_empty() {
        parsed.query_pairs_mut().extend_pairs(params.iter());
    }
    Ok(parsed.into())
}

fn combine(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

/// `scheme://...`.
fn is_absolute(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}
