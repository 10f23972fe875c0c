//! HTTP types exchanged between the dispatcher and its transport.
//!
//! # Design
//! Requests and responses are plain data. The dispatcher resolves an
//! `HttpRequest` completely (absolute URL, final headers, encoded body) before
//! handing it to a `Transport`, and the transport answers with a
//! `RawResponse` of undecoded bytes. Decoding into `ResponseData` happens back
//! in the dispatcher according to the request's `ResponseType`, so every
//! transport behaves identically with respect to body interpretation.
//!
//! Headers are ordered `(name, value)` pairs with owned `String`s so they can
//! be handed across the C boundary without lifetime concerns.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ordered header or query pairs.
pub type Pairs = Vec<(String, String)>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Patch,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the response body should be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    Bytes,
}

/// A fully resolved request, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Pairs,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
    pub response_type: ResponseType,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// What a transport hands back: status, headers, and the undecoded body.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Pairs,
    pub body: Vec<u8>,
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
    Empty,
}

impl ResponseData {
    /// Decode `body` according to `response_type`.
    ///
    /// A JSON response whose body does not parse is kept as text rather than
    /// dropped, so callers can still inspect what the server sent.
    pub fn decode(body: Vec<u8>, response_type: ResponseType) -> Self {
        if body.is_empty() {
            return ResponseData::Empty;
        }
        match response_type {
            ResponseType::Bytes => ResponseData::Bytes(body),
            ResponseType::Json => match serde_json::from_slice(&body) {
                Ok(value) => ResponseData::Json(value),
                Err(_) => ResponseData::Text(String::from_utf8_lossy(&body).into_owned()),
            },
            ResponseType::Text => match String::from_utf8(body) {
                Ok(text) => ResponseData::Text(text),
                Err(e) => ResponseData::Text(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            },
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Re-encode the data as bytes (JSON is serialized compactly).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ResponseData::Json(value) => value.to_string().into_bytes(),
            ResponseData::Text(text) => text.clone().into_bytes(),
            ResponseData::Bytes(bytes) => bytes.clone(),
            ResponseData::Empty => Vec::new(),
        }
    }
}

/// A decoded response, handed read-only to the caller's callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Pairs,
    pub data: ResponseData,
}

impl HttpResponse {
    pub fn from_raw(raw: RawResponse, response_type: ResponseType) -> Self {
        Self {
            status: raw.status,
            headers: raw.headers,
            data: ResponseData::decode(raw.body, response_type),
        }
    }

    /// Case-insensitive header lookup; returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Bytes of the request body handed to the transport so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Set `name` to `value`, replacing any existing entries of that name.
pub(crate) fn set_header(headers: &mut Pairs, name: &str, value: impl Into<String>) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.into()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_body_decodes_to_value() {
        let data = ResponseData::decode(br#"{"id":1}"#.to_vec(), ResponseType::Json);
        assert_eq!(data, ResponseData::Json(json!({"id": 1})));
    }

    #[test]
    fn invalid_json_falls_back_to_text() {
        let data = ResponseData::decode(b"plain words".to_vec(), ResponseType::Json);
        assert_eq!(data.as_text(), Some("plain words"));
    }

    #[test]
    fn empty_body_is_empty_for_every_type() {
        for ty in [ResponseType::Json, ResponseType::Text, ResponseType::Bytes] {
            assert_eq!(ResponseData::decode(Vec::new(), ty), ResponseData::Empty);
        }
    }

    #[test]
    fn bytes_are_kept_verbatim() {
        let data = ResponseData::decode(vec![0, 159, 146, 150], ResponseType::Bytes);
        assert_eq!(data.to_bytes(), vec![0, 159, 146, 150]);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let resp = HttpResponse {
            status: 200,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            data: ResponseData::Empty,
        };
        assert_eq!(resp.header("content-type"), Some("text/plain"));
        assert_eq!(resp.header("x-missing"), None);
    }

    #[test]
    fn set_header_replaces_existing_entry() {
        let mut headers = vec![
            ("content-type".to_string(), "text/plain".to_string()),
            ("X-Trace".to_string(), "1".to_string()),
        ];
        set_header(&mut headers, "Content-Type", "application/json");
        assert_eq!(
            headers,
            vec![
                ("X-Trace".to_string(), "1".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ]
        );
    }

    #[test]
    fn method_serializes_uppercase() {
        assert_eq!(serde_json::to_value(HttpMethod::Patch).unwrap(), json!("PATCH"));
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }
}
