//! Request payloads and their two wire encodings: JSON and multipart.
//!
//! # Design
//! A `Payload` is either a JSON document or an ordered list of form fields.
//! Before multipart encoding every field is classified into a `FormPart`
//! (`File`, `Structured`, `Scalar`); the encoder only ever looks at that
//! classification, never at the shape of the original value.
//!
//! Structured parts are written the way a browser writes a JSON `Blob`
//! appended to `FormData`: a file part named `blob` with type
//! `application/json`. Servers that bind JSON request parts (Spring's
//! `@RequestPart`, for one) rely on that content type.

use serde_json::Value;

use crate::error::DispatchError;

pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

const STRUCTURED_FILENAME: &str = "blob";
const STRUCTURED_CONTENT_TYPE: &str = "application/json";

/// Data sent with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Form(FormData),
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<FormData> for Payload {
    fn from(form: FormData) -> Self {
        Payload::Form(form)
    }
}

/// A file to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// The value of a single form field as the caller supplied it.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    File(FilePart),
    Value(Value),
}

/// Ordered form fields. Field names may repeat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pub fields: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), FormValue::Value(value.into())));
        self
    }

    pub fn file(mut self, name: impl Into<String>, file: FilePart) -> Self {
        self.fields.push((name.into(), FormValue::File(file)));
        self
    }
}

/// A form field after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    /// Appended as-is with its own file name and type.
    File(FilePart),
    /// Objects, arrays and null, carried as JSON text.
    Structured(String),
    /// Strings, numbers and booleans, carried as plain text.
    Scalar(String),
}

impl FormPart {
    pub fn classify(value: FormValue) -> Self {
        match value {
            FormValue::File(file) => FormPart::File(file),
            // null is grouped with objects, as `typeof null` is "object"
            FormValue::Value(v @ (Value::Object(_) | Value::Array(_) | Value::Null)) => {
                FormPart::Structured(v.to_string())
            }
            FormValue::Value(Value::String(s)) => FormPart::Scalar(s),
            FormValue::Value(other) => FormPart::Scalar(other.to_string()),
        }
    }
}

/// Whether a JSON value counts as present for JSON encoding.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Encode a payload as a JSON request body.
///
/// Falsy documents skip encoding and pass through: null yields no body, other
/// falsy scalars go out as their literal text. Form payloads become a JSON
/// object; a file field has no JSON form and is rejected.
pub fn encode_json(payload: Option<Payload>) -> Result<Option<Vec<u8>>, DispatchError> {
    let value = match payload {
        None => return Ok(None),
        Some(Payload::Json(value)) => value,
        Some(Payload::Form(form)) => form_to_json(form)?,
    };
    if !is_truthy(&value) {
        return Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s.into_bytes()),
            other => Some(other.to_string().into_bytes()),
        });
    }
    Ok(Some(serde_json::to_vec(&value)?))
}

fn form_to_json(form: FormData) -> Result<Value, DispatchError> {
    let mut map = serde_json::Map::new();
    for (name, value) in form.fields {
        match value {
            FormValue::Value(v) => {
                map.insert(name, v);
            }
            FormValue::File(file) => {
                return Err(DispatchError::Payload(format!(
                    "field `{name}` holds file `{}` which cannot be sent as JSON",
                    file.filename
                )));
            }
        }
    }
    Ok(Value::Object(map))
}

/// Split a payload into classified form parts.
///
/// A JSON object contributes its entries, an array its indices; any other
/// document contributes nothing.
pub fn form_parts(payload: Option<Payload>) -> Vec<(String, FormPart)> {
    let fields: Vec<(String, FormValue)> = match payload {
        None => Vec::new(),
        Some(Payload::Form(form)) => form.fields,
        Some(Payload::Json(Value::Object(map))) => map
            .into_iter()
            .map(|(k, v)| (k, FormValue::Value(v)))
            .collect(),
        Some(Payload::Json(Value::Array(items))) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), FormValue::Value(v)))
            .collect(),
        Some(Payload::Json(_)) => Vec::new(),
    };
    fields
        .into_iter()
        .map(|(name, value)| (name, FormPart::classify(value)))
        .collect()
}

/// A random multipart boundary.
pub fn boundary() -> String {
    format!("----LauncherBoundary{}", uuid::Uuid::new_v4().simple())
}

/// Assemble a `multipart/form-data` body from classified parts.
pub fn encode_multipart(parts: &[(String, FormPart)], boundary: &str) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, part) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match part {
            FormPart::File(file) => {
                write_file_headers(&mut body, name, &file.filename, &file.content_type);
                body.extend_from_slice(&file.bytes);
            }
            FormPart::Structured(json) => {
                write_file_headers(&mut body, name, STRUCTURED_FILENAME, STRUCTURED_CONTENT_TYPE);
                body.extend_from_slice(json.as_bytes());
            }
            FormPart::Scalar(text) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", escape(name)).as_bytes(),
                );
                body.extend_from_slice(text.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

fn write_file_headers(body: &mut Vec<u8>, name: &str, filename: &str, content_type: &str) {
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            escape(name),
            escape(filename)
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
}

/// Percent-escape the characters that would break a quoted header parameter.
fn escape(value: &str) -> String {
    value
        .replace('\r', "%0D")
        .replace('\n', "%0A")
        .replace('"', "%22")
}
