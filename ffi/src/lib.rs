//! C-ABI wrapper around `launcher-core`.
//!
//! # Overview
//! Exposes the five verb helpers through `extern "C"` functions. A C caller
//! fills an `FfiRequestOptions` with borrowed strings, an optional JSON
//! document or form fields, and nullable function pointers; every callback
//! gets the caller's `user_data` back.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Entry points return an `FfiErrorCode` that covers only argument
//!   marshaling (null pointers, bad UTF-8, bad JSON). Request outcomes are
//!   delivered through the callbacks, as in the Rust API.
//! - Responses and errors handed to callbacks are borrowed views; C code
//!   must copy anything it wants to keep past the callback.
//! - The dispatcher handle is the only thing the caller owns and must release
//!   with `launcher_dispatcher_free`.

pub mod types;

use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use launcher_core::{Dispatcher, FilePart, FormData, Payload, RequestOptions, UreqTransport};

use types::*;

/// `user_data` moved into the Rust callbacks. The C caller guarantees it
/// stays valid and usable from the dispatching thread until the call returns.
#[derive(Clone, Copy)]
struct UserData(*mut c_void);

unsafe impl Send for UserData {}

impl UserData {
    fn get(self) -> *mut c_void {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Dispatcher lifecycle
// ---------------------------------------------------------------------------

/// Create a dispatcher backed by the blocking `ureq` transport.
///
/// The caller must free the returned pointer with `launcher_dispatcher_free`.
#[unsafe(no_mangle)]
pub extern "C" fn launcher_dispatcher_new() -> *mut FfiDispatcher {
    catch_unwind(|| {
        let inner = Dispatcher::new(UreqTransport::new());
        Box::into_raw(Box::new(FfiDispatcher { inner }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a dispatcher created by `launcher_dispatcher_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn launcher_dispatcher_free(dispatcher: *mut FfiDispatcher) {
    if !dispatcher.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(dispatcher) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Verb helpers
// ---------------------------------------------------------------------------

/// GET. Uses `params`; ignores any payload.
#[unsafe(no_mangle)]
pub extern "C" fn launcher_get(
    dispatcher: *const FfiDispatcher,
    options: *const FfiRequestOptions,
) -> FfiErrorCode {
    dispatch(dispatcher, options, |d, o| d.get(o))
}

/// POST with `data_json` (or the form fields) encoded as JSON.
#[unsafe(no_mangle)]
pub extern "C" fn launcher_post(
    dispatcher: *const FfiDispatcher,
    options: *const FfiRequestOptions,
) -> FfiErrorCode {
    dispatch(dispatcher, options, |d, o| d.post(o))
}

/// POST with a multipart body built from the form fields (or `data_json`).
#[unsafe(no_mangle)]
pub extern "C" fn launcher_post_form_data(
    dispatcher: *const FfiDispatcher,
    options: *const FfiRequestOptions,
) -> FfiErrorCode {
    dispatch(dispatcher, options, |d, o| d.post_form_data(o))
}

/// PUT with `data_json` (or the form fields) encoded as JSON.
#[unsafe(no_mangle)]
pub extern "C" fn launcher_put(
    dispatcher: *const FfiDispatcher,
    options: *const FfiRequestOptions,
) -> FfiErrorCode {
    dispatch(dispatcher, options, |d, o| d.put(o))
}

/// DELETE. Uses `params`; ignores any payload.
#[unsafe(no_mangle)]
pub extern "C" fn launcher_delete(
    dispatcher: *const FfiDispatcher,
    options: *const FfiRequestOptions,
) -> FfiErrorCode {
    dispatch(dispatcher, options, |d, o| d.delete(o))
}

fn dispatch(
    dispatcher: *const FfiDispatcher,
    options: *const FfiRequestOptions,
    verb: impl FnOnce(&Dispatcher, RequestOptions),
) -> FfiErrorCode {
    catch_unwind(AssertUnwindSafe(|| {
        if dispatcher.is_null() || options.is_null() {
            return FfiErrorCode::NullArg;
        }
        let dispatcher = unsafe { &*dispatcher };
        let options = unsafe { &*options };
        match convert_options(options) {
            Ok(opts) => {
                verb(&dispatcher.inner, opts);
                FfiErrorCode::Ok
            }
            Err(code) => code,
        }
    }))
    .unwrap_or(FfiErrorCode::Panic)
}

// ---------------------------------------------------------------------------
// Option conversion
// ---------------------------------------------------------------------------

/// Read an optional C string. Null yields `None`.
fn opt_str(ptr: *const c_char) -> Result<Option<String>, FfiErrorCode> {
    if ptr.is_null() {
        return Ok(None);
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(|s| Some(s.to_string()))
        .map_err(|_| FfiErrorCode::InvalidUtf8)
}

fn req_str(ptr: *const c_char) -> Result<String, FfiErrorCode> {
    opt_str(ptr)?.ok_or(FfiErrorCode::NullArg)
}

fn slice<'a, T>(ptr: *const T, len: u32) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, len as usize) }
    }
}

fn convert_pairs(ptr: *const FfiPair, len: u32) -> Result<Vec<(String, String)>, FfiErrorCode> {
    slice(ptr, len)
        .iter()
        .map(|p| Ok((req_str(p.key)?, req_str(p.value)?)))
        .collect()
}

fn convert_form(fields: &[FfiFormField]) -> Result<FormData, FfiErrorCode> {
    let mut form = FormData::new();
    for field in fields {
        let name = req_str(field.name)?;
        let bytes: &[u8] = if field.value.is_null() || field.value_len == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(field.value, field.value_len) }
        };
        form = match field.kind {
            FfiFormKind::Scalar => {
                let text = std::str::from_utf8(bytes).map_err(|_| FfiErrorCode::InvalidUtf8)?;
                form.field(name, text)
            }
            FfiFormKind::Json => {
                let value: serde_json::Value =
                    serde_json::from_slice(bytes).map_err(|_| FfiErrorCode::InvalidJson)?;
                form.field(name, value)
            }
            FfiFormKind::File => {
                let filename = opt_str(field.filename)?.unwrap_or_else(|| name.clone());
                let content_type =
                    opt_str(field.content_type)?.unwrap_or_else(|| "application/octet-stream".to_string());
                form.file(name, FilePart::new(filename, content_type, bytes.to_vec()))
            }
        };
    }
    Ok(form)
}

fn convert_payload(options: &FfiRequestOptions) -> Result<Option<Payload>, FfiErrorCode> {
    let fields = slice(options.form_fields, options.form_fields_len);
    if !fields.is_empty() {
        return Ok(Some(Payload::Form(convert_form(fields)?)));
    }
    match opt_str(options.data_json)? {
        None => Ok(None),
        Some(json) => {
            let value: serde_json::Value = serde_json::from_str(&json).map_err(|_| FfiErrorCode::InvalidJson)?;
            Ok(Some(Payload::Json(value)))
        }
    }
}

fn convert_options(options: &FfiRequestOptions) -> Result<RequestOptions, FfiErrorCode> {
    let mut opts = RequestOptions::new(req_str(options.url)?);
    opts.base_url = opt_str(options.base_url)?;
    opts.headers = convert_pairs(options.headers, options.headers_len)?;
    opts.params = convert_pairs(options.params, options.params_len)?;
    opts.data = convert_payload(options)?;
    if options.timeout_ms > 0 {
        opts.timeout = Some(Duration::from_millis(options.timeout_ms));
    }
    opts.response_type = Some(options.response_type.into());

    let ud = UserData(options.user_data);

    if let Some(f) = options.validate_status {
        opts = opts.validate_status(move |status| f(status, ud.get()));
    }
    if let Some(f) = options.validate_response {
        opts = opts.validate_response(move |resp| {
            let view = ResponseView::new(resp);
            f(&view.raw, ud.get())
        });
    }
    if let Some(f) = options.handle_response {
        opts = opts.on_response(move |resp| {
            let view = ResponseView::new(resp);
            f(&view.raw, ud.get());
        });
    }
    if let Some(f) = options.handle_response_headers {
        opts = opts.on_response_headers(move |headers| {
            let view = PairsView::new(headers);
            f(view.as_ptr(), view.len(), ud.get());
        });
    }
    if let Some(f) = options.handle_response_data {
        opts = opts.on_response_data(move |data| {
            let bytes = data.to_bytes();
            f(bytes_ptr(&bytes), bytes.len(), ud.get());
        });
    }
    if let Some(f) = options.handle_error_response {
        opts = opts.on_error_response(move |resp| {
            let view = ResponseView::new(resp);
            f(&view.raw, ud.get());
        });
    }
    if let Some(f) = options.handle_error_response_data {
        opts = opts.on_error_response_data(move |data| {
            let bytes = data.to_bytes();
            f(bytes_ptr(&bytes), bytes.len(), ud.get());
        });
    }
    if let Some(f) = options.handle_error {
        opts = opts.on_error(move |err| {
            let view = ErrorView::new(err);
            f(&view.raw, ud.get());
        });
    }
    if let Some(f) = options.on_upload_progress {
        opts = opts.on_upload_progress(move |p| f(p.loaded, p.total, ud.get()));
    }
    Ok(opts)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::Arc;

    use launcher_core::{
        DispatchError, Fallback, HttpRequest, RawResponse, ResponseData, Transport, TransportError,
        UploadProgress,
    };

    struct Canned {
        status: u16,
        body: &'static str,
        last: Arc<std::sync::Mutex<Option<HttpRequest>>>,
    }

    impl Transport for Canned {
        fn execute(
            &self,
            request: &HttpRequest,
            progress: &mut dyn FnMut(UploadProgress),
        ) -> Result<RawResponse, TransportError> {
            *self.last.lock().unwrap() = Some(request.clone());
            if let Some(body) = &request.body {
                let total = body.len() as u64;
                progress(UploadProgress { loaded: total, total });
            }
            Ok(RawResponse {
                status: self.status,
                headers: vec![("content-type".to_string(), "application/json".to_string())],
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    struct Quiet;

    impl Fallback for Quiet {
        fn on_error_data(&self, _: &ResponseData) {}
        fn on_error(&self, _: &DispatchError) {}
        fn on_upload_progress(&self, _: &UploadProgress) {}
    }

    fn dispatcher(
        status: u16,
        body: &'static str,
    ) -> (*mut FfiDispatcher, Arc<std::sync::Mutex<Option<HttpRequest>>>) {
        let last = Arc::new(std::sync::Mutex::new(None));
        let inner = Dispatcher::new(Canned {
            status,
            body,
            last: last.clone(),
        })
        .with_fallback(Arc::new(Quiet));
        (Box::into_raw(Box::new(FfiDispatcher { inner })), last)
    }

    #[derive(Default)]
    struct Captured {
        statuses: Vec<u16>,
        bodies: Vec<Vec<u8>>,
        header_count: u32,
        error_codes: Vec<FfiErrorCode>,
        error_messages: Vec<String>,
        error_response_status: Vec<u16>,
        progress: Vec<(u64, u64)>,
    }

    fn captured<'a>(user_data: *mut c_void) -> &'a mut Captured {
        unsafe { &mut *(user_data as *mut Captured) }
    }

    extern "C" fn on_response(resp: *const FfiResponse, user_data: *mut c_void) {
        let resp = unsafe { &*resp };
        captured(user_data).statuses.push(resp.status);
    }

    extern "C" fn on_headers(_headers: *const FfiPair, len: u32, user_data: *mut c_void) {
        captured(user_data).header_count = len;
    }

    extern "C" fn on_data(data: *const u8, len: usize, user_data: *mut c_void) {
        let bytes = if data.is_null() {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(data, len) }.to_vec()
        };
        captured(user_data).bodies.push(bytes);
    }

    extern "C" fn on_error(err: *const FfiError, user_data: *mut c_void) {
        let err = unsafe { &*err };
        let c = captured(user_data);
        c.error_codes.push(err.code);
        c.error_messages
            .push(unsafe { CStr::from_ptr(err.message) }.to_str().unwrap().to_string());
        if !err.response.is_null() {
            c.error_response_status.push(unsafe { &*err.response }.status);
        }
    }

    extern "C" fn on_progress(loaded: u64, total: u64, user_data: *mut c_void) {
        captured(user_data).progress.push((loaded, total));
    }

    extern "C" fn reject(_resp: *const FfiResponse, _user_data: *mut c_void) -> bool {
        false
    }

    extern "C" fn accept_404(status: u16, _user_data: *mut c_void) -> bool {
        status == 404
    }

    fn options(url: &CString, captured: &mut Captured) -> FfiRequestOptions {
        FfiRequestOptions {
            url: url.as_ptr(),
            base_url: std::ptr::null(),
            headers: std::ptr::null(),
            headers_len: 0,
            params: std::ptr::null(),
            params_len: 0,
            data_json: std::ptr::null(),
            form_fields: std::ptr::null(),
            form_fields_len: 0,
            timeout_ms: 0,
            response_type: FfiResponseType::Json,
            user_data: captured as *mut Captured as *mut c_void,
            validate_status: None,
            validate_response: None,
            handle_response: Some(on_response),
            handle_response_headers: Some(on_headers),
            handle_response_data: Some(on_data),
            handle_error_response: None,
            handle_error_response_data: None,
            handle_error: Some(on_error),
            on_upload_progress: None,
        }
    }

    #[test]
    fn dispatcher_new_and_free() {
        let d = launcher_dispatcher_new();
        assert!(!d.is_null());
        launcher_dispatcher_free(d);
    }

    #[test]
    fn dispatcher_free_null_is_safe() {
        launcher_dispatcher_free(std::ptr::null_mut());
    }

    #[test]
    fn null_arguments_are_reported() {
        let (d, _) = dispatcher(200, "{}");
        assert_eq!(launcher_get(d, std::ptr::null()), FfiErrorCode::NullArg);
        let url = CString::new("http://localhost:3000/user/list").unwrap();
        let mut c = Captured::default();
        let opts = options(&url, &mut c);
        assert_eq!(launcher_get(std::ptr::null(), &opts), FfiErrorCode::NullArg);
        launcher_dispatcher_free(d);
    }

    #[test]
    fn null_url_is_reported() {
        let (d, _) = dispatcher(200, "{}");
        let url = CString::new("unused").unwrap();
        let mut c = Captured::default();
        let mut opts = options(&url, &mut c);
        opts.url = std::ptr::null();
        assert_eq!(launcher_get(d, &opts), FfiErrorCode::NullArg);
        launcher_dispatcher_free(d);
    }

    #[test]
    fn get_delivers_response_headers_and_data() {
        let (d, last) = dispatcher(200, r#"{"id":1}"#);
        let url = CString::new("/user/list").unwrap();
        let base = CString::new("http://localhost:3000").unwrap();
        let key = CString::new("page").unwrap();
        let value = CString::new("2").unwrap();
        let params = [FfiPair {
            key: key.as_ptr(),
            value: value.as_ptr(),
        }];
        let mut c = Captured::default();
        let mut opts = options(&url, &mut c);
        opts.base_url = base.as_ptr();
        opts.params = params.as_ptr();
        opts.params_len = 1;

        assert_eq!(launcher_get(d, &opts), FfiErrorCode::Ok);
        assert_eq!(c.statuses, vec![200]);
        assert_eq!(c.header_count, 1);
        assert_eq!(c.bodies, vec![br#"{"id":1}"#.to_vec()]);
        assert!(c.error_codes.is_empty());

        let req = last.lock().unwrap().clone().unwrap();
        assert_eq!(req.url, "http://localhost:3000/user/list?page=2");
        launcher_dispatcher_free(d);
    }

    #[test]
    fn post_sends_json_document() {
        let (d, last) = dispatcher(200, "{}");
        let url = CString::new("http://localhost:3000/user/v2/add").unwrap();
        let data = CString::new(r#"{"id":1,"name":"Tom"}"#).unwrap();
        let mut c = Captured::default();
        let mut opts = options(&url, &mut c);
        opts.data_json = data.as_ptr();

        assert_eq!(launcher_post(d, &opts), FfiErrorCode::Ok);
        let req = last.lock().unwrap().clone().unwrap();
        assert_eq!(req.header("content-type"), Some("application/json;charset=UTF-8"));
        let body: serde_json::Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["name"], "Tom");
        launcher_dispatcher_free(d);
    }

    #[test]
    fn invalid_json_payload_is_rejected_before_dispatch() {
        let (d, last) = dispatcher(200, "{}");
        let url = CString::new("http://localhost:3000/user/v2/add").unwrap();
        let data = CString::new("{not json").unwrap();
        let mut c = Captured::default();
        let mut opts = options(&url, &mut c);
        opts.data_json = data.as_ptr();

        assert_eq!(launcher_put(d, &opts), FfiErrorCode::InvalidJson);
        assert!(last.lock().unwrap().is_none());
        launcher_dispatcher_free(d);
    }

    #[test]
    fn post_form_data_encodes_classified_fields() {
        let (d, last) = dispatcher(200, "{}");
        let url = CString::new("http://localhost:3000/user/addWithImage").unwrap();
        let user_name = CString::new("user").unwrap();
        let user_json = br#"{"id":3}"#;
        let image_name = CString::new("image").unwrap();
        let filename = CString::new("bo.png").unwrap();
        let content_type = CString::new("image/png").unwrap();
        let image = b"PNG";
        let fields = [
            FfiFormField {
                name: user_name.as_ptr(),
                kind: FfiFormKind::Json,
                value: user_json.as_ptr(),
                value_len: user_json.len(),
                filename: std::ptr::null(),
                content_type: std::ptr::null(),
            },
            FfiFormField {
                name: image_name.as_ptr(),
                kind: FfiFormKind::File,
                value: image.as_ptr(),
                value_len: image.len(),
                filename: filename.as_ptr(),
                content_type: content_type.as_ptr(),
            },
        ];
        let mut c = Captured::default();
        let mut opts = options(&url, &mut c);
        opts.form_fields = fields.as_ptr();
        opts.form_fields_len = 2;
        opts.on_upload_progress = Some(on_progress);

        assert_eq!(launcher_post_form_data(d, &opts), FfiErrorCode::Ok);
        let req = last.lock().unwrap().clone().unwrap();
        let body = String::from_utf8(req.body.clone().unwrap()).unwrap();
        assert!(body.contains("name=\"user\"; filename=\"blob\"\r\nContent-Type: application/json"));
        assert!(body.contains("name=\"image\"; filename=\"bo.png\"\r\nContent-Type: image/png\r\n\r\nPNG"));
        let total = body.len() as u64;
        assert_eq!(c.progress, vec![(total, total)]);
        launcher_dispatcher_free(d);
    }

    #[test]
    fn error_status_reaches_handle_error_with_response() {
        let (d, _) = dispatcher(500, r#"{"message":"boom"}"#);
        let url = CString::new("http://localhost:3000/user/7").unwrap();
        let mut c = Captured::default();
        let opts = options(&url, &mut c);

        assert_eq!(launcher_delete(d, &opts), FfiErrorCode::Ok);
        assert!(c.statuses.is_empty());
        assert_eq!(c.error_codes, vec![FfiErrorCode::Status]);
        assert_eq!(c.error_messages, vec!["request failed with status code 500".to_string()]);
        assert_eq!(c.error_response_status, vec![500]);
        launcher_dispatcher_free(d);
    }

    #[test]
    fn custom_validate_status_is_consulted() {
        let (d, _) = dispatcher(404, "{}");
        let url = CString::new("http://localhost:3000/user/7").unwrap();
        let mut c = Captured::default();
        let mut opts = options(&url, &mut c);
        opts.validate_status = Some(accept_404);

        assert_eq!(launcher_get(d, &opts), FfiErrorCode::Ok);
        assert_eq!(c.statuses, vec![404]);
        assert!(c.error_codes.is_empty());
        launcher_dispatcher_free(d);
    }

    #[test]
    fn rejected_business_validation_uses_error_response_data() {
        let (d, _) = dispatcher(200, r#"{"code":1}"#);
        let url = CString::new("http://localhost:3000/user/list").unwrap();
        let mut c = Captured::default();
        let mut opts = options(&url, &mut c);
        opts.validate_response = Some(reject);
        opts.handle_response_data = None;
        opts.handle_error_response_data = Some(on_data);

        assert_eq!(launcher_get(d, &opts), FfiErrorCode::Ok);
        assert!(c.statuses.is_empty());
        assert_eq!(c.bodies, vec![br#"{"code":1}"#.to_vec()]);
        assert_eq!(c.header_count, 1);
        launcher_dispatcher_free(d);
    }

    #[test]
    fn relative_url_without_base_is_an_invalid_url_error() {
        let (d, last) = dispatcher(200, "{}");
        let url = CString::new("/user/list").unwrap();
        let mut c = Captured::default();
        let opts = options(&url, &mut c);

        assert_eq!(launcher_get(d, &opts), FfiErrorCode::Ok);
        assert_eq!(c.error_codes, vec![FfiErrorCode::InvalidUrl]);
        assert!(last.lock().unwrap().is_none());
        launcher_dispatcher_free(d);
    }
}
