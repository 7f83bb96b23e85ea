//! FFI interface for C/C++ hosts
//!
//! Lets a host that already holds rendered HTML run the link extractor
//! without the HTTP layer. Requests and results are passed as JSON.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::extractors::{ExtractionRequest, ScrapeResponse};

/// Result struct returned to the host
/// Both pointers are owned by Rust and must be freed via free_extraction_result
#[repr(C)]
pub struct ExtractionResultFFI {
    /// JSON-serialized response (null-terminated): `{"downloadLinks": [...]}`
    /// or `{"error": "..."}` when nothing matched
    pub json_ptr: *mut c_char,
    /// Error message if the call itself failed (null-terminated), or null
    pub error_ptr: *mut c_char,
}

/// Extract download links from rendered HTML.
///
/// # Arguments
/// * `html_ptr` - Pointer to HTML content (UTF-8, not necessarily null-terminated)
/// * `html_len` - Length of HTML content in bytes
/// * `request_json` - JSON-serialized ExtractionRequest (null-terminated)
///
/// # Safety
/// - `html_ptr` must point to valid memory of at least `html_len` bytes
/// - `request_json` must be a valid null-terminated C string
/// - Caller must free the result via `free_extraction_result`
#[no_mangle]
pub unsafe extern "C" fn extract_download_links(
    html_ptr: *const c_char,
    html_len: usize,
    request_json: *const c_char,
) -> ExtractionResultFFI {
    let html = if html_ptr.is_null() || html_len == 0 {
        ""
    } else {
        let slice = std::slice::from_raw_parts(html_ptr as *const u8, html_len);
        match std::str::from_utf8(slice) {
            Ok(s) => s,
            Err(_) => return make_error_result("Invalid UTF-8 in HTML content"),
        }
    };

    if request_json.is_null() {
        return make_error_result("Request JSON is null");
    }
    let request_str = match CStr::from_ptr(request_json).to_str() {
        Ok(s) => s,
        Err(_) => return make_error_result("Invalid UTF-8 in request JSON"),
    };

    let request: ExtractionRequest = match serde_json::from_str(request_str) {
        Ok(r) => r,
        Err(e) => return make_error_result(&format!("Failed to parse request JSON: {e}")),
    };

    let response = ScrapeResponse::from(request.run(html));

    match serde_json::to_string(&response) {
        Ok(json) => match CString::new(json) {
            Ok(cstr) => ExtractionResultFFI {
                json_ptr: cstr.into_raw(),
                error_ptr: ptr::null_mut(),
            },
            Err(_) => make_error_result("Result JSON contains null bytes"),
        },
        Err(e) => make_error_result(&format!("Failed to serialize result: {e}")),
    }
}

/// Free an ExtractionResultFFI returned by extract_download_links
///
/// # Safety
/// - `result` must have been returned by `extract_download_links`
/// - Must only be called once per result
#[no_mangle]
pub unsafe extern "C" fn free_extraction_result(result: ExtractionResultFFI) {
    if !result.json_ptr.is_null() {
        drop(CString::from_raw(result.json_ptr));
    }
    if !result.error_ptr.is_null() {
        drop(CString::from_raw(result.error_ptr));
    }
}

fn make_error_result(msg: &str) -> ExtractionResultFFI {
    let error_cstr = CString::new(msg.replace('\0', "")).unwrap_or_default();
    ExtractionResultFFI {
        json_ptr: ptr::null_mut(),
        error_ptr: error_cstr.into_raw(),
    }
}
