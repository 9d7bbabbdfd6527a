//! FFI bindings for the IAT engine
//!
//! C-compatible functions for calling the scoring pipeline from host shells.
//! All functions use C strings (null-terminated) and return allocated memory
//! that must be freed by the caller using `iat_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::catalog::StimulusCatalog;
use crate::schema::ResponseLog;
use crate::scoring::compute_d_score;
use crate::session::simulate_session;
use crate::types::TestModel;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Score a response log and return the DScoreResult as JSON.
///
/// # Safety
/// - `log_json` must be a valid null-terminated C string holding an
///   `iat.response_log.v1` payload.
/// - Returns a newly allocated string that must be freed with
///   `iat_free_string`.
/// - Returns NULL on error; call `iat_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn iat_score_log(log_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json = match cstr_to_string(log_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid log JSON string pointer");
            return ptr::null_mut();
        }
    };

    let log = match ResponseLog::from_json(&json) {
        Ok(log) => log,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let result = compute_d_score(&log.responses);
    match serde_json::to_string(&result) {
        Ok(out) => string_to_cstr(&out),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Run a synthetic session against the built-in catalog and return the full
/// SessionRecord as JSON. `model` is "A" or "B".
///
/// # Safety
/// - `model` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with
///   `iat_free_string`.
/// - Returns NULL on error; call `iat_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn iat_simulate_session(model: *const c_char, seed: u64) -> *mut c_char {
    clear_last_error();

    let model = match cstr_to_string(model).as_deref() {
        Some("A") | Some("a") => TestModel::A,
        Some("B") | Some("b") => TestModel::B,
        _ => {
            set_last_error("model must be \"A\" or \"B\"");
            return ptr::null_mut();
        }
    };

    match simulate_session(StimulusCatalog::builtin(), model, seed) {
        Ok(record) => match record.to_json() {
            Ok(out) => string_to_cstr(&out),
            Err(e) => {
                set_last_error(&e.to_string());
                ptr::null_mut()
            }
        },
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Get the last error message, or NULL if there was no error.
///
/// # Safety
/// - The returned pointer is owned by thread-local storage and is valid until
///   the next engine call on this thread; do NOT free it.
#[no_mangle]
pub unsafe extern "C" fn iat_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(msg) => msg.as_ptr(),
        None => ptr::null(),
    })
}

/// Free a string previously returned by this library.
///
/// # Safety
/// - `ptr` must have been returned by an `iat_*` function, and must not be
///   used after this call.
#[no_mangle]
pub unsafe extern "C" fn iat_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Engine version as a static string; do NOT free.
#[no_mangle]
pub extern "C" fn iat_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}
