//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible fields: `*mut c_char`
//! instead of `String`, and enums with explicit discriminants in place of
//! `Option<bool>` and `CameraError`. Conversions live here to keep `lib.rs`
//! focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use camera_core::{CameraClient, CameraError, EndpointError, MotionStatus};

/// Opaque handle to a `CameraClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiCameraClient {
    pub(crate) inner: CameraClient,
}

/// Copy `s` into a C string owned by the caller. Interior NULs yield an
/// empty string.
pub(crate) fn c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Motion status
// ---------------------------------------------------------------------------

/// Tri-state motion detection switch.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiMotionState {
    Unknown = 0,
    Disabled = 1,
    Enabled = 2,
}

impl From<Option<bool>> for FfiMotionState {
    fn from(enabled: Option<bool>) -> Self {
        match enabled {
            None => FfiMotionState::Unknown,
            Some(false) => FfiMotionState::Disabled,
            Some(true) => FfiMotionState::Enabled,
        }
    }
}

impl From<FfiMotionState> for Option<bool> {
    fn from(state: FfiMotionState) -> Self {
        match state {
            FfiMotionState::Unknown => None,
            FfiMotionState::Disabled => Some(false),
            FfiMotionState::Enabled => Some(true),
        }
    }
}

/// A `MotionStatus` exposed to C.
///
/// `error_message` is null whenever `available` is true. When `available`
/// is false, `state` is always `Unknown` and `error_message` says why.
#[repr(C)]
pub struct FfiMotionStatus {
    pub state: FfiMotionState,
    pub available: bool,
    pub error_message: *mut c_char,
}

impl FfiMotionStatus {
    pub(crate) fn from_core(status: &MotionStatus) -> *mut Self {
        let error_message = match status.error_message() {
            Some(message) => c_string(message),
            None => std::ptr::null_mut(),
        };
        Box::into_raw(Box::new(FfiMotionStatus {
            state: status.enabled().into(),
            available: status.is_available(),
            error_message,
        }))
    }

    /// An unavailable status for failures that never reached the core.
    pub(crate) fn failure(message: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiMotionStatus {
            state: FfiMotionState::Unknown,
            available: false,
            error_message: c_string(message),
        }))
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiCameraResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    NotInitialized = 1,
    AuthenticationFailed = 2,
    /// Any other non-2xx answer; see `http_status`.
    Http = 3,
    Timeout = 4,
    HostNotFound = 5,
    ConnectionRefused = 6,
    Tls = 7,
    Network = 8,
    StatusUnknown = 9,
    InvalidSettings = 10,
    Panic = 11,
    NullArg = 12,
}

impl From<&CameraError> for FfiErrorCode {
    fn from(err: &CameraError) -> Self {
        match err {
            CameraError::NotInitialized => FfiErrorCode::NotInitialized,
            CameraError::AuthenticationFailed => FfiErrorCode::AuthenticationFailed,
            CameraError::Forbidden
            | CameraError::EndpointNotFound
            | CameraError::ServerError
            | CameraError::ServiceUnavailable
            | CameraError::Http { .. } => FfiErrorCode::Http,
            CameraError::Timeout => FfiErrorCode::Timeout,
            CameraError::HostNotFound => FfiErrorCode::HostNotFound,
            CameraError::ConnectionRefused => FfiErrorCode::ConnectionRefused,
            CameraError::Tls(_) => FfiErrorCode::Tls,
            CameraError::Network(_) => FfiErrorCode::Network,
            CameraError::StatusUnknown => FfiErrorCode::StatusUnknown,
        }
    }
}

/// Result envelope for operations with no payload.
///
/// On success `error_code` is `Ok` and `error_message` is null. On failure
/// `error_message` is the user-facing text and `http_status` is the status
/// code behind the error, or 0 when there was no HTTP response.
#[repr(C)]
pub struct FfiCameraResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
}

impl FfiCameraResult {
    fn new(error_code: FfiErrorCode, error_message: *mut c_char, http_status: u16) -> *mut Self {
        Box::into_raw(Box::new(FfiCameraResult {
            error_code,
            error_message,
            http_status,
        }))
    }

    pub(crate) fn ok() -> *mut Self {
        Self::new(FfiErrorCode::Ok, std::ptr::null_mut(), 0)
    }

    pub(crate) fn from_error(err: &CameraError) -> *mut Self {
        Self::new(err.into(), c_string(err.to_string()), err.http_status().unwrap_or(0))
    }

    pub(crate) fn invalid_settings(err: &EndpointError) -> *mut Self {
        Self::new(FfiErrorCode::InvalidSettings, c_string(err.to_string()), 0)
    }

    pub(crate) fn invalid_json(detail: &str) -> *mut Self {
        Self::new(
            FfiErrorCode::InvalidSettings,
            c_string(format!("invalid settings json: {detail}")),
            0,
        )
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::new(FfiErrorCode::NullArg, c_string(format!("null argument: {name}")), 0)
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::new(FfiErrorCode::Panic, c_string(msg), 0)
    }
}
