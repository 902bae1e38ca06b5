//! C-ABI wrapper around `camera-core`.
//!
//! # Overview
//! Lets a mobile host (widget, background worker) read and flip the
//! camera's motion detection switch through `extern "C"` functions. The
//! host passes its stored settings as camelCase JSON and gets back plain
//! `#[repr(C)]` structs it can render directly.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Calls block for up to the configured timeout (twice, when a Digest
//!   challenge is answered); hosts call them off their UI thread.
//! - The C caller owns all returned pointers and must release them with the
//!   matching `camera_free_*` function.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use camera_core::controller;
use camera_core::{CameraClient, CameraError, CameraSettings, MotionStatus};

use types::*;

/// Read `settings_json` as `CameraSettings`. `Err` carries a description.
fn read_settings(settings_json: *const c_char) -> Result<CameraSettings, String> {
    let json = unsafe { CStr::from_ptr(settings_json) }
        .to_str()
        .map_err(|err| err.to_string())?;
    CameraSettings::from_json(json).map_err(|err| err.to_string())
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client from `settings_json`.
///
/// Returns null if `settings_json` is null or not valid settings JSON. If
/// the settings do not form a valid endpoint the client is still returned,
/// uninitialized: every operation on it reports "Camera service not
/// initialized". The caller must free the pointer with `camera_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn camera_client_new(settings_json: *const c_char) -> *mut FfiCameraClient {
    catch_unwind(|| {
        if settings_json.is_null() {
            return std::ptr::null_mut();
        }
        let settings = match read_settings(settings_json) {
            Ok(settings) => settings,
            Err(err) => {
                log::error!("camera_client_new: {err}");
                return std::ptr::null_mut();
            }
        };
        let client = CameraClient::new();
        if let Err(err) = client.apply_settings(&settings) {
            log::warn!("camera_client_new: {err}, client left uninitialized");
        }
        Box::into_raw(Box::new(FfiCameraClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Replace the client's settings.
///
/// On `InvalidSettings` the client is left uninitialized; unparseable JSON
/// leaves the previous settings in place. The caller must free the result
/// with `camera_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn camera_client_apply_settings(
    client: *const FfiCameraClient,
    settings_json: *const c_char,
) -> *mut FfiCameraResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiCameraResult::null_arg("client");
        }
        if settings_json.is_null() {
            return FfiCameraResult::null_arg("settings_json");
        }
        let client = unsafe { &*client };
        let settings = match read_settings(settings_json) {
            Ok(settings) => settings,
            Err(err) => return FfiCameraResult::invalid_json(&err),
        };
        match client.inner.apply_settings(&settings) {
            Ok(()) => FfiCameraResult::ok(),
            Err(err) => FfiCameraResult::invalid_settings(&err),
        }
    }))
    .unwrap_or_else(|_| FfiCameraResult::panic("panic in camera_client_apply_settings"))
}

/// Free a client created by `camera_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn camera_client_free(client: *mut FfiCameraClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Read the motion detection switch.
///
/// Never returns null. The caller must free the result with
/// `camera_free_status`.
#[unsafe(no_mangle)]
pub extern "C" fn camera_get_status(client: *const FfiCameraClient) -> *mut FfiMotionStatus {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiMotionStatus::failure("null argument: client");
        }
        let client = unsafe { &*client };
        FfiMotionStatus::from_core(&client.inner.get_motion_detection_status())
    }))
    .unwrap_or_else(|_| FfiMotionStatus::failure("panic in camera_get_status"))
}

/// Switch motion detection on or off.
///
/// `Ok` only means the camera accepted the request; call
/// `camera_get_status` to learn the effective value. The caller must free
/// the result with `camera_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn camera_set_status(client: *const FfiCameraClient, enable: bool) -> *mut FfiCameraResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiCameraResult::null_arg("client");
        }
        let client = unsafe { &*client };
        match client.inner.set_motion_detection_status(enable) {
            Ok(()) => FfiCameraResult::ok(),
            Err(err) => FfiCameraResult::from_error(&err),
        }
    }))
    .unwrap_or_else(|_| FfiCameraResult::panic("panic in camera_set_status"))
}

/// Flip the switch relative to `current` and return the status read back
/// afterwards.
///
/// With `current` unknown no request is made. Any failure comes back as an
/// unavailable status carrying the error message.
#[unsafe(no_mangle)]
pub extern "C" fn camera_toggle(client: *const FfiCameraClient, current: FfiMotionState) -> *mut FfiMotionStatus {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiMotionStatus::failure("null argument: client");
        }
        let client = unsafe { &*client };
        let current = MotionStatus::available(current.into());
        let status = match controller::toggle(&client.inner, &current) {
            Ok(status) => status,
            Err(err) => MotionStatus::unavailable(&err),
        };
        FfiMotionStatus::from_core(&status)
    }))
    .unwrap_or_else(|_| FfiMotionStatus::failure("panic in camera_toggle"))
}

/// True when `current` shows motion detection on and `previous` did not.
/// False for a null `current`.
#[unsafe(no_mangle)]
pub extern "C" fn camera_should_notify(previous: FfiMotionState, current: *const FfiMotionStatus) -> bool {
    catch_unwind(|| {
        if current.is_null() {
            return false;
        }
        let current = unsafe { &*current };
        let status = if current.available {
            MotionStatus::available(current.state.into())
        } else {
            MotionStatus::unavailable(&CameraError::StatusUnknown)
        };
        controller::should_notify(previous.into(), &status)
    })
    .unwrap_or(false)
}

/// True when `ssid` is the home network named by `settings_json`'s
/// `wifiName`. Hosts check this before a background refresh. False for null
/// or unreadable arguments.
#[unsafe(no_mangle)]
pub extern "C" fn camera_is_home_network(settings_json: *const c_char, ssid: *const c_char) -> bool {
    catch_unwind(|| {
        if settings_json.is_null() || ssid.is_null() {
            return false;
        }
        let settings = match read_settings(settings_json) {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("camera_is_home_network: {err}");
                return false;
            }
        };
        let ssid = unsafe { CStr::from_ptr(ssid) }.to_string_lossy();
        settings.is_home_network(&ssid)
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiMotionStatus`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn camera_free_status(status: *mut FfiMotionStatus) {
    if status.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let status = unsafe { Box::from_raw(status) };
        if !status.error_message.is_null() {
            drop(unsafe { std::ffi::CString::from_raw(status.error_message) });
        }
    });
}

/// Free an `FfiCameraResult`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn camera_free_result(result: *mut FfiCameraResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { std::ffi::CString::from_raw(result.error_message) });
        }
    });
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mock_camera::{CameraConfig, MockCamera};
    use std::ffi::CString;

    const SETTINGS: &str = r#"{"username":"ipc","password":"pass","ipAddress":"127.0.0.1:9"}"#;

    fn client(json: &str) -> *mut FfiCameraClient {
        let json = CString::new(json).unwrap();
        camera_client_new(json.as_ptr())
    }

    fn message(ptr: *const c_char) -> String {
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string()
    }

    fn start(camera: MockCamera) -> std::net::SocketAddr {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                camera.serve(listener).await
            })
        });

        addr
    }

    // --- lifecycle ---

    #[test]
    fn client_new_and_free() {
        let client = client(SETTINGS);
        assert!(!client.is_null());
        camera_client_free(client);
    }

    #[test]
    fn client_new_null_returns_null() {
        assert!(camera_client_new(std::ptr::null()).is_null());
    }

    #[test]
    fn client_new_invalid_json_returns_null() {
        assert!(client("{not json").is_null());
        assert!(client(r#"{"timeoutSeconds": 5}"#).is_null());
    }

    #[test]
    fn client_free_null_is_safe() {
        camera_client_free(std::ptr::null_mut());
    }

    #[test]
    fn empty_settings_use_defaults() {
        let client = client("{}");
        assert!(!client.is_null());
        let config = unsafe { &*client }.inner.config().unwrap();
        assert_eq!(config.base_url(), "http://192.168.1.100");
        camera_client_free(client);
    }

    // --- uninitialized client ---

    #[test]
    fn invalid_endpoint_gives_uninitialized_client() {
        let client = client(r#"{"password":"p@ss"}"#);
        assert!(!client.is_null());

        let status = camera_get_status(client);
        let s = unsafe { &*status };
        assert!(!s.available);
        assert_eq!(s.state, FfiMotionState::Unknown);
        assert_eq!(message(s.error_message), "Camera service not initialized");
        camera_free_status(status);

        let result = camera_set_status(client, true);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NotInitialized);
        assert_eq!(r.http_status, 0);
        camera_free_result(result);

        camera_client_free(client);
    }

    #[test]
    fn apply_settings_reports_invalid_endpoint() {
        let client = client(SETTINGS);
        let json = CString::new(r#"{"username":"ad:min"}"#).unwrap();
        let result = camera_client_apply_settings(client, json.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::InvalidSettings);
        assert_eq!(
            message(r.error_message),
            "invalid credentials format - expected user:password"
        );
        assert!(unsafe { &*client }.inner.config().is_none());
        camera_free_result(result);
        camera_client_free(client);
    }

    #[test]
    fn apply_settings_bad_json_keeps_previous() {
        let client = client(SETTINGS);
        let json = CString::new("{not json").unwrap();
        let result = camera_client_apply_settings(client, json.as_ptr());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::InvalidSettings);
        assert!(unsafe { &*client }.inner.config().is_some());
        camera_free_result(result);
        camera_client_free(client);
    }

    // --- null arguments ---

    #[test]
    fn null_client_arguments() {
        let status = camera_get_status(std::ptr::null());
        let s = unsafe { &*status };
        assert!(!s.available);
        assert_eq!(message(s.error_message), "null argument: client");
        camera_free_status(status);

        let result = camera_set_status(std::ptr::null(), true);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        camera_free_result(result);

        let result = camera_client_apply_settings(std::ptr::null(), std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        camera_free_result(result);

        let status = camera_toggle(std::ptr::null(), FfiMotionState::Enabled);
        assert!(!unsafe { &*status }.available);
        camera_free_status(status);
    }

    #[test]
    fn free_null_is_safe() {
        camera_free_status(std::ptr::null_mut());
        camera_free_result(std::ptr::null_mut());
    }

    // --- toggle / notify ---

    #[test]
    fn toggle_from_unknown_reports_message() {
        let client = client(SETTINGS);
        let status = camera_toggle(client, FfiMotionState::Unknown);
        let s = unsafe { &*status };
        assert_eq!(s.state, FfiMotionState::Unknown);
        assert_eq!(
            message(s.error_message),
            "Motion detection status is unknown. Try refreshing first."
        );
        camera_free_status(status);
        camera_client_free(client);
    }

    #[test]
    fn should_notify_on_rising_edge_only() {
        let on = FfiMotionStatus {
            state: FfiMotionState::Enabled,
            available: true,
            error_message: std::ptr::null_mut(),
        };
        assert!(camera_should_notify(FfiMotionState::Disabled, &on));
        assert!(camera_should_notify(FfiMotionState::Unknown, &on));
        assert!(!camera_should_notify(FfiMotionState::Enabled, &on));
        assert!(!camera_should_notify(FfiMotionState::Disabled, std::ptr::null()));

        let off = FfiMotionStatus {
            state: FfiMotionState::Disabled,
            available: true,
            error_message: std::ptr::null_mut(),
        };
        assert!(!camera_should_notify(FfiMotionState::Unknown, &off));

        let failed = FfiMotionStatus {
            state: FfiMotionState::Enabled,
            available: false,
            error_message: std::ptr::null_mut(),
        };
        assert!(!camera_should_notify(FfiMotionState::Disabled, &failed));
    }

    #[test]
    fn home_network_check_reads_wifi_name() {
        let json = CString::new(r#"{"wifiName":"HomeNet"}"#).unwrap();
        let home = CString::new("\"HomeNet-5G\"").unwrap();
        let away = CString::new("CafeNet").unwrap();
        assert!(camera_is_home_network(json.as_ptr(), home.as_ptr()));
        assert!(!camera_is_home_network(json.as_ptr(), away.as_ptr()));
        assert!(!camera_is_home_network(json.as_ptr(), std::ptr::null()));
        assert!(!camera_is_home_network(std::ptr::null(), home.as_ptr()));

        let bad = CString::new("{not json").unwrap();
        assert!(!camera_is_home_network(bad.as_ptr(), home.as_ptr()));
    }

    #[test]
    fn error_codes_follow_core_errors() {
        assert_eq!(FfiErrorCode::from(&CameraError::ServiceUnavailable), FfiErrorCode::Http);
        assert_eq!(FfiErrorCode::from(&CameraError::Timeout), FfiErrorCode::Timeout);
        assert_eq!(
            FfiErrorCode::from(&CameraError::Network("reset".to_string())),
            FfiErrorCode::Network
        );

        let result = FfiCameraResult::from_error(&CameraError::ServiceUnavailable);
        let r = unsafe { &*result };
        assert_eq!(r.http_status, 503);
        assert_eq!(message(r.error_message), "Camera service unavailable - camera may be busy");
        camera_free_result(result);
    }

    // --- against the mock camera ---

    #[test]
    fn round_trip_against_mock_camera() {
        let camera = MockCamera::new(CameraConfig::default());
        let addr = start(camera.clone());
        let client = client(&format!(r#"{{"ipAddress":"{addr}","timeoutSeconds":"2"}}"#));

        let status = camera_get_status(client);
        let s = unsafe { &*status };
        assert!(s.available);
        assert!(s.error_message.is_null());
        assert_eq!(s.state, FfiMotionState::Disabled);
        let previous = s.state;
        camera_free_status(status);

        let status = camera_toggle(client, previous);
        let s = unsafe { &*status };
        assert_eq!(s.state, FfiMotionState::Enabled);
        assert!(camera_should_notify(previous, s));
        assert!(camera.motion_enabled());
        camera_free_status(status);

        let result = camera_set_status(client, false);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::Ok);
        assert!(unsafe { &*result }.error_message.is_null());
        camera_free_result(result);
        assert!(!camera.motion_enabled());

        camera_client_free(client);
    }
}
