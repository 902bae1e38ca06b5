//! Result value handed to renderers and notifiers.
//!
//! # Design
//! `MotionStatus` is a tri-state: `enabled` is `None` when the state could
//! not be determined. The constructors are the only way to build one, which
//! keeps the "unavailable implies unknown" rule from being broken by callers.

use crate::error::CameraError;

/// Outcome of a status read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionStatus {
    enabled: Option<bool>,
    available: bool,
    error_message: Option<String>,
}

impl MotionStatus {
    /// The camera answered with 2xx. `enabled` is `None` when the body did
    /// not contain the motion detection key.
    pub fn available(enabled: Option<bool>) -> Self {
        Self {
            enabled,
            available: true,
            error_message: None,
        }
    }

    /// The exchange failed; the state is unknown.
    pub fn unavailable(error: &CameraError) -> Self {
        Self {
            enabled: None,
            available: false,
            error_message: Some(error.to_string()),
        }
    }

    pub fn enabled(&self) -> Option<bool> {
        self.enabled
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}
