//! Parser for the camera's plaintext `key=value` config dump.

/// Line prefix carrying the motion detection switch.
pub const MOTION_DETECT_KEY: &str = "table.MotionDetect[0].Enable=";

/// Read the motion detection switch out of a `getConfig` body.
///
/// `None` when no line starts with [`MOTION_DETECT_KEY`]. Otherwise
/// `Some(true)` only for a value equal to `true` ignoring case and
/// surrounding whitespace; any other value reads as `Some(false)`.
pub fn parse_motion_detection_status(body: &str) -> Option<bool> {
    let line = body.split('\n').find(|line| line.starts_with(MOTION_DETECT_KEY));
    let Some(line) = line else {
        log::warn!("motion detection status line not found in response");
        return None;
    };
    let value = line.split_once('=').map(|(_, value)| value.trim()).unwrap_or("");
    Some(value.eq_ignore_ascii_case("true"))
}
