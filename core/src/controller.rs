//! Refresh and toggle flows on top of `CameraClient`.
//!
//! Renderers and notifiers live in the host; they plug in through
//! `StatusSink` and `MotionNotifier`. The last known state is always passed
//! in by the caller rather than remembered here.

use crate::client::CameraClient;
use crate::error::CameraError;
use crate::transport::Transport;
use crate::types::MotionStatus;

/// Receives every status produced by a refresh.
pub trait StatusSink {
    fn render(&self, status: &MotionStatus);
}

/// Told when motion detection has just been switched on.
pub trait MotionNotifier {
    fn motion_enabled(&self);
}

/// True when `current` reports motion detection on and `previous` did not.
pub fn should_notify(previous: Option<bool>, current: &MotionStatus) -> bool {
    current.enabled() == Some(true) && previous != Some(true)
}

/// Read the status, hand it to `sink`, and notify on an off-to-on edge.
pub fn refresh<T, S, N>(client: &CameraClient<T>, previous: Option<bool>, sink: &S, notifier: &N) -> MotionStatus
where
    T: Transport,
    S: StatusSink + ?Sized,
    N: MotionNotifier + ?Sized,
{
    let status = client.get_motion_detection_status();
    log::debug!(
        "refresh: enabled={:?} available={}",
        status.enabled(),
        status.is_available()
    );
    sink.render(&status);
    if should_notify(previous, &status) {
        log::debug!("motion detection turned on, notifying");
        notifier.motion_enabled();
    }
    status
}

/// Flip the switch relative to `current` and read back the result.
///
/// Refuses to guess when `current` is unknown. The returned status comes
/// from a fresh read, since the write itself confirms nothing.
pub fn toggle<T: Transport>(client: &CameraClient<T>, current: &MotionStatus) -> Result<MotionStatus, CameraError> {
    let Some(enabled) = current.enabled() else {
        log::warn!("cannot toggle, current status is unknown");
        return Err(CameraError::StatusUnknown);
    };
    log::debug!("toggling motion detection from {enabled} to {}", !enabled);
    client.set_motion_detection_status(!enabled)?;
    Ok(client.get_motion_detection_status())
}
