use crate::config::{CameraPosition, CaptureQuality};
use crate::error::CameraError;
use crate::photo::Image;

/// Outcome of asking the platform for camera access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Platform camera as consumed by [`CaptureSession`](super::CaptureSession).
///
/// Implementations may have thread affinity: every call is made from the
/// session's dedicated worker thread, never concurrently.
pub trait CaptureDevice: Send + 'static {
    /// Ask for (or report existing) camera permission
    fn request_permission(&mut self) -> PermissionStatus;

    /// Attach input and photo output for the requested camera and preset
    fn configure(
        &mut self,
        position: CameraPosition,
        quality: CaptureQuality,
    ) -> Result<(), CameraError>;

    fn start_running(&mut self) -> Result<(), CameraError>;

    /// Must not return until the device has fully halted
    fn stop_running(&mut self);

    /// Take a single still photo
    fn capture(&mut self) -> Result<Image, CameraError>;

    fn is_running(&self) -> bool;
}
