mod builder;
mod device;
mod mock;
mod session;

pub use builder::CaptureSessionBuilder;
pub use device::{CaptureDevice, PermissionStatus};
pub use mock::{MockCaptureDevice, MockDeviceStats};
pub use session::{CaptureSession, CapturedPhoto, SessionState};
