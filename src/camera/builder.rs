use super::device::CaptureDevice;
use super::session::CaptureSession;
use crate::config::CameraConfig;
use crate::error::{FruitcamError, Result};

/// Builder for a capture session over a platform device
pub struct CaptureSessionBuilder {
    config: Option<CameraConfig>,
    device: Option<Box<dyn CaptureDevice>>,
}

impl CaptureSessionBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            device: None,
        }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn device<D: CaptureDevice>(mut self, device: D) -> Self {
        self.device = Some(Box::new(device));
        self
    }

    pub fn boxed_device(mut self, device: Box<dyn CaptureDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn build(self) -> Result<CaptureSession> {
        let config = self
            .config
            .ok_or_else(|| FruitcamError::system("Camera configuration must be specified"))?;
        let device = self
            .device
            .ok_or_else(|| FruitcamError::system("Capture device must be specified"))?;

        CaptureSession::new(device, config)
    }
}

impl Default for CaptureSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
