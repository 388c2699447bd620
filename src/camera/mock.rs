use super::device::{CaptureDevice, PermissionStatus};
use crate::config::{CameraPosition, CaptureQuality};
use crate::error::CameraError;
use crate::photo::{Image, ImageFormat};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Counters shared between a [`MockCaptureDevice`] and the test driving it
#[derive(Debug, Default)]
pub struct MockDeviceStats {
    pub permission_requests: AtomicUsize,
    pub configure_calls: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub captures: AtomicUsize,
    configured: Mutex<Option<(CameraPosition, CaptureQuality)>>,
}

impl MockDeviceStats {
    pub fn configured_with(&self) -> Option<(CameraPosition, CaptureQuality)> {
        *self.configured.lock()
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

/// In-memory capture device producing small fake JPEG stills
pub struct MockCaptureDevice {
    permission: PermissionStatus,
    configure_error: Option<CameraError>,
    capture_error: Option<CameraError>,
    capture_delay: Duration,
    payload: (Vec<u8>, ImageFormat),
    running: bool,
    next_id: AtomicU64,
    stats: Arc<MockDeviceStats>,
}

impl MockCaptureDevice {
    pub fn new() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            configure_error: None,
            capture_error: None,
            capture_delay: Duration::ZERO,
            // SOI + EOI markers are enough for anything that only checks framing
            payload: (vec![0xFF, 0xD8, 0xFF, 0xD9], ImageFormat::Jpeg),
            running: false,
            next_id: AtomicU64::new(1),
            stats: Arc::new(MockDeviceStats::default()),
        }
    }

    pub fn with_permission(mut self, permission: PermissionStatus) -> Self {
        self.permission = permission;
        self
    }

    /// Fail `configure` with the given error
    pub fn with_configure_error(mut self, error: CameraError) -> Self {
        self.configure_error = Some(error);
        self
    }

    /// Fail every capture with the given error
    pub fn with_capture_error(mut self, error: CameraError) -> Self {
        self.capture_error = Some(error);
        self
    }

    /// Block the worker thread this long per capture
    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    /// Produce stills with these bytes instead of the default JPEG
    pub fn with_payload(mut self, data: Vec<u8>, format: ImageFormat) -> Self {
        self.payload = (data, format);
        self
    }

    pub fn stats(&self) -> Arc<MockDeviceStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for MockCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for MockCaptureDevice {
    fn request_permission(&mut self) -> PermissionStatus {
        self.stats.permission_requests.fetch_add(1, Ordering::SeqCst);
        self.permission
    }

    fn configure(
        &mut self,
        position: CameraPosition,
        quality: CaptureQuality,
    ) -> Result<(), CameraError> {
        self.stats.configure_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.configure_error {
            return Err(error.clone());
        }
        *self.stats.configured.lock() = Some((position, quality));
        Ok(())
    }

    fn start_running(&mut self) -> Result<(), CameraError> {
        self.stats.starts.fetch_add(1, Ordering::SeqCst);
        self.running = true;
        Ok(())
    }

    fn stop_running(&mut self) {
        self.stats.stops.fetch_add(1, Ordering::SeqCst);
        self.running = false;
    }

    fn capture(&mut self) -> Result<Image, CameraError> {
        if !self.capture_delay.is_zero() {
            std::thread::sleep(self.capture_delay);
        }
        if let Some(error) = &self.capture_error {
            return Err(error.clone());
        }

        self.stats.captures.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!("Mock device produced photo {}", id);

        let (data, format) = &self.payload;
        Ok(Image::new(id, data.clone(), 640, 480, *format))
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
