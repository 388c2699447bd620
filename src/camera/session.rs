use super::device::{CaptureDevice, PermissionStatus};
use crate::config::CameraConfig;
use crate::error::{CameraError, Result};
use crate::photo::Image;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

/// Observable lifecycle of a capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Permission and device configuration have not run yet
    Uninitialized,
    /// Configured and stopped
    Ready,
    Running,
    /// Terminal until `initialize` is called again
    Unavailable(CameraError),
}

enum SessionCommand {
    Initialize {
        reply: Sender<std::result::Result<(), CameraError>>,
    },
    Start {
        reply: Sender<std::result::Result<(), CameraError>>,
    },
    Stop {
        reply: Sender<()>,
    },
    Capture {
        reply: oneshot::Sender<std::result::Result<Image, CameraError>>,
    },
    Shutdown,
}

/// Owns the capture device on a dedicated worker thread.
///
/// All device calls are serialized onto that thread. At most one photo may
/// be in flight; the slot stays taken until the returned [`CapturedPhoto`]
/// is dropped, so callers can hold it through inference.
pub struct CaptureSession {
    config: CameraConfig,
    commands: Sender<SessionCommand>,
    state: watch::Sender<SessionState>,
    running: Arc<AtomicBool>,
    capturing: Arc<AtomicBool>,
    epoch: Arc<AtomicU64>,
    lifecycle: Mutex<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CaptureSession {
    /// Spawn the capture worker thread for the given device
    pub fn new(device: Box<dyn CaptureDevice>, config: CameraConfig) -> Result<Self> {
        info!(
            "Creating capture session ({:?} camera, {:?} quality)",
            config.position, config.quality
        );

        let (commands, receiver) = channel::unbounded();
        let worker_config = config.clone();
        let worker = std::thread::Builder::new()
            .name("capture-session".to_string())
            .spawn(move || run_worker(device, worker_config, receiver))?;

        let (state, _) = watch::channel(SessionState::Uninitialized);

        Ok(Self {
            config,
            commands,
            state,
            running: Arc::new(AtomicBool::new(false)),
            capturing: Arc::new(AtomicBool::new(false)),
            epoch: Arc::new(AtomicU64::new(0)),
            lifecycle: Mutex::new(()),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Request permission and configure the device.
    ///
    /// Also the explicit re-initialization path out of `Unavailable`.
    pub fn initialize(&self) -> std::result::Result<(), CameraError> {
        let _lifecycle = self.lifecycle.lock();
        self.initialize_locked()
    }

    fn initialize_locked(&self) -> std::result::Result<(), CameraError> {
        if matches!(self.state(), SessionState::Ready | SessionState::Running) {
            debug!("Capture session already initialized");
            return Ok(());
        }

        info!("Initializing capture session");
        match self.request(|reply| SessionCommand::Initialize { reply })? {
            Ok(()) => {
                self.state.send_replace(SessionState::Ready);
                info!("Capture session ready");
                Ok(())
            }
            Err(e) => {
                self.mark_unavailable(&e);
                Err(e)
            }
        }
    }

    /// Start the device. No-op when already running.
    pub fn start(&self) -> std::result::Result<(), CameraError> {
        let _lifecycle = self.lifecycle.lock();

        match self.state() {
            SessionState::Running => {
                warn!("Capture session is already running");
                return Ok(());
            }
            SessionState::Unavailable(e) => return Err(e),
            SessionState::Uninitialized => self.initialize_locked()?,
            SessionState::Ready => {}
        }

        info!("Starting capture session");
        if let Err(e) = self.request(|reply| SessionCommand::Start { reply })? {
            error!("Failed to start capture session: {}", e);
            if e.is_device_error() {
                self.mark_unavailable(&e);
            }
            return Err(e);
        }

        self.running.store(true, Ordering::SeqCst);
        self.state.send_replace(SessionState::Running);
        info!("Capture session started");
        Ok(())
    }

    /// Stop the device. Blocks until the worker reports it fully halted.
    pub fn stop(&self) -> std::result::Result<(), CameraError> {
        let _lifecycle = self.lifecycle.lock();

        if !self.running.load(Ordering::SeqCst) {
            debug!("Capture session is not running");
            return Ok(());
        }

        info!("Stopping capture session");
        self.running.store(false, Ordering::SeqCst);
        // Photos taken under the previous epoch are stale from here on
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let result = self.request(|reply| SessionCommand::Stop { reply });
        self.state.send_replace(SessionState::Ready);

        match result {
            Ok(()) => {
                info!("Capture session stopped");
                Ok(())
            }
            Err(e) => {
                warn!("Capture worker unavailable while stopping: {}", e);
                Err(e)
            }
        }
    }

    /// Take one photo.
    ///
    /// Rejects with `NotRunning` when stopped and `AlreadyCapturing` when a
    /// previous photo is still held; requests are never queued.
    pub async fn capture_photo(&self) -> std::result::Result<CapturedPhoto, CameraError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(CameraError::NotRunning);
        }

        if self
            .capturing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Rejecting capture request: another capture is in flight");
            return Err(CameraError::AlreadyCapturing);
        }
        let slot = CaptureSlot {
            flag: Arc::clone(&self.capturing),
        };

        let epoch = self.epoch.load(Ordering::SeqCst);
        let (reply, mut response) = oneshot::channel();
        self.commands
            .send(SessionCommand::Capture { reply })
            .map_err(|_| CameraError::WorkerGone)?;

        let timeout = self.config.capture_timeout();
        let image = match tokio::time::timeout(timeout, &mut response).await {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => return Err(CameraError::WorkerGone),
            Err(_) => {
                warn!("Photo capture timed out after {:?}", timeout);
                // The worker is still inside the device call; the slot frees once it replies
                tokio::spawn(async move {
                    let _ = response.await;
                    drop(slot);
                });
                return Err(CameraError::CaptureTimeout {
                    timeout_ms: self.config.capture_timeout_ms,
                });
            }
        };

        if !image.validate_size() {
            warn!(
                "Rejecting malformed photo {} ({} bytes, {:?} {}x{})",
                image.id,
                image.data.len(),
                image.format,
                image.width,
                image.height
            );
            return Err(CameraError::Capture {
                details: format!("photo {} has an unexpected payload size", image.id),
            });
        }

        debug!("Captured photo {} ({} bytes)", image.id, image.data.len());

        Ok(CapturedPhoto { image, epoch, slot })
    }

    /// Whether a photo taken under `epoch` still belongs to the live session
    pub fn is_current(&self, epoch: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.epoch.load(Ordering::SeqCst) == epoch
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Observe state changes (e.g. to show a permission error)
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Stop the device and join the worker thread
    pub fn shutdown(&self) {
        if let Err(e) = self.stop() {
            warn!("Error stopping capture session during shutdown: {}", e);
        }

        let _ = self.commands.send(SessionCommand::Shutdown);
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!("Capture worker thread panicked");
            }
        }
    }

    fn request<T>(
        &self,
        build: impl FnOnce(Sender<T>) -> SessionCommand,
    ) -> std::result::Result<T, CameraError> {
        let (reply, response) = channel::bounded(1);
        self.commands
            .send(build(reply))
            .map_err(|_| CameraError::WorkerGone)?;
        response.recv().map_err(|_| CameraError::WorkerGone)
    }

    fn mark_unavailable(&self, e: &CameraError) {
        if e.is_device_error() {
            error!("Capture device unavailable: {}", e);
            self.running.store(false, Ordering::SeqCst);
            self.state.send_replace(SessionState::Unavailable(e.clone()));
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A photo plus the capture slot it occupies
#[derive(Debug)]
pub struct CapturedPhoto {
    image: Image,
    epoch: u64,
    slot: CaptureSlot,
}

impl CapturedPhoto {
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Session epoch the photo was taken under
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Give up the capture slot early
    pub fn release(self) -> Image {
        drop(self.slot);
        self.image
    }
}

#[derive(Debug)]
struct CaptureSlot {
    flag: Arc<AtomicBool>,
}

impl Drop for CaptureSlot {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

fn run_worker(
    mut device: Box<dyn CaptureDevice>,
    config: CameraConfig,
    commands: Receiver<SessionCommand>,
) {
    info!("Capture worker started");

    while let Ok(command) = commands.recv() {
        match command {
            SessionCommand::Initialize { reply } => {
                let result = initialize_device(device.as_mut(), &config);
                let _ = reply.send(result);
            }
            SessionCommand::Start { reply } => {
                let result = if device.is_running() {
                    Ok(())
                } else {
                    device.start_running()
                };
                let _ = reply.send(result);
            }
            SessionCommand::Stop { reply } => {
                if device.is_running() {
                    device.stop_running();
                }
                let _ = reply.send(());
            }
            SessionCommand::Capture { reply } => {
                let result = if device.is_running() {
                    device.capture()
                } else {
                    Err(CameraError::NotRunning)
                };
                if reply.send(result).is_err() {
                    debug!("Capture requester went away, dropping photo");
                }
            }
            SessionCommand::Shutdown => break,
        }
    }

    if device.is_running() {
        device.stop_running();
    }
    info!("Capture worker stopped");
}

fn initialize_device(
    device: &mut dyn CaptureDevice,
    config: &CameraConfig,
) -> std::result::Result<(), CameraError> {
    match device.request_permission() {
        PermissionStatus::Granted => debug!("Camera permission granted"),
        PermissionStatus::Denied => return Err(CameraError::PermissionDenied),
    }

    device.configure(config.position, config.quality)
}
