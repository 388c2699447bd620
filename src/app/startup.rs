use super::types::components::{AGGREGATOR, CAMERA, CLASSIFIER, KITCHEN, STORE};
use super::{ComponentState, FruitcamApp};
use crate::error::{CameraError, Result};
use crate::events::FruitcamEvent;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{error, info, warn};

impl FruitcamApp {
    /// Register components and prepare the camera.
    ///
    /// A camera that cannot be prepared (e.g. permission denied) is marked
    /// `Failed` and the app carries on without it.
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing fruitcam components");

        let mut states = self.component_states.lock().await;
        for component in Self::component_names() {
            states.insert(component.to_string(), ComponentState::Stopped);
        }
        drop(states);

        // The store was opened (and recovered if needed) during construction
        self.set_component_state(STORE, ComponentState::Running).await;

        self.set_component_state(CAMERA, ComponentState::Starting)
            .await;
        let session = Arc::clone(&self.session);
        match run_blocking(move || session.initialize()).await {
            Ok(()) => {
                self.set_component_state(CAMERA, ComponentState::Stopped)
                    .await;
                info!("Camera ready");
            }
            Err(e) => {
                self.camera_failed(&e).await;
            }
        }

        info!("All components initialized");
        Ok(())
    }

    /// Start the capture session and begin aggregating detections
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting fruitcam");

        if self.get_component_state(CAMERA).await == Some(ComponentState::Failed) {
            warn!("Camera unavailable, starting in degraded mode");
        } else {
            self.set_component_state(CAMERA, ComponentState::Starting)
                .await;
            let session = Arc::clone(&self.session);
            match run_blocking(move || session.start()).await {
                Ok(()) => {
                    self.set_component_state(CAMERA, ComponentState::Running)
                        .await;
                    self.event_bus.publish(FruitcamEvent::CameraStatusChanged {
                        running: true,
                        timestamp: SystemTime::now(),
                    });
                }
                Err(e) => {
                    error!("Failed to start capture session: {}", e);
                    self.camera_failed(&e).await;
                }
            }
        }

        self.set_component_state(CLASSIFIER, ComponentState::Running)
            .await;

        self.set_component_state(AGGREGATOR, ComponentState::Starting)
            .await;
        self.aggregator.attach(&self.event_bus);
        self.set_component_state(AGGREGATOR, ComponentState::Running)
            .await;

        self.set_component_state(KITCHEN, ComponentState::Running)
            .await;

        info!("Fruitcam started");
        Ok(())
    }

    async fn camera_failed(&self, e: &CameraError) {
        warn!("Camera unavailable: {}", e);
        self.set_component_state(CAMERA, ComponentState::Failed)
            .await;
        self.event_bus.publish(FruitcamEvent::SystemError {
            component: CAMERA.to_string(),
            error: e.user_message(),
        });
    }
}

/// Run a call that blocks on the capture worker without stalling the runtime
pub(super) async fn run_blocking<F>(call: F) -> std::result::Result<(), CameraError>
where
    F: FnOnce() -> std::result::Result<(), CameraError> + Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .unwrap_or_else(|e| {
            error!("Capture session call panicked: {}", e);
            Err(CameraError::WorkerGone)
        })
}
