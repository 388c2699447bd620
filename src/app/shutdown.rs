use super::startup::run_blocking;
use super::types::components::{AGGREGATOR, CAMERA, CLASSIFIER, KITCHEN, STORE};
use super::{ComponentState, FruitcamApp};
use crate::error::{FruitcamError, Result};
use crate::events::FruitcamEvent;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::timeout;
use tracing::{error, info};

impl FruitcamApp {
    /// Stop every component in reverse dependency order.
    ///
    /// Returns the process exit code: 0 when everything stopped cleanly.
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        // Cancel all background tasks
        self.cancellation_token.cancel();

        let mut exit_code = 0;

        self.kitchen.shutdown();
        self.set_component_state(KITCHEN, ComponentState::Stopped)
            .await;

        let aggregator = Arc::clone(&self.aggregator);
        let stopped = self
            .stop_component(AGGREGATOR, Duration::from_secs(5), async move {
                aggregator.shutdown().await;
                Ok::<(), FruitcamError>(())
            })
            .await;
        if let Err(e) = stopped {
            error!("Error stopping aggregator: {}", e);
            exit_code = 1;
        }

        if self.get_component_state(CAMERA).await == Some(ComponentState::Failed) {
            info!("Camera was never available, nothing to stop");
        } else {
            let session = Arc::clone(&self.session);
            let stopped = self
                .stop_component(CAMERA, Duration::from_secs(10), async move {
                    run_blocking(move || session.stop())
                        .await
                        .map_err(FruitcamError::from)
                })
                .await;
            match stopped {
                Ok(()) => {
                    self.event_bus.publish(FruitcamEvent::CameraStatusChanged {
                        running: false,
                        timestamp: SystemTime::now(),
                    });
                }
                Err(e) => {
                    error!("Error stopping camera: {}", e);
                    exit_code = 1;
                }
            }
        }

        self.set_component_state(CLASSIFIER, ComponentState::Stopped)
            .await;
        self.set_component_state(STORE, ComponentState::Stopped)
            .await;

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    /// Run `stop` under a deadline and record the resulting state
    async fn stop_component<F>(&self, component: &str, limit: Duration, stop: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping)
            .await;

        match timeout(limit, stop).await {
            Ok(Ok(())) => {
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("Error stopping {} component: {}", component, e);
                Err(e)
            }
            Err(_) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("{} component stop timeout", component);
                Err(FruitcamError::System {
                    message: format!("{} component stop timeout", component),
                })
            }
        }
    }
}
