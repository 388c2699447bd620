use super::{FruitcamApp, ShutdownReason};
use crate::error::{FruitcamError, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info, warn};

type ShutdownSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

impl FruitcamApp {
    /// Wait for a signal or a shutdown request, then shut down
    pub async fn run(&mut self) -> Result<i32> {
        info!("Fruitcam is running");

        let shutdown_receiver =
            self.shutdown_receiver
                .take()
                .ok_or_else(|| FruitcamError::System {
                    message: "Shutdown receiver already taken".to_string(),
                })?;

        self.setup_signal_handlers();

        let shutdown_reason = shutdown_receiver.await.map_err(|_| FruitcamError::System {
            message: "Shutdown channel closed unexpectedly".to_string(),
        })?;

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("Fruitcam shutdown complete");
        Ok(exit_code)
    }

    /// Ask a running [`FruitcamApp::run`] to shut down. False if already requested.
    pub async fn request_shutdown(&self, reason: ShutdownReason) -> bool {
        request(&self.shutdown_sender, reason).await
    }

    /// Cloneable handle for requesting shutdown from another task
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            sender: Arc::clone(&self.shutdown_sender),
        }
    }

    fn setup_signal_handlers(&self) {
        // SIGTERM (service stop), Unix only
        #[cfg(unix)]
        {
            let sender = Arc::clone(&self.shutdown_sender);
            let token = self.cancellation_token.clone();
            tokio::spawn(async move {
                let mut sigterm =
                    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                        Ok(sigterm) => sigterm,
                        Err(e) => {
                            error!("Failed to register SIGTERM handler: {}", e);
                            return;
                        }
                    };

                tokio::select! {
                    _ = token.cancelled() => {}
                    Some(()) = sigterm.recv() => {
                        info!("Received SIGTERM signal");
                        request(&sender, ShutdownReason::Signal("SIGTERM".to_string())).await;
                    }
                }
            });
        }

        // SIGINT (Ctrl+C)
        let sender = Arc::clone(&self.shutdown_sender);
        let token = self.cancellation_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = signal::ctrl_c() => match result {
                    Ok(()) => {
                        info!("Received SIGINT signal (Ctrl+C)");
                        request(&sender, ShutdownReason::Signal("SIGINT".to_string())).await;
                    }
                    Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
                },
            }
        });
    }
}

/// Cloneable trigger for shutting down a running app
#[derive(Clone)]
pub struct ShutdownHandle {
    sender: ShutdownSender,
}

impl ShutdownHandle {
    pub async fn request(&self, reason: ShutdownReason) -> bool {
        request(&self.sender, reason).await
    }
}

async fn request(sender: &ShutdownSender, reason: ShutdownReason) -> bool {
    match sender.lock().await.take() {
        Some(sender) => sender.send(reason).is_ok(),
        None => false,
    }
}
