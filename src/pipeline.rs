use crate::camera::CaptureSession;
use crate::classifier::Classifier;
use crate::error::{CameraError, ClassifierError};
use crate::events::{EventBus, FruitcamEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Result of one capture/classify round trip
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Labels that reached the threshold, in model order (possibly empty)
    Detected(Vec<String>),
    /// The session was stopped or restarted while the photo was processed
    Discarded,
    /// Recognition failed; the photo yields no results
    Failed(ClassifierError),
}

/// Drives capture → classify → publish for a single session
pub struct DetectionPipeline {
    session: Arc<CaptureSession>,
    classifier: Arc<Classifier>,
    event_bus: Arc<EventBus>,
    inference_timeout: Option<Duration>,
    notice: watch::Sender<Option<String>>,
    captured_labels: Mutex<Vec<String>>,
}

impl DetectionPipeline {
    pub fn new(
        session: Arc<CaptureSession>,
        classifier: Arc<Classifier>,
        event_bus: Arc<EventBus>,
        inference_timeout: Option<Duration>,
    ) -> Self {
        let (notice, _) = watch::channel(None);
        Self {
            session,
            classifier,
            event_bus,
            inference_timeout,
            notice,
            captured_labels: Mutex::new(Vec::new()),
        }
    }

    /// Take a photo, classify it and publish every accepted label.
    ///
    /// Capture failures are returned as errors. Classifier failures are
    /// reported through the outcome and the inference notice.
    pub async fn scan(&self) -> Result<ScanOutcome, CameraError> {
        let photo = self.session.capture_photo().await?;
        let epoch = photo.epoch();
        self.event_bus
            .publish(FruitcamEvent::CaptureStarted { epoch });

        let classifier = Arc::clone(&self.classifier);
        let image = photo.image().clone();
        let mut inference = tokio::task::spawn_blocking(move || classifier.detect(&image));

        let joined = match self.inference_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut inference).await {
                Ok(joined) => joined,
                Err(_) => {
                    // Blocking inference can't be cancelled; keep the slot until it returns
                    tokio::spawn(async move {
                        let _ = inference.await;
                        debug!("Late inference for photo {} finished", photo.image().id);
                        drop(photo);
                    });
                    return Ok(self.fail(ClassifierError::Timeout {
                        timeout_ms: limit.as_millis() as u64,
                    }));
                }
            },
            None => inference.await,
        };

        let result = joined.unwrap_or_else(|e| {
            Err(ClassifierError::Inference {
                details: format!("inference task failed: {}", e),
            })
        });

        // The capture slot is still held until `photo` drops at the end of scope
        if !self.session.is_current(epoch) {
            debug!(
                "Discarding result for photo {} from stale session epoch {}",
                photo.image().id,
                epoch
            );
            return Ok(ScanOutcome::Discarded);
        }

        let detections = match result {
            Ok(detections) => detections,
            Err(e) => return Ok(self.fail(e)),
        };

        self.notice.send_replace(None);

        let labels: Vec<String> = detections.iter().map(|d| d.label.clone()).collect();
        self.record_labels(&labels);

        for detection in detections {
            self.event_bus.publish(FruitcamEvent::FruitDetected(detection));
        }
        self.event_bus.publish(FruitcamEvent::CaptureCompleted {
            epoch,
            label_count: labels.len(),
        });

        info!("Scan of photo {} accepted {} labels", photo.image().id, labels.len());
        Ok(ScanOutcome::Detected(labels))
    }

    /// Transient message describing the last recognition failure
    pub fn inference_notice(&self) -> watch::Receiver<Option<String>> {
        self.notice.subscribe()
    }

    pub fn current_notice(&self) -> Option<String> {
        self.notice.borrow().clone()
    }

    pub fn clear_notice(&self) {
        self.notice.send_replace(None);
    }

    /// Labels accepted since the last clear, without duplicates
    pub fn captured_labels(&self) -> Vec<String> {
        self.captured_labels.lock().clone()
    }

    pub fn clear_captured_labels(&self) {
        self.captured_labels.lock().clear();
    }

    pub fn session(&self) -> &Arc<CaptureSession> {
        &self.session
    }

    fn record_labels(&self, labels: &[String]) {
        let mut captured = self.captured_labels.lock();
        for label in labels {
            if !captured.contains(label) {
                captured.push(label.clone());
            }
        }
    }

    fn fail(&self, error: ClassifierError) -> ScanOutcome {
        warn!("Recognition failed: {}", error);
        self.notice.send_replace(Some(error.to_string()));
        self.event_bus.publish(FruitcamEvent::InferenceFailed {
            error: error.to_string(),
        });
        ScanOutcome::Failed(error)
    }
}
