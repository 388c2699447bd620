use super::model::{ClassifierModel, ModelLoader};
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::events::DetectionEvent;
use crate::photo::Image;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Applies the confidence threshold to raw model output.
///
/// The model is loaded lazily on the first `detect` call and cached. A failed
/// load is reported as `ModelUnavailable` and attempted again on the next call.
pub struct Classifier {
    loader: Arc<dyn ModelLoader>,
    model: Mutex<Option<Arc<dyn ClassifierModel>>>,
    threshold: f32,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig, loader: Arc<dyn ModelLoader>) -> Self {
        info!(
            "Creating classifier with confidence threshold {}",
            config.confidence_threshold
        );

        Self {
            loader,
            model: Mutex::new(None),
            threshold: config.confidence_threshold,
        }
    }

    /// Run recognition and keep the top label of every observation that
    /// reaches the threshold (inclusive).
    pub fn detect(&self, image: &Image) -> Result<Vec<DetectionEvent>, ClassifierError> {
        let model = self.model()?;

        let observations = model.classify(image).map_err(|e| {
            warn!("Recognition failed for photo {}: {}", image.id, e);
            e
        })?;

        let detections: Vec<DetectionEvent> = observations
            .iter()
            .filter_map(|observation| observation.top_label())
            .filter(|top| top.confidence >= self.threshold)
            .map(|top| DetectionEvent::new(top.label.clone(), top.confidence))
            .collect();

        debug!(
            "Photo {}: {} observations, {} accepted",
            image.id,
            observations.len(),
            detections.len()
        );

        Ok(detections)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model.lock().is_some()
    }

    fn model(&self) -> Result<Arc<dyn ClassifierModel>, ClassifierError> {
        let mut cached = self.model.lock();
        if let Some(model) = cached.as_ref() {
            return Ok(Arc::clone(model));
        }

        let model = self.loader.load().map_err(|e| {
            warn!("Failed to load classifier model: {}", e);
            match e {
                ClassifierError::ModelUnavailable { .. } => e,
                other => ClassifierError::ModelUnavailable {
                    details: other.to_string(),
                },
            }
        })?;

        info!("Classifier model loaded");
        *cached = Some(Arc::clone(&model));
        Ok(model)
    }
}
