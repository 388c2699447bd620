use crate::error::ClassifierError;
use crate::photo::Image;
use std::sync::Arc;

/// One candidate label with the model's confidence in it
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// A single recognized object and its candidate labels
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Observation {
    pub labels: Vec<Classification>,
}

impl Observation {
    pub fn new(labels: Vec<Classification>) -> Self {
        Self { labels }
    }

    /// Observation with exactly one candidate
    pub fn single(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            labels: vec![Classification::new(label, confidence)],
        }
    }

    /// Highest-confidence candidate, if any
    pub fn top_label(&self) -> Option<&Classification> {
        self.labels
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

/// A loaded on-device recognition model
pub trait ClassifierModel: Send + Sync {
    fn classify(&self, image: &Image) -> Result<Vec<Observation>, ClassifierError>;
}

/// Produces the model on first use
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn ClassifierModel>, ClassifierError>;
}
