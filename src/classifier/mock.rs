use super::model::{ClassifierModel, ModelLoader, Observation};
use crate::error::ClassifierError;
use crate::photo::Image;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Model that replays queued responses, then a fixed fallback
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<Vec<Observation>, ClassifierError>>>,
    fallback: Vec<Observation>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Vec::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_fallback(mut self, observations: Vec<Observation>) -> Self {
        self.fallback = observations;
        self
    }

    /// Block the calling thread this long per classification
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push_response(&self, response: Result<Vec<Observation>, ClassifierError>) {
        self.script.lock().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of `classify` calls that overlapped
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierModel for ScriptedModel {
    fn classify(&self, _image: &Image) -> Result<Vec<Observation>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let response = match self.script.lock().pop_front() {
            Some(response) => response,
            None => Ok(self.fallback.clone()),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

/// Loader handing out a shared [`ScriptedModel`]
pub struct ScriptedLoader {
    model: Arc<ScriptedModel>,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl ScriptedLoader {
    pub fn new(model: Arc<ScriptedModel>) -> Self {
        Self {
            model,
            failures_left: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Fail the first `n` load attempts with `ModelUnavailable`
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ModelLoader for ScriptedLoader {
    fn load(&self) -> Result<Arc<dyn ClassifierModel>, ClassifierError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(ClassifierError::ModelUnavailable {
                details: "model asset missing".to_string(),
            });
        }

        let model: Arc<dyn ClassifierModel> = self.model.clone();
        Ok(model)
    }
}
