use super::actor::{AggregatorActor, AggregatorCommand};
use super::model::{Ingredient, IngredientSnapshot};
use crate::config::AggregatorConfig;
use crate::error::IngredientError;
use crate::events::{DetectionEvent, EventBus, EventFilter, FruitcamEvent, Subscription};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Folds detection events into a de-duplicated ingredient collection.
///
/// Every mutation goes through a single actor task, so delayed detection
/// commits and manual edits never race. Detections are committed after the
/// configured settle delay; `is_processing` stays raised while any are
/// outstanding.
pub struct IngredientAggregator {
    commands: mpsc::Sender<AggregatorCommand>,
    detections: mpsc::UnboundedSender<String>,
    snapshot: watch::Receiver<IngredientSnapshot>,
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    subscription: Mutex<Option<Subscription>>,
}

impl IngredientAggregator {
    /// Spawn the aggregator actor. Must be called within a tokio runtime.
    pub fn new(config: &AggregatorConfig) -> Self {
        info!(
            "Creating ingredient aggregator (settle delay {:?})",
            config.settle_delay()
        );

        let (commands, receiver) = mpsc::channel(config.command_capacity.max(1));
        let (detections, detection_receiver) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(IngredientSnapshot::default());
        let token = CancellationToken::new();

        let actor = AggregatorActor::new(
            config.settle_delay(),
            commands.clone(),
            snapshot_tx,
            token.clone(),
        );
        let task = tokio::spawn(actor.run(receiver, detection_receiver));

        Self {
            commands,
            detections,
            snapshot,
            token,
            task: Mutex::new(Some(task)),
            subscription: Mutex::new(None),
        }
    }

    /// Subscribe to detection events on the bus. Replaces any earlier attachment.
    pub fn attach(&self, event_bus: &EventBus) {
        let detections = self.detections.clone();
        let subscription = event_bus.subscribe_handler(
            "ingredient-aggregator",
            EventFilter::detections(),
            move |event| {
                if let FruitcamEvent::FruitDetected(detection) = event {
                    submit_detection(&detections, detection)?;
                }
                Ok(())
            },
        );

        if self.subscription.lock().replace(subscription).is_some() {
            debug!("Replaced previous aggregator subscription");
        }
    }

    /// Stop receiving detection events
    pub async fn detach(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.release().await;
            debug!("Ingredient aggregator detached from event bus");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Queue a detection for a delayed, de-duplicated commit
    pub fn on_detection(&self, event: DetectionEvent) -> Result<(), IngredientError> {
        submit_detection(&self.detections, event)
    }

    /// Add an ingredient without a uniqueness check
    pub async fn add_manual(&self, name: Option<String>) -> Result<Ingredient, IngredientError> {
        self.request(|reply| AggregatorCommand::AddManual { name, reply })
            .await
    }

    pub async fn rename(&self, id: Uuid, name: impl Into<String>) -> Result<(), IngredientError> {
        let name = name.into();
        self.request(|reply| AggregatorCommand::Rename { id, name, reply })
            .await?
    }

    pub async fn remove(&self, id: Uuid) -> Result<Ingredient, IngredientError> {
        self.request(|reply| AggregatorCommand::Remove { id, reply })
            .await?
    }

    /// Insert every label not yet present, immediately. Returns how many were added.
    pub async fn merge_labels(&self, labels: Vec<String>) -> Result<usize, IngredientError> {
        self.request(|reply| AggregatorCommand::Merge { labels, reply })
            .await
    }

    /// Clear `is_processing`; the collection is kept
    pub async fn reset(&self) -> Result<(), IngredientError> {
        self.request(|reply| AggregatorCommand::Reset { reply }).await
    }

    /// State after every previously queued command has been applied
    pub async fn current(&self) -> Result<IngredientSnapshot, IngredientError> {
        self.request(|reply| AggregatorCommand::Snapshot { reply })
            .await
    }

    /// Latest published state
    pub fn snapshot(&self) -> IngredientSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn ingredients(&self) -> Vec<Ingredient> {
        self.snapshot.borrow().ingredients.clone()
    }

    pub fn is_processing(&self) -> bool {
        self.snapshot.borrow().is_processing
    }

    pub fn subscribe(&self) -> watch::Receiver<IngredientSnapshot> {
        self.snapshot.clone()
    }

    /// Detach, cancel pending commits and stop the actor
    pub async fn shutdown(&self) {
        self.detach().await;
        self.token.cancel();

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Ingredient aggregator task ended abnormally: {}", e);
            }
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> AggregatorCommand,
    ) -> Result<T, IngredientError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| IngredientError::AggregatorStopped)?;
        response
            .await
            .map_err(|_| IngredientError::AggregatorStopped)
    }
}

impl Drop for IngredientAggregator {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn submit_detection(
    detections: &mpsc::UnboundedSender<String>,
    event: DetectionEvent,
) -> Result<(), IngredientError> {
    debug!("Queueing detection '{}'", event.label);
    detections
        .send(event.label)
        .map_err(|_| IngredientError::AggregatorStopped)
}
