use crate::error::EventBusError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A single accepted classifier label for one captured photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub label: String,
    /// Always within [0, 1]
    pub confidence: f32,
    pub timestamp: SystemTime,
}

impl DetectionEvent {
    pub fn new<S: Into<String>>(label: S, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            timestamp: SystemTime::now(),
        }
    }
}

/// Events that can occur in the fruitcam pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FruitcamEvent {
    /// The classifier accepted a label
    FruitDetected(DetectionEvent),
    /// A photo capture request was accepted by the session
    CaptureStarted { epoch: u64 },
    /// A capture/classify round trip finished
    CaptureCompleted { epoch: u64, label_count: usize },
    /// The classifier could not produce results for a photo
    InferenceFailed { error: String },
    /// Capture session running state changed
    CameraStatusChanged {
        running: bool,
        timestamp: SystemTime,
    },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
}

impl FruitcamEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            FruitcamEvent::FruitDetected(detection) => format!(
                "Detected '{}' ({:.2})",
                detection.label, detection.confidence
            ),
            FruitcamEvent::CaptureStarted { epoch } => format!("Capture started (epoch {})", epoch),
            FruitcamEvent::CaptureCompleted { epoch, label_count } => format!(
                "Capture completed (epoch {}, {} labels)",
                epoch, label_count
            ),
            FruitcamEvent::InferenceFailed { error } => format!("Inference failed: {}", error),
            FruitcamEvent::CameraStatusChanged { running, .. } => {
                format!("Camera {}", if *running { "running" } else { "stopped" })
            }
            FruitcamEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            FruitcamEvent::FruitDetected(_) => "fruit_detected",
            FruitcamEvent::CaptureStarted { .. } => "capture_started",
            FruitcamEvent::CaptureCompleted { .. } => "capture_completed",
            FruitcamEvent::InferenceFailed { .. } => "inference_failed",
            FruitcamEvent::CameraStatusChanged { .. } => "camera_status_changed",
            FruitcamEvent::SystemError { .. } => "system_error",
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&FruitcamEvent) -> bool),
}

impl EventFilter {
    /// Only fruit detections
    pub fn detections() -> Self {
        EventFilter::EventTypes(vec!["fruit_detected"])
    }

    /// Check if an event passes this filter
    pub fn matches(&self, event: &FruitcamEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

type SubscriptionRegistry = Arc<Mutex<HashMap<u64, String>>>;

/// In-process publish/subscribe bus built on a broadcast channel.
///
/// Events from one `publish` call reach every live subscriber before the
/// events of the next call from the same publisher. Subscribers only see
/// events published after they subscribed.
pub struct EventBus {
    sender: broadcast::Sender<FruitcamEvent>,
    subscriptions: SubscriptionRegistry,
    next_subscription_id: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            next_subscription_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Subscribe to the raw event stream
    pub fn subscribe(&self) -> broadcast::Receiver<FruitcamEvent> {
        self.sender.subscribe()
    }

    /// Register a handler that is called for every matching event.
    ///
    /// The handler runs on its own task. Errors and panics raised by the
    /// handler are logged and never reach other subscribers. Delivery stops
    /// when the returned [`Subscription`] is dropped or released.
    pub fn subscribe_handler<F>(
        &self,
        name: impl Into<String>,
        filter: EventFilter,
        handler: F,
    ) -> Subscription
    where
        F: Fn(FruitcamEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);
        // Receiver must exist before returning so nothing published afterwards is missed
        let mut receiver = self.sender.subscribe();
        let token = CancellationToken::new();

        self.subscriptions.lock().insert(id, name.clone());

        let task_token = token.clone();
        let task_name = name.clone();
        let task = tokio::spawn(async move {
            debug!("Subscriber '{}' ({}) started", task_name, id);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    received = receiver.recv() => match received {
                        Ok(event) => {
                            if !filter.matches(&event) {
                                continue;
                            }
                            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                                Ok(Ok(())) => {}
                                Ok(Err(e)) => {
                                    warn!("Subscriber '{}' failed to handle event: {}", task_name, e);
                                }
                                Err(_) => {
                                    error!("Subscriber '{}' panicked while handling event", task_name);
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Subscriber '{}' lagged behind by {} events", task_name, n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Event bus closed for subscriber '{}'", task_name);
                            break;
                        }
                    },
                }
            }

            debug!("Subscriber '{}' ({}) stopped", task_name, id);
        });

        Subscription {
            id,
            name,
            token,
            task: Some(task),
            registry: Arc::clone(&self.subscriptions),
        }
    }

    /// Release a subscription and wait for its delivery task to finish
    pub async fn unsubscribe(&self, subscription: Subscription) -> Result<(), EventBusError> {
        if !self.subscriptions.lock().contains_key(&subscription.id) {
            return Err(EventBusError::UnknownSubscription {
                id: subscription.id,
            });
        }
        subscription.release().await;
        Ok(())
    }

    /// Publish an event to all subscribers, returning how many receivers got it.
    ///
    /// Publishing with nobody listening is not an error; the event is dropped.
    pub fn publish(&self, event: FruitcamEvent) -> usize {
        match &event {
            FruitcamEvent::FruitDetected(detection) => {
                info!(
                    "Fruit detected: {} ({:.2})",
                    detection.label, detection.confidence
                );
            }
            FruitcamEvent::InferenceFailed { error } => {
                warn!("Inference failed: {}", error);
            }
            FruitcamEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            FruitcamEvent::CameraStatusChanged { running, .. } => {
                info!("Camera {}", if *running { "running" } else { "stopped" });
            }
            _ => debug!("Publishing event: {}", event.description()),
        }

        match self.sender.send(event) {
            Ok(count) => count,
            Err(broadcast::error::SendError(event)) => {
                debug!("No subscribers for event: {}", event.description());
                0
            }
        }
    }

    /// Number of handler subscriptions currently registered
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Number of raw receivers, including handler subscriptions
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            subscriptions: Arc::clone(&self.subscriptions),
            next_subscription_id: Arc::clone(&self.next_subscription_id),
        }
    }
}

/// Handle for a handler registered with [`EventBus::subscribe_handler`].
///
/// Dropping the handle stops delivery; [`Subscription::release`] also waits
/// for the delivery task to wind down.
pub struct Subscription {
    id: u64,
    name: String,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    registry: SubscriptionRegistry,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stop delivery and wait for the handler task to exit
    pub async fn release(mut self) {
        self.token.cancel();
        self.registry.lock().remove(&self.id);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Subscriber '{}' task ended abnormally: {}", self.name, e);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
        self.registry.lock().remove(&self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("active", &self.is_active())
            .finish()
    }
}
