use super::types::{components, ComponentState, ShutdownReason};
use crate::camera::{CaptureDevice, CaptureSession, CaptureSessionBuilder};
use crate::classifier::{Classifier, ModelLoader};
use crate::config::FruitcamConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::ingredients::IngredientAggregator;
use crate::kitchen::Kitchen;
use crate::pipeline::{DetectionPipeline, ScanOutcome};
use crate::store::RecipeStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Owns every component of the app and wires them together.
///
/// Components are built once here and handed to each other explicitly.
pub struct FruitcamApp {
    pub(super) config: FruitcamConfig,
    pub(super) event_bus: Arc<EventBus>,

    // Components
    pub(super) session: Arc<CaptureSession>,
    pub(super) classifier: Arc<Classifier>,
    pub(super) pipeline: Arc<DetectionPipeline>,
    pub(super) aggregator: Arc<IngredientAggregator>,
    pub(super) store: Arc<RecipeStore>,
    pub(super) kitchen: Arc<Kitchen>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl FruitcamApp {
    /// Build all components. Must be called within a tokio runtime.
    pub async fn new(
        config: FruitcamConfig,
        device: Box<dyn CaptureDevice>,
        model_loader: Arc<dyn ModelLoader>,
    ) -> Result<Self> {
        config.validate()?;
        info!("Creating fruitcam application");

        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));

        let session = Arc::new(
            CaptureSessionBuilder::new()
                .config(config.camera.clone())
                .boxed_device(device)
                .build()?,
        );

        let classifier = Arc::new(Classifier::new(&config.classifier, model_loader));

        let pipeline = Arc::new(DetectionPipeline::new(
            Arc::clone(&session),
            Arc::clone(&classifier),
            Arc::clone(&event_bus),
            config.classifier.inference_timeout(),
        ));

        let aggregator = Arc::new(IngredientAggregator::new(&config.aggregator));

        let store = Arc::new(RecipeStore::open_file(&config.store.path).await);

        let kitchen = Arc::new(
            Kitchen::open(
                &config.kitchen,
                Arc::clone(&aggregator),
                Arc::clone(&store),
                Box::new(StdRng::from_entropy()),
            )
            .await,
        );

        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Ok(Self {
            config,
            event_bus,
            session,
            classifier,
            pipeline,
            aggregator,
            store,
            kitchen,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Arc::new(Mutex::new(Some(shutdown_sender))),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    /// One capture → classify → publish round trip
    pub async fn scan(&self) -> Result<ScanOutcome> {
        Ok(self.pipeline.scan().await?)
    }

    pub fn config(&self) -> &FruitcamConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn session(&self) -> &Arc<CaptureSession> {
        &self.session
    }

    pub fn classifier(&self) -> &Arc<Classifier> {
        &self.classifier
    }

    pub fn pipeline(&self) -> &Arc<DetectionPipeline> {
        &self.pipeline
    }

    pub fn aggregator(&self) -> &Arc<IngredientAggregator> {
        &self.aggregator
    }

    pub fn store(&self) -> &Arc<RecipeStore> {
        &self.store
    }

    pub fn kitchen(&self) -> &Arc<Kitchen> {
        &self.kitchen
    }

    /// Token cancelled when shutdown begins
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub(super) fn component_names() -> [&'static str; 5] {
        components::ALL
    }
}
