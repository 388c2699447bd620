pub mod app;
pub mod camera;
pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod ingredients;
pub mod kitchen;
pub mod logging;
pub mod photo;
pub mod pipeline;
pub mod recipes;
pub mod store;

pub use app::{ComponentState, FruitcamApp, ShutdownHandle, ShutdownReason};
pub use camera::{
    CaptureDevice, CaptureSession, CaptureSessionBuilder, CapturedPhoto, MockCaptureDevice,
    PermissionStatus, SessionState,
};
pub use classifier::{Classification, Classifier, ClassifierModel, ModelLoader, Observation};
pub use config::FruitcamConfig;
pub use error::{FruitcamError, Result};
pub use events::{DetectionEvent, EventBus, EventFilter, FruitcamEvent, Subscription};
pub use ingredients::{Ingredient, IngredientAggregator, IngredientSnapshot};
pub use kitchen::{Kitchen, KitchenView};
pub use logging::init_logging;
pub use photo::{Image, ImageFormat};
pub use pipeline::{DetectionPipeline, ScanOutcome};
pub use recipes::{PreferenceSettings, Recipe, RecipeGenerator, RecipeType};
pub use store::{JsonFileMedium, MemoryMedium, RecipeStore, RecordMedium};
