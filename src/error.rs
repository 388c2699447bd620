use thiserror::Error;

#[derive(Error, Debug)]
pub enum FruitcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("Ingredient error: {0}")]
    Ingredient(#[from] IngredientError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Capture device failures. None of these are retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Camera unavailable: {details}")]
    Unavailable { details: String },

    #[error("Failed to attach camera input: {details}")]
    CannotAddInput { details: String },

    #[error("Failed to attach photo output: {details}")]
    CannotAddOutput { details: String },

    #[error("Capture session is not running")]
    NotRunning,

    #[error("A capture is already in flight")]
    AlreadyCapturing,

    #[error("Photo capture failed: {details}")]
    Capture { details: String },

    #[error("Capture timed out after {timeout_ms}ms")]
    CaptureTimeout { timeout_ms: u64 },

    #[error("Capture worker is gone")]
    WorkerGone,
}

/// Classifier failures. A failed detection yields no events for that photo.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("Classifier model unavailable: {details}")]
    ModelUnavailable { details: String },

    #[error("Inference failed: {details}")]
    Inference { details: String },

    #[error("Inference timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("Subscription {id} not found")]
    UnknownSubscription { id: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngredientError {
    #[error("Ingredient not found: {id}")]
    NotFound { id: String },

    #[error("Another ingredient is already named '{name}'")]
    DuplicateName { name: String },

    #[error("Ingredient aggregator has stopped")]
    AggregatorStopped,
}

/// Persistence failures. These are absorbed by the recipe store and only
/// show up in logs.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store at {path} could not be read: {details}")]
    Unreadable { path: String, details: String },

    #[error("Store at {path} is corrupt: {details}")]
    Corrupt { path: String, details: String },

    #[error("Failed to write store at {path}: {details}")]
    WriteFailed { path: String, details: String },

    #[error("Invalid record: {details}")]
    InvalidRecord { details: String },
}

impl FruitcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Whether the caller may try the operation again without re-initializing.
    pub fn is_recoverable(&self) -> bool {
        match self {
            FruitcamError::Camera(e) => e.is_recoverable(),
            FruitcamError::Classifier(_) => true,
            FruitcamError::Store(_) => true,
            FruitcamError::EventBus(_) => true,
            FruitcamError::Ingredient(IngredientError::AggregatorStopped) => false,
            FruitcamError::Ingredient(_) => true,
            FruitcamError::Config(_) | FruitcamError::Serialization(_) => false,
            FruitcamError::Io(_) | FruitcamError::Json(_) => true,
            FruitcamError::System { .. } => false,
            FruitcamError::Component { .. } => true,
        }
    }
}

impl CameraError {
    /// Device errors are terminal; capture-slot errors are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CameraError::NotRunning
                | CameraError::AlreadyCapturing
                | CameraError::Capture { .. }
                | CameraError::CaptureTimeout { .. }
        )
    }

    /// Whether this error puts the session into the terminal unavailable state.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            CameraError::PermissionDenied
                | CameraError::Unavailable { .. }
                | CameraError::CannotAddInput { .. }
                | CameraError::CannotAddOutput { .. }
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            CameraError::PermissionDenied | CameraError::Unavailable { .. } => {
                "Camera unavailable".to_string()
            }
            CameraError::CannotAddInput { .. } => "Failed to add input device".to_string(),
            CameraError::CannotAddOutput { .. } => "Failed to add output device".to_string(),
            _ => "Error capturing photo".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FruitcamError>;
