/// Component lifecycle states
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// Why the application is shutting down
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    Error(String),
    UserRequest,
}

/// Component names used for lifecycle tracking
pub mod components {
    pub const CAMERA: &str = "camera";
    pub const CLASSIFIER: &str = "classifier";
    pub const AGGREGATOR: &str = "aggregator";
    pub const STORE: &str = "store";
    pub const KITCHEN: &str = "kitchen";

    pub const ALL: [&str; 5] = [CAMERA, CLASSIFIER, AGGREGATOR, STORE, KITCHEN];
}
