mod detector;
mod mock;
mod model;

pub use detector::Classifier;
pub use mock::{ScriptedLoader, ScriptedModel};
pub use model::{Classification, ClassifierModel, ModelLoader, Observation};
