mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::FruitcamApp;
pub use runtime::ShutdownHandle;
pub use types::{components, ComponentState, ShutdownReason};
