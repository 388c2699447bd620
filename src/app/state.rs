use super::types::components::CAMERA;
use super::{ComponentState, FruitcamApp};
use std::collections::HashMap;
use tracing::{debug, warn};

impl FruitcamApp {
    /// Record a lifecycle transition for `component`
    pub async fn set_component_state(&self, component: &str, state: ComponentState) {
        let previous = self
            .component_states
            .lock()
            .await
            .insert(component.to_string(), state.clone());

        match (&previous, &state) {
            (Some(old), new) if old == new => {}
            (_, ComponentState::Failed) => warn!("Component '{}' failed", component),
            _ => debug!("Component '{}': {:?} -> {:?}", component, previous, state),
        }
    }

    pub async fn get_component_state(&self, component: &str) -> Option<ComponentState> {
        self.component_states.lock().await.get(component).cloned()
    }

    /// Snapshot of every registered component
    pub async fn get_all_component_states(&self) -> HashMap<String, ComponentState> {
        self.component_states.lock().await.clone()
    }

    /// Running without a usable camera
    pub async fn is_degraded(&self) -> bool {
        self.get_component_state(CAMERA).await == Some(ComponentState::Failed)
    }
}
