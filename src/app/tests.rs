use super::*;
use crate::camera::{MockCaptureDevice, PermissionStatus, SessionState};
use crate::classifier::{Observation, ScriptedLoader, ScriptedModel};
use crate::config::FruitcamConfig;
use crate::pipeline::ScanOutcome;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn create_test_config(dir: &TempDir) -> FruitcamConfig {
    let mut config = FruitcamConfig::default();
    config.store.path = dir
        .path()
        .join("recipes.json")
        .to_string_lossy()
        .into_owned();
    config.aggregator.settle_delay_ms = 0;
    config
}

fn fruit_model() -> Arc<ScriptedLoader> {
    let model = Arc::new(ScriptedModel::new().with_fallback(vec![
        Observation::single("Apple", 0.99),
        Observation::single("Banana", 0.96),
    ]));
    Arc::new(ScriptedLoader::new(model))
}

async fn create_app(dir: &TempDir, device: MockCaptureDevice) -> FruitcamApp {
    FruitcamApp::new(create_test_config(dir), Box::new(device), fruit_model())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_app_creation_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.classifier.confidence_threshold = 2.0;

    let result = FruitcamApp::new(config, Box::new(MockCaptureDevice::new()), fruit_model()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_component_lifecycle() {
    let dir = TempDir::new().unwrap();
    let mut app = create_app(&dir, MockCaptureDevice::new()).await;

    app.initialize().await.unwrap();
    let states = app.get_all_component_states().await;
    assert_eq!(states.len(), components::ALL.len());
    assert_eq!(states.get(components::CAMERA), Some(&ComponentState::Stopped));
    assert_eq!(states.get(components::STORE), Some(&ComponentState::Running));

    app.start().await.unwrap();
    for component in components::ALL {
        assert_eq!(
            app.get_component_state(component).await,
            Some(ComponentState::Running),
            "{} should be running",
            component
        );
    }
    assert!(app.session().is_running());
    assert!(!app.is_degraded().await);

    let exit_code = app.shutdown().await.unwrap();
    assert_eq!(exit_code, 0);
    for component in components::ALL {
        assert_eq!(
            app.get_component_state(component).await,
            Some(ComponentState::Stopped)
        );
    }
    assert!(!app.session().is_running());
    assert!(!app.aggregator().is_attached());
}

#[tokio::test]
async fn test_permission_denied_leaves_app_degraded() {
    let dir = TempDir::new().unwrap();
    let mut app = create_app(
        &dir,
        MockCaptureDevice::new().with_permission(PermissionStatus::Denied),
    )
    .await;
    let mut events = app.event_bus().subscribe();

    app.initialize().await.unwrap();
    app.start().await.unwrap();

    assert!(app.is_degraded().await);
    assert_eq!(
        app.get_component_state(components::CAMERA).await,
        Some(ComponentState::Failed)
    );
    assert_eq!(
        app.get_component_state(components::KITCHEN).await,
        Some(ComponentState::Running)
    );
    assert!(matches!(
        app.session().state(),
        SessionState::Unavailable(crate::error::CameraError::PermissionDenied)
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        crate::events::FruitcamEvent::SystemError { .. }
    ));

    // Manual ingredients still work without a camera
    app.kitchen().add_ingredient().await.unwrap();
    assert!(app.scan().await.is_err());

    assert_eq!(app.shutdown().await.unwrap(), 0);
    assert_eq!(
        app.get_component_state(components::CAMERA).await,
        Some(ComponentState::Failed)
    );
}

#[tokio::test]
async fn test_scan_reaches_ingredients() {
    let dir = TempDir::new().unwrap();
    let mut app = create_app(&dir, MockCaptureDevice::new()).await;
    app.initialize().await.unwrap();
    app.start().await.unwrap();

    let outcome = app.scan().await.unwrap();
    assert_eq!(
        outcome,
        ScanOutcome::Detected(vec!["Apple".to_string(), "Banana".to_string()])
    );

    let mut ingredients = app.kitchen().ingredients();
    tokio::time::timeout(
        Duration::from_secs(5),
        ingredients.wait_for(|s| s.ingredients.len() == 2),
    )
    .await
    .unwrap()
    .unwrap();

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_run_exits_on_request() {
    let dir = TempDir::new().unwrap();
    let mut app = create_app(&dir, MockCaptureDevice::new()).await;
    app.initialize().await.unwrap();
    app.start().await.unwrap();

    let handle = app.shutdown_handle();
    let requester = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.request(ShutdownReason::UserRequest).await
    });

    let exit_code = app.run().await.unwrap();
    assert_eq!(exit_code, 0);
    assert!(requester.await.unwrap());

    // Only one request is honoured
    assert!(!app.request_shutdown(ShutdownReason::UserRequest).await);
    assert!(app.run().await.is_err());
}
