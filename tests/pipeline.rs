use fruitcam::camera::MockCaptureDevice;
use fruitcam::classifier::{Observation, ScriptedLoader, ScriptedModel};
use fruitcam::{FruitcamApp, FruitcamConfig, RecipeType, ScanOutcome};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> FruitcamConfig {
    let mut config = FruitcamConfig::default();
    config.store.path = dir
        .path()
        .join("liked.json")
        .to_string_lossy()
        .into_owned();
    config.aggregator.settle_delay_ms = 10;
    config.kitchen.mix_animation_ms = 10;
    config
}

fn loader(observations: Vec<Observation>) -> Arc<ScriptedLoader> {
    let model = Arc::new(ScriptedModel::new().with_fallback(observations));
    Arc::new(ScriptedLoader::new(model))
}

async fn started_app(dir: &TempDir, observations: Vec<Observation>) -> FruitcamApp {
    let mut app = FruitcamApp::new(
        test_config(dir),
        Box::new(MockCaptureDevice::new()),
        loader(observations),
    )
    .await
    .unwrap();
    app.initialize().await.unwrap();
    app.start().await.unwrap();
    app
}

#[tokio::test]
async fn test_scan_mix_like_and_reload() {
    let dir = TempDir::new().unwrap();
    let mut app = started_app(
        &dir,
        vec![
            Observation::single("Mango", 0.97),
            Observation::single("Lime", 0.91),
            Observation::single("Rock", 0.12),
        ],
    )
    .await;

    // Fresh store shows the sample recipes
    assert_eq!(app.kitchen().recipes().len(), 2);
    assert!(app.kitchen().saved_recipes().is_empty());

    let outcome = app.scan().await.unwrap();
    assert_eq!(
        outcome,
        ScanOutcome::Detected(vec!["Mango".to_string(), "Lime".to_string()])
    );

    // A second scan of the same fruit adds nothing new
    app.scan().await.unwrap();

    let mut ingredients = app.kitchen().ingredients();
    let snapshot = tokio::time::timeout(
        Duration::from_secs(5),
        ingredients.wait_for(|s| !s.is_processing && s.ingredients.len() == 2),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert!(snapshot.contains_name("Mango"));
    assert!(snapshot.contains_name("Lime"));

    let recipes = app.kitchen().mix().await.unwrap();
    let mut types: Vec<RecipeType> = recipes.iter().map(|r| r.recipe_type).collect();
    types.sort_by_key(|t| t.tag());
    let mut expected = vec![
        RecipeType::Smoothie,
        RecipeType::FruitBowl,
        RecipeType::DetoxWater,
    ];
    expected.sort_by_key(|t| t.tag());
    assert_eq!(types, expected);

    let mut view = app.kitchen().subscribe();
    tokio::time::timeout(Duration::from_secs(5), view.wait_for(|v| v.show_recipes))
        .await
        .unwrap()
        .unwrap();
    assert!(!app.kitchen().view().show_mix_animation);

    let liked = recipes[0].clone();
    app.kitchen().set_user_label(Some("tester".to_string()));
    assert!(app.kitchen().toggle_like(liked.id).await);
    assert!(app.kitchen().toggle_expansion(liked.id).await);
    assert_eq!(app.kitchen().saved_recipes().len(), 1);
    assert!(app.store().contains(liked.id).await);

    assert_eq!(app.shutdown().await.unwrap(), 0);
    drop(app);

    // Restart against the same file
    let mut app = started_app(&dir, vec![Observation::single("Mango", 0.97)]).await;
    let reloaded = app.kitchen().recipes();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded[0].id, liked.id);
    assert_eq!(reloaded[0].name, liked.name);
    assert_eq!(reloaded[0].ingredients, liked.ingredients);
    assert!(reloaded[0].is_liked);
    assert!(reloaded[0].is_expanded);

    // Unliking removes it from disk
    assert!(app.kitchen().toggle_like(liked.id).await);
    assert!(app.store().is_empty().await);
    assert!(app.kitchen().saved_recipes().is_empty());

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_manual_ingredients_without_detection() {
    let dir = TempDir::new().unwrap();
    let mut app = started_app(&dir, vec![Observation::single("Rock", 0.05)]).await;

    assert_eq!(app.scan().await.unwrap(), ScanOutcome::Detected(Vec::new()));

    let kitchen = app.kitchen();
    let first = kitchen.add_ingredient().await.unwrap();
    kitchen.rename_ingredient(first.id, "Peach").await.unwrap();
    let second = kitchen.add_ingredient().await.unwrap();

    // Names must stay unique
    assert!(kitchen.rename_ingredient(second.id, "Peach").await.is_err());
    kitchen.rename_ingredient(second.id, "Plum").await.unwrap();

    let added = kitchen
        .add_detected(vec!["Plum".to_string(), "Fig".to_string()])
        .await
        .unwrap();
    assert_eq!(added, 1);

    let recipes = kitchen.mix().await.unwrap();
    assert!(recipes.iter().any(|r| r.recipe_type == RecipeType::FruitSalad));
    for recipe in &recipes {
        assert!(!recipe.ingredients.is_empty());
        assert!(!recipe.description.is_empty());
    }

    kitchen.reset_transient_state().await.unwrap();
    let view = kitchen.view();
    assert!(!view.show_mix_animation);
    assert!(!view.show_recipes);

    app.shutdown().await.unwrap();
}
