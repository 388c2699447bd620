use super::*;
use crate::recipes::{Recipe, RecipeType};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn recipe(name: &str, recipe_type: RecipeType) -> Recipe {
    Recipe::new(
        name,
        "- Blend together: Apple, Pear\n- Pour into popsicle molds",
        vec!["Apple".to_string(), "Pear".to_string()],
        recipe_type,
    )
}

/// Lets a test keep a handle on the medium the store owns
struct SharedMedium(Arc<MemoryMedium>);

#[async_trait::async_trait]
impl RecordMedium for SharedMedium {
    async fn load(&self) -> Result<Vec<serde_json::Value>, crate::error::StoreError> {
        self.0.load().await
    }

    async fn persist(
        &self,
        records: &[serde_json::Value],
    ) -> Result<(), crate::error::StoreError> {
        self.0.persist(records).await
    }

    async fn recreate(&self) -> Result<(), crate::error::StoreError> {
        self.0.recreate().await
    }

    fn describe(&self) -> String {
        self.0.describe()
    }
}

async fn store_over(medium: &Arc<MemoryMedium>) -> RecipeStore {
    RecipeStore::open(Box::new(SharedMedium(Arc::clone(medium)))).await
}

fn same_content(a: &Recipe, b: &Recipe) -> bool {
    a.id == b.id
        && a.name == b.name
        && a.description == b.description
        && a.ingredients == b.ingredients
        && a.recipe_type == b.recipe_type
        && a.is_expanded == b.is_expanded
}

#[tokio::test]
async fn test_upsert_then_fetch_round_trip() {
    let store = RecipeStore::open(Box::new(MemoryMedium::new())).await;
    let recipe = recipe("Cool Apple Pops", RecipeType::Popsicle);

    assert!(store.upsert_if_absent(&recipe, None).await);

    let fetched = store.fetch_all().await;
    assert_eq!(fetched.len(), 1);
    assert!(same_content(&fetched[0], &recipe));
    assert!(fetched[0].is_liked);
}

#[tokio::test]
async fn test_double_upsert_keeps_first_content() {
    let store = RecipeStore::open(Box::new(MemoryMedium::new())).await;
    let original = recipe("Cool Apple Pops", RecipeType::Popsicle);

    let mut changed = original.clone();
    changed.name = "Frozen Apple Pops".to_string();
    changed.is_expanded = true;

    assert!(store.upsert_if_absent(&original, None).await);
    assert!(!store.upsert_if_absent(&changed, None).await);

    let fetched = store.fetch_all().await;
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].name, "Cool Apple Pops");
    assert!(!fetched[0].is_expanded);
}

#[tokio::test]
async fn test_delete_and_update_expansion() {
    let store = RecipeStore::open(Box::new(MemoryMedium::new())).await;
    let kept = recipe("Spa Infused Water", RecipeType::DetoxWater);
    let dropped = recipe("Power Apple Smoothie", RecipeType::Smoothie);

    store.upsert_if_absent(&kept, None).await;
    store.upsert_if_absent(&dropped, None).await;

    assert!(store.delete(dropped.id).await);
    assert!(!store.delete(dropped.id).await);

    assert!(store.update_expansion(kept.id, true).await);
    assert!(!store.update_expansion(dropped.id, true).await);

    let fetched = store.fetch_all().await;
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].id, kept.id);
    assert!(fetched[0].is_expanded);
}

#[tokio::test]
async fn test_invalid_records_are_skipped() {
    let good = recipe("Sunshine Apple Bowl", RecipeType::FruitBowl);
    let good_value =
        serde_json::to_value(RecipeRecord::from_recipe(&good, None).unwrap()).unwrap();

    let mut missing_field = good_value.clone();
    missing_field["id"] = json!(uuid::Uuid::new_v4().to_string());
    missing_field.as_object_mut().unwrap().remove("name");

    let mut corrupt_blob = good_value.clone();
    corrupt_blob["id"] = json!(uuid::Uuid::new_v4().to_string());
    corrupt_blob["ingredients"] = json!("Apple, Pear");

    let mut unknown_type = good_value.clone();
    unknown_type["id"] = json!(uuid::Uuid::new_v4().to_string());
    unknown_type["recipe_type"] = json!("milkshake");

    let medium = MemoryMedium::with_records(vec![
        missing_field,
        good_value,
        corrupt_blob,
        unknown_type,
    ]);
    let store = RecipeStore::open(Box::new(medium)).await;

    let fetched = store.fetch_all().await;
    assert_eq!(fetched.len(), 1);
    assert!(same_content(&fetched[0], &good));
    assert_eq!(store.len().await, 4);
}

#[tokio::test]
async fn test_corrupt_medium_is_recreated_on_open() {
    let medium = Arc::new(MemoryMedium::corrupted());
    let store = store_over(&medium).await;

    assert_eq!(medium.recreations(), 1);
    assert!(store.fetch_all().await.is_empty());

    let recipe = recipe("Vitamin Fruit Salad", RecipeType::FruitSalad);
    assert!(store.upsert_if_absent(&recipe, None).await);

    let fetched = store.fetch_all().await;
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].id, recipe.id);
}

#[tokio::test]
async fn test_write_failure_recreates_and_reapplies() {
    let medium = Arc::new(MemoryMedium::new());
    let store = store_over(&medium).await;

    let before = recipe("Morning Apple Smoothie", RecipeType::Smoothie);
    store.upsert_if_absent(&before, None).await;

    medium.fail_next_writes(1);
    let after = recipe("Citrus Infused Water", RecipeType::DetoxWater);
    assert!(store.upsert_if_absent(&after, None).await);

    assert_eq!(medium.recreations(), 1);
    let fetched = store.fetch_all().await;
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].id, after.id);
    assert_eq!(medium.raw_records().len(), 1);
}

#[tokio::test]
async fn test_failed_recovery_keeps_cache_in_step_with_medium() {
    let medium = Arc::new(MemoryMedium::new());
    let store = store_over(&medium).await;
    let kept = recipe("Tropical Mango Bowl", RecipeType::FruitBowl);
    store.upsert_if_absent(&kept, None).await;

    medium.fail_next_writes(1);
    medium.fail_next_recreates(1);
    let lost = recipe("Cool Kiwi Pops", RecipeType::Popsicle);
    assert!(!store.upsert_if_absent(&lost, None).await);

    // Nothing was discarded on the medium, so nothing is discarded in memory
    assert!(store.contains(kept.id).await);
    assert!(!store.contains(lost.id).await);
    assert_eq!(medium.raw_records().len(), 1);
}

#[tokio::test]
async fn test_failed_rewrite_after_recreate_leaves_store_empty() {
    let medium = Arc::new(MemoryMedium::new());
    let store = store_over(&medium).await;
    store
        .upsert_if_absent(&recipe("Summer Fruit Salad", RecipeType::FruitSalad), None)
        .await;

    medium.fail_next_writes(2);
    let lost = recipe("Spa Infused Water", RecipeType::DetoxWater);
    assert!(!store.upsert_if_absent(&lost, None).await);

    assert_eq!(medium.recreations(), 1);
    assert!(store.is_empty().await);
    assert!(medium.raw_records().is_empty());
}

#[tokio::test]
async fn test_owner_is_recorded() {
    let medium = Arc::new(MemoryMedium::new());
    let store = store_over(&medium).await;

    store
        .upsert_if_absent(&recipe("Healthy Fruit Balls", RecipeType::EnergyBalls), Some("robin"))
        .await;

    let raw = medium.raw_records();
    assert_eq!(raw[0]["owner"], json!("robin"));
}

#[tokio::test]
async fn test_file_store_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("recipes.json");
    let recipe = recipe("Paradise Apple Bowl", RecipeType::FruitBowl);

    {
        let store = RecipeStore::open_file(&path).await;
        assert!(store.upsert_if_absent(&recipe, None).await);
        assert!(store.update_expansion(recipe.id, true).await);
    }

    assert!(path.exists());
    assert!(!dir.path().join("nested").join("recipes.json.tmp").exists());

    let reopened = RecipeStore::open_file(&path).await;
    let fetched = reopened.fetch_all().await;
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].id, recipe.id);
    assert!(fetched[0].is_expanded);
}

#[tokio::test]
async fn test_corrupt_file_is_discarded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recipes.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let store = RecipeStore::open_file(&path).await;
    assert!(store.fetch_all().await.is_empty());

    let recipe = recipe("Fresh Fruit Salad", RecipeType::FruitSalad);
    assert!(store.upsert_if_absent(&recipe, None).await);

    let reopened = RecipeStore::open_file(&path).await;
    let fetched = reopened.fetch_all().await;
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].id, recipe.id);
}

#[tokio::test]
async fn test_concurrent_upserts_of_same_recipe() {
    let store = Arc::new(RecipeStore::open(Box::new(MemoryMedium::new())).await);
    let recipe = recipe("Tropical Apple Smoothie", RecipeType::Smoothie);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        let recipe = recipe.clone();
        tasks.push(tokio::spawn(async move {
            store.upsert_if_absent(&recipe, None).await
        }));
    }

    let mut written = 0;
    for task in tasks {
        if task.await.unwrap() {
            written += 1;
        }
    }

    assert_eq!(written, 1);
    assert_eq!(store.fetch_all().await.len(), 1);
}
