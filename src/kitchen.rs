use crate::config::KitchenConfig;
use crate::error::Result;
use crate::ingredients::{Ingredient, IngredientAggregator, IngredientSnapshot};
use crate::recipes::{describe, Extras, PreferenceSettings, Recipe, RecipeGenerator, RecipeType};
use crate::store::RecipeStore;
use parking_lot::Mutex;
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Everything the recipe screens render
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KitchenView {
    pub recipes: Vec<Recipe>,
    pub show_mix_animation: bool,
    pub show_recipes: bool,
}

impl KitchenView {
    pub fn saved_recipes(&self) -> Vec<Recipe> {
        self.recipes.iter().filter(|r| r.is_liked).cloned().collect()
    }
}

/// Presentation-facing entry point for ingredients, recipes and likes
pub struct Kitchen {
    config: KitchenConfig,
    aggregator: Arc<IngredientAggregator>,
    store: Arc<RecipeStore>,
    generator: RecipeGenerator,
    rng: Mutex<Box<dyn RngCore + Send>>,
    preferences: Mutex<PreferenceSettings>,
    user_label: Mutex<Option<String>>,
    // Held across store calls so like/expand operations apply in order
    recipes: tokio::sync::Mutex<Vec<Recipe>>,
    view: Arc<watch::Sender<KitchenView>>,
    mix_token: Mutex<Option<CancellationToken>>,
}

impl Kitchen {
    /// Load liked recipes from the store, or the sample recipes when there are none
    pub async fn open(
        config: &KitchenConfig,
        aggregator: Arc<IngredientAggregator>,
        store: Arc<RecipeStore>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        let saved = store.fetch_all().await;
        let recipes = if !saved.is_empty() {
            info!("Loaded {} liked recipes", saved.len());
            saved
        } else if config.seed_sample_recipes {
            debug!("No liked recipes yet, showing samples");
            sample_recipes()
        } else {
            Vec::new()
        };

        let (view, _) = watch::channel(KitchenView {
            recipes: recipes.clone(),
            ..KitchenView::default()
        });

        Self {
            config: config.clone(),
            aggregator,
            store,
            generator: RecipeGenerator::new(config.default_max_fruits),
            rng: Mutex::new(rng),
            preferences: Mutex::new(PreferenceSettings::default()),
            user_label: Mutex::new(None),
            recipes: tokio::sync::Mutex::new(recipes),
            view: Arc::new(view),
            mix_token: Mutex::new(None),
        }
    }

    /// Generate recipes from the current ingredients and start the mix animation.
    ///
    /// The animation flag drops and `show_recipes` rises after the configured
    /// animation time, unless `reset_transient_state` runs first.
    pub async fn mix(&self) -> Result<Vec<Recipe>> {
        let names = self.aggregator.current().await?.names();
        let preferences = self.preferences();

        let generated = {
            let mut rng = self.rng.lock();
            self.generator.generate(&names, &preferences, &mut **rng)
        };
        info!(
            "Mixed {} ingredients into {} recipes",
            names.len(),
            generated.len()
        );

        {
            let mut recipes = self.recipes.lock().await;
            *recipes = generated.clone();
            self.view.send_modify(|view| {
                view.recipes = generated.clone();
                view.show_mix_animation = true;
            });
        }

        self.schedule_reveal(self.config.mix_animation());
        Ok(generated)
    }

    /// Flip `liked`, storing or deleting the recipe. False for unknown ids.
    pub async fn toggle_like(&self, id: Uuid) -> bool {
        let mut recipes = self.recipes.lock().await;
        let Some(recipe) = recipes.iter_mut().find(|r| r.id == id) else {
            debug!("toggle_like: no recipe {}", id);
            return false;
        };

        recipe.is_liked = !recipe.is_liked;
        let recipe = recipe.clone();

        if recipe.is_liked {
            let owner = self.user_label();
            self.store.upsert_if_absent(&recipe, owner.as_deref()).await;
            info!("Liked recipe '{}'", recipe.name);
        } else {
            self.store.delete(recipe.id).await;
            info!("Unliked recipe '{}'", recipe.name);
        }

        self.publish_recipes(&recipes);
        true
    }

    /// Flip `expanded`; persisted only for liked recipes. False for unknown ids.
    pub async fn toggle_expansion(&self, id: Uuid) -> bool {
        let mut recipes = self.recipes.lock().await;
        let Some(recipe) = recipes.iter_mut().find(|r| r.id == id) else {
            debug!("toggle_expansion: no recipe {}", id);
            return false;
        };

        recipe.is_expanded = !recipe.is_expanded;
        let (liked, expanded) = (recipe.is_liked, recipe.is_expanded);

        if liked {
            self.store.update_expansion(id, expanded).await;
        }

        self.publish_recipes(&recipes);
        true
    }

    pub fn recipes(&self) -> Vec<Recipe> {
        self.view.borrow().recipes.clone()
    }

    pub fn saved_recipes(&self) -> Vec<Recipe> {
        self.view.borrow().saved_recipes()
    }

    pub fn view(&self) -> KitchenView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<KitchenView> {
        self.view.subscribe()
    }

    pub fn ingredients(&self) -> watch::Receiver<IngredientSnapshot> {
        self.aggregator.subscribe()
    }

    pub fn preferences(&self) -> PreferenceSettings {
        self.preferences.lock().clone()
    }

    pub fn set_preferences(&self, preferences: PreferenceSettings) {
        debug!("Updated preferences: {:?}", preferences);
        *self.preferences.lock() = preferences;
    }

    pub fn user_label(&self) -> Option<String> {
        self.user_label.lock().clone()
    }

    /// Identity recorded as the owner of recipes liked from now on
    pub fn set_user_label(&self, label: Option<String>) {
        *self.user_label.lock() = label;
    }

    pub async fn add_ingredient(&self) -> Result<Ingredient> {
        Ok(self.aggregator.add_manual(None).await?)
    }

    pub async fn rename_ingredient(&self, id: Uuid, name: impl Into<String>) -> Result<()> {
        Ok(self.aggregator.rename(id, name).await?)
    }

    pub async fn remove_ingredient(&self, id: Uuid) -> Result<Ingredient> {
        Ok(self.aggregator.remove(id).await?)
    }

    /// Merge labels collected on the camera screen; returns how many were new
    pub async fn add_detected(&self, labels: Vec<String>) -> Result<usize> {
        Ok(self.aggregator.merge_labels(labels).await?)
    }

    /// Drop the mix and recipe flags and the aggregator's processing flag
    pub async fn reset_transient_state(&self) -> Result<()> {
        self.cancel_reveal();
        self.view.send_modify(|view| {
            view.show_mix_animation = false;
            view.show_recipes = false;
        });
        Ok(self.aggregator.reset().await?)
    }

    pub fn shutdown(&self) {
        self.cancel_reveal();
    }

    fn schedule_reveal(&self, delay: Duration) {
        let token = CancellationToken::new();
        if let Some(previous) = self.mix_token.lock().replace(token.clone()) {
            previous.cancel();
        }

        let view = Arc::clone(&self.view);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    view.send_modify(|view| {
                        view.show_mix_animation = false;
                        view.show_recipes = true;
                    });
                }
            }
        });
    }

    fn cancel_reveal(&self) {
        if let Some(token) = self.mix_token.lock().take() {
            token.cancel();
        }
    }

    fn publish_recipes(&self, recipes: &[Recipe]) {
        self.view.send_modify(|view| view.recipes = recipes.to_vec());
    }
}

/// Placeholder recipes shown before anything has been liked
pub fn sample_recipes() -> Vec<Recipe> {
    let fruits = |n: usize| (1..=n).map(|i| format!("Fruit {}", i)).collect::<Vec<_>>();

    let salad_fruits = fruits(3);
    let salad = Recipe::new(
        "Fruit salad",
        describe(
            RecipeType::FruitSalad,
            &salad_fruits,
            Extras {
                yogurt: true,
                cereals: true,
                ..Extras::default()
            },
        ),
        salad_fruits,
        RecipeType::FruitSalad,
    );

    let smoothie_fruits = fruits(2);
    let smoothie = Recipe::new(
        "Smoothie",
        describe(
            RecipeType::Smoothie,
            &smoothie_fruits,
            Extras {
                ice: true,
                seeds: true,
                ..Extras::default()
            },
        ),
        smoothie_fruits,
        RecipeType::Smoothie,
    );

    vec![salad, smoothie]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregatorConfig;
    use crate::store::MemoryMedium;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    async fn kitchen_with(store: Arc<RecipeStore>, config: KitchenConfig) -> Kitchen {
        let aggregator = Arc::new(IngredientAggregator::new(&AggregatorConfig {
            settle_delay_ms: 0,
            command_capacity: 16,
        }));
        Kitchen::open(
            &config,
            aggregator,
            store,
            Box::new(ChaCha8Rng::seed_from_u64(11)),
        )
        .await
    }

    async fn empty_store() -> Arc<RecipeStore> {
        Arc::new(RecipeStore::open(Box::new(MemoryMedium::new())).await)
    }

    #[tokio::test]
    async fn test_samples_shown_when_nothing_liked() {
        let kitchen = kitchen_with(empty_store().await, KitchenConfig::default()).await;

        let recipes = kitchen.recipes();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].name, "Fruit salad");
        assert_eq!(recipes[0].ingredients.len(), 3);
        assert!(recipes[0].description.contains("- Add a dollop of yogurt"));
        assert!(recipes[0].description.contains("- Sprinkle with granola"));
        assert_eq!(recipes[1].name, "Smoothie");
        assert!(recipes[1].description.contains("- Add ice cubes for extra freshness"));
        assert!(recipes.iter().all(|r| !r.is_liked));
    }

    #[tokio::test]
    async fn test_samples_can_be_disabled() {
        let config = KitchenConfig {
            seed_sample_recipes: false,
            ..KitchenConfig::default()
        };
        let kitchen = kitchen_with(empty_store().await, config).await;
        assert!(kitchen.recipes().is_empty());
    }

    #[tokio::test]
    async fn test_liked_recipes_loaded_on_open() {
        let store = empty_store().await;
        let recipe = Recipe::new(
            "Spa Infused Water",
            "- Slice thinly: Lemon, Lime",
            vec!["Lemon".to_string(), "Lime".to_string()],
            RecipeType::DetoxWater,
        );
        store.upsert_if_absent(&recipe, None).await;

        let kitchen = kitchen_with(store, KitchenConfig::default()).await;
        let recipes = kitchen.recipes();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].id, recipe.id);
        assert_eq!(kitchen.saved_recipes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mix_generates_and_reveals_after_animation() {
        let kitchen = kitchen_with(empty_store().await, KitchenConfig::default()).await;
        kitchen
            .add_detected(vec!["Apple".to_string(), "Banana".to_string()])
            .await
            .unwrap();

        let recipes = kitchen.mix().await.unwrap();
        assert_eq!(recipes.len(), 3);

        let view = kitchen.view();
        assert!(view.show_mix_animation);
        assert!(!view.show_recipes);
        assert_eq!(view.recipes, recipes);

        tokio::time::sleep(Duration::from_millis(4001)).await;
        let view = kitchen.view();
        assert!(!view.show_mix_animation);
        assert!(view.show_recipes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_reveal() {
        let kitchen = kitchen_with(empty_store().await, KitchenConfig::default()).await;
        kitchen.mix().await.unwrap();

        kitchen.reset_transient_state().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5000)).await;

        let view = kitchen.view();
        assert!(!view.show_mix_animation);
        assert!(!view.show_recipes);
    }

    #[tokio::test]
    async fn test_mix_with_too_few_ingredients_clears_recipes() {
        let kitchen = kitchen_with(empty_store().await, KitchenConfig::default()).await;
        kitchen.add_ingredient().await.unwrap();

        assert!(kitchen.mix().await.unwrap().is_empty());
        assert!(kitchen.recipes().is_empty());
    }

    #[tokio::test]
    async fn test_preferences_shape_generation() {
        let kitchen = kitchen_with(empty_store().await, KitchenConfig::default()).await;
        kitchen
            .add_detected(vec!["Apple".to_string(), "Banana".to_string()])
            .await
            .unwrap();
        kitchen.set_preferences(PreferenceSettings {
            wants_yogurt: Some(true),
            max_fruits_per_recipe: Some(1),
            ..Default::default()
        });

        let recipes = kitchen.mix().await.unwrap();
        assert_eq!(recipes.len(), 4);
        assert!(recipes.iter().all(|r| r.ingredients.len() == 1));
        assert!(recipes
            .iter()
            .any(|r| r.recipe_type == RecipeType::EnergyBalls));
    }

    #[tokio::test]
    async fn test_toggle_like_stores_and_deletes() {
        let store = empty_store().await;
        let kitchen = kitchen_with(Arc::clone(&store), KitchenConfig::default()).await;
        kitchen.set_user_label(Some("robin".to_string()));
        let id = kitchen.recipes()[0].id;

        assert!(kitchen.toggle_like(id).await);
        assert!(store.contains(id).await);
        assert_eq!(kitchen.saved_recipes().len(), 1);

        assert!(kitchen.toggle_like(id).await);
        assert!(!store.contains(id).await);
        assert!(kitchen.saved_recipes().is_empty());

        assert!(!kitchen.toggle_like(Uuid::new_v4()).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_toggle_expansion_persists_only_liked() {
        let store = empty_store().await;
        let kitchen = kitchen_with(Arc::clone(&store), KitchenConfig::default()).await;
        let recipes = kitchen.recipes();
        let (liked, unliked) = (recipes[0].id, recipes[1].id);

        kitchen.toggle_like(liked).await;
        assert!(kitchen.toggle_expansion(liked).await);
        assert!(kitchen.toggle_expansion(unliked).await);

        let stored = store.fetch_all().await;
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_expanded);
        assert!(!store.contains(unliked).await);

        let view = kitchen.view();
        assert!(view.recipes.iter().all(|r| r.is_expanded));
        assert!(!kitchen.toggle_expansion(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_ingredient_commands_are_forwarded() {
        let kitchen = kitchen_with(empty_store().await, KitchenConfig::default()).await;
        let mut ingredients = kitchen.ingredients();

        let added = kitchen.add_ingredient().await.unwrap();
        assert_eq!(added.name, "New fruit");

        kitchen.rename_ingredient(added.id, "Quince").await.unwrap();
        ingredients
            .wait_for(|s| s.contains_name("Quince"))
            .await
            .unwrap();

        kitchen.remove_ingredient(added.id).await.unwrap();
        ingredients
            .wait_for(|s| s.ingredients.is_empty())
            .await
            .unwrap();
    }
}
