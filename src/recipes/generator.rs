use super::model::{PreferenceSettings, Recipe, RecipeType};
use super::templates::{adjectives, describe, recipe_name, FALLBACK_FRUIT};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Recipe types available for `count` ingredients, in canonical order
pub fn eligible_types(count: usize, wants_yogurt: bool) -> Vec<RecipeType> {
    let mut types = Vec::new();

    if count >= 2 {
        types.extend([
            RecipeType::Smoothie,
            RecipeType::FruitBowl,
            RecipeType::DetoxWater,
        ]);
    }
    if count >= 3 {
        types.extend([RecipeType::FruitSalad, RecipeType::Popsicle]);
    }
    if count >= 2 && wants_yogurt {
        types.push(RecipeType::EnergyBalls);
    }

    types
}

/// Expands ingredient names and preferences into one recipe per eligible type
#[derive(Debug, Clone)]
pub struct RecipeGenerator {
    default_max_fruits: usize,
}

impl RecipeGenerator {
    pub fn new(default_max_fruits: usize) -> Self {
        Self {
            default_max_fruits: default_max_fruits.max(1),
        }
    }

    /// Fewer than two ingredients yields no recipes. Type order, fruit
    /// sampling and adjectives all draw from `rng`.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        ingredients: &[String],
        preferences: &PreferenceSettings,
        rng: &mut R,
    ) -> Vec<Recipe> {
        let extras = preferences.extras();
        let max_fruits = preferences.max_fruits(self.default_max_fruits);

        let mut types = eligible_types(ingredients.len(), extras.yogurt);
        types.shuffle(rng);

        let recipes: Vec<Recipe> = types
            .into_iter()
            .map(|recipe_type| {
                let mut fruits = ingredients.to_vec();
                fruits.shuffle(rng);
                fruits.truncate(max_fruits);

                let pool = adjectives(recipe_type);
                let adjective = pool[rng.gen_range(0..pool.len())];
                let lead = fruits.first().map(String::as_str).unwrap_or(FALLBACK_FRUIT);

                Recipe::new(
                    recipe_name(recipe_type, adjective, lead),
                    describe(recipe_type, &fruits, extras),
                    fruits,
                    recipe_type,
                )
            })
            .collect();

        debug!(
            "Generated {} recipes from {} ingredients",
            recipes.len(),
            ingredients.len()
        );
        recipes
    }
}

impl Default for RecipeGenerator {
    fn default() -> Self {
        Self::new(3)
    }
}
