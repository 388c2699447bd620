//! Name pools and step templates for each recipe type.

use super::model::{Extras, RecipeType};

const SMOOTHIE_ADJECTIVES: &[&str] = &["Energizing", "Refreshing", "Tropical", "Power", "Morning"];
const FRUIT_SALAD_ADJECTIVES: &[&str] = &["Fresh", "Vibrant", "Summer", "Rainbow", "Vitamin"];
const FRUIT_BOWL_ADJECTIVES: &[&str] = &["Nourishing", "Sunshine", "Tropical", "Paradise"];
const DETOX_WATER_ADJECTIVES: &[&str] = &["Refreshing", "Cleansing", "Spa", "Citrus"];
const POPSICLE_ADJECTIVES: &[&str] = &["Frozen", "Summer", "Fresh", "Cool"];
const ENERGY_BALLS_ADJECTIVES: &[&str] = &["Energy", "Power", "Protein", "Healthy"];

const _: () = assert!(!SMOOTHIE_ADJECTIVES.is_empty());
const _: () = assert!(!FRUIT_SALAD_ADJECTIVES.is_empty());
const _: () = assert!(!FRUIT_BOWL_ADJECTIVES.is_empty());
const _: () = assert!(!DETOX_WATER_ADJECTIVES.is_empty());
const _: () = assert!(!POPSICLE_ADJECTIVES.is_empty());
const _: () = assert!(!ENERGY_BALLS_ADJECTIVES.is_empty());

/// Stand-in for the lead fruit when a recipe has none
pub const FALLBACK_FRUIT: &str = "Fruit";

/// Never empty
pub fn adjectives(recipe_type: RecipeType) -> &'static [&'static str] {
    match recipe_type {
        RecipeType::Smoothie => SMOOTHIE_ADJECTIVES,
        RecipeType::FruitSalad => FRUIT_SALAD_ADJECTIVES,
        RecipeType::FruitBowl => FRUIT_BOWL_ADJECTIVES,
        RecipeType::DetoxWater => DETOX_WATER_ADJECTIVES,
        RecipeType::Popsicle => POPSICLE_ADJECTIVES,
        RecipeType::EnergyBalls => ENERGY_BALLS_ADJECTIVES,
    }
}

pub fn recipe_name(recipe_type: RecipeType, adjective: &str, lead: &str) -> String {
    match recipe_type {
        RecipeType::Smoothie => format!("{} {} Smoothie", adjective, lead),
        RecipeType::FruitSalad => format!("{} Fruit Salad", adjective),
        RecipeType::FruitBowl => format!("{} {} Bowl", adjective, lead),
        RecipeType::DetoxWater => format!("{} Infused Water", adjective),
        RecipeType::Popsicle => format!("{} {} Pops", adjective, lead),
        RecipeType::EnergyBalls => format!("{} Fruit Balls", adjective),
    }
}

/// Build the step list: opening step, conditional steps in a fixed order,
/// then the closing steps. One step per line.
pub fn describe(recipe_type: RecipeType, ingredients: &[String], extras: Extras) -> String {
    let fruits = ingredients.join(", ");
    let mut steps: Vec<String> = Vec::new();
    let mut step = |enabled: bool, text: &str| {
        if enabled {
            steps.push(format!("- {}", text));
        }
    };

    match recipe_type {
        RecipeType::Smoothie => {
            step(true, &format!("Wash and cut the fruits: {}", fruits));
            step(extras.ice, "Add ice cubes for extra freshness");
            step(extras.yogurt, "Pour in some yogurt for creaminess");
            step(extras.cereals, "Add your favorite cereals for texture");
            step(extras.seeds, "Sprinkle some seeds for extra nutrients");
            step(true, "Blend everything until smooth");
            step(true, "Pour into a glass and enjoy!");
        }
        RecipeType::FruitSalad => {
            step(true, &format!("Wash and cut into bite-sized pieces: {}", fruits));
            step(extras.yogurt, "Add a dollop of yogurt");
            step(extras.cereals, "Sprinkle with granola");
            step(extras.seeds, "Top with mixed seeds");
            step(true, "Gently mix everything");
            step(true, "Chill for 10 minutes before serving");
        }
        RecipeType::FruitBowl => {
            step(true, &format!("Prepare the fruits: {}", fruits));
            step(extras.yogurt, "Create a yogurt base in the bowl");
            step(true, "Arrange fruits in a decorative pattern");
            step(extras.cereals, "Add a layer of crunchy cereals");
            step(extras.seeds, "Garnish with seeds");
            step(true, "Serve immediately while fresh");
        }
        RecipeType::DetoxWater => {
            step(true, &format!("Slice thinly: {}", fruits));
            step(true, "Fill a large pitcher with fresh water");
            step(extras.ice, "Add ice cubes");
            step(true, "Add the sliced fruits");
            step(true, "Let it infuse for 2-3 hours");
            step(true, "Strain and serve chilled");
        }
        RecipeType::Popsicle => {
            step(true, &format!("Blend together: {}", fruits));
            step(extras.yogurt, "Mix with yogurt for creaminess");
            step(extras.seeds, "Add some seeds for crunch");
            step(true, "Pour into popsicle molds");
            step(true, "Freeze for at least 4 hours");
            step(true, "Enjoy your healthy frozen treat!");
        }
        RecipeType::EnergyBalls => {
            step(true, &format!("Finely chop: {}", fruits));
            step(extras.cereals, "Mix with crushed cereals");
            step(extras.seeds, "Add seeds for protein boost");
            step(true, "Form into small balls");
            step(true, "Roll in coconut or cocoa powder");
            step(true, "Refrigerate for 30 minutes");
        }
    }

    steps.join("\n")
}
