mod generator;
mod model;
mod templates;

pub use generator::{eligible_types, RecipeGenerator};
pub use model::{Extras, PreferenceSettings, Recipe, RecipeType};
pub use templates::{adjectives, describe, recipe_name, FALLBACK_FRUIT};
