mod actor;
mod aggregator;
mod model;

pub use aggregator::IngredientAggregator;
pub use model::{Ingredient, IngredientSnapshot, DEFAULT_INGREDIENT_NAME};
