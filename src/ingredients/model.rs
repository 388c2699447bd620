use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name given to manually added ingredients
pub const DEFAULT_INGREDIENT_NAME: &str = "New fruit";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Stable across renames
    pub id: Uuid,
    pub name: String,
}

impl Ingredient {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// What observers see of the aggregator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientSnapshot {
    pub ingredients: Vec<Ingredient>,
    /// True while at least one detection is waiting to be committed
    pub is_processing: bool,
}

impl IngredientSnapshot {
    pub fn names(&self) -> Vec<String> {
        self.ingredients.iter().map(|i| i.name.clone()).collect()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.ingredients.iter().any(|i| i.name == name)
    }
}
