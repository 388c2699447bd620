use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The six fixed recipe categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecipeType {
    Smoothie,
    FruitSalad,
    FruitBowl,
    DetoxWater,
    Popsicle,
    EnergyBalls,
}

impl RecipeType {
    pub const ALL: [RecipeType; 6] = [
        RecipeType::Smoothie,
        RecipeType::FruitSalad,
        RecipeType::FruitBowl,
        RecipeType::DetoxWater,
        RecipeType::Popsicle,
        RecipeType::EnergyBalls,
    ];

    /// Stable tag used by the store
    pub fn tag(&self) -> &'static str {
        match self {
            RecipeType::Smoothie => "smoothie",
            RecipeType::FruitSalad => "fruitSalad",
            RecipeType::FruitBowl => "fruitBowl",
            RecipeType::DetoxWater => "detoxWater",
            RecipeType::Popsicle => "popsicle",
            RecipeType::EnergyBalls => "energyBalls",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    pub fn title(&self) -> &'static str {
        match self {
            RecipeType::Smoothie => "Smoothie",
            RecipeType::FruitSalad => "Fruit Salad",
            RecipeType::FruitBowl => "Fruit Bowl",
            RecipeType::DetoxWater => "Detox Water",
            RecipeType::Popsicle => "Popsicle",
            RecipeType::EnergyBalls => "Energy Balls",
        }
    }
}

impl fmt::Display for RecipeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Persistence key, never changes
    pub id: Uuid,
    pub name: String,
    /// One step per line
    pub description: String,
    pub ingredients: Vec<String>,
    pub recipe_type: RecipeType,
    pub is_liked: bool,
    pub is_expanded: bool,
}

impl Recipe {
    /// A fresh, unliked and collapsed recipe
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        ingredients: Vec<String>,
        recipe_type: RecipeType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            ingredients,
            recipe_type,
            is_liked: false,
            is_expanded: false,
        }
    }

    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.description.lines()
    }
}

/// Answers from onboarding. `None` means the question was skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceSettings {
    pub max_fruits_per_recipe: Option<usize>,
    pub wants_cereals: Option<bool>,
    pub wants_seeds: Option<bool>,
    pub wants_ice: Option<bool>,
    pub wants_yogurt: Option<bool>,
}

impl PreferenceSettings {
    /// Fruits per recipe, never below one
    pub fn max_fruits(&self, default: usize) -> usize {
        self.max_fruits_per_recipe.unwrap_or(default).max(1)
    }

    /// Resolved add-in flags; unanswered means no
    pub fn extras(&self) -> Extras {
        Extras {
            ice: self.wants_ice.unwrap_or(false),
            yogurt: self.wants_yogurt.unwrap_or(false),
            cereals: self.wants_cereals.unwrap_or(false),
            seeds: self.wants_seeds.unwrap_or(false),
        }
    }
}

/// Optional add-ins that switch conditional recipe steps on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extras {
    pub ice: bool,
    pub yogurt: bool,
    pub cereals: bool,
    pub seeds: bool,
}
