use crate::error::StoreError;
use crate::recipes::{Recipe, RecipeType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored form of a liked recipe.
///
/// The ingredient list is kept as a JSON-encoded string and the type as
/// its stable tag, so either can fail to decode independently of the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub ingredients: String,
    pub recipe_type: String,
    pub is_expanded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl RecipeRecord {
    pub fn from_recipe(recipe: &Recipe, owner: Option<&str>) -> Result<Self, StoreError> {
        let ingredients =
            serde_json::to_string(&recipe.ingredients).map_err(|e| StoreError::InvalidRecord {
                details: format!("cannot encode ingredients of {}: {}", recipe.id, e),
            })?;

        Ok(Self {
            id: recipe.id,
            name: recipe.name.clone(),
            description: recipe.description.clone(),
            ingredients,
            recipe_type: recipe.recipe_type.tag().to_string(),
            is_expanded: recipe.is_expanded,
            owner: owner.map(str::to_string),
            saved_at: Utc::now(),
        })
    }

    /// Rebuild the recipe. Stored recipes are liked by definition.
    pub fn into_recipe(self) -> Result<Recipe, StoreError> {
        let ingredients: Vec<String> =
            serde_json::from_str(&self.ingredients).map_err(|e| StoreError::InvalidRecord {
                details: format!("ingredients of {} are not a string list: {}", self.id, e),
            })?;

        let recipe_type =
            RecipeType::from_tag(&self.recipe_type).ok_or_else(|| StoreError::InvalidRecord {
                details: format!("unknown recipe type '{}' on {}", self.recipe_type, self.id),
            })?;

        Ok(Recipe {
            id: self.id,
            name: self.name,
            description: self.description,
            ingredients,
            recipe_type,
            is_liked: true,
            is_expanded: self.is_expanded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Recipe {
        Recipe::new(
            "Spa Infused Water",
            "- Slice thinly: Lemon, Lime",
            vec!["Lemon".to_string(), "Lime".to_string()],
            RecipeType::DetoxWater,
        )
    }

    #[test]
    fn test_ingredients_stored_as_json_string() {
        let record = RecipeRecord::from_recipe(&sample(), Some("sam")).unwrap();
        assert_eq!(record.ingredients, r#"["Lemon","Lime"]"#);
        assert_eq!(record.recipe_type, "detoxWater");
        assert_eq!(record.owner.as_deref(), Some("sam"));
    }

    #[test]
    fn test_rebuilt_recipe_is_liked() {
        let recipe = sample();
        let rebuilt = RecipeRecord::from_recipe(&recipe, None)
            .unwrap()
            .into_recipe()
            .unwrap();

        assert!(rebuilt.is_liked);
        assert_eq!(rebuilt.id, recipe.id);
        assert_eq!(rebuilt.ingredients, recipe.ingredients);
        assert_eq!(rebuilt.recipe_type, recipe.recipe_type);
    }

    #[test]
    fn test_bad_fields_are_rejected() {
        let mut record = RecipeRecord::from_recipe(&sample(), None).unwrap();
        record.recipe_type = "milkshake".to_string();
        assert!(matches!(
            record.clone().into_recipe(),
            Err(StoreError::InvalidRecord { .. })
        ));

        record.recipe_type = "detoxWater".to_string();
        record.ingredients = "Lemon, Lime".to_string();
        assert!(record.into_recipe().is_err());
    }
}
