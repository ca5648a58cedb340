use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
}

impl Ingredient {
    pub fn new(name: &str, measurement_unit: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            measurement_unit: measurement_unit.trim().to_string(),
        }
    }

    /// Value stored in `ingredients.search_name`. SQLite only folds ASCII
    /// case, so prefix search runs against this lowercased copy.
    pub fn search_key(name: &str) -> String {
        name.trim().to_lowercase()
    }
}

/// One ingredient line of a recipe, joined with its ingredient row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct RecipeIngredient {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}
