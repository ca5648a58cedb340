use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const MIN_COOKING_TIME: i64 = 1;
pub const MAX_COOKING_TIME: i64 = 300;
pub const MIN_AMOUNT: i64 = 1;
pub const MAX_AMOUNT: i64 = 1000;
pub const RECIPE_NAME_MAX: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: String,
    pub author_id: String,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
    pub pub_date: String,
}
