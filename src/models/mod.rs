pub mod user;
pub mod tag;
pub mod ingredient;
pub mod recipe;
pub mod relation;

pub use user::User;
pub use tag::Tag;
pub use ingredient::{Ingredient, RecipeIngredient};
pub use recipe::Recipe;
pub use relation::RelationKind;
