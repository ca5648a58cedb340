//! Response bodies, built explicitly per endpoint. Viewer-relative flags are
//! computed on every call and never cached.

use serde::Serialize;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::models::{Recipe, RecipeIngredient, RelationKind, Tag, User};
use crate::{recipes, relations};

#[derive(Debug, Serialize)]
pub struct UserView {
    pub email: String,
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub async fn build<'e>(
        db: impl SqliteExecutor<'e>,
        user: User,
        viewer: Option<&User>,
    ) -> Result<Self, sqlx::Error> {
        let is_subscribed = relations::viewer_has(db, RelationKind::Follow, viewer, &user.id).await?;
        Ok(Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        })
    }
}

/// Returned by registration: the new account, without viewer-relative fields.
#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub email: String,
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for RegisteredUser {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeView {
    pub id: String,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

impl RecipeView {
    /// All reads share one transaction, so tags and ingredient lines always
    /// come from the same committed version of the recipe.
    pub async fn build(db: &SqlitePool, recipe: Recipe, viewer: Option<&User>) -> Result<Self, sqlx::Error> {
        let mut tx = db.begin().await?;

        let author: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&recipe.author_id)
            .fetch_one(&mut *tx)
            .await?;

        let view = Self {
            tags: recipes::tags_of(&mut *tx, &recipe.id).await?,
            author: UserView::build(&mut *tx, author, viewer).await?,
            ingredients: recipes::ingredients_of(&mut *tx, &recipe.id).await?,
            is_favorited: relations::viewer_has(&mut *tx, RelationKind::Favorite, viewer, &recipe.id)
                .await?,
            is_in_shopping_cart: relations::viewer_has(&mut *tx, RelationKind::Cart, viewer, &recipe.id)
                .await?,
            id: recipe.id,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        };

        tx.commit().await?;
        Ok(view)
    }

    pub async fn build_all(
        db: &SqlitePool,
        recipes: Vec<Recipe>,
        viewer: Option<&User>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut views = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            views.push(Self::build(db, recipe, viewer).await?);
        }
        Ok(views)
    }
}

/// Short recipe form used in favorite/cart responses and follow listings.
#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

impl From<Recipe> for RecipeSummary {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// A followed author together with a preview of their recipes.
#[derive(Debug, Serialize)]
pub struct FollowView {
    pub email: String,
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

impl FollowView {
    pub async fn build(db: &SqlitePool, author: User, recipes_limit: Option<i64>) -> Result<Self, sqlx::Error> {
        let recipes = recipes::by_author(db, &author.id, recipes_limit).await?;
        let recipes_count = recipes::count_by_author(db, &author.id).await?;

        Ok(Self {
            email: author.email,
            id: author.id,
            username: author.username,
            first_name: author.first_name,
            last_name: author.last_name,
            is_subscribed: true,
            recipes: recipes.into_iter().map(RecipeSummary::from).collect(),
            recipes_count,
        })
    }
}
