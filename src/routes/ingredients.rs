use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::Ingredient;
use crate::AppState;

#[derive(Deserialize)]
pub struct IngredientSearch {
    name: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/ingredients", get(list_ingredients))
        .route("/api/ingredients/{id}", get(show_ingredient))
}

/// Escapes LIKE wildcards so the search term matches literally.
fn like_prefix(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 1);
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

async fn list_ingredients(
    State(state): State<AppState>,
    Query(search): Query<IngredientSearch>,
) -> Result<impl IntoResponse, AppError> {
    let term = Ingredient::search_key(search.name.as_deref().unwrap_or_default());

    let ingredients: Vec<Ingredient> = sqlx::query_as(
        "SELECT * FROM ingredients WHERE search_name LIKE ? ESCAPE '\\' ORDER BY name, measurement_unit",
    )
    .bind(like_prefix(&term))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ingredients))
}

async fn show_ingredient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ingredient: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;
    ingredient.map(Json).ok_or(AppError::NotFound)
}
