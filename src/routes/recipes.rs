use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::auth::{AuthUser, CurrentUser};
use crate::composition::{validate_create, validate_update, KnownIds, RecipePayload};
use crate::error::{AppError, ValidationErrors};
use crate::models::{Recipe, RelationKind, User};
use crate::pagination::{Page, QueryPairs};
use crate::recipes::{self, RecipeFilter};
use crate::relations;
use crate::routes::ApiJson;
use crate::views::{RecipeSummary, RecipeView};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/api/recipes/{id}",
            get(show_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route(
            "/api/recipes/{id}/favorite",
            post(add_favorite).delete(remove_favorite),
        )
        .route(
            "/api/recipes/{id}/shopping_cart",
            post(add_to_cart).delete(remove_from_cart),
        )
}

fn filter_from_query(query: &QueryPairs, viewer: Option<&User>) -> RecipeFilter {
    let viewer_id = viewer.map(|u| u.id.clone());
    RecipeFilter {
        author: query.get("author").filter(|a| !a.is_empty()).map(str::to_string),
        tag_slugs: query.get_all("tags"),
        favorited_by: viewer_id.clone().filter(|_| query.flag("is_favorited")),
        in_cart_of: viewer_id.filter(|_| query.flag("is_in_shopping_cart")),
    }
}

/// Loads a recipe the caller is allowed to mutate.
async fn owned_recipe(state: &AppState, id: &str, user: &User) -> Result<Recipe, AppError> {
    let recipe = recipes::find(&state.db, id).await?.ok_or(AppError::NotFound)?;
    if recipe.author_id != user.id {
        return Err(AppError::Forbidden);
    }
    Ok(recipe)
}

async fn list_recipes(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, AppError> {
    let query = QueryPairs::parse(raw.as_deref());
    let window = query.window(state.page_size);
    let filter = filter_from_query(&query, viewer.as_ref());

    let (rows, count) = recipes::list(&state.db, &filter, window.limit, window.offset()).await?;
    let views = RecipeView::build_all(&state.db, rows, viewer.as_ref()).await?;

    Ok(Json(Page::new(views, count, window, "/api/recipes", &query)))
}

async fn show_recipe(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = recipes::find(&state.db, &id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(RecipeView::build(&state.db, recipe, viewer.as_ref()).await?))
}

async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<RecipePayload>,
) -> Result<impl IntoResponse, AppError> {
    let known = KnownIds::lookup(&state.db, &payload).await?;
    let new_recipe = validate_create(&payload, &known)
        .map_err(|errors| AppError::Validation(ValidationErrors::from(errors)))?;

    let image_url = state.images.save(&new_recipe.image).await?;
    let recipe = match recipes::create(&state.db, &user, &new_recipe, image_url.clone()).await {
        Ok(recipe) => recipe,
        Err(e) => {
            state.images.discard(&image_url).await;
            return Err(e);
        }
    };

    let view = RecipeView::build(&state.db, recipe, Some(&user)).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<RecipePayload>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = owned_recipe(&state, &id, &user).await?;

    let known = KnownIds::lookup(&state.db, &payload).await?;
    let update = validate_update(&payload, &known)
        .map_err(|errors| AppError::Validation(ValidationErrors::from(errors)))?;

    let image_url = match update.image.as_deref() {
        Some(image) => Some(state.images.save(image).await?),
        None => None,
    };
    let updated = match recipes::update(&state.db, &recipe.id, &update, image_url.clone()).await {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(url) = &image_url {
                state.images.discard(url).await;
            }
            return Err(e);
        }
    };
    if image_url.is_some() {
        state.images.discard(&recipe.image).await;
    }

    Ok(Json(RecipeView::build(&state.db, updated, Some(&user)).await?))
}

async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = owned_recipe(&state, &id, &user).await?;
    recipes::delete(&state.db, &recipe.id).await?;
    state.images.discard(&recipe.image).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_relation(
    state: &AppState,
    kind: RelationKind,
    user: &User,
    id: &str,
) -> Result<(StatusCode, Json<RecipeSummary>), AppError> {
    relations::add(&state.db, kind, user, id).await?;
    let recipe = recipes::find(&state.db, id).await?.ok_or(AppError::NotFound)?;
    Ok((StatusCode::CREATED, Json(RecipeSummary::from(recipe))))
}

async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    add_relation(&state, RelationKind::Favorite, &user, &id).await
}

async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    relations::remove(&state.db, RelationKind::Favorite, &user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    add_relation(&state, RelationKind::Cart, &user, &id).await
}

async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    relations::remove(&state.db, RelationKind::Cart, &user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
