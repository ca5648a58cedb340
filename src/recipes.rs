//! Recipe storage: reads for the rendering layer, and the transactional
//! write path that keeps a recipe and its composition consistent.

use chrono::{SecondsFormat, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::composition::{Composition, NewRecipe, RecipeUpdate};
use crate::error::AppError;
use crate::models::{Recipe, RecipeIngredient, Tag, User};

pub async fn find(db: &SqlitePool, id: &str) -> Result<Option<Recipe>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM recipes WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn tags_of<'e>(
    db: impl SqliteExecutor<'e>,
    recipe_id: &str,
) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT t.* FROM tags t
        JOIN recipe_tags rt ON rt.tag_id = t.id
        WHERE rt.recipe_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await
}

pub async fn ingredients_of<'e>(
    db: impl SqliteExecutor<'e>,
    recipe_id: &str,
) -> Result<Vec<RecipeIngredient>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ?
        ORDER BY ri.ingredient_id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await
}

pub async fn count_by_author(db: &SqlitePool, author_id: &str) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = ?")
        .bind(author_id)
        .fetch_one(db)
        .await?;
    Ok(count)
}

/// Newest first; `limit` of `None` returns every recipe of the author.
pub async fn by_author(
    db: &SqlitePool,
    author_id: &str,
    limit: Option<i64>,
) -> Result<Vec<Recipe>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM recipes WHERE author_id = ? ORDER BY pub_date DESC, rowid DESC LIMIT ?",
    )
    .bind(author_id)
    .bind(limit.unwrap_or(-1))
    .fetch_all(db)
    .await
}

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<String>,
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<String>,
    pub in_cart_of: Option<String>,
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, Sqlite>, filter: &'a RecipeFilter) {
    query.push(" WHERE 1 = 1");

    if let Some(author) = &filter.author {
        query.push(" AND r.author_id = ").push_bind(author.as_str());
    }

    if !filter.tag_slugs.is_empty() {
        query.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug IN (",
        );
        let mut slugs = query.separated(", ");
        for slug in &filter.tag_slugs {
            slugs.push_bind(slug.as_str());
        }
        slugs.push_unseparated("))");
    }

    for (kind, user_id) in [("favorite", &filter.favorited_by), ("cart", &filter.in_cart_of)] {
        if let Some(user_id) = user_id {
            query
                .push(" AND EXISTS (SELECT 1 FROM relations rel WHERE rel.target_id = r.id AND rel.kind = '")
                .push(kind)
                .push("' AND rel.user_id = ")
                .push_bind(user_id.as_str())
                .push(")");
        }
    }
}

/// One page of recipes matching `filter`, newest first, plus the total count.
pub async fn list(
    db: &SqlitePool,
    filter: &RecipeFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Recipe>, i64), sqlx::Error> {
    let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    push_filters(&mut count_query, filter);
    let (count,): (i64,) = count_query.build_query_as().fetch_one(db).await?;

    let mut page_query = QueryBuilder::new("SELECT r.* FROM recipes r");
    push_filters(&mut page_query, filter);
    page_query
        .push(" ORDER BY r.pub_date DESC, r.rowid DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let recipes: Vec<Recipe> = page_query.build_query_as().fetch_all(db).await?;

    Ok((recipes, count))
}

/// Persists a recipe and its composition in one transaction.
///
/// `image_url` is the reference handed back by the image store.
pub async fn create(
    db: &SqlitePool,
    author: &User,
    recipe: &NewRecipe,
    image_url: String,
) -> Result<Recipe, AppError> {
    let recipe_row = Recipe {
        id: Uuid::new_v4().to_string(),
        author_id: author.id.clone(),
        name: recipe.name.clone(),
        image: image_url,
        text: recipe.text.clone(),
        cooking_time: recipe.cooking_time,
        pub_date: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    };

    let mut tx = db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO recipes (id, author_id, name, image, text, cooking_time, pub_date)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&recipe_row.id)
    .bind(&recipe_row.author_id)
    .bind(&recipe_row.name)
    .bind(&recipe_row.image)
    .bind(&recipe_row.text)
    .bind(recipe_row.cooking_time)
    .bind(&recipe_row.pub_date)
    .execute(&mut *tx)
    .await?;

    replace_composition(&mut tx, &recipe_row.id, &recipe.composition).await?;

    tx.commit().await?;
    tracing::info!(recipe_id = %recipe_row.id, author_id = %author.id, "recipe created");
    Ok(recipe_row)
}

/// Applies scalar changes and replaces the whole composition atomically.
/// `pub_date` and the author are never touched.
pub async fn update(
    db: &SqlitePool,
    recipe_id: &str,
    update: &RecipeUpdate,
    image_url: Option<String>,
) -> Result<Recipe, AppError> {
    let mut tx = db.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE recipes
        SET name = COALESCE(?, name),
            text = COALESCE(?, text),
            cooking_time = COALESCE(?, cooking_time),
            image = COALESCE(?, image)
        WHERE id = ?
        "#,
    )
    .bind(&update.name)
    .bind(&update.text)
    .bind(update.cooking_time)
    .bind(&image_url)
    .bind(recipe_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    // deleted since the caller loaded it
    if updated == 0 {
        return Err(AppError::NotFound);
    }

    replace_composition(&mut tx, recipe_id, &update.composition).await?;

    let recipe: Recipe = sqlx::query_as("SELECT * FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(recipe_id, "recipe updated");
    Ok(recipe)
}

/// Tag links and ingredient lines cascade with the row; relations pointing
/// at the recipe are dropped by trigger.
pub async fn delete(db: &SqlitePool, recipe_id: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .execute(db)
        .await?;
    tracing::info!(recipe_id, "recipe deleted");
    Ok(())
}

/// Replace-not-merge: old tag links and ingredient lines are removed and the
/// new sets inserted in one batch each, ingredient lines in id order.
async fn replace_composition(
    conn: &mut SqliteConnection,
    recipe_id: &str,
    composition: &Composition,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    let mut tags = QueryBuilder::<Sqlite>::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    tags.push_values(&composition.tag_ids, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(tag_id.as_str());
    });
    tags.build().execute(&mut *conn).await?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    let mut lines = composition.ingredients.iter().collect::<Vec<_>>();
    lines.sort_by(|a, b| a.id.cmp(&b.id));

    let mut ingredients = QueryBuilder::<Sqlite>::new(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
    );
    ingredients.push_values(lines, |mut row, line| {
        row.push_bind(recipe_id)
            .push_bind(line.id.as_str())
            .push_bind(line.amount);
    });
    ingredients.build().execute(&mut *conn).await?;

    Ok(())
}
