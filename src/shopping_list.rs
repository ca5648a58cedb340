use askama::Template;
use sqlx::{FromRow, SqlitePool};
use std::collections::BTreeMap;

use crate::error::AppError;

pub const FILENAME: &str = "shopping-list.txt";

/// One ingredient line of one recipe in a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Template)]
#[template(
    source = "{% for item in items %}{{ loop.index }}. {{ item.name }} {{ item.amount }} {{ item.measurement_unit }}{% if !loop.last %}
{% endif %}{% endfor %}",
    ext = "txt"
)]
struct ShoppingListTemplate<'a> {
    items: &'a [ShoppingItem],
}

/// Merges lines sharing a (name, unit) key by summing their amounts.
///
/// Output is ordered by name in codepoint order, then by unit.
pub fn aggregate(lines: impl IntoIterator<Item = CartLine>) -> Vec<ShoppingItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for line in lines {
        *totals.entry((line.name, line.measurement_unit)).or_insert(0) += line.amount;
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingItem {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

pub fn render(items: &[ShoppingItem]) -> Result<String, askama::Error> {
    ShoppingListTemplate { items }.render()
}

pub async fn cart_lines(db: &SqlitePool, user_id: &str) -> Result<Vec<CartLine>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT i.name, i.measurement_unit, ri.amount
        FROM relations r
        JOIN recipe_ingredients ri ON ri.recipe_id = r.target_id
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE r.kind = 'cart' AND r.user_id = ?
        ORDER BY r.target_id, ri.ingredient_id
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Builds the plain-text shopping list for everything in the user's cart.
pub async fn for_user(db: &SqlitePool, user_id: &str) -> Result<String, AppError> {
    let lines = cart_lines(db, user_id).await?;
    let items = aggregate(lines);
    tracing::debug!(user_id, items = items.len(), "shopping list built");
    Ok(render(&items)?)
}
