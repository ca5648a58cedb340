//! Validation of a proposed recipe composition (tags + ingredient lines) and
//! of the scalar recipe fields that travel with it.
//!
//! Checks never short-circuit: every problem in the payload is reported in
//! one pass, keyed by the field it belongs to.

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashSet;

use crate::error::ValidationErrors;
use crate::models::recipe::{
    MAX_AMOUNT, MAX_COOKING_TIME, MIN_AMOUNT, MIN_COOKING_TIME, RECIPE_NAME_MAX,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IngredientAmount {
    pub id: String,
    pub amount: i64,
}

/// Recipe write body as sent by clients. Every field is optional here so
/// that absence can be reported as a field error instead of a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePayload {
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionError {
    #[error("At least one tag is required")]
    EmptyTags,
    #[error("Tag {0} is listed more than once")]
    DuplicateTag(String),
    #[error("Tag {0} does not exist")]
    UnknownTag(String),
    #[error("At least one ingredient is required")]
    EmptyIngredients,
    #[error("Amount {amount} of ingredient {id} must be between 1 and 1000")]
    InvalidAmount { id: String, amount: i64 },
    #[error("Ingredient {0} does not exist")]
    UnknownIngredient(String),
    #[error("Ingredient {0} is listed more than once")]
    DuplicateIngredient(String),
    #[error("Cooking time {0} must be between 1 and 300 minutes")]
    InvalidCookingTime(i64),
    #[error("An image is required")]
    MissingImage,
    #[error("Field {0} is required")]
    MissingField(&'static str),
    #[error("Name must be at most 200 characters")]
    NameTooLong,
}

impl CompositionError {
    pub fn field(&self) -> &'static str {
        match self {
            CompositionError::EmptyTags
            | CompositionError::DuplicateTag(_)
            | CompositionError::UnknownTag(_) => "tags",
            CompositionError::EmptyIngredients
            | CompositionError::InvalidAmount { .. }
            | CompositionError::UnknownIngredient(_)
            | CompositionError::DuplicateIngredient(_) => "ingredients",
            CompositionError::InvalidCookingTime(_) => "cooking_time",
            CompositionError::MissingImage => "image",
            CompositionError::NameTooLong => "name",
            CompositionError::MissingField(field) => field,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CompositionError::EmptyTags => "empty_tags",
            CompositionError::DuplicateTag(_) => "duplicate_tag",
            CompositionError::UnknownTag(_) => "unknown_tag",
            CompositionError::EmptyIngredients => "empty_ingredients",
            CompositionError::InvalidAmount { .. } => "invalid_amount",
            CompositionError::UnknownIngredient(_) => "unknown_ingredient",
            CompositionError::DuplicateIngredient(_) => "duplicate_ingredient",
            CompositionError::InvalidCookingTime(_) => "invalid_cooking_time",
            CompositionError::MissingImage => "missing_image",
            CompositionError::MissingField(_) => "missing_field",
            CompositionError::NameTooLong => "name_too_long",
        }
    }
}

impl From<Vec<CompositionError>> for ValidationErrors {
    fn from(errors: Vec<CompositionError>) -> Self {
        let mut out = ValidationErrors::new();
        for error in errors {
            out.add(error.field(), error.code(), error.to_string());
        }
        out
    }
}

/// Tags and ingredient lines that passed validation.
///
/// Ingredient lines are sorted by ingredient id; storage and every later
/// read depend on that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub tag_ids: Vec<String>,
    pub ingredients: Vec<IngredientAmount>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub image: String,
    pub composition: Composition,
}

#[derive(Debug, Clone)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub image: Option<String>,
    pub composition: Composition,
}

/// The subset of referenced tag and ingredient ids that exist in storage.
#[derive(Debug, Clone, Default)]
pub struct KnownIds {
    pub tags: HashSet<String>,
    pub ingredients: HashSet<String>,
}

impl KnownIds {
    pub async fn lookup(db: &SqlitePool, payload: &RecipePayload) -> Result<Self, sqlx::Error> {
        let tag_ids = payload.tags.as_deref().unwrap_or_default();
        let ingredient_ids: Vec<&str> = payload
            .ingredients
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|line| line.id.as_str())
            .collect();

        Ok(Self {
            tags: existing_ids(db, "tags", tag_ids.iter().map(String::as_str)).await?,
            ingredients: existing_ids(db, "ingredients", ingredient_ids.into_iter()).await?,
        })
    }
}

async fn existing_ids<'a>(
    db: &SqlitePool,
    table: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<HashSet<String>, sqlx::Error> {
    let ids: Vec<&str> = ids.collect();
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id FROM ");
    query.push(table).push(" WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let rows: Vec<(String,)> = query.build_query_as().fetch_all(db).await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub fn validate_create(
    payload: &RecipePayload,
    known: &KnownIds,
) -> Result<NewRecipe, Vec<CompositionError>> {
    let mut errors = Vec::new();

    let composition = check_composition(payload, known, &mut errors);
    let name = check_name(payload.name.as_deref(), true, &mut errors);
    let text = check_text(payload.text.as_deref(), true, &mut errors);
    let cooking_time = check_cooking_time(payload.cooking_time, true, &mut errors);
    let image = check_image(payload.image.as_deref(), true, &mut errors);

    match (composition, name, text, cooking_time, image) {
        (Some(composition), Some(name), Some(text), Some(cooking_time), Some(image))
            if errors.is_empty() =>
        {
            Ok(NewRecipe {
                name,
                text,
                cooking_time,
                image,
                composition,
            })
        }
        _ => Err(errors),
    }
}

/// Scalar fields are optional on update, but the composition is replaced
/// wholesale and so both `tags` and `ingredients` must be present.
pub fn validate_update(
    payload: &RecipePayload,
    known: &KnownIds,
) -> Result<RecipeUpdate, Vec<CompositionError>> {
    let mut errors = Vec::new();

    let composition = check_composition(payload, known, &mut errors);
    let name = check_name(payload.name.as_deref(), false, &mut errors);
    let text = check_text(payload.text.as_deref(), false, &mut errors);
    let cooking_time = check_cooking_time(payload.cooking_time, false, &mut errors);
    let image = check_image(payload.image.as_deref(), false, &mut errors);

    match composition {
        Some(composition) if errors.is_empty() => Ok(RecipeUpdate {
            name,
            text,
            cooking_time,
            image,
            composition,
        }),
        _ => Err(errors),
    }
}

fn check_composition(
    payload: &RecipePayload,
    known: &KnownIds,
    errors: &mut Vec<CompositionError>,
) -> Option<Composition> {
    let before = errors.len();

    let tag_ids = match payload.tags.as_deref() {
        None => {
            errors.push(CompositionError::MissingField("tags"));
            None
        }
        Some(tags) => Some(check_tags(tags, known, errors)),
    };
    let ingredients = match payload.ingredients.as_deref() {
        None => {
            errors.push(CompositionError::MissingField("ingredients"));
            None
        }
        Some(lines) => Some(check_ingredients(lines, known, errors)),
    };

    if errors.len() != before {
        return None;
    }
    Some(Composition {
        tag_ids: tag_ids?,
        ingredients: ingredients?,
    })
}

fn check_tags(tags: &[String], known: &KnownIds, errors: &mut Vec<CompositionError>) -> Vec<String> {
    if tags.is_empty() {
        errors.push(CompositionError::EmptyTags);
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for id in tags {
        if !seen.insert(id.as_str()) {
            if reported.insert(id.as_str()) {
                errors.push(CompositionError::DuplicateTag(id.clone()));
            }
            continue;
        }
        if !known.tags.contains(id) {
            errors.push(CompositionError::UnknownTag(id.clone()));
        }
    }

    let mut tag_ids: Vec<String> = seen.into_iter().map(str::to_string).collect();
    tag_ids.sort();
    tag_ids
}

fn check_ingredients(
    lines: &[IngredientAmount],
    known: &KnownIds,
    errors: &mut Vec<CompositionError>,
) -> Vec<IngredientAmount> {
    if lines.is_empty() {
        errors.push(CompositionError::EmptyIngredients);
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for line in lines {
        if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&line.amount) {
            errors.push(CompositionError::InvalidAmount {
                id: line.id.clone(),
                amount: line.amount,
            });
        }
        // Same ingredient twice is a duplicate whatever the amounts are.
        if !seen.insert(line.id.as_str()) {
            if reported.insert(line.id.as_str()) {
                errors.push(CompositionError::DuplicateIngredient(line.id.clone()));
            }
            continue;
        }
        if !known.ingredients.contains(&line.id) {
            errors.push(CompositionError::UnknownIngredient(line.id.clone()));
        }
    }

    let mut sorted = lines.to_vec();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    sorted
}

fn check_name(
    name: Option<&str>,
    required: bool,
    errors: &mut Vec<CompositionError>,
) -> Option<String> {
    match name.map(str::trim) {
        None if required => {
            errors.push(CompositionError::MissingField("name"));
            None
        }
        None => None,
        Some("") => {
            errors.push(CompositionError::MissingField("name"));
            None
        }
        Some(name) if name.chars().count() > RECIPE_NAME_MAX => {
            errors.push(CompositionError::NameTooLong);
            None
        }
        Some(name) => Some(name.to_string()),
    }
}

fn check_text(
    text: Option<&str>,
    required: bool,
    errors: &mut Vec<CompositionError>,
) -> Option<String> {
    match text {
        None if !required => None,
        Some(text) if !text.trim().is_empty() => Some(text.to_string()),
        _ => {
            errors.push(CompositionError::MissingField("text"));
            None
        }
    }
}

fn check_cooking_time(
    cooking_time: Option<i64>,
    required: bool,
    errors: &mut Vec<CompositionError>,
) -> Option<i64> {
    match cooking_time {
        None if required => {
            errors.push(CompositionError::MissingField("cooking_time"));
            None
        }
        None => None,
        Some(minutes) if !(MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&minutes) => {
            errors.push(CompositionError::InvalidCookingTime(minutes));
            None
        }
        Some(minutes) => Some(minutes),
    }
}

fn check_image(
    image: Option<&str>,
    required: bool,
    errors: &mut Vec<CompositionError>,
) -> Option<String> {
    match image {
        None if !required => None,
        Some(image) if !image.trim().is_empty() => Some(image.to_string()),
        _ => {
            errors.push(CompositionError::MissingImage);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> KnownIds {
        KnownIds {
            tags: ["t1", "t2"].into_iter().map(String::from).collect(),
            ingredients: ["i1", "i2", "i3"].into_iter().map(String::from).collect(),
        }
    }

    fn line(id: &str, amount: i64) -> IngredientAmount {
        IngredientAmount {
            id: id.to_string(),
            amount,
        }
    }

    fn payload() -> RecipePayload {
        RecipePayload {
            tags: Some(vec!["t2".to_string(), "t1".to_string()]),
            ingredients: Some(vec![line("i3", 5), line("i1", 200)]),
            name: Some("Soup".to_string()),
            text: Some("Boil it".to_string()),
            cooking_time: Some(30),
            image: Some("data:image/png;base64,aGVsbG8=".to_string()),
        }
    }

    #[test]
    fn valid_payload_is_normalized() {
        let recipe = validate_create(&payload(), &known()).unwrap();
        assert_eq!(recipe.composition.tag_ids, vec!["t1", "t2"]);
        assert_eq!(
            recipe.composition.ingredients,
            vec![line("i1", 200), line("i3", 5)]
        );
        assert_eq!(recipe.name, "Soup");
        assert_eq!(recipe.cooking_time, 30);
    }

    #[test]
    fn empty_tags_and_ingredients() {
        let mut p = payload();
        p.tags = Some(vec![]);
        p.ingredients = Some(vec![]);
        let errors = validate_create(&p, &known()).unwrap_err();
        assert!(errors.contains(&CompositionError::EmptyTags));
        assert!(errors.contains(&CompositionError::EmptyIngredients));
    }

    #[test]
    fn duplicate_tag_reported_once() {
        let mut p = payload();
        p.tags = Some(vec!["t1".into(), "t1".into(), "t1".into()]);
        let errors = validate_create(&p, &known()).unwrap_err();
        assert_eq!(errors, vec![CompositionError::DuplicateTag("t1".into())]);
    }

    #[test]
    fn unknown_references() {
        let mut p = payload();
        p.tags = Some(vec!["t1".into(), "nope".into()]);
        p.ingredients = Some(vec![line("i1", 1), line("ghost", 1)]);
        let errors = validate_create(&p, &known()).unwrap_err();
        assert!(errors.contains(&CompositionError::UnknownTag("nope".into())));
        assert!(errors.contains(&CompositionError::UnknownIngredient("ghost".into())));
    }

    #[test]
    fn duplicate_ingredient_with_different_amounts() {
        let mut p = payload();
        p.ingredients = Some(vec![line("i1", 10), line("i1", 20)]);
        let errors = validate_create(&p, &known()).unwrap_err();
        assert_eq!(errors, vec![CompositionError::DuplicateIngredient("i1".into())]);
    }

    #[test]
    fn amount_bounds() {
        for amount in [0, -1, 1001] {
            let mut p = payload();
            p.ingredients = Some(vec![line("i1", amount)]);
            let errors = validate_create(&p, &known()).unwrap_err();
            assert_eq!(
                errors,
                vec![CompositionError::InvalidAmount {
                    id: "i1".into(),
                    amount
                }]
            );
        }
        for amount in [1, 1000] {
            let mut p = payload();
            p.ingredients = Some(vec![line("i1", amount)]);
            assert!(validate_create(&p, &known()).is_ok());
        }
    }

    #[test]
    fn cooking_time_bounds() {
        for minutes in [0, 301, -5] {
            let mut p = payload();
            p.cooking_time = Some(minutes);
            let errors = validate_create(&p, &known()).unwrap_err();
            assert_eq!(errors, vec![CompositionError::InvalidCookingTime(minutes)]);
        }
        for minutes in [1, 300] {
            let mut p = payload();
            p.cooking_time = Some(minutes);
            assert!(validate_create(&p, &known()).is_ok());
        }
    }

    #[test]
    fn create_requires_image() {
        let mut p = payload();
        p.image = None;
        assert_eq!(
            validate_create(&p, &known()).unwrap_err(),
            vec![CompositionError::MissingImage]
        );
        p.image = Some("  ".into());
        assert_eq!(
            validate_create(&p, &known()).unwrap_err(),
            vec![CompositionError::MissingImage]
        );
    }

    #[test]
    fn errors_are_collected_across_fields() {
        let p = RecipePayload {
            tags: Some(vec![]),
            ingredients: Some(vec![line("i1", 0), line("i1", 3)]),
            name: None,
            text: Some(String::new()),
            cooking_time: Some(0),
            image: None,
        };
        let errors = validate_create(&p, &known()).unwrap_err();
        let fields: HashSet<&str> = errors.iter().map(CompositionError::field).collect();
        assert_eq!(
            fields,
            ["tags", "ingredients", "name", "text", "cooking_time", "image"]
                .into_iter()
                .collect()
        );
    }

    #[test]
    fn update_requires_both_composition_fields() {
        let mut p = payload();
        p.ingredients = None;
        assert_eq!(
            validate_update(&p, &known()).unwrap_err(),
            vec![CompositionError::MissingField("ingredients")]
        );

        let mut p = payload();
        p.tags = None;
        assert_eq!(
            validate_update(&p, &known()).unwrap_err(),
            vec![CompositionError::MissingField("tags")]
        );
    }

    #[test]
    fn update_leaves_scalars_optional() {
        let p = RecipePayload {
            tags: Some(vec!["t1".into()]),
            ingredients: Some(vec![line("i2", 7)]),
            ..Default::default()
        };
        let update = validate_update(&p, &known()).unwrap();
        assert!(update.name.is_none());
        assert!(update.image.is_none());
        assert_eq!(update.composition.ingredients, vec![line("i2", 7)]);
    }

    #[test]
    fn long_name_rejected() {
        let mut p = payload();
        p.name = Some("x".repeat(RECIPE_NAME_MAX + 1));
        assert_eq!(
            validate_create(&p, &known()).unwrap_err(),
            vec![CompositionError::NameTooLong]
        );
    }

    #[test]
    fn converts_to_field_keyed_errors() {
        let errors: ValidationErrors = vec![
            CompositionError::EmptyTags,
            CompositionError::MissingField("ingredients"),
        ]
        .into();
        assert_eq!(errors.codes("tags"), vec!["empty_tags"]);
        assert_eq!(errors.codes("ingredients"), vec!["missing_field"]);
    }
}
