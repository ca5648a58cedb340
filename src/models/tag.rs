use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::LazyLock;
use uuid::Uuid;

static COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-F]{6}$").expect("valid color pattern"));
static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug pattern"));

pub const TAG_NAME_MAX: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("tag name must be between 1 and 200 characters")]
    InvalidName,
    #[error("color {0:?} is not a #RRGGBB hex value")]
    InvalidColor(String),
    #[error("slug {0:?} may only contain letters, digits, '-' and '_'")]
    InvalidSlug(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl Tag {
    /// Builds a tag with its color folded to the canonical uppercase form.
    pub fn new(name: &str, color: &str, slug: &str) -> Result<Self, TagError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > TAG_NAME_MAX {
            return Err(TagError::InvalidName);
        }
        let color = normalize_color(color)?;
        let slug = slug.trim();
        if !SLUG_RE.is_match(slug) {
            return Err(TagError::InvalidSlug(slug.to_string()));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            color,
            slug: slug.to_string(),
        })
    }
}

pub fn normalize_color(color: &str) -> Result<String, TagError> {
    let upper = color.trim().to_uppercase();
    if COLOR_RE.is_match(&upper) {
        Ok(upper)
    } else {
        Err(TagError::InvalidColor(color.to_string()))
    }
}
