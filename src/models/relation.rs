use serde::{Deserialize, Serialize};

/// Discriminant of a row in the shared `relations` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RelationKind {
    Favorite,
    Cart,
    Follow,
}

impl RelationKind {
    /// Table holding the rows a relation of this kind points at.
    pub fn target_table(self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::Cart => "recipes",
            RelationKind::Follow => "users",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationKind::Favorite => write!(f, "favorite"),
            RelationKind::Cart => write!(f, "cart"),
            RelationKind::Follow => write!(f, "follow"),
        }
    }
}
