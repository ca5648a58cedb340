//! Favorite, cart and follow rows, all stored in the one `relations` table.
//!
//! Uniqueness of `(kind, user, target)` is enforced by the table itself, so
//! two racing adds resolve to one success and one `AlreadyExists` no matter
//! how many replicas serve requests.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::AppError;
use crate::models::{RelationKind, User};

/// One statement: the write lock is taken before the target is looked up,
/// so a losing racer sees the unique violation rather than a stale snapshot.
pub async fn add(
    db: &SqlitePool,
    kind: RelationKind,
    subject: &User,
    target_id: &str,
) -> Result<(), AppError> {
    if kind == RelationKind::Follow && subject.id == target_id {
        return Err(AppError::SelfFollow);
    }

    let sql = format!(
        "INSERT INTO relations (kind, user_id, target_id, created_at) \
         SELECT ?, ?, ?, ? WHERE EXISTS (SELECT 1 FROM {} WHERE id = ?)",
        kind.target_table()
    );
    let inserted = sqlx::query(&sql)
        .bind(kind)
        .bind(&subject.id)
        .bind(target_id)
        .bind(Utc::now().to_rfc3339())
        .bind(target_id)
        .execute(db)
        .await?
        .rows_affected();

    if inserted == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(%kind, user_id = %subject.id, target_id, "relation added");
    Ok(())
}

pub async fn remove(
    db: &SqlitePool,
    kind: RelationKind,
    subject: &User,
    target_id: &str,
) -> Result<(), AppError> {
    let deleted = sqlx::query("DELETE FROM relations WHERE kind = ? AND user_id = ? AND target_id = ?")
        .bind(kind)
        .bind(&subject.id)
        .bind(target_id)
        .execute(db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(if target_exists(db, kind, target_id).await? {
            AppError::RelationNotFound
        } else {
            AppError::NotFound
        });
    }

    tracing::info!(%kind, user_id = %subject.id, target_id, "relation removed");
    Ok(())
}

/// Whether `user_id` holds a `kind` relation to `target_id`.
pub async fn exists<'e>(
    db: impl SqliteExecutor<'e>,
    kind: RelationKind,
    user_id: &str,
    target_id: &str,
) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM relations WHERE kind = ? AND user_id = ? AND target_id = ?",
    )
    .bind(kind)
    .bind(user_id)
    .bind(target_id)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

/// Viewer-relative membership; anonymous viewers hold no relations.
pub async fn viewer_has<'e>(
    db: impl SqliteExecutor<'e>,
    kind: RelationKind,
    viewer: Option<&User>,
    target_id: &str,
) -> Result<bool, sqlx::Error> {
    match viewer {
        Some(viewer) => exists(db, kind, &viewer.id, target_id).await,
        None => Ok(false),
    }
}

async fn target_exists(db: &SqlitePool, kind: RelationKind, target_id: &str) -> Result<bool, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?", kind.target_table());
    let (count,): (i64,) = sqlx::query_as(&sql).bind(target_id).fetch_one(db).await?;
    Ok(count > 0)
}
