use clap::{Parser, Subcommand};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{Ingredient, Tag};

#[derive(Parser)]
#[command(name = "foodgram", about = "Recipe sharing backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Load ingredients from a JSON array of {name, measurement_unit}
    ImportIngredients { file: PathBuf },
    /// Add a tag to the reference data
    CreateTag {
        #[arg(long)]
        name: String,
        #[arg(long)]
        color: String,
        #[arg(long)]
        slug: String,
    },
}

#[derive(Deserialize)]
struct IngredientRecord {
    name: String,
    measurement_unit: String,
}

/// Inserts every (name, unit) pair not already present. Returns how many
/// rows were added.
pub async fn import_ingredients(pool: &SqlitePool, file_path: &Path) -> Result<u64, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path)?;
    let records: Vec<IngredientRecord> = serde_json::from_str(&content)?;

    let mut imported = 0;
    let mut tx = pool.begin().await?;

    for record in records {
        let ingredient = Ingredient::new(&record.name, &record.measurement_unit);
        if ingredient.name.is_empty() || ingredient.measurement_unit.is_empty() {
            eprintln!("Skipping ingredient with empty name or unit");
            continue;
        }

        imported += sqlx::query(
            r#"
            INSERT INTO ingredients (id, name, measurement_unit, search_name)
            SELECT ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM ingredients WHERE name = ? AND measurement_unit = ?
            )
            "#,
        )
        .bind(&ingredient.id)
        .bind(&ingredient.name)
        .bind(&ingredient.measurement_unit)
        .bind(Ingredient::search_key(&ingredient.name))
        .bind(&ingredient.name)
        .bind(&ingredient.measurement_unit)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;
    println!("Imported {} ingredients", imported);
    Ok(imported)
}

pub async fn create_tag(pool: &SqlitePool, name: &str, color: &str, slug: &str) -> Result<Tag, Box<dyn std::error::Error>> {
    let tag = Tag::new(name, color, slug)?;

    sqlx::query("INSERT INTO tags (id, name, color, slug) VALUES (?, ?, ?, ?)")
        .bind(&tag.id)
        .bind(&tag.name)
        .bind(&tag.color)
        .bind(&tag.slug)
        .execute(pool)
        .await?;

    println!("Created tag:");
    println!("  ID: {}", tag.id);
    println!("  Name: {}", tag.name);
    println!("  Color: {}", tag.color);
    println!("  Slug: {}", tag.slug);

    Ok(tag)
}
