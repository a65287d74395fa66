//! # Database Module
//!
//! PostgreSQL persistence for saved recipes, generation audit records and
//! shopping lists. Every function takes the shared [`PgPool`] and returns
//! `anyhow::Result` with context on failure.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::{debug, info};

use crate::ingredient_categories::Category;
use crate::recipe_model::Recipe;
use crate::shopping_list::ShoppingListItem;

/// A recipe row; the structured recipe is stored as JSONB
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RecipeRecord {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub recipe: Json<Recipe>,
    pub created_at: DateTime<Utc>,
}

/// Raw text of one generation, kept for audit only
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct GenerationRecord {
    pub id: i64,
    pub user_id: i64,
    pub prompt: String,
    pub raw_response: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ShoppingListRecord {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ShoppingListItemRecord {
    pub id: i64,
    pub shopping_list_id: i64,
    pub name: String,
    pub quantity: String,
    pub category: String,
    pub source_recipe_id: Option<i64>,
    pub is_completed: bool,
}

impl ShoppingListItemRecord {
    /// Stored category, `Other` for unknown keys
    pub fn category(&self) -> Category {
        self.category.parse().unwrap_or(Category::Other)
    }

    pub fn to_item(&self) -> ShoppingListItem {
        ShoppingListItem {
            name: self.name.clone(),
            quantity: self.quantity.clone(),
            category: self.category(),
            source_recipe_id: self.source_recipe_id,
            is_completed: self.is_completed,
        }
    }
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipes (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            name TEXT NOT NULL,
            recipe JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create recipes table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS recipes_user_created_idx ON recipes (user_id, created_at)",
    )
    .execute(pool)
    .await
    .context("Failed to create recipes index")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS generations (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            prompt TEXT NOT NULL,
            raw_response TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create generations table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS shopping_lists (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create shopping_lists table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS shopping_list_items (
            id BIGSERIAL PRIMARY KEY,
            shopping_list_id BIGINT NOT NULL REFERENCES shopping_lists(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            quantity TEXT NOT NULL,
            category TEXT NOT NULL,
            source_recipe_id BIGINT REFERENCES recipes(id) ON DELETE SET NULL,
            is_completed BOOLEAN NOT NULL DEFAULT FALSE
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create shopping_list_items table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Save a recipe for a user, returning its ID
pub async fn create_recipe(pool: &PgPool, user_id: i64, recipe: &Recipe) -> Result<i64> {
    info!(user_id, recipe_name = %recipe.name, "Creating recipe");

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO recipes (user_id, name, recipe) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(recipe.name.trim())
    .bind(Json(recipe))
    .fetch_one(pool)
    .await
    .context("Failed to insert recipe")?;

    info!(recipe_id = id, "Recipe created");
    Ok(id)
}

/// Read a recipe by ID
pub async fn read_recipe(pool: &PgPool, recipe_id: i64) -> Result<Option<RecipeRecord>> {
    debug!(recipe_id, "Reading recipe");

    sqlx::query_as::<_, RecipeRecord>(
        "SELECT id, user_id, name, recipe, created_at FROM recipes WHERE id = $1",
    )
    .bind(recipe_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read recipe")
}

/// A user's recipes with the same name (case-insensitive) created since `since`, newest first
pub async fn recent_recipes_named(
    pool: &PgPool,
    user_id: i64,
    name: &str,
    since: DateTime<Utc>,
) -> Result<Vec<RecipeRecord>> {
    sqlx::query_as::<_, RecipeRecord>(
        "SELECT id, user_id, name, recipe, created_at FROM recipes
         WHERE user_id = $1 AND LOWER(name) = LOWER($2) AND created_at >= $3
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .bind(name.trim())
    .bind(since)
    .fetch_all(pool)
    .await
    .context("Failed to query recent recipes")
}

pub async fn count_user_recipes(pool: &PgPool, user_id: i64) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .context("Failed to count recipes")?;
    Ok(count)
}

/// Delete the user's oldest recipe, returning its ID if one existed
pub async fn delete_oldest_recipe(pool: &PgPool, user_id: i64) -> Result<Option<i64>> {
    let deleted: Option<(i64,)> = sqlx::query_as(
        "DELETE FROM recipes WHERE id = (
            SELECT id FROM recipes WHERE user_id = $1
            ORDER BY created_at ASC, id ASC LIMIT 1
        ) RETURNING id",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to delete oldest recipe")?;

    if let Some((id,)) = deleted {
        info!(user_id, recipe_id = id, "Deleted oldest recipe");
    }
    Ok(deleted.map(|(id,)| id))
}

pub async fn delete_recipe(pool: &PgPool, recipe_id: i64) -> Result<bool> {
    info!(recipe_id, "Deleting recipe");

    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(pool)
        .await
        .context("Failed to delete recipe")?;

    Ok(result.rows_affected() > 0)
}

/// Store the prompt and raw model text of a generation
pub async fn record_generation(
    pool: &PgPool,
    user_id: i64,
    prompt: &str,
    raw_response: &str,
) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO generations (user_id, prompt, raw_response) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(prompt)
    .bind(raw_response)
    .fetch_one(pool)
    .await
    .context("Failed to record generation")?;

    debug!(user_id, generation_id = id, "Generation recorded");
    Ok(id)
}

pub async fn read_generation(pool: &PgPool, generation_id: i64) -> Result<Option<GenerationRecord>> {
    sqlx::query_as::<_, GenerationRecord>(
        "SELECT id, user_id, prompt, raw_response, created_at FROM generations WHERE id = $1",
    )
    .bind(generation_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read generation")
}

/// Create an empty shopping list, returning its ID
pub async fn create_shopping_list(
    pool: &PgPool,
    user_id: i64,
    name: &str,
    description: Option<&str>,
) -> Result<i64> {
    info!(user_id, list_name = %name, "Creating shopping list");

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO shopping_lists (user_id, name, description) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await
    .context("Failed to insert shopping list")?;

    Ok(id)
}

pub async fn read_shopping_list(pool: &PgPool, list_id: i64) -> Result<Option<ShoppingListRecord>> {
    sqlx::query_as::<_, ShoppingListRecord>(
        "SELECT id, user_id, name, description, created_at FROM shopping_lists WHERE id = $1",
    )
    .bind(list_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read shopping list")
}

/// Insert items into a list in one transaction
pub async fn add_shopping_list_items(
    pool: &PgPool,
    list_id: i64,
    items: &[ShoppingListItem],
) -> Result<usize> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    for item in items {
        sqlx::query(
            "INSERT INTO shopping_list_items
                (shopping_list_id, name, quantity, category, source_recipe_id, is_completed)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(list_id)
        .bind(&item.name)
        .bind(&item.quantity)
        .bind(item.category.key())
        .bind(item.source_recipe_id)
        .bind(item.is_completed)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert shopping list item '{}'", item.name))?;
    }

    tx.commit().await.context("Failed to commit shopping list items")?;

    info!(list_id, item_count = items.len(), "Shopping list items added");
    Ok(items.len())
}

/// Items of a list, ordered by category then name
pub async fn read_shopping_list_items(
    pool: &PgPool,
    list_id: i64,
) -> Result<Vec<ShoppingListItemRecord>> {
    sqlx::query_as::<_, ShoppingListItemRecord>(
        "SELECT id, shopping_list_id, name, quantity, category, source_recipe_id, is_completed
         FROM shopping_list_items
         WHERE shopping_list_id = $1
         ORDER BY category ASC, name ASC",
    )
    .bind(list_id)
    .fetch_all(pool)
    .await
    .context("Failed to read shopping list items")
}

/// Tick or untick an item
pub async fn set_item_completed(pool: &PgPool, item_id: i64, completed: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE shopping_list_items SET is_completed = $1 WHERE id = $2")
        .bind(completed)
        .bind(item_id)
        .execute(pool)
        .await
        .context("Failed to update shopping list item")?;

    Ok(result.rows_affected() > 0)
}

/// A user's shopping lists, newest first
pub async fn list_user_shopping_lists(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<ShoppingListRecord>> {
    sqlx::query_as::<_, ShoppingListRecord>(
        "SELECT id, user_id, name, description, created_at FROM shopping_lists
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list shopping lists")
}
