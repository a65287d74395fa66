//! # Command Line Interface
//!
//! Argument parsing and command execution for the `smart-recipe` binary.
//! Rendering is kept separate from printing so commands can be exercised
//! without a terminal.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPool;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::db;
use crate::localization::LocalizationManager;
use crate::recipe_model::Recipe;
use crate::recipe_service::{CannedResponse, RecipeService, SaveOutcome};
use crate::response_normalizer::{NormalizeOutcome, ResponseNormalizer};
use crate::shopping_list::{group_by_category, ServingMultiplier, ShoppingListComposer, ShoppingListItem};

#[derive(Parser, Debug)]
#[command(name = "smart-recipe")]
#[command(about = "Structure model-generated recipes and build shopping lists", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Language for messages (overrides APP_LOCALE)
    #[arg(long, global = true)]
    pub locale: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Structure a saved model response and print the recipe
    Normalize {
        /// File holding the raw model response
        file: PathBuf,

        /// Print the recipe as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the shopping list for a saved model response
    ShoppingList {
        file: PathBuf,

        /// Serving multiplier applied to quantities
        #[arg(long, default_value_t = 1.0)]
        servings: f64,
    },

    /// Save a model response as a recipe with its shopping list (needs DATABASE_URL)
    Import {
        file: PathBuf,

        #[arg(long)]
        user_id: i64,

        #[arg(long, default_value_t = 1.0)]
        servings: f64,

        /// Shopping list name instead of the default
        #[arg(long)]
        list_name: Option<String>,
    },
}

/// Read a raw model response from disk
pub fn read_response(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read response file {}", path.display()))
}

/// Render a normalization outcome for the terminal
pub fn render_outcome(
    outcome: &NormalizeOutcome,
    localization: &LocalizationManager,
    language: &str,
    json: bool,
) -> Result<String> {
    match outcome {
        NormalizeOutcome::Success(structured) | NormalizeOutcome::Incomplete(structured) => {
            let mut rendered = if json {
                serde_json::to_string_pretty(&structured.recipe)
                    .context("Failed to serialize recipe")?
            } else {
                structured.recipe.to_string()
            };
            if !structured.missing.is_empty() && !json {
                let fields = structured
                    .missing
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                rendered.push_str(&localization.get_message_with_args(
                    "validation-recipe-incomplete",
                    language,
                    &[("fields", fields.as_str())],
                ));
            }
            Ok(rendered)
        }
        NormalizeOutcome::Failed(failure) => Ok(format!(
            "{}\n\n{}",
            localization.get_message_in_language("parse-failure-notice", language, None),
            failure.cleaned_text
        )),
    }
}

/// Render items grouped under localized category headings
pub fn render_shopping_list(
    items: &[ShoppingListItem],
    localization: &LocalizationManager,
    language: &str,
) -> String {
    let mut rendered = String::new();
    for group in group_by_category(items) {
        rendered.push_str(&localization.category_label(group.category, language));
        rendered.push('\n');
        for item in &group.items {
            let mark = if item.is_completed { "x" } else { " " };
            if item.quantity.is_empty() {
                rendered.push_str(&format!("  [{}] {}\n", mark, item.name));
            } else {
                rendered.push_str(&format!("  [{}] {} ({})\n", mark, item.name, item.quantity));
            }
        }
    }
    rendered
}

/// Structure the response in `path` and compose its shopping list
pub fn shopping_list_from_file(
    path: &Path,
    multiplier: ServingMultiplier,
    normalizer: &ResponseNormalizer,
    composer: &ShoppingListComposer,
) -> Result<(Recipe, Vec<ShoppingListItem>)> {
    let raw = read_response(path)?;
    let structured = normalizer
        .normalize(&raw)
        .into_result()
        .with_context(|| format!("No recipe found in {}", path.display()))?;
    structured.recipe.require_complete()?;

    let items = composer.compose(&structured.recipe.ingredients, multiplier);
    Ok((structured.recipe, items))
}

/// Execute a parsed command line
pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let localization = Arc::new(LocalizationManager::new()?);
    let language = cli.locale.clone().unwrap_or_else(|| config.locale.clone());

    match cli.command {
        Commands::Normalize { file, json } => {
            let raw = read_response(&file)?;
            let outcome = ResponseNormalizer::new().normalize(&raw);
            println!("{}", render_outcome(&outcome, &localization, &language, json)?);
        }
        Commands::ShoppingList { file, servings } => {
            let multiplier = parse_servings(servings, &localization, &language)?;
            let (recipe, items) = shopping_list_from_file(
                &file,
                multiplier,
                &ResponseNormalizer::new(),
                &ShoppingListComposer::new(),
            )?;
            println!("{}\n", recipe.name);
            print!("{}", render_shopping_list(&items, &localization, &language));
        }
        Commands::Import {
            file,
            user_id,
            servings,
            list_name,
        } => {
            let multiplier = parse_servings(servings, &localization, &language)?;
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow!("DATABASE_URL must be set to import recipes"))?;

            let pool = PgPool::connect(database_url)
                .await
                .context("Failed to connect to database")?;
            db::init_database_schema(&pool).await?;

            let raw = read_response(&file)?;
            let mut service_config = config.clone();
            service_config.locale = language.clone();
            let service = RecipeService::from_config(
                CannedResponse::new(raw.clone()),
                &service_config,
                Arc::clone(&localization),
            );

            let prompt = format!("import {}", file.display());
            db::record_generation(&pool, user_id, &prompt, &raw).await?;

            let output = service.structure_response(prompt, raw);
            let Some(recipe) = output.recipe() else {
                println!(
                    "{}\n\n{}",
                    output.notice.as_deref().unwrap_or_default(),
                    output.fallback_text().unwrap_or_default()
                );
                return Ok(());
            };

            let saved = service
                .save_recipe(&pool, user_id, recipe)
                .await
                .map_err(|e| {
                    let message = service.user_message(&e);
                    anyhow::Error::new(e).context(message)
                })?;
            let message_key = match saved {
                SaveOutcome::Saved { .. } => "recipe-saved",
                SaveOutcome::Duplicate { .. } => "recipe-duplicate",
            };
            println!("{}", localization.get_message_in_language(message_key, &language, None));

            let list = service
                .create_shopping_list(&pool, user_id, saved.recipe_id(), list_name.as_deref(), multiplier)
                .await
                .map_err(|e| {
                    let message = service.user_message(&e);
                    anyhow::Error::new(e).context(message)
                })?;
            info!(list_id = list.list_id, "Import finished");

            println!(
                "{}",
                localization.get_message_with_args(
                    "shopping-list-created",
                    &language,
                    &[
                        ("list_name", list.name.as_str()),
                        ("item_count", list.items.len().to_string().as_str()),
                    ],
                )
            );
            print!("{}", render_shopping_list(&list.items, &localization, &language));
        }
    }

    Ok(())
}

fn parse_servings(
    servings: f64,
    localization: &LocalizationManager,
    language: &str,
) -> Result<ServingMultiplier> {
    ServingMultiplier::new(servings).with_context(|| {
        localization.get_message_in_language("validation-invalid-servings", language, None)
    })
}
