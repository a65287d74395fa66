//! # Recipe Service
//!
//! Request handling around the two pure components: rate limiting and input
//! validation before text generation, normalization of the model response,
//! the completeness gate and duplicate guard on save, and shopping-list
//! creation from a stored recipe.
//!
//! The text-generation backend is abstracted behind [`TextGenerator`]; no
//! concrete model client lives in this crate.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use smart_recipe::localization::LocalizationManager;
//! use smart_recipe::recipe_model::RecipeIngredient;
//! use smart_recipe::recipe_service::{CannedResponse, GenerationRequest, RecipeService};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let generator = CannedResponse::new(r#"{"name":"Soup","ingredients":[{"name":"onion","quantity":"1"}],"instructions":["Chop."]}"#);
//! let service = RecipeService::new(generator, Arc::new(LocalizationManager::new()?));
//!
//! let request = GenerationRequest::new(vec![RecipeIngredient::new("onion", "1")]);
//! let output = service.generate(42, &request).await?;
//! assert_eq!(output.recipe().map(|r| r.name.as_str()), Some("Soup"));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, DEFAULT_LOCALE, DEFAULT_MAX_RECIPES_PER_USER};
use crate::db;
use crate::duplicate_guard::DuplicatePolicy;
use crate::errors::{RateLimitError, RecipeValidationError, ServiceError};
use crate::localization::LocalizationManager;
use crate::rate_limiter::{InMemoryCounterStore, RateLimiter};
use crate::recipe_model::{Recipe, RecipeIngredient};
use crate::response_normalizer::{NormalizeOutcome, ResponseNormalizer};
use crate::shopping_list::{format_amount, ServingMultiplier, ShoppingListComposer, ShoppingListItem};

pub const GENERATE_ROUTE: &str = "recipes/generate";

/// Opaque text-generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce a free-text answer for `prompt`
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Generator that always answers with the same text, for replaying stored
/// responses
#[derive(Debug, Clone)]
pub struct CannedResponse {
    response: String,
}

impl CannedResponse {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for CannedResponse {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(self.response.clone())
    }
}

/// Ingredients and dietary preferences submitted for generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default)]
    pub dietary_preferences: Vec<String>,
}

/// A rejected generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestIssue {
    NoIngredients,
    /// 1-based position of the first ingredient missing a name or quantity
    IncompleteIngredient(usize),
}

impl GenerationRequest {
    pub fn new(ingredients: Vec<RecipeIngredient>) -> Self {
        Self {
            ingredients,
            dietary_preferences: Vec::new(),
        }
    }

    pub fn with_dietary_preference(mut self, preference: &str) -> Self {
        self.dietary_preferences.push(preference.to_string());
        self
    }

    /// At least one ingredient, each with a non-blank name and quantity
    pub fn validate(&self) -> Result<(), RequestIssue> {
        if self.ingredients.is_empty() {
            return Err(RequestIssue::NoIngredients);
        }
        match self
            .ingredients
            .iter()
            .position(|i| i.name.trim().is_empty() || i.quantity.trim().is_empty())
        {
            Some(index) => Err(RequestIssue::IncompleteIngredient(index + 1)),
            None => Ok(()),
        }
    }

    /// Prompt text sent to the generator
    pub fn prompt(&self) -> String {
        let mut prompt = String::from("Create a recipe using these ingredients:\n");
        for ingredient in &self.ingredients {
            prompt.push_str(&format!("- {}: {}\n", ingredient.name.trim(), ingredient.quantity.trim()));
        }
        if !self.dietary_preferences.is_empty() {
            prompt.push_str(&format!(
                "Dietary preferences: {}\n",
                self.dietary_preferences.join(", ")
            ));
        }
        prompt.push_str(
            "Answer with a single JSON object with the keys \"name\", \"ingredients\" \
             (objects with \"name\" and \"quantity\"), \"instructions\" (one string per step), \
             \"dietaryPreference\" and \"additionalInformation\".",
        );
        prompt
    }
}

/// Generation result; a structuring failure is reported here, not as an error
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    pub prompt: String,
    pub raw_response: String,
    pub outcome: NormalizeOutcome,
    /// Localized notice shown with the raw text when structuring failed
    pub notice: Option<String>,
}

impl GenerationOutput {
    pub fn recipe(&self) -> Option<&Recipe> {
        self.outcome.recipe()
    }

    /// Text to show when no recipe could be extracted
    pub fn fallback_text(&self) -> Option<&str> {
        match &self.outcome {
            NormalizeOutcome::Failed(failure) => Some(&failure.cleaned_text),
            _ => None,
        }
    }
}

/// Result of a save request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { recipe_id: i64 },
    /// A near-identical recipe was saved recently; nothing was written
    Duplicate { existing_id: i64 },
}

impl SaveOutcome {
    pub fn recipe_id(&self) -> i64 {
        match self {
            SaveOutcome::Saved { recipe_id } => *recipe_id,
            SaveOutcome::Duplicate { existing_id } => *existing_id,
        }
    }
}

/// A persisted shopping list and the items written to it
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedShoppingList {
    pub list_id: i64,
    pub name: String,
    pub description: String,
    pub items: Vec<ShoppingListItem>,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub locale: String,
    pub max_recipes_per_user: i64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            max_recipes_per_user: DEFAULT_MAX_RECIPES_PER_USER,
        }
    }
}

/// Recipe generation, saving and shopping-list creation
pub struct RecipeService<G> {
    generator: G,
    normalizer: ResponseNormalizer,
    composer: ShoppingListComposer,
    rate_limiter: RateLimiter,
    duplicate_policy: DuplicatePolicy,
    localization: Arc<LocalizationManager>,
    settings: ServiceSettings,
}

impl<G: TextGenerator> RecipeService<G> {
    /// Service with default components and settings
    pub fn new(generator: G, localization: Arc<LocalizationManager>) -> Self {
        Self {
            generator,
            normalizer: ResponseNormalizer::new(),
            composer: ShoppingListComposer::new(),
            rate_limiter: RateLimiter::in_memory(),
            duplicate_policy: DuplicatePolicy::default(),
            localization,
            settings: ServiceSettings::default(),
        }
    }

    /// Service configured from [`AppConfig`], with an in-memory rate limiter
    pub fn from_config(
        generator: G,
        config: &AppConfig,
        localization: Arc<LocalizationManager>,
    ) -> Self {
        let rate_limiter = RateLimiter::new(
            Arc::new(InMemoryCounterStore::new()),
            config.rate_limit.max_requests,
            config.rate_limit.window(),
        );
        Self::new(generator, localization)
            .with_rate_limiter(rate_limiter)
            .with_duplicate_policy(config.duplicate_policy)
            .with_settings(ServiceSettings {
                locale: config.locale.clone(),
                max_recipes_per_user: config.max_recipes_per_user,
            })
    }

    pub fn with_normalizer(mut self, normalizer: ResponseNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_composer(mut self, composer: ShoppingListComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_settings(mut self, settings: ServiceSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn composer(&self) -> &ShoppingListComposer {
        &self.composer
    }

    /// Generate and structure a recipe for `user_id`
    pub async fn generate(
        &self,
        user_id: i64,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, ServiceError> {
        self.rate_limiter
            .check(&user_id.to_string(), GENERATE_ROUTE)?;

        request
            .validate()
            .map_err(|issue| ServiceError::Validation(self.request_issue_message(issue)))?;

        let prompt = request.prompt();
        info!(
            user_id,
            ingredients_count = request.ingredients.len(),
            "Generating recipe"
        );

        let raw_response = self
            .generator
            .generate(&prompt)
            .await
            .map_err(ServiceError::Generation)?;

        Ok(self.structure_response(prompt, raw_response))
    }

    /// Normalize a raw response that was already obtained
    pub fn structure_response(&self, prompt: String, raw_response: String) -> GenerationOutput {
        let outcome = self.normalizer.normalize(&raw_response);

        let notice = match &outcome {
            NormalizeOutcome::Success(structured) => {
                debug!(step = ?structured.step, "Model response structured");
                None
            }
            NormalizeOutcome::Incomplete(structured) => {
                warn!(step = ?structured.step, missing = ?structured.missing, "Model response structured but incomplete");
                None
            }
            NormalizeOutcome::Failed(failure) => {
                warn!(attempts = failure.attempts, "Could not structure model response");
                Some(self.message("parse-failure-notice", &[]))
            }
        };

        GenerationOutput {
            prompt,
            raw_response,
            outcome,
            notice,
        }
    }

    /// Save a complete recipe unless a near-duplicate was saved recently
    pub async fn save_recipe(
        &self,
        pool: &PgPool,
        user_id: i64,
        recipe: &Recipe,
    ) -> Result<SaveOutcome, ServiceError> {
        recipe.require_complete()?;

        let now = Utc::now();
        let recent = db::recent_recipes_named(
            pool,
            user_id,
            &recipe.name,
            self.duplicate_policy.window_start(now),
        )
        .await
        .map_err(ServiceError::Database)?;

        if let Some(existing) = recent.iter().find(|record| {
            self.duplicate_policy
                .is_near_duplicate(recipe, &record.recipe.0, record.created_at, now)
        }) {
            info!(user_id, existing_id = existing.id, "Duplicate recipe detected");
            return Ok(SaveOutcome::Duplicate {
                existing_id: existing.id,
            });
        }

        let count = db::count_user_recipes(pool, user_id)
            .await
            .map_err(ServiceError::Database)?;
        if count >= self.settings.max_recipes_per_user {
            db::delete_oldest_recipe(pool, user_id)
                .await
                .map_err(ServiceError::Database)?;
        }

        let recipe_id = db::create_recipe(pool, user_id, recipe)
            .await
            .map_err(ServiceError::Database)?;
        Ok(SaveOutcome::Saved { recipe_id })
    }

    /// Build and persist a new shopping list from a stored recipe
    pub async fn create_shopping_list(
        &self,
        pool: &PgPool,
        user_id: i64,
        recipe_id: i64,
        name: Option<&str>,
        multiplier: ServingMultiplier,
    ) -> Result<CreatedShoppingList, ServiceError> {
        let record = db::read_recipe(pool, recipe_id)
            .await
            .map_err(ServiceError::Database)?
            .ok_or_else(|| {
                ServiceError::NotFound(self.message(
                    "recipe-not-found",
                    &[("recipe_id", recipe_id.to_string().as_str())],
                ))
            })?;
        let recipe = record.recipe.0;
        recipe.require_complete()?;

        let items = self.composer.compose_for_recipe(recipe_id, &recipe, multiplier);

        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => self.default_list_name(&recipe.name),
        };
        let description = self.default_list_description(&recipe.name, multiplier);

        let list_id = db::create_shopping_list(pool, user_id, &name, Some(&description))
            .await
            .map_err(ServiceError::Database)?;
        db::add_shopping_list_items(pool, list_id, &items)
            .await
            .map_err(ServiceError::Database)?;

        info!(user_id, recipe_id, list_id, item_count = items.len(), "Shopping list created");

        Ok(CreatedShoppingList {
            list_id,
            name,
            description,
            items,
        })
    }

    pub fn default_list_name(&self, recipe_name: &str) -> String {
        self.message("shopping-list-default-name", &[("recipe_name", recipe_name)])
    }

    pub fn default_list_description(&self, recipe_name: &str, multiplier: ServingMultiplier) -> String {
        if multiplier.get() > 1.0 {
            let servings = format_amount(multiplier.get());
            self.message(
                "shopping-list-default-description-servings",
                &[("recipe_name", recipe_name), ("servings", servings.as_str())],
            )
        } else {
            self.message("shopping-list-default-description", &[("recipe_name", recipe_name)])
        }
    }

    /// Localized message for showing a service error to the user
    pub fn user_message(&self, error: &ServiceError) -> String {
        match error {
            ServiceError::Validation(message) | ServiceError::NotFound(message) => message.clone(),
            ServiceError::Incomplete(RecipeValidationError::Incomplete { missing }) => {
                let fields = missing
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.message("validation-recipe-incomplete", &[("fields", fields.as_str())])
            }
            ServiceError::InvalidMultiplier(_) => self.message("validation-invalid-servings", &[]),
            ServiceError::RateLimited(RateLimitError::Exceeded { retry_after_secs }) => self.message(
                "rate-limited",
                &[("seconds", retry_after_secs.to_string().as_str())],
            ),
            ServiceError::RateLimited(RateLimitError::Store(_))
            | ServiceError::Generation(_)
            | ServiceError::Database(_) => self.message("generation-failed", &[]),
        }
    }

    fn request_issue_message(&self, issue: RequestIssue) -> String {
        match issue {
            RequestIssue::NoIngredients => self.message("validation-no-ingredients", &[]),
            RequestIssue::IncompleteIngredient(index) => self.message(
                "validation-ingredient-incomplete",
                &[("index", index.to_string().as_str())],
            ),
        }
    }

    fn message(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.localization
            .get_message_with_args(key, &self.settings.locale, args)
    }
}
