//! # Error Types Module
//!
//! This module defines the error types shared by the recipe pipeline: the
//! structural parse failure returned by the response normalizer, the soft
//! validation failure for incomplete recipes, multiplier validation, rate
//! limiting, and the service-level error that wraps them all.

use thiserror::Error;

use crate::recipe_model::RecipeField;

/// Every fallback step of the normalizer was exhausted without producing a
/// JSON object.
///
/// This is not fatal for the surrounding request: the text generation itself
/// succeeded, so callers show `cleaned_text` with a notice instead.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("could not structure model response after {attempts} decode attempts")]
pub struct ParseFailure {
    /// The response with reasoning blocks and code fences removed
    pub cleaned_text: String,
    /// Number of decode attempts made across all fallback steps
    pub attempts: usize,
}

/// Soft validation failure for a recipe that parsed but lacks required data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecipeValidationError {
    #[error("recipe is incomplete, missing: {}", format_fields(.missing))]
    Incomplete { missing: Vec<RecipeField> },
}

fn format_fields(fields: &[RecipeField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A serving multiplier that is zero, negative, or not a finite number.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("serving multiplier must be a positive number, got {0}")]
pub struct InvalidMultiplier(pub f64);

/// Errors raised by the rate limiter and its counter stores
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateLimitError {
    #[error("too many requests, retry after {retry_after_secs}s")]
    Exceeded { retry_after_secs: u64 },

    #[error("counter store unavailable: {0}")]
    Store(String),
}

/// A configuration variable that is set but unusable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Errors surfaced by [`crate::recipe_service::RecipeService`]
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Incomplete(#[from] RecipeValidationError),

    #[error(transparent)]
    InvalidMultiplier(#[from] InvalidMultiplier),

    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    #[error("text generation failed: {0}")]
    Generation(#[source] anyhow::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[source] anyhow::Error),
}
