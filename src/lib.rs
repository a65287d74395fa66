//! # Smart Recipe
//!
//! Turns free-text recipe answers from a language model into structured
//! recipes, and structured recipes into categorized, scaled shopping lists.
//! Around those two pure components sit the request-handling pieces: rate
//! limiting, duplicate detection on save, PostgreSQL persistence and
//! localized messages.

pub mod cli;
pub mod config;
pub mod db;
pub mod duplicate_guard;
pub mod errors;
pub mod ingredient_categories;
pub mod localization;
pub mod rate_limiter;
pub mod recipe_model;
pub mod recipe_service;
pub mod response_normalizer;
pub mod response_patterns;
pub mod shopping_list;
