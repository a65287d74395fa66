//! # Integration Tests
//!
//! Recipe service flow without a database: rate limiting, request
//! validation, text generation and response structuring, plus the localized
//! messages shown to users.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;

use smart_recipe::errors::{RateLimitError, RecipeValidationError, ServiceError};
use smart_recipe::localization::LocalizationManager;
use smart_recipe::rate_limiter::{InMemoryCounterStore, RateLimiter};
use smart_recipe::recipe_model::{RecipeField, RecipeIngredient};
use smart_recipe::recipe_service::{
    CannedResponse, GenerationRequest, RecipeService, ServiceSettings, TextGenerator,
};
use smart_recipe::response_normalizer::{NormalizeOutcome, NormalizeStep};
use smart_recipe::shopping_list::ServingMultiplier;

const OMELETTE_RESPONSE: &str = "<think>Eggs and onion: an omelette.</think>\n```json\n{\"name\": \"Onion Omelette\", \"ingredients\": [{\"name\": \"egg\", \"quantity\": \"3\"}, {\"name\": \"onion\", \"quantity\": \"1/2\"}], \"instructions\": [\"Beat the eggs.\", \"Fry with the onion.\"], \"dietaryPreference\": [\"vegetarian\"]}\n```";

struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        Err(anyhow!("upstream timed out"))
    }
}

fn localization() -> Arc<LocalizationManager> {
    Arc::new(LocalizationManager::new().expect("Failed to create LocalizationManager"))
}

fn eggs_and_onion() -> GenerationRequest {
    GenerationRequest::new(vec![
        RecipeIngredient::new("egg", "3"),
        RecipeIngredient::new("onion", "1"),
    ])
}

fn in_language<G: TextGenerator>(service: RecipeService<G>, locale: &str) -> RecipeService<G> {
    service.with_settings(ServiceSettings {
        locale: locale.to_string(),
        ..ServiceSettings::default()
    })
}

#[tokio::test]
async fn test_generate_structures_model_response() {
    let service = RecipeService::new(CannedResponse::new(OMELETTE_RESPONSE), localization());

    let output = service.generate(1, &eggs_and_onion()).await.unwrap();

    assert!(output.notice.is_none());
    assert!(output.fallback_text().is_none());
    assert!(output.prompt.contains("- egg: 3"));
    assert_eq!(output.raw_response, OMELETTE_RESPONSE);

    let recipe = output.recipe().unwrap();
    assert_eq!(recipe.name, "Onion Omelette");
    assert_eq!(recipe.ingredients.len(), 2);
    assert!(recipe.dietary_preference.contains("vegetarian"));
    match &output.outcome {
        NormalizeOutcome::Success(structured) => assert_eq!(structured.step, NormalizeStep::Cleaned),
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unparseable_response_is_not_an_error() {
    let service = RecipeService::new(
        CannedResponse::new("Sorry, I can only talk about the weather."),
        localization(),
    );

    let output = service.generate(1, &eggs_and_onion()).await.unwrap();

    assert!(output.recipe().is_none());
    assert_eq!(
        output.fallback_text(),
        Some("Sorry, I can only talk about the weather.")
    );
    assert_eq!(
        output.notice.as_deref(),
        Some("We could not structure this response. Showing the original text instead.")
    );
}

#[tokio::test]
async fn test_incomplete_response_has_no_notice() {
    let service = RecipeService::new(
        CannedResponse::new(r#"{"name": "Plain Rice", "ingredients": [{"name": "rice", "quantity": "1 cup"}]}"#),
        localization(),
    );

    let output = service.generate(1, &eggs_and_onion()).await.unwrap();

    assert!(output.notice.is_none());
    match &output.outcome {
        NormalizeOutcome::Incomplete(structured) => {
            assert_eq!(structured.missing, vec![RecipeField::Instructions]);
        }
        other => panic!("expected incomplete recipe, got {:?}", other),
    }
}

#[tokio::test]
async fn test_request_validation_messages() {
    let service = RecipeService::new(CannedResponse::new(OMELETTE_RESPONSE), localization());

    match service.generate(1, &GenerationRequest::default()).await {
        Err(ServiceError::Validation(message)) => {
            assert_eq!(message, "Please provide at least one ingredient.");
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    let request = GenerationRequest::new(vec![
        RecipeIngredient::new("egg", "3"),
        RecipeIngredient::new("", "1"),
    ]);
    match service.generate(1, &request).await {
        Err(ServiceError::Validation(message)) => {
            assert_eq!(message, "Ingredient 2 needs both a name and a quantity.");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_validation_messages_follow_locale() {
    let service = in_language(
        RecipeService::new(CannedResponse::new(OMELETTE_RESPONSE), localization()),
        "zh-TW",
    );

    match service.generate(1, &GenerationRequest::default()).await {
        Err(ServiceError::Validation(message)) => assert_eq!(message, "請至少提供一項食材。"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generation_is_rate_limited_per_user() {
    let limiter = RateLimiter::new(Arc::new(InMemoryCounterStore::new()), 1, Duration::seconds(60));
    let service = RecipeService::new(CannedResponse::new(OMELETTE_RESPONSE), localization())
        .with_rate_limiter(limiter);

    assert!(service.generate(1, &eggs_and_onion()).await.is_ok());

    let error = service.generate(1, &eggs_and_onion()).await.unwrap_err();
    match &error {
        ServiceError::RateLimited(RateLimitError::Exceeded { retry_after_secs }) => {
            assert!(*retry_after_secs > 0 && *retry_after_secs <= 60);
        }
        other => panic!("expected rate limit error, got {:?}", other),
    }
    assert!(service
        .user_message(&error)
        .starts_with("Too many requests. Please try again in"));

    // other users have their own window
    assert!(service.generate(2, &eggs_and_onion()).await.is_ok());
}

#[tokio::test]
async fn test_generator_failure_is_reported() {
    let service = RecipeService::new(FailingGenerator, localization());

    let error = service.generate(1, &eggs_and_onion()).await.unwrap_err();
    assert!(matches!(error, ServiceError::Generation(_)));
    assert_eq!(
        service.user_message(&error),
        "Recipe generation failed. Please try again later."
    );
}

#[test]
fn test_user_messages_for_domain_errors() {
    let service = RecipeService::new(CannedResponse::new(""), localization());

    let incomplete = ServiceError::Incomplete(RecipeValidationError::Incomplete {
        missing: vec![RecipeField::Name, RecipeField::Ingredients],
    });
    assert_eq!(
        service.user_message(&incomplete),
        "This recipe is missing: name, ingredients."
    );

    let invalid = ServiceError::from(ServingMultiplier::new(0.0).unwrap_err());
    assert_eq!(
        service.user_message(&invalid),
        "Servings must be a positive number."
    );

    let not_found = ServiceError::NotFound("Recipe 9 was not found.".to_string());
    assert_eq!(service.user_message(&not_found), "Recipe 9 was not found.");
}

#[test]
fn test_default_shopping_list_texts() {
    let english = RecipeService::new(CannedResponse::new(""), localization());
    assert_eq!(english.default_list_name("Curry"), "Curry - Shopping List");
    assert_eq!(
        english.default_list_description("Curry", ServingMultiplier::default()),
        "Generated from the recipe \"Curry\""
    );
    assert_eq!(
        english.default_list_description("Curry", ServingMultiplier::new(2.5).unwrap()),
        "Generated from the recipe \"Curry\" (2.5 servings)"
    );

    let chinese = in_language(
        RecipeService::new(CannedResponse::new(""), localization()),
        "zh-TW",
    );
    assert_eq!(chinese.default_list_name("紅燒肉"), "紅燒肉 - 購物清單");
    assert_eq!(
        chinese.default_list_description("紅燒肉", ServingMultiplier::new(3.0).unwrap()),
        "從食譜「紅燒肉」自動生成 (3人份)"
    );
    // a half batch keeps the plain description
    assert_eq!(
        chinese.default_list_description("紅燒肉", ServingMultiplier::new(0.5).unwrap()),
        "從食譜「紅燒肉」自動生成"
    );
}
