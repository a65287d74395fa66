//! # Response Normalizer Tests
//!
//! End-to-end behavior of the fallback chain on realistic model answers.

use smart_recipe::recipe_model::{Recipe, RecipeField, RecipeIngredient};
use smart_recipe::response_normalizer::{
    normalize, NormalizeOutcome, NormalizeStep, NormalizerConfig, ResponseNormalizer,
};

const CURRY: &str = r#"{
  "name": "Vegetable Curry",
  "ingredients": [
    {"name": "potato", "quantity": "2"},
    {"name": "carrot", "quantity": "1"},
    {"name": "coconut milk", "quantity": "400 ml"}
  ],
  "instructions": ["Dice the vegetables.", "Simmer in coconut milk for 20 minutes."],
  "dietaryPreference": ["vegan", "gluten-free"],
  "additionalInformation": {"tips": "Add chili for heat", "servings": "4"}
}"#;

fn structured(outcome: NormalizeOutcome) -> (Recipe, NormalizeStep) {
    match outcome {
        NormalizeOutcome::Success(s) => (s.recipe, s.step),
        other => panic!("expected a complete recipe, got {:?}", other),
    }
}

#[test]
fn test_valid_json_parses_on_first_step() {
    let expected: Recipe = serde_json::from_str(CURRY).unwrap();
    let (recipe, step) = structured(normalize(CURRY));

    assert_eq!(step, NormalizeStep::Direct);
    assert_eq!(recipe, expected);
    assert!(recipe.dietary_preference.contains("gluten-free"));
    assert_eq!(recipe.additional_information["servings"], "4");
}

#[test]
fn test_wrapped_json_matches_bare_json() {
    let (bare, _) = structured(normalize(CURRY));

    let wrapped = [
        format!("```json\n{}\n```", CURRY),
        format!("<think>They want something vegan.\nCurry works.</think>\n{}", CURRY),
        format!(
            "<think>plan: curry</think>Sure! Here is a recipe you can try:\n```json\n{}\n```\nEnjoy your meal!",
            CURRY
        ),
        format!("Here is the recipe: {} Let me know if you need changes.", CURRY),
    ];

    for raw in wrapped {
        let (recipe, step) = structured(normalize(&raw));
        assert_eq!(recipe, bare, "input: {}", raw);
        assert_ne!(step, NormalizeStep::Direct);
    }
}

#[test]
fn test_trailing_commas_are_tolerated() {
    let raw = r#"{"name": "Salad", "ingredients": [{"name": "lettuce", "quantity": "1 head",}, {"name": "olive oil", "quantity": "2 tbsp",},], "instructions": ["Wash.", "Toss.",],}"#;
    let (recipe, _) = structured(normalize(raw));

    assert_eq!(
        recipe,
        Recipe::new("Salad")
            .with_ingredient(RecipeIngredient::new("lettuce", "1 head"))
            .with_ingredient(RecipeIngredient::new("olive oil", "2 tbsp"))
            .with_instruction("Wash.")
            .with_instruction("Toss.")
    );
}

#[test]
fn test_text_without_braces_fails() {
    for raw in [
        "I cannot help with that.",
        "",
        "Ingredients: onion, garlic. Steps: [chop, fry]",
        "[1, 2, 3]",
        "\"just a string\"",
    ] {
        match normalize(raw) {
            NormalizeOutcome::Failed(failure) => assert!(failure.attempts >= 1),
            other => panic!("expected failure for {:?}, got {:?}", raw, other),
        }
    }
}

#[test]
fn test_fenced_soup_with_trailing_commas() {
    let raw = "Here's your recipe:\n```json\n{\"name\":\"Soup\",\"ingredients\":[{\"name\":\"onion\",\"quantity\":\"1\",}],\"instructions\":[\"Chop.\",]}\n```";
    let (recipe, _) = structured(normalize(raw));

    assert_eq!(
        recipe,
        Recipe::new("Soup")
            .with_ingredient(RecipeIngredient::new("onion", "1"))
            .with_instruction("Chop.")
    );
}

#[test]
fn test_refusal_is_failure_with_cleaned_text() {
    match normalize("I cannot help with that.") {
        NormalizeOutcome::Failed(failure) => {
            assert_eq!(failure.cleaned_text, "I cannot help with that.");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn test_missing_ingredients_is_incomplete_not_failure() {
    let raw = "```json\n{\"name\": \"Mystery Dish\", \"instructions\": [\"Improvise.\"]}\n```";
    match normalize(raw) {
        NormalizeOutcome::Incomplete(s) => {
            assert_eq!(s.recipe.name, "Mystery Dish");
            assert_eq!(s.missing, vec![RecipeField::Ingredients]);
            assert!(s.recipe.require_complete().is_err());
        }
        other => panic!("expected incomplete recipe, got {:?}", other),
    }
}

#[test]
fn test_missing_instructions_still_passes_gate() {
    let raw = r#"{"name": "Toast", "ingredients": [{"name": "bread", "quantity": "2 slices"}]}"#;
    let outcome = normalize(raw);

    assert!(!outcome.is_success());
    let recipe = outcome.recipe().unwrap();
    assert!(recipe.require_complete().is_ok());
}

#[test]
fn test_chinese_recipe_in_reasoning_model_output() {
    let raw = "<think>使用者有雞胸肉和青椒，可以做青椒炒雞丁。</think>\n\n```json\n{\"name\": \"青椒炒雞丁\", \"ingredients\": [{\"name\": \"雞胸肉\", \"quantity\": \"300克\"}, {\"name\": \"青椒\", \"quantity\": \"2個\"}], \"instructions\": [\"雞肉切丁\", \"大火快炒\"], \"dietaryPreference\": []}\n```";
    let (recipe, _) = structured(normalize(raw));

    assert_eq!(recipe.name, "青椒炒雞丁");
    assert_eq!(recipe.ingredients[0], RecipeIngredient::new("雞胸肉", "300克"));
    assert_eq!(recipe.instructions.len(), 2);
}

#[test]
fn test_normalizer_is_deterministic_and_reusable() {
    let normalizer = ResponseNormalizer::with_config(NormalizerConfig::default()).unwrap();
    let raw = format!("Recipe: {}", CURRY);

    let first = normalizer.normalize(&raw);
    let second = normalizer.normalize(&raw);
    assert_eq!(first, second);
}
