//! # Localization Tests
//!
//! This module contains unit tests for the localization functionality,
//! testing message retrieval and formatting with various edge cases.

use smart_recipe::ingredient_categories::Category;
use smart_recipe::localization::{LocalizationManager, SUPPORTED_LANGUAGES};
use std::collections::HashMap;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        // Create a new localization manager for each test
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    #[test]
    fn test_get_message_existing_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("validation-no-ingredients", "en", None);
        assert_eq!(message, "Please provide at least one ingredient.");
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("nonexistent-key", "en", None);
        assert!(message.starts_with("Missing translation:"));
        let message = manager.get_message_in_language("nonexistent-key", "zh-TW", None);
        assert_eq!(message, "Missing translation: nonexistent-key");
    }

    #[test]
    fn test_get_message_unsupported_language() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("generation-failed", "unsupported", None);
        // Should fall back to English
        assert_eq!(message, "Recipe generation failed. Please try again later.");
    }

    #[test]
    fn test_get_message_with_args() {
        let manager = setup_localization();

        let mut args = HashMap::new();
        args.insert("list_name", "Dinner");
        args.insert("item_count", "5");

        let message = manager.get_message_in_language("shopping-list-created", "en", Some(&args));
        assert_eq!(message, "Shopping list \"Dinner\" created with 5 items.");

        let message = manager.get_message_with_args(
            "shopping-list-created",
            "zh-TW",
            &[("list_name", "晚餐"), ("item_count", "5")],
        );
        assert_eq!(message, "已建立購物清單「晚餐」，共 5 項。");
    }

    #[test]
    fn test_get_message_missing_args() {
        let manager = setup_localization();

        // Missing arguments still produce a message
        let message = manager.get_message_in_language("rate-limited", "en", None);
        assert!(!message.is_empty());
        assert!(message.starts_with("Too many requests."));
    }

    #[test]
    fn test_traditional_chinese_localization() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("parse-failure-notice", "zh-TW", None);
        assert!(!message.is_empty());
        // Chinese message should be different from English
        let english_message = manager.get_message_in_language("parse-failure-notice", "en", None);
        assert_ne!(message, english_message);
    }

    #[test]
    fn test_regional_tags_resolve_to_supported_language() {
        let manager = setup_localization();

        assert_eq!(manager.resolve_language("zh-tw"), "zh-TW");
        assert_eq!(manager.resolve_language("zh-Hant"), "zh-TW");
        assert_eq!(manager.resolve_language("en-GB"), "en");
        assert_eq!(manager.resolve_language("fr"), "en");

        let message = manager.get_message_in_language("category-meat", "zh-Hant", None);
        assert_eq!(message, "肉類");
    }

    #[test]
    fn test_every_category_has_a_label_in_every_language() {
        let manager = setup_localization();

        for language in SUPPORTED_LANGUAGES {
            assert!(manager.is_language_supported(language));
            for category in Category::ALL {
                let label = manager.category_label(category, language);
                assert!(
                    !label.starts_with("Missing translation"),
                    "no {} label for {}",
                    language,
                    category
                );
            }
        }
        assert_eq!(manager.category_label(Category::Seasoning, "zh-TW"), "調味料");
        assert_eq!(manager.category_label(Category::Seasoning, "en"), "Seasoning");
    }

    #[test]
    fn test_all_message_keys_exist_in_both_languages() {
        let manager = setup_localization();

        let keys = [
            "parse-failure-notice",
            "generation-failed",
            "rate-limited",
            "validation-no-ingredients",
            "validation-ingredient-incomplete",
            "validation-recipe-incomplete",
            "validation-invalid-servings",
            "recipe-saved",
            "recipe-duplicate",
            "recipe-not-found",
            "shopping-list-default-name",
            "shopping-list-default-description",
            "shopping-list-default-description-servings",
            "shopping-list-created",
        ];

        for key in keys {
            let english = manager.get_message_in_language(key, "en", None);
            let chinese = manager.get_message_in_language(key, "zh-TW", None);
            assert!(!english.starts_with("Missing translation"), "missing en: {}", key);
            assert_ne!(english, chinese, "zh-TW falls back for {}", key);
        }
    }
}
