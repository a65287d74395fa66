//! # Localization Module
//!
//! User-facing messages in English and Traditional Chinese, backed by Fluent
//! resources embedded at compile time. Unknown languages and missing keys fall
//! back to English.

use anyhow::{anyhow, Context, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::Arc;
use unic_langid::LanguageIdentifier;

use crate::ingredient_categories::Category;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const SUPPORTED_LANGUAGES: [&str; 2] = ["en", "zh-TW"];

const EN_MESSAGES: &str = include_str!("../locales/en/main.ftl");
const ZH_TW_MESSAGES: &str = include_str!("../locales/zh-TW/main.ftl");

type Bundle = FluentBundle<FluentResource>;

/// Localization manager holding one bundle per supported language
pub struct LocalizationManager {
    bundles: HashMap<String, Arc<Bundle>>,
}

impl std::fmt::Debug for LocalizationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut languages: Vec<&String> = self.bundles.keys().collect();
        languages.sort();
        f.debug_struct("LocalizationManager")
            .field("languages", &languages)
            .finish()
    }
}

impl LocalizationManager {
    /// Create a new localization manager with all embedded languages loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for (language, source) in [("en", EN_MESSAGES), ("zh-TW", ZH_TW_MESSAGES)] {
            let bundle = Self::create_bundle(language, source)
                .with_context(|| format!("Failed to load messages for {}", language))?;
            bundles.insert(language.to_string(), Arc::new(bundle));
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(language: &str, source: &str) -> Result<Bundle> {
        let locale: LanguageIdentifier = language.parse()?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // keep placeholders free of bidi isolation marks
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Invalid Fluent resource: {:?}", errors))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Conflicting Fluent messages: {:?}", errors))?;

        Ok(bundle)
    }

    /// Whether `language` has its own bundle
    pub fn is_language_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }

    /// Map a requested language tag to a supported one.
    ///
    /// Exact tags win, then tags sharing the primary language subtag
    /// ("zh-Hant" → "zh-TW", "en-GB" → "en"); anything else is English.
    pub fn resolve_language(&self, requested: &str) -> &'static str {
        if let Some(exact) = SUPPORTED_LANGUAGES
            .iter()
            .copied()
            .find(|l| l.eq_ignore_ascii_case(requested.trim()))
        {
            return exact;
        }

        let Ok(requested) = requested.trim().parse::<LanguageIdentifier>() else {
            return DEFAULT_LANGUAGE;
        };
        SUPPORTED_LANGUAGES
            .iter()
            .find(|supported| {
                supported
                    .parse::<LanguageIdentifier>()
                    .map(|id| id.language == requested.language)
                    .unwrap_or(false)
            })
            .copied()
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Get a localized message in English
    pub fn get_message(&self, key: &str, args: Option<&HashMap<&str, &str>>) -> String {
        self.get_message_in_language(key, DEFAULT_LANGUAGE, args)
    }

    /// Get a localized message, falling back to English for unknown
    /// languages and keys missing from the requested language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let language = self.resolve_language(language);
        let candidates = [language, DEFAULT_LANGUAGE];

        for bundle in candidates.iter().filter_map(|l| self.bundles.get(*l)) {
            if let Some(value) = Self::format(bundle, key, args) {
                return value;
            }
        }
        format!("Missing translation: {}", key)
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(&self, key: &str, language: &str, args: &[(&str, &str)]) -> String {
        let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
        self.get_message_in_language(key, language, Some(&args_map))
    }

    /// Display label of a shopping-list category
    pub fn category_label(&self, category: Category, language: &str) -> String {
        self.get_message_in_language(&format!("category-{}", category.key()), language, None)
    }

    fn format(bundle: &Bundle, key: &str, args: Option<&HashMap<&str, &str>>) -> Option<String> {
        let pattern = bundle.get_message(key)?.value()?;

        let fluent_args = args.map(|args| {
            FluentArgs::from_iter(args.iter().map(|(k, v)| (*k, FluentValue::from(*v))))
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        Some(value.into_owned())
    }
}
