//! # Response Normalizer Module
//!
//! This module turns the free text returned by the text-generation service into
//! a structured [`Recipe`]. Models do not reliably answer with bare JSON, so the
//! normalizer runs an ordered chain of decode attempts, from strict and cheap to
//! lenient and expensive, and stops at the first one that yields a JSON object.
//!
//! ## Fallback chain
//!
//! 1. Decode the whole response as JSON
//! 2. Remove reasoning blocks (`<think>...</think>`) and code fences, decode again
//! 3. Extract candidates from the cleaned text: fenced block, label-prefixed
//!    object (`Recipe: {...}`), top-level balanced `{...}` spans, greedy `{...}`
//! 4. Repair the cleaned text (trailing commas, bare keys, single-quoted values,
//!    newlines) and decode the outermost `{...}` span
//! 5. Strip all markup tags from the raw response, trim to the outer braces,
//!    remove trailing commas and decode
//!
//! A decoded object missing its name or ingredients is still a successful
//! parse; it is reported as [`NormalizeOutcome::Incomplete`] and no later step
//! is tried. Every function here is pure and never logs.
//!
//! ## Usage
//!
//! ```rust
//! use smart_recipe::response_normalizer::{normalize, NormalizeOutcome};
//!
//! let raw = "Sure!\n```json\n{\"name\":\"Soup\",\"ingredients\":[{\"name\":\"onion\",\"quantity\":\"1\"}],\"instructions\":[\"Chop.\"]}\n```";
//! match normalize(raw) {
//!     NormalizeOutcome::Success(structured) => assert_eq!(structured.recipe.name, "Soup"),
//!     other => panic!("unexpected outcome: {:?}", other),
//! }
//! ```

use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::ParseFailure;
use crate::recipe_model::{Recipe, RecipeField};
use crate::response_patterns::{
    label_prefix_pattern, owned_strings, reasoning_block_pattern, BARE_KEY_REGEX,
    DEFAULT_LABEL_PREFIXES, DEFAULT_LABEL_REGEX, DEFAULT_REASONING_REGEX, DEFAULT_REASONING_TAGS,
    FENCED_BLOCK_REGEX, FENCE_REGEX, GREEDY_OBJECT_REGEX, MARKUP_TAG_REGEX,
    SINGLE_QUOTED_VALUE_REGEX, TRAILING_COMMA_REGEX,
};

/// The fallback step that produced the decoded object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeStep {
    Direct,
    Cleaned,
    FencedBlock,
    LabeledObject,
    BalancedSpan,
    /// First `{` to last `}` of the cleaned text. A span that decodes is also
    /// the first balanced span, so [`BalancedSpan`](Self::BalancedSpan) is
    /// reported for it and the default chain never yields this step.
    GreedySpan,
    Repaired,
    LastResort,
}

/// A recipe extracted from a model response
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRecipe {
    pub recipe: Recipe,
    pub step: NormalizeStep,
    /// Empty fields found after decoding
    pub missing: Vec<RecipeField>,
}

/// Result of normalizing one raw model response
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    /// All fields present
    Success(StructuredRecipe),
    /// Decoded, but name, ingredients or instructions are empty
    Incomplete(StructuredRecipe),
    /// No fallback step produced a JSON object
    Failed(ParseFailure),
}

impl NormalizeOutcome {
    pub fn recipe(&self) -> Option<&Recipe> {
        match self {
            NormalizeOutcome::Success(s) | NormalizeOutcome::Incomplete(s) => Some(&s.recipe),
            NormalizeOutcome::Failed(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NormalizeOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<StructuredRecipe, ParseFailure> {
        match self {
            NormalizeOutcome::Success(s) | NormalizeOutcome::Incomplete(s) => Ok(s),
            NormalizeOutcome::Failed(failure) => Err(failure),
        }
    }
}

/// Configuration options for response normalization
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Tag names whose `<tag>...</tag>` blocks are removed before extraction
    pub reasoning_tags: Vec<String>,
    /// Labels that may precede the JSON object (`recipe: {...}`)
    pub label_prefixes: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            reasoning_tags: owned_strings(&DEFAULT_REASONING_TAGS),
            label_prefixes: owned_strings(&DEFAULT_LABEL_PREFIXES),
        }
    }
}

/// Converts raw model responses into structured recipes
#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    reasoning: Option<Regex>,
    label: Option<Regex>,
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseNormalizer {
    /// Create a normalizer with the default reasoning tags and labels
    pub fn new() -> Self {
        Self {
            reasoning: Some(DEFAULT_REASONING_REGEX.clone()),
            label: Some(DEFAULT_LABEL_REGEX.clone()),
        }
    }

    /// Create a normalizer with custom reasoning tags and labels
    ///
    /// # Examples
    ///
    /// ```rust
    /// use smart_recipe::response_normalizer::{NormalizerConfig, ResponseNormalizer};
    ///
    /// let config = NormalizerConfig {
    ///     reasoning_tags: vec!["scratchpad".to_string()],
    ///     ..Default::default()
    /// };
    /// let normalizer = ResponseNormalizer::with_config(config)?;
    /// # Ok::<(), regex::Error>(())
    /// ```
    pub fn with_config(config: NormalizerConfig) -> Result<Self, regex::Error> {
        let reasoning = if config.reasoning_tags.is_empty() {
            None
        } else {
            Some(Regex::new(&reasoning_block_pattern(&config.reasoning_tags))?)
        };
        let label = if config.label_prefixes.is_empty() {
            None
        } else {
            Some(Regex::new(&label_prefix_pattern(&config.label_prefixes))?)
        };
        Ok(Self { reasoning, label })
    }

    /// Run the fallback chain over a raw model response
    pub fn normalize(&self, raw: &str) -> NormalizeOutcome {
        let mut attempts = 0;

        if let Some(obj) = attempt(raw, &mut attempts) {
            return outcome(&obj, NormalizeStep::Direct);
        }

        let without_reasoning = self.strip_reasoning(raw);
        let cleaned = strip_fences(&without_reasoning).trim().to_string();
        if let Some(obj) = attempt(&cleaned, &mut attempts) {
            return outcome(&obj, NormalizeStep::Cleaned);
        }

        // Fences are gone from `cleaned`, so look for them before removal
        for caps in FENCED_BLOCK_REGEX.captures_iter(&without_reasoning) {
            if let Some(obj) = attempt(&caps[1], &mut attempts) {
                return outcome(&obj, NormalizeStep::FencedBlock);
            }
        }

        for candidate in self.labeled_objects(&cleaned) {
            if let Some(obj) = attempt(candidate, &mut attempts) {
                return outcome(&obj, NormalizeStep::LabeledObject);
            }
        }

        for span in balanced_object_spans(&cleaned) {
            if let Some(obj) = attempt(span, &mut attempts) {
                return outcome(&obj, NormalizeStep::BalancedSpan);
            }
        }

        if let Some(span) = greedy_object_span(&cleaned) {
            if let Some(obj) = attempt(span, &mut attempts) {
                return outcome(&obj, NormalizeStep::GreedySpan);
            }
        }

        let repaired = repair_json(&cleaned);
        if let Some(span) = greedy_object_span(&repaired) {
            if let Some(obj) = attempt(span, &mut attempts) {
                return outcome(&obj, NormalizeStep::Repaired);
            }
        }

        if let Some(text) = last_resort_text(raw) {
            if let Some(obj) = attempt(&text, &mut attempts) {
                return outcome(&obj, NormalizeStep::LastResort);
            }
        }

        NormalizeOutcome::Failed(ParseFailure {
            cleaned_text: cleaned,
            attempts,
        })
    }

    /// Remove reasoning blocks such as `<think>...</think>`
    pub fn strip_reasoning(&self, text: &str) -> String {
        match &self.reasoning {
            Some(re) => re.replace_all(text, "").into_owned(),
            None => text.to_string(),
        }
    }

    /// Remove reasoning blocks and code fences
    pub fn clean_response(&self, raw: &str) -> String {
        strip_fences(&self.strip_reasoning(raw)).trim().to_string()
    }

    /// Objects introduced by a label such as `Recipe:`
    fn labeled_objects<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let Some(label) = &self.label else {
            return Vec::new();
        };
        label
            .find_iter(text)
            // the match ends on the opening brace
            .filter_map(|m| balanced_object_spans(&text[m.end() - 1..]).into_iter().next())
            .collect()
    }
}

/// Normalize a raw response with the default configuration
pub fn normalize(raw: &str) -> NormalizeOutcome {
    ResponseNormalizer::new().normalize(raw)
}

/// Decode `text` and keep the result only when it is a JSON object
pub fn decode_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn attempt(text: &str, attempts: &mut usize) -> Option<Map<String, Value>> {
    *attempts += 1;
    decode_object(text)
}

fn outcome(obj: &Map<String, Value>, step: NormalizeStep) -> NormalizeOutcome {
    let recipe = Recipe::from_json_object(obj);
    let missing = recipe.missing_fields();
    let structured = StructuredRecipe {
        recipe,
        step,
        missing,
    };
    if structured.missing.is_empty() {
        NormalizeOutcome::Success(structured)
    } else {
        NormalizeOutcome::Incomplete(structured)
    }
}

/// Remove markdown code fence markers, keeping their content
pub fn strip_fences(text: &str) -> String {
    FENCE_REGEX.replace_all(text, "").into_owned()
}

/// Top-level balanced `{...}` spans in order of appearance.
///
/// Braces inside double-quoted strings are ignored. An opening brace that is
/// never closed yields no span.
pub fn balanced_object_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    spans
}

/// Everything from the first `{` to the last `}`
pub fn greedy_object_span(text: &str) -> Option<&str> {
    GREEDY_OBJECT_REGEX.find(text).map(|m| m.as_str())
}

/// Apply syntactic repairs for common model mistakes.
///
/// Trailing commas, bare keys and single-quoted values are only rewritten
/// outside double-quoted strings. Newlines become spaces everywhere, which
/// also repairs raw newlines inside string values.
pub fn repair_json(text: &str) -> String {
    let repaired = map_outside_strings(text, |segment| {
        let segment = TRAILING_COMMA_REGEX.replace_all(segment, "$1");
        let segment = BARE_KEY_REGEX.replace_all(&segment, "$1\"$2\":");
        SINGLE_QUOTED_VALUE_REGEX
            .replace_all(&segment, "$1\"$2\"")
            .into_owned()
    });
    repaired.replace(['\r', '\n'], " ").trim().to_string()
}

/// Aggressive cleanup of the raw response, or `None` without any braces
pub fn last_resort_text(raw: &str) -> Option<String> {
    let stripped = MARKUP_TAG_REGEX.replace_all(raw, "");
    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end < start {
        return None;
    }
    let trimmed = &stripped[start..=end];
    Some(TRAILING_COMMA_REGEX.replace_all(trimmed, "$1").trim().to_string())
}

fn map_outside_strings<F>(text: &str, f: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut segment_start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                out.push_str(&text[segment_start..=i]);
                segment_start = i + 1;
            }
        } else if c == '"' {
            out.push_str(&f(&text[segment_start..i]));
            segment_start = i;
            in_string = true;
        }
    }

    let tail = &text[segment_start..];
    if in_string {
        out.push_str(tail);
    } else {
        out.push_str(&f(tail));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe_model::RecipeIngredient;

    const SOUP: &str = r#"{"name":"Soup","ingredients":[{"name":"onion","quantity":"1"}],"instructions":["Chop."]}"#;

    fn soup() -> Recipe {
        Recipe::new("Soup")
            .with_ingredient(RecipeIngredient::new("onion", "1"))
            .with_instruction("Chop.")
    }

    fn expect_success(outcome: NormalizeOutcome, step: NormalizeStep) -> Recipe {
        match outcome {
            NormalizeOutcome::Success(s) => {
                assert_eq!(s.step, step);
                s.recipe
            }
            other => panic!("expected success at {:?}, got {:?}", step, other),
        }
    }

    #[test]
    fn test_direct_decode() {
        let recipe = expect_success(normalize(SOUP), NormalizeStep::Direct);
        assert_eq!(recipe, soup());
    }

    #[test]
    fn test_reasoning_block_removed() {
        let raw = format!("<think>The user wants {{soup}}.</think>\n{}", SOUP);
        let recipe = expect_success(normalize(&raw), NormalizeStep::Cleaned);
        assert_eq!(recipe, soup());
    }

    #[test]
    fn test_fenced_block_with_prose() {
        let raw = format!("Here it is:\n```json\n{}\n```\nEnjoy!", SOUP);
        let recipe = expect_success(normalize(&raw), NormalizeStep::FencedBlock);
        assert_eq!(recipe, soup());
    }

    #[test]
    fn test_labeled_object() {
        let raw = format!("Recipe: {} -- let me know what you think", SOUP);
        let recipe = expect_success(normalize(&raw), NormalizeStep::LabeledObject);
        assert_eq!(recipe, soup());
    }

    #[test]
    fn test_balanced_span_skips_prose_braces() {
        let raw = format!("Use {{your favourite}} pot. {} Bon appetit", SOUP);
        let recipe = expect_success(normalize(&raw), NormalizeStep::BalancedSpan);
        assert_eq!(recipe, soup());
    }

    #[test]
    fn test_repaired_trailing_commas_and_bare_keys() {
        let raw = "{name: 'Soup', ingredients: [{name: 'onion', quantity: '1',},], instructions: ['Chop.',],}";
        let recipe = expect_success(normalize(raw), NormalizeStep::Repaired);
        assert_eq!(recipe, soup());
    }

    #[test]
    fn test_last_resort_strips_markup_from_raw_text() {
        let raw = r#"{"name":"Soup",<br>"ingredients":[{"name":"onion","quantity":"1"}],"instructions":["Chop."]}"#;
        let recipe = expect_success(normalize(raw), NormalizeStep::LastResort);
        assert_eq!(recipe, soup());
    }

    #[test]
    fn test_greedy_object_span() {
        assert_eq!(
            greedy_object_span("see {\"a\": 1} and {\"b\": 2} ok"),
            Some("{\"a\": 1} and {\"b\": 2}")
        );
        assert_eq!(greedy_object_span("{unclosed"), None);
        assert_eq!(greedy_object_span("no braces"), None);

        // a greedy span that decodes is the first balanced span
        let text = format!("Sure! {} Enjoy.", SOUP);
        let greedy = greedy_object_span(&text).unwrap();
        assert!(decode_object(greedy).is_some());
        assert_eq!(balanced_object_spans(&text)[0], greedy);
        expect_success(normalize(&text), NormalizeStep::BalancedSpan);
    }

    #[test]
    fn test_incomplete_does_not_fall_through() {
        let outcome = normalize(r#"{"title":"Soup","ingredients":[]}"#);
        match outcome {
            NormalizeOutcome::Incomplete(s) => {
                assert_eq!(s.step, NormalizeStep::Direct);
                assert_eq!(
                    s.missing,
                    vec![
                        RecipeField::Name,
                        RecipeField::Ingredients,
                        RecipeField::Instructions
                    ]
                );
            }
            other => panic!("expected incomplete, got {:?}", other),
        }
    }

    #[test]
    fn test_non_object_json_is_failure() {
        assert!(matches!(normalize("[1, 2, 3]"), NormalizeOutcome::Failed(_)));
        assert!(matches!(normalize("\"just a string\""), NormalizeOutcome::Failed(_)));
    }

    #[test]
    fn test_failure_carries_cleaned_text() {
        match normalize("<think>hmm</think>I cannot help with that.") {
            NormalizeOutcome::Failed(failure) => {
                assert_eq!(failure.cleaned_text, "I cannot help with that.");
                assert!(failure.attempts >= 2);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_balanced_object_spans() {
        let text = r#"a {"x": "}"} b {"y": {"z": 1}} c {unclosed"#;
        assert_eq!(
            balanced_object_spans(text),
            vec![r#"{"x": "}"}"#, r#"{"y": {"z": 1}}"#]
        );
        assert!(balanced_object_spans("no braces").is_empty());
    }

    #[test]
    fn test_repair_json_leaves_strings_alone() {
        let repaired = repair_json("{\"step\": \"Mix well, then: stir,]\", note: 'ok',}");
        assert_eq!(
            repaired,
            "{\"step\": \"Mix well, then: stir,]\", \"note\": \"ok\"}"
        );
    }

    #[test]
    fn test_last_resort_text() {
        assert_eq!(
            last_resort_text("<p>{\"a\": [1,],}</p> trailing"),
            Some("{\"a\": [1]}".to_string())
        );
        assert_eq!(last_resort_text("no json here"), None);
        assert_eq!(last_resort_text("} backwards {"), None);
    }

    #[test]
    fn test_reasoning_tags_must_match() {
        let normalizer = ResponseNormalizer::new();
        assert_eq!(normalizer.strip_reasoning("<think>a</thinking>x"), "<think>a</thinking>x");
        assert_eq!(normalizer.strip_reasoning("<thinking>a</think>x"), "<thinking>a</think>x");
        assert_eq!(normalizer.strip_reasoning("<think>a</think>x"), "x");
        assert_eq!(
            normalizer.strip_reasoning("<Reasoning>\nb\n</REASONING>x<thinking>c</thinking>"),
            "x"
        );
    }

    #[test]
    fn test_custom_reasoning_tags() {
        let normalizer = ResponseNormalizer::with_config(NormalizerConfig {
            reasoning_tags: vec!["scratchpad".to_string()],
            label_prefixes: Vec::new(),
        })
        .unwrap();
        let raw = format!("<scratchpad>{{draft}}</scratchpad>{}", SOUP);
        assert_eq!(normalizer.clean_response(&raw), SOUP);
        assert!(normalizer.normalize(&raw).is_success());
    }
}
