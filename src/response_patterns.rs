//! # Response Patterns Module
//!
//! Regex patterns used by the response normalizer to clean and repair model output.

use lazy_static::lazy_static;
use regex::Regex;

// Reasoning blocks emitted before the answer, e.g. <think>...</think>
pub const DEFAULT_REASONING_TAGS: [&str; 3] = ["think", "thinking", "reasoning"];

// Labels models put in front of the object, e.g. "Recipe: {...}"
pub const DEFAULT_LABEL_PREFIXES: [&str; 2] = ["recipe", "json"];

pub const FENCE_PATTERN: &str = r"```(?:json|JSON)?\s*";
pub const FENCED_BLOCK_PATTERN: &str = r"(?s)```(?:json|JSON)?\s*(.*?)```";
pub const GREEDY_OBJECT_PATTERN: &str = r"(?s)\{.*\}";
pub const TRAILING_COMMA_PATTERN: &str = r",(\s*[}\]])";
pub const BARE_KEY_PATTERN: &str = r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:";
pub const SINGLE_QUOTED_VALUE_PATTERN: &str = r"([:\[,]\s*)'([^']*)'";
pub const MARKUP_TAG_PATTERN: &str = r"<[^>]*>";

lazy_static! {
    pub static ref FENCE_REGEX: Regex =
        Regex::new(FENCE_PATTERN).expect("Fence pattern should be valid");
    pub static ref FENCED_BLOCK_REGEX: Regex =
        Regex::new(FENCED_BLOCK_PATTERN).expect("Fenced block pattern should be valid");
    pub static ref GREEDY_OBJECT_REGEX: Regex =
        Regex::new(GREEDY_OBJECT_PATTERN).expect("Greedy object pattern should be valid");
    pub static ref TRAILING_COMMA_REGEX: Regex =
        Regex::new(TRAILING_COMMA_PATTERN).expect("Trailing comma pattern should be valid");
    pub static ref BARE_KEY_REGEX: Regex =
        Regex::new(BARE_KEY_PATTERN).expect("Bare key pattern should be valid");
    pub static ref SINGLE_QUOTED_VALUE_REGEX: Regex = Regex::new(SINGLE_QUOTED_VALUE_PATTERN)
        .expect("Single quoted value pattern should be valid");
    pub static ref MARKUP_TAG_REGEX: Regex =
        Regex::new(MARKUP_TAG_PATTERN).expect("Markup tag pattern should be valid");
    pub static ref DEFAULT_REASONING_REGEX: Regex =
        Regex::new(&reasoning_block_pattern(&owned_strings(&DEFAULT_REASONING_TAGS)))
            .expect("Default reasoning pattern should be valid");
    pub static ref DEFAULT_LABEL_REGEX: Regex =
        Regex::new(&label_prefix_pattern(&owned_strings(&DEFAULT_LABEL_PREFIXES)))
            .expect("Default label pattern should be valid");
}

pub fn owned_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Build the pattern removing `<tag>...</tag>` blocks for each reasoning tag.
/// The closing tag must match the opening one.
pub fn reasoning_block_pattern(tags: &[String]) -> String {
    let branches = tags
        .iter()
        .map(|t| {
            let tag = regex::escape(t);
            format!(r"<{tag}>.*?</{tag}>")
        })
        .collect::<Vec<_>>()
        .join("|");
    format!(r"(?is){branches}")
}

/// Build the pattern locating a label such as `recipe:` right before an object
pub fn label_prefix_pattern(labels: &[String]) -> String {
    let alternation = labels
        .iter()
        .map(|l| regex::escape(l))
        .collect::<Vec<_>>()
        .join("|");
    format!(r"(?i)\b(?:{alternation})\s*:\s*\{{")
}
