//! # Structured Recipe Data Model
//!
//! This module defines the structured recipe produced once a model response has
//! been normalized, along with the completeness rules applied before a recipe
//! is saved, shared, or turned into a shopping list.
//!
//! ## Core Concepts
//!
//! - **Recipe**: name, ingredient list, ordered instructions, dietary tags and
//!   free-form additional information
//! - **RecipeIngredient**: a name with a free-form quantity string ("2 cups", "1", "to taste")
//! - **RecipeField**: the fields checked for completeness
//!
//! ## Usage
//!
//! ```rust
//! use smart_recipe::recipe_model::{Recipe, RecipeIngredient};
//!
//! let soup = Recipe::new("Onion Soup")
//!     .with_ingredient(RecipeIngredient::new("onion", "3"))
//!     .with_instruction("Slice the onions.")
//!     .with_dietary_tag("vegetarian");
//!
//! assert!(soup.require_complete().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::errors::RecipeValidationError;

/// A single ingredient line of a structured recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    /// The ingredient name (e.g., "chicken breast", "洋蔥")
    pub name: String,

    /// Free-form quantity text, never parsed into a number and unit pair
    #[serde(default)]
    pub quantity: String,
}

/// A recipe after normalization of the raw model response
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,

    /// One entry per step, in order
    #[serde(default)]
    pub instructions: Vec<String>,

    /// Dietary tags such as "vegan" or "gluten-free"
    #[serde(default)]
    pub dietary_preference: BTreeSet<String>,

    /// Tips, variations, serving suggestions, nutrition notes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_information: BTreeMap<String, String>,
}

/// Recipe fields that take part in completeness checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeField {
    Name,
    Ingredients,
    Instructions,
}

impl RecipeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeField::Name => "name",
            RecipeField::Ingredients => "ingredients",
            RecipeField::Instructions => "instructions",
        }
    }
}

impl RecipeIngredient {
    pub fn new(name: &str, quantity: &str) -> Self {
        Self {
            name: name.to_string(),
            quantity: quantity.to_string(),
        }
    }

    /// Build an ingredient from a loosely shaped JSON value.
    ///
    /// Objects need a non-empty `name`; numeric quantities are rendered as
    /// text. A bare string is taken as a name without quantity.
    fn from_json_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(obj) => {
                let name = obj.get("name").and_then(Value::as_str)?.trim();
                if name.is_empty() {
                    return None;
                }
                let quantity = obj.get("quantity").map(value_to_text).unwrap_or_default();
                Some(Self::new(name, quantity.trim()))
            }
            Value::String(s) if !s.trim().is_empty() => Some(Self::new(s.trim(), "")),
            _ => None,
        }
    }
}

impl Recipe {
    /// Create a recipe with just a name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_ingredient(mut self, ingredient: RecipeIngredient) -> Self {
        self.ingredients.push(ingredient);
        self
    }

    pub fn with_instruction(mut self, step: &str) -> Self {
        self.instructions.push(step.to_string());
        self
    }

    pub fn with_dietary_tag(mut self, tag: &str) -> Self {
        self.dietary_preference.insert(tag.to_string());
        self
    }

    pub fn with_information(mut self, key: &str, value: &str) -> Self {
        self.additional_information
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Extract a recipe from a decoded JSON object without failing on shape.
    ///
    /// Missing or wrongly typed fields become empty values so the caller can
    /// report them through [`Recipe::missing_fields`] instead of discarding
    /// the whole response.
    pub fn from_json_object(obj: &Map<String, Value>) -> Self {
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let ingredients = match obj.get("ingredients") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(RecipeIngredient::from_json_value)
                .collect(),
            _ => Vec::new(),
        };

        let instructions = match obj.get("instructions") {
            Some(Value::Array(steps)) => steps
                .iter()
                .filter_map(|step| match step {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(text)) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        let dietary_preference = match obj.get("dietaryPreference") {
            Some(Value::Array(tags)) => tags
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(tag)) if !tag.trim().is_empty() => {
                BTreeSet::from([tag.trim().to_string()])
            }
            _ => BTreeSet::new(),
        };

        let additional_information = match obj.get("additionalInformation") {
            Some(Value::Object(info)) => info
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), value_to_text(v)))
                .collect(),
            _ => BTreeMap::new(),
        };

        Self {
            name,
            ingredients,
            instructions,
            dietary_preference,
            additional_information,
        }
    }

    /// Every field that is empty, including instructions
    pub fn missing_fields(&self) -> Vec<RecipeField> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push(RecipeField::Name);
        }
        if self.ingredients.is_empty() {
            missing.push(RecipeField::Ingredients);
        }
        if self.instructions.is_empty() {
            missing.push(RecipeField::Instructions);
        }
        missing
    }

    /// Gate for save, share and shopping-list generation.
    ///
    /// Only name and ingredients are required; a recipe without instructions
    /// passes but is reported as incomplete by the normalizer.
    pub fn require_complete(&self) -> Result<(), RecipeValidationError> {
        let missing: Vec<RecipeField> = self
            .missing_fields()
            .into_iter()
            .filter(|f| *f != RecipeField::Instructions)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RecipeValidationError::Incomplete { missing })
        }
    }

    /// Lower-cased, trimmed ingredient names in recipe order
    pub fn ingredient_names(&self) -> Vec<String> {
        self.ingredients
            .iter()
            .map(|i| i.name.trim().to_lowercase())
            .collect()
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl fmt::Display for RecipeIngredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quantity.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {}", self.quantity, self.name)
        }
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;

        if !self.dietary_preference.is_empty() {
            let tags: Vec<&str> = self.dietary_preference.iter().map(String::as_str).collect();
            writeln!(f, "[{}]", tags.join(", "))?;
        }

        writeln!(f, "Ingredients:")?;
        for ingredient in &self.ingredients {
            writeln!(f, "  • {}", ingredient)?;
        }

        if !self.instructions.is_empty() {
            writeln!(f, "Instructions:")?;
            for (i, step) in self.instructions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, step)?;
            }
        }

        for (key, value) in &self.additional_information {
            writeln!(f, "{}: {}", key, value)?;
        }

        Ok(())
    }
}
