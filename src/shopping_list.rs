//! # Shopping List Composer
//!
//! Turns a recipe's ingredient list into shopping-list items: each ingredient
//! gets a shelf category and a quantity scaled by the serving multiplier.
//! Items come out grouped by category, in the order categories first appear
//! in the recipe, keeping ingredient order inside each group.
//!
//! Quantity scaling is cosmetic: the first number in the quantity text is
//! multiplied and written back in place ("2 cups" × 1.5 → "3 cups"), while
//! quantities without a number ("to taste", "a pinch") pass through.
//!
//! ## Usage
//!
//! ```rust
//! use smart_recipe::recipe_model::RecipeIngredient;
//! use smart_recipe::shopping_list::{ServingMultiplier, ShoppingListComposer};
//!
//! let composer = ShoppingListComposer::new();
//! let items = composer.compose(
//!     &[RecipeIngredient::new("chicken breast", "2")],
//!     ServingMultiplier::new(2.0)?,
//! );
//! assert_eq!(items[0].quantity, "4");
//! # Ok::<(), smart_recipe::errors::InvalidMultiplier>(())
//! ```

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::errors::InvalidMultiplier;
use crate::ingredient_categories::{Category, CategoryRules};
use crate::recipe_model::{Recipe, RecipeIngredient};

// Mixed number ("1 1/2"), simple fraction ("3/4"), then integer or decimal.
// ASCII digits only; full-width digits are folded before matching.
const QUANTITY_NUMBER_PATTERN: &str =
    r"([0-9]+)\s+([0-9]+)/([0-9]+)|([0-9]+)/([0-9]+)|([0-9]+(?:\.[0-9]+)?)";

// Amounts at or above this are printed as computed
const MAX_ROUNDED_AMOUNT: f64 = 1e15;

lazy_static! {
    static ref QUANTITY_NUMBER_REGEX: Regex =
        Regex::new(QUANTITY_NUMBER_PATTERN).expect("Quantity number pattern should be valid");
}

/// A validated, strictly positive serving multiplier
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ServingMultiplier(f64);

impl ServingMultiplier {
    pub fn new(value: f64) -> Result<Self, InvalidMultiplier> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(InvalidMultiplier(value))
        }
    }

    pub fn get(&self) -> f64 {
        self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0 == 1.0
    }
}

impl Default for ServingMultiplier {
    fn default() -> Self {
        Self(1.0)
    }
}

impl TryFrom<f64> for ServingMultiplier {
    type Error = InvalidMultiplier;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// One line of a shopping list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListItem {
    pub name: String,
    pub quantity: String,
    pub category: Category,
    /// Recipe the item was generated from, for lookup only
    pub source_recipe_id: Option<i64>,
    /// Toggled by the user after the list is created
    pub is_completed: bool,
}

/// Items sharing one category, for presentation
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup {
    pub category: Category,
    pub items: Vec<ShoppingListItem>,
}

/// Composes categorized, scaled shopping-list items from recipe ingredients
#[derive(Debug, Clone, Default)]
pub struct ShoppingListComposer {
    rules: CategoryRules,
}

impl ShoppingListComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom category rule set
    pub fn with_rules(rules: CategoryRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &CategoryRules {
        &self.rules
    }

    /// One item per ingredient, grouped by category
    pub fn compose(
        &self,
        ingredients: &[RecipeIngredient],
        multiplier: ServingMultiplier,
    ) -> Vec<ShoppingListItem> {
        self.compose_items(ingredients, multiplier, None)
    }

    /// Same as [`compose`](Self::compose), with items pointing back to `recipe_id`
    pub fn compose_for_recipe(
        &self,
        recipe_id: i64,
        recipe: &Recipe,
        multiplier: ServingMultiplier,
    ) -> Vec<ShoppingListItem> {
        self.compose_items(&recipe.ingredients, multiplier, Some(recipe_id))
    }

    fn compose_items(
        &self,
        ingredients: &[RecipeIngredient],
        multiplier: ServingMultiplier,
        source_recipe_id: Option<i64>,
    ) -> Vec<ShoppingListItem> {
        let items: Vec<ShoppingListItem> = ingredients
            .iter()
            .map(|ingredient| ShoppingListItem {
                name: ingredient.name.clone(),
                quantity: scale_quantity(&ingredient.quantity, multiplier),
                category: self.rules.categorize(&ingredient.name),
                source_recipe_id,
                is_completed: false,
            })
            .collect();

        group_by_category(&items)
            .into_iter()
            .flat_map(|group| group.items)
            .collect()
    }
}

/// Group items by category in order of first appearance
pub fn group_by_category(items: &[ShoppingListItem]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|g| g.category == item.category) {
            Some(group) => group.items.push(item.clone()),
            None => groups.push(CategoryGroup {
                category: item.category,
                items: vec![item.clone()],
            }),
        }
    }
    groups
}

/// Multiply the first number in `quantity`, keeping the surrounding text
pub fn scale_quantity(quantity: &str, multiplier: ServingMultiplier) -> String {
    if multiplier.is_identity() {
        return quantity.to_string();
    }

    let (view, offsets) = ascii_digit_view(quantity);
    let Some(caps) = QUANTITY_NUMBER_REGEX.captures(&view) else {
        return quantity.to_string();
    };
    let Some(value) = captured_value(&caps) else {
        return quantity.to_string();
    };
    let Some(token) = caps.get(0) else {
        return quantity.to_string();
    };

    let scaled = value * multiplier.get();
    if !scaled.is_finite() {
        return quantity.to_string();
    }
    format!(
        "{}{}{}",
        &quantity[..offsets[token.start()]],
        format_amount(scaled),
        &quantity[offsets[token.end()]..]
    )
}

/// `quantity` with full-width digits, point and slash folded to ASCII, plus
/// the byte offset in `quantity` of every byte of the folded text
fn ascii_digit_view(quantity: &str) -> (String, Vec<usize>) {
    let mut view = String::with_capacity(quantity.len());
    let mut offsets = Vec::with_capacity(quantity.len() + 1);
    for (at, c) in quantity.char_indices() {
        let folded = fold_full_width(c);
        offsets.extend(std::iter::repeat(at).take(folded.len_utf8()));
        view.push(folded);
    }
    offsets.push(quantity.len());
    (view, offsets)
}

fn fold_full_width(c: char) -> char {
    match c {
        '０'..='９' => char::from_digit(c as u32 - '０' as u32, 10).unwrap_or(c),
        '．' => '.',
        '／' => '/',
        _ => c,
    }
}

fn captured_value(caps: &Captures<'_>) -> Option<f64> {
    let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<f64>().ok());

    if let (Some(whole), Some(num), Some(den)) = (number(1), number(2), number(3)) {
        return (den != 0.0).then(|| whole + num / den);
    }
    if let (Some(num), Some(den)) = (number(4), number(5)) {
        return (den != 0.0).then(|| num / den);
    }
    number(6)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Render with at most two decimals and no trailing zeros.
///
/// Non-zero amounts that would round to zero keep two significant digits
/// instead ("0.002"), and very large amounts are printed unrounded.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() || value.abs() >= MAX_ROUNDED_AMOUNT {
        return format!("{}", value);
    }

    let rounded = round_to(value, 2);
    if rounded != 0.0 || value == 0.0 {
        return format!("{}", rounded);
    }

    let decimals = (-value.abs().log10()).ceil() as i32 + 1;
    let small = round_to(value, decimals);
    if small.is_finite() && small != 0.0 {
        format!("{}", small)
    } else {
        format!("{}", value)
    }
}
