//! # Ingredient Categories
//!
//! Rule-based shelf classification for shopping-list items. A curated
//! name table gives precise answers for common ingredients; a broader keyword
//! table catches plurals, adjectives and regional names the curated table
//! misses. Anything left over is [`Category::Other`].
//!
//! Both tables are plain data, covering the Traditional Chinese names used by
//! the recipe prompts along with their English equivalents, and can be
//! extended without touching the matching code.
//!
//! ## Usage
//!
//! ```rust
//! use smart_recipe::ingredient_categories::{Category, CategoryRules};
//!
//! let rules = CategoryRules::default();
//! assert_eq!(rules.categorize("Chicken Breast"), Category::Meat);
//! assert_eq!(rules.categorize("鮭魚"), Category::Seafood);
//! assert_eq!(rules.categorize("unobtainium"), Category::Other);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Shelf or aisle label assigned to a shopping-list item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Vegetables,
    Meat,
    Seafood,
    Dairy,
    Seasoning,
    Grains,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Vegetables,
        Category::Meat,
        Category::Seafood,
        Category::Dairy,
        Category::Seasoning,
        Category::Grains,
        Category::Other,
    ];

    /// Stable identifier used for storage and message lookup
    pub fn key(&self) -> &'static str {
        match self {
            Category::Vegetables => "vegetables",
            Category::Meat => "meat",
            Category::Seafood => "seafood",
            Category::Dairy => "dairy",
            Category::Seasoning => "seasoning",
            Category::Grains => "grains",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Curated ingredient names. The longest name contained in an ingredient
/// wins, so "bell pepper" beats "pepper" and "eggplant" beats "egg".
static CURATED_TABLE: LazyLock<Vec<(&'static str, Category)>> = LazyLock::new(|| {
    use Category::*;
    vec![
        // Vegetables
        ("洋蔥", Vegetables),
        ("大蒜", Vegetables),
        ("薑", Vegetables),
        ("胡蘿蔔", Vegetables),
        ("馬鈴薯", Vegetables),
        ("番茄", Vegetables),
        ("青椒", Vegetables),
        ("紅椒", Vegetables),
        ("青蔥", Vegetables),
        ("韭菜", Vegetables),
        ("白菜", Vegetables),
        ("高麗菜", Vegetables),
        ("菠菜", Vegetables),
        ("芹菜", Vegetables),
        ("小黃瓜", Vegetables),
        ("茄子", Vegetables),
        ("南瓜", Vegetables),
        ("onion", Vegetables),
        ("garlic", Vegetables),
        ("ginger", Vegetables),
        ("carrot", Vegetables),
        ("potato", Vegetables),
        ("tomato", Vegetables),
        ("bell pepper", Vegetables),
        ("scallion", Vegetables),
        ("leek", Vegetables),
        ("cabbage", Vegetables),
        ("spinach", Vegetables),
        ("celery", Vegetables),
        ("cucumber", Vegetables),
        ("eggplant", Vegetables),
        ("butternut squash", Vegetables),
        ("pumpkin", Vegetables),
        // Meat
        ("雞胸肉", Meat),
        ("豬絞肉", Meat),
        ("牛絞肉", Meat),
        ("豬肉", Meat),
        ("牛肉", Meat),
        ("雞肉", Meat),
        ("雞腿", Meat),
        ("培根", Meat),
        ("香腸", Meat),
        ("chicken", Meat),
        ("pork", Meat),
        ("beef", Meat),
        ("bacon", Meat),
        ("sausage", Meat),
        ("goat", Meat),
        // Seafood
        ("鮭魚", Seafood),
        ("鯖魚", Seafood),
        ("魚", Seafood),
        ("蝦", Seafood),
        ("蟹", Seafood),
        ("蛤蜊", Seafood),
        ("花枝", Seafood),
        ("干貝", Seafood),
        ("salmon", Seafood),
        ("mackerel", Seafood),
        ("shrimp", Seafood),
        ("prawn", Seafood),
        ("crab", Seafood),
        ("clam", Seafood),
        ("squid", Seafood),
        ("scallop", Seafood),
        // Dairy
        ("鮮奶油", Dairy),
        ("牛奶", Dairy),
        ("奶油", Dairy),
        ("起司", Dairy),
        ("優格", Dairy),
        ("奶粉", Dairy),
        ("cream", Dairy),
        ("milk", Dairy),
        ("butter", Dairy),
        ("cheese", Dairy),
        ("yogurt", Dairy),
        // Seasoning
        ("橄欖油", Seasoning),
        ("沙拉油", Seasoning),
        ("鹽", Seasoning),
        ("糖", Seasoning),
        ("醬油", Seasoning),
        ("醋", Seasoning),
        ("料酒", Seasoning),
        ("胡椒", Seasoning),
        ("辣椒", Seasoning),
        ("八角", Seasoning),
        ("桂皮", Seasoning),
        ("花椒", Seasoning),
        ("蠔油", Seasoning),
        ("麻油", Seasoning),
        ("花生醬", Seasoning),
        ("olive oil", Seasoning),
        ("salt", Seasoning),
        ("sugar", Seasoning),
        ("soy sauce", Seasoning),
        ("vinegar", Seasoning),
        ("rice wine", Seasoning),
        ("pepper", Seasoning),
        ("chili", Seasoning),
        ("star anise", Seasoning),
        ("cinnamon", Seasoning),
        ("oyster sauce", Seasoning),
        ("sesame oil", Seasoning),
        ("peanut butter", Seasoning),
        // Grains
        ("義大利麵", Grains),
        ("烏龍麵", Grains),
        ("麵條", Grains),
        ("麵粉", Grains),
        ("麵包", Grains),
        ("燕麥", Grains),
        ("米", Grains),
        ("spaghetti", Grains),
        ("pasta", Grains),
        ("udon", Grains),
        ("noodle", Grains),
        ("flour", Grains),
        ("bread", Grains),
        ("oat", Grains),
        ("rice", Grains),
        // Other
        ("雞蛋", Other),
        ("豆腐", Other),
        ("豆漿", Other),
        ("醬菜", Other),
        ("egg", Other),
        ("tofu", Other),
        ("soy milk", Other),
        ("pickle", Other),
    ]
});

/// Keyword groups tried after the curated table, in order
static KEYWORD_TABLE: LazyLock<Vec<(Vec<&'static str>, Category)>> = LazyLock::new(|| {
    use Category::*;
    vec![
        (
            vec!["肉", "雞", "豬", "牛", "meat", "steak", "lamb", "mutton", "duck", "turkey", "ham", "mince"],
            Meat,
        ),
        (
            vec!["魚", "蝦", "蟹", "海", "fish", "seafood", "lobster", "oyster", "mussel", "tuna", "cod"],
            Seafood,
        ),
        (
            vec!["菜", "瓜", "椒", "蔥", "vegetable", "lettuce", "greens", "mushroom", "squash", "broccoli", "zucchini", "eggplant", "bean sprout"],
            Vegetables,
        ),
        (
            vec!["奶", "乳", "起司", "優格", "dairy", "cheddar", "mozzarella", "parmesan", "ghee"],
            Dairy,
        ),
        (
            vec!["油", "醬", "鹽", "糖", "oil", "sauce", "paste", "spice", "powder", "seasoning", "syrup", "honey", "herb"],
            Seasoning,
        ),
        (
            vec!["米", "麵", "粉", "麥", "grain", "wheat", "barley", "corn", "quinoa", "cereal", "tortilla"],
            Grains,
        ),
    ]
});

/// The two-tier rule set used to classify ingredient names
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRules {
    /// Curated name fragments, longest match wins, earlier entry on ties
    pub lookup: Vec<(String, Category)>,
    /// Keyword groups, first group with any match wins
    pub keywords: Vec<(Vec<String>, Category)>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self {
            lookup: CURATED_TABLE
                .iter()
                .map(|(name, category)| (name.to_string(), *category))
                .collect(),
            keywords: KEYWORD_TABLE
                .iter()
                .map(|(words, category)| (words.iter().map(|w| w.to_string()).collect(), *category))
                .collect(),
        }
    }
}

impl CategoryRules {
    /// Rules with no entries; everything classifies as [`Category::Other`]
    pub fn empty() -> Self {
        Self {
            lookup: Vec::new(),
            keywords: Vec::new(),
        }
    }

    /// Add a curated entry that wins ties against existing ones
    pub fn with_entry(mut self, name: &str, category: Category) -> Self {
        self.lookup.insert(0, (name.to_lowercase(), category));
        self
    }

    /// Append a keyword group checked after the existing ones
    pub fn with_keywords(mut self, words: &[&str], category: Category) -> Self {
        self.keywords
            .push((words.iter().map(|w| w.to_lowercase()).collect(), category));
        self
    }

    /// Classify an ingredient name by case-insensitive substring matching
    pub fn categorize(&self, ingredient_name: &str) -> Category {
        let name = ingredient_name.trim().to_lowercase();
        if name.is_empty() {
            return Category::Other;
        }

        if let Some((_, category)) = self
            .lookup
            .iter()
            .filter(|(key, _)| !key.is_empty() && name.contains(key.to_lowercase().as_str()))
            .min_by_key(|(key, _)| Reverse(key.chars().count()))
        {
            return *category;
        }

        self.keywords
            .iter()
            .find(|(words, _)| words.iter().any(|w| name.contains(w.to_lowercase().as_str())))
            .map(|(_, category)| *category)
            .unwrap_or(Category::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curated_english_names() {
        let rules = CategoryRules::default();
        assert_eq!(rules.categorize("chicken breast"), Category::Meat);
        assert_eq!(rules.categorize("Red Bell Pepper"), Category::Vegetables);
        assert_eq!(rules.categorize("black pepper"), Category::Seasoning);
        assert_eq!(rules.categorize("whole milk"), Category::Dairy);
        assert_eq!(rules.categorize("jasmine rice"), Category::Grains);
        assert_eq!(rules.categorize("eggs"), Category::Other);
    }

    #[test]
    fn test_curated_chinese_names() {
        let rules = CategoryRules::default();
        assert_eq!(rules.categorize("洋蔥"), Category::Vegetables);
        assert_eq!(rules.categorize("雞胸肉"), Category::Meat);
        assert_eq!(rules.categorize("鮭魚片"), Category::Seafood);
        assert_eq!(rules.categorize("醬油"), Category::Seasoning);
        assert_eq!(rules.categorize("烏龍麵"), Category::Grains);
        assert_eq!(rules.categorize("雞蛋"), Category::Other);
    }

    #[test]
    fn test_longest_curated_name_wins() {
        let rules = CategoryRules::default();
        assert_eq!(rules.categorize("eggplant"), Category::Vegetables);
        assert_eq!(rules.categorize("Japanese eggplant"), Category::Vegetables);
        assert_eq!(rules.categorize("butternut squash"), Category::Vegetables);
        assert_eq!(rules.categorize("peanut butter"), Category::Seasoning);
        assert_eq!(rules.categorize("goat"), Category::Meat);
        assert_eq!(rules.categorize("goat cheese"), Category::Dairy);
        assert_eq!(rules.categorize("soy milk"), Category::Other);
        assert_eq!(rules.categorize("egg noodles"), Category::Grains);
        assert_eq!(rules.categorize("rolled oats"), Category::Grains);
        assert_eq!(rules.categorize("茄子"), Category::Vegetables);
    }

    #[test]
    fn test_keyword_fallback() {
        let rules = CategoryRules::default();
        assert_eq!(rules.categorize("羊肉"), Category::Meat);
        assert_eq!(rules.categorize("lamb shoulder"), Category::Meat);
        assert_eq!(rules.categorize("tuna steak"), Category::Meat);
        assert_eq!(rules.categorize("canned tuna"), Category::Seafood);
        assert_eq!(rules.categorize("shiitake mushrooms"), Category::Vegetables);
        assert_eq!(rules.categorize("acorn squash"), Category::Vegetables);
        assert_eq!(rules.categorize("花生醬"), Category::Seasoning);
        assert_eq!(rules.categorize("玉米粉"), Category::Grains);
    }

    #[test]
    fn test_unknown_falls_through_to_other() {
        let rules = CategoryRules::default();
        assert_eq!(rules.categorize("dragon fruit"), Category::Other);
        assert_eq!(rules.categorize(""), Category::Other);
        assert_eq!(CategoryRules::empty().categorize("chicken"), Category::Other);
    }

    #[test]
    fn test_rules_are_extensible() {
        let rules = CategoryRules::default()
            .with_entry("Chicken Stock", Category::Seasoning)
            .with_keywords(&["durian"], Category::Vegetables);
        assert_eq!(rules.categorize("chicken stock"), Category::Seasoning);
        assert_eq!(rules.categorize("durian"), Category::Vegetables);
        assert_eq!(rules.categorize("chicken thigh"), Category::Meat);
    }

    #[test]
    fn test_category_key_roundtrip() {
        for category in Category::ALL {
            assert_eq!(category.key().parse::<Category>(), Ok(category));
        }
        assert!("produce".parse::<Category>().is_err());
    }
}
