//! # Response Normalization Example
//!
//! Runs a handful of realistic model answers through the response normalizer,
//! shows which fallback step structured each one, then turns the first recipe
//! into a shopping list for four servings in both supported languages.

use smart_recipe::localization::LocalizationManager;
use smart_recipe::response_normalizer::{NormalizeOutcome, ResponseNormalizer};
use smart_recipe::shopping_list::{group_by_category, ServingMultiplier, ShoppingListComposer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🍲 Model Response Normalization Example");
    println!("=======================================\n");

    let responses = [
        (
            "Plain JSON",
            r#"{"name":"番茄炒蛋","ingredients":[{"name":"番茄","quantity":"2個"},{"name":"雞蛋","quantity":"3顆"},{"name":"鹽","quantity":"適量"}],"instructions":["番茄切塊","炒蛋","加入番茄拌炒"]}"#,
        ),
        (
            "Reasoning and fences",
            "<think>The user has chicken and rice, maybe a simple bowl.</think>\nHere you go:\n```json\n{\"name\": \"Chicken Rice Bowl\", \"ingredients\": [{\"name\": \"chicken breast\", \"quantity\": \"2\"}, {\"name\": \"jasmine rice\", \"quantity\": \"1.5 cups\"}, {\"name\": \"soy sauce\", \"quantity\": \"2 tbsp\"}], \"instructions\": [\"Cook the rice.\", \"Sear the chicken.\"]}\n```",
        ),
        (
            "Trailing commas and bare keys",
            "Recipe: {name: 'Garlic Noodles', ingredients: [{name: 'noodles', quantity: '200 g',}, {name: 'garlic', quantity: '4 cloves',},], instructions: ['Boil.', 'Toss.',],}",
        ),
        ("No recipe at all", "I cannot help with that."),
    ];

    let normalizer = ResponseNormalizer::new();
    let mut first_recipe = None;

    for (label, raw) in responses {
        println!("📄 {}", label);
        match normalizer.normalize(raw) {
            NormalizeOutcome::Success(structured) => {
                println!("  ✅ structured at step {:?}: {}", structured.step, structured.recipe.name);
                first_recipe.get_or_insert(structured.recipe);
            }
            NormalizeOutcome::Incomplete(structured) => {
                println!(
                    "  ⚠️  structured at step {:?}, missing {:?}",
                    structured.step, structured.missing
                );
            }
            NormalizeOutcome::Failed(failure) => {
                println!(
                    "  ❌ no recipe after {} attempts, showing: {}",
                    failure.attempts, failure.cleaned_text
                );
            }
        }
        println!();
    }

    let Some(recipe) = first_recipe else {
        return Ok(());
    };

    let localization = LocalizationManager::new()?;
    let items = ShoppingListComposer::new().compose(&recipe.ingredients, ServingMultiplier::new(4.0)?);

    for language in ["en", "zh-TW"] {
        println!("🛒 Shopping list for {} ({})", recipe.name, language);
        for group in group_by_category(&items) {
            println!("  {}", localization.category_label(group.category, language));
            for item in group.items {
                println!("    - {} {}", item.name, item.quantity);
            }
        }
        println!();
    }

    Ok(())
}
