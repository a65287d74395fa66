//! # Duplicate Guard
//!
//! Near-duplicate detection applied when a recipe is saved. A save is
//! considered a repeat of an existing recipe when the owner is the same (the
//! caller scopes its query to one user), the names match ignoring case and
//! surrounding whitespace, the existing recipe is recent, and enough of the
//! ingredient names overlap.

use chrono::{DateTime, Duration, Utc};

use crate::recipe_model::Recipe;

pub const DEFAULT_DUPLICATE_WINDOW_SECS: i64 = 5 * 60;
pub const DEFAULT_MIN_OVERLAP: f64 = 0.8;

/// Tunable thresholds for the near-duplicate check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicatePolicy {
    /// How far back an existing recipe counts as recent
    pub window: Duration,
    /// Minimum ingredient-name overlap ratio, in `0.0..=1.0`
    pub min_overlap: f64,
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        Self {
            window: Duration::seconds(DEFAULT_DUPLICATE_WINDOW_SECS),
            min_overlap: DEFAULT_MIN_OVERLAP,
        }
    }
}

impl DuplicatePolicy {
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_min_overlap(mut self, min_overlap: f64) -> Self {
        self.min_overlap = min_overlap;
        self
    }

    /// Start of the window, for querying candidate rows. Saturates at the
    /// earliest representable time.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether `candidate` repeats `existing`, saved at `existing_created_at`
    pub fn is_near_duplicate(
        &self,
        candidate: &Recipe,
        existing: &Recipe,
        existing_created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        if !names_match(&candidate.name, &existing.name) {
            return false;
        }
        if existing_created_at < self.window_start(now) {
            return false;
        }
        ingredient_overlap(
            &candidate.ingredient_names(),
            &existing.ingredient_names(),
        ) >= self.min_overlap
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Share of `candidate` names also present in `existing`, over the longer list.
///
/// Names are compared lowercased and trimmed. Two empty lists give `0.0`.
pub fn ingredient_overlap<S: AsRef<str>>(candidate: &[S], existing: &[S]) -> f64 {
    let longest = candidate.len().max(existing.len());
    if longest == 0 {
        return 0.0;
    }

    let existing: Vec<String> = existing.iter().map(|n| normalize_name(n.as_ref())).collect();
    let matching = candidate
        .iter()
        .filter(|name| existing.contains(&normalize_name(name.as_ref())))
        .count();

    matching as f64 / longest as f64
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
