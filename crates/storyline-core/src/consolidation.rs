//! Bounded list consolidation.
//!
//! Free-form lists (moods, physical states, feelings, wants) accumulate
//! synonyms over a long chat. Consolidation replaces a list with a shorter
//! one. The generator proposes the replacement, but the bounds are enforced
//! here in code: the result never has folded duplicates, never exceeds the
//! ceiling, and never drops below the floor when the original had enough
//! entries to meet it.

use storyline_types::{contains_folded, fold_key};

use crate::config::ConsolidationConfig;

/// Trim, drop blanks, and remove case-insensitive duplicates (first wins).
pub fn normalize_entries(entries: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let trimmed = entry.trim();
        if !trimmed.is_empty() && !contains_folded(&out, trimmed) {
            out.push(trimmed.to_owned());
        }
    }
    out
}

/// Whether `list` holds more distinct entries than the floor.
///
/// Lists at or below the floor are left alone.
pub fn needs_consolidation(list: &[String], bounds: ConsolidationConfig) -> bool {
    normalize_entries(list).len() > bounds.min_entries
}

/// Clamp a proposed replacement to `[min_entries, max_entries]`.
///
/// The proposal is normalized, truncated to the ceiling, and then padded with
/// entries from `original` (in their original order) until the floor is met
/// or `original` runs out.
pub fn enforce_bounds(
    proposed: &[String],
    original: &[String],
    bounds: ConsolidationConfig,
) -> Vec<String> {
    let mut out = normalize_entries(proposed);
    out.truncate(bounds.max_entries);
    if out.len() < bounds.min_entries {
        for entry in normalize_entries(original) {
            if out.len() >= bounds.min_entries {
                break;
            }
            if !contains_folded(&out, &entry) {
                out.push(entry);
            }
        }
    }
    out
}

/// Whether two lists hold the same entries, ignoring case and order.
pub fn same_entries(a: &[String], b: &[String]) -> bool {
    let mut left: Vec<String> = a.iter().map(|s| fold_key(s)).collect();
    let mut right: Vec<String> = b.iter().map(|s| fold_key(s)).collect();
    left.sort();
    left.dedup();
    right.sort();
    right.dedup();
    left == right
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    const BOUNDS: ConsolidationConfig = ConsolidationConfig {
        min_entries: 2,
        max_entries: 5,
    };

    #[test]
    fn normalize_drops_blanks_and_folded_duplicates() {
        let out = normalize_entries(&strings(&["Happy", " happy", "", "  ", "Calm"]));
        assert_eq!(out, strings(&["Happy", "Calm"]));
    }

    #[test]
    fn seven_synonyms_land_within_bounds() {
        let original = strings(&[
            "happy", "joyful", "cheerful", "glad", "elated", "content", "upbeat",
        ]);
        assert!(needs_consolidation(&original, BOUNDS));

        // Generator returned everything back: truncated to the ceiling.
        let out = enforce_bounds(&original, &original, BOUNDS);
        assert_eq!(out.len(), 5);

        // Generator collapsed too far: padded back to the floor.
        let out = enforce_bounds(&strings(&["happy"]), &original, BOUNDS);
        assert_eq!(out, strings(&["happy", "joyful"]));

        // Generator returned nothing usable.
        let out = enforce_bounds(&strings(&["", " "]), &original, BOUNDS);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn bounded_output_has_no_folded_duplicates() {
        let original = strings(&["tired", "Tired", "sore", "hungry", "cold"]);
        let out = enforce_bounds(&strings(&["TIRED", "tired", "sore"]), &original, BOUNDS);
        let folded: Vec<String> = out.iter().map(|s| fold_key(s)).collect();
        let mut unique = folded.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), folded.len());
        assert!((2..=5).contains(&out.len()));
    }

    #[test]
    fn enforcing_bounds_twice_changes_nothing() {
        let original = strings(&["a", "b", "c", "d", "e", "f"]);
        let once = enforce_bounds(&strings(&["x"]), &original, BOUNDS);
        let twice = enforce_bounds(&once, &original, BOUNDS);
        assert_eq!(once, twice);
    }

    #[test]
    fn short_lists_are_left_alone() {
        assert!(!needs_consolidation(&strings(&["calm", "Calm", "alert"]), BOUNDS));
    }

    #[test]
    fn same_entries_ignores_case_and_order() {
        assert!(same_entries(&strings(&["A", "b"]), &strings(&["B", "a"])));
        assert!(!same_entries(&strings(&["A"]), &strings(&["A", "c"])));
    }
}
