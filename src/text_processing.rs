//! # Text Processing Module
//!
//! Text canonicalization and fuzzy matching used by the ingredient analyzer.
//!
//! ## Features
//!
//! - Case- and punctuation-insensitive normalization of free text
//! - Substring ("fuzzy") matching of a blacklist term inside ingredient text
//!
//! Matching is intentionally permissive: it is plain substring containment
//! after normalization, not word-boundary aware. `"Milk"` matches
//! `"Skimmed Milk Powder"` and also `"Buttermilk"`.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Punctuation that is treated as a word separator: `( ) , [ ] { } : ; ' "`
    static ref PUNCTUATION: Regex =
        Regex::new(r#"[(),\[\]{}:;'"]"#).expect("Punctuation pattern should be valid");
    /// Whitespace, including the byte-order mark pasted in from some labels
    static ref WHITESPACE_RUN: Regex =
        Regex::new(r"[\s\x{FEFF}]+").expect("Whitespace pattern should be valid");
}

/// Normalize a string for comparison
///
/// Applies, in this order:
///
/// 1. lower-casing
/// 2. replacing each of `( ) , [ ] { } : ; ' "` with a single space
/// 3. collapsing whitespace runs into a single space
/// 4. trimming
///
/// Punctuation is removed before whitespace is collapsed, so `"Red(40)"`
/// becomes `"red 40"` and not `"red  40 "`.
///
/// # Examples
/// ```
/// use is_it_safe::text_processing::normalize;
///
/// assert_eq!(normalize("  Skimmed MILK (Powder); "), "skimmed milk powder");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let without_punctuation = PUNCTUATION.replace_all(&lowered, " ");
    let collapsed = WHITESPACE_RUN.replace_all(&without_punctuation, " ");
    collapsed.trim().to_string()
}

/// Check if a blacklisted term appears in the ingredients text
///
/// Both sides are normalized independently, then the normalized term is
/// searched as a contiguous substring of the normalized text:
///
/// - `"Milk"` matches `"Skimmed Milk Powder"`
/// - `"Red 40"` matches `"FD&C Red 40"` and `"Red(40)"`
/// - `"Gluten"` matches `"Contains Gluten"`
///
/// A term that normalizes to the empty string matches every text. The
/// persistence layer rejects blank terms before they get here.
///
/// # Examples
/// ```
/// use is_it_safe::text_processing::matches;
///
/// assert!(matches("Milk", "Skimmed Milk Powder"));
/// assert!(!matches("Milk", "Almond Juice"));
/// ```
pub fn matches(term: &str, ingredients_text: &str) -> bool {
    let normalized_term = normalize(term);
    let normalized_text = normalize(ingredients_text);
    normalized_text.contains(&normalized_term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases() {
        assert_eq!(normalize("SUGAR"), "sugar");
    }

    #[test]
    fn test_normalize_replaces_every_punctuation_character() {
        assert_eq!(normalize("a(b)c,d[e]f{g}h:i;j'k\"l"), "a b c d e f g h i j k l");
    }

    #[test]
    fn test_normalize_keeps_other_symbols() {
        // Only the listed characters are separators
        assert_eq!(normalize("FD&C Red-40."), "fd&c red-40.");
    }

    #[test]
    fn test_normalize_collapses_mixed_whitespace() {
        assert_eq!(normalize("salt\t\n  pepper\r\nwater"), "salt pepper water");
    }

    #[test]
    fn test_normalize_punctuation_before_collapse() {
        assert_eq!(normalize("Red ( 40 )"), "red 40");
        assert_eq!(normalize("((milk))"), "milk");
    }

    #[test]
    fn test_normalize_empty_and_blank() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("();"), "");
    }

    #[test]
    fn test_normalize_non_ascii() {
        assert_eq!(normalize("LAIT ÉCRÉMÉ"), "lait écrémé");
    }

    #[test]
    fn test_matches_substring_policy() {
        assert!(matches("Milk", "Skimmed Milk Powder"));
        assert!(matches("Milk", "Buttermilk"));
        assert!(matches("Red 40", "FD&C Red 40"));
        assert!(matches("Gluten", "Contains Gluten"));
        assert!(!matches("Milk", "Almond Juice"));
    }

    #[test]
    fn test_matches_punctuation_insensitive() {
        assert!(matches("Red 40", "Red(40)"));
        assert!(matches("soy lecithin", "Emulsifier: Soy, Lecithin"));
    }

    #[test]
    fn test_matches_term_with_punctuation() {
        assert!(matches("(Peanuts)", "roasted peanuts"));
    }

    #[test]
    fn test_matches_empty_term_matches_everything() {
        assert!(matches("", "anything"));
        assert!(matches("  ", ""));
        assert!(matches(";", "water"));
    }

    #[test]
    fn test_normalize_treats_byte_order_mark_as_whitespace() {
        assert_eq!(normalize("milk\u{FEFF}powder"), "milk powder");
        assert_eq!(normalize("\u{FEFF}Sugar \u{FEFF}\u{FEFF} salt\u{FEFF}"), "sugar salt");
        assert!(matches("milk powder", "Skimmed MILK\u{FEFF}POWDER"));
    }

    #[test]
    fn test_matches_does_not_span_removed_whitespace() {
        // Whitespace is collapsed, not removed
        assert!(!matches("redforty", "red forty"));
    }
}
