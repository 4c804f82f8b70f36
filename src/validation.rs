//! Validation module for user input
//!
//! Reusable validation functions for:
//!
//! - Blacklist terms typed by the user
//! - Barcodes sent for lookup
//!
//! Errors are returned as localization keys so handlers can show them as is.

use lazy_static::lazy_static;
use regex::Regex;

/// Maximum length of a blacklist term, in characters
pub const MAX_BLACKLIST_TERM_LENGTH: usize = 100;

/// Shortest barcode accepted (EAN-8)
pub const MIN_BARCODE_LENGTH: usize = 8;
/// Longest barcode accepted (GTIN-14)
pub const MAX_BARCODE_LENGTH: usize = 14;

lazy_static! {
    static ref BARCODE_SEPARATORS: Regex =
        Regex::new(r"[\s\-]").expect("Invalid barcode separator regex pattern");
}

/// Validates a blacklist term
///
/// # Returns
/// * `Ok(&str)` - The trimmed term if valid
/// * `Err(&str)` - Error key: "blacklist-empty" or "blacklist-too-long"
///
/// # Examples
/// ```
/// use is_it_safe::validation::validate_blacklist_term;
///
/// assert_eq!(validate_blacklist_term("  Peanuts "), Ok("Peanuts"));
/// assert_eq!(validate_blacklist_term("   "), Err("blacklist-empty"));
/// assert_eq!(validate_blacklist_term(&"a".repeat(101)), Err("blacklist-too-long"));
/// ```
pub fn validate_blacklist_term(name: &str) -> Result<&str, &'static str> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("blacklist-empty");
    }

    if trimmed.chars().count() > MAX_BLACKLIST_TERM_LENGTH {
        return Err("blacklist-too-long");
    }

    Ok(trimmed)
}

/// Strip whitespace, a leading BOM and `-` separators from a scanned barcode
///
/// # Examples
/// ```
/// use is_it_safe::validation::normalize_barcode;
///
/// assert_eq!(normalize_barcode("\u{FEFF} 3017-6204 22003\n"), "3017620422003");
/// ```
pub fn normalize_barcode(raw: &str) -> String {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}');
    BARCODE_SEPARATORS.replace_all(trimmed, "").into_owned()
}

/// Validates a barcode after normalization
///
/// # Returns
/// * `Ok(String)` - The normalized barcode
/// * `Err(&str)` - Error key: "barcode-empty", "barcode-invalid-chars"
///   or "barcode-invalid-length"
///
/// # Examples
/// ```
/// use is_it_safe::validation::validate_barcode;
///
/// assert_eq!(validate_barcode("3017620422003"), Ok("3017620422003".to_string()));
/// assert_eq!(validate_barcode("12ab5678"), Err("barcode-invalid-chars"));
/// assert_eq!(validate_barcode("1234"), Err("barcode-invalid-length"));
/// ```
pub fn validate_barcode(raw: &str) -> Result<String, &'static str> {
    let barcode = normalize_barcode(raw);

    if barcode.is_empty() {
        return Err("barcode-empty");
    }

    if !barcode.chars().all(|c| c.is_ascii_digit()) {
        return Err("barcode-invalid-chars");
    }

    if !(MIN_BARCODE_LENGTH..=MAX_BARCODE_LENGTH).contains(&barcode.len()) {
        return Err("barcode-invalid-length");
    }

    Ok(barcode)
}

/// Whether a free-text message looks like a barcode the user wants scanned
pub fn looks_like_barcode(text: &str) -> bool {
    validate_barcode(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_blacklist_term_counts_chars_not_bytes() {
        let accented = "é".repeat(MAX_BLACKLIST_TERM_LENGTH);
        assert!(validate_blacklist_term(&accented).is_ok());
    }

    #[test]
    fn test_validate_barcode_lengths() {
        assert!(validate_barcode("12345678").is_ok());
        assert!(validate_barcode("12345678901234").is_ok());
        assert_eq!(validate_barcode("1234567"), Err("barcode-invalid-length"));
        assert_eq!(validate_barcode("123456789012345"), Err("barcode-invalid-length"));
    }

    #[test]
    fn test_validate_barcode_empty() {
        assert_eq!(validate_barcode("  \n"), Err("barcode-empty"));
    }

    #[test]
    fn test_looks_like_barcode() {
        assert!(looks_like_barcode(" 5449000000996 "));
        assert!(!looks_like_barcode("milk"));
        assert!(!looks_like_barcode("/scan"));
    }
}
