//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::analyzer::AnalysisResult;
use crate::blacklist::{BlacklistError, BlacklistItem};
use crate::localization::LocalizationManager;
use crate::lookup::LookupError;

pub const REMOVE_PREFIX: &str = "remove:";
pub const CLEAR_REQUEST: &str = "clear_request";
pub const CLEAR_CONFIRM: &str = "clear_confirm";
pub const CLEAR_CANCEL: &str = "clear_cancel";

const MAX_BUTTON_LABEL_CHARS: usize = 30;

/// Action encoded in an inline keyboard button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Remove(String),
    ClearRequest,
    ClearConfirm,
    ClearCancel,
}

pub fn parse_callback_data(data: &str) -> Option<CallbackAction> {
    match data {
        CLEAR_REQUEST => Some(CallbackAction::ClearRequest),
        CLEAR_CONFIRM => Some(CallbackAction::ClearConfirm),
        CLEAR_CANCEL => Some(CallbackAction::ClearCancel),
        _ => data
            .strip_prefix(REMOVE_PREFIX)
            .filter(|id| !id.is_empty())
            .map(|id| CallbackAction::Remove(id.to_string())),
    }
}

/// Shorten a label to fit on a button, respecting char boundaries
pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    let kept: String = label.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Render an analysis verdict
///
/// `brands` comes from the product record since the verdict itself only
/// carries the product name.
pub fn format_analysis_result(
    result: &AnalysisResult,
    brands: Option<&str>,
    blacklist_len: usize,
    localization: &LocalizationManager,
    language_code: Option<&str>,
) -> String {
    let mut lines = Vec::new();

    let verdict_key = if result.is_safe() {
        "result-safe"
    } else {
        "result-not-safe"
    };
    lines.push(localization.t(verdict_key, language_code));
    lines.push(String::new());

    lines.push(localization.t_args(
        "result-product",
        &[("name", result.product_name())],
        language_code,
    ));
    if let Some(brands) = brands.map(str::trim).filter(|b| !b.is_empty()) {
        lines.push(localization.t_args("result-brands", &[("brands", brands)], language_code));
    }
    if !result.barcode().is_empty() {
        lines.push(localization.t_args(
            "result-barcode",
            &[("barcode", result.barcode())],
            language_code,
        ));
    }
    lines.push(String::new());

    if result.is_safe() {
        if blacklist_len == 0 {
            lines.push(localization.t("result-empty-blacklist-hint", language_code));
        } else {
            lines.push(localization.t("result-no-matches", language_code));
        }
    } else {
        lines.push(localization.t("result-matched-title", language_code));
        for term in result.matched_ingredients() {
            lines.push(format!("• {}", term));
        }
    }
    lines.push(String::new());

    lines.push(localization.t("result-ingredients-title", language_code));
    lines.push(result.full_ingredients_list().to_string());
    lines.push(String::new());
    lines.push(localization.t("scan-another", language_code));

    lines.join("\n")
}

/// Text of the blacklist view
pub fn format_blacklist(
    items: &[BlacklistItem],
    localization: &LocalizationManager,
    language_code: Option<&str>,
) -> String {
    if items.is_empty() {
        return localization.t("list-empty", language_code);
    }

    let count = items.len().to_string();
    let mut text = localization.t_args("list-title", &[("count", &count)], language_code);
    text.push('\n');
    for (i, item) in items.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, item.name));
    }
    text.push_str("\n\n");
    text.push_str(&localization.t("list-remove-hint", language_code));
    text
}

/// One remove button per item plus a "clear all" button
pub fn create_blacklist_keyboard(
    items: &[BlacklistItem],
    localization: &LocalizationManager,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = items
        .iter()
        .map(|item| {
            let name = truncate_label(&item.name, MAX_BUTTON_LABEL_CHARS);
            vec![InlineKeyboardButton::callback(
                localization.t_args("button-remove", &[("name", &name)], language_code),
                format!("{}{}", REMOVE_PREFIX, item.id),
            )]
        })
        .collect();

    if !items.is_empty() {
        buttons.push(vec![InlineKeyboardButton::callback(
            localization.t("button-clear-all", language_code),
            CLEAR_REQUEST.to_string(),
        )]);
    }

    InlineKeyboardMarkup::new(buttons)
}

pub fn create_clear_confirmation_keyboard(
    localization: &LocalizationManager,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(
            localization.t("button-confirm-clear", language_code),
            CLEAR_CONFIRM.to_string(),
        ),
        InlineKeyboardButton::callback(
            localization.t("button-cancel", language_code),
            CLEAR_CANCEL.to_string(),
        ),
    ]])
}

/// User-facing message for a failed blacklist change
pub fn blacklist_error_message(
    error: &BlacklistError,
    localization: &LocalizationManager,
    language_code: Option<&str>,
) -> String {
    match error {
        BlacklistError::NameTooLong { max } => localization.t_args(
            error.message_key(),
            &[("max", &max.to_string())],
            language_code,
        ),
        BlacklistError::Duplicate(name) => {
            localization.t_args(error.message_key(), &[("name", name)], language_code)
        }
        BlacklistError::EmptyName | BlacklistError::Storage(_) => {
            localization.t(error.message_key(), language_code)
        }
    }
}

/// User-facing message for a failed product lookup
pub fn lookup_error_message(
    error: &LookupError,
    localization: &LocalizationManager,
    language_code: Option<&str>,
) -> String {
    localization.t(error.message_key(), language_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_data() {
        assert_eq!(
            parse_callback_data("remove:1700000000000-0000abcd"),
            Some(CallbackAction::Remove("1700000000000-0000abcd".to_string()))
        );
        assert_eq!(parse_callback_data("clear_confirm"), Some(CallbackAction::ClearConfirm));
        assert_eq!(parse_callback_data("clear_cancel"), Some(CallbackAction::ClearCancel));
        assert_eq!(parse_callback_data("clear_request"), Some(CallbackAction::ClearRequest));
        assert_eq!(parse_callback_data("remove:"), None);
        assert_eq!(parse_callback_data("something"), None);
    }

    #[test]
    fn test_truncate_label_is_char_safe() {
        assert_eq!(truncate_label("milk", 30), "milk");
        assert_eq!(truncate_label("crème fraîche épaisse", 10), "crème f...");
    }
}
