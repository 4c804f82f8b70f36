#[cfg(test)]
mod tests {
    use is_it_safe::localization::{create_localization_manager, SharedLocalization};

    fn setup_localization() -> SharedLocalization {
        create_localization_manager().expect("localization should load")
    }

    const KEYS: &[&str] = &[
        "welcome",
        "help",
        "scan-usage",
        "product-not-found",
        "lookup-timeout",
        "lookup-unavailable",
        "lookup-api-error",
        "barcode-empty",
        "barcode-invalid-chars",
        "barcode-invalid-length",
        "result-safe",
        "result-not-safe",
        "result-matched-title",
        "result-no-matches",
        "result-ingredients-title",
        "result-empty-blacklist-hint",
        "add-prompt",
        "blacklist-empty",
        "blacklist-storage-error",
        "list-empty",
        "list-remove-hint",
        "button-clear-all",
        "clear-nothing",
        "button-confirm-clear",
        "button-cancel",
        "clear-success",
        "clear-cancelled",
        "clear-expired",
        "clear-not-yours",
        "cancel-done",
        "cancel-nothing",
        "unknown-message",
        "error-generic",
    ];

    #[test]
    fn test_all_keys_resolve_in_both_languages() {
        let manager = setup_localization();
        for lang in ["en", "fr"] {
            assert!(manager.is_language_supported(lang));
            for key in KEYS {
                let message = manager.get_message_in_language(key, lang, None);
                assert!(
                    !message.starts_with("Missing translation"),
                    "{} missing in {}",
                    key,
                    lang
                );
                assert!(!message.is_empty());
            }
        }
    }

    #[test]
    fn test_french_differs_from_english() {
        let manager = setup_localization();
        assert_eq!(manager.t("result-safe", Some("en")), "✅ SAFE");
        assert_ne!(
            manager.t("result-safe", Some("fr")),
            manager.t("result-safe", Some("en"))
        );
        assert_ne!(
            manager.t("welcome", Some("fr-CA")),
            manager.t("welcome", Some("en-US"))
        );
    }

    #[test]
    fn test_arguments_are_substituted() {
        let manager = setup_localization();
        assert_eq!(
            manager.t_args("product-not-found", &[("barcode", "12345678")], None),
            "❓ No product found for barcode 12345678."
        );
        assert_eq!(
            manager.t_args("add-success", &[("name", "Milk"), ("count", "3")], Some("en")),
            "✅ Added \"Milk\" to your blacklist (3 items)."
        );
        assert!(manager
            .t_args("list-title", &[("count", "2")], Some("fr"))
            .contains('2'));
    }

    #[test]
    fn test_unsupported_language_falls_back_to_english() {
        let manager = setup_localization();
        assert_eq!(
            manager.t("clear-success", Some("de")),
            manager.t("clear-success", Some("en"))
        );
        assert_eq!(
            manager.t("clear-success", None),
            manager.t("clear-success", Some("en"))
        );
    }

    #[test]
    fn test_missing_key() {
        let manager = setup_localization();
        assert_eq!(
            manager.t("no-such-key", Some("en")),
            "Missing translation: no-such-key"
        );
    }
}
