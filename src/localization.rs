//! Fluent-based localization for bot messages.
//!
//! Message catalogs are embedded at compile time from `locales/<lang>/main.ftl`.
//! Unsupported languages fall back to English.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use unic_langid::LanguageIdentifier;

const DEFAULT_LANGUAGE: &str = "en";

const LOCALES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("fr", include_str!("../locales/fr/main.ftl")),
];

/// Localization manager holding one bundle per supported language
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl std::fmt::Debug for LocalizationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut languages: Vec<&String> = self.bundles.keys().collect();
        languages.sort();
        f.debug_struct("LocalizationManager")
            .field("languages", &languages)
            .finish()
    }
}

impl LocalizationManager {
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();
        for (locale_str, source) in LOCALES {
            let locale: LanguageIdentifier = locale_str.parse()?;
            bundles.insert(locale_str.to_string(), Self::create_bundle(locale, source)?);
        }
        Ok(Self { bundles })
    }

    fn create_bundle(
        locale: LanguageIdentifier,
        source: &str,
    ) -> Result<FluentBundle<FluentResource>> {
        let resource = FluentResource::try_new(source.to_string()).map_err(|(_, errors)| {
            anyhow!("Failed to parse {} messages: {:?}", locale, errors)
        })?;

        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Telegram renders the Unicode isolation marks literally
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Duplicate {} messages: {:?}", locale, errors))?;
        Ok(bundle)
    }

    /// Get a localized message in a specific language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&FluentArgs>,
    ) -> String {
        let bundle = match self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match bundle.get_message(key).and_then(|msg| msg.value()) {
            Some(pattern) => pattern,
            None => return format!("Missing translation: {}", key),
        };

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            tracing::warn!(key = key, language = language, ?errors, "Message formatting errors");
        }
        value.into_owned()
    }

    pub fn is_language_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }

    /// Pick the bundle language for a Telegram language code ("fr-FR" -> "fr")
    pub fn detect_language(&self, language_code: Option<&str>) -> String {
        language_code
            .and_then(|code| code.split(['-', '_']).next())
            .map(|lang| lang.trim().to_lowercase())
            .filter(|lang| self.is_language_supported(lang))
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
    }

    /// Localized message in the user's language
    pub fn t(&self, key: &str, language_code: Option<&str>) -> String {
        let language = self.detect_language(language_code);
        self.get_message_in_language(key, &language, None)
    }

    /// Localized message with arguments in the user's language
    pub fn t_args(&self, key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
        let language = self.detect_language(language_code);
        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            fluent_args.set(*name, *value);
        }
        self.get_message_in_language(key, &language, Some(&fluent_args))
    }
}

pub type SharedLocalization = Arc<LocalizationManager>;

/// Build the shared localization manager used by the bot
pub fn create_localization_manager() -> Result<SharedLocalization> {
    Ok(Arc::new(LocalizationManager::new()?))
}
