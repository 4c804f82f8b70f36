//! Barcode scan flow: validate, deduplicate, look up, analyze.
//!
//! Kept free of Telegram I/O so the whole flow can be driven from tests with
//! in-memory collaborators.

use tracing::{debug, info};

use crate::analyzer::{analyze, AnalysisResult};
use crate::blacklist::OwnerId;
use crate::deduplication::ScanKey;
use crate::errors::error_logging;
use crate::localization::LocalizationManager;
use crate::lookup::LookupError;
use crate::observability;
use crate::product::ProductRecord;
use crate::validation::validate_barcode;

use super::ui_builder::{format_analysis_result, lookup_error_message};
use super::BotServices;

/// What happened to one scan request
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// The text is not a usable barcode; carries the localization key
    InvalidBarcode(&'static str),
    /// Same chat scanned the same barcode moments ago
    Duplicate,
    NotFound { barcode: String },
    LookupFailed { barcode: String, error: LookupError },
    Analyzed {
        product: ProductRecord,
        result: AnalysisResult,
        blacklist_len: usize,
    },
}

/// Run a scan for `owner` in chat `chat_id`
pub async fn run_scan(
    services: &BotServices,
    chat_id: teloxide::types::ChatId,
    owner: OwnerId,
    raw_barcode: &str,
) -> ScanOutcome {
    let barcode = match validate_barcode(raw_barcode) {
        Ok(barcode) => barcode,
        Err(key) => {
            error_logging::log_validation_error(
                &key,
                "scan",
                Some(owner),
                "barcode",
                Some(raw_barcode),
            );
            return ScanOutcome::InvalidBarcode(key);
        }
    };

    if services
        .deduplicator
        .is_duplicate(&ScanKey::new(chat_id, barcode.clone()))
    {
        debug!(owner_id = %owner, barcode = %barcode, "Ignoring duplicate scan");
        return ScanOutcome::Duplicate;
    }

    let product = match services.lookup.fetch_product(&barcode).await {
        Ok(Some(product)) => product,
        Ok(None) => return ScanOutcome::NotFound { barcode },
        Err(error) => return ScanOutcome::LookupFailed { barcode, error },
    };

    let blacklist = services.store.load(owner).await;
    let result = analyze(&product, &blacklist);
    observability::record_analysis_metrics(result.is_safe(), result.matched_ingredients().len());

    info!(
        owner_id = %owner,
        barcode = %barcode,
        is_safe = result.is_safe(),
        matched = result.matched_ingredients().len(),
        "Product analyzed"
    );

    ScanOutcome::Analyzed {
        product,
        result,
        blacklist_len: blacklist.len(),
    }
}

/// Message to send for an outcome, `None` when the scan is silently dropped
pub fn render_scan_outcome(
    outcome: &ScanOutcome,
    localization: &LocalizationManager,
    language_code: Option<&str>,
) -> Option<String> {
    match outcome {
        ScanOutcome::InvalidBarcode(key) => Some(localization.t(key, language_code)),
        ScanOutcome::Duplicate => None,
        ScanOutcome::NotFound { barcode } => Some(localization.t_args(
            "product-not-found",
            &[("barcode", barcode)],
            language_code,
        )),
        ScanOutcome::LookupFailed { error, .. } => {
            Some(lookup_error_message(error, localization, language_code))
        }
        ScanOutcome::Analyzed {
            product,
            result,
            blacklist_len,
        } => Some(format_analysis_result(
            result,
            product.brands.as_deref(),
            *blacklist_len,
            localization,
            language_code,
        )),
    }
}
