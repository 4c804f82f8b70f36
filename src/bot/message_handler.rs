//! Message Handler module for processing incoming Telegram messages

use std::time::Instant;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, Instrument};

use crate::blacklist::{BlacklistError, OwnerId};
use crate::dialogue::{BlacklistDialogue, BlacklistDialogueState};
use crate::errors::error_logging;
use crate::observability;
use crate::validation::looks_like_barcode;

use super::command_handlers::{add_term, handle_command, handle_scan, parse_command};
use super::{owner_from_message, SharedServices};

/// Entry point for every incoming message
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    dialogue: BlacklistDialogue,
    services: SharedServices,
) -> Result<()> {
    let span = observability::telegram_span(
        "message_handler",
        msg.from.as_ref().map(|u| u.id.0 as i64),
    );

    async move {
        let start_time = Instant::now();
        let message_type = if msg.text().is_some() {
            "text"
        } else {
            "unsupported"
        };
        observability::record_telegram_message(message_type);

        let result = match msg.text() {
            Some(text) => handle_text_message(&bot, &msg, text, &dialogue, &services).await,
            None => handle_unsupported_message(&bot, &msg, &services).await,
        };

        if let Err(e) = &result {
            error_logging::log_internal_error(
                e,
                "telegram",
                "message_handler",
                Some(owner_from_message(&msg)),
            );
        }
        let status = if result.is_ok() { 200 } else { 500 };
        observability::record_request_metrics("telegram_message", status, start_time.elapsed());
        result
    }
    .instrument(span)
    .await
}

async fn handle_text_message(
    bot: &Bot,
    msg: &Message,
    text: &str,
    dialogue: &BlacklistDialogue,
    services: &SharedServices,
) -> Result<()> {
    let owner = owner_from_message(msg);
    let language_code = msg
        .from
        .as_ref()
        .and_then(|user| user.language_code.as_deref());

    if let Some(command) = parse_command(text) {
        return handle_command(bot, msg, command, owner, dialogue, services, language_code).await;
    }

    // In groups the pending prompt may belong to another member
    let state = dialogue.get().await?.unwrap_or_default();
    match &state {
        BlacklistDialogueState::AwaitingBlacklistTerm {
            language_code: dialogue_lang,
            ..
        } if state.awaits_term_from(owner) => {
            let language_code = dialogue_lang.as_deref().or(language_code);
            handle_awaited_term(bot, msg, text, owner, dialogue, services, language_code).await
        }
        _ if looks_like_barcode(text) => {
            handle_scan(bot, msg.chat.id, owner, text, services, language_code).await
        }
        _ => {
            debug!(user_id = %owner, "Text is neither a command nor a barcode");
            bot.send_message(
                msg.chat.id,
                services.localization.t("unknown-message", language_code),
            )
            .await?;
            Ok(())
        }
    }
}

/// The user answered the "which ingredient?" prompt
///
/// Invalid input keeps the dialogue open so the user can retry.
async fn handle_awaited_term(
    bot: &Bot,
    msg: &Message,
    text: &str,
    owner: OwnerId,
    dialogue: &BlacklistDialogue,
    services: &SharedServices,
    language_code: Option<&str>,
) -> Result<()> {
    match add_term(bot, msg.chat.id, owner, text, services, language_code).await? {
        Some(BlacklistError::EmptyName) | Some(BlacklistError::NameTooLong { .. }) => {
            debug!(user_id = %owner, "Still waiting for a valid blacklist term");
        }
        _ => dialogue.exit().await?,
    }
    Ok(())
}

async fn handle_unsupported_message(
    bot: &Bot,
    msg: &Message,
    services: &SharedServices,
) -> Result<()> {
    let language_code = msg
        .from
        .as_ref()
        .and_then(|user| user.language_code.as_deref());

    debug!(user_id = %msg.chat.id, "Received unsupported message type from user");
    bot.send_message(
        msg.chat.id,
        services.localization.t("unknown-message", language_code),
    )
    .await?;
    Ok(())
}
