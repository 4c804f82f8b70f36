//! Callback Handler module for processing inline keyboard callback queries

use std::time::Instant;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{MaybeInaccessibleMessage, MessageId};
use tracing::{debug, warn, Instrument};

use crate::blacklist::OwnerId;
use crate::dialogue::{BlacklistDialogue, BlacklistDialogueState, ClearConfirmation};
use crate::errors::error_logging;
use crate::observability;

use super::ui_builder::{
    blacklist_error_message, create_blacklist_keyboard, create_clear_confirmation_keyboard,
    format_blacklist, parse_callback_data, CallbackAction,
};
use super::SharedServices;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dialogue: BlacklistDialogue,
    services: SharedServices,
) -> Result<()> {
    let owner = q.from.id.0 as OwnerId;
    let span = observability::telegram_span("callback_handler", Some(owner));

    async move {
        let start_time = Instant::now();
        observability::record_telegram_message("callback");

        let data = q.data.as_deref().unwrap_or_default();
        let language_code = q.from.language_code.as_deref();

        let result = match (parse_callback_data(data), message_location(&q)) {
            (Some(action), Some((chat_id, message_id))) => {
                debug!(user_id = %owner, action = ?action, "Handling callback");
                handle_action(
                    &bot,
                    action,
                    CallbackTarget {
                        owner,
                        chat_id,
                        message_id,
                    },
                    &dialogue,
                    &services,
                    language_code,
                )
                .await
            }
            _ => {
                warn!(user_id = %owner, data = %data, "Ignoring callback without action or message");
                Ok(None)
            }
        };

        let mut answer = bot.answer_callback_query(q.id.clone());
        if let Ok(Some(text)) = &result {
            answer = answer.text(text.clone());
        }
        answer.await?;

        if let Err(e) = &result {
            error_logging::log_internal_error(e, "telegram", "callback_handler", Some(owner));
        }
        let status = if result.is_ok() { 200 } else { 500 };
        observability::record_request_metrics("telegram_callback", status, start_time.elapsed());
        result.map(|_| ())
    }
    .instrument(span)
    .await
}

/// Message carrying the keyboard that was tapped
#[derive(Debug, Clone, Copy)]
struct CallbackTarget {
    owner: OwnerId,
    chat_id: ChatId,
    message_id: MessageId,
}

fn message_location(q: &CallbackQuery) -> Option<(ChatId, MessageId)> {
    match q.message.as_ref()? {
        MaybeInaccessibleMessage::Regular(msg) => Some((msg.chat.id, msg.id)),
        MaybeInaccessibleMessage::Inaccessible(msg) => Some((msg.chat.id, msg.message_id)),
    }
}

/// Apply an action; returns an optional toast text for the callback answer
async fn handle_action(
    bot: &Bot,
    action: CallbackAction,
    target: CallbackTarget,
    dialogue: &BlacklistDialogue,
    services: &SharedServices,
    language_code: Option<&str>,
) -> Result<Option<String>> {
    let localization = &services.localization;

    match action {
        CallbackAction::Remove(id) => match services.store.remove(target.owner, &id).await {
            Ok(items) => {
                show_blacklist(bot, target, &items, services, language_code).await?;
                let count = items.len().to_string();
                Ok(Some(localization.t_args(
                    "remove-success",
                    &[("count", &count)],
                    language_code,
                )))
            }
            Err(e) => Ok(Some(blacklist_error_message(&e, localization, language_code))),
        },
        CallbackAction::ClearRequest => {
            let items = services.store.load(target.owner).await;
            if items.is_empty() {
                show_blacklist(bot, target, &items, services, language_code).await?;
                return Ok(Some(localization.t("clear-nothing", language_code)));
            }
            let count = items.len().to_string();
            bot.edit_message_text(
                target.chat_id,
                target.message_id,
                localization.t_args("clear-confirm-question", &[("count", &count)], language_code),
            )
            .reply_markup(create_clear_confirmation_keyboard(localization, language_code))
            .await?;
            dialogue
                .update(BlacklistDialogueState::ConfirmingClear {
                    owner: target.owner,
                    language_code: language_code.map(str::to_string),
                    message_id: Some(target.message_id.0),
                })
                .await?;
            Ok(None)
        }
        CallbackAction::ClearConfirm => {
            let state = dialogue.get().await?.unwrap_or_default();
            match state.clear_confirmation(target.owner, target.message_id.0) {
                ClearConfirmation::Accepted => {
                    dialogue.exit().await?;
                    let text = match services.store.clear(target.owner).await {
                        Ok(()) => localization.t("clear-success", language_code),
                        Err(e) => blacklist_error_message(&e, localization, language_code),
                    };
                    bot.edit_message_text(target.chat_id, target.message_id, text)
                        .await?;
                    Ok(None)
                }
                ClearConfirmation::NotRequester => {
                    Ok(Some(localization.t("clear-not-yours", language_code)))
                }
                ClearConfirmation::Expired => {
                    debug!(user_id = %target.owner, "Stale clear confirmation ignored");
                    expire_confirmation(bot, target, services, language_code).await
                }
            }
        }
        CallbackAction::ClearCancel => {
            let state = dialogue.get().await?.unwrap_or_default();
            match state.clear_confirmation(target.owner, target.message_id.0) {
                ClearConfirmation::Accepted => {
                    dialogue.exit().await?;
                    bot.edit_message_text(
                        target.chat_id,
                        target.message_id,
                        localization.t("clear-cancelled", language_code),
                    )
                    .await?;
                    Ok(None)
                }
                ClearConfirmation::NotRequester => {
                    Ok(Some(localization.t("clear-not-yours", language_code)))
                }
                ClearConfirmation::Expired => {
                    expire_confirmation(bot, target, services, language_code).await
                }
            }
        }
    }
}

/// Replace a confirmation that no longer matches a pending request
///
/// Editing the text drops the keyboard, so the old buttons cannot be tapped again.
async fn expire_confirmation(
    bot: &Bot,
    target: CallbackTarget,
    services: &SharedServices,
    language_code: Option<&str>,
) -> Result<Option<String>> {
    let text = services.localization.t("clear-expired", language_code);
    bot.edit_message_text(target.chat_id, target.message_id, text.clone())
        .await?;
    Ok(Some(text))
}

/// Redraw the blacklist view in place
async fn show_blacklist(
    bot: &Bot,
    target: CallbackTarget,
    items: &[crate::blacklist::BlacklistItem],
    services: &SharedServices,
    language_code: Option<&str>,
) -> Result<()> {
    let text = format_blacklist(items, &services.localization, language_code);
    bot.edit_message_text(target.chat_id, target.message_id, text)
        .reply_markup(create_blacklist_keyboard(
            items,
            &services.localization,
            language_code,
        ))
        .await?;
    Ok(())
}
