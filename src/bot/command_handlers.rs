//! Command Handlers module for processing bot commands

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::{debug, info, warn};

use crate::blacklist::{BlacklistError, OwnerId};
use crate::dialogue::{BlacklistDialogue, BlacklistDialogueState};

use super::scan::{render_scan_outcome, run_scan};
use super::ui_builder::{
    blacklist_error_message, create_blacklist_keyboard, create_clear_confirmation_keyboard,
    format_blacklist,
};
use super::BotServices;

/// A parsed slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Scan(Option<String>),
    Add(Option<String>),
    List,
    Clear,
    Cancel,
    Unknown(String),
}

/// Parse `/command[@BotName] [argument]`; `None` if the text is not a command
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;

    let (head, argument) = match rest.split_once(char::is_whitespace) {
        Some((head, argument)) => (head, Some(argument.trim())),
        None => (rest, None),
    };
    let argument = argument.filter(|a| !a.is_empty()).map(str::to_string);
    let name = head.split('@').next().unwrap_or_default().to_lowercase();

    Some(match name.as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "scan" => Command::Scan(argument),
        "add" => Command::Add(argument),
        "list" => Command::List,
        "clear" => Command::Clear,
        "cancel" => Command::Cancel,
        _ => Command::Unknown(name),
    })
}

/// Dispatch a parsed command
pub async fn handle_command(
    bot: &Bot,
    msg: &Message,
    command: Command,
    owner: OwnerId,
    dialogue: &BlacklistDialogue,
    services: &BotServices,
    language_code: Option<&str>,
) -> Result<()> {
    debug!(user_id = %owner, command = ?command, "Handling command");
    let localization = &services.localization;

    match command {
        Command::Start => {
            bot.send_message(msg.chat.id, localization.t("welcome", language_code))
                .await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, localization.t("help", language_code))
                .await?;
        }
        Command::Scan(None) => {
            bot.send_message(msg.chat.id, localization.t("scan-usage", language_code))
                .await?;
        }
        Command::Scan(Some(barcode)) => {
            handle_scan(bot, msg.chat.id, owner, &barcode, services, language_code).await?;
        }
        Command::Add(None) => {
            dialogue
                .update(BlacklistDialogueState::AwaitingBlacklistTerm {
                    owner,
                    language_code: language_code.map(str::to_string),
                })
                .await?;
            bot.send_message(msg.chat.id, localization.t("add-prompt", language_code))
                .await?;
        }
        Command::Add(Some(term)) => {
            add_term(bot, msg.chat.id, owner, &term, services, language_code).await?;
        }
        Command::List => {
            handle_list(bot, msg.chat.id, owner, services, language_code).await?;
        }
        Command::Clear => {
            handle_clear_request(bot, msg.chat.id, owner, dialogue, services, language_code)
                .await?;
        }
        Command::Cancel => {
            handle_cancel(bot, msg.chat.id, owner, dialogue, services, language_code).await?;
        }
        Command::Unknown(name) => {
            debug!(user_id = %owner, command = %name, "Unknown command");
            bot.send_message(msg.chat.id, localization.t("unknown-message", language_code))
                .await?;
        }
    }
    Ok(())
}

/// Look up a barcode and reply with the verdict
pub async fn handle_scan(
    bot: &Bot,
    chat_id: ChatId,
    owner: OwnerId,
    raw_barcode: &str,
    services: &BotServices,
    language_code: Option<&str>,
) -> Result<()> {
    let outcome = run_scan(services, chat_id, owner, raw_barcode).await;
    if let Some(text) = render_scan_outcome(&outcome, &services.localization, language_code) {
        bot.send_message(chat_id, text).await?;
    }
    Ok(())
}

/// Add a term and report the result
///
/// Returns the rejection reason when the term was not stored.
pub async fn add_term(
    bot: &Bot,
    chat_id: ChatId,
    owner: OwnerId,
    term: &str,
    services: &BotServices,
    language_code: Option<&str>,
) -> Result<Option<BlacklistError>> {
    let localization = &services.localization;
    match services.store.add(owner, term).await {
        Ok(items) => {
            let count = items.len().to_string();
            let name = items.last().map(|item| item.name.as_str()).unwrap_or(term);
            info!(user_id = %owner, items = items.len(), "Blacklist term added");
            bot.send_message(
                chat_id,
                localization.t_args("add-success", &[("name", name), ("count", &count)], language_code),
            )
            .await?;
            Ok(None)
        }
        Err(e) => {
            debug!(user_id = %owner, error = %e, "Blacklist term rejected");
            bot.send_message(chat_id, blacklist_error_message(&e, localization, language_code))
                .await?;
            Ok(Some(e))
        }
    }
}

async fn handle_list(
    bot: &Bot,
    chat_id: ChatId,
    owner: OwnerId,
    services: &BotServices,
    language_code: Option<&str>,
) -> Result<()> {
    let items = services.store.load(owner).await;
    let text = format_blacklist(&items, &services.localization, language_code);

    if items.is_empty() {
        bot.send_message(chat_id, text).await?;
    } else {
        bot.send_message(chat_id, text)
            .reply_markup(create_blacklist_keyboard(
                &items,
                &services.localization,
                language_code,
            ))
            .await?;
    }
    Ok(())
}

/// Abandon the sender's pending step; other members' steps are left alone
async fn handle_cancel(
    bot: &Bot,
    chat_id: ChatId,
    owner: OwnerId,
    dialogue: &BlacklistDialogue,
    services: &BotServices,
    language_code: Option<&str>,
) -> Result<()> {
    let state = dialogue.get().await?.unwrap_or_default();
    let key = if state.owner() == Some(owner) {
        dialogue.exit().await?;
        if let Some(message_id) = state.pending_clear_message() {
            // The confirmation buttons must not outlive the request
            if let Err(e) = bot
                .edit_message_reply_markup(chat_id, MessageId(message_id))
                .await
            {
                warn!(user_id = %owner, error = %e, "Failed to remove clear confirmation keyboard");
            }
        }
        "cancel-done"
    } else {
        "cancel-nothing"
    };
    bot.send_message(chat_id, services.localization.t(key, language_code))
        .await?;
    Ok(())
}

async fn handle_clear_request(
    bot: &Bot,
    chat_id: ChatId,
    owner: OwnerId,
    dialogue: &BlacklistDialogue,
    services: &BotServices,
    language_code: Option<&str>,
) -> Result<()> {
    let localization = &services.localization;
    let items = services.store.load(owner).await;
    if items.is_empty() {
        bot.send_message(chat_id, localization.t("clear-nothing", language_code))
            .await?;
        return Ok(());
    }

    let count = items.len().to_string();
    let sent = bot
        .send_message(
            chat_id,
            localization.t_args("clear-confirm-question", &[("count", &count)], language_code),
        )
        .reply_markup(create_clear_confirmation_keyboard(localization, language_code))
        .await?;

    dialogue
        .update(BlacklistDialogueState::ConfirmingClear {
            owner,
            language_code: language_code.map(str::to_string),
            message_id: Some(sent.id.0),
        })
        .await?;
    Ok(())
}
