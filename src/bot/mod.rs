//! Bot module for handling Telegram interactions
//!
//! - `message_handler`: text messages, commands and dialogue input
//! - `callback_handler`: inline keyboard buttons
//! - `command_handlers`: slash command parsing and handling
//! - `scan`: barcode lookup and analysis flow
//! - `ui_builder`: keyboards and message formatting

pub mod callback_handler;
pub mod command_handlers;
pub mod message_handler;
pub mod scan;
pub mod ui_builder;

use std::sync::Arc;

use teloxide::types::Message;

use crate::blacklist::{BlacklistStore, OwnerId};
use crate::deduplication::SharedDeduplicator;
use crate::localization::SharedLocalization;
use crate::lookup::ProductLookup;

/// Shared dependencies of every handler
pub struct BotServices {
    pub store: Arc<dyn BlacklistStore>,
    pub lookup: Arc<dyn ProductLookup>,
    pub localization: SharedLocalization,
    pub deduplicator: SharedDeduplicator,
}

impl std::fmt::Debug for BotServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotServices")
            .field("store", &self.store.backend_name())
            .field("localization", &self.localization)
            .field("deduplicator", &self.deduplicator)
            .finish_non_exhaustive()
    }
}

pub type SharedServices = Arc<BotServices>;

/// Whose blacklist a message refers to: the sender, else the chat
pub fn owner_from_message(msg: &Message) -> OwnerId {
    msg.from
        .as_ref()
        .map(|user| user.id.0 as OwnerId)
        .unwrap_or(msg.chat.id.0)
}

pub use callback_handler::callback_handler;
pub use message_handler::message_handler;
pub use ui_builder::format_analysis_result;
