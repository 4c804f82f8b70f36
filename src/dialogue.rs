//! Conversation state for multi-step blacklist edits.
//!
//! State is kept per chat, while blacklists belong to users. Every pending
//! step therefore records who started it, and only that user can finish it.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::blacklist::OwnerId;

/// Where a chat is in a multi-step interaction
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlacklistDialogueState {
    #[default]
    Start,
    /// `/add` was sent without a term; the requester's next text is the term
    AwaitingBlacklistTerm {
        owner: OwnerId,
        language_code: Option<String>,
    },
    /// The requester asked to clear the blacklist and must confirm with a button
    ConfirmingClear {
        owner: OwnerId,
        language_code: Option<String>,
        /// Message carrying the confirmation keyboard
        message_id: Option<i32>,
    },
}

/// How to treat a tap on a "confirm clear" button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearConfirmation {
    /// The pending request belongs to this user and this message
    Accepted,
    /// Someone else's request is pending on this message
    NotRequester,
    /// No request is pending for this message anymore
    Expired,
}

impl BlacklistDialogueState {
    /// User who started the pending step, if any
    pub fn owner(&self) -> Option<OwnerId> {
        match self {
            BlacklistDialogueState::Start => None,
            BlacklistDialogueState::AwaitingBlacklistTerm { owner, .. }
            | BlacklistDialogueState::ConfirmingClear { owner, .. } => Some(*owner),
        }
    }

    /// Whether the next text from `sender` should be added as a blacklist term
    pub fn awaits_term_from(&self, sender: OwnerId) -> bool {
        matches!(
            self,
            BlacklistDialogueState::AwaitingBlacklistTerm { owner, .. } if *owner == sender
        )
    }

    /// Decide whether `sender` tapping "confirm" on `message_id` may clear
    pub fn clear_confirmation(&self, sender: OwnerId, message_id: i32) -> ClearConfirmation {
        match self {
            BlacklistDialogueState::ConfirmingClear {
                owner,
                message_id: Some(pending),
                ..
            } if *pending == message_id => {
                if *owner == sender {
                    ClearConfirmation::Accepted
                } else {
                    ClearConfirmation::NotRequester
                }
            }
            _ => ClearConfirmation::Expired,
        }
    }

    /// Confirmation message to strip of its keyboard when the step is abandoned
    pub fn pending_clear_message(&self) -> Option<i32> {
        match self {
            BlacklistDialogueState::ConfirmingClear { message_id, .. } => *message_id,
            _ => None,
        }
    }
}

pub type BlacklistDialogue =
    Dialogue<BlacklistDialogueState, InMemStorage<BlacklistDialogueState>>;
