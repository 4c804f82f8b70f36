//! # Blacklist Persistence
//!
//! The user's blacklist is the ordered list of ingredient names they want to
//! avoid. Storage is behind the [`BlacklistStore`] port so the analyzer and
//! its tests never depend on where or how the list is kept.
//!
//! Every backend stores an owner's whole list as one JSON value under the
//! fixed key [`BLACKLIST_KEY`].
//!
//! ## Backends
//!
//! - [`MemoryBlacklistStore`]: process-local, for tests and throwaway runs
//! - [`crate::file_store::JsonFileBlacklistStore`]: single JSON file on disk
//! - [`crate::db::PgBlacklistStore`]: PostgreSQL key-value table

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::observability;
use crate::validation::{validate_blacklist_term, MAX_BLACKLIST_TERM_LENGTH};

/// Storage key under which a blacklist is kept
pub const BLACKLIST_KEY: &str = "is_it_safe_blacklist";

/// Identifies whose blacklist is read or written (the Telegram user id)
pub type OwnerId = i64;

/// One ingredient the user wants to avoid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistItem {
    pub id: String,
    /// Display name, as typed by the user (trimmed)
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl BlacklistItem {
    /// Create an item with a fresh id and the current timestamp
    ///
    /// No validation happens here; [`add_to_list`] is the validating path.
    pub fn new(name: impl Into<String>) -> Self {
        let created_at = Utc::now();
        Self {
            id: generate_item_id(created_at),
            name: name.into(),
            created_at,
        }
    }
}

/// Millisecond timestamp plus a random suffix, so two adds in the same
/// millisecond still get distinct ids.
fn generate_item_id(created_at: DateTime<Utc>) -> String {
    format!(
        "{}-{:08x}",
        created_at.timestamp_millis(),
        rand::random::<u32>()
    )
}

/// Errors raised by blacklist mutations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlacklistError {
    /// The name was empty after trimming
    EmptyName,
    /// The name exceeds the maximum length
    NameTooLong { max: usize },
    /// A case-insensitive duplicate already exists
    Duplicate(String),
    /// The backend failed to read, write or (de)serialize
    Storage(String),
}

impl BlacklistError {
    /// Localization key for the message shown to the user
    pub fn message_key(&self) -> &'static str {
        match self {
            BlacklistError::EmptyName => "blacklist-empty",
            BlacklistError::NameTooLong { .. } => "blacklist-too-long",
            BlacklistError::Duplicate(_) => "blacklist-duplicate",
            BlacklistError::Storage(_) => "blacklist-storage-error",
        }
    }
}

impl fmt::Display for BlacklistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlacklistError::EmptyName => write!(f, "Please enter an ingredient name"),
            BlacklistError::NameTooLong { max } => {
                write!(f, "Ingredient name cannot be longer than {} characters", max)
            }
            BlacklistError::Duplicate(name) => {
                write!(f, "'{}' is already in your blacklist", name)
            }
            BlacklistError::Storage(msg) => write!(f, "Blacklist storage failed: {}", msg),
        }
    }
}

impl std::error::Error for BlacklistError {}

impl From<serde_json::Error> for BlacklistError {
    fn from(err: serde_json::Error) -> Self {
        BlacklistError::Storage(err.to_string())
    }
}

impl From<sqlx::Error> for BlacklistError {
    fn from(err: sqlx::Error) -> Self {
        BlacklistError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for BlacklistError {
    fn from(err: std::io::Error) -> Self {
        BlacklistError::Storage(err.to_string())
    }
}

/// Persistence port for per-user blacklists
#[async_trait]
pub trait BlacklistStore: Send + Sync {
    /// Short backend name for logs and metrics
    fn backend_name(&self) -> &'static str;

    /// Load the owner's blacklist in insertion order
    ///
    /// Never fails: a missing value or any internal error yields an empty list.
    async fn load(&self, owner: OwnerId) -> Vec<BlacklistItem>;

    /// Validate and append a new item, returning the updated list
    async fn add(&self, owner: OwnerId, name: &str) -> Result<Vec<BlacklistItem>, BlacklistError>;

    /// Remove the item with the given id, returning the updated list
    ///
    /// Removing an unknown id leaves the list unchanged.
    async fn remove(&self, owner: OwnerId, id: &str)
        -> Result<Vec<BlacklistItem>, BlacklistError>;

    /// Delete the owner's whole blacklist
    async fn clear(&self, owner: OwnerId) -> Result<(), BlacklistError>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> Result<(), BlacklistError>;
}

/// Decode a stored JSON value; absent means an empty list
pub fn decode_blacklist(raw: Option<&str>) -> Result<Vec<BlacklistItem>, BlacklistError> {
    match raw {
        None => Ok(Vec::new()),
        Some(json) => Ok(serde_json::from_str(json)?),
    }
}

/// Encode a list as the single JSON value stored under [`BLACKLIST_KEY`]
pub fn encode_blacklist(items: &[BlacklistItem]) -> Result<String, BlacklistError> {
    Ok(serde_json::to_string(items)?)
}

/// Validate `name` against `current` and append it
///
/// The name is trimmed, must be non-empty and at most
/// [`MAX_BLACKLIST_TERM_LENGTH`] characters, and must not equal an existing
/// name ignoring case.
pub fn add_to_list(
    mut current: Vec<BlacklistItem>,
    name: &str,
) -> Result<Vec<BlacklistItem>, BlacklistError> {
    let trimmed = match validate_blacklist_term(name) {
        Ok(trimmed) => trimmed,
        Err("blacklist-too-long") => {
            return Err(BlacklistError::NameTooLong {
                max: MAX_BLACKLIST_TERM_LENGTH,
            })
        }
        Err(_) => return Err(BlacklistError::EmptyName),
    };

    let lowered = trimmed.to_lowercase();
    if let Some(existing) = current
        .iter()
        .find(|item| item.name.trim().to_lowercase() == lowered)
    {
        return Err(BlacklistError::Duplicate(existing.name.clone()));
    }

    current.push(BlacklistItem::new(trimmed));
    Ok(current)
}

/// Drop the item with `id` from `current`
pub fn remove_from_list(mut current: Vec<BlacklistItem>, id: &str) -> Vec<BlacklistItem> {
    current.retain(|item| item.id != id);
    current
}

/// In-process blacklist store
///
/// Keeps each owner's encoded JSON value in a map, so it goes through the
/// same serialization as the persistent backends.
#[derive(Debug, Default)]
pub struct MemoryBlacklistStore {
    values: Mutex<HashMap<OwnerId, String>>,
}

impl MemoryBlacklistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the raw stored value for an owner
    pub fn insert_raw(&self, owner: OwnerId, raw: impl Into<String>) {
        self.values.lock().insert(owner, raw.into());
    }

    /// Raw stored value for an owner, if any
    pub fn raw_value(&self, owner: OwnerId) -> Option<String> {
        self.values.lock().get(&owner).cloned()
    }

    fn update<F>(&self, owner: OwnerId, operation: &str, f: F) -> Result<Vec<BlacklistItem>, BlacklistError>
    where
        F: FnOnce(Vec<BlacklistItem>) -> Result<Vec<BlacklistItem>, BlacklistError>,
    {
        let start = Instant::now();
        let mut values = self.values.lock();
        let result = decode_blacklist(values.get(&owner).map(String::as_str))
            .and_then(f)
            .and_then(|updated| {
                values.insert(owner, encode_blacklist(&updated)?);
                Ok(updated)
            });
        observability::record_blacklist_operation(operation, result.is_ok(), start.elapsed());
        result
    }
}

#[async_trait]
impl BlacklistStore for MemoryBlacklistStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, owner: OwnerId) -> Vec<BlacklistItem> {
        let values = self.values.lock();
        match decode_blacklist(values.get(&owner).map(String::as_str)) {
            Ok(items) => items,
            Err(e) => {
                warn!(owner_id = %owner, error = %e, "Failed to decode blacklist, using empty list");
                Vec::new()
            }
        }
    }

    async fn add(&self, owner: OwnerId, name: &str) -> Result<Vec<BlacklistItem>, BlacklistError> {
        debug!(owner_id = %owner, "Adding blacklist item");
        self.update(owner, "add", |current| add_to_list(current, name))
    }

    async fn remove(
        &self,
        owner: OwnerId,
        id: &str,
    ) -> Result<Vec<BlacklistItem>, BlacklistError> {
        debug!(owner_id = %owner, item_id = %id, "Removing blacklist item");
        self.update(owner, "remove", |current| Ok(remove_from_list(current, id)))
    }

    async fn clear(&self, owner: OwnerId) -> Result<(), BlacklistError> {
        debug!(owner_id = %owner, "Clearing blacklist");
        self.values.lock().remove(&owner);
        observability::record_blacklist_operation("clear", true, std::time::Duration::ZERO);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), BlacklistError> {
        Ok(())
    }
}
