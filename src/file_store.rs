//! JSON file backend for the blacklist store.
//!
//! The file holds one object mapping each owner to its key-value entries:
//!
//! ```json
//! { "12345": { "is_it_safe_blacklist": "[{\"id\":\"...\",\"name\":\"Milk\",...}]" } }
//! ```
//!
//! Writes go to a sibling temp file which is then renamed over the original.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn, Instrument};

use crate::blacklist::{
    add_to_list, decode_blacklist, encode_blacklist, remove_from_list, BlacklistError,
    BlacklistItem, BlacklistStore, OwnerId, BLACKLIST_KEY,
};
use crate::errors::error_logging;
use crate::observability;

type FileContents = BTreeMap<String, BTreeMap<String, String>>;

/// Blacklist store persisted in a single JSON file
#[derive(Debug)]
pub struct JsonFileBlacklistStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonFileBlacklistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_contents(&self) -> Result<FileContents, BlacklistError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(FileContents::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileContents::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_contents(&self, contents: &FileContents) -> Result<(), BlacklistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, serde_json::to_string_pretty(contents)?).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    async fn update<F>(
        &self,
        owner: OwnerId,
        operation: &str,
        f: F,
    ) -> Result<Vec<BlacklistItem>, BlacklistError>
    where
        F: FnOnce(Vec<BlacklistItem>) -> Result<Vec<BlacklistItem>, BlacklistError> + Send,
    {
        let span = observability::storage_span(operation, self.backend_name());
        let start = Instant::now();

        let result = async {
            let _guard = self.lock.lock().await;
            let mut contents = self.read_contents().await?;
            let owner_key = owner.to_string();
            let current = decode_blacklist(
                contents
                    .get(&owner_key)
                    .and_then(|entries| entries.get(BLACKLIST_KEY))
                    .map(String::as_str),
            )?;
            let updated = f(current)?;
            contents
                .entry(owner_key)
                .or_default()
                .insert(BLACKLIST_KEY.to_string(), encode_blacklist(&updated)?);
            self.write_contents(&contents).await?;
            Ok::<_, BlacklistError>(updated)
        }
        .instrument(span)
        .await;

        if let Err(e @ BlacklistError::Storage(_)) = &result {
            error_logging::log_storage_error(e, operation, Some(owner), self.backend_name());
        }
        observability::record_blacklist_operation(operation, result.is_ok(), start.elapsed());
        result
    }
}

#[async_trait]
impl BlacklistStore for JsonFileBlacklistStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn load(&self, owner: OwnerId) -> Vec<BlacklistItem> {
        let _guard = self.lock.lock().await;
        let loaded = self.read_contents().await.and_then(|contents| {
            decode_blacklist(
                contents
                    .get(&owner.to_string())
                    .and_then(|entries| entries.get(BLACKLIST_KEY))
                    .map(String::as_str),
            )
        });
        match loaded {
            Ok(items) => {
                debug!(owner_id = %owner, items = items.len(), "Blacklist loaded from file");
                items
            }
            Err(e) => {
                warn!(owner_id = %owner, path = %self.path.display(), error = %e, "Failed to load blacklist, using empty list");
                Vec::new()
            }
        }
    }

    async fn add(&self, owner: OwnerId, name: &str) -> Result<Vec<BlacklistItem>, BlacklistError> {
        let name = name.to_string();
        self.update(owner, "add", move |current| add_to_list(current, &name))
            .await
    }

    async fn remove(
        &self,
        owner: OwnerId,
        id: &str,
    ) -> Result<Vec<BlacklistItem>, BlacklistError> {
        let id = id.to_string();
        self.update(owner, "remove", move |current| Ok(remove_from_list(current, &id)))
            .await
    }

    async fn clear(&self, owner: OwnerId) -> Result<(), BlacklistError> {
        let start = Instant::now();
        let result = async {
            let _guard = self.lock.lock().await;
            let mut contents = self.read_contents().await?;
            let owner_key = owner.to_string();
            let emptied = match contents.get_mut(&owner_key) {
                Some(entries) => {
                    entries.remove(BLACKLIST_KEY);
                    entries.is_empty()
                }
                None => return Ok(()),
            };
            if emptied {
                contents.remove(&owner_key);
            }
            self.write_contents(&contents).await
        }
        .await;

        if let Err(e) = &result {
            error_logging::log_storage_error(e, "clear", Some(owner), self.backend_name());
        }
        observability::record_blacklist_operation("clear", result.is_ok(), start.elapsed());
        result
    }

    async fn health_check(&self) -> Result<(), BlacklistError> {
        let _guard = self.lock.lock().await;
        self.read_contents().await.map(|_| ())
    }
}
