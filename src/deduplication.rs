//! # Scan Deduplication Module
//!
//! Prevents the same barcode from being looked up twice in quick
//! succession for one chat, e.g. when a user taps send twice or Telegram
//! redelivers an update.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use teloxide::types::ChatId;

/// Identifies one scan request
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct ScanKey {
    pub chat_id: ChatId,
    pub barcode: String,
}

impl ScanKey {
    pub fn new(chat_id: ChatId, barcode: impl Into<String>) -> Self {
        Self {
            chat_id,
            barcode: barcode.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct ScanEntry {
    first_seen: Instant,
    count: u32,
}

/// In-memory scan deduplication store
#[derive(Debug)]
pub struct ScanDeduplicator {
    scans: Mutex<HashMap<ScanKey, ScanEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl ScanDeduplicator {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            scans: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Check if a scan is a duplicate
    ///
    /// Returns true if the same chat scanned the same barcode within the TTL
    /// window and the scan should be ignored. A zero TTL disables
    /// deduplication.
    pub fn is_duplicate(&self, key: &ScanKey) -> bool {
        if self.ttl.is_zero() {
            return false;
        }

        let mut scans = self.scans.lock();
        let now = Instant::now();

        scans.retain(|_, entry| now.duration_since(entry.first_seen) < self.ttl);

        if let Some(entry) = scans.get_mut(key) {
            entry.count += 1;
            return true;
        }

        if scans.len() >= self.max_entries {
            if let Some(oldest_key) = scans
                .iter()
                .min_by_key(|(_, entry)| entry.first_seen)
                .map(|(key, _)| key.clone())
            {
                scans.remove(&oldest_key);
            }
        }

        scans.insert(
            key.clone(),
            ScanEntry {
                first_seen: now,
                count: 1,
            },
        );
        false
    }

    pub fn stats(&self) -> DeduplicationStats {
        let scans = self.scans.lock();
        let now = Instant::now();

        let total_entries = scans.len();
        let expired_entries = scans
            .values()
            .filter(|entry| now.duration_since(entry.first_seen) >= self.ttl)
            .count();

        DeduplicationStats {
            total_entries,
            active_entries: total_entries.saturating_sub(expired_entries),
            expired_entries,
            total_duplicates: scans.values().map(|entry| entry.count.saturating_sub(1)).sum(),
            max_entries: self.max_entries,
            ttl: self.ttl,
        }
    }

    pub fn clear(&self) {
        self.scans.lock().clear();
    }
}

/// Statistics about the deduplication system
#[derive(Debug, Clone)]
pub struct DeduplicationStats {
    /// Total number of entries currently stored
    pub total_entries: usize,
    /// Number of active (non-expired) entries
    pub active_entries: usize,
    /// Expired entries, dropped on the next check
    pub expired_entries: usize,
    /// Total number of duplicate scans detected
    pub total_duplicates: u32,
    pub max_entries: usize,
    pub ttl: Duration,
}

impl Default for ScanDeduplicator {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 10_000)
    }
}

pub type SharedDeduplicator = Arc<ScanDeduplicator>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_same_chat_same_barcode_is_duplicate() {
        let dedup = ScanDeduplicator::new(Duration::from_secs(60), 100);
        let key = ScanKey::new(ChatId(123), "3017620422003");

        assert!(!dedup.is_duplicate(&key));
        assert!(dedup.is_duplicate(&key));

        // Other barcode or other chat is a fresh scan
        assert!(!dedup.is_duplicate(&ScanKey::new(ChatId(123), "5449000000996")));
        assert!(!dedup.is_duplicate(&ScanKey::new(ChatId(456), "3017620422003")));
    }

    #[test]
    fn test_expiration() {
        let dedup = ScanDeduplicator::new(Duration::from_millis(30), 100);
        let key = ScanKey::new(ChatId(1), "12345678");

        assert!(!dedup.is_duplicate(&key));
        thread::sleep(Duration::from_millis(60));
        assert!(!dedup.is_duplicate(&key));
    }

    #[test]
    fn test_zero_ttl_disables_deduplication() {
        let dedup = ScanDeduplicator::new(Duration::ZERO, 100);
        let key = ScanKey::new(ChatId(1), "12345678");

        assert!(!dedup.is_duplicate(&key));
        assert!(!dedup.is_duplicate(&key));
    }

    #[test]
    fn test_max_entries_limit() {
        let dedup = ScanDeduplicator::new(Duration::from_secs(300), 3);
        for i in 0..4 {
            assert!(!dedup.is_duplicate(&ScanKey::new(ChatId(i), "12345678")));
        }
        assert!(dedup.stats().total_entries <= 3);
    }

    #[test]
    fn test_statistics_and_clear() {
        let dedup = ScanDeduplicator::default();
        let key = ScanKey::new(ChatId(7), "12345678");

        assert!(!dedup.is_duplicate(&key));
        assert!(dedup.is_duplicate(&key));

        let stats = dedup.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.active_entries, 1);
        assert_eq!(stats.total_duplicates, 1);
        assert_eq!(stats.ttl, Duration::from_secs(5));

        dedup.clear();
        assert_eq!(dedup.stats().total_entries, 0);
        assert!(!dedup.is_duplicate(&key));
    }
}
