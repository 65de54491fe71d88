use crate::url::normalize_bookmark_key;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub args: String,
    pub last_accessed: u64,
    pub search_tokens: Vec<serde_json::Value>,
}

/// Whether recording a search created a history entry or refreshed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkOutcome {
    Created,
    Refreshed,
}

/// Recently run searches, deduplicated by their normalized arguments.
/// The least recently accessed entry is evicted once full.
pub struct BookmarkHistory {
    entries: LruCache<String, Bookmark>,
}

impl BookmarkHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn record(&mut self, args: &str, search_tokens: Vec<serde_json::Value>) -> BookmarkOutcome {
        self.record_at(args, search_tokens, now_millis())
    }

    pub fn record_at(
        &mut self,
        args: &str,
        search_tokens: Vec<serde_json::Value>,
        now: u64,
    ) -> BookmarkOutcome {
        let key = normalize_bookmark_key(args);
        if let Some(existing) = self.entries.get_mut(&key) {
            existing.last_accessed = now;
            debug!(args = %key, "refreshed bookmark");
            return BookmarkOutcome::Refreshed;
        }
        debug!(args = %key, "created bookmark");
        self.entries.put(
            key.clone(),
            Bookmark {
                args: key,
                last_accessed: now,
                search_tokens,
            },
        );
        BookmarkOutcome::Created
    }

    pub fn get(&self, args: &str) -> Option<&Bookmark> {
        self.entries.peek(&normalize_bookmark_key(args))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered from most to least recently accessed.
    pub fn recent(&self) -> Vec<&Bookmark> {
        self.entries.iter().map(|(_, bookmark)| bookmark).collect()
    }
}

impl Default for BookmarkHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
