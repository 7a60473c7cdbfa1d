//! In-Memory Store Module
//!
//! HashMap-backed implementation of [`KeyValueStore`] with per-entry expiry and
//! per-identifier admission logs. A single mutex makes every operation atomic.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::error::StoreResult;
use crate::store::{KeyValueStore, StoredValue, WindowCount, WindowLog};

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, StoredValue>,
    windows: HashMap<String, WindowLog>,
}

// == Memory Store ==
/// In-process key-value store.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    // == Constructor ==
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            clock,
        }
    }

    // == Purge Expired ==
    /// Removes expired entries and idle admission logs.
    ///
    /// Returns the number of cache entries removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;

        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired_at(now));
        state.windows.retain(|_, log| !log.is_idle_at(now));

        before - state.entries.len()
    }

    /// Number of stored entries, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;

        match state.entries.get(key) {
            Some(entry) if entry.is_expired_at(now) => {
                state.entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<()> {
        let now = self.clock.now_ms();
        let entry = StoredValue::new(value.to_string(), ttl_secs, now);
        self.state.lock().await.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let now = self.clock.now_ms();
        let removed = self.state.lock().await.entries.remove(key);
        Ok(matches!(removed, Some(entry) if !entry.is_expired_at(now)))
    }

    async fn delete_matching(&self, pattern: &str) -> StoreResult<usize> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().await;

        let matching: Vec<String> = state
            .entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();

        let mut removed = 0;
        for key in matching {
            if let Some(entry) = state.entries.remove(&key) {
                if !entry.is_expired_at(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn sliding_window(
        &self,
        key: &str,
        limit: u64,
        window_ms: u64,
        now_ms: u64,
    ) -> StoreResult<WindowCount> {
        let mut state = self.state.lock().await;
        let log = state.windows.entry(key.to_string()).or_default();
        log.window_ms = window_ms;
        log.slide(now_ms);

        let admitted = (log.hits.len() as u64) < limit;
        if admitted {
            log.hits.push_back(now_ms);
        }

        Ok(WindowCount {
            admitted,
            count: log.hits.len() as u64,
            oldest_ms: log.hits.front().copied().unwrap_or(now_ms),
        })
    }
}

// == Glob Matching ==
/// Matches `text` against a glob pattern supporting `*` and `?`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<usize> = None;
    let mut resume = 0;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            resume = t;
            p += 1;
        } else if let Some(s) = star {
            p = s + 1;
            resume += 1;
            t = resume;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}
