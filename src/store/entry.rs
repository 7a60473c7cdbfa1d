//! Stored Value Module
//!
//! Entries held by the in-memory backend: a serialized payload plus the
//! instant it stops being visible.

// == Stored Value ==
/// A serialized payload with an absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    /// Serialized payload
    pub value: String,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl StoredValue {
    // == Constructor ==
    /// Creates an entry that expires `ttl_secs` after `now_ms`.
    pub fn new(value: String, ttl_secs: u64, now_ms: u64) -> Self {
        Self {
            value,
            expires_at: now_ms.saturating_add(ttl_secs.saturating_mul(1000)),
        }
    }

    // == Is Expired ==
    /// An entry is expired once `now_ms` reaches its expiration time.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// Remaining lifetime in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }
}

// == Window Log ==
/// Admission timestamps for one rate-limit identifier, oldest first.
#[derive(Debug, Clone, Default)]
pub struct WindowLog {
    pub hits: std::collections::VecDeque<u64>,
    pub window_ms: u64,
}

impl WindowLog {
    /// Drops admissions that fell out of the trailing window ending at `now_ms`.
    pub fn slide(&mut self, now_ms: u64) {
        let floor = now_ms.saturating_sub(self.window_ms);
        while matches!(self.hits.front(), Some(&t) if t <= floor) {
            self.hits.pop_front();
        }
    }

    /// True when nothing admitted is left inside the window.
    pub fn is_idle_at(&self, now_ms: u64) -> bool {
        match self.hits.back() {
            Some(&newest) => newest.saturating_add(self.window_ms) <= now_ms,
            None => true,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_expiration_boundary() {
        let entry = StoredValue::new("v".to_string(), 60, 1_000);

        assert_eq!(entry.expires_at, 61_000);
        assert!(!entry.is_expired_at(60_999));
        assert!(entry.is_expired_at(61_000), "Entry should be expired at boundary");
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = StoredValue::new("v".to_string(), 10, 0);

        assert_eq!(entry.ttl_remaining_ms(4_000), 6_000);
        assert_eq!(entry.ttl_remaining_ms(20_000), 0);
    }

    #[test]
    fn test_window_slide_drops_old_hits() {
        let mut log = WindowLog {
            hits: [1_000, 2_000, 30_000].into_iter().collect(),
            window_ms: 10_000,
        };

        log.slide(12_000);

        assert_eq!(log.hits.len(), 1);
        assert_eq!(log.hits.front(), Some(&30_000));
    }

    #[test]
    fn test_window_idle() {
        let log = WindowLog {
            hits: [5_000].into_iter().collect(),
            window_ms: 1_000,
        };

        assert!(!log.is_idle_at(5_500));
        assert!(log.is_idle_at(6_000));
        assert!(WindowLog::default().is_idle_at(0));
    }
}
