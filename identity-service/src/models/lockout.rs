//! Lockout state model - failed-attempt tracking per identifier.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Lockout state entity, keyed by login identifier (email).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LockoutState {
    pub identifier: String,
    pub failed_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub updated_utc: DateTime<Utc>,
}

impl LockoutState {
    /// Check if the identifier is currently locked. A past `locked_until`
    /// reads as open without requiring a write.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.map(|until| until > now).unwrap_or(false)
    }
}

/// Escalation policy: failures beyond `threshold` lock the identifier for
/// an exponentially growing window, capped at `cap_seconds`.
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    pub threshold: u32,
    pub base_seconds: i64,
    pub cap_seconds: i64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: 5,
            base_seconds: 60,
            cap_seconds: 3600,
        }
    }
}

impl LockoutPolicy {
    /// Lock duration after `failed_attempts` consecutive failures.
    /// Returns `None` while the count has not exceeded the threshold.
    pub fn backoff_seconds(&self, failed_attempts: u32) -> Option<i64> {
        if failed_attempts <= self.threshold {
            return None;
        }
        let excess = (failed_attempts - self.threshold - 1).min(20);
        Some(
            self.base_seconds
                .saturating_mul(1i64 << excess)
                .min(self.cap_seconds),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_backoff_starts_above_threshold() {
        let policy = LockoutPolicy::default();

        assert_eq!(policy.backoff_seconds(5), None);
        assert_eq!(policy.backoff_seconds(6), Some(60));
        assert_eq!(policy.backoff_seconds(7), Some(120));
        assert_eq!(policy.backoff_seconds(8), Some(240));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = LockoutPolicy::default();

        assert_eq!(policy.backoff_seconds(12), Some(3600));
        assert_eq!(policy.backoff_seconds(40), Some(3600));
    }

    #[test]
    fn test_expired_lock_reads_as_open() {
        let state = LockoutState {
            identifier: "user@example.com".to_string(),
            failed_attempts: 6,
            locked_until: Some(Utc::now() - Duration::seconds(1)),
            updated_utc: Utc::now(),
        };

        assert!(!state.is_locked(Utc::now()));
    }
}
