//! Lockout guard - failed-attempt tracking with escalating backoff.

use chrono::Utc;
use std::sync::Arc;

use crate::models::{LockoutPolicy, LockoutState, TokenPurpose};
use crate::services::ServiceError;
use crate::store::IdentityStore;

#[derive(Clone)]
pub struct LockoutService {
    store: Arc<dyn IdentityStore>,
    policy: LockoutPolicy,
}

impl LockoutService {
    pub fn new(store: Arc<dyn IdentityStore>, policy: LockoutPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Pre-check used by the authenticator. Callers must not surface the
    /// result distinctly from a wrong password.
    pub async fn is_locked(&self, identifier: &str) -> Result<bool, ServiceError> {
        Ok(self
            .store
            .find_lockout_state(identifier)
            .await?
            .map(|s| s.is_locked(Utc::now()))
            .unwrap_or(false))
    }

    /// Record one failed attempt; the store increments atomically.
    pub async fn record_failure(&self, identifier: &str) -> Result<LockoutState, ServiceError> {
        let state = self
            .store
            .record_lockout_failure(identifier, &self.policy)
            .await?;

        if state.is_locked(Utc::now()) {
            tracing::warn!(
                failed_attempts = state.failed_attempts,
                "Account locked after repeated failures"
            );
        }

        Ok(state)
    }

    /// Did this failure cross the threshold for the first time in the
    /// current streak?
    pub fn just_locked(&self, state: &LockoutState) -> bool {
        state.failed_attempts as u32 == self.policy.threshold + 1
    }

    /// Reset the counter and clear any lock.
    pub async fn record_success(&self, identifier: &str) -> Result<(), ServiceError> {
        Ok(self.store.clear_lockout_state(identifier).await?)
    }

    /// Administrative unlock: clears the lock and invalidates any
    /// outstanding unlock tokens for the identity.
    pub async fn admin_unlock(&self, identifier: &str) -> Result<(), ServiceError> {
        self.store.clear_lockout_state(identifier).await?;
        let invalidated = self
            .store
            .delete_security_tokens(TokenPurpose::AccountUnlock, identifier)
            .await?;

        tracing::info!(invalidated, "Account administratively unlocked");

        Ok(())
    }
}
