mod common;

use chrono::Utc;
use common::TestHarness;
use identity_service::config::SessionStrategy;
use identity_service::models::LockoutPolicy;
use identity_service::services::{SentEmailKind, ServiceError};
use identity_service::store::IdentityStore;

const EMAIL: &str = "locked@example.com";

#[tokio::test]
async fn test_threshold_failures_lock_the_identifier() {
    let h = TestHarness::new();

    for _ in 0..5 {
        h.lockout.record_failure(EMAIL).await.unwrap();
    }
    assert!(!h.lockout.is_locked(EMAIL).await.unwrap());

    // The sixth failure exceeds the threshold of five.
    h.lockout.record_failure(EMAIL).await.unwrap();
    assert!(h.lockout.is_locked(EMAIL).await.unwrap());
}

#[tokio::test]
async fn test_correct_password_still_fails_while_locked() {
    let h = TestHarness::new();
    h.seed_user(EMAIL, Some("correct-horse")).await;

    for _ in 0..6 {
        let result = h.auth.authenticate(EMAIL, "wrong-password").await;
        assert!(matches!(result, Err(ServiceError::InvalidCredentials)));
    }
    assert!(h.lockout.is_locked(EMAIL).await.unwrap());

    // Same generic failure as a bad password; nothing reveals the lock.
    let result = h.auth.authenticate(EMAIL, "correct-horse").await;
    assert!(matches!(result, Err(ServiceError::InvalidCredentials)));
}

#[tokio::test]
async fn test_success_resets_counter_and_clears_lock() {
    let h = TestHarness::new();
    h.seed_user(EMAIL, Some("correct-horse")).await;

    for _ in 0..6 {
        let _ = h.auth.authenticate(EMAIL, "wrong-password").await;
    }
    assert!(h.lockout.is_locked(EMAIL).await.unwrap());

    h.lockout.record_success(EMAIL).await.unwrap();

    let state = h.store.find_lockout_state(EMAIL).await.unwrap().unwrap();
    assert_eq!(state.failed_attempts, 0);
    assert!(state.locked_until.is_none());

    let user = h.auth.authenticate(EMAIL, "correct-horse").await.unwrap();
    assert_eq!(user.email, EMAIL);
}

#[tokio::test]
async fn test_backoff_escalates_and_never_shortens() {
    let h = TestHarness::new();

    let mut sixth = None;
    for i in 1..=7 {
        let state = h.lockout.record_failure(EMAIL).await.unwrap();
        if i == 6 {
            sixth = state.locked_until;
        } else if i == 7 {
            let seventh = state.locked_until.unwrap();
            let sixth = sixth.unwrap();
            assert!(seventh >= sixth);

            // Second lock window is roughly twice the first (60s -> 120s).
            let now = Utc::now();
            let remaining = (seventh - now).num_seconds();
            assert!((110..=125).contains(&remaining), "remaining {}", remaining);
        }
    }
}

#[tokio::test]
async fn test_lock_expires_passively() {
    // A zero-length window locks and immediately reads as open again,
    // with no unlocking write in between.
    let policy = LockoutPolicy {
        threshold: 1,
        base_seconds: 0,
        cap_seconds: 0,
    };
    let h = TestHarness::with_options(SessionStrategy::Jwt, policy);

    h.lockout.record_failure(EMAIL).await.unwrap();
    let state = h.lockout.record_failure(EMAIL).await.unwrap();
    assert!(state.locked_until.is_some());

    assert!(!h.lockout.is_locked(EMAIL).await.unwrap());
}

#[tokio::test]
async fn test_failures_keep_accruing_while_locked() {
    let h = TestHarness::new();
    h.seed_user(EMAIL, Some("correct-horse")).await;

    for _ in 0..8 {
        let _ = h.auth.authenticate(EMAIL, "wrong-password").await;
    }

    let state = h.store.find_lockout_state(EMAIL).await.unwrap().unwrap();
    assert_eq!(state.failed_attempts, 8);
}

#[tokio::test]
async fn test_concurrent_failures_both_count() {
    let h = TestHarness::new();

    let (a, b) = tokio::join!(
        h.lockout.record_failure(EMAIL),
        h.lockout.record_failure(EMAIL)
    );
    a.unwrap();
    b.unwrap();

    let state = h.store.find_lockout_state(EMAIL).await.unwrap().unwrap();
    assert_eq!(state.failed_attempts, 2);
}

#[tokio::test]
async fn test_unlock_email_dispatched_when_lock_engages() {
    let h = TestHarness::new();
    h.seed_user(EMAIL, Some("correct-horse")).await;

    for _ in 0..6 {
        let _ = h.auth.authenticate(EMAIL, "wrong-password").await;
    }

    let token = h.email.last_token(EMAIL, SentEmailKind::AccountUnlock);
    assert!(token.is_some());

    // Consuming the unlock link reopens the account.
    h.auth.confirm_unlock(&token.unwrap()).await.unwrap();
    assert!(!h.lockout.is_locked(EMAIL).await.unwrap());
    assert!(h.auth.authenticate(EMAIL, "correct-horse").await.is_ok());
}

#[tokio::test]
async fn test_admin_unlock_invalidates_outstanding_token() {
    let h = TestHarness::new();
    h.seed_user(EMAIL, Some("correct-horse")).await;

    for _ in 0..6 {
        let _ = h.auth.authenticate(EMAIL, "wrong-password").await;
    }
    let token = h
        .email
        .last_token(EMAIL, SentEmailKind::AccountUnlock)
        .unwrap();

    h.lockout.admin_unlock(EMAIL).await.unwrap();
    assert!(!h.lockout.is_locked(EMAIL).await.unwrap());

    // The emailed unlock token died with the lock.
    assert!(matches!(
        h.auth.confirm_unlock(&token).await,
        Err(ServiceError::NotFound)
    ));
}

#[tokio::test]
async fn test_unknown_identifier_is_open() {
    let h = TestHarness::new();
    assert!(!h.lockout.is_locked("nobody@example.com").await.unwrap());
}
