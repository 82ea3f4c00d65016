mod common;

use chrono::Duration;
use common::TestHarness;
use identity_service::models::TokenPurpose;
use identity_service::services::ServiceError;

#[tokio::test]
async fn test_issue_and_validate_round_trip() {
    let h = TestHarness::new();

    let token = h
        .tokens
        .issue(TokenPurpose::PasswordReset, "a@x.com", Duration::hours(1))
        .await
        .unwrap();

    let claims = h.tokens.validate(&token).await.unwrap();
    assert_eq!(claims.identifier, "a@x.com");
    assert_eq!(claims.purpose, TokenPurpose::PasswordReset);
}

#[tokio::test]
async fn test_unknown_token_is_not_found() {
    let h = TestHarness::new();

    assert!(matches!(
        h.tokens.validate("no-such-token").await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        h.tokens.consume("no-such-token").await,
        Err(ServiceError::NotFound)
    ));
}

#[tokio::test]
async fn test_consume_is_single_use() {
    let h = TestHarness::new();

    let token = h
        .tokens
        .issue(TokenPurpose::EmailVerification, "a@x.com", Duration::hours(1))
        .await
        .unwrap();

    let claims = h.tokens.consume(&token).await.unwrap();
    assert_eq!(claims.purpose, TokenPurpose::EmailVerification);

    // Neither validate nor consume ever succeeds again.
    assert!(matches!(
        h.tokens.validate(&token).await,
        Err(ServiceError::AlreadyConsumed)
    ));
    assert!(matches!(
        h.tokens.consume(&token).await,
        Err(ServiceError::AlreadyConsumed)
    ));
}

#[tokio::test]
async fn test_expired_token_reads_as_expired() {
    let h = TestHarness::new();

    // Issued already past its expiry, as at t0 + 61m for a 1h token.
    let token = h
        .tokens
        .issue(
            TokenPurpose::PasswordReset,
            "a@x.com",
            Duration::milliseconds(-1),
        )
        .await
        .unwrap();

    assert!(matches!(
        h.tokens.validate(&token).await,
        Err(ServiceError::Expired)
    ));
    assert!(matches!(
        h.tokens.consume(&token).await,
        Err(ServiceError::Expired)
    ));
}

#[tokio::test]
async fn test_concurrent_consume_has_exactly_one_winner() {
    let h = TestHarness::new();

    let token = h
        .tokens
        .issue(TokenPurpose::AccountUnlock, "a@x.com", Duration::hours(1))
        .await
        .unwrap();

    let (first, second) = tokio::join!(h.tokens.consume(&token), h.tokens.consume(&token));

    let winners = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);

    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(loser, Err(ServiceError::AlreadyConsumed)));
}

#[tokio::test]
async fn test_invalidate_removes_outstanding_tokens() {
    let h = TestHarness::new();

    let first = h
        .tokens
        .issue(TokenPurpose::AccountUnlock, "a@x.com", Duration::hours(1))
        .await
        .unwrap();
    let second = h
        .tokens
        .issue(TokenPurpose::AccountUnlock, "a@x.com", Duration::hours(1))
        .await
        .unwrap();

    let invalidated = h
        .tokens
        .invalidate(TokenPurpose::AccountUnlock, "a@x.com")
        .await
        .unwrap();
    assert_eq!(invalidated, 2);

    assert!(matches!(
        h.tokens.validate(&first).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        h.tokens.validate(&second).await,
        Err(ServiceError::NotFound)
    ));
}

#[tokio::test]
async fn test_invalidate_is_scoped_by_purpose() {
    let h = TestHarness::new();

    let reset = h
        .tokens
        .issue(TokenPurpose::PasswordReset, "a@x.com", Duration::hours(1))
        .await
        .unwrap();
    h.tokens
        .issue(TokenPurpose::AccountUnlock, "a@x.com", Duration::hours(1))
        .await
        .unwrap();

    h.tokens
        .invalidate(TokenPurpose::AccountUnlock, "a@x.com")
        .await
        .unwrap();

    // The reset token is untouched.
    assert!(h.tokens.validate(&reset).await.is_ok());
}

#[tokio::test]
async fn test_purged_token_reads_as_not_found() {
    let h = TestHarness::new();

    let token = h
        .tokens
        .issue(
            TokenPurpose::PasswordReset,
            "a@x.com",
            Duration::milliseconds(-1),
        )
        .await
        .unwrap();

    let purged = h.tokens.purge_expired().await.unwrap();
    assert_eq!(purged, 1);

    assert!(matches!(
        h.tokens.consume(&token).await,
        Err(ServiceError::NotFound)
    ));
}
