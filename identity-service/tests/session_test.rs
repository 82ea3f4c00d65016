mod common;

use common::TestHarness;
use identity_service::config::SessionStrategy;
use identity_service::models::LockoutPolicy;
use identity_service::services::ServiceError;

#[tokio::test]
async fn test_jwt_session_round_trip() {
    let h = TestHarness::new();
    let user = h.seed_user("user@example.com", Some("password123")).await;

    let session = h.sessions.issue(&user, None).await.unwrap();
    assert_eq!(session.token_type, "Bearer");

    // Stateless token: three dot-separated segments.
    assert_eq!(session.token.split('.').count(), 3);

    let identity = h.sessions.introspect(&session.token).await.unwrap();
    assert_eq!(identity.user_id, user.user_id);
    assert_eq!(identity.session_id, session.session_id);
    assert_eq!(identity.team_id, None);
}

#[tokio::test]
async fn test_database_session_round_trip() {
    let h = TestHarness::with_options(SessionStrategy::Database, LockoutPolicy::default());
    let user = h.seed_user("user@example.com", Some("password123")).await;

    let session = h.sessions.issue(&user, None).await.unwrap();

    // Opaque token, resolved against the session table.
    assert_eq!(session.token.split('.').count(), 1);

    let identity = h.sessions.introspect(&session.token).await.unwrap();
    assert_eq!(identity.user_id, user.user_id);

    assert!(h.sessions.introspect("garbage-token").await.is_err());
}

#[tokio::test]
async fn test_session_binds_team_context() {
    let h = TestHarness::new();
    let user = h.seed_user("user@example.com", Some("password123")).await;
    let team = h.seed_team("acme").await;

    let session = h.sessions.issue(&user, Some(team.team_id)).await.unwrap();
    let identity = h.sessions.introspect(&session.token).await.unwrap();

    assert_eq!(identity.team_id, Some(team.team_id));
}

#[tokio::test]
async fn test_revoked_session_stops_introspecting() {
    let h = TestHarness::new();
    let user = h.seed_user("user@example.com", Some("password123")).await;

    let session = h.sessions.issue(&user, None).await.unwrap();
    assert!(h.sessions.revoke(session.session_id).await.unwrap());

    // The signature is still valid; the revoked row wins.
    assert!(matches!(
        h.sessions.introspect(&session.token).await,
        Err(ServiceError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_revoke_all_except_current() {
    let h = TestHarness::new();
    let user = h.seed_user("user@example.com", Some("password123")).await;

    let current = h.sessions.issue(&user, None).await.unwrap();
    let other_a = h.sessions.issue(&user, None).await.unwrap();
    let other_b = h.sessions.issue(&user, None).await.unwrap();

    let revoked = h
        .sessions
        .revoke_all(user.user_id, Some(current.session_id))
        .await
        .unwrap();
    assert_eq!(revoked, 2);

    assert!(h.sessions.introspect(&current.token).await.is_ok());
    assert!(h.sessions.introspect(&other_a.token).await.is_err());
    assert!(h.sessions.introspect(&other_b.token).await.is_err());

    let active = h.sessions.list(user.user_id).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].session_id, current.session_id);
}

#[tokio::test]
async fn test_revoke_all_without_exception() {
    let h = TestHarness::new();
    let user = h.seed_user("user@example.com", Some("password123")).await;

    h.sessions.issue(&user, None).await.unwrap();
    h.sessions.issue(&user, None).await.unwrap();

    let revoked = h.sessions.revoke_all(user.user_id, None).await.unwrap();
    assert_eq!(revoked, 2);
    assert!(h.sessions.list(user.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_revoke_all_only_touches_the_given_identity() {
    let h = TestHarness::new();
    let alice = h.seed_user("alice@example.com", Some("password123")).await;
    let bob = h.seed_user("bob@example.com", Some("password123")).await;

    let alice_session = h.sessions.issue(&alice, None).await.unwrap();
    let bob_session = h.sessions.issue(&bob, None).await.unwrap();

    h.sessions.revoke_all(alice.user_id, None).await.unwrap();

    assert!(h.sessions.introspect(&alice_session.token).await.is_err());
    assert!(h.sessions.introspect(&bob_session.token).await.is_ok());
}

#[tokio::test]
async fn test_revoke_for_user_checks_ownership() {
    let h = TestHarness::new();
    let alice = h.seed_user("alice@example.com", Some("password123")).await;
    let bob = h.seed_user("bob@example.com", Some("password123")).await;

    let bob_session = h.sessions.issue(&bob, None).await.unwrap();

    assert!(matches!(
        h.sessions
            .revoke_for_user(alice.user_id, bob_session.session_id)
            .await,
        Err(ServiceError::NotFound)
    ));

    h.sessions
        .revoke_for_user(bob.user_id, bob_session.session_id)
        .await
        .unwrap();
    assert!(h.sessions.introspect(&bob_session.token).await.is_err());
}
