mod common;

use common::{TestHarness, BASE_URL};
use identity_service::services::{
    LoginMethod, LoginOutcome, SentEmailKind, ServiceError, SsoHint,
};
use identity_service::store::IdentityStore;

#[tokio::test]
async fn test_password_login_issues_session() {
    let h = TestHarness::new();
    h.seed_user("user@example.com", Some("correct-horse")).await;

    let outcome = h
        .auth
        .login(
            LoginMethod::Password {
                email: "user@example.com".to_string(),
                password: "correct-horse".to_string(),
            },
            BASE_URL,
        )
        .await
        .unwrap();

    let session = match outcome {
        LoginOutcome::SignedIn(session) => session,
        other => panic!("expected SignedIn, got {:?}", other),
    };

    let identity = h.sessions.introspect(&session.token).await.unwrap();
    assert_eq!(identity.email, "user@example.com");
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
    let h = TestHarness::new();
    h.seed_user("user@example.com", Some("correct-horse")).await;

    let wrong = h.auth.authenticate("user@example.com", "nope").await;
    let unknown = h.auth.authenticate("ghost@example.com", "nope").await;

    assert!(matches!(wrong, Err(ServiceError::InvalidCredentials)));
    assert!(matches!(unknown, Err(ServiceError::InvalidCredentials)));
}

#[tokio::test]
async fn test_passwordless_user_cannot_use_password_login() {
    let h = TestHarness::new();
    h.seed_user("sso-only@example.com", None).await;

    assert!(matches!(
        h.auth.authenticate("sso-only@example.com", "anything").await,
        Err(ServiceError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_successful_login_resets_lockout_counter() {
    let h = TestHarness::new();
    h.seed_user("user@example.com", Some("correct-horse")).await;

    for _ in 0..3 {
        let _ = h.auth.authenticate("user@example.com", "nope").await;
    }
    h.auth
        .authenticate("user@example.com", "correct-horse")
        .await
        .unwrap();

    let state = h
        .store
        .find_lockout_state("user@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.failed_attempts, 0);
}

#[tokio::test]
async fn test_magic_link_round_trip() {
    let h = TestHarness::new();
    let user = h.seed_user("user@example.com", None).await;
    assert!(!user.email_verified);

    let outcome = h
        .auth
        .login(
            LoginMethod::MagicLink {
                email: "user@example.com".to_string(),
            },
            BASE_URL,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::ChallengeSent));

    let token = h
        .email
        .last_token("user@example.com", SentEmailKind::MagicLink)
        .unwrap();

    let session = h.auth.verify_magic_link(&token).await.unwrap();
    let identity = h.sessions.introspect(&session.token).await.unwrap();
    assert_eq!(identity.user_id, user.user_id);

    // Proving control of the inbox verifies the address.
    let user = h.store.find_user_by_id(user.user_id).await.unwrap().unwrap();
    assert!(user.email_verified);

    // The link is single-use.
    assert!(matches!(
        h.auth.verify_magic_link(&token).await,
        Err(ServiceError::AlreadyConsumed)
    ));
}

#[tokio::test]
async fn test_magic_link_request_is_silent_for_unknown_email() {
    let h = TestHarness::new();

    h.auth
        .request_magic_link("ghost@example.com", BASE_URL)
        .await
        .unwrap();

    assert!(h.email.sent().is_empty());
}

#[tokio::test]
async fn test_oauth_login_redirects_to_provider() {
    let h = TestHarness::new();

    let outcome = h
        .auth
        .login(
            LoginMethod::OAuth {
                provider: "google".to_string(),
            },
            BASE_URL,
        )
        .await
        .unwrap();

    match outcome {
        LoginOutcome::Redirect { url } => {
            assert!(url.starts_with("https://accounts.google.com/"));
            assert!(url.contains("client_id=test-client-id"));
        }
        other => panic!("expected Redirect, got {:?}", other),
    }

    assert!(matches!(
        h.auth
            .login(
                LoginMethod::OAuth {
                    provider: "myspace".to_string()
                },
                BASE_URL
            )
            .await,
        Err(ServiceError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_sso_login_redirects_to_resolved_tenant() {
    let h = TestHarness::new();
    let team = h.seed_team("acme").await;
    h.sso
        .register_connection(
            team.team_id,
            Some("acme.com".to_string()),
            "product-1".to_string(),
            "https://idp.example.com/acme".to_string(),
            "https://idp.example.com/acme/sso".to_string(),
        )
        .await
        .unwrap();

    let outcome = h
        .auth
        .login(
            LoginMethod::Sso {
                hint: SsoHint::Email("user@acme.com".to_string()),
            },
            BASE_URL,
        )
        .await
        .unwrap();

    match outcome {
        LoginOutcome::Redirect { url } => {
            assert!(url.contains(&format!("tenant={}", team.team_id)));
        }
        other => panic!("expected Redirect, got {:?}", other),
    }
}

#[tokio::test]
async fn test_register_sends_verification_and_rejects_duplicates() {
    let h = TestHarness::new();

    let user = h
        .auth
        .register("new@example.com", "password123", None, BASE_URL)
        .await
        .unwrap();
    assert!(!user.email_verified);

    let token = h
        .email
        .last_token("new@example.com", SentEmailKind::Verification)
        .unwrap();
    h.auth.verify_email(&token).await.unwrap();

    let user = h.store.find_user_by_id(user.user_id).await.unwrap().unwrap();
    assert!(user.email_verified);

    assert!(matches!(
        h.auth
            .register("new@example.com", "password123", None, BASE_URL)
            .await,
        Err(ServiceError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_password_reset_rotates_credentials_and_revokes_sessions() {
    let h = TestHarness::new();
    let user = h.seed_user("user@example.com", Some("old-password")).await;

    let session = h.sessions.issue(&user, None).await.unwrap();

    h.auth
        .request_password_reset("user@example.com", BASE_URL)
        .await
        .unwrap();
    let token = h
        .email
        .last_token("user@example.com", SentEmailKind::PasswordReset)
        .unwrap();

    h.auth
        .confirm_password_reset(&token, "new-password")
        .await
        .unwrap();

    // Old credential and old session are both dead.
    assert!(matches!(
        h.auth.authenticate("user@example.com", "old-password").await,
        Err(ServiceError::InvalidCredentials)
    ));
    assert!(h.sessions.introspect(&session.token).await.is_err());

    h.auth
        .authenticate("user@example.com", "new-password")
        .await
        .unwrap();

    // The reset link is single-use.
    assert!(matches!(
        h.auth.confirm_password_reset(&token, "another-password").await,
        Err(ServiceError::AlreadyConsumed)
    ));
}

#[tokio::test]
async fn test_reset_token_rejected_for_other_purposes() {
    let h = TestHarness::new();
    h.seed_user("user@example.com", Some("password123")).await;

    h.auth
        .request_password_reset("user@example.com", BASE_URL)
        .await
        .unwrap();
    let token = h
        .email
        .last_token("user@example.com", SentEmailKind::PasswordReset)
        .unwrap();

    // A reset token opens no other door.
    assert!(matches!(
        h.auth.verify_magic_link(&token).await,
        Err(ServiceError::NotFound)
    ));
}

#[tokio::test]
async fn test_unlock_request_supersedes_prior_token() {
    let h = TestHarness::new();
    h.seed_user("user@example.com", Some("correct-horse")).await;

    for _ in 0..6 {
        let _ = h.auth.authenticate("user@example.com", "nope").await;
    }
    let first = h
        .email
        .last_token("user@example.com", SentEmailKind::AccountUnlock)
        .unwrap();

    h.auth
        .request_unlock("user@example.com", BASE_URL)
        .await
        .unwrap();
    let second = h
        .email
        .last_token("user@example.com", SentEmailKind::AccountUnlock)
        .unwrap();
    assert_ne!(first, second);

    // The superseded link no longer works; the fresh one does.
    assert!(matches!(
        h.auth.confirm_unlock(&first).await,
        Err(ServiceError::NotFound)
    ));
    h.auth.confirm_unlock(&second).await.unwrap();

    h.auth
        .authenticate("user@example.com", "correct-horse")
        .await
        .unwrap();
}
