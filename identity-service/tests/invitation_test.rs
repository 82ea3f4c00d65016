mod common;

use common::TestHarness;
use identity_service::models::InvitationRole;
use identity_service::services::{InvitationService, ServiceError};
use identity_service::store::IdentityStore;

#[tokio::test]
async fn test_email_invite_round_trip() {
    let h = TestHarness::new();
    let team = h.seed_team("acme").await;
    let admin = h.seed_user("admin@acme.com", Some("password123")).await;

    let invitation = h
        .invitations
        .create_email_invite(team.team_id, admin.user_id, "b@y.com", InvitationRole::Member)
        .await
        .unwrap();

    let grant = h.invitations.validate(&invitation.token).await.unwrap();
    assert_eq!(grant.team.team_id, team.team_id);
    assert_eq!(grant.role, InvitationRole::Member);
    assert!(grant.sent_via_email);
    assert_eq!(grant.recipient_email.as_deref(), Some("b@y.com"));
}

#[tokio::test]
async fn test_reinviting_same_recipient_rotates_the_token() {
    let h = TestHarness::new();
    let team = h.seed_team("acme").await;
    let admin = h.seed_user("admin@acme.com", Some("password123")).await;

    let first = h
        .invitations
        .create_email_invite(team.team_id, admin.user_id, "b@y.com", InvitationRole::Member)
        .await
        .unwrap();
    let second = h
        .invitations
        .create_email_invite(team.team_id, admin.user_id, "b@y.com", InvitationRole::Admin)
        .await
        .unwrap();

    // One row, same identity, fresh token and role.
    assert_eq!(first.invitation_id, second.invitation_id);
    assert_ne!(first.token, second.token);
    assert_eq!(h.invitations.list(team.team_id).await.unwrap().len(), 1);

    assert!(matches!(
        h.invitations.validate(&first.token).await,
        Err(ServiceError::NotFound)
    ));
    let grant = h.invitations.validate(&second.token).await.unwrap();
    assert_eq!(grant.role, InvitationRole::Admin);
}

#[tokio::test]
async fn test_consuming_email_invite_grants_role_and_deletes_row() {
    let h = TestHarness::new();
    let team = h.seed_team("acme").await;
    let admin = h.seed_user("admin@acme.com", Some("password123")).await;
    let invitee = h.seed_user("b@y.com", Some("password123")).await;

    let invitation = h
        .invitations
        .create_email_invite(team.team_id, admin.user_id, "b@y.com", InvitationRole::Member)
        .await
        .unwrap();

    let grant = h
        .invitations
        .consume(&invitation.token, invitee.user_id)
        .await
        .unwrap();
    assert_eq!(grant.role, InvitationRole::Member);

    let member = h
        .store
        .find_team_member(team.team_id, invitee.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(member.role_code, "member");

    // The row is gone; a second consume finds nothing.
    assert!(matches!(
        h.invitations.consume(&invitation.token, invitee.user_id).await,
        Err(ServiceError::NotFound)
    ));
}

#[tokio::test]
async fn test_email_invite_rejects_other_recipients() {
    let h = TestHarness::new();
    let team = h.seed_team("acme").await;
    let admin = h.seed_user("admin@acme.com", Some("password123")).await;
    let stranger = h.seed_user("c@z.com", Some("password123")).await;

    let invitation = h
        .invitations
        .create_email_invite(team.team_id, admin.user_id, "b@y.com", InvitationRole::Member)
        .await
        .unwrap();

    assert!(matches!(
        h.invitations.consume(&invitation.token, stranger.user_id).await,
        Err(ServiceError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_link_invite_is_superseded_by_the_next_one() {
    let h = TestHarness::new();
    let team = h.seed_team("acme").await;
    let admin = h.seed_user("admin@acme.com", Some("password123")).await;

    let first = h
        .invitations
        .create_link_invite(team.team_id, admin.user_id, vec![], InvitationRole::Member)
        .await
        .unwrap();
    let second = h
        .invitations
        .create_link_invite(team.team_id, admin.user_id, vec![], InvitationRole::Member)
        .await
        .unwrap();

    // Exactly one valid link token per team.
    assert_eq!(h.invitations.list(team.team_id).await.unwrap().len(), 1);
    assert!(matches!(
        h.invitations.validate(&first.token).await,
        Err(ServiceError::NotFound)
    ));
    assert!(h.invitations.validate(&second.token).await.is_ok());
}

#[tokio::test]
async fn test_link_invite_is_reusable() {
    let h = TestHarness::new();
    let team = h.seed_team("acme").await;
    let admin = h.seed_user("admin@acme.com", Some("password123")).await;
    let first = h.seed_user("one@y.com", Some("password123")).await;
    let second = h.seed_user("two@y.com", Some("password123")).await;

    let invitation = h
        .invitations
        .create_link_invite(team.team_id, admin.user_id, vec![], InvitationRole::Member)
        .await
        .unwrap();

    h.invitations
        .consume(&invitation.token, first.user_id)
        .await
        .unwrap();
    h.invitations
        .consume(&invitation.token, second.user_id)
        .await
        .unwrap();

    assert!(h
        .store
        .find_team_member(team.team_id, second.user_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_link_invite_domain_allow_list() {
    let h = TestHarness::new();
    let team = h.seed_team("acme").await;
    let admin = h.seed_user("admin@acme.com", Some("password123")).await;
    let allowed = h.seed_user("b@y.com", Some("password123")).await;
    let subdomain = h.seed_user("d@mail.y.com", Some("password123")).await;
    let outsider = h.seed_user("c@z.com", Some("password123")).await;

    let invitation = h
        .invitations
        .create_link_invite(
            team.team_id,
            admin.user_id,
            vec!["y.com".to_string()],
            InvitationRole::Member,
        )
        .await
        .unwrap();

    assert!(h
        .invitations
        .consume(&invitation.token, allowed.user_id)
        .await
        .is_ok());

    // Suffix match admits subdomains.
    assert!(h
        .invitations
        .consume(&invitation.token, subdomain.user_id)
        .await
        .is_ok());

    // The mismatch is reported precisely, not collapsed into an auth error.
    match h.invitations.consume(&invitation.token, outsider.user_id).await {
        Err(ServiceError::DomainMismatch { domain }) => assert_eq!(domain, "z.com"),
        other => panic!("expected DomainMismatch, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_expired_invitation_reports_expired() {
    let h = TestHarness::new();
    let team = h.seed_team("acme").await;
    let admin = h.seed_user("admin@acme.com", Some("password123")).await;

    // A zero-day invitation expires at creation.
    let expired_invitations = InvitationService::new(h.store.clone(), 0);
    let invitation = expired_invitations
        .create_email_invite(team.team_id, admin.user_id, "b@y.com", InvitationRole::Member)
        .await
        .unwrap();

    assert!(matches!(
        h.invitations.validate(&invitation.token).await,
        Err(ServiceError::Expired)
    ));
}

#[tokio::test]
async fn test_revoke_invitation() {
    let h = TestHarness::new();
    let team = h.seed_team("acme").await;
    let other = h.seed_team("globex").await;
    let admin = h.seed_user("admin@acme.com", Some("password123")).await;

    let invitation = h
        .invitations
        .create_email_invite(team.team_id, admin.user_id, "b@y.com", InvitationRole::Member)
        .await
        .unwrap();

    // A different team cannot revoke it.
    assert!(matches!(
        h.invitations.revoke(other.team_id, invitation.invitation_id).await,
        Err(ServiceError::NotFound)
    ));

    h.invitations
        .revoke(team.team_id, invitation.invitation_id)
        .await
        .unwrap();
    assert!(matches!(
        h.invitations.validate(&invitation.token).await,
        Err(ServiceError::NotFound)
    ));
}
