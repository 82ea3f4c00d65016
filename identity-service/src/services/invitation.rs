//! Invitation resolver - creates and validates team invitations, per
//! recipient email or as a shareable link with a domain allow-list.

use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Invitation, InvitationRole, Team, TeamMember};
use crate::services::ServiceError;
use crate::store::IdentityStore;
use crate::utils::generate_random_token;

/// What a validated invitation grants.
#[derive(Debug, Clone)]
pub struct InvitationGrant {
    pub team: Team,
    pub role: InvitationRole,
    pub sent_via_email: bool,
    pub recipient_email: Option<String>,
    pub allowed_domains: Vec<String>,
}

#[derive(Clone)]
pub struct InvitationService {
    store: Arc<dyn IdentityStore>,
    expiry_days: i64,
}

impl InvitationService {
    pub fn new(store: Arc<dyn IdentityStore>, expiry_days: i64) -> Self {
        Self { store, expiry_days }
    }

    /// Create (or replace) the invitation for `email` on a team. Calling
    /// again for the same recipient rotates the token instead of piling
    /// up duplicates.
    pub async fn create_email_invite(
        &self,
        team_id: Uuid,
        inviter_id: Uuid,
        email: &str,
        role: InvitationRole,
    ) -> Result<Invitation, ServiceError> {
        self.require_team(team_id).await?;

        let invitation = Invitation::new_email(
            team_id,
            inviter_id,
            email.trim().to_lowercase(),
            role,
            generate_random_token(),
            self.expiry_days,
        );
        self.store.upsert_email_invitation(&invitation).await?;

        tracing::info!(team_id = %team_id, "Email invitation created");

        // The upsert keeps the original row id when replacing; re-read so
        // the caller sees the persisted row.
        self.store
            .find_invitation_by_token(&invitation.token)
            .await?
            .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("Invitation vanished after write")))
    }

    /// Create or replace the team's single active link invitation. The
    /// superseded token stops validating immediately.
    pub async fn create_link_invite(
        &self,
        team_id: Uuid,
        inviter_id: Uuid,
        allowed_domains: Vec<String>,
        role: InvitationRole,
    ) -> Result<Invitation, ServiceError> {
        self.require_team(team_id).await?;

        let domains = allowed_domains
            .into_iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        let invitation = Invitation::new_link(
            team_id,
            inviter_id,
            domains,
            role,
            generate_random_token(),
            self.expiry_days,
        );
        self.store.replace_link_invitation(&invitation).await?;

        tracing::info!(team_id = %team_id, "Link invitation created");

        self.store
            .find_invitation_by_token(&invitation.token)
            .await?
            .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("Invitation vanished after write")))
    }

    /// Read-only check of an invitation token. Returns the allow-list so
    /// the caller can test the invitee's email domain up front.
    pub async fn validate(&self, token: &str) -> Result<InvitationGrant, ServiceError> {
        let invitation = self
            .store
            .find_invitation_by_token(token)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if invitation.is_expired() {
            return Err(ServiceError::Expired);
        }

        self.grant_of(invitation).await
    }

    /// Grant the invitation's role to `user_id`. Email invitations are
    /// single-use and deleted on success; link invitations stay reusable.
    pub async fn consume(&self, token: &str, user_id: Uuid) -> Result<InvitationGrant, ServiceError> {
        let invitation = self
            .store
            .find_invitation_by_token(token)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if invitation.is_expired() {
            return Err(ServiceError::Expired);
        }

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if invitation.sent_via_email {
            // An email invitation only admits the address it was sent to.
            if invitation.recipient_email.as_deref() != Some(user.email.as_str()) {
                return Err(ServiceError::Conflict(
                    "Invitation was issued to a different email address".to_string(),
                ));
            }
        } else if !invitation.domain_allowed(&user.email) {
            let domain = user
                .email
                .rsplit_once('@')
                .map(|(_, d)| d.to_string())
                .unwrap_or_default();
            return Err(ServiceError::DomainMismatch { domain });
        }

        let member = TeamMember::new(invitation.team_id, user_id, invitation.role_code.clone());
        self.store.upsert_team_member(&member).await?;

        if invitation.sent_via_email {
            self.store
                .delete_invitation(invitation.invitation_id)
                .await?;
        }

        tracing::info!(team_id = %invitation.team_id, "Invitation accepted");

        self.grant_of(invitation).await
    }

    /// Revoke an invitation belonging to `team_id`.
    pub async fn revoke(&self, team_id: Uuid, invitation_id: Uuid) -> Result<(), ServiceError> {
        let invitation = self
            .store
            .find_invitation_by_id(invitation_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if invitation.team_id != team_id {
            return Err(ServiceError::NotFound);
        }

        self.store.delete_invitation(invitation_id).await?;
        Ok(())
    }

    pub async fn list(&self, team_id: Uuid) -> Result<Vec<Invitation>, ServiceError> {
        Ok(self.store.list_team_invitations(team_id).await?)
    }

    /// Janitor hook; passive expiry does not depend on it.
    pub async fn purge_expired(&self) -> Result<u64, ServiceError> {
        Ok(self.store.purge_expired_invitations().await?)
    }

    async fn require_team(&self, team_id: Uuid) -> Result<Team, ServiceError> {
        self.store
            .find_team_by_id(team_id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    async fn grant_of(&self, invitation: Invitation) -> Result<InvitationGrant, ServiceError> {
        let team = self.require_team(invitation.team_id).await?;
        let role = invitation.role().ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!("Unknown role code: {}", invitation.role_code))
        })?;

        Ok(InvitationGrant {
            team,
            role,
            sent_via_email: invitation.sent_via_email,
            recipient_email: invitation.recipient_email,
            allowed_domains: invitation.allowed_domains,
        })
    }
}
