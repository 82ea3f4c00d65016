use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Invitation, Team};
use crate::services::InvitationGrant;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvitationRequest {
    /// Recipient for an email invitation; omit for a link invitation.
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[schema(example = "member")]
    pub role: String,

    pub sent_via_email: bool,

    /// Domain allow-list for link invitations, e.g. ["example.com"].
    pub allowed_domains: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvitationResponse {
    pub invitation_id: Uuid,
    pub team_id: Uuid,
    pub role_code: String,
    pub sent_via_email: bool,
    pub recipient_email: Option<String>,
    pub allowed_domains: Vec<String>,
    pub token: String,
    pub expiry_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl From<Invitation> for InvitationResponse {
    fn from(i: Invitation) -> Self {
        Self {
            invitation_id: i.invitation_id,
            team_id: i.team_id,
            role_code: i.role_code,
            sent_via_email: i.sent_via_email,
            recipient_email: i.recipient_email,
            allowed_domains: i.allowed_domains,
            token: i.token,
            expiry_utc: i.expiry_utc,
            created_utc: i.created_utc,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeamSummary {
    pub team_id: Uuid,
    pub slug: String,
    pub name: String,
}

impl From<Team> for TeamSummary {
    fn from(t: Team) -> Self {
        Self {
            team_id: t.team_id,
            slug: t.slug,
            name: t.name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvitationGrantResponse {
    pub team: TeamSummary,
    pub role: String,
    pub sent_via_email: bool,
    pub allowed_domains: Vec<String>,
}

impl From<InvitationGrant> for InvitationGrantResponse {
    fn from(g: InvitationGrant) -> Self {
        Self {
            team: g.team.into(),
            role: g.role.as_str().to_string(),
            sent_via_email: g.sent_via_email,
            allowed_domains: g.allowed_domains,
        }
    }
}
