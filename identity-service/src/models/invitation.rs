//! Invitation model - team invitations with pre-assigned roles.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Role codes granted on invitation accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationRole {
    Owner,
    Admin,
    Member,
}

impl InvitationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationRole::Owner => "owner",
            InvitationRole::Admin => "admin",
            InvitationRole::Member => "member",
        }
    }
}

impl std::str::FromStr for InvitationRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(InvitationRole::Owner),
            "admin" => Ok(InvitationRole::Admin),
            "member" => Ok(InvitationRole::Member),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Invitation entity. Email invitations carry a recipient; link
/// invitations carry a domain allow-list instead and are reusable.
#[derive(Debug, Clone, FromRow)]
pub struct Invitation {
    pub invitation_id: Uuid,
    pub team_id: Uuid,
    pub inviter_id: Uuid,
    pub token: String,
    pub role_code: String,
    pub sent_via_email: bool,
    pub recipient_email: Option<String>,
    pub allowed_domains: Vec<String>,
    pub expiry_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl Invitation {
    /// Create an invitation addressed to a single recipient email.
    pub fn new_email(
        team_id: Uuid,
        inviter_id: Uuid,
        recipient_email: String,
        role: InvitationRole,
        token: String,
        expiry_days: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            invitation_id: Uuid::new_v4(),
            team_id,
            inviter_id,
            token,
            role_code: role.as_str().to_string(),
            sent_via_email: true,
            recipient_email: Some(recipient_email),
            allowed_domains: Vec::new(),
            expiry_utc: now + Duration::days(expiry_days),
            created_utc: now,
        }
    }

    /// Create a shareable link invitation, optionally restricted to email domains.
    pub fn new_link(
        team_id: Uuid,
        inviter_id: Uuid,
        allowed_domains: Vec<String>,
        role: InvitationRole,
        token: String,
        expiry_days: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            invitation_id: Uuid::new_v4(),
            team_id,
            inviter_id,
            token,
            role_code: role.as_str().to_string(),
            sent_via_email: false,
            recipient_email: None,
            allowed_domains,
            expiry_utc: now + Duration::days(expiry_days),
            created_utc: now,
        }
    }

    pub fn role(&self) -> Option<InvitationRole> {
        self.role_code.parse().ok()
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expiry_utc
    }

    /// Check an invitee email against the domain allow-list.
    ///
    /// An empty allow-list admits every domain. Matching is a
    /// case-insensitive suffix match, so `y.com` admits `mail.y.com`.
    pub fn domain_allowed(&self, email: &str) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }

        let domain = match email.rsplit_once('@') {
            Some((_, domain)) => domain.to_lowercase(),
            None => return false,
        };

        self.allowed_domains.iter().any(|allowed| {
            let allowed = allowed.trim().to_lowercase();
            domain == allowed || domain.ends_with(&format!(".{}", allowed))
        })
    }
}
