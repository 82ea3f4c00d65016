//! Session model - issued sessions bound to an identity and team context.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Session entity. Only the hash of the session token is stored.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
    pub token_hash: String,
    pub expiry_utc: DateTime<Utc>,
    pub revoked_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl Session {
    /// Create a new session valid for `ttl_hours`.
    pub fn new(user_id: Uuid, team_id: Option<Uuid>, token_hash: String, ttl_hours: i64) -> Self {
        Self::with_id(Uuid::new_v4(), user_id, team_id, token_hash, ttl_hours)
    }

    /// Create a session with a caller-chosen id, so a signed token can
    /// embed the id it is bound to.
    pub fn with_id(
        session_id: Uuid,
        user_id: Uuid,
        team_id: Option<Uuid>,
        token_hash: String,
        ttl_hours: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            user_id,
            team_id,
            token_hash,
            expiry_utc: now + Duration::hours(ttl_hours),
            revoked_utc: None,
            created_utc: now,
        }
    }

    /// Check if session is valid (not expired, not revoked).
    pub fn is_valid(&self) -> bool {
        self.revoked_utc.is_none() && self.expiry_utc > Utc::now()
    }

    pub fn is_expired(&self) -> bool {
        self.expiry_utc <= Utc::now()
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_utc.is_some()
    }
}

/// Session info for API responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub team_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub expiry_utc: DateTime<Utc>,
    pub is_current: bool,
}

impl From<Session> for SessionInfo {
    fn from(s: Session) -> Self {
        Self {
            session_id: s.session_id,
            team_id: s.team_id,
            created_utc: s.created_utc,
            expiry_utc: s.expiry_utc,
            is_current: false, // Set by caller
        }
    }
}
