//! SSO connection model - maps a team (tenant) to its identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// SSO connection entity. A team has at most one connection; many email
/// domains may point at the same team, and a shared public domain may be
/// registered by several teams.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SsoConnection {
    pub connection_id: Uuid,
    pub team_id: Uuid,
    pub domain: Option<String>,
    pub product_id: String,
    pub issuer: String,
    pub sso_url: String,
    pub created_utc: DateTime<Utc>,
}

impl SsoConnection {
    /// Register a new connection for a team.
    pub fn new(
        team_id: Uuid,
        domain: Option<String>,
        product_id: String,
        issuer: String,
        sso_url: String,
    ) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            team_id,
            domain: domain.map(|d| d.trim().to_lowercase()),
            product_id,
            issuer,
            sso_url,
            created_utc: Utc::now(),
        }
    }
}
