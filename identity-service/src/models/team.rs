//! Team model - the tenant unit that invitations and SSO resolve against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Team entity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub team_id: Uuid,
    pub slug: String,
    pub name: String,
    pub created_utc: DateTime<Utc>,
}

impl Team {
    pub fn new(slug: String, name: String) -> Self {
        Self {
            team_id: Uuid::new_v4(),
            slug,
            name,
            created_utc: Utc::now(),
        }
    }
}

/// Team membership with the granted role.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeamMember {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role_code: String,
    pub created_utc: DateTime<Utc>,
}

impl TeamMember {
    pub fn new(team_id: Uuid, user_id: Uuid, role_code: String) -> Self {
        Self {
            team_id,
            user_id,
            role_code,
            created_utc: Utc::now(),
        }
    }
}
