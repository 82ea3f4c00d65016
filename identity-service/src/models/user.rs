//! User model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// User entity. `password_hash` is absent for identities provisioned
/// through SSO or magic-link only.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub email_verified: bool,
    pub created_utc: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, name: Option<String>, password_hash: Option<String>) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            name,
            password_hash,
            email_verified: false,
            created_utc: Utc::now(),
        }
    }
}

/// User representation safe to return from the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SanitizedUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub email_verified: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<User> for SanitizedUser {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            email: u.email,
            name: u.name,
            email_verified: u.email_verified,
            created_utc: u.created_utc,
        }
    }
}
