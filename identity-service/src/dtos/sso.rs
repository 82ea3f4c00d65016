use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::SsoConnection;

/// Login hint: an email resolved by domain, or an explicit team slug.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SsoVerifyRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: Option<String>,

    #[schema(example = "acme")]
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSsoConnectionRequest {
    /// Email domain routed to this connection, e.g. "example.com".
    pub domain: Option<String>,

    #[validate(length(min = 1, message = "Product id is required"))]
    pub product_id: String,

    #[validate(length(min = 1, message = "Issuer is required"))]
    pub issuer: String,

    #[validate(url(message = "Invalid SSO URL"))]
    pub sso_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SsoConnectionResponse {
    pub connection_id: Uuid,
    pub team_id: Uuid,
    pub domain: Option<String>,
    pub product_id: String,
    pub issuer: String,
    pub sso_url: String,
    pub created_utc: DateTime<Utc>,
}

impl From<SsoConnection> for SsoConnectionResponse {
    fn from(c: SsoConnection) -> Self {
        Self {
            connection_id: c.connection_id,
            team_id: c.team_id,
            domain: c.domain,
            product_id: c.product_id,
            issuer: c.issuer,
            sso_url: c.sso_url,
            created_utc: c.created_utc,
        }
    }
}
