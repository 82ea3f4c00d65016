//! Security token model - single-use tokens backing account lifecycle links.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Token purpose codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    PasswordReset,
    EmailVerification,
    AccountUnlock,
    MagicLink,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::PasswordReset => "password_reset",
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::AccountUnlock => "account_unlock",
            TokenPurpose::MagicLink => "magic_link",
        }
    }
}

impl std::str::FromStr for TokenPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password_reset" => Ok(TokenPurpose::PasswordReset),
            "email_verification" => Ok(TokenPurpose::EmailVerification),
            "account_unlock" => Ok(TokenPurpose::AccountUnlock),
            "magic_link" => Ok(TokenPurpose::MagicLink),
            _ => Err(format!("Invalid token purpose: {}", s)),
        }
    }
}

/// Security token entity. The opaque `token` value is what the caller
/// embeds in a link; it is unique across all purposes.
#[derive(Debug, Clone, FromRow)]
pub struct SecurityToken {
    pub token_id: Uuid,
    pub identifier: String,
    pub token: String,
    pub purpose_code: String,
    pub expiry_utc: DateTime<Utc>,
    pub consumed_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl SecurityToken {
    /// Create a new token for `identifier` valid for `ttl`.
    pub fn new(purpose: TokenPurpose, identifier: String, token: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            token_id: Uuid::new_v4(),
            identifier,
            token,
            purpose_code: purpose.as_str().to_string(),
            expiry_utc: now + ttl,
            consumed_utc: None,
            created_utc: now,
        }
    }

    pub fn purpose(&self) -> Option<TokenPurpose> {
        self.purpose_code.parse().ok()
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expiry_utc
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_utc.is_some()
    }

    /// Check if the token can still be consumed (not expired and not used).
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_consumed()
    }
}
