use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fs;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::User;

/// JWT service for stateless session tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_ttl_hours: i64,
}

/// Claims for session tokens. `sid` ties the token back to the session
/// row so revocation works for stateless tokens too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Email
    pub email: String,
    /// Team context, when the session is team-bound
    pub team: Option<String>,
    /// Session ID (matches database record)
    pub sid: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl JwtService {
    /// Create a new JWT service by loading RSA keys from files.
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let private_key_pem = fs::read_to_string(&config.private_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read private key from {}: {}",
                config.private_key_path,
                e
            )
        })?;

        let public_key_pem = fs::read_to_string(&config.public_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read public key from {}: {}",
                config.public_key_path,
                e
            )
        })?;

        let service = Self::from_pem(
            &private_key_pem,
            &public_key_pem,
            config.session_ttl_hours,
        )?;

        tracing::info!("JWT service initialized with RS256 keys");

        Ok(service)
    }

    /// Create a JWT service from in-memory PEM strings.
    pub fn from_pem(
        private_pem: &str,
        public_pem: &str,
        session_ttl_hours: i64,
    ) -> Result<Self, anyhow::Error> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse private key: {}", e))?;

        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse public key: {}", e))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            session_ttl_hours,
        })
    }

    /// Generate a signed session token bound to the user, team context,
    /// and backing session row.
    pub fn generate_session_token(
        &self,
        user: &User,
        team_id: Option<Uuid>,
        session_id: Uuid,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.user_id.to_string(),
            email: user.email.clone(),
            team: team_id.map(|t| t.to_string()),
            sid: session_id.to_string(),
            exp: (now + Duration::hours(self.session_ttl_hours)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to sign session token: {}", e))
    }

    /// Validate a session token signature and expiry.
    pub fn validate_session_token(&self, token: &str) -> Result<SessionClaims, anyhow::Error> {
        let validation = Validation::new(Algorithm::RS256);
        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| anyhow::anyhow!("Invalid session token: {}", e))
    }

    pub fn session_ttl_hours(&self) -> i64 {
        self.session_ttl_hours
    }
}
