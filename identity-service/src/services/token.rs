//! Token store - issue, validate, and atomically consume single-use
//! security tokens.

use chrono::Duration;
use std::sync::Arc;

use crate::models::{SecurityToken, TokenPurpose};
use crate::services::ServiceError;
use crate::store::{ConsumeOutcome, IdentityStore};
use crate::utils::generate_random_token;

/// What a token proves once validated or consumed.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub identifier: String,
    pub purpose: TokenPurpose,
}

#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn IdentityStore>,
}

impl TokenService {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Generate and persist a new single-use token for `identifier`.
    pub async fn issue(
        &self,
        purpose: TokenPurpose,
        identifier: &str,
        ttl: Duration,
    ) -> Result<String, ServiceError> {
        let token = generate_random_token();
        let row = SecurityToken::new(purpose, identifier.trim().to_lowercase(), token.clone(), ttl);
        self.store.insert_security_token(&row).await?;

        tracing::debug!(purpose = purpose.as_str(), "Security token issued");

        Ok(token)
    }

    /// Read-only check of a token.
    pub async fn validate(&self, token: &str) -> Result<TokenClaims, ServiceError> {
        let row = self
            .store
            .find_security_token(token)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if row.is_consumed() {
            return Err(ServiceError::AlreadyConsumed);
        }
        if row.is_expired() {
            return Err(ServiceError::Expired);
        }

        claims_of(row)
    }

    /// Consume a token. The underlying store resolves concurrent calls
    /// with a single conditional write; exactly one caller wins.
    pub async fn consume(&self, token: &str) -> Result<TokenClaims, ServiceError> {
        match self.store.consume_security_token(token).await? {
            ConsumeOutcome::Consumed => {
                let row = self
                    .store
                    .find_security_token(token)
                    .await?
                    .ok_or(ServiceError::NotFound)?;
                claims_of(row)
            }
            ConsumeOutcome::AlreadyConsumed => Err(ServiceError::AlreadyConsumed),
            ConsumeOutcome::Expired => Err(ServiceError::Expired),
            ConsumeOutcome::NotFound => Err(ServiceError::NotFound),
        }
    }

    /// Invalidate outstanding unconsumed tokens for an identifier.
    pub async fn invalidate(
        &self,
        purpose: TokenPurpose,
        identifier: &str,
    ) -> Result<u64, ServiceError> {
        Ok(self
            .store
            .delete_security_tokens(purpose, identifier)
            .await?)
    }

    /// Janitor hook; passive expiry does not depend on it.
    pub async fn purge_expired(&self) -> Result<u64, ServiceError> {
        Ok(self.store.purge_expired_security_tokens().await?)
    }
}

fn claims_of(row: SecurityToken) -> Result<TokenClaims, ServiceError> {
    let purpose = row.purpose().ok_or_else(|| {
        ServiceError::Internal(anyhow::anyhow!("Unknown purpose code: {}", row.purpose_code))
    })?;
    Ok(TokenClaims {
        identifier: row.identifier,
        purpose,
    })
}
