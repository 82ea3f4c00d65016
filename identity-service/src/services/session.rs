//! Session issuer - binds an authenticated identity (and optional team
//! context) to a session artifact.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SessionStrategy;
use crate::models::{Session, User};
use crate::services::{JwtService, ServiceError};
use crate::store::IdentityStore;
use crate::utils::{generate_random_token, hash_token};

/// An issued session: the bearer token plus its row id.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session_id: Uuid,
    pub token: String,
    pub token_type: &'static str,
    pub expires_utc: DateTime<Utc>,
}

/// Identity resolved from a presented session token.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub team_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn IdentityStore>,
    jwt: JwtService,
    strategy: SessionStrategy,
}

impl SessionService {
    pub fn new(store: Arc<dyn IdentityStore>, jwt: JwtService, strategy: SessionStrategy) -> Self {
        Self {
            store,
            jwt,
            strategy,
        }
    }

    /// Issue a session for `user`. Both strategies persist a row so
    /// `revoke_all` always has records to enumerate; the `jwt` strategy
    /// additionally signs a stateless token embedding the row id.
    pub async fn issue(
        &self,
        user: &User,
        team_id: Option<Uuid>,
    ) -> Result<IssuedSession, ServiceError> {
        let session_id = Uuid::new_v4();
        let ttl_hours = self.jwt.session_ttl_hours();

        let token = match self.strategy {
            SessionStrategy::Jwt => self
                .jwt
                .generate_session_token(user, team_id, session_id)
                .map_err(ServiceError::Internal)?,
            SessionStrategy::Database => generate_random_token(),
        };

        let session = Session::with_id(
            session_id,
            user.user_id,
            team_id,
            hash_token(&token),
            ttl_hours,
        );
        self.store.insert_session(&session).await?;

        tracing::info!(user_id = %user.user_id, "Session issued");

        Ok(IssuedSession {
            session_id,
            token,
            token_type: "Bearer",
            expires_utc: session.expiry_utc,
        })
    }

    /// Resolve a presented token back to an identity, honoring revocation
    /// under either strategy.
    pub async fn introspect(&self, token: &str) -> Result<SessionIdentity, ServiceError> {
        match self.strategy {
            SessionStrategy::Jwt => {
                let claims = self
                    .jwt
                    .validate_session_token(token)
                    .map_err(|_| ServiceError::InvalidCredentials)?;
                let session_id = Uuid::parse_str(&claims.sid)
                    .map_err(|_| ServiceError::InvalidCredentials)?;

                let session = self
                    .store
                    .find_session_by_id(session_id)
                    .await?
                    .ok_or(ServiceError::InvalidCredentials)?;
                if !session.is_valid() {
                    return Err(ServiceError::InvalidCredentials);
                }

                let user_id =
                    Uuid::parse_str(&claims.sub).map_err(|_| ServiceError::InvalidCredentials)?;

                Ok(SessionIdentity {
                    session_id,
                    user_id,
                    email: claims.email,
                    team_id: session.team_id,
                })
            }
            SessionStrategy::Database => {
                let session = self
                    .store
                    .find_session_by_token_hash(&hash_token(token))
                    .await?
                    .ok_or(ServiceError::InvalidCredentials)?;
                if !session.is_valid() {
                    return Err(ServiceError::InvalidCredentials);
                }

                let user = self
                    .store
                    .find_user_by_id(session.user_id)
                    .await?
                    .ok_or(ServiceError::InvalidCredentials)?;

                Ok(SessionIdentity {
                    session_id: session.session_id,
                    user_id: user.user_id,
                    email: user.email,
                    team_id: session.team_id,
                })
            }
        }
    }

    pub async fn revoke(&self, session_id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.store.revoke_session(session_id).await?)
    }

    /// Revoke one of `user_id`'s own sessions.
    pub async fn revoke_for_user(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<(), ServiceError> {
        let session = self
            .store
            .find_session_by_id(session_id)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or(ServiceError::NotFound)?;

        self.store.revoke_session(session.session_id).await?;
        Ok(())
    }

    /// Invalidate every session for the identity, optionally keeping the
    /// current one. Used on password change and "sign out everywhere".
    pub async fn revoke_all(
        &self,
        user_id: Uuid,
        except_current: Option<Uuid>,
    ) -> Result<u64, ServiceError> {
        let revoked = self
            .store
            .revoke_all_sessions(user_id, except_current)
            .await?;

        tracing::info!(user_id = %user_id, revoked, "Sessions revoked");

        Ok(revoked)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Session>, ServiceError> {
        Ok(self.store.list_active_sessions(user_id).await?)
    }

    /// Janitor hook; passive expiry does not depend on it.
    pub async fn purge_expired(&self) -> Result<u64, ServiceError> {
        Ok(self.store.purge_expired_sessions().await?)
    }
}
