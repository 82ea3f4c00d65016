//! Credential authenticator and login-method dispatch.
//!
//! Sensitive outcomes (locked account, unknown identity, wrong password)
//! are indistinguishable to the caller in both result and timing.

use chrono::Duration;
use std::sync::Arc;

use crate::config::{OAuthConfig, TokenTtlConfig};
use crate::models::{TokenPurpose, User};
use crate::services::{
    EmailProvider, IssuedSession, LockoutService, ServiceError, SessionService, SsoHint,
    SsoService, TokenService,
};
use crate::store::IdentityStore;
use crate::utils::{dummy_verify, hash_password, verify_password, Password, PasswordHashString};

/// Login methods, selected explicitly by the caller.
#[derive(Debug, Clone)]
pub enum LoginMethod {
    Password { email: String, password: String },
    MagicLink { email: String },
    OAuth { provider: String },
    Sso { hint: SsoHint },
}

/// Authenticate-or-redirect outcome shared by every login method.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Credentials verified; a session was issued.
    SignedIn(IssuedSession),
    /// A one-time link was dispatched; authentication completes later.
    ChallengeSent,
    /// The caller must hand off to a federated provider.
    Redirect { url: String },
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn IdentityStore>,
    email: Arc<dyn EmailProvider>,
    lockout: LockoutService,
    tokens: TokenService,
    sessions: SessionService,
    sso: SsoService,
    ttls: TokenTtlConfig,
    oauth: OAuthConfig,
    base_url: String,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn IdentityStore>,
        email: Arc<dyn EmailProvider>,
        lockout: LockoutService,
        tokens: TokenService,
        sessions: SessionService,
        sso: SsoService,
        ttls: TokenTtlConfig,
        oauth: OAuthConfig,
        base_url: String,
    ) -> Self {
        Self {
            store,
            email,
            lockout,
            tokens,
            sessions,
            sso,
            ttls,
            oauth,
            base_url,
        }
    }

    /// Verify password credentials.
    ///
    /// Unknown identities and locked accounts still burn a full hash
    /// verification and return the same generic error as a mismatch.
    /// Failures while locked keep accruing; they never shorten the lock.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let password = Password::new(password.to_string());

        let user = match self.store.find_user_by_email(email).await? {
            Some(user) => user,
            None => {
                dummy_verify(&password);
                return Err(ServiceError::InvalidCredentials);
            }
        };

        let locked = self.lockout.is_locked(&user.email).await?;

        let verified = match &user.password_hash {
            Some(hash) => {
                verify_password(&password, &PasswordHashString::new(hash.clone())).is_ok()
            }
            None => {
                dummy_verify(&password);
                false
            }
        };

        if !verified {
            let state = self.lockout.record_failure(&user.email).await?;
            if self.lockout.just_locked(&state) {
                self.dispatch_unlock_email(&user.email).await;
            }
            return Err(ServiceError::InvalidCredentials);
        }

        if locked {
            // Correct password, but the window has not elapsed.
            return Err(ServiceError::InvalidCredentials);
        }

        self.lockout.record_success(&user.email).await?;

        Ok(user)
    }

    /// Dispatch one login method to its outcome.
    pub async fn login(
        &self,
        method: LoginMethod,
        base_url: &str,
    ) -> Result<LoginOutcome, ServiceError> {
        match method {
            LoginMethod::Password { email, password } => {
                let user = self.authenticate(&email, &password).await?;
                let session = self.sessions.issue(&user, None).await?;
                Ok(LoginOutcome::SignedIn(session))
            }
            LoginMethod::MagicLink { email } => {
                self.request_magic_link(&email, base_url).await?;
                Ok(LoginOutcome::ChallengeSent)
            }
            LoginMethod::OAuth { provider } => Ok(LoginOutcome::Redirect {
                url: self.oauth_redirect_url(&provider)?,
            }),
            LoginMethod::Sso { hint } => {
                let resolution = self.sso.resolve(&hint).await?;
                Ok(LoginOutcome::Redirect {
                    url: self.sso.redirect_url(&resolution),
                })
            }
        }
    }

    /// Request a passwordless sign-in link. Succeeds whether or not the
    /// email is registered.
    pub async fn request_magic_link(&self, email: &str, base_url: &str) -> Result<(), ServiceError> {
        if let Some(user) = self.store.find_user_by_email(email).await? {
            let token = self
                .tokens
                .issue(
                    TokenPurpose::MagicLink,
                    &user.email,
                    Duration::minutes(self.ttls.magic_link_minutes),
                )
                .await?;
            self.email
                .send_magic_link(&user.email, &token, base_url)
                .await
                .map_err(|e| ServiceError::EmailError(e.to_string()))?;

            tracing::info!(user_id = %user.user_id, "Magic link requested");
        }
        Ok(())
    }

    /// Complete a passwordless sign-in. Consuming the token proves control
    /// of the inbox, which also verifies the email and clears any lockout.
    pub async fn verify_magic_link(&self, token: &str) -> Result<IssuedSession, ServiceError> {
        let claims = self.tokens.consume(token).await?;
        if claims.purpose != TokenPurpose::MagicLink {
            return Err(ServiceError::NotFound);
        }

        let user = self
            .store
            .find_user_by_email(&claims.identifier)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if !user.email_verified {
            self.store.mark_email_verified(user.user_id).await?;
        }
        self.lockout.record_success(&user.email).await?;

        self.sessions.issue(&user, None).await
    }

    /// Create an account. Dispatches a verification link on success.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
        base_url: &str,
    ) -> Result<User, ServiceError> {
        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(ServiceError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&Password::new(password.to_string()))
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e)))?;

        let user = User::new(email.to_string(), name, Some(password_hash.into_string()));
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.user_id, "User registered");

        let token = self
            .tokens
            .issue(
                TokenPurpose::EmailVerification,
                &user.email,
                Duration::hours(self.ttls.email_verification_hours),
            )
            .await?;
        self.email
            .send_verification(&user.email, &token, base_url)
            .await
            .map_err(|e| ServiceError::EmailError(e.to_string()))?;

        Ok(user)
    }

    /// Re-send a verification link. Succeeds whether or not the email is
    /// registered; a fresh token supersedes outstanding ones.
    pub async fn request_email_verification(
        &self,
        email: &str,
        base_url: &str,
    ) -> Result<(), ServiceError> {
        if let Some(user) = self.store.find_user_by_email(email).await? {
            if user.email_verified {
                return Ok(());
            }
            self.tokens
                .invalidate(TokenPurpose::EmailVerification, &user.email)
                .await?;
            let token = self
                .tokens
                .issue(
                    TokenPurpose::EmailVerification,
                    &user.email,
                    Duration::hours(self.ttls.email_verification_hours),
                )
                .await?;
            self.email
                .send_verification(&user.email, &token, base_url)
                .await
                .map_err(|e| ServiceError::EmailError(e.to_string()))?;
        }
        Ok(())
    }

    pub async fn verify_email(&self, token: &str) -> Result<(), ServiceError> {
        let claims = self.tokens.consume(token).await?;
        if claims.purpose != TokenPurpose::EmailVerification {
            return Err(ServiceError::NotFound);
        }

        let user = self
            .store
            .find_user_by_email(&claims.identifier)
            .await?
            .ok_or(ServiceError::NotFound)?;
        self.store.mark_email_verified(user.user_id).await?;

        tracing::info!(user_id = %user.user_id, "Email verified");

        Ok(())
    }

    /// Request a password reset link. Succeeds whether or not the email
    /// is registered.
    pub async fn request_password_reset(
        &self,
        email: &str,
        base_url: &str,
    ) -> Result<(), ServiceError> {
        if let Some(user) = self.store.find_user_by_email(email).await? {
            let token = self
                .tokens
                .issue(
                    TokenPurpose::PasswordReset,
                    &user.email,
                    Duration::minutes(self.ttls.password_reset_minutes),
                )
                .await?;
            self.email
                .send_password_reset(&user.email, &token, base_url)
                .await
                .map_err(|e| ServiceError::EmailError(e.to_string()))?;

            tracing::info!(user_id = %user.user_id, "Password reset requested");
        }
        Ok(())
    }

    /// Set a new password. Every existing session is revoked.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let claims = self.tokens.consume(token).await?;
        if claims.purpose != TokenPurpose::PasswordReset {
            return Err(ServiceError::NotFound);
        }

        let user = self
            .store
            .find_user_by_email(&claims.identifier)
            .await?
            .ok_or(ServiceError::NotFound)?;

        let password_hash = hash_password(&Password::new(new_password.to_string()))
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e)))?;

        self.store
            .update_password_hash(user.user_id, password_hash.as_str())
            .await?;
        self.sessions.revoke_all(user.user_id, None).await?;

        tracing::info!(user_id = %user.user_id, "Password reset successful");

        Ok(())
    }

    /// Request a fresh unlock link, superseding outstanding ones.
    /// Succeeds whether or not the email is registered.
    pub async fn request_unlock(&self, email: &str, base_url: &str) -> Result<(), ServiceError> {
        if let Some(user) = self.store.find_user_by_email(email).await? {
            self.tokens
                .invalidate(TokenPurpose::AccountUnlock, &user.email)
                .await?;
            let token = self
                .tokens
                .issue(
                    TokenPurpose::AccountUnlock,
                    &user.email,
                    Duration::hours(self.ttls.account_unlock_hours),
                )
                .await?;
            self.email
                .send_account_unlock(&user.email, &token, base_url)
                .await
                .map_err(|e| ServiceError::EmailError(e.to_string()))?;

            tracing::info!(user_id = %user.user_id, "Unlock link requested");
        }
        Ok(())
    }

    /// Consume an unlock token: clears the lock and invalidates any other
    /// outstanding unlock tokens for the identity.
    pub async fn confirm_unlock(&self, token: &str) -> Result<(), ServiceError> {
        let claims = self.tokens.consume(token).await?;
        if claims.purpose != TokenPurpose::AccountUnlock {
            return Err(ServiceError::NotFound);
        }

        self.lockout.record_success(&claims.identifier).await?;
        self.tokens
            .invalidate(TokenPurpose::AccountUnlock, &claims.identifier)
            .await?;

        tracing::info!("Account unlocked");

        Ok(())
    }

    fn oauth_redirect_url(&self, provider: &str) -> Result<String, ServiceError> {
        if provider != "google" {
            return Err(ServiceError::ValidationError(format!(
                "Unknown OAuth provider: {}",
                provider
            )));
        }

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile",
            self.oauth.authorize_url, self.oauth.client_id, self.oauth.redirect_uri
        ))
    }

    /// Best-effort: a failed unlock email must not mask the login result.
    async fn dispatch_unlock_email(&self, email: &str) {
        let issued = self
            .tokens
            .issue(
                TokenPurpose::AccountUnlock,
                email,
                Duration::hours(self.ttls.account_unlock_hours),
            )
            .await;

        match issued {
            Ok(token) => {
                if let Err(e) = self
                    .email
                    .send_account_unlock(email, &token, &self.base_url)
                    .await
                {
                    tracing::error!(error = %e, "Failed to send unlock email");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to issue unlock token"),
        }
    }
}
