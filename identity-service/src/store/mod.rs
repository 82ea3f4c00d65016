//! Storage contract for the identity service.
//!
//! The two read-then-write races in this system - token consumption and
//! lockout-counter increment - are expressed as single conditional
//! operations on this trait, so every backing store must resolve them
//! with exactly one winner.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    Invitation, LockoutPolicy, LockoutState, SecurityToken, Session, SsoConnection, Team,
    TeamMember, TokenPurpose, User,
};

/// Outcome of the conditional token-consume write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed,
    AlreadyConsumed,
    Expired,
    NotFound,
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    // ==================== User Operations ====================

    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), AppError>;
    async fn mark_email_verified(&self, user_id: Uuid) -> Result<(), AppError>;

    // ==================== Team Operations ====================

    async fn insert_team(&self, team: &Team) -> Result<(), AppError>;
    async fn find_team_by_id(&self, team_id: Uuid) -> Result<Option<Team>, AppError>;
    async fn find_team_by_slug(&self, slug: &str) -> Result<Option<Team>, AppError>;
    async fn upsert_team_member(&self, member: &TeamMember) -> Result<(), AppError>;
    async fn find_team_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TeamMember>, AppError>;

    // ==================== Security Token Operations ====================

    async fn insert_security_token(&self, token: &SecurityToken) -> Result<(), AppError>;
    async fn find_security_token(&self, token: &str) -> Result<Option<SecurityToken>, AppError>;

    /// Consume a token with one conditional write: the token must match,
    /// be unconsumed, and be unexpired. Of two concurrent callers exactly
    /// one observes `Consumed`.
    async fn consume_security_token(&self, token: &str) -> Result<ConsumeOutcome, AppError>;

    /// Delete outstanding unconsumed tokens for an identifier and purpose.
    /// Returns the number of tokens invalidated.
    async fn delete_security_tokens(
        &self,
        purpose: TokenPurpose,
        identifier: &str,
    ) -> Result<u64, AppError>;

    async fn purge_expired_security_tokens(&self) -> Result<u64, AppError>;

    // ==================== Lockout Operations ====================

    async fn find_lockout_state(&self, identifier: &str) -> Result<Option<LockoutState>, AppError>;

    /// Atomically increment the failure counter, applying `policy` when the
    /// new count crosses the threshold. An existing lock is never shortened.
    async fn record_lockout_failure(
        &self,
        identifier: &str,
        policy: &LockoutPolicy,
    ) -> Result<LockoutState, AppError>;

    /// Reset the counter to zero and clear any lock.
    async fn clear_lockout_state(&self, identifier: &str) -> Result<(), AppError>;

    // ==================== Invitation Operations ====================

    /// Insert an email invitation, replacing any prior invite for the same
    /// team and recipient (the superseded token stops validating).
    async fn upsert_email_invitation(&self, invitation: &Invitation) -> Result<(), AppError>;

    /// Insert or replace the team's single active link invitation.
    async fn replace_link_invitation(&self, invitation: &Invitation) -> Result<(), AppError>;

    async fn find_invitation_by_token(&self, token: &str) -> Result<Option<Invitation>, AppError>;
    async fn find_invitation_by_id(
        &self,
        invitation_id: Uuid,
    ) -> Result<Option<Invitation>, AppError>;
    async fn list_team_invitations(&self, team_id: Uuid) -> Result<Vec<Invitation>, AppError>;
    async fn delete_invitation(&self, invitation_id: Uuid) -> Result<bool, AppError>;
    async fn purge_expired_invitations(&self) -> Result<u64, AppError>;

    // ==================== SSO Connection Operations ====================

    async fn insert_sso_connection(&self, connection: &SsoConnection) -> Result<(), AppError>;
    async fn delete_sso_connection(&self, connection_id: Uuid) -> Result<bool, AppError>;
    async fn find_sso_connections_by_domain(
        &self,
        domain: &str,
    ) -> Result<Vec<SsoConnection>, AppError>;
    async fn find_sso_connection_by_team(
        &self,
        team_id: Uuid,
    ) -> Result<Option<SsoConnection>, AppError>;

    // ==================== Session Operations ====================

    async fn insert_session(&self, session: &Session) -> Result<(), AppError>;
    async fn find_session_by_id(&self, session_id: Uuid) -> Result<Option<Session>, AppError>;
    async fn find_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, AppError>;
    async fn revoke_session(&self, session_id: Uuid) -> Result<bool, AppError>;

    /// Revoke every active session for a user, optionally sparing one.
    /// Returns the number of sessions revoked.
    async fn revoke_all_sessions(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
    ) -> Result<u64, AppError>;

    async fn list_active_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, AppError>;
    async fn purge_expired_sessions(&self) -> Result<u64, AppError>;

    // ==================== Health ====================

    async fn health_check(&self) -> Result<(), AppError>;
}
