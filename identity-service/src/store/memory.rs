//! In-memory store implementation.
//!
//! Backs the test suite and embedded deployments. Per-key atomicity
//! comes from dashmap's shard locking: a `get_mut` or `entry` guard
//! holds the shard for the duration of the conditional mutation.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    Invitation, LockoutPolicy, LockoutState, SecurityToken, Session, SsoConnection, Team,
    TeamMember, TokenPurpose, User,
};
use crate::store::{ConsumeOutcome, IdentityStore};

/// In-memory store, keyed the same way the relational schema is indexed.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    teams: DashMap<Uuid, Team>,
    members: DashMap<(Uuid, Uuid), TeamMember>,
    tokens: DashMap<String, SecurityToken>,
    lockouts: DashMap<String, LockoutState>,
    invitations: DashMap<Uuid, Invitation>,
    connections: DashMap<Uuid, SsoConnection>,
    sessions: DashMap<Uuid, Session>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    // ==================== User Operations ====================

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.clone()))
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), AppError> {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.password_hash = Some(password_hash.to_string());
        }
        Ok(())
    }

    async fn mark_email_verified(&self, user_id: Uuid) -> Result<(), AppError> {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.email_verified = true;
        }
        Ok(())
    }

    // ==================== Team Operations ====================

    async fn insert_team(&self, team: &Team) -> Result<(), AppError> {
        self.teams.insert(team.team_id, team.clone());
        Ok(())
    }

    async fn find_team_by_id(&self, team_id: Uuid) -> Result<Option<Team>, AppError> {
        Ok(self.teams.get(&team_id).map(|t| t.clone()))
    }

    async fn find_team_by_slug(&self, slug: &str) -> Result<Option<Team>, AppError> {
        Ok(self
            .teams
            .iter()
            .find(|t| t.slug == slug)
            .map(|t| t.clone()))
    }

    async fn upsert_team_member(&self, member: &TeamMember) -> Result<(), AppError> {
        self.members
            .insert((member.team_id, member.user_id), member.clone());
        Ok(())
    }

    async fn find_team_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TeamMember>, AppError> {
        Ok(self.members.get(&(team_id, user_id)).map(|m| m.clone()))
    }

    // ==================== Security Token Operations ====================

    async fn insert_security_token(&self, token: &SecurityToken) -> Result<(), AppError> {
        self.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_security_token(&self, token: &str) -> Result<Option<SecurityToken>, AppError> {
        Ok(self.tokens.get(token).map(|t| t.clone()))
    }

    async fn consume_security_token(&self, token: &str) -> Result<ConsumeOutcome, AppError> {
        // The shard guard makes check-and-set a single critical section.
        match self.tokens.get_mut(token) {
            Some(mut row) => {
                if row.consumed_utc.is_some() {
                    Ok(ConsumeOutcome::AlreadyConsumed)
                } else if row.is_expired() {
                    Ok(ConsumeOutcome::Expired)
                } else {
                    row.consumed_utc = Some(Utc::now());
                    Ok(ConsumeOutcome::Consumed)
                }
            }
            None => Ok(ConsumeOutcome::NotFound),
        }
    }

    async fn delete_security_tokens(
        &self,
        purpose: TokenPurpose,
        identifier: &str,
    ) -> Result<u64, AppError> {
        let identifier = identifier.to_lowercase();
        let doomed: Vec<String> = self
            .tokens
            .iter()
            .filter(|t| {
                t.purpose_code == purpose.as_str()
                    && t.identifier.to_lowercase() == identifier
                    && t.consumed_utc.is_none()
            })
            .map(|t| t.token.clone())
            .collect();

        for key in &doomed {
            self.tokens.remove(key);
        }
        Ok(doomed.len() as u64)
    }

    async fn purge_expired_security_tokens(&self) -> Result<u64, AppError> {
        let before = self.tokens.len();
        self.tokens.retain(|_, t| !t.is_expired());
        Ok((before - self.tokens.len()) as u64)
    }

    // ==================== Lockout Operations ====================

    async fn find_lockout_state(&self, identifier: &str) -> Result<Option<LockoutState>, AppError> {
        Ok(self
            .lockouts
            .get(&identifier.to_lowercase())
            .map(|s| s.clone()))
    }

    async fn record_lockout_failure(
        &self,
        identifier: &str,
        policy: &LockoutPolicy,
    ) -> Result<LockoutState, AppError> {
        let key = identifier.to_lowercase();
        let now = Utc::now();

        let mut entry = self.lockouts.entry(key.clone()).or_insert_with(|| LockoutState {
            identifier: key.clone(),
            failed_attempts: 0,
            locked_until: None,
            updated_utc: now,
        });

        entry.failed_attempts += 1;
        entry.updated_utc = now;
        if let Some(backoff) = policy.backoff_seconds(entry.failed_attempts as u32) {
            let candidate = now + chrono::Duration::seconds(backoff);
            // An existing longer lock is never shortened.
            entry.locked_until = Some(match entry.locked_until {
                Some(existing) if existing > candidate => existing,
                _ => candidate,
            });
        }

        Ok(entry.clone())
    }

    async fn clear_lockout_state(&self, identifier: &str) -> Result<(), AppError> {
        if let Some(mut state) = self.lockouts.get_mut(&identifier.to_lowercase()) {
            state.failed_attempts = 0;
            state.locked_until = None;
            state.updated_utc = Utc::now();
        }
        Ok(())
    }

    // ==================== Invitation Operations ====================

    async fn upsert_email_invitation(&self, invitation: &Invitation) -> Result<(), AppError> {
        let existing = self
            .invitations
            .iter()
            .find(|i| {
                i.sent_via_email
                    && i.team_id == invitation.team_id
                    && i.recipient_email == invitation.recipient_email
            })
            .map(|i| i.invitation_id);

        match existing {
            Some(id) => {
                if let Some(mut row) = self.invitations.get_mut(&id) {
                    row.inviter_id = invitation.inviter_id;
                    row.token = invitation.token.clone();
                    row.role_code = invitation.role_code.clone();
                    row.expiry_utc = invitation.expiry_utc;
                    row.created_utc = invitation.created_utc;
                }
            }
            None => {
                self.invitations
                    .insert(invitation.invitation_id, invitation.clone());
            }
        }
        Ok(())
    }

    async fn replace_link_invitation(&self, invitation: &Invitation) -> Result<(), AppError> {
        let existing = self
            .invitations
            .iter()
            .find(|i| !i.sent_via_email && i.team_id == invitation.team_id)
            .map(|i| i.invitation_id);

        match existing {
            Some(id) => {
                if let Some(mut row) = self.invitations.get_mut(&id) {
                    row.inviter_id = invitation.inviter_id;
                    row.token = invitation.token.clone();
                    row.role_code = invitation.role_code.clone();
                    row.allowed_domains = invitation.allowed_domains.clone();
                    row.expiry_utc = invitation.expiry_utc;
                    row.created_utc = invitation.created_utc;
                }
            }
            None => {
                self.invitations
                    .insert(invitation.invitation_id, invitation.clone());
            }
        }
        Ok(())
    }

    async fn find_invitation_by_token(&self, token: &str) -> Result<Option<Invitation>, AppError> {
        Ok(self
            .invitations
            .iter()
            .find(|i| i.token == token)
            .map(|i| i.clone()))
    }

    async fn find_invitation_by_id(
        &self,
        invitation_id: Uuid,
    ) -> Result<Option<Invitation>, AppError> {
        Ok(self.invitations.get(&invitation_id).map(|i| i.clone()))
    }

    async fn list_team_invitations(&self, team_id: Uuid) -> Result<Vec<Invitation>, AppError> {
        let mut rows: Vec<Invitation> = self
            .invitations
            .iter()
            .filter(|i| i.team_id == team_id)
            .map(|i| i.clone())
            .collect();
        rows.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(rows)
    }

    async fn delete_invitation(&self, invitation_id: Uuid) -> Result<bool, AppError> {
        Ok(self.invitations.remove(&invitation_id).is_some())
    }

    async fn purge_expired_invitations(&self) -> Result<u64, AppError> {
        let before = self.invitations.len();
        self.invitations.retain(|_, i| !i.is_expired());
        Ok((before - self.invitations.len()) as u64)
    }

    // ==================== SSO Connection Operations ====================

    async fn insert_sso_connection(&self, connection: &SsoConnection) -> Result<(), AppError> {
        self.connections
            .insert(connection.connection_id, connection.clone());
        Ok(())
    }

    async fn delete_sso_connection(&self, connection_id: Uuid) -> Result<bool, AppError> {
        Ok(self.connections.remove(&connection_id).is_some())
    }

    async fn find_sso_connections_by_domain(
        &self,
        domain: &str,
    ) -> Result<Vec<SsoConnection>, AppError> {
        let domain = domain.to_lowercase();
        Ok(self
            .connections
            .iter()
            .filter(|c| c.domain.as_deref() == Some(domain.as_str()))
            .map(|c| c.clone())
            .collect())
    }

    async fn find_sso_connection_by_team(
        &self,
        team_id: Uuid,
    ) -> Result<Option<SsoConnection>, AppError> {
        Ok(self
            .connections
            .iter()
            .find(|c| c.team_id == team_id)
            .map(|c| c.clone()))
    }

    // ==================== Session Operations ====================

    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        self.sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn find_session_by_id(&self, session_id: Uuid) -> Result<Option<Session>, AppError> {
        Ok(self.sessions.get(&session_id).map(|s| s.clone()))
    }

    async fn find_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, AppError> {
        Ok(self
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash && s.revoked_utc.is_none())
            .map(|s| s.clone()))
    }

    async fn revoke_session(&self, session_id: Uuid) -> Result<bool, AppError> {
        match self.sessions.get_mut(&session_id) {
            Some(mut session) if session.revoked_utc.is_none() => {
                session.revoked_utc = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_sessions(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
    ) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut revoked = 0u64;
        for mut session in self.sessions.iter_mut() {
            if session.user_id == user_id
                && session.revoked_utc.is_none()
                && Some(session.session_id) != except
            {
                session.revoked_utc = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn list_active_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, AppError> {
        let mut rows: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.is_valid())
            .map(|s| s.clone())
            .collect();
        rows.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(rows)
    }

    async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired());
        Ok((before - self.sessions.len()) as u64)
    }

    // ==================== Health ====================

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
