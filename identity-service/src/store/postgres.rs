//! PostgreSQL store implementation.
//!
//! Every conditional write is a single statement; no method reads and
//! then writes in separate round trips.

use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{
    Invitation, LockoutPolicy, LockoutState, SecurityToken, Session, SsoConnection, Team,
    TeamMember, TokenPurpose, User,
};
use crate::store::{ConsumeOutcome, IdentityStore};

/// PostgreSQL store wrapper.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    // ==================== User Operations ====================

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, name, password_hash, email_verified, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.email_verified)
        .bind(user.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn mark_email_verified(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET email_verified = TRUE WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== Team Operations ====================

    async fn insert_team(&self, team: &Team) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO teams (team_id, slug, name, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(team.team_id)
        .bind(&team.slug)
        .bind(&team.name)
        .bind(team.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn find_team_by_id(&self, team_id: Uuid) -> Result<Option<Team>, AppError> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE team_id = $1")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn find_team_by_slug(&self, slug: &str) -> Result<Option<Team>, AppError> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn upsert_team_member(&self, member: &TeamMember) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO team_members (team_id, user_id, role_code, created_utc)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (team_id, user_id) DO UPDATE SET role_code = EXCLUDED.role_code
            "#,
        )
        .bind(member.team_id)
        .bind(member.user_id)
        .bind(&member.role_code)
        .bind(member.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn find_team_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TeamMember>, AppError> {
        sqlx::query_as::<_, TeamMember>(
            "SELECT * FROM team_members WHERE team_id = $1 AND user_id = $2",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    // ==================== Security Token Operations ====================

    async fn insert_security_token(&self, token: &SecurityToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO security_tokens
                (token_id, identifier, token, purpose_code, expiry_utc, consumed_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.token_id)
        .bind(&token.identifier)
        .bind(&token.token)
        .bind(&token.purpose_code)
        .bind(token.expiry_utc)
        .bind(token.consumed_utc)
        .bind(token.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn find_security_token(&self, token: &str) -> Result<Option<SecurityToken>, AppError> {
        sqlx::query_as::<_, SecurityToken>("SELECT * FROM security_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn consume_security_token(&self, token: &str) -> Result<ConsumeOutcome, AppError> {
        // The conditional write decides the winner; the follow-up read only
        // classifies the loss.
        let result = sqlx::query(
            r#"
            UPDATE security_tokens SET consumed_utc = NOW()
            WHERE token = $1 AND consumed_utc IS NULL AND expiry_utc > NOW()
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        if result.rows_affected() == 1 {
            return Ok(ConsumeOutcome::Consumed);
        }

        match self.find_security_token(token).await? {
            Some(row) if row.is_consumed() => Ok(ConsumeOutcome::AlreadyConsumed),
            Some(_) => Ok(ConsumeOutcome::Expired),
            None => Ok(ConsumeOutcome::NotFound),
        }
    }

    async fn delete_security_tokens(
        &self,
        purpose: TokenPurpose,
        identifier: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM security_tokens
            WHERE purpose_code = $1 AND LOWER(identifier) = LOWER($2) AND consumed_utc IS NULL
            "#,
        )
        .bind(purpose.as_str())
        .bind(identifier)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected())
    }

    async fn purge_expired_security_tokens(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM security_tokens WHERE expiry_utc <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected())
    }

    // ==================== Lockout Operations ====================

    async fn find_lockout_state(&self, identifier: &str) -> Result<Option<LockoutState>, AppError> {
        sqlx::query_as::<_, LockoutState>(
            "SELECT * FROM lockout_states WHERE LOWER(identifier) = LOWER($1)",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn record_lockout_failure(
        &self,
        identifier: &str,
        policy: &LockoutPolicy,
    ) -> Result<LockoutState, AppError> {
        // One upsert: increments, and when the new count exceeds the
        // threshold, extends the lock by the escalating backoff. GREATEST
        // keeps an existing longer lock in place.
        sqlx::query_as::<_, LockoutState>(
            r#"
            INSERT INTO lockout_states (identifier, failed_attempts, locked_until, updated_utc)
            VALUES (LOWER($1), 1, NULL, NOW())
            ON CONFLICT (identifier) DO UPDATE SET
                failed_attempts = lockout_states.failed_attempts + 1,
                locked_until = CASE
                    WHEN lockout_states.failed_attempts + 1 > $2 THEN GREATEST(
                        COALESCE(lockout_states.locked_until, to_timestamp(0)),
                        NOW() + make_interval(secs => LEAST(
                            $4,
                            $3 * power(2, LEAST(lockout_states.failed_attempts - $2, 20))
                        ))
                    )
                    ELSE lockout_states.locked_until
                END,
                updated_utc = NOW()
            RETURNING identifier, failed_attempts, locked_until, updated_utc
            "#,
        )
        .bind(identifier)
        .bind(policy.threshold as i32)
        .bind(policy.base_seconds as f64)
        .bind(policy.cap_seconds as f64)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn clear_lockout_state(&self, identifier: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE lockout_states
            SET failed_attempts = 0, locked_until = NULL, updated_utc = NOW()
            WHERE LOWER(identifier) = LOWER($1)
            "#,
        )
        .bind(identifier)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== Invitation Operations ====================

    async fn upsert_email_invitation(&self, invitation: &Invitation) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO invitations
                (invitation_id, team_id, inviter_id, token, role_code, sent_via_email,
                 recipient_email, allowed_domains, expiry_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, $8, $9)
            ON CONFLICT (team_id, recipient_email) WHERE sent_via_email DO UPDATE SET
                inviter_id = EXCLUDED.inviter_id,
                token = EXCLUDED.token,
                role_code = EXCLUDED.role_code,
                expiry_utc = EXCLUDED.expiry_utc,
                created_utc = EXCLUDED.created_utc
            "#,
        )
        .bind(invitation.invitation_id)
        .bind(invitation.team_id)
        .bind(invitation.inviter_id)
        .bind(&invitation.token)
        .bind(&invitation.role_code)
        .bind(&invitation.recipient_email)
        .bind(&invitation.allowed_domains)
        .bind(invitation.expiry_utc)
        .bind(invitation.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn replace_link_invitation(&self, invitation: &Invitation) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO invitations
                (invitation_id, team_id, inviter_id, token, role_code, sent_via_email,
                 recipient_email, allowed_domains, expiry_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, FALSE, NULL, $6, $7, $8)
            ON CONFLICT (team_id) WHERE NOT sent_via_email DO UPDATE SET
                inviter_id = EXCLUDED.inviter_id,
                token = EXCLUDED.token,
                role_code = EXCLUDED.role_code,
                allowed_domains = EXCLUDED.allowed_domains,
                expiry_utc = EXCLUDED.expiry_utc,
                created_utc = EXCLUDED.created_utc
            "#,
        )
        .bind(invitation.invitation_id)
        .bind(invitation.team_id)
        .bind(invitation.inviter_id)
        .bind(&invitation.token)
        .bind(&invitation.role_code)
        .bind(&invitation.allowed_domains)
        .bind(invitation.expiry_utc)
        .bind(invitation.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn find_invitation_by_token(&self, token: &str) -> Result<Option<Invitation>, AppError> {
        sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn find_invitation_by_id(
        &self,
        invitation_id: Uuid,
    ) -> Result<Option<Invitation>, AppError> {
        sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE invitation_id = $1")
            .bind(invitation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn list_team_invitations(&self, team_id: Uuid) -> Result<Vec<Invitation>, AppError> {
        sqlx::query_as::<_, Invitation>(
            "SELECT * FROM invitations WHERE team_id = $1 ORDER BY created_utc DESC",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn delete_invitation(&self, invitation_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM invitations WHERE invitation_id = $1")
            .bind(invitation_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_invitations(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM invitations WHERE expiry_utc <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected())
    }

    // ==================== SSO Connection Operations ====================

    async fn insert_sso_connection(&self, connection: &SsoConnection) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sso_connections
                (connection_id, team_id, domain, product_id, issuer, sso_url, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(connection.connection_id)
        .bind(connection.team_id)
        .bind(&connection.domain)
        .bind(&connection.product_id)
        .bind(&connection.issuer)
        .bind(&connection.sso_url)
        .bind(connection.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn delete_sso_connection(&self, connection_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sso_connections WHERE connection_id = $1")
            .bind(connection_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_sso_connections_by_domain(
        &self,
        domain: &str,
    ) -> Result<Vec<SsoConnection>, AppError> {
        sqlx::query_as::<_, SsoConnection>(
            "SELECT * FROM sso_connections WHERE domain = LOWER($1)",
        )
        .bind(domain)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn find_sso_connection_by_team(
        &self,
        team_id: Uuid,
    ) -> Result<Option<SsoConnection>, AppError> {
        sqlx::query_as::<_, SsoConnection>("SELECT * FROM sso_connections WHERE team_id = $1")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    // ==================== Session Operations ====================

    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sessions
                (session_id, user_id, team_id, token_hash, expiry_utc, revoked_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.session_id)
        .bind(session.user_id)
        .bind(session.team_id)
        .bind(&session.token_hash)
        .bind(session.expiry_utc)
        .bind(session.revoked_utc)
        .bind(session.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn find_session_by_id(&self, session_id: Uuid) -> Result<Option<Session>, AppError> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn find_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, AppError> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE token_hash = $1 AND revoked_utc IS NULL",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn revoke_session(&self, session_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_utc = NOW() WHERE session_id = $1 AND revoked_utc IS NULL",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_sessions(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET revoked_utc = NOW()
            WHERE user_id = $1 AND revoked_utc IS NULL
              AND ($2::uuid IS NULL OR session_id <> $2)
            "#,
        )
        .bind(user_id)
        .bind(except)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected())
    }

    async fn list_active_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, AppError> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = $1 AND revoked_utc IS NULL AND expiry_utc > NOW()
            ORDER BY created_utc DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expiry_utc <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected())
    }

    // ==================== Health ====================

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }
}
