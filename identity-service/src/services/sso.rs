//! SSO tenant resolver - maps a login hint to the identity-provider
//! connection of exactly one team, or reports why it cannot.

use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{SsoConnection, Team};
use crate::services::ServiceError;
use crate::store::IdentityStore;

/// A login hint: an email resolved by domain, or an explicit team slug.
#[derive(Debug, Clone)]
pub enum SsoHint {
    Email(String),
    Slug(String),
}

/// A resolved tenant, ready for the provider redirect.
#[derive(Debug, Clone)]
pub struct SsoResolution {
    pub team: Team,
    pub connection: SsoConnection,
}

#[derive(Clone)]
pub struct SsoService {
    store: Arc<dyn IdentityStore>,
}

impl SsoService {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Resolve a hint to a single tenant. Zero matches report NotFound;
    /// a shared domain registered by several teams reports Ambiguous and
    /// the caller re-submits with an explicit slug.
    pub async fn resolve(&self, hint: &SsoHint) -> Result<SsoResolution, ServiceError> {
        match hint {
            SsoHint::Email(email) => {
                let domain = email
                    .rsplit_once('@')
                    .map(|(_, domain)| domain)
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| {
                        ServiceError::ValidationError("Invalid email address".to_string())
                    })?;

                let connections = self.store.find_sso_connections_by_domain(domain).await?;
                let teams: BTreeSet<Uuid> = connections.iter().map(|c| c.team_id).collect();

                match teams.len() {
                    0 => Err(ServiceError::NotFound),
                    1 => {
                        let connection = connections.into_iter().next().expect("non-empty");
                        self.resolution_for(connection).await
                    }
                    _ => Err(ServiceError::Ambiguous),
                }
            }
            SsoHint::Slug(slug) => {
                let team = self
                    .store
                    .find_team_by_slug(slug)
                    .await?
                    .ok_or(ServiceError::NotFound)?;
                let connection = self
                    .store
                    .find_sso_connection_by_team(team.team_id)
                    .await?
                    .ok_or(ServiceError::NotFound)?;
                Ok(SsoResolution { team, connection })
            }
        }
    }

    /// Build the provider hand-off URL for a resolved tenant.
    pub fn redirect_url(&self, resolution: &SsoResolution) -> String {
        format!(
            "{}?tenant={}&product={}",
            resolution.connection.sso_url, resolution.team.team_id, resolution.connection.product_id
        )
    }

    /// Register a connection for a team. A team holds at most one.
    pub async fn register_connection(
        &self,
        team_id: Uuid,
        domain: Option<String>,
        product_id: String,
        issuer: String,
        sso_url: String,
    ) -> Result<SsoConnection, ServiceError> {
        let team = self
            .store
            .find_team_by_id(team_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if self
            .store
            .find_sso_connection_by_team(team_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Team {} already has an SSO connection",
                team.slug
            )));
        }

        let connection = SsoConnection::new(team_id, domain, product_id, issuer, sso_url);
        self.store.insert_sso_connection(&connection).await?;

        tracing::info!(team = %team.slug, "SSO connection registered");

        Ok(connection)
    }

    pub async fn remove_connection(&self, connection_id: Uuid) -> Result<(), ServiceError> {
        if !self.store.delete_sso_connection(connection_id).await? {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }

    async fn resolution_for(&self, connection: SsoConnection) -> Result<SsoResolution, ServiceError> {
        let team = self
            .store
            .find_team_by_id(connection.team_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        Ok(SsoResolution { team, connection })
    }
}
