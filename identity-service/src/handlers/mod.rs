pub mod auth;
pub mod invitation;
pub mod sso;
pub mod user;

use service_core::error::AppError;
use uuid::Uuid;

use crate::models::Team;
use crate::store::IdentityStore;
use crate::AppState;

/// Resolve a team by slug and require the caller to hold an admin role
/// on it.
pub(crate) async fn require_team_admin(
    state: &AppState,
    slug: &str,
    user_id: Uuid,
) -> Result<Team, AppError> {
    let team = state
        .store
        .find_team_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Team not found")))?;

    let member = state
        .store
        .find_team_member(team.team_id, user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden(anyhow::anyhow!("Not a member of this team")))?;

    if member.role_code != "owner" && member.role_code != "admin" {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Admin role required for this operation"
        )));
    }

    Ok(team)
}
