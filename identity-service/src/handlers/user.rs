use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use service_core::error::AppError;

use crate::{middleware::CurrentSession, models::SanitizedUser, store::IdentityStore, AppState};

/// Get the signed-in user's profile
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user", body = SanitizedUser),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store
        .find_user_by_id(current.0.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    Ok((StatusCode::OK, Json(SanitizedUser::from(user))))
}
