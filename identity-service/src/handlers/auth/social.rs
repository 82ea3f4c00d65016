use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use service_core::error::AppError;

use crate::{
    services::{LoginMethod, LoginOutcome},
    AppState,
};

/// Start a federated OAuth sign-in
#[utoipa::path(
    get,
    path = "/auth/oauth/{provider}",
    params(("provider" = String, Path, description = "OAuth provider, e.g. google")),
    responses(
        (status = 307, description = "Redirect to the provider"),
        (status = 400, description = "Unknown provider", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn oauth_login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .auth
        .login(LoginMethod::OAuth { provider }, &state.config.base_url)
        .await?;

    match outcome {
        LoginOutcome::Redirect { url } => Ok(Redirect::temporary(&url)),
        _ => Err(AppError::InternalError(anyhow::anyhow!(
            "Unexpected login outcome for OAuth method"
        ))),
    }
}
