use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::auth::{MagicLinkRequest, SessionResponse, VerifyTokenQuery},
    services::{LoginMethod, LoginOutcome},
    utils::ValidatedJson,
    AppState,
};

/// Request a passwordless sign-in link
#[utoipa::path(
    post,
    path = "/auth/magic-link",
    request_body = MagicLinkRequest,
    responses(
        (status = 200, description = "Request received"),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn request_magic_link(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<MagicLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .auth
        .login(
            LoginMethod::MagicLink { email: req.email },
            &state.config.base_url,
        )
        .await?;

    match outcome {
        LoginOutcome::ChallengeSent => Ok((
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "If your email is registered, a sign-in link is on its way."
            })),
        )),
        _ => Err(AppError::InternalError(anyhow::anyhow!(
            "Unexpected login outcome for magic-link method"
        ))),
    }
}

/// Complete a passwordless sign-in
#[utoipa::path(
    get,
    path = "/auth/magic-link/verify",
    params(VerifyTokenQuery),
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 400, description = "Expired link", body = ErrorResponse),
        (status = 404, description = "Invalid link", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn verify_magic_link(
    State(state): State<AppState>,
    Query(query): Query<VerifyTokenQuery>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.auth.verify_magic_link(&query.token).await?;

    Ok((StatusCode::OK, Json(SessionResponse::from(session))))
}
