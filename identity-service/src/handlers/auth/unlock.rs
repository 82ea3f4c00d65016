use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::auth::{UnlockAccountRequest, VerifyTokenQuery},
    utils::ValidatedJson,
    AppState,
};

/// Request a fresh account-unlock link
#[utoipa::path(
    post,
    path = "/auth/unlock-account",
    request_body = UnlockAccountRequest,
    responses(
        (status = 200, description = "Request received"),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn request_unlock(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UnlockAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .request_unlock(&req.email, &state.config.base_url)
        .await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "If your email is registered, an unlock link is on its way."
        })),
    ))
}

/// Unlock an account with an emailed token
#[utoipa::path(
    get,
    path = "/auth/unlock-account/verify",
    params(VerifyTokenQuery),
    responses(
        (status = 200, description = "Account unlocked"),
        (status = 400, description = "Expired link", body = ErrorResponse),
        (status = 404, description = "Invalid link", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn confirm_unlock(
    State(state): State<AppState>,
    Query(query): Query<VerifyTokenQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.confirm_unlock(&query.token).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Account unlocked. You can now sign in." })),
    ))
}
