use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::auth::{RegisterRequest, RegisterResponse, ResendVerificationRequest, VerifyTokenQuery},
    utils::ValidatedJson,
    AppState,
};

/// Create an account, optionally through an invitation
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 403, description = "Email domain not allowed by the invitation", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Surface a dead invitation before the account exists.
    if let Some(token) = &req.invitation_token {
        state.invitations.validate(token).await?;
    }

    let user = state
        .auth
        .register(&req.email, &req.password, req.name, &state.config.base_url)
        .await?;

    if let Some(token) = &req.invitation_token {
        state.invitations.consume(token, user.user_id).await?;
    }

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.user_id,
            message: "Registration successful. Please check your email to verify your account."
                .to_string(),
        }),
    ))
}

/// Verify an email address with an emailed token
#[utoipa::path(
    get,
    path = "/auth/verify-email",
    params(VerifyTokenQuery),
    responses(
        (status = 200, description = "Email verified"),
        (status = 400, description = "Expired link", body = ErrorResponse),
        (status = 404, description = "Invalid link", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyTokenQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.verify_email(&query.token).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Email verified successfully" })),
    ))
}

/// Re-send the verification email
#[utoipa::path(
    post,
    path = "/auth/verify-email/resend",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Request received"),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn resend_verification(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResendVerificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .request_email_verification(&req.email, &state.config.base_url)
        .await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "If your email is registered, a new verification link is on its way."
        })),
    ))
}
