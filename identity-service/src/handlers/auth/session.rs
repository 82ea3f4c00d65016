use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::auth::{LoginRequest, RevokeSessionsRequest, SessionResponse},
    middleware::CurrentSession,
    models::SessionInfo,
    services::{LoginMethod, LoginOutcome},
    utils::ValidatedJson,
    AppState,
};

/// Sign in with password credentials
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .auth
        .login(
            LoginMethod::Password {
                email: req.email,
                password: req.password,
            },
            &state.config.base_url,
        )
        .await?;

    match outcome {
        LoginOutcome::SignedIn(session) => {
            Ok((StatusCode::OK, Json(SessionResponse::from(session))))
        }
        _ => Err(AppError::InternalError(anyhow::anyhow!(
            "Unexpected login outcome for password method"
        ))),
    }
}

/// Sign out the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session revoked"),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.revoke(current.0.session_id).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Signed out" })),
    ))
}

/// List the caller's active sessions
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "Active sessions", body = [SessionInfo]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Sessions"
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state.sessions.list(current.0.user_id).await?;

    let infos: Vec<SessionInfo> = sessions
        .into_iter()
        .map(|s| {
            let is_current = s.session_id == current.0.session_id;
            let mut info = SessionInfo::from(s);
            info.is_current = is_current;
            info
        })
        .collect();

    Ok((StatusCode::OK, Json(infos)))
}

/// Sign out everywhere
#[utoipa::path(
    post,
    path = "/sessions/revoke-all",
    request_body = RevokeSessionsRequest,
    responses(
        (status = 200, description = "Sessions revoked"),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Sessions"
)]
pub async fn revoke_all_sessions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(req): Json<RevokeSessionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let except = req.except_current.then_some(current.0.session_id);
    let revoked = state.sessions.revoke_all(current.0.user_id, except).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "revoked": revoked })),
    ))
}

/// Revoke one of the caller's sessions
#[utoipa::path(
    delete,
    path = "/sessions/{session_id}",
    params(("session_id" = Uuid, Path, description = "Session to revoke")),
    responses(
        (status = 200, description = "Session revoked"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Sessions"
)]
pub async fn revoke_session(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .sessions
        .revoke_for_user(current.0.user_id, session_id)
        .await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Session revoked" })),
    ))
}
