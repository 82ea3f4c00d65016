use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::AppState;

/// Identity of the session making the request, inserted as an extension
/// by `session_auth_middleware`.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub crate::services::SessionIdentity);

/// Require a valid bearer session token on the request.
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing bearer token")))?;

    let identity = state
        .sessions
        .introspect(token)
        .await
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid or expired session")))?;

    req.extensions_mut().insert(CurrentSession(identity));

    Ok(next.run(req).await)
}
