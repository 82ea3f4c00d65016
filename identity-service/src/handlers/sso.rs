use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::sso::{CreateSsoConnectionRequest, SsoConnectionResponse, SsoVerifyRequest},
    handlers::require_team_admin,
    middleware::CurrentSession,
    services::{ServiceError, SsoHint},
    utils::ValidatedJson,
    AppState,
};

/// Resolve a login hint to an SSO tenant
///
/// A shared email domain registered by several teams answers with
/// `use_slug`, prompting the caller to retry with an explicit team slug.
#[utoipa::path(
    post,
    path = "/auth/sso/verify",
    request_body = SsoVerifyRequest,
    responses(
        (status = 200, description = "Tenant resolved, or use_slug prompt"),
        (status = 404, description = "No SSO connection configured", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "SSO"
)]
pub async fn sso_verify(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SsoVerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let hint = match (req.slug, req.email) {
        (Some(slug), _) if !slug.trim().is_empty() => SsoHint::Slug(slug.trim().to_string()),
        (_, Some(email)) if !email.trim().is_empty() => SsoHint::Email(email.trim().to_string()),
        _ => {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Either an email or a team slug is required"
            )))
        }
    };

    match state.sso.resolve(&hint).await {
        Ok(resolution) => {
            let redirect_url = state.sso.redirect_url(&resolution);
            Ok((
                StatusCode::OK,
                Json(serde_json::json!({
                    "data": {
                        "team_id": resolution.team.team_id,
                        "product": resolution.connection.product_id,
                        "redirect_url": redirect_url,
                    }
                })),
            ))
        }
        // The caller toggles to slug entry; no candidate list is leaked.
        Err(ServiceError::Ambiguous) => Ok((
            StatusCode::OK,
            Json(serde_json::json!({ "data": { "use_slug": true } })),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Register an SSO connection for a team
#[utoipa::path(
    post,
    path = "/teams/{slug}/sso",
    params(("slug" = String, Path, description = "Team slug")),
    request_body = CreateSsoConnectionRequest,
    responses(
        (status = 201, description = "Connection registered", body = SsoConnectionResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Team already has a connection", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "SSO"
)]
pub async fn create_sso_connection(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(slug): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateSsoConnectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let team = require_team_admin(&state, &slug, current.0.user_id).await?;

    let connection = state
        .sso
        .register_connection(
            team.team_id,
            req.domain,
            req.product_id,
            req.issuer,
            req.sso_url,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SsoConnectionResponse::from(connection)),
    ))
}

/// Remove a team's SSO connection
#[utoipa::path(
    delete,
    path = "/teams/{slug}/sso/{connection_id}",
    params(
        ("slug" = String, Path, description = "Team slug"),
        ("connection_id" = Uuid, Path, description = "Connection to remove")
    ),
    responses(
        (status = 200, description = "Connection removed"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Unknown connection", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "SSO"
)]
pub async fn delete_sso_connection(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path((slug, connection_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    require_team_admin(&state, &slug, current.0.user_id).await?;

    state.sso.remove_connection(connection_id).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "SSO connection removed" })),
    ))
}
