use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::invitation::{CreateInvitationRequest, InvitationGrantResponse, InvitationResponse},
    handlers::require_team_admin,
    middleware::CurrentSession,
    models::InvitationRole,
    services::EmailProvider,
    utils::ValidatedJson,
    AppState,
};

/// Create a team invitation, per email or as a shareable link
#[utoipa::path(
    post,
    path = "/teams/{slug}/invitations",
    params(("slug" = String, Path, description = "Team slug")),
    request_body = CreateInvitationRequest,
    responses(
        (status = 201, description = "Invitation created", body = InvitationResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invitations"
)]
pub async fn create_invitation(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(slug): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateInvitationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let team = require_team_admin(&state, &slug, current.0.user_id).await?;

    let role: InvitationRole = req
        .role
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let invitation = if req.sent_via_email {
        let email = req.email.ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Recipient email is required"))
        })?;
        let invitation = state
            .invitations
            .create_email_invite(team.team_id, current.0.user_id, &email, role)
            .await?;

        state
            .email
            .send_invitation(&email, &invitation.token, &team.name, &state.config.base_url)
            .await?;

        invitation
    } else {
        state
            .invitations
            .create_link_invite(
                team.team_id,
                current.0.user_id,
                req.allowed_domains.unwrap_or_default(),
                role,
            )
            .await?
    };

    Ok((
        StatusCode::CREATED,
        Json(InvitationResponse::from(invitation)),
    ))
}

/// List a team's invitations
#[utoipa::path(
    get,
    path = "/teams/{slug}/invitations",
    params(("slug" = String, Path, description = "Team slug")),
    responses(
        (status = 200, description = "Invitations", body = [InvitationResponse]),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invitations"
)]
pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let team = require_team_admin(&state, &slug, current.0.user_id).await?;

    let invitations = state.invitations.list(team.team_id).await?;
    let responses: Vec<InvitationResponse> =
        invitations.into_iter().map(InvitationResponse::from).collect();

    Ok((StatusCode::OK, Json(responses)))
}

/// Revoke an invitation
#[utoipa::path(
    delete,
    path = "/teams/{slug}/invitations/{invitation_id}",
    params(
        ("slug" = String, Path, description = "Team slug"),
        ("invitation_id" = Uuid, Path, description = "Invitation to revoke")
    ),
    responses(
        (status = 200, description = "Invitation revoked"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Unknown invitation", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invitations"
)]
pub async fn revoke_invitation(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path((slug, invitation_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let team = require_team_admin(&state, &slug, current.0.user_id).await?;

    state.invitations.revoke(team.team_id, invitation_id).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Invitation revoked" })),
    ))
}

/// Inspect an invitation token
#[utoipa::path(
    get,
    path = "/invitations/{token}",
    params(("token" = String, Path, description = "Invitation token")),
    responses(
        (status = 200, description = "Invitation details", body = InvitationGrantResponse),
        (status = 400, description = "Expired invitation", body = ErrorResponse),
        (status = 404, description = "Invalid invitation", body = ErrorResponse)
    ),
    tag = "Invitations"
)]
pub async fn validate_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let grant = state.invitations.validate(&token).await?;

    Ok((StatusCode::OK, Json(InvitationGrantResponse::from(grant))))
}

/// Accept an invitation as the signed-in user
#[utoipa::path(
    post,
    path = "/invitations/{token}/accept",
    params(("token" = String, Path, description = "Invitation token")),
    responses(
        (status = 200, description = "Role granted", body = InvitationGrantResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Email domain not allowed", body = ErrorResponse),
        (status = 404, description = "Invalid invitation", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invitations"
)]
pub async fn accept_invitation(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let grant = state.invitations.consume(&token, current.0.user_id).await?;

    Ok((StatusCode::OK, Json(InvitationGrantResponse::from(grant))))
}
