pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::IdentityConfig;
use crate::services::{
    AuthService, EmailProvider, InvitationService, JwtService, LockoutService, SessionService,
    SsoService, TokenService,
};
use crate::store::IdentityStore;
use service_core::error::AppError;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::registration::register,
        handlers::auth::registration::verify_email,
        handlers::auth::registration::resend_verification,
        handlers::auth::session::login,
        handlers::auth::session::logout,
        handlers::auth::session::list_sessions,
        handlers::auth::session::revoke_all_sessions,
        handlers::auth::session::revoke_session,
        handlers::auth::password::request_password_reset,
        handlers::auth::password::confirm_password_reset,
        handlers::auth::magic_link::request_magic_link,
        handlers::auth::magic_link::verify_magic_link,
        handlers::auth::unlock::request_unlock,
        handlers::auth::unlock::confirm_unlock,
        handlers::auth::social::oauth_login,
        handlers::sso::sso_verify,
        handlers::sso::create_sso_connection,
        handlers::sso::delete_sso_connection,
        handlers::invitation::create_invitation,
        handlers::invitation::list_invitations,
        handlers::invitation::revoke_invitation,
        handlers::invitation::validate_invitation,
        handlers::invitation::accept_invitation,
        handlers::user::get_me,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::RegisterResponse,
            dtos::auth::LoginRequest,
            dtos::auth::SessionResponse,
            dtos::auth::MagicLinkRequest,
            dtos::auth::PasswordResetRequest,
            dtos::auth::PasswordResetConfirm,
            dtos::auth::ResendVerificationRequest,
            dtos::auth::UnlockAccountRequest,
            dtos::auth::RevokeSessionsRequest,
            dtos::invitation::CreateInvitationRequest,
            dtos::invitation::InvitationResponse,
            dtos::invitation::TeamSummary,
            dtos::invitation::InvitationGrantResponse,
            dtos::sso::SsoVerifyRequest,
            dtos::sso::CreateSsoConnectionRequest,
            dtos::sso::SsoConnectionResponse,
            models::SanitizedUser,
            models::SessionInfo,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Password, magic-link, OAuth, and SSO sign-in"),
        (name = "Sessions", description = "Session listing and revocation"),
        (name = "Invitations", description = "Team invitations"),
        (name = "SSO", description = "Tenant resolution and connection management"),
        (name = "Users", description = "User profile"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: IdentityConfig,
    pub store: Arc<dyn IdentityStore>,
    pub email: Arc<dyn EmailProvider>,
    pub auth: AuthService,
    pub sessions: SessionService,
    pub invitations: InvitationService,
    pub sso: SsoService,
    pub lockout: LockoutService,
    pub tokens: TokenService,
}

impl AppState {
    /// Wire the service graph over a store and email provider.
    pub fn new(
        config: IdentityConfig,
        store: Arc<dyn IdentityStore>,
        email: Arc<dyn EmailProvider>,
        jwt: JwtService,
    ) -> Self {
        let tokens = TokenService::new(store.clone());
        let lockout = LockoutService::new(store.clone(), config.security.lockout_policy());
        let sessions = SessionService::new(store.clone(), jwt, config.session.strategy);
        let sso = SsoService::new(store.clone());
        let invitations =
            InvitationService::new(store.clone(), config.tokens.invitation_expiry_days);
        let auth = AuthService::new(
            store.clone(),
            email.clone(),
            lockout.clone(),
            tokens.clone(),
            sessions.clone(),
            sso.clone(),
            config.tokens.clone(),
            config.oauth.clone(),
            config.base_url.clone(),
        );

        Self {
            config,
            store,
            email,
            auth,
            sessions,
            invitations,
            sso,
            lockout,
            tokens,
        }
    }
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    let public_routes = Router::new()
        .route("/auth/register", post(handlers::auth::registration::register))
        .route(
            "/auth/verify-email",
            get(handlers::auth::registration::verify_email),
        )
        .route(
            "/auth/verify-email/resend",
            post(handlers::auth::registration::resend_verification),
        )
        .route("/auth/login", post(handlers::auth::session::login))
        .route(
            "/auth/magic-link",
            post(handlers::auth::magic_link::request_magic_link),
        )
        .route(
            "/auth/magic-link/verify",
            get(handlers::auth::magic_link::verify_magic_link),
        )
        .route(
            "/auth/password-reset/request",
            post(handlers::auth::password::request_password_reset),
        )
        .route(
            "/auth/password-reset/confirm",
            post(handlers::auth::password::confirm_password_reset),
        )
        .route(
            "/auth/unlock-account",
            post(handlers::auth::unlock::request_unlock),
        )
        .route(
            "/auth/unlock-account/verify",
            get(handlers::auth::unlock::confirm_unlock),
        )
        .route(
            "/auth/oauth/:provider",
            get(handlers::auth::social::oauth_login),
        )
        .route("/auth/sso/verify", post(handlers::sso::sso_verify))
        .route(
            "/invitations/:token",
            get(handlers::invitation::validate_invitation),
        );

    let protected_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::session::logout))
        .route("/users/me", get(handlers::user::get_me))
        .route("/sessions", get(handlers::auth::session::list_sessions))
        .route(
            "/sessions/revoke-all",
            post(handlers::auth::session::revoke_all_sessions),
        )
        .route(
            "/sessions/:session_id",
            delete(handlers::auth::session::revoke_session),
        )
        .route(
            "/invitations/:token/accept",
            post(handlers::invitation::accept_invitation),
        )
        .route(
            "/teams/:slug/invitations",
            post(handlers::invitation::create_invitation)
                .get(handlers::invitation::list_invitations),
        )
        .route(
            "/teams/:slug/invitations/:invitation_id",
            delete(handlers::invitation::revoke_invitation),
        )
        .route("/teams/:slug/sso", post(handlers::sso::create_sso_connection))
        .route(
            "/teams/:slug/sso/:connection_id",
            delete(handlers::sso::delete_sso_connection),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_auth_middleware,
        ));

    let mut app = Router::new().route("/health", get(health_check));

    let swagger_enabled = match state.config.environment {
        crate::config::Environment::Dev => true,
        crate::config::Environment::Prod => match state.config.swagger.enabled {
            crate::config::SwaggerMode::Public | crate::config::SwaggerMode::Authenticated => true,
            crate::config::SwaggerMode::Disabled => false,
        },
    };

    if swagger_enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        );
    }

    let app = app
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<axum::http::HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                axum::http::HeaderValue::from_static("*")
                            })
                        })
                        .collect::<Vec<axum::http::HeaderValue>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ]),
        );

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        e
    })?;

    Ok(axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
    })))
}
