use identity_service::{
    build_router,
    config::IdentityConfig,
    db,
    services::{EmailService, JwtService},
    store::PgStore,
    AppState,
};
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = IdentityConfig::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting identity service"
    );

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    let store = Arc::new(PgStore::new(pool));
    tracing::info!("Database initialized successfully");

    // Initialize email service
    let email = Arc::new(EmailService::new(&config.smtp)?);

    // Initialize JWT service
    let jwt = JwtService::new(&config.jwt)?;
    tracing::info!("JWT service initialized");

    let state = AppState::new(config.clone(), store, email, jwt);

    // Reclaim expired rows in the background. Correctness never depends
    // on this; expiry is enforced at read time.
    let janitor = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            for (what, result) in [
                ("security tokens", janitor.tokens.purge_expired().await),
                ("invitations", janitor.invitations.purge_expired().await),
                ("sessions", janitor.sessions.purge_expired().await),
            ] {
                match result {
                    Ok(purged) if purged > 0 => {
                        tracing::debug!(purged, "Purged expired {}", what)
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "Failed to purge expired {}", what),
                }
            }
        }
    });

    let app = build_router(state).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
