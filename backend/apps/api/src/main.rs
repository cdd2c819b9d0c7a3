//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use board::application::{OidcService, UserService};
use board::domain::repository::{UserRepository, UserSessionRepository};
use board::infra::sqlite::MigrationController;
use board::{BoardConfig, MemoryStore, OidcConfig, SqliteStore, board_router};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,board=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Board configuration
    let mut config = if cfg!(debug_assertions) {
        BoardConfig::development()
    } else {
        BoardConfig::default()
    };
    config.trust_proxy = env_flag("TRUST_PROXY");
    let config = Arc::new(config);

    // Identity provider
    let oidc_config = OidcConfig {
        name: env::var("OIDC_NAME").unwrap_or_else(|_| "google".to_string()),
        issuer_url: env::var("OIDC_ISSUER_URL").unwrap_or_default(),
        client_id: env::var("OIDC_CLIENT_ID").unwrap_or_default(),
        client_secret: env::var("OIDC_CLIENT_SECRET").unwrap_or_default(),
        base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
    };
    let oidc = OidcService::discover(&oidc_config)
        .await
        .context("OIDC provider initialization failed")?;

    // Storage backend
    let app = match env::var("BOARD_REPO").as_deref().unwrap_or("sqlite") {
        "inmemory" => {
            tracing::warn!("Using in-memory storage, all data is lost on shutdown");
            let store = MemoryStore::new();
            build_app(store.users, store.sessions, oidc, config).await
        }
        "sqlite" => {
            let database_url =
                env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://board.db".to_string());

            let options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?;

            tracing::info!("Connected to database");

            // Run migrations; the store must not serve traffic unmigrated
            let controller = MigrationController::new();
            let store = SqliteStore::new(pool, &controller)
                .await
                .context("Migrations failed")?;

            tracing::info!("Migrations completed");

            build_app(store.users, store.sessions, oidc, config).await
        }
        other => anyhow::bail!("unknown BOARD_REPO {other:?}, expected inmemory or sqlite"),
    };

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()
        .context("BIND_ADDR must be a socket address")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Startup cleanup, then the router over the chosen repositories
async fn build_app<U, S, P>(
    users: U,
    sessions: S,
    oidc: OidcService<P>,
    config: Arc<BoardConfig>,
) -> Router
where
    U: UserRepository + Send + Sync + 'static,
    S: UserSessionRepository + Send + Sync + 'static,
    P: board::application::IdentityProvider + Send + Sync + 'static,
{
    // Errors here should not prevent server startup
    match sessions.delete_expired(chrono::Utc::now()).await {
        Ok(deleted) => {
            tracing::info!(sessions_deleted = deleted, "User session cleanup completed");
        }
        Err(e) => {
            tracing::warn!(error = %e, "User session cleanup failed, continuing anyway");
        }
    }

    let users = UserService::new(Arc::new(users), Arc::new(sessions), config.clone());

    board_router(users, oidc, config).layer(TraceLayer::new_for_http())
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
