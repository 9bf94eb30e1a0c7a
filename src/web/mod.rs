//! HTTP surface
//!
//! A thin axum layer over the services. Handlers extract, call one service
//! method and wrap the result; the error taxonomy is turned into status
//! codes in [`responses::handle_error`].

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    credentials::{CredentialStore, DatabaseCredentialStore},
    database::Database,
    repositories::{
        ServerRepository, SqliteUsageStore, StreamBindingRepository, UsageStore, UserRepository,
    },
    services::{AuthService, ClientService, ServerService, TokenService, UserService},
    sync::{ReconciliationEngine, SyncRunner},
    upstream::client::ClientSettings,
};

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod responses;

pub use extractors::{AdminUser, AuthUser, PaginationParams};
pub use responses::{handle_error, ApiResponse, PaginatedResponse};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub auth: AuthService,
    pub servers: ServerService,
    pub users: UserService,
    pub client: ClientService,
    pub sync: SyncRunner,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    /// Wire repositories, services and the sync runner over one database
    pub fn new(database: Database, config: &Config) -> Result<Self> {
        let pool = database.pool();
        let server_repo = ServerRepository::new(pool.clone());
        let user_repo = UserRepository::new(pool.clone());
        let binding_repo = StreamBindingRepository::new(pool.clone());

        let settings = ClientSettings::from_config(&config.upstream)?;
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(DatabaseCredentialStore::new(server_repo.clone(), settings)?);
        let usage: Arc<dyn UsageStore> = Arc::new(SqliteUsageStore::new(pool));

        let engine =
            ReconciliationEngine::from_config(credentials.clone(), usage.clone(), &config.sync)?;
        let tokens = TokenService::from_config(&config.auth)?;

        Ok(Self {
            auth: AuthService::new(user_repo.clone(), tokens),
            servers: ServerService::new(server_repo.clone(), credentials.clone()),
            users: UserService::new(user_repo, server_repo, binding_repo.clone()),
            client: ClientService::new(binding_repo, credentials, usage),
            sync: SyncRunner::new(engine),
            database,
            start_time: Utc::now(),
        })
    }
}

pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &Config, state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        Ok(Self {
            app: Self::create_router(state),
            addr,
        })
    }

    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health::health_check))
            .route("/api/auth/token", post(handlers::auth::issue_token))
            .nest("/api/admin", Self::admin_routes())
            .nest("/api/client", Self::client_routes())
            .layer(axum::middleware::from_fn(
                middleware::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    fn admin_routes() -> Router<AppState> {
        Router::new()
            .route(
                "/servers",
                get(handlers::servers::list_servers).post(handlers::servers::create_server),
            )
            .route(
                "/servers/:id/streams",
                get(handlers::servers::list_server_streams),
            )
            .route(
                "/users",
                get(handlers::users::list_users).post(handlers::users::create_user),
            )
            .route(
                "/users/:id/streams",
                get(handlers::users::list_user_streams)
                    .post(handlers::users::assign_stream)
                    .delete(handlers::users::unassign_stream),
            )
            .route("/sync", post(handlers::sync::trigger_sync))
            .route("/sync/last", get(handlers::sync::last_report))
    }

    fn client_routes() -> Router<AppState> {
        Router::new()
            .route("/streams", get(handlers::client::my_streams))
            .route("/streams/:name/traffic", get(handlers::client::stream_traffic))
            .route(
                "/streams/:name/pushes",
                get(handlers::client::list_pushes)
                    .post(handlers::client::add_push)
                    .delete(handlers::client::remove_push),
            )
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until SIGINT/SIGTERM
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        tracing::info!("Listening on http://{}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down gracefully"),
                    _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down gracefully"),
                }
            }
            _ => {
                tracing::warn!("Could not install signal handlers, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received Ctrl+C, shutting down gracefully");
    }
}
