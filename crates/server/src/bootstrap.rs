//! Startup sequence: configuration, database, status registry, mail worker,
//! and the assembled router. Every failure here is fatal by design; the
//! process either comes up serving a complete registry or not at all.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use tripdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use tripdesk_core::domain::status::StatusRegistry;
use tripdesk_core::errors::DomainError;
use tripdesk_core::notify::NotificationDispatcher;
use tripdesk_db::repositories::{
    RepositoryError, SessionRepository, SqlSessionRepository, SqlStatusRepository,
    SqlTravelRequestRepository, SqlUserRepository, StatusRepository, TravelRequestRepository,
    UserRepository,
};
use tripdesk_db::{connect, migrations, DbPool};
use tripdesk_mailer::{transport_from_config, MailerError, QueuedNotifier, RetryPolicy};

use crate::auth::AuthSettings;
use crate::{auth, error, health, travel_requests, users};

/// Shared handler state. Repositories are trait objects so handler tests
/// can swap in the in-memory doubles without a database.
#[derive(Clone)]
pub struct AppState {
    pub requests: Arc<dyn TravelRequestRepository>,
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub registry: Arc<StatusRegistry>,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub auth: AuthSettings,
}

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("status registry failed to load: {0}")]
    Registry(#[from] RepositoryError),
    #[error("status registry is incomplete: {0}")]
    IncompleteRegistry(#[source] DomainError),
    #[error(transparent)]
    Mailer(#[from] MailerError),
    #[error("failed to bind {address}: {source}")]
    Bind { address: String, source: std::io::Error },
    #[error("server terminated unexpectedly: {0}")]
    Serve(#[source] std::io::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");
    error::expose_error_detail(config.debug);

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    // Serving with a partial lifecycle table would turn approve/cancel into
    // 500s at request time; refuse to start instead.
    let registry = SqlStatusRepository::new(db_pool.clone()).load_registry().await?;
    registry.verify_complete().map_err(BootstrapError::IncompleteRegistry)?;
    info!(event_name = "system.bootstrap.registry_loaded", "status registry verified");

    let transport = transport_from_config(&config.mail)?;
    let notifier = QueuedNotifier::spawn(transport, RetryPolicy::from_config(&config.mail))?;
    info!(event_name = "system.bootstrap.notifier_ready", "notification worker started");

    let state = AppState {
        requests: Arc::new(SqlTravelRequestRepository::new(db_pool.clone())),
        users: Arc::new(SqlUserRepository::new(db_pool.clone())),
        sessions: Arc::new(SqlSessionRepository::new(db_pool.clone())),
        registry: Arc::new(registry),
        notifier: Arc::new(notifier),
        auth: AuthSettings::from_config(&config.auth),
    };

    Ok(Application { config, db_pool, state })
}

/// Assemble the public surface: API routes sealed with the shared state,
/// the self-contained health router, a JSON 404 fallback, and request
/// tracing over the lot.
pub fn api_router(state: AppState, db_pool: DbPool) -> Router {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(travel_requests::routes())
        .with_state(state)
        .merge(health::router(db_pool))
        .fallback(error::unknown_route)
        .layer(TraceLayer::new_for_http())
}

impl Application {
    pub fn router(&self) -> Router {
        api_router(self.state.clone(), self.db_pool.clone())
    }

    /// Serve until ctrl-c, then drain open connections for at most the
    /// configured grace window.
    pub async fn serve(self) -> Result<(), BootstrapError> {
        let address = format!("{}:{}", self.config.server.bind_address, self.config.server.port);
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|source| BootstrapError::Bind { address: address.clone(), source })?;
        info!(
            event_name = "system.server.listening",
            bind_address = %address,
            "accepting connections"
        );

        let grace = Duration::from_secs(self.config.server.graceful_shutdown_secs);
        let router = self.router();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let mut server = tokio::spawn(
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .into_future(),
        );
        let abort = server.abort_handle();

        tokio::select! {
            result = &mut server => {
                return match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(error)) => Err(BootstrapError::Serve(error)),
                    Err(join_error) => Err(BootstrapError::Serve(std::io::Error::other(join_error))),
                };
            }
            _ = tokio::signal::ctrl_c() => {
                info!(
                    event_name = "system.server.shutdown",
                    "shutdown signal received; draining connections"
                );
                let _ = shutdown_tx.send(());
            }
        }

        match tokio::time::timeout(grace, server).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(error))) => Err(BootstrapError::Serve(error)),
            Ok(Err(join_error)) => Err(BootstrapError::Serve(std::io::Error::other(join_error))),
            Err(_) => {
                warn!(
                    event_name = "system.server.shutdown_timeout",
                    "drain window elapsed; abandoning open connections"
                );
                abort.abort();
                Ok(())
            }
        }
    }
}
