use crate::api;
use crate::config::{self, Config};
use crate::db::{self, Connection, ConnectionPool};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use diesel::r2d2::PoolError;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub connection_pool: ConnectionPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(connection_pool: ConnectionPool, config: Config) -> Self {
        Self {
            connection_pool,
            config: Arc::new(config),
        }
    }

    pub fn get_connection(&self) -> Result<Connection, PoolError> {
        self.connection_pool.get()
    }
}

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Could not read configuration. Details:\n{0}")]
    Config(#[from] ::config::ConfigError),
    #[error("Could not determine database url. Details:\n{0}")]
    DatabaseUrl(#[from] std::env::VarError),
    #[error("Could not connect to the database. Details:\n{0}")]
    Connection(#[from] PoolError),
    #[error("Could not run migrations. Details:\n{0}")]
    Migration(Box<dyn std::error::Error + Send + Sync>),
    #[error("Could not create upload directory. Details:\n{0}")]
    UploadDirectory(#[from] std::io::Error),
}

pub fn enable_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info,tower_http=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Loads configuration, connects to the database and applies pending migrations.
pub fn initialize() -> Result<AppState, InitializationError> {
    let config = config::load()?;
    let database_url = db::create_url(None)?;
    let connection_pool = db::create_connection_pool(&database_url)?;

    let mut conn = connection_pool.get()?;
    db::run_migrations(&mut conn).map_err(InitializationError::Migration)?;
    drop(conn);

    std::fs::create_dir_all(config.order_photo_dir())?;
    Ok(AppState::new(connection_pool, config))
}

/// Builds the complete application: the versioned API, documentation, uploaded
/// files and, optionally, the compiled frontend.
pub fn router(state: AppState) -> Router {
    let config = &state.config;
    let mut router = api::routes(state.clone())
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(DefaultBodyLimit::max(config.max_upload_size + MULTIPART_OVERHEAD));

    if let Some(frontend_dist) = &config.frontend_dist {
        let index = ServeFile::new(frontend_dist.join("index.html"));
        router = router.fallback_service(ServeDir::new(frontend_dist).fallback(index));
    }

    router
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(state: AppState) {
    let port = state.config.port;
    let app = router(state);

    let address = format!("0.0.0.0:{port}");
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Could not bind to {address}. Details:\n{err}");
            return;
        }
    };
    info!("Listening on {address}");

    if let Err(err) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server stopped unexpectedly. Details:\n{err}");
    }
}

/// Room for multipart boundaries and form fields around an uploaded file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler. Details:\n{err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to install signal handler. Details:\n{err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Stopping server...");
}
