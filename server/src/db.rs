use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PoolError, PooledConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::borrow::Cow;
use std::env::VarError;

pub type ConnectionPool = Pool<ConnectionManager<PgConnection>>;
pub type Connection = PooledConnection<ConnectionManager<PgConnection>>;

/// Builds a connection pool for the database at `database_url`.
/// The pool holds one connection per runtime worker thread.
pub fn create_connection_pool(database_url: &str) -> Result<ConnectionPool, PoolError> {
    let num_threads = tokio::runtime::Handle::try_current()
        .map(|handle| handle.metrics().num_workers())
        .unwrap_or(1);
    let manager = ConnectionManager::new(database_url);
    Pool::builder()
        .max_size(num_threads as u32)
        .max_lifetime(None)
        .idle_timeout(None)
        .test_on_check_out(true)
        .build(manager)
}

/// Runs embedded migrations on the database. Used to update the database for
/// deployments that don't build the server themselves.
pub fn run_migrations(conn: &mut PgConnection) -> diesel::migration::Result<()> {
    conn.run_pending_migrations(MIGRATIONS).map(|versions| {
        for version in versions {
            tracing::info!("Applied migration {version}");
        }
    })
}

/// Returns a url for the database. `DATABASE_URL` is used as-is when present,
/// otherwise the url is built from `POSTGRES_USER`, `POSTGRES_PASSWORD`, `POSTGRES_HOST`
/// and `POSTGRES_DB`. If `database_override` is not `None`, its value is used in place
/// of `POSTGRES_DB`.
pub fn create_url(database_override: Option<&str>) -> Result<String, VarError> {
    if std::env::var("DOCKER_DEPLOYMENT").is_err() {
        // A missing .env file is fine, variables may come from the environment.
        let _ = dotenvy::from_filename("../.env").or_else(|_| dotenvy::dotenv());
    }
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return Ok(url);
    }

    let user = std::env::var("POSTGRES_USER")?;
    let password = std::env::var("POSTGRES_PASSWORD")?;
    let database = match database_override {
        Some(database) => Cow::Borrowed(database),
        None => Cow::Owned(std::env::var("POSTGRES_DB")?),
    };
    let hostname = match std::env::var("POSTGRES_HOST") {
        Ok(hostname) => hostname,
        Err(_) if std::env::var("DOCKER_DEPLOYMENT").is_ok() => String::from("host.docker.internal"),
        Err(_) => String::from("localhost"),
    };

    Ok(format!("postgres://{user}:{password}@{hostname}/{database}"))
}

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
