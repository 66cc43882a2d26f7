use common::error::AppError;
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
};
use std::{str::FromStr, sync::Arc};

pub mod currency;
pub mod plan;
pub mod subscription;
pub mod user;

pub mod models {
    pub mod currency;
    pub mod plan;
    pub mod subscription;
    pub mod user;
}

pub mod dtos {
    pub mod currency;
    pub mod plan;
    pub mod subscription;
}

pub async fn setup(
    database_url: &str,
    require_ssl: bool,
    max_connections: u32,
) -> Result<Arc<PgPool>, Box<dyn std::error::Error>> {
    let url = url::Url::parse(database_url)?;
    let db_name = url.path().trim_start_matches('/');
    let username = url.username();
    let password = url.password().unwrap_or("");
    let host = url.host_str().unwrap_or("localhost");
    let port = url.port().unwrap_or(5432);

    let admin_url = format!(
        "postgresql://{}:{}@{}:{}/postgres",
        username, password, host, port
    );

    let mut admin_options = PgConnectOptions::from_str(&admin_url)?;
    if require_ssl {
        admin_options = admin_options.ssl_mode(PgSslMode::Require);
    }

    let admin_pool = PgPool::connect_with(admin_options).await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&admin_pool)
            .await?;

    if !exists {
        log::info!("Creating database {}", db_name);
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name))
            .execute(&admin_pool)
            .await?;
    }

    admin_pool.close().await;

    let mut options = PgConnectOptions::from_str(database_url)?;
    if require_ssl {
        options = options.ssl_mode(PgSslMode::Require);
    }
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(Arc::new(pool))
}

/// Translates a failed write into the application taxonomy.
///
/// Constraint violations surface as domain errors. A unique violation
/// carries `conflict` as message; a foreign-key violation names the broken
/// reference.
pub(crate) fn map_write_error(err: sqlx::Error, conflict: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::InvalidState(conflict.to_string());
        }
        if db_err.is_foreign_key_violation() {
            return AppError::InvalidState(format!(
                "referenced record is missing or still in use ({})",
                db_err.constraint().unwrap_or("foreign key")
            ));
        }
        if db_err.is_check_violation() {
            return AppError::ValidationFailed(db_err.message().to_string());
        }
    }
    AppError::from(err)
}

/// Like [`map_write_error`] for tables whose only relevant constraint is a
/// foreign key; its violation is reported with `reference` as message.
pub(crate) fn map_reference_error(err: sqlx::Error, reference: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_foreign_key_violation() {
            return AppError::InvalidState(reference.to_string());
        }
    }
    map_write_error(err, reference)
}

/// Turns sqlx's `RowNotFound` into `AppError::NotFound`.
pub(crate) fn map_read_error(err: sqlx::Error, what: &str) -> AppError {
    match err {
        sqlx::Error::RowNotFound => AppError::NotFound(what.to_string()),
        other => AppError::from(other),
    }
}
