use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};

pub fn validate_database_url(database_url: &str) -> Result<()> {
    if !database_url.starts_with("postgres://") && !database_url.starts_with("postgresql://") {
        return Err(anyhow::anyhow!(
            "DATABASE_URL must start with postgres:// or postgresql://"
        ));
    }
    Ok(())
}

/// Opens the shared pool and bootstraps the `site` / `server` tables.
///
/// The pool is created once at startup and handed to every store by value;
/// callers close it on shutdown.
pub async fn init_db(database_url: &str, max_connections: u32) -> Result<PgPool> {
    validate_database_url(database_url)?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to bootstrap site/server schema")?;

    Ok(pool)
}
