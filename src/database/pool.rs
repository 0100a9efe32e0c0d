use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::{Error, Result};

const MAX_CONNECTIONS: u32 = 10;

/// Opens the pool and brings the schema up to date.
pub async fn connect_postgres(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| Error::Internal(format!("migration failed: {}", e)))?;
    tracing::info!("postgres schema migrated");

    Ok(pool)
}
