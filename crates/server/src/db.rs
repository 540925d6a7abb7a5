use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use adpilot_core::config::PostgresConfig;

/// Create a PostgreSQL connection pool and run migrations.
///
/// Fails with `Missing database configuration` when neither `DATABASE_URL`
/// nor `PG_USERNAME` is set.
pub async fn init_pg_pool(config: &PostgresConfig) -> anyhow::Result<PgPool> {
    let url = config.database_url()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!("PostgreSQL connected: {}", config.host);

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations applied successfully");

    Ok(pool)
}
