use std::{future::Future, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::config::{AppConfig, DbWaitConfig};

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

pub async fn run_migrations(db: &PgPool) -> anyhow::Result<()> {
    info!("running database migrations");
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    info!("migrations completed");
    Ok(())
}

/// Blocks until the database at `database_url` accepts a trivial query.
pub async fn wait_for_db(database_url: &str, wait: &DbWaitConfig) -> anyhow::Result<()> {
    info!("waiting for database");
    wait_until_ready(wait.interval(), wait.max_attempts, move || async move {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(2))
            .connect(database_url)
            .await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        pool.close().await;
        Ok::<_, sqlx::Error>(())
    })
    .await?;
    info!("database available");
    Ok(())
}

/// Calls `check` until it succeeds, sleeping `interval` between failures.
///
/// Returns the number of attempts made. `max_attempts == 0` means retry forever.
pub async fn wait_until_ready<F, Fut, E>(
    interval: Duration,
    max_attempts: u32,
    mut check: F,
) -> anyhow::Result<u32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match check().await {
            Ok(()) => return Ok(attempt),
            Err(e) if max_attempts != 0 && attempt >= max_attempts => {
                anyhow::bail!("database unavailable after {attempt} attempts: {e}");
            }
            Err(e) => {
                warn!(attempt, error = %e, "database unavailable, retrying in {:?}", interval);
                tokio::time::sleep(interval).await;
            }
        }
    }
}
