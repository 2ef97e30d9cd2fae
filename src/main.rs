use std::sync::Arc;

use anyhow::Context;
use pairs_engine::clock::SystemClock;
use pairs_engine::config::GameConfig;
use pairs_engine::database::{self, PgLeaderboardStore, PgSessionStore};
use pairs_engine::handler;
use pairs_engine::services::GameEngine;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

type PgEngine = GameEngine<PgSessionStore, PgLeaderboardStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the variables may come from the real environment.
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = GameConfig::from_env().context("invalid PAIRS_* configuration")?;
    let database_url =
        std::env::var("DATABASE_URL").context("Expected DATABASE_URL in the environment.")?;

    let pool = database::init::connect(&database_url, config.db_max_connections)
        .await
        .context("failed to connect to the database")?;
    database::init::ensure_schema(&pool)
        .await
        .context("failed to prepare the schema")?;

    let engine: Arc<PgEngine> = Arc::new(GameEngine::new(
        PgSessionStore::new(pool.clone()),
        PgLeaderboardStore::new(pool),
        config.clone(),
        Arc::new(SystemClock),
    )?);

    let sweeper = tokio::spawn(run_sweeper(engine.clone(), config.sweep_interval()));
    info!(target = "main", symbols = config.symbols.len(), "engine ready; reading commands from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let mut reply = handler::handle_line(engine.as_ref(), &line).await;
        reply.push('\n');
        stdout.write_all(reply.as_bytes()).await?;
        stdout.flush().await?;
    }

    sweeper.abort();
    info!(target = "main", "stdin closed; shutting down");
    Ok(())
}

/// Periodically drops idle and retired sessions. Failures are logged and retried next tick.
async fn run_sweeper(engine: Arc<PgEngine>, every: std::time::Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        if let Err(e) = engine.sweep_expired().await {
            error!(target = "game.sweep", error = ?e, "sweep failed");
        }
    }
}
