//! Connection pool type and idempotent schema bootstrap.

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::info;

/// A type alias for the database connection pool (`Pool<Postgres>`).
pub type DbPool = Pool<Postgres>;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS game_sessions (
        session_id   UUID PRIMARY KEY,
        created_at   TIMESTAMPTZ NOT NULL,
        deck         TEXT[] NOT NULL,
        revealed     INT4[] NOT NULL DEFAULT '{}',
        matched      INT4[] NOT NULL DEFAULT '{}',
        move_count   INT4 NOT NULL DEFAULT 0 CHECK (move_count >= 0),
        completed_at TIMESTAMPTZ,
        last_move_at TIMESTAMPTZ,
        retired_at   TIMESTAMPTZ
    )"#,
    r#"CREATE TABLE IF NOT EXISTS leaderboard_entries (
        session_id   UUID PRIMARY KEY,
        name         TEXT NOT NULL,
        elapsed_ms   BIGINT NOT NULL CHECK (elapsed_ms >= 0),
        move_count   INT4 NOT NULL CHECK (move_count >= 0),
        country      TEXT NOT NULL,
        submitted_at TIMESTAMPTZ NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS leaderboard_entries_rank_idx ON leaderboard_entries (elapsed_ms, submitted_at, session_id)",
    "CREATE INDEX IF NOT EXISTS game_sessions_activity_idx ON game_sessions ((COALESCE(completed_at, last_move_at, created_at)))",
];

/// Opens the shared pool.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Creates the tables if they do not exist yet. Safe to run on every start.
pub async fn ensure_schema(pool: &DbPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    info!(target = "db.init", statements = SCHEMA.len(), "schema ready");
    Ok(())
}
