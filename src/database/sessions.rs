//! Durable session storage.
//!
//! Every mutation goes through [`SessionStore::update`], which hands the
//! mutator the latest committed state and writes its result back atomically.
//! A mutator that returns `Err` leaves the stored session untouched.

use super::init::DbPool;
use super::models::{SessionRow, count_to_db, positions_to_db};
use crate::error::GameError;
use crate::game::{Session, SessionId};
use async_trait::async_trait;
use sqlx::types::chrono::{DateTime, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a fresh session around `deck` and returns it with its new id.
    async fn create(&self, deck: Vec<String>, now: DateTime<Utc>) -> Result<Session, GameError>;

    async fn get(&self, id: SessionId) -> Result<Option<Session>, GameError>;

    /// Read-modify-write serialized per id. `InvalidSession` if the id is unknown.
    async fn update<F, T>(&self, id: SessionId, mutator: F) -> Result<T, GameError>
    where
        F: FnOnce(&mut Session) -> Result<T, GameError> + Send,
        T: Send;

    /// Returns whether a session was removed.
    async fn delete(&self, id: SessionId) -> Result<bool, GameError>;

    /// Removes retired sessions and those idle since before `cutoff`.
    async fn sweep_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, GameError>;
}

const SESSION_COLUMNS: &str = "session_id, created_at, deck, revealed, matched, move_count, completed_at, last_move_at, retired_at";

/// Postgres-backed store; row locks serialize concurrent updates of one session.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    #[instrument(level = "debug", skip(self, deck), fields(cards = deck.len()))]
    async fn create(&self, deck: Vec<String>, now: DateTime<Utc>) -> Result<Session, GameError> {
        let session = Session::new(Uuid::new_v4(), deck, now);
        sqlx::query(
            "INSERT INTO game_sessions (session_id, created_at, deck) VALUES ($1, $2, $3)",
        )
        .bind(session.id)
        .bind(session.created_at)
        .bind(&session.deck)
        .execute(&self.pool)
        .await?;
        Ok(session)
    }

    #[instrument(level = "debug", skip(self))]
    async fn get(&self, id: SessionId) -> Result<Option<Session>, GameError> {
        let query = format!("SELECT {SESSION_COLUMNS} FROM game_sessions WHERE session_id = $1");
        let row = sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Session::try_from).transpose()
    }

    #[instrument(level = "debug", skip(self, mutator))]
    async fn update<F, T>(&self, id: SessionId, mutator: F) -> Result<T, GameError>
    where
        F: FnOnce(&mut Session) -> Result<T, GameError> + Send,
        T: Send,
    {
        let mut tx = self.pool.begin().await?;
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM game_sessions WHERE session_id = $1 FOR UPDATE"
        );
        let Some(row) = sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Err(GameError::InvalidSession);
        };
        let mut session = Session::try_from(row)?;
        // Dropping `tx` on the error path rolls back and releases the row lock.
        let out = mutator(&mut session)?;
        sqlx::query(
            "UPDATE game_sessions SET revealed = $2, matched = $3, move_count = $4, completed_at = $5, last_move_at = $6, retired_at = $7 WHERE session_id = $1",
        )
        .bind(id)
        .bind(positions_to_db(&session.revealed))
        .bind(positions_to_db(&session.matched))
        .bind(count_to_db(session.move_count))
        .bind(session.completed_at)
        .bind(session.last_move_at)
        .bind(session.retired_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(out)
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete(&self, id: SessionId) -> Result<bool, GameError> {
        let res = sqlx::query("DELETE FROM game_sessions WHERE session_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    #[instrument(level = "debug", skip(self))]
    async fn sweep_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, GameError> {
        let res = sqlx::query(
            "DELETE FROM game_sessions WHERE retired_at IS NOT NULL OR COALESCE(completed_at, last_move_at, created_at) < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        debug!(target = "db.sessions", removed = res.rows_affected(), "sweep");
        Ok(res.rows_affected())
    }
}
