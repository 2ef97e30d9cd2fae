//! This module contains all storage code related to the leaderboard.
//!
//! Entries are write-once. Ranking order is `elapsed_ms` ascending, then the
//! earliest `submitted_at`, then session id so that the order is total.

use super::init::DbPool;
use crate::error::GameError;
use crate::game::SessionId;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::FromRow;
use sqlx::types::chrono::{DateTime, Utc};
use std::cmp::Ordering;
use tracing::instrument;

/// Represents a single entry in the leaderboard.
#[derive(FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// The retired session this score came from; also the uniqueness key.
    #[serde(skip_serializing)]
    pub session_id: SessionId,
    pub name: String,
    pub elapsed_ms: i64,
    pub move_count: i32,
    pub country: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub submitted_at: DateTime<Utc>,
}

impl LeaderboardEntry {
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.elapsed_ms
            .cmp(&other.elapsed_ms)
            .then(self.submitted_at.cmp(&other.submitted_at))
            .then(self.session_id.cmp(&other.session_id))
    }
}

#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Inserts the entry unless one already exists for its session.
    /// Returns `false` when the session had already been submitted.
    async fn insert(&self, entry: &LeaderboardEntry) -> Result<bool, GameError>;

    /// Number of entries submitted at or before `as_of`.
    async fn count(&self, as_of: DateTime<Utc>) -> Result<u64, GameError>;

    /// One slice of the ranking, restricted to entries submitted at or before `as_of`.
    async fn page(
        &self,
        offset: u64,
        limit: u64,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardEntry>, GameError>;
}

#[derive(Clone)]
pub struct PgLeaderboardStore {
    pool: DbPool,
}

impl PgLeaderboardStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaderboardStore for PgLeaderboardStore {
    #[instrument(level = "debug", skip(self, entry), fields(session_id = %entry.session_id))]
    async fn insert(&self, entry: &LeaderboardEntry) -> Result<bool, GameError> {
        let res = sqlx::query(
            r#"INSERT INTO leaderboard_entries (session_id, name, elapsed_ms, move_count, country, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (session_id) DO NOTHING"#,
        )
        .bind(entry.session_id)
        .bind(&entry.name)
        .bind(entry.elapsed_ms)
        .bind(entry.move_count)
        .bind(&entry.country)
        .bind(entry.submitted_at)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    #[instrument(level = "debug", skip(self))]
    async fn count(&self, as_of: DateTime<Utc>) -> Result<u64, GameError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM leaderboard_entries WHERE submitted_at <= $1")
                .bind(as_of)
                .fetch_one(&self.pool)
                .await?;
        Ok(total.max(0) as u64)
    }

    #[instrument(level = "debug", skip(self))]
    async fn page(
        &self,
        offset: u64,
        limit: u64,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardEntry>, GameError> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            r#"SELECT session_id, name, elapsed_ms, move_count, country, submitted_at
            FROM leaderboard_entries
            WHERE submitted_at <= $1
            ORDER BY elapsed_ms ASC, submitted_at ASC, session_id ASC
            LIMIT $2 OFFSET $3"#,
        )
        .bind(as_of)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
