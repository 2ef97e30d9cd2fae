//! Leaderboard ranker: turns completed sessions into entries and serves ranked pages.

use super::engine::GameEngine;
use crate::constants::DEFAULT_COUNTRY;
use crate::database::models::count_to_db;
use crate::database::{LeaderboardEntry, LeaderboardStore, SessionStore};
use crate::error::GameError;
use crate::game::SessionId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub rank: u64,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardPage {
    pub entries: Vec<RankedEntry>,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_entries: u64,
    /// Snapshot time; pass it back when fetching further pages.
    #[serde(rename = "as_of_ms", with = "chrono::serde::ts_milliseconds")]
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreReceipt {
    pub accepted: bool,
    pub entry: LeaderboardEntry,
}

/// Trims and bounds a display name.
pub fn validate_name(raw: &str, max_len: usize) -> Result<String, GameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(GameError::InvalidName {
            reason: "name must not be empty",
        });
    }
    if name.chars().count() > max_len {
        return Err(GameError::InvalidName {
            reason: "name is too long",
        });
    }
    if name.chars().any(char::is_control) {
        return Err(GameError::InvalidName {
            reason: "name contains control characters",
        });
    }
    Ok(name.to_string())
}

/// Two ASCII letters become an upper-case country code; anything else the placeholder.
pub fn normalize_country(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(code) if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
            code.to_ascii_uppercase()
        }
        _ => DEFAULT_COUNTRY.to_string(),
    }
}

/// `max(1, ceil(total / page_size))`.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    u32::try_from(total.div_ceil(size).max(1)).unwrap_or(u32::MAX)
}

/// Milliseconds are what clients see, so snapshots are cut at that precision.
fn truncate_to_ms(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

impl<S, L> GameEngine<S, L>
where
    S: SessionStore,
    L: LeaderboardStore,
{
    /// Records the score of a completed session and retires the session.
    ///
    /// Elapsed time comes from the server's own timestamps. The entry's primary
    /// key is the session id, so concurrent or repeated submissions land once.
    #[instrument(level = "debug", skip(self, name, country))]
    pub async fn submit_score(
        &self,
        session_id: SessionId,
        name: &str,
        country: Option<&str>,
    ) -> Result<ScoreReceipt, GameError> {
        let name = validate_name(name, self.config.max_name_len)?;
        let country = normalize_country(country);

        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(GameError::InvalidSession)?;
        if session.is_retired() {
            return Err(GameError::InvalidSession);
        }
        let record = session.completion().ok_or(GameError::NotCompleted)?;
        if let Err(e) = self.anti_cheat.check_elapsed(record.elapsed_ms) {
            warn!(target = "game.anticheat", %session_id, error = %e, "score rejected");
            return Err(e);
        }

        let now = truncate_to_ms(self.now());
        let entry = LeaderboardEntry {
            session_id,
            name,
            elapsed_ms: record.elapsed_ms,
            move_count: count_to_db(record.move_count),
            country,
            submitted_at: now,
        };
        if !self.leaderboard.insert(&entry).await? {
            return Err(GameError::InvalidSession);
        }
        self.page_cache.clear().await;

        // The entry is already unique per session, so a failed retire only
        // delays cleanup until the sweeper catches the session.
        match self.sessions.update(session_id, |s| s.retire(now)).await {
            Ok(_) | Err(GameError::InvalidSession) => {}
            Err(e) => {
                warn!(target = "game.leaderboard", %session_id, error = %e, "score stored but session not retired");
            }
        }
        info!(
            target = "game.leaderboard",
            %session_id,
            elapsed_ms = entry.elapsed_ms,
            moves = entry.move_count,
            "score accepted"
        );
        Ok(ScoreReceipt {
            accepted: true,
            entry,
        })
    }

    /// One ranked page. Without `as_of` the current time is used and the page
    /// may be served from the short-lived cache.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_leaderboard(
        &self,
        page: u32,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<LeaderboardPage, GameError> {
        let page = page.max(1);
        let latest = as_of.is_none();
        if latest && let Some(cached) = self.page_cache.get(&page).await {
            let (hits, misses) = self.page_cache.stats();
            debug!(target = "cache.leaderboard", page, hits, misses, "page served from cache");
            return Ok(cached);
        }

        let as_of = truncate_to_ms(as_of.unwrap_or_else(|| self.now()));
        let page_size = self.config.page_size;
        let offset = u64::from(page - 1) * u64::from(page_size);
        let total_entries = self.leaderboard.count(as_of).await?;
        let entries = self
            .leaderboard
            .page(offset, u64::from(page_size), as_of)
            .await?
            .into_iter()
            .enumerate()
            .map(|(i, entry)| RankedEntry {
                rank: offset + i as u64 + 1,
                entry,
            })
            .collect();
        let result = LeaderboardPage {
            entries,
            page,
            page_size,
            total_pages: total_pages(total_entries, page_size),
            total_entries,
            as_of,
        };
        // Snapshots are caller-chosen; only the latest view is shared.
        if latest {
            self.page_cache.insert(page, result.clone()).await;
        }
        Ok(result)
    }
}
