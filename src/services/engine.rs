//! The session engine: wires the deck template, a session store, a leaderboard
//! store and the clock together behind the operations the command surface calls.

use super::cache::TtlCache;
use super::leaderboard::LeaderboardPage;
use crate::clock::Clock;
use crate::config::{ConfigError, GameConfig};
use crate::database::{LeaderboardStore, SessionStore};
use crate::error::GameError;
use crate::game::card::placeholder_board;
use crate::game::{AntiCheat, CompletionRecord, Deck, Finalized, MoveOutcome, SessionId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Reply to a new-game request. The board is all placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSession {
    pub session_id: SessionId,
    pub card_count: usize,
    pub placeholder: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionReceipt {
    pub success: bool,
    pub move_count: u32,
    pub elapsed_ms: i64,
}

impl From<CompletionRecord> for CompletionReceipt {
    fn from(record: CompletionRecord) -> Self {
        Self {
            success: true,
            move_count: record.move_count,
            elapsed_ms: record.elapsed_ms,
        }
    }
}

/// Shared by every request handler; all state lives in the stores.
pub struct GameEngine<S, L> {
    pub(crate) sessions: S,
    pub(crate) leaderboard: L,
    pub(crate) config: GameConfig,
    pub(crate) template: Deck,
    pub(crate) anti_cheat: AntiCheat,
    pub(crate) clock: Arc<dyn Clock>,
    /// Latest-view leaderboard pages keyed by page number.
    pub(crate) page_cache: TtlCache<u32, LeaderboardPage>,
}

impl<S, L> GameEngine<S, L>
where
    S: SessionStore,
    L: LeaderboardStore,
{
    pub fn new(
        sessions: S,
        leaderboard: L,
        config: GameConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            template: config.deck()?,
            anti_cheat: config.anti_cheat(),
            page_cache: TtlCache::new(config.leaderboard_cache_ttl()),
            sessions,
            leaderboard,
            config,
            clock,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    pub fn leaderboard(&self) -> &L {
        &self.leaderboard
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// (hits, misses) of the latest-view leaderboard page cache.
    pub fn leaderboard_cache_stats(&self) -> (u64, u64) {
        self.page_cache.stats()
    }

    /// Deals a fresh shuffled deck and persists it. The symbols never leave the server.
    #[instrument(level = "debug", skip(self))]
    pub async fn new_session(&self) -> Result<NewSession, GameError> {
        let cards = self.template.shuffled(&mut rand::rng());
        let session = self.sessions.create(cards, self.now()).await?;
        info!(target = "game.session", session_id = %session.id, cards = session.deck.len(), "created");
        Ok(NewSession {
            session_id: session.id,
            card_count: session.deck.len(),
            placeholder: placeholder_board(session.deck.len()),
        })
    }

    /// Flips the card at `position`; see `Session::flip` for the rules.
    #[instrument(level = "debug", skip(self))]
    pub async fn submit_move(
        &self,
        session_id: SessionId,
        position: usize,
    ) -> Result<MoveOutcome, GameError> {
        let now = self.now();
        let min_interval = self.config.min_move_interval();
        let result = self
            .sessions
            .update(session_id, |session| session.flip(position, now, min_interval))
            .await;
        match &result {
            Ok(outcome) if outcome.completed => {
                info!(target = "game.session", %session_id, moves = outcome.move_count, "board cleared");
            }
            Ok(_) => {}
            Err(GameError::RateLimited { retry_after_ms }) => {
                debug!(target = "game.session", %session_id, retry_after_ms, "flip throttled");
            }
            Err(e) => {
                debug!(target = "game.session", %session_id, error = %e, "flip rejected");
            }
        }
        result
    }

    /// Client-declared completion. Idempotent once the session is completed.
    #[instrument(level = "debug", skip(self))]
    pub async fn complete_game(
        &self,
        session_id: SessionId,
        claimed_end: DateTime<Utc>,
        claimed_moves: u32,
    ) -> Result<CompletionReceipt, GameError> {
        let now = self.now();
        let anti_cheat = self.anti_cheat;
        let Finalized {
            record,
            client_declared,
        } = self
            .sessions
            .update(session_id, |session| {
                session.finalize(claimed_end, claimed_moves, now, &anti_cheat)
            })
            .await
            .inspect_err(|e| {
                if matches!(e, GameError::ImplausibleTiming { .. }) {
                    warn!(target = "game.anticheat", %session_id, error = %e, "completion rejected");
                }
            })?;
        if client_declared {
            warn!(
                target = "game.anticheat",
                %session_id,
                claimed_moves,
                elapsed_ms = record.elapsed_ms,
                "no move tracking for this session; accepted client-reported completion"
            );
        } else if claimed_moves != record.move_count {
            debug!(
                target = "game.anticheat",
                %session_id,
                claimed_moves,
                tracked_moves = record.move_count,
                "client move count disagrees with server; server wins"
            );
        }
        Ok(record.into())
    }

    /// Removes abandoned and retired sessions. Returns how many were dropped.
    #[instrument(level = "debug", skip(self))]
    pub async fn sweep_expired(&self) -> Result<u64, GameError> {
        let cutoff = self
            .now()
            .checked_sub_signed(self.config.session_idle_ttl())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let removed = self.sessions.sweep_expired(cutoff).await?;
        if removed > 0 {
            info!(target = "game.sweep", removed, "expired sessions removed");
        }
        Ok(removed)
    }
}
