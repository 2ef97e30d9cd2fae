//! Plausibility heuristics applied when a game is declared finished.
//!
//! None of this proves a human played; it only makes trivially scripted
//! completions expensive.

use crate::error::GameError;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntiCheat {
    pub min_completion_ms: u64,
}

impl AntiCheat {
    pub fn new(min_completion_ms: u64) -> Self {
        Self { min_completion_ms }
    }

    /// Rejects a board cleared faster than a person could.
    pub fn check_elapsed(&self, elapsed_ms: i64) -> Result<(), GameError> {
        let minimum = i64::try_from(self.min_completion_ms).unwrap_or(i64::MAX);
        if elapsed_ms < minimum {
            return Err(GameError::ImplausibleTiming {
                elapsed_ms,
                minimum_ms: self.min_completion_ms,
            });
        }
        Ok(())
    }

    /// Every pair costs at least one move.
    pub fn check_claimed_moves(&self, claimed_moves: u32, pair_count: usize) -> Result<(), GameError> {
        if (claimed_moves as usize) < pair_count {
            return Err(GameError::InvalidMove {
                reason: "claimed move count is below the number of pairs",
            });
        }
        Ok(())
    }
}

/// Milliseconds between two server timestamps; negative if `end` precedes `start`.
pub fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_milliseconds()
}
