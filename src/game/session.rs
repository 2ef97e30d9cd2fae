//! One game instance and the rules for moving it forward.
//!
//! A `Session` is only ever mutated through [`Session::flip`],
//! [`Session::finalize`] and [`Session::retire`], always on a copy handed out by
//! a `SessionStore::update`, so a rejected call never leaves a trace.

use super::anticheat::{AntiCheat, elapsed_ms};
use super::card::RevealedCard;
use crate::error::GameError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use uuid::Uuid;

pub type SessionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    InProgress,
    Completed,
    Retired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub deck: Vec<String>,
    /// Face-up cards of the pending (or just failed) pair. Never more than two.
    pub revealed: Vec<usize>,
    /// Positions that have been permanently matched.
    pub matched: Vec<usize>,
    pub move_count: u32,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_move_at: Option<DateTime<Utc>>,
    pub retired_at: Option<DateTime<Utc>>,
}

/// Result of one accepted flip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub move_count: u32,
    pub matched_count: u32,
    pub completed: bool,
    /// `None` after the first card of a pair, `Some(is_match)` after the second.
    pub matched: Option<bool>,
    /// Only the card(s) flipped in this move.
    pub revealed: Vec<RevealedCard>,
}

/// What a finished game is worth on the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionRecord {
    pub move_count: u32,
    pub elapsed_ms: i64,
}

/// Outcome of [`Session::finalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finalized {
    pub record: CompletionRecord,
    /// True when no moves were tracked and the client's figures were recorded.
    pub client_declared: bool,
}

impl Session {
    pub fn new(id: SessionId, deck: Vec<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at,
            deck,
            revealed: Vec::with_capacity(2),
            matched: Vec::new(),
            move_count: 0,
            completed_at: None,
            last_move_at: None,
            retired_at: None,
        }
    }

    pub fn pair_count(&self) -> usize {
        self.deck.len() / 2
    }

    pub fn matched_count(&self) -> u32 {
        (self.matched.len() / 2) as u32
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_retired(&self) -> bool {
        self.retired_at.is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.is_retired() {
            SessionState::Retired
        } else if self.is_completed() {
            SessionState::Completed
        } else if self.last_move_at.is_none() {
            SessionState::Created
        } else {
            SessionState::InProgress
        }
    }

    /// Most recent activity, used for idle expiry.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.completed_at
            .or(self.last_move_at)
            .unwrap_or(self.created_at)
    }

    /// Recorded result of a completed game, computed from server timestamps.
    pub fn completion(&self) -> Option<CompletionRecord> {
        self.completed_at.map(|done| CompletionRecord {
            move_count: self.move_count,
            elapsed_ms: elapsed_ms(self.created_at, done).max(0),
        })
    }

    /// Turns one card face up.
    pub fn flip(
        &mut self,
        position: usize,
        now: DateTime<Utc>,
        min_interval: TimeDelta,
    ) -> Result<MoveOutcome, GameError> {
        if self.is_completed() || self.is_retired() {
            return Err(GameError::InvalidSession);
        }
        if let Some(last) = self.last_move_at {
            let since = now - last;
            if since < min_interval {
                return Err(GameError::RateLimited {
                    retry_after_ms: ceil_ms(min_interval - since),
                });
            }
        }
        if position >= self.deck.len() {
            return Err(GameError::InvalidMove {
                reason: "position is out of range",
            });
        }
        // A failed pair stays face up until the next accepted flip.
        if self.revealed.len() == 2 && !self.revealed.contains(&position) {
            self.revealed.clear();
        }
        if self.revealed.contains(&position) {
            return Err(GameError::InvalidMove {
                reason: "card is already face up",
            });
        }
        if self.matched.contains(&position) {
            return Err(GameError::InvalidMove {
                reason: "card is already matched",
            });
        }

        self.revealed.push(position);
        self.last_move_at = Some(now);

        let [first, second] = self.revealed[..] else {
            return Ok(MoveOutcome {
                move_count: self.move_count,
                matched_count: self.matched_count(),
                completed: false,
                matched: None,
                revealed: vec![self.reveal(position)],
            });
        };

        self.move_count += 1;
        let is_match = self.deck[first] == self.deck[second];
        let revealed = vec![self.reveal(first), self.reveal(second)];
        if is_match {
            self.matched.extend([first, second]);
            self.revealed.clear();
            if self.matched.len() == self.deck.len() {
                self.completed_at = Some(now);
            }
        }

        Ok(MoveOutcome {
            move_count: self.move_count,
            matched_count: self.matched_count(),
            completed: self.is_completed(),
            matched: Some(is_match),
            revealed,
        })
    }

    /// Settles a completion declared by the client.
    ///
    /// Already completed sessions report their recorded result unchanged. A
    /// session with tracked moves must have been cleared move by move; only a
    /// session that never reported a move falls back to the client's figures.
    pub fn finalize(
        &mut self,
        claimed_end: DateTime<Utc>,
        claimed_moves: u32,
        now: DateTime<Utc>,
        anti_cheat: &AntiCheat,
    ) -> Result<Finalized, GameError> {
        if self.is_retired() {
            return Err(GameError::InvalidSession);
        }
        anti_cheat.check_elapsed(elapsed_ms(self.created_at, claimed_end))?;

        if let Some(record) = self.completion() {
            return Ok(Finalized {
                record,
                client_declared: false,
            });
        }
        if self.move_count > 0 || !self.revealed.is_empty() {
            return Err(GameError::NotCompleted);
        }

        anti_cheat.check_claimed_moves(claimed_moves, self.pair_count())?;
        let end = claimed_end.min(now);
        anti_cheat.check_elapsed(elapsed_ms(self.created_at, end))?;

        self.revealed.clear();
        self.matched = (0..self.deck.len()).collect();
        self.move_count = claimed_moves;
        self.completed_at = Some(end);
        self.last_move_at = Some(end);
        let record = self.completion().ok_or(GameError::NotCompleted)?;
        Ok(Finalized {
            record,
            client_declared: true,
        })
    }

    /// Flags the session as spent once its score is on the board.
    pub fn retire(&mut self, now: DateTime<Utc>) -> Result<CompletionRecord, GameError> {
        if self.is_retired() {
            return Err(GameError::InvalidSession);
        }
        let record = self.completion().ok_or(GameError::NotCompleted)?;
        self.retired_at = Some(now);
        Ok(record)
    }

    fn reveal(&self, position: usize) -> RevealedCard {
        RevealedCard {
            position,
            symbol: self.deck[position].clone(),
        }
    }
}

/// Whole milliseconds, rounded up so that waiting the hint is always enough.
fn ceil_ms(delta: TimeDelta) -> u64 {
    let whole = delta.num_milliseconds();
    let ms = if delta > TimeDelta::milliseconds(whole) {
        whole + 1
    } else {
        whole
    };
    ms.max(1) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn deck(cards: &[&str]) -> Vec<String> {
        cards.iter().map(|c| c.to_string()).collect()
    }

    fn session() -> (Session, DateTime<Utc>) {
        let t0 = Utc::now();
        let s = Session::new(
            Uuid::new_v4(),
            deck(&["A", "A", "B", "C", "B", "D", "C", "D"]),
            t0,
        );
        (s, t0)
    }

    fn gap() -> TimeDelta {
        TimeDelta::milliseconds(500)
    }

    fn at(t0: DateTime<Utc>, ms: i64) -> DateTime<Utc> {
        t0 + TimeDelta::milliseconds(ms)
    }


    #[test]
    fn first_flip_reveals_one_card_without_comparing() {
        let (mut s, t0) = session();
        assert_eq!(s.state(), SessionState::Created);
        let out = s.flip(3, at(t0, 10), gap()).unwrap();
        assert_eq!(out.matched, None);
        assert_eq!(out.move_count, 0);
        assert_eq!(out.revealed, vec![RevealedCard { position: 3, symbol: "C".into() }]);
        assert_eq!(s.state(), SessionState::InProgress);
        assert_eq!(s.revealed, vec![3]);
    }

    #[test]
    fn matching_pair_counts_and_clears() {
        let (mut s, t0) = session();
        s.flip(0, at(t0, 0), gap()).unwrap();
        let out = s.flip(1, at(t0, 600), gap()).unwrap();
        assert_eq!(out.matched, Some(true));
        assert_eq!((out.move_count, out.matched_count, out.completed), (1, 1, false));
        assert_eq!(out.revealed.len(), 2);
        assert!(s.revealed.is_empty());
        assert_eq!(s.matched, vec![0, 1]);
    }

    #[test]
    fn failed_pair_is_hidden_on_the_next_flip() {
        let (mut s, t0) = session();
        s.flip(2, at(t0, 0), gap()).unwrap();
        let out = s.flip(3, at(t0, 600), gap()).unwrap();
        assert_eq!(out.matched, Some(false));
        assert_eq!(s.revealed, vec![2, 3]);
        // Re-flipping a face-up card of the failed pair is not allowed.
        assert!(matches!(
            s.flip(3, at(t0, 1200), gap()),
            Err(GameError::InvalidMove { .. })
        ));
        let out = s.flip(4, at(t0, 1200), gap()).unwrap();
        assert_eq!(out.revealed.len(), 1);
        assert_eq!(s.revealed, vec![4]);
    }

    #[test]
    fn rejects_out_of_range_and_matched_positions() {
        let (mut s, t0) = session();
        assert!(matches!(
            s.flip(8, at(t0, 0), gap()),
            Err(GameError::InvalidMove { reason: "position is out of range" })
        ));
        s.flip(0, at(t0, 0), gap()).unwrap();
        s.flip(1, at(t0, 600), gap()).unwrap();
        assert!(matches!(
            s.flip(0, at(t0, 1200), gap()),
            Err(GameError::InvalidMove { reason: "card is already matched" })
        ));
    }

    #[test]
    fn rate_limit_reports_remaining_wait() {
        let (mut s, t0) = session();
        s.flip(0, at(t0, 0), gap()).unwrap();
        match s.flip(2, at(t0, 120), gap()) {
            Err(GameError::RateLimited { retry_after_ms }) => assert_eq!(retry_after_ms, 380),
            other => panic!("expected rate limit, got {other:?}"),
        }
        assert_eq!(s.revealed, vec![0]);
        assert!(s.flip(2, at(t0, 500), gap()).is_ok());
    }

    #[test]
    fn fractional_wait_rounds_up() {
        assert_eq!(ceil_ms(TimeDelta::microseconds(1_500)), 2);
        assert_eq!(ceil_ms(TimeDelta::milliseconds(3)), 3);
        assert_eq!(ceil_ms(TimeDelta::microseconds(10)), 1);
    }

    #[test]
    fn clearing_the_board_completes_once() {
        let (mut s, t0) = session();
        let order = [0, 1, 2, 4, 3, 6, 5, 7];
        let mut last = None;
        for (i, pos) in order.into_iter().enumerate() {
            last = Some(s.flip(pos, at(t0, 600 * (i as i64 + 1)), gap()).unwrap());
        }
        let last = last.unwrap();
        assert!(last.completed);
        assert_eq!((last.move_count, last.matched_count), (4, 4));
        assert_eq!(s.completed_at, Some(at(t0, 4_800)));
        assert_eq!(s.state(), SessionState::Completed);
        assert!(matches!(
            s.flip(0, at(t0, 10_000), gap()),
            Err(GameError::InvalidSession)
        ));
        assert_eq!(s.completed_at, Some(at(t0, 4_800)));
    }

    #[test]
    fn random_play_keeps_invariants() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let (mut s, t0) = session();
            let mut prev_matched = 0;
            let mut prev_moves = 0;
            let mut clock = 0;
            while !s.is_completed() {
                clock += 500;
                let pos = rng.random_range(0..s.deck.len());
                let _ = s.flip(pos, at(t0, clock), gap());
                assert!(s.revealed.len() <= 2);
                assert!(s.revealed.iter().all(|p| !s.matched.contains(p)));
                assert!(s.matched_count() >= prev_matched);
                assert!(s.move_count >= prev_moves);
                assert_eq!(
                    s.matched_count() as usize == s.pair_count(),
                    s.is_completed()
                );
                prev_matched = s.matched_count();
                prev_moves = s.move_count;
            }
        }
    }

    #[test]
    fn finalize_is_idempotent_on_completed_sessions() {
        let (mut s, t0) = session();
        for (i, pos) in [0, 1, 2, 4, 3, 6, 5, 7].into_iter().enumerate() {
            s.flip(pos, at(t0, 1_000 * (i as i64 + 1)), gap()).unwrap();
        }
        let ac = AntiCheat::new(5_000);
        let first = s.finalize(at(t0, 9_000), 99, at(t0, 9_000), &ac).unwrap();
        let second = s.finalize(at(t0, 12_000), 1, at(t0, 12_000), &ac).unwrap();
        assert_eq!(first.record, CompletionRecord { move_count: 4, elapsed_ms: 8_000 });
        assert!(!first.client_declared);
        assert_eq!(first, second);
    }

    #[test]
    fn finalize_trusts_client_only_without_tracked_moves() {
        let (mut s, t0) = session();
        let ac = AntiCheat::new(5_000);
        assert!(matches!(
            s.finalize(at(t0, 4_999), 6, at(t0, 4_999), &ac),
            Err(GameError::ImplausibleTiming { .. })
        ));
        assert!(matches!(
            s.finalize(at(t0, 6_000), 2, at(t0, 6_000), &ac),
            Err(GameError::InvalidMove { .. })
        ));
        // A claimed end in the future is clamped to the server clock.
        let done = s.finalize(at(t0, 60_000), 6, at(t0, 7_000), &ac).unwrap();
        assert_eq!(done.record, CompletionRecord { move_count: 6, elapsed_ms: 7_000 });
        assert!(done.client_declared);
        assert_eq!(s.matched_count(), 4);
        assert!(s.revealed.is_empty());

        // Asking again returns the recorded result, no longer as a client claim.
        let again = s.finalize(at(t0, 60_000), 9, at(t0, 8_000), &ac).unwrap();
        assert_eq!(again.record, done.record);
        assert!(!again.client_declared);
    }

    #[test]
    fn finalize_refuses_unfinished_tracked_sessions() {
        let (mut s, t0) = session();
        s.flip(0, at(t0, 0), gap()).unwrap();
        let ac = AntiCheat::new(5_000);
        assert!(matches!(
            s.finalize(at(t0, 8_000), 4, at(t0, 8_000), &ac),
            Err(GameError::NotCompleted)
        ));
    }

    #[test]
    fn retire_requires_completion_and_happens_once() {
        let (mut s, t0) = session();
        assert!(matches!(s.retire(t0), Err(GameError::NotCompleted)));
        let ac = AntiCheat::new(0);
        s.finalize(at(t0, 6_000), 4, at(t0, 6_000), &ac).unwrap();
        assert!(s.retire(at(t0, 7_000)).is_ok());
        assert_eq!(s.state(), SessionState::Retired);
        assert!(matches!(s.retire(at(t0, 8_000)), Err(GameError::InvalidSession)));
        assert!(matches!(
            s.finalize(at(t0, 6_000), 4, at(t0, 9_000), &ac),
            Err(GameError::InvalidSession)
        ));
    }
}
