//! Service layer: the engine and the operations exposed to the command surface.
pub mod cache;
pub mod engine;
pub mod leaderboard;

pub use engine::{CompletionReceipt, GameEngine, NewSession};
pub use leaderboard::{LeaderboardPage, RankedEntry, ScoreReceipt};
