//! This module acts as a central hub for all storage logic.
//! Each store is a trait with a Postgres implementation and an in-memory one,
//! e.g. `database::sessions::PgSessionStore` and `database::memory::MemorySessionStore`.

pub mod init;
pub mod leaderboard;
pub mod memory;
pub mod models;
pub mod sessions;

pub use init::DbPool;
pub use leaderboard::{LeaderboardEntry, LeaderboardStore, PgLeaderboardStore};
pub use memory::{MemoryLeaderboardStore, MemorySessionStore};
pub use sessions::{PgSessionStore, SessionStore};
