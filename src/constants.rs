// Central constants for timing heuristics, limits and defaults.
pub const MIN_MOVE_INTERVAL_MS: u64 = 500; // minimum gap between two accepted flips
pub const MIN_COMPLETION_MS: u64 = 5_000; // fastest plausible human clear of the board
pub const SESSION_IDLE_TTL_SECS: u64 = 30 * 60;
pub const SWEEP_INTERVAL_SECS: u64 = 60;
pub const LEADERBOARD_PAGE_SIZE: u32 = 10;
pub const LEADERBOARD_CACHE_TTL_SECS: u64 = 2;
pub const MAX_NAME_LEN: usize = 20;
pub const DB_MAX_CONNECTIONS: u32 = 5;

/// Shown in place of a country code when none (or garbage) was supplied.
pub const DEFAULT_COUNTRY: &str = "🏳️";
/// What the client gets for every face-down card.
pub const HIDDEN_CARD: &str = "?";

/// The stock 4x4 board.
pub const DEFAULT_SYMBOLS: [&str; 8] = ["🍎", "🍌", "🍒", "🍇", "🍉", "🍋", "🍑", "🍍"];
