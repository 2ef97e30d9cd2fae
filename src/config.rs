//! Tunable engine settings, read from the environment on top of the defaults in
//! `constants`.

use crate::constants::{
    DB_MAX_CONNECTIONS, DEFAULT_SYMBOLS, LEADERBOARD_CACHE_TTL_SECS, LEADERBOARD_PAGE_SIZE,
    MAX_NAME_LEN, MIN_COMPLETION_MS, MIN_MOVE_INTERVAL_MS, SESSION_IDLE_TTL_SECS,
    SWEEP_INTERVAL_SECS,
};
use crate::game::{AntiCheat, Deck, DeckError};
use chrono::TimeDelta;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer (got {value:?})")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} must be > 0")]
    Zero { key: &'static str },
    #[error("invalid symbol set: {0}")]
    Symbols(#[from] DeckError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Distinct symbols; the deck holds each one twice.
    pub symbols: Vec<String>,
    pub min_move_interval_ms: u64,
    pub min_completion_ms: u64,
    pub session_idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub page_size: u32,
    pub max_name_len: usize,
    pub leaderboard_cache_ttl_secs: u64,
    pub db_max_connections: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            min_move_interval_ms: MIN_MOVE_INTERVAL_MS,
            min_completion_ms: MIN_COMPLETION_MS,
            session_idle_ttl_secs: SESSION_IDLE_TTL_SECS,
            sweep_interval_secs: SWEEP_INTERVAL_SECS,
            page_size: LEADERBOARD_PAGE_SIZE,
            max_name_len: MAX_NAME_LEN,
            leaderboard_cache_ttl_secs: LEADERBOARD_CACHE_TTL_SECS,
            db_max_connections: DB_MAX_CONNECTIONS,
        }
    }
}

impl GameConfig {
    /// Reads `PAIRS_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key/value source; unset keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup("PAIRS_SYMBOLS") {
            config.symbols = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        read(&lookup, "PAIRS_MIN_MOVE_INTERVAL_MS", &mut config.min_move_interval_ms)?;
        read(&lookup, "PAIRS_MIN_COMPLETION_MS", &mut config.min_completion_ms)?;
        read(&lookup, "PAIRS_SESSION_IDLE_TTL_SECS", &mut config.session_idle_ttl_secs)?;
        read(&lookup, "PAIRS_SWEEP_INTERVAL_SECS", &mut config.sweep_interval_secs)?;
        read(&lookup, "PAIRS_PAGE_SIZE", &mut config.page_size)?;
        read(&lookup, "PAIRS_MAX_NAME_LEN", &mut config.max_name_len)?;
        read(
            &lookup,
            "PAIRS_LEADERBOARD_CACHE_TTL_SECS",
            &mut config.leaderboard_cache_ttl_secs,
        )?;
        read(&lookup, "PAIRS_DB_MAX_CONNECTIONS", &mut config.db_max_connections)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Deck::pairs(self.symbols.as_slice())?;
        if self.page_size == 0 {
            return Err(ConfigError::Zero { key: "PAIRS_PAGE_SIZE" });
        }
        if self.max_name_len == 0 {
            return Err(ConfigError::Zero { key: "PAIRS_MAX_NAME_LEN" });
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Zero { key: "PAIRS_SWEEP_INTERVAL_SECS" });
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::Zero { key: "PAIRS_DB_MAX_CONNECTIONS" });
        }
        Ok(())
    }

    /// The unshuffled template every new session's deck is drawn from.
    pub fn deck(&self) -> Result<Deck, ConfigError> {
        Ok(Deck::pairs(self.symbols.as_slice())?)
    }

    pub fn anti_cheat(&self) -> AntiCheat {
        AntiCheat::new(self.min_completion_ms)
    }

    pub fn min_move_interval(&self) -> TimeDelta {
        i64::try_from(self.min_move_interval_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn session_idle_ttl(&self) -> TimeDelta {
        i64::try_from(self.session_idle_ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn leaderboard_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.leaderboard_cache_ttl_secs)
    }
}

fn read<F, T>(lookup: &F, key: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *slot = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            key,
            value: raw.clone(),
        })?;
    }
    Ok(())
}
