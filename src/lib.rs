//! Server-authoritative engine for a matching-pairs card game.
//!
//! The deck is shuffled and kept server-side, every flip is validated against
//! the stored session, completions pass anti-cheat heuristics and finished
//! games land on a ranked, paginated leaderboard.
//!
//! Transport is not handled here: [`handler`] exposes the command surface as
//! serde types plus a newline-delimited JSON helper.

pub mod clock;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod game;
pub mod handler;
pub mod services;

pub use config::GameConfig;
pub use error::{ErrorKind, GameError};
pub use services::GameEngine;
