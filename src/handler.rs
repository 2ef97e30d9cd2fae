//! Command surface consumed by the transport layer.
//!
//! Commands and replies are plain serde types; `handle_line` speaks
//! newline-delimited JSON so any transport can forward requests verbatim.

use crate::database::{LeaderboardStore, SessionStore};
use crate::error::{ErrorKind, GameError};
use crate::game::{MoveOutcome, SessionId};
use crate::services::{CompletionReceipt, GameEngine, LeaderboardPage, NewSession, ScoreReceipt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    NewSession,
    SubmitMove {
        session_id: SessionId,
        position: usize,
    },
    CompleteGame {
        session_id: SessionId,
        #[serde(rename = "claimed_end_ms", with = "chrono::serde::ts_milliseconds")]
        claimed_end: DateTime<Utc>,
        claimed_moves: u32,
    },
    SubmitScore {
        session_id: SessionId,
        name: String,
        #[serde(default)]
        country: Option<String>,
    },
    ListLeaderboard {
        #[serde(default = "first_page")]
        page: u32,
        #[serde(default, rename = "as_of_ms", with = "chrono::serde::ts_milliseconds_option")]
        as_of: Option<DateTime<Utc>>,
    },
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    NewSession(NewSession),
    Move(MoveOutcome),
    Completion(CompletionReceipt),
    Score(ScoreReceipt),
    Leaderboard(LeaderboardPage),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl ErrorBody {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::BadRequest,
            status: ErrorKind::BadRequest.status(),
            message: message.into(),
            retry_after_ms: None,
        }
    }
}

impl From<&GameError> for ErrorBody {
    fn from(err: &GameError) -> Self {
        let kind = err.kind();
        Self {
            kind,
            status: kind.status(),
            message: err.to_string(),
            retry_after_ms: match err {
                GameError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
                _ => None,
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: &'a ErrorBody,
}

/// Routes one command to the engine.
pub async fn dispatch<S, L>(engine: &GameEngine<S, L>, command: Command) -> Result<Reply, GameError>
where
    S: SessionStore,
    L: LeaderboardStore,
{
    match command {
        Command::NewSession => engine.new_session().await.map(Reply::NewSession),
        Command::SubmitMove {
            session_id,
            position,
        } => engine
            .submit_move(session_id, position)
            .await
            .map(Reply::Move),
        Command::CompleteGame {
            session_id,
            claimed_end,
            claimed_moves,
        } => engine
            .complete_game(session_id, claimed_end, claimed_moves)
            .await
            .map(Reply::Completion),
        Command::SubmitScore {
            session_id,
            name,
            country,
        } => engine
            .submit_score(session_id, &name, country.as_deref())
            .await
            .map(Reply::Score),
        Command::ListLeaderboard { page, as_of } => engine
            .list_leaderboard(page, as_of)
            .await
            .map(Reply::Leaderboard),
    }
}

/// Runs a command and converts failures into the wire error shape. Storage
/// failures are logged here with their cause and reported without it.
pub async fn execute<S, L>(engine: &GameEngine<S, L>, command: Command) -> Result<Reply, ErrorBody>
where
    S: SessionStore,
    L: LeaderboardStore,
{
    dispatch(engine, command).await.map_err(|e| {
        if let GameError::StorageUnavailable(source) = &e {
            error!(target = "handler", error = %source, "storage failure");
        }
        ErrorBody::from(&e)
    })
}

/// Handles one JSON line and returns the JSON reply line.
pub async fn handle_line<S, L>(engine: &GameEngine<S, L>, line: &str) -> String
where
    S: SessionStore,
    L: LeaderboardStore,
{
    let result = match serde_json::from_str::<Command>(line) {
        Ok(command) => execute(engine, command).await,
        Err(e) => {
            warn!(target = "handler", error = %e, "malformed command");
            Err(ErrorBody::bad_request(format!("malformed command: {e}")))
        }
    };
    let encoded = match &result {
        Ok(reply) => serde_json::to_string(reply),
        Err(body) => serde_json::to_string(&ErrorEnvelope { error: body }),
    };
    encoded.unwrap_or_else(|e| {
        error!(target = "handler", error = %e, "reply encoding failed");
        r#"{"error":{"kind":"storage_unavailable","status":500,"message":"reply encoding failed"}}"#
            .to_string()
    })
}
