//! Row shapes for the tables in `init::SCHEMA` and their conversion to domain types.

use crate::error::GameError;
use crate::game::Session;
use sqlx::types::Uuid;
use sqlx::types::chrono::{DateTime, Utc};

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct SessionRow {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub deck: Vec<String>,
    pub revealed: Vec<i32>,
    pub matched: Vec<i32>,
    pub move_count: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_move_at: Option<DateTime<Utc>>,
    pub retired_at: Option<DateTime<Utc>>,
}

impl TryFrom<SessionRow> for Session {
    type Error = GameError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let card_count = row.deck.len();
        let positions = |column: &str, raw: Vec<i32>| -> Result<Vec<usize>, GameError> {
            raw.into_iter()
                .map(|p| {
                    usize::try_from(p)
                        .ok()
                        .filter(|&p| p < card_count)
                        .ok_or_else(|| {
                            GameError::corrupt_row(format!("{column} holds position {p}"))
                        })
                })
                .collect()
        };
        let revealed = positions("revealed", row.revealed)?;
        let matched = positions("matched", row.matched)?;
        let move_count = u32::try_from(row.move_count)
            .map_err(|_| GameError::corrupt_row("negative move_count"))?;
        Ok(Session {
            id: row.session_id,
            created_at: row.created_at,
            deck: row.deck,
            revealed,
            matched,
            move_count,
            completed_at: row.completed_at,
            last_move_at: row.last_move_at,
            retired_at: row.retired_at,
        })
    }
}

/// Positions as stored in `INT4[]` columns. Decks are tiny, so the cast is lossless.
pub fn positions_to_db(positions: &[usize]) -> Vec<i32> {
    positions.iter().map(|&p| p as i32).collect()
}

pub fn count_to_db(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> SessionRow {
        SessionRow {
            session_id: Uuid::new_v4(),
            created_at: Utc::now(),
            deck: vec!["A".into(), "B".into(), "A".into(), "B".into()],
            revealed: vec![1],
            matched: vec![0, 2],
            move_count: 3,
            completed_at: None,
            last_move_at: Some(Utc::now()),
            retired_at: None,
        }
    }

    #[test]
    fn row_converts_to_session() {
        let session = Session::try_from(row()).unwrap();
        assert_eq!(session.revealed, vec![1]);
        assert_eq!(session.matched, vec![0, 2]);
        assert_eq!(session.move_count, 3);
        assert_eq!(session.matched_count(), 1);
    }

    #[test]
    fn out_of_range_positions_are_rejected() {
        let mut bad = row();
        bad.matched = vec![0, 9];
        assert!(matches!(
            Session::try_from(bad),
            Err(GameError::StorageUnavailable(_))
        ));
        let mut negative = row();
        negative.move_count = -1;
        assert!(Session::try_from(negative).is_err());
    }
}
