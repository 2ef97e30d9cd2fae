//! What a client is allowed to learn about individual cards.

use crate::constants::HIDDEN_CARD;
use serde::Serialize;
use std::fmt;

/// A card that was just turned face up, together with its symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealedCard {
    pub position: usize,
    pub symbol: String,
}

impl fmt::Display for RevealedCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}={}", self.position, self.symbol)
    }
}

/// The face-down board handed out with a new session.
pub fn placeholder_board(card_count: usize) -> Vec<String> {
    vec![HIDDEN_CARD.to_string(); card_count]
}
