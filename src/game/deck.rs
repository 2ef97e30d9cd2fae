//! The pairs deck: every symbol of a fixed set appears exactly twice.

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("a deck needs at least one symbol")]
    Empty,
    #[error("symbol {0:?} is listed more than once")]
    Duplicate(String),
    #[error("symbols must not be blank")]
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    // Kept private so every deck in circulation went through `pairs`.
    cards: Vec<String>,
}

impl Deck {
    /// Builds the unshuffled deck `[a, a, b, b, ...]` from distinct symbols.
    pub fn pairs<S: AsRef<str>>(symbols: &[S]) -> Result<Self, DeckError> {
        if symbols.is_empty() {
            return Err(DeckError::Empty);
        }
        let mut cards: Vec<String> = Vec::with_capacity(symbols.len() * 2);
        for symbol in symbols {
            let symbol = symbol.as_ref().trim();
            if symbol.is_empty() {
                return Err(DeckError::Blank);
            }
            if cards.iter().any(|c| c.as_str() == symbol) {
                return Err(DeckError::Duplicate(symbol.to_string()));
            }
            cards.push(symbol.to_string());
            cards.push(symbol.to_string());
        }
        Ok(Deck { cards })
    }

    /// Uniform in-place Fisher-Yates shuffle.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Returns a shuffled copy, leaving the template untouched.
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<String> {
        let mut cards = self.cards.clone();
        cards.shuffle(rng);
        cards
    }

    pub fn pair_count(&self) -> usize {
        self.cards.len() / 2
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[String] {
        &self.cards
    }

    pub fn into_cards(self) -> Vec<String> {
        self.cards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn symbols(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("s{i}")).collect()
    }

    #[test]
    fn every_symbol_appears_exactly_twice() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in [1, 8, 26] {
            let mut deck = Deck::pairs(symbols(n).as_slice()).unwrap();
            deck.shuffle(&mut rng);
            assert_eq!(deck.len(), 2 * n);
            assert_eq!(deck.pair_count(), n);
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for card in deck.cards() {
                *counts.entry(card.as_str()).or_default() += 1;
            }
            assert_eq!(counts.len(), n);
            assert!(counts.values().all(|&c| c == 2), "n={n}: {counts:?}");
        }
    }

    #[test]
    fn shuffled_keeps_the_template() {
        let deck = Deck::pairs(&["A", "B", "C"]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let mut cards = deck.shuffled(&mut rng);
        assert_eq!(deck.cards(), &["A", "A", "B", "B", "C", "C"]);
        cards.sort();
        assert_eq!(cards, deck.cards());
    }

    #[test]
    fn rejects_bad_symbol_sets() {
        let none: [&str; 0] = [];
        assert_eq!(Deck::pairs(&none), Err(DeckError::Empty));
        assert_eq!(
            Deck::pairs(&["A", "B", "A"]),
            Err(DeckError::Duplicate("A".into()))
        );
        assert_eq!(Deck::pairs(&["A", "  "]), Err(DeckError::Blank));
    }
}
