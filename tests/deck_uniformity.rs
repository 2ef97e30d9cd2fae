//! Statistical sanity check that the deck shuffle has no positional bias.
use pairs_engine::game::Deck;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn no_position_favours_a_symbol() {
    const TRIALS: usize = 30_000;
    let symbols = ["A", "B", "C"];
    let deck = Deck::pairs(&symbols).unwrap();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    // counts[position][symbol]
    let mut counts = [[0usize; 3]; 6];
    for _ in 0..TRIALS {
        let cards = deck.shuffled(&mut rng);
        for (pos, card) in cards.iter().enumerate() {
            let idx = symbols.iter().position(|s| *s == card.as_str()).unwrap();
            counts[pos][idx] += 1;
        }
    }

    // Each symbol fills any given position with probability 2/6.
    let expected = TRIALS as f64 / 3.0;
    for (pos, row) in counts.iter().enumerate() {
        let chi2: f64 = row
            .iter()
            .map(|&observed| {
                let d = observed as f64 - expected;
                d * d / expected
            })
            .sum();
        // df = 2; 25.0 sits far beyond the 0.9999 quantile (~18.4).
        assert!(chi2 < 25.0, "position {pos} looks biased: chi2={chi2:.2} counts={row:?}");
    }
}

#[test]
fn all_arrangements_show_up() {
    // 4 cards from two symbols have 4!/(2!2!) = 6 distinct layouts.
    let deck = Deck::pairs(&["X", "Y"]).unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let mut seen = std::collections::HashSet::new();
    for _ in 0..2_000 {
        seen.insert(deck.shuffled(&mut rng));
    }
    assert_eq!(seen.len(), 6);
}
