//! Pure game rules: the deck, the per-session state machine and the
//! anti-cheat heuristics. Nothing in here touches storage or the clock.

pub mod anticheat;
pub mod card;
pub mod deck;
pub mod session;

pub use anticheat::AntiCheat;
pub use card::RevealedCard;
pub use deck::{Deck, DeckError};
pub use session::{CompletionRecord, Finalized, MoveOutcome, Session, SessionId, SessionState};
