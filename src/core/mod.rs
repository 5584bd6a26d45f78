//! Core types: cards, seats, identifiers, errors, RNG.

pub mod card;
pub mod error;
pub mod ids;
pub mod rng;
pub mod seat;

pub use card::{full_deck, Card, Rank, Suit, DECK_SIZE};
pub use error::{EngineError, ErrorKind};
pub use ids::{ActionId, BuildId, MatchId, StackId};
pub use rng::GameRng;
pub use seat::{Seat, SeatMap};
