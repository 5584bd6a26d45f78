//! A server-side rules engine for two-player build-and-capture card matches.
//!
//! The engine is authoritative: clients describe intent as card-onto-target
//! proposals, a priority-ordered rule table turns each proposal into fully
//! specified candidate actions, and every commit is validated against a
//! full-deck card ledger with wholesale rollback on failure. Multi-card
//! constructs go through an explicit propose → accept/cancel protocol so a
//! half-assembled stack or a tentative build extension never leaks into
//! committed state.
//!
//! # Layers
//!
//! - [`core`]: cards, seats, ids, errors, seeded RNG.
//! - [`ledger`]: the card-location ledger and its full-deck invariant.
//! - [`build`] / [`staging`]: table constructs and their pending states.
//! - [`rules`]: the priority-ordered rule matcher.
//! - [`game`]: match state and the transactional commit pipeline.
//! - [`host`]: multi-match hosting and change broadcasting.
//!
//! # Example
//!
//! ```
//! use cassino_engine::host::MatchHost;
//!
//! let host = MatchHost::new();
//! let id = host.create_match(42);
//! let snapshot = host.snapshot(id).unwrap();
//! assert_eq!(snapshot.round, 1);
//! assert_eq!(snapshot.hands[snapshot.current].len(), 10);
//! ```

pub mod build;
pub mod core;
pub mod game;
pub mod host;
pub mod ledger;
pub mod rules;
pub mod staging;

pub use crate::core::{Card, EngineError, Rank, Seat, Suit};
pub use crate::game::{Game, GameState, MatchOutcome, MoveOutcome, StateSnapshot};
pub use crate::host::{MatchHost, MoveResponse, StateObserver};
pub use crate::rules::{ActionKind, Proposal, TargetHint, Verdict};
