//! Engine error types.
//!
//! Every error is local to a single proposal: the proposal is rejected and the
//! state rolled back in full, never partially applied. Nothing here is fatal
//! to the host process.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::card::Card;
use super::seat::Seat;
use crate::ledger::CardLocation;

/// Errors returned when a proposal or pending resolution is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No rule produced a candidate action, or a choice/pending reference was
    /// stale or malformed.
    #[error("invalid move: {reason}")]
    InvalidMove { reason: String },

    /// A card was not where the caller claimed it was.
    #[error("card {card} is at {actual:?}, not {expected:?}")]
    LocationMismatch {
        card: Card,
        expected: CardLocation,
        actual: Option<CardLocation>,
    },

    /// A player may own at most one active build.
    #[error("{seat} already owns an active build")]
    DuplicateBuildOwner { seat: Seat },

    /// Adding the card would break the build's value invariant.
    #[error("extending with {card} would not keep the build capturable at {capture_value}")]
    InvalidExtension { card: Card, capture_value: u8 },

    /// At acceptance time the acting player no longer holds a card matching
    /// the new capture value.
    #[error("no card of value {value} in hand to back the extension")]
    MissingCaptureCard { value: u8 },

    /// Merge requires the pending value to equal the target build's value.
    #[error("cannot merge: pending value {proposed} does not match build value {target}")]
    IncompatibleBuildValues { proposed: u8, target: u8 },

    /// Post-commit consistency check failed. Internal: two components
    /// disagreed about card ownership. The commit is discarded.
    #[error("state invariant violated: {detail}")]
    InvariantViolation { detail: String },
}

impl EngineError {
    /// Convenience constructor for `InvalidMove`.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        EngineError::InvalidMove {
            reason: reason.into(),
        }
    }

    /// Wire-level discriminant for transport.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidMove { .. } => ErrorKind::InvalidMove,
            EngineError::LocationMismatch { .. } => ErrorKind::LocationMismatch,
            EngineError::DuplicateBuildOwner { .. } => ErrorKind::DuplicateBuildOwner,
            EngineError::InvalidExtension { .. } => ErrorKind::InvalidExtension,
            EngineError::MissingCaptureCard { .. } => ErrorKind::MissingCaptureCard,
            EngineError::IncompatibleBuildValues { .. } => ErrorKind::IncompatibleBuildValues,
            EngineError::InvariantViolation { .. } => ErrorKind::InvariantViolation,
        }
    }
}

/// Serializable error discriminant sent to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidMove,
    LocationMismatch,
    DuplicateBuildOwner,
    InvalidExtension,
    MissingCaptureCard,
    IncompatibleBuildValues,
    InvariantViolation,
}
