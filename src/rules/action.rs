//! Candidate actions produced by rule evaluation.
//!
//! A candidate is self-contained: committing it needs nothing beyond the
//! fields it carries. Candidates are identified by `ActionId` so a client can
//! answer a multi-candidate verdict with `submit_choice`.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{ActionId, BuildId, Card, StackId};

use super::table::RuleId;

/// A fully specified action the player could commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Capture loose table cards with a hand card.
    CaptureLoose {
        card: Card,
        /// Everything captured, in table order. The played card goes on top.
        targets: SmallVec<[Card; 4]>,
    },
    /// Capture a build with a matching-value hand card.
    CaptureBuild { card: Card, build: BuildId },
    /// Create a build directly from the played card and one loose card.
    CreateBuild {
        card: Card,
        target: Card,
        value: u8,
    },
    /// Open a staging stack from the played card and one loose card.
    StageCreate { card: Card, target: Card },
    /// Drop another card onto a pending staging stack.
    StageAugment { card: Card, stack: StackId },
    /// Open an augmentation staging stack on top of a build.
    StageOnBuild { card: Card, build: BuildId },
    /// Add a card to the player's own build, value preserved.
    ExtendOwnBuild { card: Card, build: BuildId },
    /// Tentatively raise an opponent's build to a new value.
    ProposeExtendOpponent {
        card: Card,
        build: BuildId,
        new_value: u8,
    },
    /// Place the card loose on the table. Irreversible; always confirmed.
    Trail { card: Card },
}

impl ActionKind {
    /// Trailing is the only action that needs confirmation on its own.
    #[must_use]
    pub fn is_trail(&self) -> bool {
        matches!(self, ActionKind::Trail { .. })
    }
}

/// A candidate with its provenance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateAction {
    pub id: ActionId,
    pub rule: RuleId,
    pub kind: ActionKind,
}

/// Result of evaluating a proposal.
///
/// `requires_confirmation` is true iff more than one candidate exists, or the
/// sole candidate is a trail. Identical inputs always produce an identical
/// candidate list in identical order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub candidates: Vec<CandidateAction>,
    pub requires_confirmation: bool,
}

impl Verdict {
    /// Build a verdict from an ordered candidate list.
    #[must_use]
    pub fn new(candidates: Vec<CandidateAction>) -> Self {
        let requires_confirmation =
            candidates.len() > 1 || candidates.iter().any(|c| c.kind.is_trail());
        Self {
            candidates,
            requires_confirmation,
        }
    }

    /// The single candidate that may commit without confirmation, if any.
    #[must_use]
    pub fn unambiguous(&self) -> Option<&CandidateAction> {
        if self.requires_confirmation {
            None
        } else {
            self.candidates.first()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Rank, Suit};

    fn candidate(id: u32, kind: ActionKind) -> CandidateAction {
        CandidateAction {
            id: ActionId::new(id),
            rule: RuleId::Trail,
            kind,
        }
    }

    #[test]
    fn test_single_capture_is_unambiguous() {
        let card = Card::new(Rank::Five, Suit::Spades);
        let verdict = Verdict::new(vec![candidate(
            0,
            ActionKind::CaptureLoose {
                card,
                targets: SmallVec::new(),
            },
        )]);
        assert!(!verdict.requires_confirmation);
        assert!(verdict.unambiguous().is_some());
    }

    #[test]
    fn test_trail_requires_confirmation() {
        let card = Card::new(Rank::Five, Suit::Spades);
        let verdict = Verdict::new(vec![candidate(0, ActionKind::Trail { card })]);
        assert!(verdict.requires_confirmation);
        assert!(verdict.unambiguous().is_none());
    }

    #[test]
    fn test_multiple_candidates_require_confirmation() {
        let card = Card::new(Rank::Five, Suit::Spades);
        let verdict = Verdict::new(vec![
            candidate(
                0,
                ActionKind::CaptureLoose {
                    card,
                    targets: SmallVec::new(),
                },
            ),
            candidate(
                1,
                ActionKind::CreateBuild {
                    card,
                    target: Card::new(Rank::Five, Suit::Clubs),
                    value: 5,
                },
            ),
        ]);
        assert!(verdict.requires_confirmation);
    }
}
