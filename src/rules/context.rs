//! Proposal types and the immutable evaluation context.
//!
//! Collaborators (gesture/collision layers) normalize a drag into a
//! `Proposal`; rules never see screen coordinates. Predicates and builders
//! receive an explicit `RuleCtx` borrowing the state read-only — no rule
//! closes over ambient state.

use serde::{Deserialize, Serialize};

use crate::build::Build;
use crate::core::{BuildId, Card, Seat, StackId};
use crate::game::GameState;
use crate::ledger::CardLocation;
use crate::staging::StagingStack;

/// What the dragged card was dropped onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetHint {
    /// A loose table card.
    LooseCard(Card),
    /// A build.
    Build(BuildId),
    /// A pending staging stack.
    StagingStack(StackId),
    /// Empty table space.
    EmptyTable,
}

/// A normalized move proposal: this card, from here, onto that.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub card: Card,
    pub source: CardLocation,
    pub target: TargetHint,
}

/// Read-only context handed to every rule predicate and builder.
#[derive(Clone, Copy)]
pub struct RuleCtx<'a> {
    pub state: &'a GameState,
    pub actor: Seat,
    pub card: Card,
    pub source: CardLocation,
    pub target: TargetHint,
}

impl<'a> RuleCtx<'a> {
    /// Value of the played card.
    #[must_use]
    pub fn value(&self) -> u8 {
        self.card.value()
    }

    /// The targeted loose card, if the hint names one that is actually loose.
    #[must_use]
    pub fn target_loose(&self) -> Option<Card> {
        match self.target {
            TargetHint::LooseCard(card)
                if self.state.ledger().locate(card) == Some(CardLocation::TableLoose) =>
            {
                Some(card)
            }
            _ => None,
        }
    }

    /// The targeted build, if the hint names a live one.
    #[must_use]
    pub fn target_build(&self) -> Option<&'a Build> {
        match self.target {
            TargetHint::Build(id) => self.state.build(id),
            _ => None,
        }
    }

    /// Members of the targeted build.
    #[must_use]
    pub fn target_build_members(&self) -> &'a [Card] {
        match self.target {
            TargetHint::Build(id) => self.state.build_members(id),
            _ => &[],
        }
    }

    /// The targeted staging stack, if the hint names a live one.
    #[must_use]
    pub fn target_stack(&self) -> Option<&'a StagingStack> {
        match self.target {
            TargetHint::StagingStack(id) => self.state.stack(id),
            _ => None,
        }
    }

    /// The actor's hand without the played card.
    pub fn hand_rest(&self) -> impl Iterator<Item = Card> + 'a {
        let card = self.card;
        self.state
            .ledger()
            .hand(self.actor)
            .iter()
            .copied()
            .filter(move |&c| c != card)
    }

    /// Does the actor hold another card of this value (besides the played
    /// card)?
    #[must_use]
    pub fn holds_other_of(&self, value: u8) -> bool {
        self.hand_rest().any(|c| c.value() == value)
    }

    /// Loose table cards.
    #[must_use]
    pub fn loose(&self) -> &'a [Card] {
        self.state.ledger().loose()
    }

    /// Does the actor own a committed build?
    #[must_use]
    pub fn owns_build(&self) -> bool {
        self.state.owns_build(self.actor)
    }
}
