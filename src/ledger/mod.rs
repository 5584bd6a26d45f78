//! Card location ledger.
//!
//! The ledger is the canonical record of where every dealt card is. Each card
//! is in exactly one location; all ordered member lists (hands, loose table
//! cards, build and staging-stack members, capture piles) live here. Other
//! components never mutate these collections directly — they call the move and
//! insert primitives, and the post-commit validator checks that the full deck
//! is still accounted for exactly once.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{Card, EngineError, Seat};
use crate::core::{BuildId, StackId};

/// Where a dealt card currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardLocation {
    /// In a player's hand.
    Hand(Seat),
    /// Loose on the table, not part of any pile.
    TableLoose,
    /// Member of a build.
    TableBuild(BuildId),
    /// Member of a pending staging stack.
    TableStagingStack(StackId),
    /// In a player's capture pile.
    Captures(Seat),
}

/// One step of a pending transaction's position log.
///
/// Records where a card came from so a cancel can put it back exactly where it
/// was. Replayed in reverse order on cancel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub card: Card,
    pub from: CardLocation,
    /// Index the card occupied in its previous location.
    pub from_index: usize,
}

/// Tracks the unique location of every dealt card.
///
/// Every location is ordered: index 0 is the oldest member and the last index
/// the most recent. Capture order matters ("capturing card on top"), build
/// member order matters for display, and staging order is drop order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Card locations: card -> location.
    locations: FxHashMap<Card, CardLocation>,

    /// Ordered member lists per location.
    order: FxHashMap<CardLocation, Vec<Card>>,
}

impl Ledger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Where a card is, or `None` if it has not been dealt.
    #[must_use]
    pub fn locate(&self, card: Card) -> Option<CardLocation> {
        self.locations.get(&card).copied()
    }

    /// Cards at a location, in order.
    #[must_use]
    pub fn cards_at(&self, loc: CardLocation) -> &[Card] {
        self.order.get(&loc).map_or(&[], |v| v.as_slice())
    }

    /// A player's hand, in order.
    #[must_use]
    pub fn hand(&self, seat: Seat) -> &[Card] {
        self.cards_at(CardLocation::Hand(seat))
    }

    /// Loose table cards, in order.
    #[must_use]
    pub fn loose(&self) -> &[Card] {
        self.cards_at(CardLocation::TableLoose)
    }

    /// A player's capture pile, in order (most recent last).
    #[must_use]
    pub fn captures(&self, seat: Seat) -> &[Card] {
        self.cards_at(CardLocation::Captures(seat))
    }

    /// Index of a card within its location's member list.
    #[must_use]
    pub fn index_of(&self, card: Card) -> Option<usize> {
        let loc = self.locate(card)?;
        self.cards_at(loc).iter().position(|&c| c == card)
    }

    /// Total number of dealt cards tracked.
    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.locations.len()
    }

    /// Track a newly dealt card.
    ///
    /// Fails with `InvariantViolation` if the card is already tracked: a card
    /// is created once and only ever relocated afterwards.
    pub fn insert(&mut self, card: Card, loc: CardLocation) -> Result<(), EngineError> {
        if self.locations.contains_key(&card) {
            return Err(EngineError::InvariantViolation {
                detail: format!("card {card} dealt twice"),
            });
        }
        self.locations.insert(card, loc);
        self.order.entry(loc).or_default().push(card);
        Ok(())
    }

    /// Move a card between locations, appending at the destination.
    ///
    /// Fails with `LocationMismatch` if the card is not at `from`.
    pub fn move_card(
        &mut self,
        card: Card,
        from: CardLocation,
        to: CardLocation,
    ) -> Result<(), EngineError> {
        self.move_card_at(card, from, to, usize::MAX)
    }

    /// Move a card between locations, inserting at `index` in the destination.
    ///
    /// The index is clamped to the destination's length: if the exact slot has
    /// been consumed in the meantime, the card is appended instead.
    pub fn move_card_at(
        &mut self,
        card: Card,
        from: CardLocation,
        to: CardLocation,
        index: usize,
    ) -> Result<(), EngineError> {
        let actual = self.locate(card);
        if actual != Some(from) {
            return Err(EngineError::LocationMismatch {
                card,
                expected: from,
                actual,
            });
        }
        if from == to {
            return Ok(());
        }

        if let Some(members) = self.order.get_mut(&from) {
            members.retain(|&c| c != card);
        }
        self.locations.insert(card, to);

        let members = self.order.entry(to).or_default();
        let idx = index.min(members.len());
        members.insert(idx, card);
        Ok(())
    }

    /// Undo one step of a position log, returning the card to where it came
    /// from. Positional reinsertion falls back to append if the slot is gone.
    pub fn undo(&mut self, record: &MoveRecord) -> Result<(), EngineError> {
        let current = self.locate(record.card).ok_or(EngineError::LocationMismatch {
            card: record.card,
            expected: record.from,
            actual: None,
        })?;
        self.move_card_at(record.card, current, record.from, record.from_index)
    }

    /// Drop the member list of an emptied build or staging stack location.
    ///
    /// Fails with `InvariantViolation` if cards are still there.
    pub fn release_location(&mut self, loc: CardLocation) -> Result<(), EngineError> {
        if let Some(members) = self.order.get(&loc) {
            if !members.is_empty() {
                return Err(EngineError::InvariantViolation {
                    detail: format!("releasing non-empty location {loc:?}"),
                });
            }
        }
        self.order.remove(&loc);
        Ok(())
    }

    /// Full-deck multiset check.
    ///
    /// The union of every tracked card and the undealt remainder must equal
    /// the 40-card deck exactly once each, and the ordered member lists must
    /// agree with the location map.
    pub fn validate(&self, undealt: &[Card]) -> Result<(), EngineError> {
        let mut all: Vec<Card> = self.locations.keys().copied().collect();
        all.extend_from_slice(undealt);
        all.sort();

        let mut reference = crate::core::full_deck();
        reference.sort();

        if all != reference {
            return Err(EngineError::InvariantViolation {
                detail: format!(
                    "deck multiset mismatch: {} cards tracked, {} undealt",
                    self.locations.len(),
                    undealt.len()
                ),
            });
        }

        let ordered_total: usize = self.order.values().map(Vec::len).sum();
        if ordered_total != self.locations.len() {
            return Err(EngineError::InvariantViolation {
                detail: format!(
                    "order lists hold {ordered_total} cards, location map holds {}",
                    self.locations.len()
                ),
            });
        }
        for (loc, members) in &self.order {
            for card in members {
                if self.locations.get(card) != Some(loc) {
                    return Err(EngineError::InvariantViolation {
                        detail: format!("card {card} listed at {loc:?} but located elsewhere"),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{full_deck, Rank, Suit};

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    fn dealt_ledger() -> (Ledger, Vec<Card>) {
        // Deal the whole deck into hand 0 so validate() has a closed world.
        let mut ledger = Ledger::new();
        for c in full_deck() {
            ledger.insert(c, CardLocation::Hand(Seat::new(0))).unwrap();
        }
        (ledger, Vec::new())
    }

    #[test]
    fn test_insert_and_locate() {
        let mut ledger = Ledger::new();
        let c = card(Rank::Five, Suit::Spades);

        ledger.insert(c, CardLocation::TableLoose).unwrap();
        assert_eq!(ledger.locate(c), Some(CardLocation::TableLoose));
        assert_eq!(ledger.loose(), &[c]);
    }

    #[test]
    fn test_insert_twice_rejected() {
        let mut ledger = Ledger::new();
        let c = card(Rank::Five, Suit::Spades);

        ledger.insert(c, CardLocation::TableLoose).unwrap();
        let err = ledger.insert(c, CardLocation::Hand(Seat::new(0))).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation { .. }));
    }

    #[test]
    fn test_move_card() {
        let mut ledger = Ledger::new();
        let c = card(Rank::Two, Suit::Hearts);
        let hand = CardLocation::Hand(Seat::new(0));

        ledger.insert(c, hand).unwrap();
        ledger.move_card(c, hand, CardLocation::TableLoose).unwrap();

        assert_eq!(ledger.locate(c), Some(CardLocation::TableLoose));
        assert!(ledger.hand(Seat::new(0)).is_empty());
    }

    #[test]
    fn test_move_wrong_source() {
        let mut ledger = Ledger::new();
        let c = card(Rank::Two, Suit::Hearts);
        ledger.insert(c, CardLocation::TableLoose).unwrap();

        let err = ledger
            .move_card(c, CardLocation::Hand(Seat::new(1)), CardLocation::Captures(Seat::new(1)))
            .unwrap_err();
        assert!(matches!(err, EngineError::LocationMismatch { .. }));
        // Rejected move leaves the card where it was.
        assert_eq!(ledger.locate(c), Some(CardLocation::TableLoose));
    }

    #[test]
    fn test_ordered_reinsertion_clamps() {
        let mut ledger = Ledger::new();
        let a = card(Rank::Ace, Suit::Clubs);
        let b = card(Rank::Two, Suit::Clubs);
        let hand = CardLocation::Hand(Seat::new(0));

        ledger.insert(a, hand).unwrap();
        ledger.insert(b, hand).unwrap();

        ledger.move_card(a, hand, CardLocation::TableLoose).unwrap();
        // Index 5 is past the end; clamped to append.
        ledger
            .move_card_at(a, CardLocation::TableLoose, hand, 5)
            .unwrap();
        assert_eq!(ledger.hand(Seat::new(0)), &[b, a]);
    }

    #[test]
    fn test_undo_restores_position() {
        let mut ledger = Ledger::new();
        let a = card(Rank::Ace, Suit::Clubs);
        let b = card(Rank::Two, Suit::Clubs);
        let c = card(Rank::Three, Suit::Clubs);
        let hand = CardLocation::Hand(Seat::new(0));

        for x in [a, b, c] {
            ledger.insert(x, hand).unwrap();
        }

        let record = MoveRecord {
            card: b,
            from: hand,
            from_index: ledger.index_of(b).unwrap(),
        };
        ledger
            .move_card(b, hand, CardLocation::TableStagingStack(StackId::new(0)))
            .unwrap();
        assert_eq!(ledger.hand(Seat::new(0)), &[a, c]);

        ledger.undo(&record).unwrap();
        assert_eq!(ledger.hand(Seat::new(0)), &[a, b, c]);
    }

    #[test]
    fn test_release_location() {
        let mut ledger = Ledger::new();
        let c = card(Rank::Four, Suit::Diamonds);
        let stack = CardLocation::TableStagingStack(StackId::new(1));

        ledger.insert(c, stack).unwrap();
        assert!(ledger.release_location(stack).is_err());

        ledger.move_card(c, stack, CardLocation::TableLoose).unwrap();
        ledger.release_location(stack).unwrap();
    }

    #[test]
    fn test_validate_full_deck() {
        let (ledger, undealt) = dealt_ledger();
        ledger.validate(&undealt).unwrap();
    }

    #[test]
    fn test_validate_detects_missing_card() {
        let (ledger, _) = dealt_ledger();
        // Claim one card is still undealt: now it exists twice.
        let dup = vec![card(Rank::Ace, Suit::Clubs)];
        assert!(ledger.validate(&dup).is_err());
    }

    #[test]
    fn test_validate_partial_deal() {
        let mut ledger = Ledger::new();
        let mut deck = full_deck();
        for _ in 0..10 {
            let c = deck.pop().unwrap();
            ledger.insert(c, CardLocation::Hand(Seat::new(0))).unwrap();
        }
        ledger.validate(&deck).unwrap();
    }
}
