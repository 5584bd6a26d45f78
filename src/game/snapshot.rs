//! Serializable state views.
//!
//! Snapshots are value-equal when the underlying states are: member order is
//! preserved everywhere, so two snapshots of the same position compare equal
//! with `==`. Used for change broadcasts, rejection-idempotence checks, and
//! the invariant-violation log.

use serde::{Deserialize, Serialize};

use crate::core::{BuildId, Card, Seat, SeatMap, StackId};
use crate::ledger::CardLocation;

use super::{GameState, MatchOutcome};

/// Client-facing view of a build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildView {
    pub id: BuildId,
    pub owner: Seat,
    pub capture_value: u8,
    /// Players see the capture value, or the negated deficit to the next
    /// capturable multiple.
    pub display_value: i32,
    pub members: Vec<Card>,
    /// An extension transaction is awaiting accept or cancel.
    pub pending: bool,
}

/// Client-facing view of a staging stack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackView {
    pub id: StackId,
    pub owner: Seat,
    pub value: u32,
    pub members: Vec<Card>,
    pub augments: Option<BuildId>,
}

/// Full serializable view of a match position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub round: u32,
    pub current: Seat,
    pub deck_remaining: usize,
    pub hand_sizes: SeatMap<usize>,
    pub hands: SeatMap<Vec<Card>>,
    pub loose: Vec<Card>,
    pub builds: Vec<BuildView>,
    pub stacks: Vec<StackView>,
    pub captures: SeatMap<Vec<Card>>,
    pub outcome: Option<MatchOutcome>,
    pub version: u64,
}

impl StateSnapshot {
    /// Capture the current position. Builds and stacks are ordered by id.
    #[must_use]
    pub fn capture(state: &GameState) -> Self {
        let hands = SeatMap::new(|seat| state.ledger.hand(seat).to_vec());
        let hand_sizes = SeatMap::new(|seat| state.ledger.hand(seat).len());
        let captures = SeatMap::new(|seat| state.ledger.captures(seat).to_vec());

        let mut builds: Vec<BuildView> = state
            .builds
            .values()
            .map(|b| {
                let members = state.ledger.cards_at(CardLocation::TableBuild(b.id));
                BuildView {
                    id: b.id,
                    owner: b.owner,
                    capture_value: b.capture_value,
                    display_value: b.display_value(members),
                    members: members.to_vec(),
                    pending: b.is_pending(),
                }
            })
            .collect();
        builds.sort_by_key(|b| b.id.raw());

        let mut stacks: Vec<StackView> = state
            .stacks
            .values()
            .map(|s| {
                let members = state.ledger.cards_at(CardLocation::TableStagingStack(s.id));
                StackView {
                    id: s.id,
                    owner: s.owner,
                    value: s.cumulative_value(members),
                    members: members.to_vec(),
                    augments: s.augments,
                }
            })
            .collect();
        stacks.sort_by_key(|s| s.id.raw());

        Self {
            round: state.round,
            current: state.current,
            deck_remaining: state.deck.len(),
            hand_sizes,
            hands,
            loose: state.ledger.loose().to_vec(),
            builds,
            stacks,
            captures,
            outcome: state.outcome,
            version: state.version,
        }
    }

    /// Copy with the opponent's hand hidden. `hand_sizes` stays populated so
    /// clients can still render card backs.
    #[must_use]
    pub fn redacted_for(&self, seat: Seat) -> Self {
        let mut view = self.clone();
        view.hands[seat.opponent()] = Vec::new();
        view
    }

    /// Compact binary encoding.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decode a binary snapshot.
    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_equality_for_identical_positions() {
        let a = GameState::new(11).snapshot();
        let b = GameState::new(11).snapshot();
        assert_eq!(a, b);
        assert_ne!(a, GameState::new(12).snapshot());
    }

    #[test]
    fn test_snapshot_round_trips_through_bincode() {
        let snap = GameState::new(3).snapshot();
        let bytes = snap.encode().unwrap();
        assert_eq!(StateSnapshot::decode(&bytes).unwrap(), snap);
    }

    #[test]
    fn test_redaction_hides_only_the_opponent_hand() {
        let seat = Seat::new(0);
        let snap = GameState::new(9).snapshot();
        let view = snap.redacted_for(seat);
        assert_eq!(view.hands[seat], snap.hands[seat]);
        assert!(view.hands[seat.opponent()].is_empty());
        assert_eq!(view.hand_sizes[seat.opponent()], 10);
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let snap = GameState::new(1).snapshot();
        let value = serde_json::to_value(&snap).unwrap();
        assert_eq!(value["round"], 1);
        assert_eq!(value["deck_remaining"], 20);
    }
}
