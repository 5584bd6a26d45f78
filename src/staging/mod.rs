//! Staging stacks: the two-phase builder for temporary multi-card piles.
//!
//! A staging stack is created on first contact (two cards dropped together)
//! and freely mutated while pending. Augmentation never validates
//! combinations: players experiment freely, and legality is only checked when
//! the stack is finalized into a build or a capture. Cancelling replays the
//! position log in reverse, returning every card to where it came from.
//!
//! Member cards live in the ledger under `TableStagingStack(id)`, ordered by
//! drop sequence, not by value.

use serde::{Deserialize, Serialize};

use crate::build::{can_partition, decomposition_values, member_sum, Build};
use crate::core::{BuildId, Card, Seat, StackId};
use crate::ledger::MoveRecord;

/// A pending staging stack.
///
/// `augments` marks a stack assembled on top of an existing build: its only
/// legal finalization is reinforcing that build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingStack {
    pub id: StackId,
    pub owner: Seat,
    /// Target build when this stack is a build augmentation.
    pub augments: Option<BuildId>,
    /// Where each member came from, in drop order. Replayed in reverse on
    /// cancel.
    pub log: Vec<MoveRecord>,
}

impl StagingStack {
    /// Create a stack record. Members are moved in by the caller via the
    /// ledger.
    #[must_use]
    pub fn new(id: StackId, owner: Seat, augments: Option<BuildId>) -> Self {
        Self {
            id,
            owner,
            augments,
            log: Vec::new(),
        }
    }

    /// Cumulative value of the given members.
    #[must_use]
    pub fn cumulative_value(&self, members: &[Card]) -> u32 {
        member_sum(members)
    }

    /// Legal finalizations for the current contents. Pure query.
    ///
    /// - Plain stacks: one build option per decomposition value ≤ 10, and one
    ///   capture option per loose table card matching a decomposition value.
    /// - Augmentation stacks: a single reinforce option when the combined
    ///   members still partition at the build's capture value.
    ///
    /// Options never share a card: each option consumes the whole stack.
    #[must_use]
    pub fn resolve_options(
        &self,
        members: &[Card],
        loose: &[Card],
        target_build: Option<(&Build, &[Card])>,
    ) -> Vec<StagingResolution> {
        if let Some(build_id) = self.augments {
            let Some((build, build_members)) = target_build else {
                return Vec::new();
            };
            let mut combined: Vec<u8> = build_members.iter().map(|c| c.value()).collect();
            combined.extend(members.iter().map(|c| c.value()));
            if can_partition(&combined, build.capture_value) {
                return vec![StagingResolution::Reinforce { build: build_id }];
            }
            return Vec::new();
        }

        let mut options = Vec::new();
        for value in decomposition_values(members) {
            if value <= 10 {
                options.push(StagingResolution::Build { value });
            }
            for &target in loose.iter().filter(|c| c.value() == value) {
                options.push(StagingResolution::Capture { value, target });
            }
        }
        options
    }
}

/// A legal way to finalize a staging stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StagingResolution {
    /// Convert the stack into a build at the chosen capture value.
    Build { value: u8 },
    /// Capture the matching loose table card together with the stack.
    Capture { value: u8, target: Card },
    /// Fold the stack into the build it was staged on.
    Reinforce { build: BuildId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Rank, Suit};

    fn cards(values: &[u8]) -> Vec<Card> {
        let suits = Suit::ALL;
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Card::new(Rank::from_value(v).unwrap(), suits[i % 4]))
            .collect()
    }

    fn stack() -> StagingStack {
        StagingStack::new(StackId::new(0), Seat::new(0), None)
    }

    #[test]
    fn test_cumulative_value() {
        let s = stack();
        assert_eq!(s.cumulative_value(&cards(&[3, 4])), 7);
    }

    #[test]
    fn test_resolve_build_option() {
        let s = stack();
        let options = s.resolve_options(&cards(&[3, 4]), &[], None);
        assert_eq!(options, vec![StagingResolution::Build { value: 7 }]);
    }

    #[test]
    fn test_resolve_capture_option() {
        let s = stack();
        let seven = Card::new(Rank::Seven, Suit::Hearts);
        let options = s.resolve_options(&cards(&[3, 4]), &[seven], None);
        assert!(options.contains(&StagingResolution::Build { value: 7 }));
        assert!(options.contains(&StagingResolution::Capture {
            value: 7,
            target: seven
        }));
    }

    #[test]
    fn test_resolve_multiple_decompositions() {
        // 2+2+4 resolves at 4 (two groups) or 8 (one group).
        let s = stack();
        let options = s.resolve_options(&cards(&[2, 2, 4]), &[], None);
        assert!(options.contains(&StagingResolution::Build { value: 4 }));
        assert!(options.contains(&StagingResolution::Build { value: 8 }));
    }

    #[test]
    fn test_resolve_augmentation() {
        let build = Build::new(BuildId::new(3), Seat::new(1), 7);
        let s = StagingStack::new(StackId::new(0), Seat::new(0), Some(BuildId::new(3)));

        // Build [3,4] plus staged [7]: partitions at 7.
        let options = s.resolve_options(
            &cards(&[7]),
            &[],
            Some((&build, &cards(&[3, 4]))),
        );
        assert_eq!(
            options,
            vec![StagingResolution::Reinforce {
                build: BuildId::new(3)
            }]
        );

        // Staged [2]: 3+4+2 does not partition at 7.
        let options = s.resolve_options(&cards(&[2]), &[], Some((&build, &cards(&[3, 4]))));
        assert!(options.is_empty());
    }
}
