//! Builds and the build lifecycle.
//!
//! A build combines table cards toward a target capture value. Member cards
//! live in the ledger (ordered, most-recent-last); this module holds the
//! build's metadata and transaction state.
//!
//! Invariants on the member multiset:
//! - the sum is exactly `capture_value` or partitions into groups that each
//!   sum to it (reinforced / merged builds);
//! - `has_base` iff one member's value equals the sum of the rest; base
//!   builds are never extendable;
//! - extendable iff fewer than five members, no base, and the multiset has
//!   exactly one value-decomposition.
//!
//! A build is `Committed` or mid-transaction (`Extending`): an opponent
//! extension moves the tentative card in immediately but keeps the original
//! cards, value, and owner in an overlay until the extender accepts or
//! cancels. Pending-ness is a type-level fact, not a sibling field.

use serde::{Deserialize, Serialize};

use crate::core::{BuildId, Card, Seat};
use crate::ledger::MoveRecord;

/// Snapshot taken when a tentative opponent-card append is proposed.
///
/// `original_*` is the rollback target; `preview_*` is what the build becomes
/// if the extension is accepted. The move log records where each newly added
/// card came from, for exact cancellation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingExtension {
    pub original_cards: Vec<Card>,
    pub original_value: u8,
    pub original_owner: Seat,
    pub preview_value: u8,
    pub preview_owner: Seat,
    pub log: Vec<MoveRecord>,
}

/// Transaction state of a build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildPhase {
    /// No transaction in progress.
    Committed,
    /// A tentative extension is awaiting accept or cancel.
    Extending(PendingExtension),
}

/// A build on the table.
///
/// Member cards are not stored here: the ledger's member list for
/// `CardLocation::TableBuild(id)` is canonical, including order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub id: BuildId,
    pub owner: Seat,
    pub capture_value: u8,
    pub phase: BuildPhase,
}

impl Build {
    /// Create a committed build.
    #[must_use]
    pub fn new(id: BuildId, owner: Seat, capture_value: u8) -> Self {
        Self {
            id,
            owner,
            capture_value,
            phase: BuildPhase::Committed,
        }
    }

    /// Is an extension transaction in progress?
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.phase, BuildPhase::Extending(_))
    }

    /// The pending extension overlay, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&PendingExtension> {
        match &self.phase {
            BuildPhase::Committed => None,
            BuildPhase::Extending(p) => Some(p),
        }
    }

    /// Can `card_value` capture this build given its current members?
    ///
    /// The value must equal the capture value, or be a positive multiple of it
    /// that matches the total member sum at that multiple.
    #[must_use]
    pub fn capturable_with(&self, card_value: u8, members: &[Card]) -> bool {
        if card_value == self.capture_value {
            return true;
        }
        card_value % self.capture_value == 0 && u32::from(card_value) == member_sum(members)
    }

    /// Value shown to players.
    ///
    /// Members summing to a multiple of the capture value display the capture
    /// value itself; an off-multiple sum displays the (negated) deficit to the
    /// next capturable multiple.
    #[must_use]
    pub fn display_value(&self, members: &[Card]) -> i32 {
        let sum = member_sum(members);
        let v = u32::from(self.capture_value);
        if sum % v == 0 {
            self.capture_value as i32
        } else {
            let next = sum.div_ceil(v) * v;
            -((next - sum) as i32)
        }
    }

    /// One member's value equals the sum of the rest.
    #[must_use]
    pub fn has_base(&self, members: &[Card]) -> bool {
        has_base(members)
    }

    /// Fewer than five members, no base, and a single value-decomposition.
    #[must_use]
    pub fn is_extendable(&self, members: &[Card]) -> bool {
        members.len() < 5 && !has_base(members) && decomposition_values(members).len() == 1
    }
}

/// Total value of a member list.
#[must_use]
pub fn member_sum(members: &[Card]) -> u32 {
    members.iter().map(|c| u32::from(c.value())).sum()
}

/// One member's value equals the sum of all the others.
#[must_use]
pub fn has_base(members: &[Card]) -> bool {
    if members.len() < 2 {
        return false;
    }
    let total = member_sum(members);
    members.iter().any(|c| u32::from(c.value()) * 2 == total)
}

/// Every value `v` (1..=10) such that the member multiset partitions into
/// groups each summing exactly `v`.
///
/// A single card decomposes only to its own value. An empty list decomposes
/// to nothing.
#[must_use]
pub fn decomposition_values(members: &[Card]) -> Vec<u8> {
    let total = member_sum(members);
    if total == 0 {
        return Vec::new();
    }
    let values: Vec<u8> = members.iter().map(|c| c.value()).collect();
    (1..=10u8)
        .filter(|&v| total % u32::from(v) == 0 && can_partition(&values, v))
        .collect()
}

/// Can the multiset be split into groups each summing exactly `target`?
#[must_use]
pub fn can_partition(values: &[u8], target: u8) -> bool {
    let total: u32 = values.iter().map(|&v| u32::from(v)).sum();
    if total == 0 || total % u32::from(target) != 0 {
        return false;
    }
    if values.iter().any(|&v| v > target) {
        return false;
    }
    let mut sorted: Vec<u8> = values.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let groups = (total / u32::from(target)) as usize;
    let mut remaining = vec![target; groups];
    fill_groups(&sorted, 0, &mut remaining)
}

fn fill_groups(values: &[u8], idx: usize, remaining: &mut [u8]) -> bool {
    if idx == values.len() {
        // Total is divisible and nothing overflowed, so every group is full.
        return true;
    }
    let v = values[idx];
    // Groups with equal remaining capacity are interchangeable.
    let mut tried = [false; 11];
    for g in 0..remaining.len() {
        let cap = remaining[g];
        if cap < v || tried[cap as usize] {
            continue;
        }
        tried[cap as usize] = true;
        remaining[g] -= v;
        if fill_groups(values, idx + 1, remaining) {
            remaining[g] += v;
            return true;
        }
        remaining[g] += v;
    }
    false
}
