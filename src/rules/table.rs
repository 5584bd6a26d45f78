//! The priority-ordered rule table.
//!
//! Rules are pure data: `{ id, priority, exclusive, predicate, builder }`,
//! constructed once and evaluated in descending priority. A matching rule
//! appends exactly one candidate; an exclusive match stops further
//! evaluation.
//!
//! Priority bands, high to low: staging augmentation and on-build staging
//! (exclusive, only they match their target hints) > zero-choice auto-capture
//! (exclusive) > ordinary build/combination/single captures > same-value
//! build offers > staging creation (exclusive) > build extension > trail.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::build::{can_partition, member_sum};
use crate::core::Card;
use crate::ledger::CardLocation;

use super::action::ActionKind;
use super::context::{RuleCtx, TargetHint};

/// Stable identifier for a rule, reported with every candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleId {
    StageAugment,
    StageOnBuild,
    AutoCaptureSingle,
    CaptureBuild,
    CaptureCombination,
    CaptureSingle,
    BuildToValue,
    BuildToDouble,
    StageCreate,
    ExtendOwnBuild,
    ExtendOpponentBuild,
    Trail,
}

/// One rule of the table.
pub struct Rule {
    pub id: RuleId,
    pub priority: u16,
    /// A match stops further evaluation.
    pub exclusive: bool,
    pub applies: fn(&RuleCtx<'_>) -> bool,
    pub action: fn(&RuleCtx<'_>) -> ActionKind,
}

/// The rule table, sorted by descending priority.
pub static RULES: &[Rule] = &[
    Rule {
        id: RuleId::StageAugment,
        priority: 240,
        exclusive: true,
        applies: stage_augment_applies,
        action: stage_augment_action,
    },
    Rule {
        id: RuleId::StageOnBuild,
        priority: 230,
        exclusive: true,
        applies: stage_on_build_applies,
        action: stage_on_build_action,
    },
    Rule {
        id: RuleId::AutoCaptureSingle,
        priority: 205,
        exclusive: true,
        applies: auto_capture_applies,
        action: capture_loose_action,
    },
    Rule {
        id: RuleId::CaptureBuild,
        priority: 200,
        exclusive: false,
        applies: capture_build_applies,
        action: capture_build_action,
    },
    Rule {
        id: RuleId::CaptureCombination,
        priority: 195,
        exclusive: false,
        applies: capture_combination_applies,
        action: capture_combination_action,
    },
    Rule {
        id: RuleId::CaptureSingle,
        priority: 190,
        exclusive: false,
        applies: capture_single_applies,
        action: capture_loose_action,
    },
    Rule {
        id: RuleId::BuildToValue,
        priority: 185,
        exclusive: false,
        applies: build_to_value_applies,
        action: build_to_value_action,
    },
    Rule {
        id: RuleId::BuildToDouble,
        priority: 180,
        exclusive: false,
        applies: build_to_double_applies,
        action: build_to_double_action,
    },
    Rule {
        id: RuleId::StageCreate,
        priority: 90,
        exclusive: true,
        applies: stage_create_applies,
        action: stage_create_action,
    },
    Rule {
        id: RuleId::ExtendOwnBuild,
        priority: 40,
        exclusive: false,
        applies: extend_own_applies,
        action: extend_own_action,
    },
    Rule {
        id: RuleId::ExtendOpponentBuild,
        priority: 35,
        exclusive: false,
        applies: extend_opponent_applies,
        action: extend_opponent_action,
    },
    Rule {
        id: RuleId::Trail,
        priority: 10,
        exclusive: false,
        applies: trail_applies,
        action: trail_action,
    },
];

fn from_hand(ctx: &RuleCtx<'_>) -> bool {
    ctx.source == CardLocation::Hand(ctx.actor)
}

// === Staging ===

fn stage_augment_applies(ctx: &RuleCtx<'_>) -> bool {
    // Augmentation never validates combinations: any ownership-valid drop
    // lands. Cards may come from the hand or loose from the table.
    let Some(stack) = ctx.target_stack() else {
        return false;
    };
    stack.owner == ctx.actor
        && (from_hand(ctx) || ctx.source == CardLocation::TableLoose)
}

fn stage_augment_action(ctx: &RuleCtx<'_>) -> ActionKind {
    let stack = ctx.target_stack().expect("predicate checked stack");
    ActionKind::StageAugment {
        card: ctx.card,
        stack: stack.id,
    }
}

fn stage_on_build_applies(ctx: &RuleCtx<'_>) -> bool {
    // Dropping on your own build when neither capture nor a clean one-card
    // extension applies opens an augmentation stack to experiment with.
    let Some(build) = ctx.target_build() else {
        return false;
    };
    if !from_hand(ctx) || build.owner != ctx.actor || build.is_pending() {
        return false;
    }
    if ctx.state.augmentation_stack_for(build.id).is_some() {
        return false;
    }
    let members = ctx.target_build_members();
    !build.capturable_with(ctx.value(), members) && !valid_own_extension(ctx)
}

fn stage_on_build_action(ctx: &RuleCtx<'_>) -> ActionKind {
    let build = ctx.target_build().expect("predicate checked build");
    ActionKind::StageOnBuild {
        card: ctx.card,
        build: build.id,
    }
}

fn stage_create_applies(ctx: &RuleCtx<'_>) -> bool {
    let Some(target) = ctx.target_loose() else {
        return false;
    };
    // Equal values are a capture/build matter, and a pile past ten can never
    // resolve; everything else may be staged and sorted out at finalize.
    from_hand(ctx)
        && target.value() != ctx.value()
        && u32::from(target.value()) + u32::from(ctx.value()) <= 10
}

fn stage_create_action(ctx: &RuleCtx<'_>) -> ActionKind {
    ActionKind::StageCreate {
        card: ctx.card,
        target: ctx.target_loose().expect("predicate checked target"),
    }
}

// === Captures ===

fn auto_capture_applies(ctx: &RuleCtx<'_>) -> bool {
    // Zero-choice capture: matching value, no second card of that value in
    // hand, and (for values up to five) no card of double the value that
    // could start a build instead.
    let Some(target) = ctx.target_loose() else {
        return false;
    };
    let v = ctx.value();
    if target.value() != v || !from_hand(ctx) {
        return false;
    }
    !ctx.holds_other_of(v) && (v > 5 || !ctx.holds_other_of(v * 2))
}

fn capture_single_applies(ctx: &RuleCtx<'_>) -> bool {
    // The choice variant: same match as auto-capture, reached only when the
    // exclusive auto rule declined.
    let Some(target) = ctx.target_loose() else {
        return false;
    };
    from_hand(ctx) && target.value() == ctx.value()
}

fn capture_loose_action(ctx: &RuleCtx<'_>) -> ActionKind {
    let targets = capture_set(ctx.loose(), ctx.value(), None)
        .expect("predicate guaranteed an equal-value target");
    ActionKind::CaptureLoose {
        card: ctx.card,
        targets,
    }
}

fn capture_combination_applies(ctx: &RuleCtx<'_>) -> bool {
    let Some(target) = ctx.target_loose() else {
        return false;
    };
    if !from_hand(ctx) || target.value() == ctx.value() {
        return false;
    }
    capture_set(ctx.loose(), ctx.value(), Some(target)).is_some()
}

fn capture_combination_action(ctx: &RuleCtx<'_>) -> ActionKind {
    let target = ctx.target_loose().expect("predicate checked target");
    let targets = capture_set(ctx.loose(), ctx.value(), Some(target))
        .expect("predicate found a combination");
    ActionKind::CaptureLoose {
        card: ctx.card,
        targets,
    }
}

fn capture_build_applies(ctx: &RuleCtx<'_>) -> bool {
    let Some(build) = ctx.target_build() else {
        return false;
    };
    from_hand(ctx)
        && !build.is_pending()
        && build.capturable_with(ctx.value(), ctx.target_build_members())
}

fn capture_build_action(ctx: &RuleCtx<'_>) -> ActionKind {
    let build = ctx.target_build().expect("predicate checked build");
    ActionKind::CaptureBuild {
        card: ctx.card,
        build: build.id,
    }
}

// === Direct builds ===

fn build_to_value_applies(ctx: &RuleCtx<'_>) -> bool {
    let Some(target) = ctx.target_loose() else {
        return false;
    };
    let v = ctx.value();
    from_hand(ctx) && target.value() == v && ctx.holds_other_of(v)
}

fn build_to_value_action(ctx: &RuleCtx<'_>) -> ActionKind {
    ActionKind::CreateBuild {
        card: ctx.card,
        target: ctx.target_loose().expect("predicate checked target"),
        value: ctx.value(),
    }
}

fn build_to_double_applies(ctx: &RuleCtx<'_>) -> bool {
    let Some(target) = ctx.target_loose() else {
        return false;
    };
    let v = ctx.value();
    from_hand(ctx) && target.value() == v && v <= 5 && ctx.holds_other_of(v * 2)
}

fn build_to_double_action(ctx: &RuleCtx<'_>) -> ActionKind {
    ActionKind::CreateBuild {
        card: ctx.card,
        target: ctx.target_loose().expect("predicate checked target"),
        value: ctx.value() * 2,
    }
}

// === Extensions ===

fn valid_own_extension(ctx: &RuleCtx<'_>) -> bool {
    let Some(build) = ctx.target_build() else {
        return false;
    };
    let members = ctx.target_build_members();
    if !build.is_extendable(members) {
        return false;
    }
    let mut values: Vec<u8> = members.iter().map(|c| c.value()).collect();
    values.push(ctx.value());
    can_partition(&values, build.capture_value)
}

fn extend_own_applies(ctx: &RuleCtx<'_>) -> bool {
    let Some(build) = ctx.target_build() else {
        return false;
    };
    from_hand(ctx) && build.owner == ctx.actor && !build.is_pending() && valid_own_extension(ctx)
}

fn extend_own_action(ctx: &RuleCtx<'_>) -> ActionKind {
    let build = ctx.target_build().expect("predicate checked build");
    ActionKind::ExtendOwnBuild {
        card: ctx.card,
        build: build.id,
    }
}

fn extend_opponent_applies(ctx: &RuleCtx<'_>) -> bool {
    let Some(build) = ctx.target_build() else {
        return false;
    };
    if !from_hand(ctx) || build.owner != ctx.actor.opponent() || build.is_pending() {
        return false;
    }
    let members = ctx.target_build_members();
    // Only single-group builds can be raised; reinforced ones are locked in.
    build.is_extendable(members)
        && member_sum(members) == u32::from(build.capture_value)
        && u32::from(build.capture_value) + u32::from(ctx.value()) <= 10
}

fn extend_opponent_action(ctx: &RuleCtx<'_>) -> ActionKind {
    let build = ctx.target_build().expect("predicate checked build");
    ActionKind::ProposeExtendOpponent {
        card: ctx.card,
        build: build.id,
        new_value: build.capture_value + ctx.value(),
    }
}

// === Trail ===

fn trail_applies(ctx: &RuleCtx<'_>) -> bool {
    if ctx.target != TargetHint::EmptyTable || !from_hand(ctx) {
        return false;
    }
    // Trailing is the last resort: never while the card could capture, and in
    // the first round never while owning a build.
    if ctx.state.round() == 1 && ctx.owns_build() {
        return false;
    }
    let v = ctx.value();
    if capture_set(ctx.loose(), v, None).is_some() {
        return false;
    }
    !ctx.state
        .builds()
        .any(|b| !b.is_pending() && b.capturable_with(v, ctx.state.build_members(b.id)))
}

fn trail_action(ctx: &RuleCtx<'_>) -> ActionKind {
    ActionKind::Trail { card: ctx.card }
}

// === Capture set search ===

/// Everything a card of value `v` takes from the loose table cards: all
/// equal-value cards plus disjoint combinations summing to `v`, chosen
/// deterministically in table order. `forced` requires a specific card to be
/// part of some combination.
///
/// Returns `None` when nothing is capturable (or the forced card cannot be
/// covered).
pub(crate) fn capture_set(
    loose: &[Card],
    v: u8,
    forced: Option<Card>,
) -> Option<SmallVec<[Card; 4]>> {
    let mut taken = vec![false; loose.len()];
    for (i, c) in loose.iter().enumerate() {
        if c.value() == v {
            taken[i] = true;
        }
    }

    if let Some(card) = forced {
        let idx = loose.iter().position(|&c| c == card)?;
        if !taken[idx] {
            let subset = find_combination(loose, &taken, v, Some(idx))?;
            for i in subset {
                taken[i] = true;
            }
        }
    }

    while let Some(subset) = find_combination(loose, &taken, v, None) {
        for i in subset {
            taken[i] = true;
        }
    }

    let set: SmallVec<[Card; 4]> = loose
        .iter()
        .enumerate()
        .filter(|&(i, _)| taken[i])
        .map(|(_, &c)| c)
        .collect();
    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

/// First combination (in table order) of untaken cards summing exactly to
/// `target`, optionally required to contain `require`.
fn find_combination(
    loose: &[Card],
    taken: &[bool],
    target: u8,
    require: Option<usize>,
) -> Option<Vec<usize>> {
    let mut chosen = Vec::new();
    let mut remaining = i32::from(target);
    if let Some(idx) = require {
        remaining -= i32::from(loose[idx].value());
        if remaining < 0 {
            return None;
        }
        chosen.push(idx);
    }
    if combination_dfs(loose, taken, 0, remaining, require, &mut chosen) {
        Some(chosen)
    } else {
        None
    }
}

fn combination_dfs(
    loose: &[Card],
    taken: &[bool],
    start: usize,
    remaining: i32,
    require: Option<usize>,
    chosen: &mut Vec<usize>,
) -> bool {
    if remaining == 0 {
        // A single equal-value card is not a combination; those are swept by
        // the equal pass.
        return chosen.len() >= 2;
    }
    for i in start..loose.len() {
        if taken[i] || Some(i) == require {
            continue;
        }
        let value = i32::from(loose[i].value());
        if value > remaining {
            continue;
        }
        chosen.push(i);
        if combination_dfs(loose, taken, i + 1, remaining - value, require, chosen) {
            return true;
        }
        chosen.pop();
    }
    false
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

    #[test]
    fn test_rules_sorted_descending() {
        for pair in RULES.windows(2) {
            assert!(pair[0].priority > pair[1].priority);
        }
    }

    #[test]
    fn test_capture_set_equal_only() {
        let loose = cards(&[5, 3, 5]);
        let set = capture_set(&loose, 5, None).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.iter().all(|c| c.value() == 5));
    }

    #[test]
    fn test_capture_set_combination() {
        // 9 takes 4+5 and the loose 9.
        let loose = cards(&[4, 9, 5]);
        let set = capture_set(&loose, 9, None).unwrap();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_capture_set_forced_card() {
        let loose = cards(&[4, 2, 5]);
        // 9 forced through the 4: combination 4+5.
        let set = capture_set(&loose, 9, Some(loose[0])).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&loose[0]));
        assert!(set.contains(&loose[2]));

        // The 2 cannot be part of any 9-combination here (2+4=6, 2+5=7).
        assert!(capture_set(&loose, 9, Some(loose[1])).is_none());
    }

    #[test]
    fn test_capture_set_nothing() {
        let loose = cards(&[4, 2]);
        assert!(capture_set(&loose, 9, None).is_none());
    }

    #[test]
    fn test_capture_set_disjoint_combinations() {
        // Two disjoint 6-combinations: 4+2 and 5+1, plus the loose 6.
        let loose = cards(&[4, 2, 5, 1, 6]);
        let set = capture_set(&loose, 6, None).unwrap();
        assert_eq!(set.len(), 5);
    }
}
