//! Rule evaluation: proposal in, ordered candidates out.
//!
//! Evaluation is a pure function of (proposal, state): identical inputs yield
//! an identical candidate list in identical order. It mutates nothing;
//! committing a chosen candidate is the game layer's job.

use crate::core::{ActionId, EngineError, Seat};
use crate::game::GameState;
use crate::ledger::CardLocation;

use super::action::{CandidateAction, Verdict};
use super::context::{Proposal, RuleCtx};
use super::table::RULES;

/// Evaluate a proposal against the rule table.
///
/// Fails with `LocationMismatch` if the card is not where the proposal claims,
/// and `InvalidMove` if no rule produces a candidate or the source is not a
/// playable location for the actor.
pub fn evaluate(
    state: &GameState,
    actor: Seat,
    proposal: &Proposal,
) -> Result<Verdict, EngineError> {
    let actual = state.ledger().locate(proposal.card);
    if actual != Some(proposal.source) {
        return Err(EngineError::LocationMismatch {
            card: proposal.card,
            expected: proposal.source,
            actual,
        });
    }

    match proposal.source {
        CardLocation::Hand(seat) if seat == actor => {}
        CardLocation::TableLoose => {}
        _ => {
            return Err(EngineError::invalid(format!(
                "{} cannot be played from {:?}",
                proposal.card, proposal.source
            )));
        }
    }

    let ctx = RuleCtx {
        state,
        actor,
        card: proposal.card,
        source: proposal.source,
        target: proposal.target,
    };

    let mut candidates = Vec::new();
    for rule in RULES {
        if (rule.applies)(&ctx) {
            candidates.push(CandidateAction {
                id: ActionId::new(candidates.len() as u32),
                rule: rule.id,
                kind: (rule.action)(&ctx),
            });
            if rule.exclusive {
                break;
            }
        }
    }

    if candidates.is_empty() {
        return Err(EngineError::invalid(format!(
            "no legal action for {} onto {:?}",
            proposal.card, proposal.target
        )));
    }
    Ok(Verdict::new(candidates))
}
