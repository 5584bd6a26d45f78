//! The rule engine: priority-ordered action determination.

pub mod action;
pub mod context;
pub mod engine;
pub mod table;

pub use action::{ActionKind, CandidateAction, Verdict};
pub use context::{Proposal, RuleCtx, TargetHint};
pub use engine::evaluate;
pub use table::{Rule, RuleId, RULES};
