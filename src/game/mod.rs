//! Match state and the transactional commit pipeline.
//!
//! `GameState` holds everything about one match: the ledger, the undealt
//! deck, build and staging registries, the turn pointer, and the action
//! history. `Game` wraps it with the propose → confirm → commit protocol:
//! every mutation runs against a pre-commit snapshot, is validated by the
//! ledger's full-deck check, and is rolled back wholesale on any error.
//! Rejected proposals leave the state untouched.

mod snapshot;
mod turn;

pub use snapshot::{BuildView, StackView, StateSnapshot};

use im::Vector;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::build::{can_partition, Build, BuildPhase, PendingExtension};
use crate::core::{full_deck, BuildId, Card, EngineError, GameRng, Seat, SeatMap, StackId};
use crate::ledger::{CardLocation, Ledger, MoveRecord};
use crate::rules::{self, ActionKind, CandidateAction, Proposal};
use crate::staging::{StagingResolution, StagingStack};

/// Cards dealt to each seat per round. Two rounds exhaust the 40-card deck.
pub const HAND_SIZE: usize = 10;

/// Result of a finished match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// One seat captured more cards.
    Winner(Seat),
    /// Equal captures.
    Draw,
}

impl MatchOutcome {
    /// Did this seat win?
    #[must_use]
    pub fn is_winner(&self, seat: Seat) -> bool {
        matches!(self, MatchOutcome::Winner(s) if *s == seat)
    }
}

/// A committed transition, recorded in the match history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A rule-engine candidate was committed.
    Action(ActionKind),
    AcceptExtension { build: BuildId },
    CancelExtension { build: BuildId },
    Merge { source: BuildId, target: BuildId },
    Overtake { extended: BuildId, own: BuildId },
    FinalizeStaging {
        stack: StackId,
        resolution: StagingResolution,
    },
    CancelStaging { stack: StackId },
}

/// History entry for one committed transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub seat: Seat,
    pub event: GameEvent,
    pub round: u32,
    pub sequence: u64,
}

/// Complete state of one match.
#[derive(Clone, Debug)]
pub struct GameState {
    pub(crate) ledger: Ledger,
    /// Undealt cards, top of the deck at the end.
    pub(crate) deck: Vec<Card>,
    pub(crate) builds: FxHashMap<BuildId, Build>,
    pub(crate) stacks: FxHashMap<StackId, StagingStack>,
    pub(crate) current: Seat,
    pub(crate) round: u32,
    pub(crate) last_capturer: Option<Seat>,
    pub(crate) outcome: Option<MatchOutcome>,
    pub(crate) history: Vector<ActionRecord>,
    pub(crate) next_build_id: u32,
    pub(crate) next_stack_id: u32,
    pub(crate) version: u64,
    pub(crate) rng: GameRng,
}

impl GameState {
    /// Create a match: seeded shuffle, round 1 dealt, empty table.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let mut rng = GameRng::new(seed);
        let mut deck = full_deck();
        rng.shuffle(&mut deck);

        let mut state = Self {
            ledger: Ledger::new(),
            deck,
            builds: FxHashMap::default(),
            stacks: FxHashMap::default(),
            current: Seat::new(0),
            round: 1,
            last_capturer: None,
            outcome: None,
            history: Vector::new(),
            next_build_id: 0,
            next_stack_id: 0,
            version: 0,
            rng,
        };
        turn::deal_hands(&mut state).expect("fresh deal cannot duplicate a card");
        state
    }

    /// Assemble an arbitrary mid-match position for replays and scenario
    /// setups. Cards not named stay undealt; captures start empty.
    pub fn from_position(
        hands: SeatMap<Vec<Card>>,
        loose: Vec<Card>,
        current: Seat,
        round: u32,
    ) -> Result<Self, EngineError> {
        let mut ledger = Ledger::new();
        for seat in Seat::both() {
            for &card in &hands[seat] {
                ledger.insert(card, CardLocation::Hand(seat))?;
            }
        }
        for &card in &loose {
            ledger.insert(card, CardLocation::TableLoose)?;
        }
        let deck: Vec<Card> = full_deck()
            .into_iter()
            .filter(|c| ledger.locate(*c).is_none())
            .collect();
        ledger.validate(&deck)?;

        Ok(Self {
            ledger,
            deck,
            builds: FxHashMap::default(),
            stacks: FxHashMap::default(),
            current,
            round,
            last_capturer: None,
            outcome: None,
            history: Vector::new(),
            next_build_id: 0,
            next_stack_id: 0,
            version: 0,
            rng: GameRng::new(0),
        })
    }

    /// The ledger.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Seat whose turn it is.
    #[must_use]
    pub fn current_player(&self) -> Seat {
        self.current
    }

    /// Current round, starting at 1.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Cards left undealt.
    #[must_use]
    pub fn deck_remaining(&self) -> usize {
        self.deck.len()
    }

    /// Final outcome, once the match has ended.
    #[must_use]
    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    /// Seat that made the most recent capture.
    #[must_use]
    pub fn last_capturer(&self) -> Option<Seat> {
        self.last_capturer
    }

    /// Monotonic commit counter; bumps once per committed transition.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Committed-transition history, oldest first.
    #[must_use]
    pub fn history(&self) -> &Vector<ActionRecord> {
        &self.history
    }

    /// A build by id.
    #[must_use]
    pub fn build(&self, id: BuildId) -> Option<&Build> {
        self.builds.get(&id)
    }

    /// All builds, in unspecified order.
    pub fn builds(&self) -> impl Iterator<Item = &Build> {
        self.builds.values()
    }

    /// Member cards of a build, in order (most recent last).
    #[must_use]
    pub fn build_members(&self, id: BuildId) -> &[Card] {
        self.ledger.cards_at(CardLocation::TableBuild(id))
    }

    /// A staging stack by id.
    #[must_use]
    pub fn stack(&self, id: StackId) -> Option<&StagingStack> {
        self.stacks.get(&id)
    }

    /// All staging stacks, in unspecified order.
    pub fn stacks(&self) -> impl Iterator<Item = &StagingStack> {
        self.stacks.values()
    }

    /// Member cards of a staging stack, in drop order.
    #[must_use]
    pub fn stack_members(&self, id: StackId) -> &[Card] {
        self.ledger.cards_at(CardLocation::TableStagingStack(id))
    }

    /// The augmentation stack targeting a build, if one is pending.
    #[must_use]
    pub fn augmentation_stack_for(&self, build: BuildId) -> Option<&StagingStack> {
        self.stacks.values().find(|s| s.augments == Some(build))
    }

    /// Does this seat own a committed build?
    #[must_use]
    pub fn owns_build(&self, seat: Seat) -> bool {
        self.builds.values().any(|b| b.owner == seat)
    }

    /// Serializable view of the whole match.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::capture(self)
    }

    fn alloc_build_id(&mut self) -> BuildId {
        let id = BuildId::new(self.next_build_id);
        self.next_build_id += 1;
        id
    }

    fn alloc_stack_id(&mut self) -> StackId {
        let id = StackId::new(self.next_stack_id);
        self.next_stack_id += 1;
        id
    }
}

/// Result of a submitted proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The single unambiguous candidate committed immediately.
    Committed(CandidateAction),
    /// More than one candidate (or a lone trail): answer with
    /// `submit_choice`.
    NeedsConfirmation(Vec<CandidateAction>),
}

#[derive(Clone, Debug)]
struct PendingChoice {
    seat: Seat,
    candidates: Vec<CandidateAction>,
}

/// One match behind the propose → confirm → commit protocol.
///
/// Proposals must arrive strictly sequentially; the host serializes access
/// per match. No method blocks.
#[derive(Debug)]
pub struct Game {
    state: GameState,
    pending_choice: Option<PendingChoice>,
}

impl Game {
    /// Create a match with a seeded deal.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::from_state(GameState::new(seed))
    }

    /// Wrap an assembled position.
    #[must_use]
    pub fn from_state(state: GameState) -> Self {
        Self {
            state,
            pending_choice: None,
        }
    }

    /// Read-only state access.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Serializable view of the current state.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    /// Submit a move proposal.
    ///
    /// A single unambiguous candidate commits immediately; otherwise the
    /// candidate list is stored and returned for `submit_choice`.
    pub fn submit_move(
        &mut self,
        seat: Seat,
        proposal: &Proposal,
    ) -> Result<MoveOutcome, EngineError> {
        self.ensure_active(seat)?;
        let verdict = rules::evaluate(&self.state, seat, proposal).map_err(|err| {
            warn!(%seat, card = %proposal.card, %err, "proposal rejected");
            err
        })?;

        if let Some(candidate) = verdict.unambiguous() {
            let candidate = candidate.clone();
            self.commit_candidate(seat, &candidate)?;
            Ok(MoveOutcome::Committed(candidate))
        } else {
            self.pending_choice = Some(PendingChoice {
                seat,
                candidates: verdict.candidates.clone(),
            });
            Ok(MoveOutcome::NeedsConfirmation(verdict.candidates))
        }
    }

    /// Commit one candidate from a confirmation-required verdict.
    ///
    /// On rejection the candidate list stays valid so the player can pick
    /// another resolution.
    pub fn submit_choice(
        &mut self,
        seat: Seat,
        action: crate::core::ActionId,
    ) -> Result<CandidateAction, EngineError> {
        self.ensure_active(seat)?;
        let candidate = {
            let pending = self
                .pending_choice
                .as_ref()
                .filter(|p| p.seat == seat)
                .ok_or_else(|| EngineError::invalid("no choice awaiting this seat"))?;
            pending
                .candidates
                .iter()
                .find(|c| c.id == action)
                .cloned()
                .ok_or_else(|| EngineError::invalid(format!("unknown candidate {action}")))?
        };
        self.commit_candidate(seat, &candidate)?;
        Ok(candidate)
    }

    /// Legal finalizations for a staging stack. Pure query.
    pub fn staging_options(
        &self,
        stack_id: StackId,
    ) -> Result<Vec<StagingResolution>, EngineError> {
        let stack = self
            .state
            .stack(stack_id)
            .ok_or_else(|| EngineError::invalid(format!("unknown stack {stack_id}")))?;
        let members = self.state.stack_members(stack_id);
        let target = stack
            .augments
            .and_then(|id| self.state.build(id).map(|b| (b, self.state.build_members(id))));
        Ok(stack.resolve_options(members, self.state.ledger.loose(), target))
    }

    /// Finalize a staging stack into a build, a capture, or a reinforcement.
    pub fn finalize_staging(
        &mut self,
        seat: Seat,
        stack_id: StackId,
        resolution: StagingResolution,
    ) -> Result<(), EngineError> {
        self.ensure_active(seat)?;
        let options = self.staging_options(stack_id)?;
        if !options.contains(&resolution) {
            return Err(EngineError::invalid(format!(
                "{resolution:?} is not a legal finalization for {stack_id}"
            )));
        }
        self.transact(
            seat,
            GameEvent::FinalizeStaging {
                stack: stack_id,
                resolution,
            },
            |state| apply_finalize_staging(state, seat, stack_id, resolution),
        )
    }

    /// Dissolve a staging stack, returning every card to where it came from.
    /// The turn does not advance.
    pub fn cancel_staging(&mut self, seat: Seat, stack_id: StackId) -> Result<(), EngineError> {
        self.ensure_active(seat)?;
        self.transact(seat, GameEvent::CancelStaging { stack: stack_id }, |state| {
            apply_cancel_staging(state, seat, stack_id)
        })
    }

    /// Accept a pending opponent-build extension.
    ///
    /// Re-validates at acceptance time that the extender still holds a card
    /// matching the new capture value.
    pub fn accept_extension(&mut self, seat: Seat, build: BuildId) -> Result<(), EngineError> {
        self.ensure_active(seat)?;
        self.transact(seat, GameEvent::AcceptExtension { build }, |state| {
            apply_accept_extension(state, seat, build)
        })
    }

    /// Cancel a pending extension: the tentative card returns to the
    /// extender's hand, the build's cards, value, and owner are unchanged,
    /// and the turn pointer does not move.
    pub fn cancel_extension(&mut self, seat: Seat, build: BuildId) -> Result<(), EngineError> {
        self.ensure_active(seat)?;
        self.transact(seat, GameEvent::CancelExtension { build }, |state| {
            apply_cancel_extension(state, seat, build)
        })
    }

    /// Merge a pending-extended opponent build into the player's own build of
    /// matching value. The target keeps its capture value.
    pub fn merge_builds(
        &mut self,
        seat: Seat,
        source: BuildId,
        target: BuildId,
    ) -> Result<(), EngineError> {
        self.ensure_active(seat)?;
        self.transact(seat, GameEvent::Merge { source, target }, |state| {
            apply_merge(state, seat, source, target)
        })
    }

    /// Capture both the pending-extended opponent build and the player's own
    /// matching build with a spare capture card.
    pub fn overtake_builds(
        &mut self,
        seat: Seat,
        extended: BuildId,
        own: BuildId,
    ) -> Result<(), EngineError> {
        self.ensure_active(seat)?;
        self.transact(seat, GameEvent::Overtake { extended, own }, |state| {
            apply_overtake(state, seat, extended, own)
        })
    }

    fn ensure_active(&self, seat: Seat) -> Result<(), EngineError> {
        if self.state.outcome.is_some() {
            return Err(EngineError::invalid("match is over"));
        }
        if self.state.current != seat {
            return Err(EngineError::invalid(format!("not {seat}'s turn")));
        }
        Ok(())
    }

    fn commit_candidate(
        &mut self,
        seat: Seat,
        candidate: &CandidateAction,
    ) -> Result<(), EngineError> {
        let kind = candidate.kind.clone();
        self.transact(seat, GameEvent::Action(kind.clone()), move |state| {
            apply_action(state, seat, &kind)
        })
    }

    /// Run one transition: apply, advance the turn if the transition calls
    /// for it, validate the full-deck invariant, and either record the commit
    /// or restore the pre-commit snapshot.
    fn transact(
        &mut self,
        seat: Seat,
        event: GameEvent,
        apply: impl FnOnce(&mut GameState) -> Result<bool, EngineError>,
    ) -> Result<(), EngineError> {
        let before = self.state.clone();
        let round = self.state.round;

        let applied = (|| {
            let advances = apply(&mut self.state)?;
            if advances {
                turn::advance_turn(&mut self.state)?;
            }
            self.state.ledger.validate(&self.state.deck)?;
            Ok(())
        })();

        match applied {
            Ok(()) => {
                // Any stored candidate list was evaluated against the
                // pre-commit state and is stale now.
                self.pending_choice = None;
                self.state.version += 1;
                let sequence = self.state.version;
                self.state.history.push_back(ActionRecord {
                    seat,
                    event,
                    round,
                    sequence,
                });
                info!(%seat, sequence, "committed transition");
                Ok(())
            }
            Err(err) => {
                if matches!(err, EngineError::InvariantViolation { .. }) {
                    // Two components disagreed about ownership; log both
                    // sides of the discarded commit.
                    let before_json = serde_json::to_value(before.snapshot()).ok();
                    let after_json = serde_json::to_value(self.state.snapshot()).ok();
                    error!(
                        %seat,
                        %err,
                        before = ?before_json,
                        after = ?after_json,
                        "commit discarded after invariant violation"
                    );
                } else {
                    warn!(%seat, %err, "transition rejected");
                }
                self.state = before;
                Err(err)
            }
        }
    }
}

// === Action application ===

/// Apply a committed candidate. Returns whether the turn advances.
fn apply_action(state: &mut GameState, seat: Seat, kind: &ActionKind) -> Result<bool, EngineError> {
    match kind {
        ActionKind::CaptureLoose { card, targets } => {
            for &target in targets {
                state
                    .ledger
                    .move_card(target, CardLocation::TableLoose, CardLocation::Captures(seat))?;
            }
            // Capturing card goes on top.
            state
                .ledger
                .move_card(*card, CardLocation::Hand(seat), CardLocation::Captures(seat))?;
            state.last_capturer = Some(seat);
            Ok(true)
        }

        ActionKind::CaptureBuild { card, build } => {
            let b = state
                .builds
                .get(build)
                .ok_or_else(|| EngineError::invalid(format!("unknown build {build}")))?;
            if b.is_pending() {
                return Err(EngineError::invalid("build is mid-extension"));
            }
            let loc = CardLocation::TableBuild(*build);
            let members: Vec<Card> = state.ledger.cards_at(loc).to_vec();
            for member in members {
                state
                    .ledger
                    .move_card(member, loc, CardLocation::Captures(seat))?;
            }
            state
                .ledger
                .move_card(*card, CardLocation::Hand(seat), CardLocation::Captures(seat))?;
            state.ledger.release_location(loc)?;
            state.builds.remove(build);
            state.last_capturer = Some(seat);
            Ok(true)
        }

        ActionKind::CreateBuild {
            card,
            target,
            value,
        } => {
            if state.owns_build(seat) {
                return Err(EngineError::DuplicateBuildOwner { seat });
            }
            let id = state.alloc_build_id();
            let loc = CardLocation::TableBuild(id);
            state.ledger.move_card(*target, CardLocation::TableLoose, loc)?;
            state.ledger.move_card(*card, CardLocation::Hand(seat), loc)?;
            state.builds.insert(id, Build::new(id, seat, *value));
            Ok(true)
        }

        ActionKind::StageCreate { card, target } => {
            let id = state.alloc_stack_id();
            let loc = CardLocation::TableStagingStack(id);
            let mut stack = StagingStack::new(id, seat, None);

            stage_in(state, &mut stack, *target, loc)?;
            stage_in(state, &mut stack, *card, loc)?;
            state.stacks.insert(id, stack);
            Ok(false)
        }

        ActionKind::StageAugment { card, stack } => {
            let loc = CardLocation::TableStagingStack(*stack);
            let mut staged = state
                .stacks
                .remove(stack)
                .ok_or_else(|| EngineError::invalid(format!("unknown stack {stack}")))?;
            let moved = stage_in(state, &mut staged, *card, loc);
            state.stacks.insert(*stack, staged);
            moved?;
            Ok(false)
        }

        ActionKind::StageOnBuild { card, build } => {
            if state.builds.get(build).is_none() {
                return Err(EngineError::invalid(format!("unknown build {build}")));
            }
            let id = state.alloc_stack_id();
            let loc = CardLocation::TableStagingStack(id);
            let mut stack = StagingStack::new(id, seat, Some(*build));
            stage_in(state, &mut stack, *card, loc)?;
            state.stacks.insert(id, stack);
            Ok(false)
        }

        ActionKind::ExtendOwnBuild { card, build } => {
            let loc = CardLocation::TableBuild(*build);
            let valid = {
                let b = state
                    .builds
                    .get(build)
                    .ok_or_else(|| EngineError::invalid(format!("unknown build {build}")))?;
                let members = state.ledger.cards_at(loc);
                let mut values: Vec<u8> = members.iter().map(|c| c.value()).collect();
                values.push(card.value());
                b.owner == seat
                    && !b.is_pending()
                    && b.is_extendable(members)
                    && can_partition(&values, b.capture_value)
            };
            if !valid {
                let capture_value = state.builds[build].capture_value;
                return Err(EngineError::InvalidExtension {
                    card: *card,
                    capture_value,
                });
            }
            state.ledger.move_card(*card, CardLocation::Hand(seat), loc)?;
            Ok(true)
        }

        ActionKind::ProposeExtendOpponent {
            card,
            build,
            new_value,
        } => {
            let loc = CardLocation::TableBuild(*build);
            let overlay = {
                let b = state
                    .builds
                    .get(build)
                    .ok_or_else(|| EngineError::invalid(format!("unknown build {build}")))?;
                if b.owner != seat.opponent() || b.is_pending() {
                    return Err(EngineError::InvalidExtension {
                        card: *card,
                        capture_value: b.capture_value,
                    });
                }
                let members = state.ledger.cards_at(loc);
                PendingExtension {
                    original_cards: members.to_vec(),
                    original_value: b.capture_value,
                    original_owner: b.owner,
                    preview_value: *new_value,
                    preview_owner: seat,
                    log: Vec::new(),
                }
            };

            let from_index = state.ledger.index_of(*card).unwrap_or(0);
            state.ledger.move_card(*card, CardLocation::Hand(seat), loc)?;

            let b = state
                .builds
                .get_mut(build)
                .expect("build existence checked above");
            let mut overlay = overlay;
            overlay.log.push(MoveRecord {
                card: *card,
                from: CardLocation::Hand(seat),
                from_index,
            });
            b.phase = BuildPhase::Extending(overlay);
            Ok(false)
        }

        ActionKind::Trail { card } => {
            state
                .ledger
                .move_card(*card, CardLocation::Hand(seat), CardLocation::TableLoose)?;
            Ok(true)
        }
    }
}

/// Move a card into a staging stack, recording its prior position for exact
/// cancellation.
fn stage_in(
    state: &mut GameState,
    stack: &mut StagingStack,
    card: Card,
    loc: CardLocation,
) -> Result<(), EngineError> {
    let from = state
        .ledger
        .locate(card)
        .ok_or_else(|| EngineError::invalid(format!("{card} is not in play")))?;
    let from_index = state.ledger.index_of(card).unwrap_or(0);
    state.ledger.move_card(card, from, loc)?;
    stack.log.push(MoveRecord {
        card,
        from,
        from_index,
    });
    Ok(())
}

fn apply_finalize_staging(
    state: &mut GameState,
    seat: Seat,
    stack_id: StackId,
    resolution: StagingResolution,
) -> Result<bool, EngineError> {
    let stack = state
        .stacks
        .get(&stack_id)
        .ok_or_else(|| EngineError::invalid(format!("unknown stack {stack_id}")))?;
    if stack.owner != seat {
        return Err(EngineError::invalid("not the stack owner"));
    }
    let loc = CardLocation::TableStagingStack(stack_id);
    let members: Vec<Card> = state.ledger.cards_at(loc).to_vec();

    match resolution {
        StagingResolution::Build { value } => {
            if state.owns_build(seat) {
                return Err(EngineError::DuplicateBuildOwner { seat });
            }
            // A build must be backed by a capture card in hand.
            if !state.ledger.hand(seat).iter().any(|c| c.value() == value) {
                return Err(EngineError::MissingCaptureCard { value });
            }
            let id = state.alloc_build_id();
            let build_loc = CardLocation::TableBuild(id);
            for member in members {
                state.ledger.move_card(member, loc, build_loc)?;
            }
            state.builds.insert(id, Build::new(id, seat, value));
        }
        StagingResolution::Capture { target, .. } => {
            for member in members {
                state
                    .ledger
                    .move_card(member, loc, CardLocation::Captures(seat))?;
            }
            state
                .ledger
                .move_card(target, CardLocation::TableLoose, CardLocation::Captures(seat))?;
            state.last_capturer = Some(seat);
        }
        StagingResolution::Reinforce { build } => {
            let build_loc = CardLocation::TableBuild(build);
            if state.builds.get(&build).is_none() {
                return Err(EngineError::invalid(format!("unknown build {build}")));
            }
            for member in members {
                state.ledger.move_card(member, loc, build_loc)?;
            }
        }
    }

    state.stacks.remove(&stack_id);
    state.ledger.release_location(loc)?;
    Ok(true)
}

fn apply_cancel_staging(
    state: &mut GameState,
    seat: Seat,
    stack_id: StackId,
) -> Result<bool, EngineError> {
    let stack = state
        .stacks
        .get(&stack_id)
        .ok_or_else(|| EngineError::invalid(format!("unknown stack {stack_id}")))?;
    if stack.owner != seat {
        return Err(EngineError::invalid("not the stack owner"));
    }
    let log = stack.log.clone();
    for record in log.iter().rev() {
        state.ledger.undo(record)?;
    }
    state.stacks.remove(&stack_id);
    state
        .ledger
        .release_location(CardLocation::TableStagingStack(stack_id))?;
    Ok(false)
}

fn apply_accept_extension(
    state: &mut GameState,
    seat: Seat,
    build: BuildId,
) -> Result<bool, EngineError> {
    let (preview_value, preview_owner) = {
        let b = state
            .builds
            .get(&build)
            .ok_or_else(|| EngineError::invalid(format!("unknown build {build}")))?;
        let pending = b
            .pending()
            .ok_or_else(|| EngineError::invalid("no pending extension"))?;
        (pending.preview_value, pending.preview_owner)
    };
    if preview_owner != seat {
        return Err(EngineError::invalid("only the extender may accept"));
    }
    // Re-validate at acceptance time: the extender must still hold a card
    // matching the new capture value.
    if !state
        .ledger
        .hand(seat)
        .iter()
        .any(|c| c.value() == preview_value)
    {
        return Err(EngineError::MissingCaptureCard {
            value: preview_value,
        });
    }

    let b = state
        .builds
        .get_mut(&build)
        .expect("build existence checked above");
    b.owner = preview_owner;
    b.capture_value = preview_value;
    b.phase = BuildPhase::Committed;
    Ok(true)
}

fn apply_cancel_extension(
    state: &mut GameState,
    seat: Seat,
    build: BuildId,
) -> Result<bool, EngineError> {
    let pending = {
        let b = state
            .builds
            .get(&build)
            .ok_or_else(|| EngineError::invalid(format!("unknown build {build}")))?;
        let pending = b
            .pending()
            .ok_or_else(|| EngineError::invalid("no pending extension"))?;
        if pending.preview_owner != seat {
            return Err(EngineError::invalid("only the extender may cancel"));
        }
        pending.clone()
    };
    for record in pending.log.iter().rev() {
        state.ledger.undo(record)?;
    }
    // Replaying the log must land exactly on the pre-extension members.
    let members = state.ledger.cards_at(CardLocation::TableBuild(build));
    if members != pending.original_cards.as_slice() {
        return Err(EngineError::InvariantViolation {
            detail: format!("cancelled extension left {build} with altered members"),
        });
    }
    let b = state
        .builds
        .get_mut(&build)
        .expect("build existence checked above");
    b.owner = pending.original_owner;
    b.capture_value = pending.original_value;
    b.phase = BuildPhase::Committed;
    Ok(false)
}

fn apply_merge(
    state: &mut GameState,
    seat: Seat,
    source: BuildId,
    target: BuildId,
) -> Result<bool, EngineError> {
    if source == target {
        return Err(EngineError::invalid("cannot merge a build into itself"));
    }
    let preview_value = {
        let b = state
            .builds
            .get(&source)
            .ok_or_else(|| EngineError::invalid(format!("unknown build {source}")))?;
        let pending = b
            .pending()
            .ok_or_else(|| EngineError::invalid("no pending extension to merge"))?;
        if pending.preview_owner != seat {
            return Err(EngineError::invalid("only the extender may merge"));
        }
        pending.preview_value
    };
    let target_value = {
        let t = state
            .builds
            .get(&target)
            .ok_or_else(|| EngineError::invalid(format!("unknown build {target}")))?;
        if t.owner != seat || t.is_pending() {
            return Err(EngineError::invalid("merge target must be an own committed build"));
        }
        t.capture_value
    };
    if preview_value != target_value {
        return Err(EngineError::IncompatibleBuildValues {
            proposed: preview_value,
            target: target_value,
        });
    }

    let source_loc = CardLocation::TableBuild(source);
    let target_loc = CardLocation::TableBuild(target);
    let members: Vec<Card> = state.ledger.cards_at(source_loc).to_vec();
    for member in members {
        state.ledger.move_card(member, source_loc, target_loc)?;
    }
    state.ledger.release_location(source_loc)?;
    state.builds.remove(&source);
    Ok(true)
}

fn apply_overtake(
    state: &mut GameState,
    seat: Seat,
    extended: BuildId,
    own: BuildId,
) -> Result<bool, EngineError> {
    if extended == own {
        return Err(EngineError::invalid("overtake needs two distinct builds"));
    }
    let preview_value = {
        let b = state
            .builds
            .get(&extended)
            .ok_or_else(|| EngineError::invalid(format!("unknown build {extended}")))?;
        let pending = b
            .pending()
            .ok_or_else(|| EngineError::invalid("no pending extension to overtake"))?;
        if pending.preview_owner != seat {
            return Err(EngineError::invalid("only the extender may overtake"));
        }
        pending.preview_value
    };
    let own_value = {
        let t = state
            .builds
            .get(&own)
            .ok_or_else(|| EngineError::invalid(format!("unknown build {own}")))?;
        if t.owner != seat || t.is_pending() {
            return Err(EngineError::invalid("overtake needs an own committed build"));
        }
        t.capture_value
    };
    if preview_value != own_value {
        return Err(EngineError::IncompatibleBuildValues {
            proposed: preview_value,
            target: own_value,
        });
    }
    let capture_card = state
        .ledger
        .hand(seat)
        .iter()
        .copied()
        .find(|c| c.value() == preview_value)
        .ok_or(EngineError::MissingCaptureCard {
            value: preview_value,
        })?;

    let captures = CardLocation::Captures(seat);
    for loc in [CardLocation::TableBuild(own), CardLocation::TableBuild(extended)] {
        let members: Vec<Card> = state.ledger.cards_at(loc).to_vec();
        for member in members {
            state.ledger.move_card(member, loc, captures)?;
        }
        state.ledger.release_location(loc)?;
    }
    state
        .ledger
        .move_card(capture_card, CardLocation::Hand(seat), captures)?;
    state.builds.remove(&extended);
    state.builds.remove(&own);
    state.last_capturer = Some(seat);
    Ok(true)
}
