//! Multi-match hosting and change broadcasting.
//!
//! `MatchHost` owns every live match behind a concurrent map, serializes
//! access per match, and fires registered observers exactly once per
//! committed transition. Engine errors are flattened into a serializable
//! `MoveResponse` at this boundary; nothing here panics on bad input.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{ActionId, BuildId, EngineError, ErrorKind, MatchId, Seat, StackId};
use crate::game::{Game, MoveOutcome, StateSnapshot};
use crate::rules::{CandidateAction, Proposal};
use crate::staging::StagingResolution;

/// Callback for committed state transitions.
///
/// Fired once per committed transition, after the match lock is released.
/// Rejected proposals never fire it.
pub trait StateObserver: Send + Sync {
    fn on_state_changed(&self, match_id: MatchId, snapshot: &StateSnapshot);
}

/// A pending construct awaiting resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingRef {
    /// A staging stack.
    Stack(StackId),
    /// A build with a tentative extension.
    Build(BuildId),
}

/// Wire-friendly result of a host operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveResponse {
    Ok {
        candidates: Vec<CandidateAction>,
        requires_confirmation: bool,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl MoveResponse {
    fn committed(candidate: CandidateAction) -> Self {
        MoveResponse::Ok {
            candidates: vec![candidate],
            requires_confirmation: false,
        }
    }

    fn applied() -> Self {
        MoveResponse::Ok {
            candidates: Vec::new(),
            requires_confirmation: false,
        }
    }

    /// Was the operation accepted?
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, MoveResponse::Ok { .. })
    }
}

impl From<EngineError> for MoveResponse {
    fn from(err: EngineError) -> Self {
        MoveResponse::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Owns live matches and broadcasts committed transitions.
#[derive(Default)]
pub struct MatchHost {
    matches: DashMap<MatchId, Mutex<Game>>,
    next_id: AtomicU64,
    observers: RwLock<Vec<Arc<dyn StateObserver>>>,
}

impl MatchHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for all matches on this host.
    pub fn register_observer(&self, observer: Arc<dyn StateObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }

    /// Create a match with a seeded deal and broadcast its initial state.
    pub fn create_match(&self, seed: u64) -> MatchId {
        let id = MatchId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let game = Game::new(seed);
        let snapshot = game.snapshot();
        self.matches.insert(id, Mutex::new(game));
        info!(match_id = %id, seed, "match created");
        self.notify(id, &snapshot);
        id
    }

    /// Drop a match. Returns whether it existed.
    pub fn remove_match(&self, id: MatchId) -> bool {
        self.matches.remove(&id).is_some()
    }

    /// Number of live matches.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Full snapshot of a match.
    #[must_use]
    pub fn snapshot(&self, id: MatchId) -> Option<StateSnapshot> {
        let entry = self.matches.get(&id)?;
        let game = entry.lock().unwrap_or_else(|e| e.into_inner());
        Some(game.snapshot())
    }

    /// Snapshot with the opponent's hand hidden, for one seat's client.
    #[must_use]
    pub fn snapshot_for(&self, id: MatchId, seat: Seat) -> Option<StateSnapshot> {
        self.snapshot(id).map(|s| s.redacted_for(seat))
    }

    /// Submit a move proposal to a match.
    pub fn submit_move(&self, id: MatchId, seat: Seat, proposal: &Proposal) -> MoveResponse {
        self.with_game(id, |game| match game.submit_move(seat, proposal)? {
            MoveOutcome::Committed(candidate) => Ok(MoveResponse::committed(candidate)),
            MoveOutcome::NeedsConfirmation(candidates) => Ok(MoveResponse::Ok {
                candidates,
                requires_confirmation: true,
            }),
        })
    }

    /// Commit one candidate from a confirmation-required verdict.
    pub fn submit_choice(&self, id: MatchId, seat: Seat, action: ActionId) -> MoveResponse {
        self.with_game(id, |game| {
            game.submit_choice(seat, action).map(MoveResponse::committed)
        })
    }

    /// Legal finalizations for a staging stack.
    pub fn staging_options(
        &self,
        id: MatchId,
        stack: StackId,
    ) -> Result<Vec<StagingResolution>, EngineError> {
        let entry = self
            .matches
            .get(&id)
            .ok_or_else(|| EngineError::invalid(format!("unknown match {id}")))?;
        let game = entry.lock().unwrap_or_else(|e| e.into_inner());
        game.staging_options(stack)
    }

    /// Finalize a staging stack into a build, capture, or reinforcement.
    pub fn finalize_staging(
        &self,
        id: MatchId,
        seat: Seat,
        stack: StackId,
        resolution: StagingResolution,
    ) -> MoveResponse {
        self.with_game(id, |game| {
            game.finalize_staging(seat, stack, resolution)?;
            Ok(MoveResponse::applied())
        })
    }

    /// Accept a pending construct.
    ///
    /// Stacks accept only when exactly one finalization is legal; otherwise
    /// the caller must pick one via `finalize_staging`.
    pub fn accept_pending(&self, id: MatchId, seat: Seat, pending: PendingRef) -> MoveResponse {
        self.with_game(id, |game| {
            match pending {
                PendingRef::Build(build) => game.accept_extension(seat, build)?,
                PendingRef::Stack(stack) => {
                    let options = game.staging_options(stack)?;
                    match options.as_slice() {
                        [only] => game.finalize_staging(seat, stack, *only)?,
                        [] => {
                            return Err(EngineError::invalid(
                                "stack has no legal finalization",
                            ))
                        }
                        _ => {
                            return Err(EngineError::invalid(
                                "stack has multiple finalizations, pick one explicitly",
                            ))
                        }
                    }
                }
            }
            Ok(MoveResponse::applied())
        })
    }

    /// Cancel a pending construct, restoring every card it holds.
    pub fn cancel_pending(&self, id: MatchId, seat: Seat, pending: PendingRef) -> MoveResponse {
        self.with_game(id, |game| {
            match pending {
                PendingRef::Build(build) => game.cancel_extension(seat, build)?,
                PendingRef::Stack(stack) => game.cancel_staging(seat, stack)?,
            }
            Ok(MoveResponse::applied())
        })
    }

    /// Merge a pending-extended opponent build into the seat's own build.
    pub fn merge_builds(
        &self,
        id: MatchId,
        seat: Seat,
        source: BuildId,
        target: BuildId,
    ) -> MoveResponse {
        self.with_game(id, |game| {
            game.merge_builds(seat, source, target)?;
            Ok(MoveResponse::applied())
        })
    }

    /// Capture both a pending-extended build and the seat's own matching
    /// build with a spare capture card.
    pub fn overtake_builds(
        &self,
        id: MatchId,
        seat: Seat,
        extended: BuildId,
        own: BuildId,
    ) -> MoveResponse {
        self.with_game(id, |game| {
            game.overtake_builds(seat, extended, own)?;
            Ok(MoveResponse::applied())
        })
    }

    /// Run an operation under the match lock, then broadcast if a transition
    /// committed. The lock is released before observers run.
    fn with_game(
        &self,
        id: MatchId,
        op: impl FnOnce(&mut Game) -> Result<MoveResponse, EngineError>,
    ) -> MoveResponse {
        let Some(entry) = self.matches.get(&id) else {
            return EngineError::invalid(format!("unknown match {id}")).into();
        };
        let (response, changed) = {
            let mut game = entry.lock().unwrap_or_else(|e| e.into_inner());
            let before = game.state().version();
            let response = op(&mut game).unwrap_or_else(MoveResponse::from);
            let changed = (game.state().version() != before).then(|| game.snapshot());
            (response, changed)
        };
        drop(entry);
        if let Some(snapshot) = changed {
            self.notify(id, &snapshot);
        }
        response
    }

    fn notify(&self, id: MatchId, snapshot: &StateSnapshot) {
        let observers = self.observers.read().unwrap_or_else(|e| e.into_inner());
        for observer in observers.iter() {
            observer.on_state_changed(id, snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingObserver {
        fired: AtomicUsize,
    }

    impl StateObserver for CountingObserver {
        fn on_state_changed(&self, _match_id: MatchId, _snapshot: &StateSnapshot) {
            self.fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_create_and_remove_match() {
        let host = MatchHost::new();
        let id = host.create_match(7);
        assert_eq!(host.match_count(), 1);
        assert!(host.snapshot(id).is_some());
        assert!(host.remove_match(id));
        assert!(!host.remove_match(id));
        assert!(host.snapshot(id).is_none());
    }

    #[test]
    fn test_match_ids_are_unique() {
        let host = MatchHost::new();
        let a = host.create_match(1);
        let b = host.create_match(1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_observer_fires_on_creation_only() {
        let host = MatchHost::new();
        let observer = Arc::new(CountingObserver {
            fired: AtomicUsize::new(0),
        });
        host.register_observer(observer.clone());

        let id = host.create_match(3);
        assert_eq!(observer.fired.load(Ordering::SeqCst), 1);

        // A rejected proposal commits nothing and must not broadcast.
        let snapshot = host.snapshot(id).unwrap();
        let wrong_seat = snapshot.current.opponent();
        let card = snapshot.hands[wrong_seat][0];
        let response = host.submit_move(
            id,
            wrong_seat,
            &Proposal {
                card,
                source: crate::ledger::CardLocation::Hand(wrong_seat),
                target: crate::rules::TargetHint::EmptyTable,
            },
        );
        assert!(!response.is_ok());
        assert_eq!(observer.fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_match_is_an_error_response() {
        let host = MatchHost::new();
        let response = host.submit_choice(MatchId::new(99), Seat::new(0), ActionId::new(0));
        assert!(matches!(response, MoveResponse::Error { .. }));
    }

    #[test]
    fn test_redacted_snapshot_hides_opponent_hand() {
        let host = MatchHost::new();
        let id = host.create_match(5);
        let seat = Seat::new(0);
        let view = host.snapshot_for(id, seat).unwrap();
        assert!(view.hands[seat.opponent()].is_empty());
        assert_eq!(view.hands[seat].len(), 10);
    }
}
