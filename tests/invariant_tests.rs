//! Whole-match properties: the full-deck invariant survives arbitrary play,
//! seeded matches are deterministic, and snapshots round-trip.

use cassino_engine::core::{Card, Seat, DECK_SIZE};
use cassino_engine::game::{Game, MoveOutcome, StateSnapshot};
use cassino_engine::ledger::CardLocation;
use cassino_engine::rules::{Proposal, TargetHint};
use proptest::prelude::*;

/// Find and commit one turn-advancing move for the current player.
///
/// Commits that keep the turn (staging stacks, tentative extensions) are
/// immediately cancelled so the search always terminates. Returns false when
/// no proposal advances the turn.
fn advance_once(game: &mut Game) -> bool {
    let seat = game.state().current_player();
    let hand: Vec<Card> = game.state().ledger().hand(seat).to_vec();
    let loose: Vec<Card> = game.state().ledger().loose().to_vec();
    let builds: Vec<_> = game.state().builds().map(|b| b.id).collect();

    for card in hand {
        let mut targets: Vec<TargetHint> =
            loose.iter().map(|&c| TargetHint::LooseCard(c)).collect();
        targets.extend(builds.iter().map(|&b| TargetHint::Build(b)));
        targets.push(TargetHint::EmptyTable);

        for target in targets {
            let proposal = Proposal {
                card,
                source: CardLocation::Hand(seat),
                target,
            };
            let committed = match game.submit_move(seat, &proposal) {
                Ok(MoveOutcome::Committed(_)) => true,
                Ok(MoveOutcome::NeedsConfirmation(candidates)) => candidates
                    .iter()
                    .any(|c| game.submit_choice(seat, c.id).is_ok()),
                Err(_) => false,
            };
            if !committed {
                continue;
            }
            if game.state().current_player() != seat || game.state().outcome().is_some() {
                return true;
            }
            // The commit kept the turn: unwind it and keep looking.
            let stacks: Vec<_> = game.state().stacks().map(|s| s.id).collect();
            for id in stacks {
                game.cancel_staging(seat, id).unwrap();
            }
            let pending: Vec<_> = game
                .state()
                .builds()
                .filter(|b| b.is_pending())
                .map(|b| b.id)
                .collect();
            for id in pending {
                game.cancel_extension(seat, id).unwrap();
            }
        }
    }
    false
}

fn playout(seed: u64, max_moves: usize) -> Game {
    let mut game = Game::new(seed);
    for _ in 0..max_moves {
        if game.state().outcome().is_some() || !advance_once(&mut game) {
            break;
        }
    }
    game
}

fn total_cards(game: &Game) -> usize {
    game.state().ledger().total_cards() + game.state().deck_remaining()
}

#[test]
fn test_seeded_matches_play_to_completion() {
    for seed in 0..20u64 {
        let game = playout(seed, 300);
        let state = game.state();
        assert!(
            state.outcome().is_some(),
            "seed {seed} stalled at round {} with {} history entries",
            state.round(),
            state.history().len()
        );
        assert_eq!(total_cards(&game), DECK_SIZE, "seed {seed} lost cards");
        assert!(state.ledger().hand(Seat::new(0)).is_empty());
        assert!(state.ledger().hand(Seat::new(1)).is_empty());
        assert_eq!(state.deck_remaining(), 0);

        // Everything ends in capture piles or stranded loose on the table.
        let accounted = state.ledger().captures(Seat::new(0)).len()
            + state.ledger().captures(Seat::new(1)).len()
            + state.ledger().loose().len();
        assert_eq!(accounted, DECK_SIZE, "seed {seed}");
    }
}

#[test]
fn test_same_seed_same_script_same_snapshot() {
    let a = playout(99, 300);
    let b = playout(99, 300);
    assert_eq!(a.snapshot(), b.snapshot());
}

#[test]
fn test_history_sequences_are_monotonic() {
    let game = playout(7, 300);
    let sequences: Vec<u64> = game.state().history().iter().map(|r| r.sequence).collect();
    assert!(!sequences.is_empty());
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn random_playouts_conserve_the_deck(seed in any::<u64>()) {
        let game = playout(seed, 120);
        prop_assert_eq!(total_cards(&game), DECK_SIZE);
    }

    #[test]
    fn snapshots_round_trip_mid_match(seed in any::<u64>(), moves in 0usize..40) {
        let game = playout(seed, moves);
        let snapshot = game.snapshot();
        let bytes = snapshot.encode().unwrap();
        prop_assert_eq!(&StateSnapshot::decode(&bytes).unwrap(), &snapshot);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: StateSnapshot = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&back, &snapshot);
    }
}
