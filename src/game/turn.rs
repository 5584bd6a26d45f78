//! Turn rotation, redeals, and end-of-match settlement.

use crate::core::{Card, EngineError, Seat};
use crate::ledger::CardLocation;

use super::{GameState, MatchOutcome, HAND_SIZE};

/// Pass the turn, redealing or settling when both hands are empty.
pub(crate) fn advance_turn(state: &mut GameState) -> Result<(), EngineError> {
    state.current = state.current.opponent();

    let hands_empty = Seat::both().all(|seat| state.ledger.hand(seat).is_empty());
    if !hands_empty {
        return Ok(());
    }

    if !state.deck.is_empty() {
        state.round += 1;
        deal_hands(state)?;
        return Ok(());
    }

    settle(state)
}

/// Deal `HAND_SIZE` cards to each seat from the top of the deck.
pub(crate) fn deal_hands(state: &mut GameState) -> Result<(), EngineError> {
    for seat in Seat::both() {
        for _ in 0..HAND_SIZE {
            let card = state
                .deck
                .pop()
                .ok_or_else(|| EngineError::invalid("deck exhausted mid-deal"))?;
            state.ledger.insert(card, CardLocation::Hand(seat))?;
        }
    }
    Ok(())
}

/// End of the last round: sweep the table to the last capturer and score.
fn settle(state: &mut GameState) -> Result<(), EngineError> {
    if let Some(seat) = state.last_capturer {
        let captures = CardLocation::Captures(seat);

        let loose: Vec<Card> = state.ledger.loose().to_vec();
        for card in loose {
            state.ledger.move_card(card, CardLocation::TableLoose, captures)?;
        }

        let build_ids: Vec<_> = state.builds.keys().copied().collect();
        for id in build_ids {
            let loc = CardLocation::TableBuild(id);
            let members: Vec<Card> = state.ledger.cards_at(loc).to_vec();
            for card in members {
                state.ledger.move_card(card, loc, captures)?;
            }
            state.ledger.release_location(loc)?;
            state.builds.remove(&id);
        }

        let stack_ids: Vec<_> = state.stacks.keys().copied().collect();
        for id in stack_ids {
            let loc = CardLocation::TableStagingStack(id);
            let members: Vec<Card> = state.ledger.cards_at(loc).to_vec();
            for card in members {
                state.ledger.move_card(card, loc, captures)?;
            }
            state.ledger.release_location(loc)?;
            state.stacks.remove(&id);
        }
    }

    let first = state.ledger.captures(Seat::new(0)).len();
    let second = state.ledger.captures(Seat::new(1)).len();
    state.outcome = Some(match first.cmp(&second) {
        std::cmp::Ordering::Greater => MatchOutcome::Winner(Seat::new(0)),
        std::cmp::Ordering::Less => MatchOutcome::Winner(Seat::new(1)),
        std::cmp::Ordering::Equal => MatchOutcome::Draw,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GameRng;
    use crate::ledger::Ledger;
    use im::Vector;
    use rustc_hash::FxHashMap;

    fn empty_state() -> GameState {
        GameState {
            ledger: Ledger::new(),
            deck: crate::core::full_deck(),
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
            rng: GameRng::new(0),
        }
    }

    #[test]
    fn test_turn_alternates_while_hands_hold_cards() {
        let mut state = GameState::new(5);
        let first = state.current_player();
        advance_turn(&mut state).unwrap();
        assert_eq!(state.current_player(), first.opponent());
        assert_eq!(state.round(), 1);
    }

    #[test]
    fn test_redeal_when_hands_empty_and_deck_remains() {
        let mut state = empty_state();
        deal_hands(&mut state).unwrap();
        // Drain both hands into captures to simulate a played-out round.
        for seat in Seat::both() {
            let hand: Vec<Card> = state.ledger.hand(seat).to_vec();
            for card in hand {
                state
                    .ledger
                    .move_card(card, CardLocation::Hand(seat), CardLocation::Captures(seat))
                    .unwrap();
            }
        }
        advance_turn(&mut state).unwrap();
        assert_eq!(state.round(), 2);
        assert_eq!(state.ledger.hand(Seat::new(0)).len(), HAND_SIZE);
        assert_eq!(state.ledger.hand(Seat::new(1)).len(), HAND_SIZE);
        assert!(state.outcome().is_none());
    }

    #[test]
    fn test_settlement_sweeps_table_to_last_capturer() {
        let mut state = empty_state();
        let sweeper = Seat::new(1);
        state.last_capturer = Some(sweeper);
        // Deck exhausted; a few cards stranded loose, the rest captured.
        let deck = std::mem::take(&mut state.deck);
        for (i, card) in deck.into_iter().enumerate() {
            let loc = if i < 3 {
                CardLocation::TableLoose
            } else if i % 2 == 0 {
                CardLocation::Captures(Seat::new(0))
            } else {
                CardLocation::Captures(Seat::new(1))
            };
            state.ledger.insert(card, loc).unwrap();
        }
        let before = state.ledger.captures(sweeper).len();

        advance_turn(&mut state).unwrap();
        assert!(state.ledger.loose().is_empty());
        assert_eq!(state.ledger.captures(sweeper).len(), before + 3);
        state.ledger.validate(&state.deck).unwrap();
        // 18 + 3 swept beats 19.
        assert_eq!(state.outcome(), Some(MatchOutcome::Winner(sweeper)));
    }

    #[test]
    fn test_settlement_without_captures_leaves_table() {
        let mut state = empty_state();
        let deck = std::mem::take(&mut state.deck);
        for card in deck {
            state.ledger.insert(card, CardLocation::TableLoose).unwrap();
        }
        advance_turn(&mut state).unwrap();
        assert_eq!(state.ledger.loose().len(), crate::core::DECK_SIZE);
        assert_eq!(state.outcome(), Some(MatchOutcome::Draw));
    }
}
