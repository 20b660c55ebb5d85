//! Heuristic decisions for bot seats.
//!
//! Bots never see anything a human in the same seat could not: their own
//! cards and the public betting state.

use std::time::Duration;

use rand::{Rng, RngExt};

use crate::game_logic::PlayerIntent;
use crate::poker::Card;
use crate::protocol::Stage;

/// Chance of opening the betting while holding at least a pair.
const PAIR_BET_CHANCE: f64 = 0.8;
/// Chance of opening the betting with nothing.
const BLUFF_CHANCE: f64 = 0.25;

/// The slice of the table a bot decides from.
#[derive(Debug, Clone, Copy)]
pub struct BotView<'a> {
    pub stage: Stage,
    pub hand: &'a [Card],
    pub stack: u32,
    pub bet: u32,
    pub current_bet: u32,
    pub max_discard: usize,
}

/// Pick an action that is legal for `view`.
pub fn decide<R: Rng + ?Sized>(view: &BotView<'_>, rng: &mut R) -> PlayerIntent {
    match view.stage {
        Stage::Draw => PlayerIntent::Discard {
            indices: choose_discards(view.hand, view.max_discard),
        },
        _ => choose_bet(view, rng),
    }
}

fn choose_bet<R: Rng + ?Sized>(view: &BotView<'_>, rng: &mut R) -> PlayerIntent {
    if view.current_bet == 0 {
        if view.stack == 0 {
            return PlayerIntent::Check;
        }
        let chance = if has_pair(view.hand) {
            PAIR_BET_CHANCE
        } else {
            BLUFF_CHANCE
        };
        return if rng.random_bool(chance) {
            PlayerIntent::Bet { amount: None }
        } else {
            PlayerIntent::Check
        };
    }

    if view.bet < view.current_bet {
        if view.stack >= view.current_bet - view.bet {
            PlayerIntent::Call
        } else {
            PlayerIntent::Fold
        }
    } else {
        PlayerIntent::Check
    }
}

fn rank_counts(hand: &[Card]) -> [u8; 15] {
    let mut counts = [0u8; 15];
    for card in hand {
        counts[card.value() as usize] += 1;
    }
    counts
}

fn has_pair(hand: &[Card]) -> bool {
    rank_counts(hand).iter().any(|&n| n >= 2)
}

/// Positions of unpaired cards, lowest rank first, at most `max`.  Falls
/// back to the single lowest card when every card is paired up.
pub fn choose_discards(hand: &[Card], max: usize) -> Vec<usize> {
    let counts = rank_counts(hand);
    let mut ordered: Vec<(usize, u8)> = hand.iter().map(|c| c.value()).enumerate().collect();
    ordered.sort_by_key(|&(i, v)| (v, i));

    let singles: Vec<usize> = ordered
        .iter()
        .filter(|&&(_, v)| counts[v as usize] == 1)
        .map(|&(i, _)| i)
        .take(max)
        .collect();
    if !singles.is_empty() || max == 0 {
        return singles;
    }
    ordered.first().map(|&(i, _)| vec![i]).unwrap_or_default()
}

/// Delays applied before a bot acts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotTiming {
    /// Base delay in milliseconds.
    pub delay_ms: u64,
    /// Upper bound of the random extra delay.
    pub jitter_ms: u64,
}

impl Default for BotTiming {
    fn default() -> Self {
        Self {
            delay_ms: 600,
            jitter_ms: 900,
        }
    }
}

impl BotTiming {
    /// How long a bot "thinks" before acting.  Draw-stage bots act together,
    /// so each one is pushed back by its position in the queue.
    pub fn think_time<R: Rng + ?Sized>(&self, stage: Stage, queue_pos: usize, rng: &mut R) -> Duration {
        let jitter = if self.jitter_ms > 0 {
            rng.random_range(0..self.jitter_ms)
        } else {
            0
        };
        let ms = match stage {
            Stage::Draw => self.delay_ms * 2 / 3 + queue_pos as u64 * self.delay_ms + jitter * 2 / 3,
            _ => self.delay_ms + jitter,
        };
        Duration::from_millis(ms)
    }
}

/// A bot display name such as `BOT_K3F9`.
pub fn bot_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let tag: String = (0..4)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();
    format!("BOT_{tag}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poker::{CardNumber as N, CardSuit as S};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn hand(ranks: [N; 5]) -> Vec<Card> {
        let suits = [S::Clubs, S::Diamonds, S::Hearts, S::Spades, S::Clubs];
        ranks.into_iter().zip(suits).map(|(r, s)| Card(r, s)).collect()
    }

    fn betting(hand: &[Card], stack: u32, bet: u32, current_bet: u32) -> BotView<'_> {
        BotView {
            stage: Stage::Bet1,
            hand,
            stack,
            bet,
            current_bet,
            max_discard: 3,
        }
    }

    #[test]
    fn discards_lowest_singletons() {
        let cards = hand([N::King, N::Two, N::Two, N::Nine, N::Five]);
        assert_eq!(choose_discards(&cards, 3), vec![4, 3, 0]);
        assert_eq!(choose_discards(&cards, 2), vec![4, 3]);
    }

    #[test]
    fn paired_up_hand_drops_lowest_card() {
        let cards = hand([N::Ten, N::Four, N::Ten, N::Four, N::Four]);
        assert_eq!(choose_discards(&cards, 3), vec![1]);
        assert!(choose_discards(&cards, 0).is_empty());
    }

    #[test]
    fn facing_a_bet_calls_or_folds() {
        let mut rng = StdRng::seed_from_u64(0);
        let cards = hand([N::Ace, N::King, N::Nine, N::Five, N::Three]);
        assert_eq!(decide(&betting(&cards, 100, 0, 20), &mut rng), PlayerIntent::Call);
        assert_eq!(decide(&betting(&cards, 10, 0, 20), &mut rng), PlayerIntent::Fold);
        assert_eq!(decide(&betting(&cards, 10, 20, 20), &mut rng), PlayerIntent::Check);
    }

    #[test]
    fn broke_bot_checks() {
        let mut rng = StdRng::seed_from_u64(0);
        let cards = hand([N::Ace, N::Ace, N::Nine, N::Five, N::Three]);
        for _ in 0..20 {
            assert_eq!(decide(&betting(&cards, 0, 0, 0), &mut rng), PlayerIntent::Check);
        }
    }

    #[test]
    fn pairs_open_more_often_than_air() {
        let mut rng = StdRng::seed_from_u64(7);
        let pair = hand([N::Ace, N::Ace, N::Nine, N::Five, N::Three]);
        let air = hand([N::Ace, N::King, N::Nine, N::Five, N::Three]);
        let count = |cards: &[Card], rng: &mut StdRng| {
            (0..1000)
                .filter(|_| decide(&betting(cards, 500, 0, 0), rng) != PlayerIntent::Check)
                .count()
        };
        let with_pair = count(&pair, &mut rng);
        let without = count(&air, &mut rng);
        assert!(with_pair > 700, "pair opened {with_pair} times");
        assert!((150..350).contains(&without), "air opened {without} times");
    }

    #[test]
    fn draw_stage_discards() {
        let mut rng = StdRng::seed_from_u64(1);
        let cards = hand([N::Queen, N::Queen, N::Jack, N::Two, N::Seven]);
        let view = BotView {
            stage: Stage::Draw,
            ..betting(&cards, 100, 0, 0)
        };
        assert_eq!(
            decide(&view, &mut rng),
            PlayerIntent::Discard {
                indices: vec![3, 4, 2]
            }
        );
    }

    #[test]
    fn draw_bots_are_staggered() {
        let mut rng = StdRng::seed_from_u64(2);
        let timing = BotTiming {
            delay_ms: 600,
            jitter_ms: 0,
        };
        assert_eq!(timing.think_time(Stage::Bet1, 0, &mut rng), Duration::from_millis(600));
        assert_eq!(timing.think_time(Stage::Draw, 0, &mut rng), Duration::from_millis(400));
        assert_eq!(timing.think_time(Stage::Draw, 2, &mut rng), Duration::from_millis(1600));

        let timing = BotTiming::default();
        for _ in 0..50 {
            let d = timing.think_time(Stage::Bet2, 0, &mut rng);
            assert!(d >= Duration::from_millis(600) && d < Duration::from_millis(1500));
        }
    }

    #[test]
    fn bot_names_have_a_short_tag() {
        let mut rng = StdRng::seed_from_u64(3);
        let name = bot_name(&mut rng);
        assert!(name.starts_with("BOT_"));
        assert_eq!(name.len(), 8);
    }
}
