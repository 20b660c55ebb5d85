//! Side-pot aware pot distribution.
//!
//! Contributions are carved into layers from the smallest contribution level
//! upwards.  Each layer is contested only by the live (non-folded) seats that
//! reached it, so a short all-in can never win more than its own level from
//! any opponent.  A layer reached by a single seat is that seat's uncalled
//! excess and goes straight back to it.

use std::collections::{BTreeMap, BTreeSet};

use crate::poker::HandScore;

/// One seat's stake in the hand being settled.
#[derive(Debug, Clone)]
pub struct Stake {
    pub seat: usize,
    pub contributed: u32,
    /// `None` for a folded seat: its chips play, it cannot win.
    pub score: Option<HandScore>,
}

/// One carved pot layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotLayer {
    pub amount: u32,
    /// Live seats that reached this layer.
    pub eligible: Vec<usize>,
    pub winners: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settlement {
    /// Chips credited per seat, refunds included.
    pub payouts: BTreeMap<usize, u32>,
    /// Uncalled excess returned to its bettor.
    pub refunds: BTreeMap<usize, u32>,
    pub pots: Vec<PotLayer>,
}

impl Settlement {
    pub fn total_paid(&self) -> u64 {
        self.payouts.values().map(|&v| v as u64).sum()
    }

    /// Seats that won at least one contested pot, in seat order.
    pub fn winners(&self) -> Vec<usize> {
        self.pots
            .iter()
            .flat_map(|p| p.winners.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Chips won from contested pots, refunds excluded.
    pub fn won_by(&self, seat: usize) -> u32 {
        let paid = self.payouts.get(&seat).copied().unwrap_or(0);
        paid - self.refunds.get(&seat).copied().unwrap_or(0)
    }
}

/// Order `seats` clockwise starting from the seat after `dealer`.
pub fn clockwise_from(dealer: usize, seats: &[usize]) -> Vec<usize> {
    let mut ordered = seats.to_vec();
    ordered.sort_by_key(|&s| (s <= dealer, s));
    ordered
}

/// Split `amount` evenly; odd chips go one at a time clockwise from the
/// dealer.
fn split_pot(amount: u32, winners: &[usize], dealer: usize, payouts: &mut BTreeMap<usize, u32>) {
    if winners.is_empty() {
        return;
    }
    let n = winners.len() as u32;
    let share = amount / n;
    let odd = (amount % n) as usize;
    for (i, seat) in clockwise_from(dealer, winners).into_iter().enumerate() {
        let extra = u32::from(i < odd);
        *payouts.entry(seat).or_insert(0) += share + extra;
    }
}

fn best_of<'a>(live: impl Iterator<Item = (usize, &'a HandScore)> + Clone) -> Vec<usize> {
    let Some(best) = live.clone().map(|(_, s)| s).max() else {
        return Vec::new();
    };
    live.filter(|(_, s)| *s == best).map(|(seat, _)| seat).collect()
}

struct Entry<'a> {
    seat: Option<usize>,
    remaining: u32,
    score: Option<&'a HandScore>,
}

/// Distribute every chip in `stakes` and `forfeited` among the live seats.
///
/// `forfeited` holds contributions of seats that left mid-hand; those chips
/// stay in play but nobody gets them back.  Chips from a layer no live seat
/// reached are added to the next contested pot (or the last one, if none
/// follows).
pub fn settle_showdown(stakes: &[Stake], forfeited: &[u32], dealer: usize) -> Settlement {
    let mut entries: Vec<Entry<'_>> = stakes
        .iter()
        .map(|s| Entry {
            seat: Some(s.seat),
            remaining: s.contributed,
            score: s.score.as_ref(),
        })
        .chain(forfeited.iter().map(|&amount| Entry {
            seat: None,
            remaining: amount,
            score: None,
        }))
        .collect();

    let mut settlement = Settlement::default();
    let mut orphaned: u32 = 0;

    while let Some(level) = entries
        .iter()
        .filter(|e| e.remaining > 0)
        .map(|e| e.remaining)
        .min()
    {
        let mut contributors = 0u32;
        let mut lone_seat = None;
        let mut live: Vec<(usize, &HandScore)> = Vec::new();
        for e in entries.iter_mut().filter(|e| e.remaining > 0) {
            e.remaining -= level;
            contributors += 1;
            lone_seat = e.seat;
            if let (Some(seat), Some(score)) = (e.seat, e.score) {
                live.push((seat, score));
            }
        }
        let amount = level * contributors;

        if contributors == 1 {
            match lone_seat {
                Some(seat) => {
                    *settlement.payouts.entry(seat).or_insert(0) += amount;
                    *settlement.refunds.entry(seat).or_insert(0) += amount;
                }
                None => orphaned += amount,
            }
            continue;
        }

        if live.is_empty() {
            orphaned += amount;
            continue;
        }

        live.sort_by_key(|(seat, _)| *seat);
        let winners = best_of(live.iter().copied());
        let pot_amount = amount + std::mem::take(&mut orphaned);
        split_pot(pot_amount, &winners, dealer, &mut settlement.payouts);
        settlement.pots.push(PotLayer {
            amount: pot_amount,
            eligible: live.iter().map(|(seat, _)| *seat).collect(),
            winners,
        });
    }

    if orphaned > 0 {
        let winners = match settlement.pots.last() {
            Some(pot) => pot.winners.clone(),
            None => {
                let mut live: Vec<(usize, &HandScore)> = stakes
                    .iter()
                    .filter_map(|s| s.score.as_ref().map(|sc| (s.seat, sc)))
                    .collect();
                live.sort_by_key(|(seat, _)| *seat);
                best_of(live.into_iter())
            }
        };
        split_pot(orphaned, &winners, dealer, &mut settlement.payouts);
        if let Some(pot) = settlement.pots.last_mut() {
            pot.amount += orphaned;
        }
    }

    settlement
}
