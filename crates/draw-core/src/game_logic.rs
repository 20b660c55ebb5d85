//! Room state machine: seats, turn order, betting streets, the draw, and
//! settlement.
//!
//! This module is transport-agnostic: it knows nothing about sockets,
//! channels, or timers.  Every mutation goes through [`Table::apply`],
//! [`Table::start_hand`], [`Table::seat_player`], [`Table::remove_seat`] or
//! [`Table::play_bot`], and the caller is expected to serialise those calls
//! per room.

use std::collections::BTreeMap;

use rand::Rng;
use thiserror::Error;

use crate::bot::{self, BotView};
use crate::poker::{Card, Deck, HAND_SIZE, evaluate_slice};
use crate::protocol::{
    ActionKind, PlayerView, RoomConfig, RoomSnapshot, SeatView, ShowdownSummary, Stage,
    WinnerInfo, card_to_info,
};
use crate::settlement::{Stake, clockwise_from, settle_showdown};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A validated game action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerIntent {
    Check,
    /// Chips to put in on top of the seat's current street bet.  `None`
    /// means the minimum bet.
    Bet { amount: Option<u32> },
    Call,
    Fold,
    /// Card positions in `0..5`.
    Discard { indices: Vec<usize> },
}

impl PlayerIntent {
    pub fn kind(&self) -> ActionKind {
        match self {
            PlayerIntent::Check => ActionKind::Check,
            PlayerIntent::Bet { .. } => ActionKind::Bet,
            PlayerIntent::Call => ActionKind::Call,
            PlayerIntent::Fold => ActionKind::Fold,
            PlayerIntent::Discard { .. } => ActionKind::Discard,
        }
    }
}

/// Why an action was not applied.  The table is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("seat {0} is empty")]
    UnknownSeat(usize),

    #[error("{action} is not allowed for seat {seat} during {stage:?}")]
    NotAllowed {
        seat: usize,
        action: ActionKind,
        stage: Stage,
    },

    #[error("bot action for seat {0} is stale")]
    StaleBot(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeatError {
    #[error("the room is full")]
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("at least 2 players with chips are needed")]
    NotEnoughPlayers,

    #[error("a hand is already in progress")]
    HandInProgress,
}

/// Who sits in a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatKind {
    Human,
    Bot,
}

/// Per-seat ledger.
#[derive(Debug, Clone)]
pub struct Seat {
    pub index: usize,
    pub name: String,
    pub kind: SeatKind,
    pub stack: u32,
    pub hand: Vec<Card>,
    /// Chips committed on the current street.
    pub bet: u32,
    /// Chips committed this hand, antes included.
    pub contributed: u32,
    pub folded: bool,
    pub drew: bool,
    pub all_in: bool,
}

impl Seat {
    fn new(index: usize, name: String, kind: SeatKind, stack: u32) -> Self {
        Self {
            index,
            name,
            kind,
            stack,
            hand: Vec::with_capacity(HAND_SIZE),
            bet: 0,
            contributed: 0,
            folded: false,
            drew: false,
            all_in: false,
        }
    }

    /// Move up to `amount` chips from the stack into the pot.  Returns what
    /// was actually paid.
    fn pay(&mut self, amount: u32) -> u32 {
        let paid = amount.min(self.stack);
        self.stack -= paid;
        self.bet += paid;
        self.contributed += paid;
        if self.stack == 0 {
            self.all_in = true;
        }
        paid
    }

    pub fn is_bot(&self) -> bool {
        self.kind == SeatKind::Bot
    }

    /// Still contesting the pot.
    pub fn is_live(&self) -> bool {
        !self.folded
    }

    /// Still has chips to bet with.
    pub fn can_act(&self) -> bool {
        !self.folded && !self.all_in
    }
}

/// A bot action scheduled for later.  Checked against the table when it
/// fires so that it cannot act on a hand or stage that has moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotTicket {
    pub seat: usize,
    pub hand_number: u64,
    pub stage: Stage,
}

// ---------------------------------------------------------------------------
// Turn sequencing
// ---------------------------------------------------------------------------

/// Next occupied seat after `from`, wrapping around.  `from` itself is
/// returned when it is the only occupant.
pub fn next_occupied(occupied: &[usize], from: usize) -> Option<usize> {
    clockwise_from(from, occupied).first().copied()
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// One room's game.
pub struct Table {
    code: String,
    config: RoomConfig,
    seats: BTreeMap<usize, Seat>,
    deck: Deck,
    stage: Stage,
    /// Every chip committed this hand, current street included.
    pot: u32,
    /// Street bet level everyone has to match.
    current_bet: u32,
    dealer_seat: usize,
    to_act: Option<usize>,
    checks: usize,
    message: String,
    winners: Vec<usize>,
    hand_number: u64,
    /// Contributions of seats that left mid-hand.
    forfeited: Vec<u32>,
    /// Live hands are shown to everyone.
    revealed: bool,
    summary: Option<ShowdownSummary>,
}

impl Table {
    pub fn new(code: impl Into<String>, config: RoomConfig) -> Self {
        Self {
            code: code.into(),
            config,
            seats: BTreeMap::new(),
            deck: Deck::default(),
            stage: Stage::Lobby,
            pot: 0,
            current_bet: 0,
            dealer_seat: 0,
            to_act: None,
            checks: 0,
            message: String::new(),
            winners: Vec::new(),
            hand_number: 0,
            forfeited: Vec::new(),
            revealed: false,
            summary: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn pot(&self) -> u32 {
        self.pot
    }

    pub fn current_bet(&self) -> u32 {
        self.current_bet
    }

    pub fn dealer_seat(&self) -> usize {
        self.dealer_seat
    }

    pub fn to_act(&self) -> Option<usize> {
        self.to_act
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn winners(&self) -> &[usize] {
        &self.winners
    }

    pub fn hand_number(&self) -> u64 {
        self.hand_number
    }

    pub fn seat(&self, index: usize) -> Option<&Seat> {
        self.seats.get(&index)
    }

    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.values()
    }

    pub fn occupied(&self) -> Vec<usize> {
        self.seats.keys().copied().collect()
    }

    pub fn human_count(&self) -> usize {
        self.seats.values().filter(|s| !s.is_bot()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn remaining_cards(&self) -> usize {
        self.deck.remaining()
    }

    /// Chips on the table: every stack plus the pot.
    pub fn total_chips(&self) -> u64 {
        self.seats.values().map(|s| s.stack as u64).sum::<u64>() + self.pot as u64
    }

    /// Settlement result, present only while the table sits at showdown.
    pub fn showdown_summary(&self) -> Option<&ShowdownSummary> {
        match self.stage {
            Stage::Showdown => self.summary.as_ref(),
            _ => None,
        }
    }

    fn live_count(&self) -> usize {
        self.seats.values().filter(|s| s.is_live()).count()
    }

    fn name_of(&self, seat: Option<usize>) -> &str {
        seat.and_then(|s| self.seats.get(&s))
            .map(|s| s.name.as_str())
            .unwrap_or("")
    }

    /// First seat clockwise from `from` satisfying `pred`.
    fn next_seat_where(&self, from: usize, pred: impl Fn(&Seat) -> bool) -> Option<usize> {
        clockwise_from(from, &self.occupied())
            .into_iter()
            .find(|i| self.seats.get(i).is_some_and(&pred))
    }

    pub fn next_live_after(&self, from: usize) -> Option<usize> {
        self.next_seat_where(from, Seat::is_live)
    }

    fn next_actor_after(&self, from: usize) -> Option<usize> {
        self.next_seat_where(from, Seat::can_act)
    }

    fn next_undrawn_after(&self, from: usize) -> Option<usize> {
        self.next_seat_where(from, |s| s.is_live() && !s.drew)
    }

    // -----------------------------------------------------------------------
    // Seating
    // -----------------------------------------------------------------------

    /// Seat a player, at `preferred` if that seat exists and is free,
    /// otherwise at the lowest free seat.  A player seated mid-hand sits out
    /// until the next deal.
    pub fn seat_player(
        &mut self,
        name: String,
        kind: SeatKind,
        preferred: Option<usize>,
    ) -> Result<usize, SeatError> {
        let max = self.config.max_seats;
        let index = preferred
            .filter(|&p| p < max && !self.seats.contains_key(&p))
            .or_else(|| (0..max).find(|i| !self.seats.contains_key(i)))
            .ok_or(SeatError::Full)?;

        let mut seat = Seat::new(index, name, kind, self.config.starting_stack);
        if self.stage.in_hand() {
            seat.folded = true;
        }
        self.message = format!("{} sits down at seat {index}.", seat.name);
        self.seats.insert(index, seat);
        Ok(index)
    }

    /// Remove a seat.  Mid-hand, its chips stay in the pot and the hand
    /// carries on without it, settling at once if a single contender is
    /// left.
    pub fn remove_seat(&mut self, index: usize) -> Option<Seat> {
        let removed = self.seats.remove(&index)?;
        self.message = format!("{} left the room.", removed.name);
        if !self.stage.in_hand() {
            return Some(removed);
        }

        if removed.contributed > 0 {
            self.forfeited.push(removed.contributed);
        }
        if self.live_count() <= 1 {
            self.settle();
            return Some(removed);
        }
        match self.stage {
            Stage::Bet1 | Stage::Bet2 => {
                if self.street_settled() {
                    self.complete_street();
                } else if self.to_act == Some(index) {
                    self.advance_from(index);
                }
            }
            Stage::Draw if self.to_act == Some(index) => match self.next_undrawn_after(index) {
                Some(next) => self.to_act = Some(next),
                None => self.enter_second_street(),
            },
            _ => {}
        }
        Some(removed)
    }

    // -----------------------------------------------------------------------
    // Hand lifecycle
    // -----------------------------------------------------------------------

    /// Shuffle a fresh deck and deal a new hand.
    pub fn start_hand<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), StartError> {
        self.start_hand_with_deck(Deck::shuffled(rng))
    }

    /// Deal a new hand from `deck`.  Each funded seat gets five cards in a
    /// row, starting left of the dealer, then pays the ante.
    pub fn start_hand_with_deck(&mut self, deck: Deck) -> Result<(), StartError> {
        if self.stage.in_hand() {
            return Err(StartError::HandInProgress);
        }
        let funded: Vec<usize> = self
            .seats
            .values()
            .filter(|s| s.stack > 0)
            .map(|s| s.index)
            .collect();
        if funded.len() < 2 {
            return Err(StartError::NotEnoughPlayers);
        }

        if self.config.rotate_dealer && self.hand_number > 0 {
            if let Some(next) = next_occupied(&funded, self.dealer_seat) {
                self.dealer_seat = next;
            }
        }

        self.hand_number += 1;
        self.deck = deck;
        self.stage = Stage::Bet1;
        self.pot = 0;
        self.winners.clear();
        self.forfeited.clear();
        self.revealed = false;
        self.summary = None;

        for seat in self.seats.values_mut() {
            seat.hand.clear();
            seat.bet = 0;
            seat.contributed = 0;
            seat.drew = false;
            seat.all_in = false;
            seat.folded = seat.stack == 0;
        }

        for index in clockwise_from(self.dealer_seat, &funded) {
            for _ in 0..HAND_SIZE {
                let Some(card) = self.deck.draw() else { break };
                if let Some(seat) = self.seats.get_mut(&index) {
                    seat.hand.push(card);
                }
            }
        }

        let ante = self.config.ante;
        for index in &funded {
            if let Some(seat) = self.seats.get_mut(index) {
                self.pot += seat.pay(ante);
            }
        }

        self.reset_street();
        self.to_act = self.next_actor_after(self.dealer_seat);
        self.message = format!(
            "Hand #{} (ante {ante}). {} to act.",
            self.hand_number,
            self.name_of(self.to_act)
        );
        if self.street_settled() {
            self.complete_street();
        }
        Ok(())
    }

    fn reset_street(&mut self) {
        for seat in self.seats.values_mut() {
            seat.bet = 0;
        }
        self.current_bet = 0;
        self.checks = 0;
    }

    /// Nobody needs to act any more on this street.
    fn street_settled(&self) -> bool {
        let actors: Vec<&Seat> = self.seats.values().filter(|s| s.can_act()).collect();
        let matched = self
            .seats
            .values()
            .filter(|s| s.is_live())
            .all(|s| s.all_in || s.bet == self.current_bet);

        match actors.as_slice() {
            [] => true,
            [only] => only.bet >= self.current_bet,
            _ => (self.current_bet > 0 && matched) || self.checks >= actors.len(),
        }
    }

    /// After `from` acted: finish the street or pass the turn.
    fn advance_from(&mut self, from: usize) {
        if self.street_settled() {
            self.complete_street();
            return;
        }
        match self.next_actor_after(from) {
            Some(next) => self.to_act = Some(next),
            None => self.complete_street(),
        }
    }

    fn complete_street(&mut self) {
        self.reset_street();
        match self.stage {
            Stage::Bet1 => self.enter_draw(),
            Stage::Bet2 => self.settle(),
            _ => {}
        }
    }

    fn enter_draw(&mut self) {
        self.stage = Stage::Draw;
        self.to_act = self.next_undrawn_after(self.dealer_seat);
        self.message = format!(
            "Draw: pick up to {} cards to replace.",
            self.config.max_discard
        );
        if self.to_act.is_none() {
            self.enter_second_street();
        }
    }

    fn enter_second_street(&mut self) {
        self.reset_street();
        self.stage = Stage::Bet2;
        self.to_act = self.next_actor_after(self.dealer_seat);
        self.message = format!("Second betting round. {} to act.", self.name_of(self.to_act));
        if self.street_settled() {
            self.complete_street();
        }
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Actions `index` may take right now.
    pub fn legal_actions(&self, index: usize) -> Vec<ActionKind> {
        let Some(seat) = self.seats.get(&index) else {
            return Vec::new();
        };
        if !self.stage.in_hand() || seat.folded {
            return Vec::new();
        }
        if self.stage == Stage::Draw {
            return if seat.drew {
                Vec::new()
            } else {
                vec![ActionKind::Discard]
            };
        }
        if self.seats.len() < 2 || self.to_act != Some(index) {
            return Vec::new();
        }
        if self.current_bet == 0 {
            vec![ActionKind::Check, ActionKind::Bet]
        } else if seat.bet < self.current_bet {
            vec![ActionKind::Call, ActionKind::Fold]
        } else {
            vec![ActionKind::Check, ActionKind::Bet, ActionKind::Fold]
        }
    }

    /// Apply a player's action if it is legal right now.
    pub fn apply(&mut self, index: usize, intent: PlayerIntent) -> Result<(), ActionError> {
        if !self.seats.contains_key(&index) {
            return Err(ActionError::UnknownSeat(index));
        }
        let action = intent.kind();
        if !self.legal_actions(index).contains(&action) {
            return Err(ActionError::NotAllowed {
                seat: index,
                action,
                stage: self.stage,
            });
        }

        match intent {
            PlayerIntent::Check => self.check(index),
            PlayerIntent::Bet { amount } => self.bet(index, amount),
            PlayerIntent::Call => self.call(index),
            PlayerIntent::Fold => self.fold(index),
            PlayerIntent::Discard { indices } => self.discard(index, &indices),
        }
        Ok(())
    }

    fn check(&mut self, index: usize) {
        self.checks += 1;
        self.message = format!("{} checks.", self.name_of(Some(index)));
        self.advance_from(index);
    }

    fn bet(&mut self, index: usize, amount: Option<u32>) {
        let min_bet = self.config.min_bet;
        let wanted = amount.unwrap_or(min_bet).max(min_bet);
        let raising = self.current_bet > 0;
        let Some(seat) = self.seats.get_mut(&index) else {
            return;
        };
        let paid = seat.pay(wanted);
        let (new_bet, all_in) = (seat.bet, seat.all_in);
        self.pot += paid;
        self.current_bet = self.current_bet.max(new_bet);
        self.checks = 0;

        let name = self.name_of(Some(index));
        let mut message = if raising {
            format!("{name} raises to {}.", self.current_bet)
        } else {
            format!("{name} bets {paid}.")
        };
        if all_in {
            message.push_str(" All-in!");
        }
        self.message = message;
        self.advance_from(index);
    }

    fn call(&mut self, index: usize) {
        let current_bet = self.current_bet;
        let Some(seat) = self.seats.get_mut(&index) else {
            return;
        };
        let paid = seat.pay(current_bet.saturating_sub(seat.bet));
        let all_in = seat.all_in;
        self.pot += paid;
        self.message = format!(
            "{} calls{}.",
            self.name_of(Some(index)),
            if all_in { " all-in" } else { "" }
        );
        self.advance_from(index);
    }

    fn fold(&mut self, index: usize) {
        if let Some(seat) = self.seats.get_mut(&index) {
            seat.folded = true;
        }
        self.message = format!("{} folds.", self.name_of(Some(index)));
        if self.live_count() <= 1 {
            self.settle();
        } else {
            self.advance_from(index);
        }
    }

    fn discard(&mut self, index: usize, indices: &[usize]) {
        let mut chosen: Vec<usize> = Vec::with_capacity(HAND_SIZE);
        for &i in indices {
            if i < HAND_SIZE && !chosen.contains(&i) && chosen.len() < self.config.max_discard {
                chosen.push(i);
            }
        }
        chosen.sort_unstable();

        let Some(seat) = self.seats.get_mut(&index) else {
            return;
        };
        let mut replaced = 0;
        for &i in &chosen {
            if i >= seat.hand.len() {
                continue;
            }
            let Some(card) = self.deck.draw() else { break };
            seat.hand[i] = card;
            replaced += 1;
        }
        seat.drew = true;
        self.message = format!("{} draws {replaced}.", seat.name);

        match self.next_undrawn_after(index) {
            Some(next) => self.to_act = Some(next),
            None => self.enter_second_street(),
        }
    }

    // -----------------------------------------------------------------------
    // Settlement
    // -----------------------------------------------------------------------

    fn settle(&mut self) {
        self.stage = Stage::Showdown;
        self.to_act = None;
        self.current_bet = 0;
        self.checks = 0;
        let pot = std::mem::take(&mut self.pot);
        let forfeited = std::mem::take(&mut self.forfeited);
        for seat in self.seats.values_mut() {
            seat.bet = 0;
        }

        let live: Vec<usize> = self
            .seats
            .values()
            .filter(|s| s.is_live() && s.hand.len() == HAND_SIZE)
            .map(|s| s.index)
            .collect();

        match live.as_slice() {
            [] => {
                // a single contender is always settled before this point
                debug_assert_eq!(pot, 0, "pot left with no contender");
                self.winners.clear();
                self.revealed = false;
                self.summary = None;
                self.message = "Everyone folded.".to_string();
            }
            [winner] => {
                let winner = *winner;
                let Some(seat) = self.seats.get_mut(&winner) else {
                    return;
                };
                seat.stack += pot;
                self.winners = vec![winner];
                self.revealed = false;
                self.message = format!("{} wins {pot} (everyone else folded).", seat.name);
                self.summary = Some(ShowdownSummary {
                    winners: vec![WinnerInfo {
                        seat: winner,
                        name: seat.name.clone(),
                        hand: None,
                        amount: pot,
                    }],
                    message: self.message.clone(),
                });
            }
            _ => self.showdown(&forfeited),
        }
    }

    fn showdown(&mut self, forfeited: &[u32]) {
        let stakes: Vec<Stake> = self
            .seats
            .values()
            .filter(|s| s.contributed > 0)
            .map(|s| Stake {
                seat: s.index,
                contributed: s.contributed,
                score: if s.is_live() {
                    evaluate_slice(&s.hand)
                } else {
                    None
                },
            })
            .collect();

        let settlement = settle_showdown(&stakes, forfeited, self.dealer_seat);
        for (&index, &amount) in &settlement.payouts {
            if let Some(seat) = self.seats.get_mut(&index) {
                seat.stack += amount;
            }
        }

        let winners: Vec<WinnerInfo> = settlement
            .winners()
            .into_iter()
            .filter_map(|index| {
                let seat = self.seats.get(&index)?;
                Some(WinnerInfo {
                    seat: index,
                    name: seat.name.clone(),
                    hand: evaluate_slice(&seat.hand).map(|s| s.name().to_string()),
                    amount: settlement.won_by(index),
                })
            })
            .collect();

        let described: Vec<String> = winners
            .iter()
            .map(|w| {
                format!(
                    "{} ({}) +{}",
                    w.name,
                    w.hand.as_deref().unwrap_or("?"),
                    w.amount
                )
            })
            .collect();
        self.message = format!("Showdown: {}.", described.join(", "));
        self.winners = winners.iter().map(|w| w.seat).collect();
        self.revealed = true;
        self.summary = Some(ShowdownSummary {
            winners,
            message: self.message.clone(),
        });
    }

    // -----------------------------------------------------------------------
    // Bots
    // -----------------------------------------------------------------------

    /// Bot seats that owe an action right now.
    pub fn bots_due(&self) -> Vec<BotTicket> {
        let ticket = |seat: usize| BotTicket {
            seat,
            hand_number: self.hand_number,
            stage: self.stage,
        };
        match self.stage {
            Stage::Bet1 | Stage::Bet2 => self
                .to_act
                .and_then(|i| self.seats.get(&i))
                .filter(|s| s.is_bot() && s.can_act())
                .map(|s| vec![ticket(s.index)])
                .unwrap_or_default(),
            Stage::Draw => self
                .seats
                .values()
                .filter(|s| s.is_bot() && s.is_live() && !s.drew)
                .map(|s| ticket(s.index))
                .collect(),
            Stage::Lobby | Stage::Showdown => Vec::new(),
        }
    }

    /// Whether a scheduled bot action still applies to the current state.
    pub fn ticket_is_current(&self, ticket: &BotTicket) -> bool {
        if ticket.hand_number != self.hand_number || ticket.stage != self.stage {
            return false;
        }
        let Some(seat) = self.seats.get(&ticket.seat) else {
            return false;
        };
        if !seat.is_bot() || !seat.is_live() {
            return false;
        }
        match self.stage {
            Stage::Bet1 | Stage::Bet2 => self.to_act == Some(ticket.seat),
            Stage::Draw => !seat.drew,
            Stage::Lobby | Stage::Showdown => false,
        }
    }

    /// Let a bot decide and act, if its ticket is still current.
    pub fn play_bot<R: Rng + ?Sized>(
        &mut self,
        ticket: BotTicket,
        rng: &mut R,
    ) -> Result<PlayerIntent, ActionError> {
        if !self.ticket_is_current(&ticket) {
            return Err(ActionError::StaleBot(ticket.seat));
        }
        let seat = self
            .seats
            .get(&ticket.seat)
            .ok_or(ActionError::UnknownSeat(ticket.seat))?;
        let view = BotView {
            stage: self.stage,
            hand: &seat.hand,
            stack: seat.stack,
            bet: seat.bet,
            current_bet: self.current_bet,
            max_discard: self.config.max_discard,
        };
        let intent = bot::decide(&view, rng);
        self.apply(ticket.seat, intent.clone())?;
        Ok(intent)
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// The room as `viewer` may see it.  Cards are face down unless they
    /// belong to the viewer or were shown at a contested showdown.
    pub fn snapshot_for(&self, viewer: Option<usize>) -> RoomSnapshot {
        let seats = (0..self.config.max_seats)
            .map(|index| match self.seats.get(&index) {
                None => SeatView::Empty { seat: index },
                Some(seat) => {
                    let shown = viewer == Some(index)
                        || (self.revealed && self.stage == Stage::Showdown && seat.is_live());
                    let score = if shown {
                        evaluate_slice(&seat.hand)
                    } else {
                        None
                    };
                    SeatView::Occupied(PlayerView {
                        seat: index,
                        name: seat.name.clone(),
                        stack: seat.stack,
                        bet: seat.bet,
                        contributed: seat.contributed,
                        folded: seat.folded,
                        drew: seat.drew,
                        all_in: seat.all_in,
                        is_bot: seat.is_bot(),
                        cards: seat
                            .hand
                            .iter()
                            .map(|c| shown.then(|| card_to_info(c)))
                            .collect(),
                        hand: score.as_ref().map(|s| s.name().to_string()),
                        score: score.map(|s| s.values().to_vec()),
                    })
                }
            })
            .collect();

        RoomSnapshot {
            room: self.code.clone(),
            stage: self.stage,
            hand_number: self.hand_number,
            dealer_seat: self.dealer_seat,
            to_act_seat: self.to_act,
            pot: self.pot,
            current_bet: self.current_bet,
            seats,
            you_seat: viewer,
            actions: viewer.map(|v| self.legal_actions(v)).unwrap_or_default(),
            message: self.message.clone(),
            winners: self.winners.clone(),
            config: self.config,
        }
    }
}
