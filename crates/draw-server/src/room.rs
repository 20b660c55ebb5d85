//! Room registry and per-room fan-out for the draw server.
//!
//! Each room owns a [`Table`] plus one outbound [`mpsc`] sender per human
//! seat.  Every change is followed by a per-viewer state push (nobody gets
//! another player's cards) and a pass of the bot scheduler.

use std::collections::HashMap;
use std::sync::Arc;

use draw_core::bot::{BotTiming, bot_name};
use draw_core::game_logic::{ActionError, BotTicket, PlayerIntent, SeatError, SeatKind, StartError, Table};
use draw_core::protocol::{RoomConfig, ServerMessage, normalize_name, normalize_room_code};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;

/// Handle to a per-player outbound channel.
///
/// The WebSocket write loop drains this receiver and forwards messages as
/// text frames.
pub type PlayerTx = mpsc::UnboundedSender<ServerMessage>;
pub type PlayerRx = mpsc::UnboundedReceiver<ServerMessage>;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error(transparent)]
    Seat(#[from] SeatError),

    #[error(transparent)]
    Start(#[from] StartError),
}

/// A single room.
pub struct Room {
    pub table: Table,
    /// Outbound senders of human seats.
    senders: HashMap<usize, PlayerTx>,
    /// Pending bot actions, one per bot seat.
    bot_timers: HashMap<usize, (BotTicket, JoinHandle<()>)>,
    bot_timing: BotTiming,
}

impl Room {
    fn new(code: &str, config: RoomConfig, bot_timing: BotTiming) -> Self {
        Self {
            table: Table::new(code, config),
            senders: HashMap::new(),
            bot_timers: HashMap::new(),
            bot_timing,
        }
    }

    pub fn code(&self) -> &str {
        self.table.code()
    }

    /// Send a message to one seat.
    pub fn send_to(&self, seat: usize, msg: ServerMessage) {
        if let Some(tx) = self.senders.get(&seat) {
            // The player may have just disconnected.
            let _ = tx.send(msg);
        }
    }

    /// Push every connected seat its own view of the table.
    pub fn broadcast_state(&self) {
        let summary = self.table.showdown_summary().cloned();
        for (&seat, tx) in &self.senders {
            let msg = ServerMessage::State {
                state: Box::new(self.table.snapshot_for(Some(seat))),
                summary: summary.clone(),
            };
            let _ = tx.send(msg);
        }
        tracing::debug!(
            room = %self.code(),
            stage = ?self.table.stage(),
            viewers = self.senders.len(),
            "Broadcast state"
        );
    }

    fn cancel_bot(&mut self, seat: usize) {
        if let Some((_, handle)) = self.bot_timers.remove(&seat) {
            handle.abort();
        }
    }

    fn cancel_all_bots(&mut self) {
        for (_, (_, handle)) in self.bot_timers.drain() {
            handle.abort();
        }
    }

    /// Broadcast and let any bot that now owes an action take its turn.
    fn publish(&mut self, room_arc: &Arc<Mutex<Room>>) {
        self.broadcast_state();
        schedule_bots(self, room_arc);
    }
}

/// Start a timer for every bot that owes an action and has none pending.
///
/// A bot that still has a timer for an older ticket gets it replaced.
fn schedule_bots(room: &mut Room, room_arc: &Arc<Mutex<Room>>) {
    let timing = room.bot_timing;
    for (queue_pos, ticket) in room.table.bots_due().into_iter().enumerate() {
        if room
            .bot_timers
            .get(&ticket.seat)
            .is_some_and(|(pending, handle)| *pending == ticket && !handle.is_finished())
        {
            continue;
        }
        room.cancel_bot(ticket.seat);

        let delay = timing.think_time(ticket.stage, queue_pos, &mut rand::rng());
        let room_arc_clone = Arc::clone(room_arc);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            run_bot(room_arc_clone, ticket).await;
        });
        room.bot_timers.insert(ticket.seat, (ticket, handle));
    }
}

/// Fire a scheduled bot action.  Stale tickets are dropped silently.
async fn run_bot(room_arc: Arc<Mutex<Room>>, ticket: BotTicket) {
    let mut room = room_arc.lock().await;
    if room
        .bot_timers
        .get(&ticket.seat)
        .is_some_and(|(pending, _)| *pending == ticket)
    {
        room.bot_timers.remove(&ticket.seat);
    }

    let result = room.table.play_bot(ticket, &mut rand::rng());
    match result {
        Ok(intent) => {
            tracing::debug!(room = %room.code(), seat = ticket.seat, ?intent, "Bot acted");
            log_settlement(&room.table);
            room.publish(&room_arc);
        }
        Err(e) => {
            tracing::debug!(room = %room.code(), seat = ticket.seat, "Bot action skipped: {e}");
            schedule_bots(&mut room, &room_arc);
        }
    }
}

fn log_settlement(table: &Table) {
    if let Some(summary) = table.showdown_summary() {
        tracing::info!(
            room = %table.code(),
            hand = table.hand_number(),
            winners = ?table.winners(),
            "{}",
            summary.message
        );
    }
}

/// Deal a new hand on behalf of `seat`.
pub async fn start_hand(room_arc: &Arc<Mutex<Room>>, seat: usize) -> Result<(), RoomError> {
    let mut room = room_arc.lock().await;
    room.table.start_hand(&mut rand::rng())?;
    tracing::info!(
        room = %room.code(),
        hand = room.table.hand_number(),
        requested_by = seat,
        "Hand started"
    );
    log_settlement(&room.table);
    room.publish(room_arc);
    Ok(())
}

/// Seat a bot, preferably at `preferred`.
pub async fn add_bot(room_arc: &Arc<Mutex<Room>>, preferred: Option<usize>) -> Result<usize, RoomError> {
    let mut room = room_arc.lock().await;
    let name = bot_name(&mut rand::rng());
    let seat = room.table.seat_player(name.clone(), SeatKind::Bot, preferred)?;
    tracing::info!(room = %room.code(), seat, name = %name, "Bot seated");
    room.publish(room_arc);
    Ok(seat)
}

/// Apply a human's game action.  Refusals change nothing and are only
/// logged.
pub async fn apply_action(
    room_arc: &Arc<Mutex<Room>>,
    seat: usize,
    intent: PlayerIntent,
) -> Result<(), ActionError> {
    let mut room = room_arc.lock().await;
    if let Err(e) = room.table.apply(seat, intent.clone()) {
        tracing::debug!(room = %room.code(), seat, ?intent, "Action rejected: {e}");
        return Err(e);
    }
    log_settlement(&room.table);
    room.publish(room_arc);
    Ok(())
}

/// A connection's place at a table.
pub struct Membership {
    pub code: String,
    pub seat: usize,
    pub rx: PlayerRx,
    pub room: Arc<Mutex<Room>>,
}

/// Manages all active rooms.
///
/// The outer `RwLock` guards the registry; each room is individually
/// `Mutex`-protected so independent rooms never contend.  When both are
/// needed the registry is always locked first.
pub struct RoomManager {
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
    defaults: RoomConfig,
    bot_timing: BotTiming,
}

impl RoomManager {
    pub fn new(defaults: RoomConfig, bot_timing: BotTiming) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            defaults,
            bot_timing,
        }
    }

    /// Sit a human down in `room`, creating the room if needed.
    pub async fn join(&self, room: &str, name: &str) -> Result<Membership, RoomError> {
        let code = normalize_room_code(room);
        let name = normalize_name(name);

        let mut rooms = self.rooms.write().await;
        let room_arc = match rooms.get(&code) {
            Some(existing) => Arc::clone(existing),
            None => {
                let created = Arc::new(Mutex::new(Room::new(&code, self.defaults, self.bot_timing)));
                rooms.insert(code.clone(), Arc::clone(&created));
                tracing::info!(room = %code, "Room created");
                created
            }
        };

        let mut room = room_arc.lock().await;
        let seat = match room.table.seat_player(name.clone(), SeatKind::Human, None) {
            Ok(seat) => seat,
            Err(e) => {
                if room.table.is_empty() {
                    drop(room);
                    rooms.remove(&code);
                }
                return Err(e.into());
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        room.senders.insert(seat, tx);
        tracing::info!(room = %code, seat, name = %name, "Player joined");
        room.publish(&room_arc);
        drop(room);

        Ok(Membership {
            code,
            seat,
            rx,
            room: room_arc,
        })
    }

    /// Remove a human's seat.  The room goes away with its last human, bots
    /// included.
    pub async fn leave(&self, code: &str, seat: usize) {
        let mut rooms = self.rooms.write().await;
        let Some(room_arc) = rooms.get(code).cloned() else {
            return;
        };

        let mut room = room_arc.lock().await;
        let in_hand = room.table.stage().in_hand();
        room.senders.remove(&seat);
        if let Some(gone) = room.table.remove_seat(seat) {
            tracing::info!(room = %code, seat, name = %gone.name, "Player left");
        }

        if room.table.human_count() == 0 {
            room.cancel_all_bots();
            drop(room);
            rooms.remove(code);
            tracing::info!(room = %code, "Removed empty room");
            return;
        }

        if in_hand {
            log_settlement(&room.table);
        }
        room.publish(&room_arc);
    }

    /// Active room codes, sorted.
    pub async fn list_rooms(&self) -> Vec<String> {
        let rooms = self.rooms.read().await;
        let mut codes: Vec<String> = rooms.keys().cloned().collect();
        codes.sort();
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draw_core::protocol::{SeatView, Stage};
    use std::time::Duration;

    fn manager() -> RoomManager {
        RoomManager::new(
            RoomConfig::default(),
            BotTiming {
                delay_ms: 0,
                jitter_ms: 0,
            },
        )
    }

    /// Latest state message waiting on `rx`, if any.
    fn latest_state(rx: &mut PlayerRx) -> Option<ServerMessage> {
        let mut last = None;
        while let Ok(msg) = rx.try_recv() {
            if matches!(msg, ServerMessage::State { .. }) {
                last = Some(msg);
            }
        }
        last
    }

    #[tokio::test]
    async fn join_creates_room_and_pushes_state() {
        let rm = manager();
        let mut ada = rm.join("abc", "Ada").await.unwrap();
        assert_eq!(ada.code, "ABC");
        assert_eq!(ada.seat, 0);
        assert_eq!(rm.list_rooms().await, vec!["ABC".to_string()]);

        let bob = rm.join("ABC", "Bob").await.unwrap();
        assert_eq!(bob.seat, 1);
        assert!(Arc::ptr_eq(&ada.room, &bob.room));

        let Some(ServerMessage::State { state, summary }) = latest_state(&mut ada.rx) else {
            panic!("expected a state message");
        };
        assert_eq!(state.you_seat, Some(0));
        assert!(summary.is_none());
        assert!(matches!(&state.seats[1], SeatView::Occupied(p) if p.name == "Bob"));
    }

    #[tokio::test]
    async fn rooms_are_independent() {
        let rm = manager();
        let a = rm.join("one", "Ada").await.unwrap();
        let b = rm.join("two", "Bob").await.unwrap();
        assert_eq!(a.seat, 0);
        assert_eq!(b.seat, 0);
        assert!(!Arc::ptr_eq(&a.room, &b.room));
        assert_eq!(rm.list_rooms().await, vec!["ONE".to_string(), "TWO".to_string()]);
    }

    #[tokio::test]
    async fn last_human_leaving_removes_the_room() {
        let rm = manager();
        let ada = rm.join("", "Ada").await.unwrap();
        assert_eq!(ada.code, "TABLE");
        add_bot(&ada.room, None).await.unwrap();
        rm.leave(&ada.code, ada.seat).await;
        assert!(rm.list_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn full_room_refuses_join() {
        let rm = RoomManager::new(
            RoomConfig {
                max_seats: 2,
                ..RoomConfig::default()
            },
            BotTiming::default(),
        );
        rm.join("x", "a").await.unwrap();
        rm.join("x", "b").await.unwrap();
        assert!(matches!(
            rm.join("x", "c").await,
            Err(RoomError::Seat(SeatError::Full))
        ));
    }

    #[tokio::test]
    async fn start_needs_two_players() {
        let rm = manager();
        let ada = rm.join("solo", "Ada").await.unwrap();
        assert!(matches!(
            start_hand(&ada.room, ada.seat).await,
            Err(RoomError::Start(StartError::NotEnoughPlayers))
        ));
    }

    #[tokio::test]
    async fn leaving_mid_hand_settles_for_the_survivor() {
        let rm = manager();
        let mut ada = rm.join("duel", "Ada").await.unwrap();
        let bob = rm.join("duel", "Bob").await.unwrap();
        start_hand(&ada.room, ada.seat).await.unwrap();
        rm.leave(&bob.code, bob.seat).await;

        let Some(ServerMessage::State { state, summary }) = latest_state(&mut ada.rx) else {
            panic!("expected a state message");
        };
        assert_eq!(state.stage, Stage::Showdown);
        assert_eq!(state.winners, vec![0]);
        assert_eq!(summary.map(|s| s.winners[0].amount), Some(20));
    }

    #[tokio::test]
    async fn bots_take_their_turn() {
        let rm = manager();
        let mut ada = rm.join("bots", "Ada").await.unwrap();
        let bot_seat = add_bot(&ada.room, Some(3)).await.unwrap();
        assert_eq!(bot_seat, 3);
        start_hand(&ada.room, ada.seat).await.unwrap();

        // dealer is seat 0, so the bot opens
        let mut acted = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let room = ada.room.lock().await;
            if room.table.to_act() == Some(ada.seat) || room.table.stage() != Stage::Bet1 {
                acted = true;
                break;
            }
        }
        assert!(acted, "bot never acted");
        assert!(latest_state(&mut ada.rx).is_some());
    }

    #[tokio::test]
    async fn rejected_action_changes_nothing() {
        let rm = manager();
        let ada = rm.join("strict", "Ada").await.unwrap();
        let _bob = rm.join("strict", "Bob").await.unwrap();
        start_hand(&ada.room, ada.seat).await.unwrap();

        let before = ada.room.lock().await.table.snapshot_for(None);
        // seat 1 acts first
        assert!(apply_action(&ada.room, ada.seat, PlayerIntent::Check).await.is_err());
        assert_eq!(ada.room.lock().await.table.snapshot_for(None), before);
    }
}
