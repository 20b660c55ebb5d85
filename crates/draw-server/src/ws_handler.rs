//! WebSocket handler for the draw server.
//!
//! Each WebSocket connection follows this lifecycle:
//!
//! 1. The server greets with `welcome`; the client sends `join`.
//! 2. On success the connection is bound to a room and a seat.
//! 3. Subsequent `ClientMessage`s are applied to that room's table.
//! 4. On disconnect the seat is vacated and the room may be removed.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use draw_core::protocol::{ClientMessage, ServerMessage};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;

use crate::room::{self, Membership, Room, RoomManager};

type WsSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Drive a single WebSocket connection.
pub async fn handle_socket(socket: WebSocket, room_manager: Arc<RoomManager>) {
    let (ws_sink, mut ws_stream) = socket.split();
    let ws_sink: WsSink = Arc::new(Mutex::new(ws_sink));

    send_one(
        &ws_sink,
        &ServerMessage::Welcome {
            message: "Welcome to five-card draw. Join a room to sit down.".to_string(),
        },
    )
    .await;

    // ── Lobby: wait for a successful join ───────────────────────────────
    let membership: Membership = loop {
        let frame = ws_stream.next().await;
        match frame {
            Some(Ok(Message::Text(text))) => {
                let msg: ClientMessage = match serde_json::from_str(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::debug!("Ignoring malformed message: {e}");
                        continue;
                    }
                };

                match msg {
                    ClientMessage::Join { room, name } => match room_manager.join(&room, &name).await {
                        Ok(membership) => break membership,
                        Err(e) => {
                            send_one(&ws_sink, &ServerMessage::Error { message: e.to_string() }).await;
                        }
                    },
                    ClientMessage::Ping => send_one(&ws_sink, &ServerMessage::Pong).await,
                    _ => {
                        send_one(
                            &ws_sink,
                            &ServerMessage::Error {
                                message: "Join a room first".to_string(),
                            },
                        )
                        .await;
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
            _ => continue,
        }
    };

    // ── Game loop ────────────────────────────────────────────────────────
    let Membership {
        code,
        seat,
        mut rx,
        room: room_arc,
    } = membership;

    // Drain the seat's channel into the socket.
    let write_sink = Arc::clone(&ws_sink);
    let write_handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(_) => continue,
            };
            let mut sink = write_sink.lock().await;
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        match ws_stream.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => process_client_message(msg, seat, &room_arc).await,
                Err(e) => tracing::debug!(room = %code, seat, "Ignoring malformed message: {e}"),
            },
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
            _ => continue,
        }
    }

    // ── Cleanup ──────────────────────────────────────────────────────────
    write_handle.abort();
    room_manager.leave(&code, seat).await;
    tracing::info!(room = %code, seat, "Connection closed");
}

/// Send one message straight to the socket (used before the seat's channel
/// exists).
async fn send_one(sink: &WsSink, msg: &ServerMessage) {
    if let Ok(json) = serde_json::to_string(msg) {
        let mut s = sink.lock().await;
        let _ = s.send(Message::Text(json.into())).await;
    }
}

/// Handle one message from a seated connection.
async fn process_client_message(msg: ClientMessage, seat: usize, room_arc: &Arc<Mutex<Room>>) {
    if let Some(intent) = msg.intent() {
        // refusals are logged inside and never broadcast
        let _ = room::apply_action(room_arc, seat, intent).await;
        return;
    }

    match msg {
        ClientMessage::Join { .. } => {
            let room = room_arc.lock().await;
            room.send_to(
                seat,
                ServerMessage::Error {
                    message: "Already in a room".to_string(),
                },
            );
        }
        ClientMessage::Start => {
            if let Err(e) = room::start_hand(room_arc, seat).await {
                tracing::debug!(seat, "Start refused: {e}");
                let room = room_arc.lock().await;
                room.send_to(seat, ServerMessage::Error { message: e.to_string() });
            }
        }
        ClientMessage::AddBot { seat: preferred } => {
            if let Err(e) = room::add_bot(room_arc, preferred).await {
                let room = room_arc.lock().await;
                room.send_to(seat, ServerMessage::Error { message: e.to_string() });
            }
        }
        ClientMessage::Ping => {
            let room = room_arc.lock().await;
            room.send_to(seat, ServerMessage::Pong);
        }
        ClientMessage::Check
        | ClientMessage::Bet { .. }
        | ClientMessage::Call
        | ClientMessage::Fold
        | ClientMessage::Discard { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draw_core::bot::BotTiming;
    use draw_core::protocol::{RoomConfig, Stage};

    use crate::room::PlayerRx;

    fn manager(max_seats: usize) -> RoomManager {
        RoomManager::new(
            RoomConfig {
                max_seats,
                ..RoomConfig::default()
            },
            BotTiming {
                delay_ms: 0,
                jitter_ms: 0,
            },
        )
    }

    /// Everything queued on `rx` other than state pushes.
    fn replies(rx: &mut PlayerRx) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if !matches!(msg, ServerMessage::State { .. }) {
                out.push(msg);
            }
        }
        out
    }

    #[tokio::test]
    async fn seated_join_and_ping_get_direct_replies() {
        let rm = manager(6);
        let mut ada = rm.join("route", "Ada").await.unwrap();
        replies(&mut ada.rx);

        let join = ClientMessage::Join {
            room: "OTHER".into(),
            name: "Ada".into(),
        };
        process_client_message(join, ada.seat, &ada.room).await;
        assert!(matches!(
            replies(&mut ada.rx).as_slice(),
            [ServerMessage::Error { message }] if message == "Already in a room"
        ));
        assert_eq!(rm.list_rooms().await, vec!["ROUTE".to_string()]);

        process_client_message(ClientMessage::Ping, ada.seat, &ada.room).await;
        assert!(matches!(replies(&mut ada.rx).as_slice(), [ServerMessage::Pong]));
    }

    #[tokio::test]
    async fn refused_start_and_add_bot_report_an_error() {
        let rm = manager(2);
        let mut ada = rm.join("route", "Ada").await.unwrap();
        replies(&mut ada.rx);

        process_client_message(ClientMessage::Start, ada.seat, &ada.room).await;
        assert!(matches!(
            replies(&mut ada.rx).as_slice(),
            [ServerMessage::Error { message }] if message.contains("at least 2 players")
        ));

        process_client_message(ClientMessage::AddBot { seat: None }, ada.seat, &ada.room).await;
        assert!(replies(&mut ada.rx).is_empty());
        assert!(ada.room.lock().await.table.seat(1).is_some_and(|s| s.is_bot()));

        process_client_message(ClientMessage::AddBot { seat: None }, ada.seat, &ada.room).await;
        assert!(matches!(replies(&mut ada.rx).as_slice(), [ServerMessage::Error { .. }]));
    }

    #[tokio::test]
    async fn illegal_game_actions_are_dropped_silently() {
        let rm = manager(6);
        let mut ada = rm.join("route", "Ada").await.unwrap();
        replies(&mut ada.rx);

        process_client_message(ClientMessage::Call, ada.seat, &ada.room).await;
        assert!(replies(&mut ada.rx).is_empty());
        assert_eq!(ada.room.lock().await.table.stage(), Stage::Lobby);
    }
}
