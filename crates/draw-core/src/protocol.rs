use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::game_logic::PlayerIntent;
use crate::poker::{Card, CardSuit, HAND_SIZE};

/// Serializable card representation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardInfo {
    pub rank: u8, // 2-14 (14 = Ace)
    pub suit: u8, // 0-3 (Clubs, Diamonds, Hearts, Spades)
}

impl CardInfo {
    pub fn rank_str(&self) -> &'static str {
        match self.rank {
            2 => "2",
            3 => "3",
            4 => "4",
            5 => "5",
            6 => "6",
            7 => "7",
            8 => "8",
            9 => "9",
            10 => "10",
            11 => "J",
            12 => "Q",
            13 => "K",
            14 => "A",
            _ => "?",
        }
    }

    pub fn suit_str(&self) -> &'static str {
        CardSuit::ALL
            .get(self.suit as usize)
            .map(|s| s.symbol())
            .unwrap_or("?")
    }
}

impl fmt::Display for CardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank_str(), self.suit_str())
    }
}

pub fn card_to_info(card: &Card) -> CardInfo {
    CardInfo {
        rank: card.value(),
        suit: card.suit() as u8,
    }
}

/// Phase of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Lobby,
    Bet1,
    Draw,
    Bet2,
    Showdown,
}

impl Stage {
    pub fn is_betting(self) -> bool {
        matches!(self, Stage::Bet1 | Stage::Bet2)
    }

    /// A hand is running (cards dealt, not yet settled).
    pub fn in_hand(self) -> bool {
        matches!(self, Stage::Bet1 | Stage::Draw | Stage::Bet2)
    }
}

/// An action kind a seat may be offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Check,
    Bet,
    Call,
    Fold,
    Discard,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::Check => "Check",
            ActionKind::Bet => "Bet",
            ActionKind::Call => "Call",
            ActionKind::Fold => "Fold",
            ActionKind::Discard => "Discard",
        };
        f.write_str(label)
    }
}

/// Per-room table settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub max_seats: usize,
    pub ante: u32,
    pub min_bet: u32,
    pub max_discard: usize,
    pub starting_stack: u32,
    /// Move the dealer button to the next occupied seat before each hand
    /// after the first.
    pub rotate_dealer: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_seats: 6,
            ante: 10,
            min_bet: 20,
            max_discard: 3,
            starting_stack: 1000,
            rotate_dealer: false,
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Sit down in a room, creating it if needed.
    Join {
        #[serde(default, deserialize_with = "lenient_text")]
        room: String,
        #[serde(default, deserialize_with = "lenient_text")]
        name: String,
    },

    /// Deal a new hand.
    Start,

    Check,

    /// Bet or raise.  Anything that does not read as a number falls back to
    /// the minimum bet.
    Bet {
        #[serde(default)]
        amount: Option<Value>,
    },

    Call,

    Fold,

    /// Replace the cards at the given positions.
    Discard {
        #[serde(default, deserialize_with = "lenient_list")]
        indices: Vec<Value>,
    },

    /// Seat a bot, preferably at `seat`.  A hint that is not a whole
    /// non-negative number is ignored.
    AddBot {
        #[serde(default, deserialize_with = "lenient_seat")]
        seat: Option<usize>,
    },

    /// Ping to check connection
    Ping,
}

impl ClientMessage {
    /// The game action carried by this message, with its payload coerced into
    /// range.  `None` for non-game messages.
    pub fn intent(&self) -> Option<PlayerIntent> {
        match self {
            ClientMessage::Check => Some(PlayerIntent::Check),
            ClientMessage::Call => Some(PlayerIntent::Call),
            ClientMessage::Fold => Some(PlayerIntent::Fold),
            ClientMessage::Bet { amount } => Some(PlayerIntent::Bet {
                amount: amount.as_ref().and_then(coerce_amount),
            }),
            ClientMessage::Discard { indices } => Some(PlayerIntent::Discard {
                indices: coerce_indices(indices),
            }),
            _ => None,
        }
    }
}

/// Scalars as text; anything else reads as empty.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Value>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(values) => values,
        _ => Vec::new(),
    })
}

fn lenient_seat<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_u64().and_then(|n| usize::try_from(n).ok()))
}

/// Read a bet amount from a loosely-typed value, flooring fractions.
///
/// Non-numeric, negative, zero, or non-finite input yields `None`.
pub fn coerce_amount(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() || n < 1.0 {
        return None;
    }
    Some(n.floor().min(u32::MAX as f64) as u32)
}

/// Card positions from a loosely-typed list: integers (fractions truncated)
/// inside `0..HAND_SIZE`, first occurrence wins.
pub fn coerce_indices(values: &[Value]) -> Vec<usize> {
    let mut out: Vec<usize> = Vec::with_capacity(HAND_SIZE);
    for v in values {
        let Some(n) = v.as_i64().or_else(|| v.as_f64().map(|f| f.trunc() as i64)) else {
            continue;
        };
        if (0..HAND_SIZE as i64).contains(&n) && !out.contains(&(n as usize)) {
            out.push(n as usize);
        }
    }
    out
}

/// What one viewer sees of an occupied seat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerView {
    pub seat: usize,
    pub name: String,
    pub stack: u32,
    pub bet: u32,
    pub contributed: u32,
    pub folded: bool,
    pub drew: bool,
    pub all_in: bool,
    pub is_bot: bool,
    /// `None` entries are face-down cards.
    pub cards: Vec<Option<CardInfo>>,
    /// Category name, only when the cards are visible to this viewer.
    pub hand: Option<String>,
    pub score: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeatView {
    Empty { seat: usize },
    Occupied(PlayerView),
}

/// Full room state as seen from one seat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSnapshot {
    pub room: String,
    pub stage: Stage,
    pub hand_number: u64,
    pub dealer_seat: usize,
    pub to_act_seat: Option<usize>,
    pub pot: u32,
    pub current_bet: u32,
    pub seats: Vec<SeatView>,
    pub you_seat: Option<usize>,
    pub actions: Vec<ActionKind>,
    pub message: String,
    pub winners: Vec<usize>,
    pub config: RoomConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WinnerInfo {
    pub seat: usize,
    pub name: String,
    /// Category name; `None` when the pot was won uncontested.
    pub hand: Option<String>,
    pub amount: u32,
}

/// Result of the settlement that just happened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowdownSummary {
    pub winners: Vec<WinnerInfo>,
    pub message: String,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Welcome message on connection
    Welcome { message: String },

    /// Room state after a change.
    State {
        state: Box<RoomSnapshot>,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<ShowdownSummary>,
    },

    /// Pong response to ping
    Pong,

    /// Error message
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Room code / name normalisation
// ---------------------------------------------------------------------------

/// Room code used when the client sends none.
pub const DEFAULT_ROOM_CODE: &str = "TABLE";
const ROOM_CODE_LEN: usize = 8;
const NAME_LEN: usize = 16;

/// Normalise a requested room code: alphanumeric, upper-case, at most 8
/// characters, falling back to [`DEFAULT_ROOM_CODE`].
pub fn normalize_room_code(raw: &str) -> String {
    let code: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(ROOM_CODE_LEN)
        .collect::<String>()
        .to_ascii_uppercase();
    if code.is_empty() {
        DEFAULT_ROOM_CODE.to_string()
    } else {
        code
    }
}

/// Trim a player name to 16 characters, falling back to `Player`.
pub fn normalize_name(raw: &str) -> String {
    let name: String = raw.trim().chars().take(NAME_LEN).collect();
    if name.is_empty() {
        "Player".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn room_codes_are_normalised() {
        assert_eq!(normalize_room_code("abc123"), "ABC123");
        assert_eq!(normalize_room_code("room-1"), "ROOM1");
        assert_eq!(normalize_room_code("averyverylongcode"), "AVERYVER");
        assert_eq!(normalize_room_code(""), "TABLE");
        assert_eq!(normalize_room_code("!!!"), "TABLE");
    }

    #[test]
    fn names_are_trimmed() {
        assert_eq!(normalize_name("  Ada "), "Ada");
        assert_eq!(normalize_name(""), "Player");
        assert_eq!(normalize_name("abcdefghijklmnopqrstuvwxyz").len(), 16);
    }

    #[test]
    fn amounts_are_coerced() {
        assert_eq!(coerce_amount(&json!(45)), Some(45));
        assert_eq!(coerce_amount(&json!(45.9)), Some(45));
        assert_eq!(coerce_amount(&json!("60")), Some(60));
        assert_eq!(coerce_amount(&json!("lots")), None);
        assert_eq!(coerce_amount(&json!(-5)), None);
        assert_eq!(coerce_amount(&json!(0)), None);
        assert_eq!(coerce_amount(&json!(null)), None);
    }

    #[test]
    fn indices_are_deduplicated_and_bounded() {
        let raw = vec![json!(2), json!(2), json!(7), json!(-1), json!(4.8), json!("x"), json!(0)];
        assert_eq!(coerce_indices(&raw), vec![2, 4, 0]);
    }

    #[test]
    fn client_messages_parse() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join","room":"abc","name":"Ada"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Join { ref room, ref name } if room == "abc" && name == "Ada"));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"bet","amount":"oops"}"#).unwrap();
        assert_eq!(msg.intent(), Some(PlayerIntent::Bet { amount: None }));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"discard","indices":[4,1,9]}"#).unwrap();
        assert_eq!(
            msg.intent(),
            Some(PlayerIntent::Discard {
                indices: vec![4, 1]
            })
        );

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"add_bot"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::AddBot { seat: None }));
        assert_eq!(msg.intent(), None);
    }

    #[test]
    fn malformed_payloads_are_coerced() {
        let parse = |raw: &str| serde_json::from_str::<ClientMessage>(raw).unwrap();

        for raw in [
            r#"{"type":"add_bot","seat":-1}"#,
            r#"{"type":"add_bot","seat":"2"}"#,
            r#"{"type":"add_bot","seat":2.5}"#,
            r#"{"type":"add_bot","seat":null}"#,
        ] {
            assert!(matches!(parse(raw), ClientMessage::AddBot { seat: None }), "{raw}");
        }
        assert!(matches!(
            parse(r#"{"type":"add_bot","seat":3}"#),
            ClientMessage::AddBot { seat: Some(3) }
        ));

        for raw in [
            r#"{"type":"discard","indices":null}"#,
            r#"{"type":"discard","indices":"0,1"}"#,
            r#"{"type":"discard"}"#,
        ] {
            assert_eq!(
                parse(raw).intent(),
                Some(PlayerIntent::Discard { indices: vec![] }),
                "{raw}"
            );
        }

        let msg = parse(r#"{"type":"join","room":123,"name":null}"#);
        assert!(matches!(msg, ClientMessage::Join { ref room, ref name } if room == "123" && name.is_empty()));
        let msg = parse(r#"{"type":"join","room":{"a":1},"name":["x"]}"#);
        assert!(matches!(msg, ClientMessage::Join { ref room, ref name } if room.is_empty() && name.is_empty()));
    }

    #[test]
    fn server_state_omits_missing_summary() {
        let snapshot = RoomSnapshot {
            room: "TABLE".into(),
            stage: Stage::Lobby,
            hand_number: 0,
            dealer_seat: 0,
            to_act_seat: None,
            pot: 0,
            current_bet: 0,
            seats: vec![SeatView::Empty { seat: 0 }],
            you_seat: Some(0),
            actions: vec![],
            message: String::new(),
            winners: vec![],
            config: RoomConfig::default(),
        };
        let json = serde_json::to_value(ServerMessage::State {
            state: Box::new(snapshot),
            summary: None,
        })
        .unwrap();
        assert_eq!(json["type"], "state");
        assert_eq!(json["state"]["stage"], "lobby");
        assert_eq!(json["state"]["seats"][0]["kind"], "empty");
        assert!(json.get("summary").is_none());
    }

    #[test]
    fn card_info_display() {
        let info = CardInfo { rank: 10, suit: 1 };
        assert_eq!(info.to_string(), "10♦");
    }
}
