use super::command::ActionKind;
use super::player::Player;
use super::player::PlayerStatus;
use pkr_cards::Card;
use pkr_core::Chips;
use pkr_core::Position;
use std::sync::Arc;

/// Per-seat view included in snapshots and hand starts.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SeatSnapshot {
    pub player_id: String,
    pub seat_index: i32,
    pub chips: Chips,
    pub current_bet: Chips,
    pub status: PlayerStatus,
    pub has_acted: bool,
}

impl From<&Player> for SeatSnapshot {
    fn from(player: &Player) -> Self {
        Self {
            player_id: player.id.clone(),
            seat_index: player.seat_index,
            chips: player.chips,
            current_bet: player.current_bet,
            status: player.status,
            has_acted: player.has_acted,
        }
    }
}

/// A posted blind.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BlindPost {
    pub player_id: String,
    pub kind: &'static str,
    pub amount: Chips,
}

/// Winners of a single pot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PotPayout {
    pub amount: Chips,
    pub winners: Vec<ChipAward>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ChipAward {
    pub player_id: String,
    pub amount: Chips,
}

/// Event payloads broadcast by a table, in wire spelling.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    HandStart {
        dealer: Position,
        players: Vec<SeatSnapshot>,
    },
    HoleCards {
        cards: Vec<Card>,
    },
    BlindsPosted {
        posts: Vec<BlindPost>,
    },
    YourTurn {
        /// Epoch seconds by which the player must act.
        deadline: i64,
    },
    PlayerAction {
        player_id: String,
        action: ActionKind,
        amount: Chips,
        pot_total: Chips,
    },
    CommunityCards {
        street: &'static str,
        cards: Vec<Card>,
        board: Vec<Card>,
    },
    ShowdownResult {
        pots: Vec<PotPayout>,
    },
    WinByFold {
        player_id: String,
        amount: Chips,
    },
    HandEnd {
        players: Vec<ChipAward>,
    },
    TableState {
        players: Vec<SeatSnapshot>,
        community_cards: Vec<Card>,
        dealer_pos: Position,
        current_pos: Position,
        min_bet: Chips,
        pot_total: Chips,
    },
}

/// An event emitted by a table actor.
///
/// `target` set means targeted 1:1 delivery (hole cards, your-turn);
/// absent means broadcast to every observer of the table.
#[derive(Debug, Clone)]
pub struct TableEvent {
    pub table_id: String,
    pub target: Option<String>,
    pub payload: EventPayload,
}

impl TableEvent {
    pub fn broadcast(table_id: &str, payload: EventPayload) -> Self {
        Self {
            table_id: table_id.to_string(),
            target: None,
            payload,
        }
    }
    pub fn targeted(table_id: &str, player_id: &str, payload: EventPayload) -> Self {
        Self {
            table_id: table_id.to_string(),
            target: Some(player_id.to_string()),
            payload,
        }
    }
    /// Wire tag of the payload (HAND_START, YOUR_TURN, ...).
    pub fn kind(&self) -> &'static str {
        match self.payload {
            EventPayload::HandStart { .. } => "HAND_START",
            EventPayload::HoleCards { .. } => "HOLE_CARDS",
            EventPayload::BlindsPosted { .. } => "BLINDS_POSTED",
            EventPayload::YourTurn { .. } => "YOUR_TURN",
            EventPayload::PlayerAction { .. } => "PLAYER_ACTION",
            EventPayload::CommunityCards { .. } => "COMMUNITY_CARDS",
            EventPayload::ShowdownResult { .. } => "SHOWDOWN_RESULT",
            EventPayload::WinByFold { .. } => "WIN_BY_FOLD",
            EventPayload::HandEnd { .. } => "HAND_END",
            EventPayload::TableState { .. } => "TABLE_STATE",
        }
    }
}

impl std::fmt::Display for TableEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.payload {
            EventPayload::HandStart { dealer, .. } => {
                write!(f, "hand start (dealer seat {})", dealer)
            }
            EventPayload::HoleCards { cards } => write!(
                f,
                "hole cards {}",
                cards.iter().map(Card::to_string).collect::<String>()
            ),
            EventPayload::PlayerAction {
                player_id, action, ..
            } => write!(f, "{}: {}", player_id, action),
            EventPayload::CommunityCards { street, .. } => write!(f, "dealing {}", street),
            EventPayload::WinByFold { player_id, amount } => {
                write!(f, "{} wins {} by fold", player_id, amount)
            }
            _ => write!(f, "{}", self.kind()),
        }
    }
}

/// Non-blocking callback receiving every event a table emits.
///
/// The session layer buffers per connection and returns immediately; the
/// callback must never block the table actor.
pub type EventSink = Arc<dyn Fn(TableEvent) + Send + Sync>;

/// Hand-completion hook: table id plus a final chip snapshot per player.
pub type HandCompleteFn =
    Arc<dyn Fn(String, std::collections::HashMap<String, Chips>) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_serialize_with_wire_tags() {
        let event = TableEvent::broadcast(
            "t1",
            EventPayload::WinByFold {
                player_id: "p1".into(),
                amount: 40,
            },
        );
        let json = serde_json::to_value(&event.payload).unwrap();
        assert_eq!(json["type"], "WIN_BY_FOLD");
        assert_eq!(json["data"]["amount"], 40);
        assert_eq!(event.kind(), "WIN_BY_FOLD");
    }

    #[test]
    fn targeted_events_carry_their_recipient() {
        let event = TableEvent::targeted(
            "t1",
            "p2",
            EventPayload::YourTurn { deadline: 1700000000 },
        );
        assert_eq!(event.target.as_deref(), Some("p2"));
    }
}
