use super::error::TableError;
use super::player::Player;
use pkr_core::Chips;
use pkr_core::Position;
use tokio::sync::oneshot;

/// Player betting actions, in wire spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    AllIn,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Fold => "FOLD",
                Self::Check => "CHECK",
                Self::Call => "CALL",
                Self::Bet => "BET",
                Self::Raise => "RAISE",
                Self::AllIn => "ALL_IN",
            }
        )
    }
}

impl TryFrom<&str> for ActionKind {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, String> {
        match s {
            "FOLD" => Ok(Self::Fold),
            "CHECK" => Ok(Self::Check),
            "CALL" => Ok(Self::Call),
            "BET" => Ok(Self::Bet),
            "RAISE" => Ok(Self::Raise),
            "ALL_IN" => Ok(Self::AllIn),
            _ => Err(format!("invalid game action: {}", s)),
        }
    }
}

/// What a successful command reports back.
#[derive(Debug, Clone, Copy, Default)]
pub struct Outcome {
    /// StandUp only: the player was mid-hand and the stand-up folded them.
    pub was_in_hand: bool,
}

/// One-shot reply channel carried by synchronous commands.
pub type Reply = oneshot::Sender<Result<Outcome, TableError>>;

/// Commands accepted by a table actor.
///
/// The actor sends exactly one result to the reply channel when present.
/// Disconnect and Reconnect are fire-and-forget.
#[derive(Debug)]
pub enum TableCommand {
    Join {
        player: Player,
        seat: Position,
        reply: Option<Reply>,
    },
    Leave {
        player_id: String,
        reply: Option<Reply>,
    },
    SitDown {
        player_id: String,
        reply: Option<Reply>,
    },
    StandUp {
        player_id: String,
        reply: Option<Reply>,
    },
    Disconnect {
        player_id: String,
    },
    Reconnect {
        player_id: String,
    },
    Action {
        player_id: String,
        kind: ActionKind,
        amount: Chips,
        reply: Option<Reply>,
    },
}

impl TableCommand {
    /// Detaches the reply channel, if any, for exactly-once delivery.
    pub fn take_reply(&mut self) -> Option<Reply> {
        match self {
            Self::Join { reply, .. }
            | Self::Leave { reply, .. }
            | Self::SitDown { reply, .. }
            | Self::StandUp { reply, .. }
            | Self::Action { reply, .. } => reply.take(),
            Self::Disconnect { .. } | Self::Reconnect { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_kind_wire_spelling() {
        assert_eq!(ActionKind::try_from("ALL_IN").unwrap(), ActionKind::AllIn);
        assert_eq!(ActionKind::Fold.to_string(), "FOLD");
        assert!(ActionKind::try_from("fold").is_err());
    }

    #[test]
    fn action_kind_serde_tags() {
        let json = serde_json::to_string(&ActionKind::AllIn).unwrap();
        assert_eq!(json, "\"ALL_IN\"");
        let back: ActionKind = serde_json::from_str("\"RAISE\"").unwrap();
        assert_eq!(back, ActionKind::Raise);
    }
}
