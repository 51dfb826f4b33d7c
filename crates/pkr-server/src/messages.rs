use pkr_core::Chips;
use pkr_engine::ActionKind;
use pkr_engine::TableEvent;

/// Client-initiated actions, in wire spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientAction {
    BuyIn,
    CashOut,
    JoinTable,
    LeaveTable,
    SitDown,
    StandUp,
    GameAction,
    GetBalance,
}

/// Inbound client frame.
#[derive(Debug, serde::Deserialize)]
pub struct ClientRequest {
    pub action: ClientAction,
    #[serde(default)]
    pub table_id: Option<String>,
    #[serde(default)]
    pub seat_no: Option<usize>,
    #[serde(default)]
    pub amount: Option<Chips>,
    #[serde(default)]
    pub game_action: Option<ActionKind>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Outbound server frame: `{type, payload, timestamp, trace_id?}`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ServerResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: serde_json::Value,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ServerResponse {
    pub fn new(kind: &str, payload: impl serde::Serialize) -> Self {
        Self {
            kind: kind.to_string(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
            timestamp: epoch_now(),
            trace_id: None,
        }
    }
    pub fn with_trace(mut self, trace_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self
    }
    pub fn error(code: &str, message: &str) -> Self {
        Self::new(
            "ERROR",
            serde_json::json!({ "code": code, "message": message }),
        )
    }
    /// Re-frames a table event for the wire; its tagged payload already
    /// matches the `{type, data}` shape.
    pub fn from_event(event: &TableEvent) -> Self {
        let value = serde_json::to_value(&event.payload).unwrap_or(serde_json::Value::Null);
        Self {
            kind: event.kind().to_string(),
            payload: value.get("data").cloned().unwrap_or(serde_json::Value::Null),
            timestamp: epoch_now(),
            trace_id: None,
        }
    }
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

pub fn epoch_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkr_engine::EventPayload;

    #[test]
    fn client_frames_parse() {
        let req: ClientRequest = serde_json::from_str(
            r#"{"action":"GAME_ACTION","table_id":"t1","game_action":"RAISE","amount":40}"#,
        )
        .unwrap();
        assert_eq!(req.action, ClientAction::GameAction);
        assert_eq!(req.game_action, Some(ActionKind::Raise));
        assert_eq!(req.amount, Some(40));
    }

    #[test]
    fn unknown_action_is_an_error() {
        assert!(serde_json::from_str::<ClientRequest>(r#"{"action":"DANCE"}"#).is_err());
    }

    #[test]
    fn error_frames_carry_code_and_message() {
        let frame = ServerResponse::error("not_your_turn", "not your turn");
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["payload"]["code"], "not_your_turn");
    }

    #[test]
    fn table_events_reframe_to_wire_shape() {
        let event = TableEvent::broadcast(
            "t1",
            EventPayload::WinByFold {
                player_id: "p1".into(),
                amount: 40,
            },
        );
        let frame = ServerResponse::from_event(&event);
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "WIN_BY_FOLD");
        assert_eq!(value["payload"]["player_id"], "p1");
        assert!(value.get("timestamp").is_some());
    }
}
