use super::messages::ClientAction;
use super::messages::ClientRequest;
use super::messages::ServerResponse;
use super::session::PlayerSession;
use super::session::SessionManager;
use pkr_core::ID;
use pkr_engine::Player;
use pkr_engine::TableCommand;
use pkr_engine::TableError;
use pkr_engine::TableManager;
use pkr_wallet::GameService;
use pkr_wallet::PlayerProfile;
use pkr_wallet::StoreError;
use std::sync::Arc;

/// Routes inbound client frames to the wallet service and table actors.
///
/// Per-table mutations go through the table's command channel and await the
/// reply (bounded by the command timeout); money operations call the game
/// service directly.
pub struct MessageHandler {
    sessions: Arc<SessionManager>,
    tables: Arc<TableManager>,
    game: Arc<GameService>,
    max_players: usize,
}

fn table_error(e: TableError) -> ServerResponse {
    ServerResponse::error(e.code(), &e.to_string())
}

fn store_error(e: StoreError) -> ServerResponse {
    if let StoreError::Db(inner) = &e {
        log::error!("[handler] database error: {}", inner);
        return ServerResponse::error("internal_error", "internal server error");
    }
    ServerResponse::error(e.code(), &e.to_string())
}

impl MessageHandler {
    pub fn new(
        sessions: Arc<SessionManager>,
        tables: Arc<TableManager>,
        game: Arc<GameService>,
        max_players: usize,
    ) -> Self {
        Self {
            sessions,
            tables,
            game,
            max_players,
        }
    }

    pub async fn handle(&self, player_id: ID<PlayerProfile>, raw: &str) {
        let request: ClientRequest = match serde_json::from_str(raw) {
            Ok(request) => request,
            Err(e) => {
                log::debug!("[handler] invalid frame from {}: {}", player_id, e);
                self.sessions.send_to_player(
                    player_id,
                    &ServerResponse::error("invalid_format", "invalid message format"),
                );
                return;
            }
        };
        let Some(session) = self.sessions.get(player_id) else {
            return;
        };
        session.touch();
        let trace = request.trace_id.clone();
        let reply = match request.action {
            ClientAction::BuyIn => self.buy_in(&session, &request).await,
            ClientAction::CashOut => self.cash_out(&session).await,
            ClientAction::JoinTable => self.join_table(&session, &request).await,
            ClientAction::LeaveTable => self.leave_table(&session).await,
            ClientAction::SitDown => self.sit_down(&session).await,
            ClientAction::StandUp => self.stand_up(&session).await,
            ClientAction::GameAction => self.game_action(&session, &request).await,
            ClientAction::GetBalance => self.get_balance(&session).await,
        };
        if let Some(reply) = reply {
            session.send(&reply.with_trace(trace));
        }
    }

    async fn buy_in(
        &self,
        session: &PlayerSession,
        request: &ClientRequest,
    ) -> Option<ServerResponse> {
        let player_id = session.player_id();
        let Some(table_id) = request.table_id.as_deref() else {
            return Some(ServerResponse::error("invalid_request", "table_id required"));
        };
        let amount = request.amount.unwrap_or(0);
        if amount <= 0 {
            return Some(ServerResponse::error(
                "invalid_amount",
                "amount must be positive",
            ));
        }
        if let Err(e) = self.game.ensure_wallet_exists(player_id).await {
            log::error!("[handler] wallet provisioning failed for {}: {}", player_id, e);
            return Some(ServerResponse::error("wallet_error", "failed to access wallet"));
        }
        match self.game.buy_in(player_id, table_id, amount).await {
            Ok(receipt) => {
                session.set_game_session(receipt.session_id, receipt.chips);
                Some(ServerResponse::new(
                    "BUY_IN_SUCCESS",
                    serde_json::json!({
                        "session_id": receipt.session_id.to_string(),
                        "table_id": receipt.table_id,
                        "chips": receipt.chips,
                        "wallet_balance": receipt.wallet_balance,
                    }),
                ))
            }
            Err(e) => Some(store_error(e)),
        }
    }

    async fn cash_out(&self, session: &PlayerSession) -> Option<ServerResponse> {
        let player_id = session.player_id();
        let Some(game_session) = session.game_session() else {
            return Some(ServerResponse::error(
                "no_game_session",
                "no active game session",
            ));
        };
        // Vacate the seat first so table chips cannot move while the wallet
        // is credited.
        if let Some(table_id) = session.table_id() {
            if let Some(handle) = self.tables.get(&table_id) {
                let player = player_id.to_string();
                if let Err(e) = handle
                    .submit(|reply| TableCommand::Leave {
                        player_id: player,
                        reply: Some(reply),
                    })
                    .await
                {
                    if e != TableError::PlayerNotFound {
                        return Some(table_error(e));
                    }
                }
            }
            session.clear_table();
        }
        match self
            .game
            .cash_out(player_id, game_session, session.chips())
            .await
        {
            Ok(receipt) => {
                session.clear_game_session();
                Some(ServerResponse::new(
                    "CASH_OUT_SUCCESS",
                    serde_json::json!({
                        "session_id": receipt.session_id.to_string(),
                        "buy_in_amount": receipt.buy_in_amount,
                        "cash_out": receipt.cash_out_amount,
                        "profit": receipt.profit,
                        "wallet_balance": receipt.wallet_balance,
                    }),
                ))
            }
            Err(e) => Some(store_error(e)),
        }
    }

    async fn join_table(
        &self,
        session: &PlayerSession,
        request: &ClientRequest,
    ) -> Option<ServerResponse> {
        let Some(table_id) = request.table_id.as_deref() else {
            return Some(ServerResponse::error("invalid_request", "table_id required"));
        };
        let Some(seat_no) = request.seat_no else {
            return Some(ServerResponse::error("invalid_request", "seat_no required"));
        };
        if seat_no >= self.max_players {
            return Some(ServerResponse::error("invalid_seat", "seat out of range"));
        }
        // Buy-in is the single money-movement entry point; joining a table
        // only moves already-bought chips.
        if session.game_session().is_none() {
            return Some(ServerResponse::error(
                "no_game_session",
                "buy in before joining a table",
            ));
        }
        let player = Player::new(session.player_id().to_string(), session.chips());
        let handle = self.tables.get_or_create(table_id);
        match handle
            .submit(|reply| TableCommand::Join {
                player,
                seat: seat_no,
                reply: Some(reply),
            })
            .await
        {
            Ok(_) => {
                session.set_table(table_id, seat_no);
                log::info!(
                    "[handler] {} joined table {} seat {}",
                    session.player_id(),
                    table_id,
                    seat_no
                );
                Some(ServerResponse::new(
                    "JOIN_TABLE_SUCCESS",
                    serde_json::json!({
                        "table_id": table_id,
                        "seat_no": seat_no,
                        "chips": session.chips(),
                    }),
                ))
            }
            Err(e) => Some(table_error(e)),
        }
    }

    async fn leave_table(&self, session: &PlayerSession) -> Option<ServerResponse> {
        let Some(table_id) = session.table_id() else {
            return Some(ServerResponse::error("not_at_table", "not at any table"));
        };
        let Some(handle) = self.tables.get(&table_id) else {
            session.clear_table();
            return Some(ServerResponse::error("not_at_table", "table not found"));
        };
        let player = session.player_id().to_string();
        match handle
            .submit(|reply| TableCommand::Leave {
                player_id: player,
                reply: Some(reply),
            })
            .await
        {
            Ok(_) => {
                session.clear_table();
                Some(ServerResponse::new(
                    "LEAVE_TABLE_SUCCESS",
                    serde_json::json!({ "table_id": table_id }),
                ))
            }
            Err(e) => Some(table_error(e)),
        }
    }

    async fn sit_down(&self, session: &PlayerSession) -> Option<ServerResponse> {
        let Some(table_id) = session.table_id() else {
            return Some(ServerResponse::error("not_at_table", "not at any table"));
        };
        let Some(handle) = self.tables.get(&table_id) else {
            return Some(ServerResponse::error("not_at_table", "table not found"));
        };
        let player = session.player_id().to_string();
        match handle
            .submit(|reply| TableCommand::SitDown {
                player_id: player,
                reply: Some(reply),
            })
            .await
        {
            Ok(_) => Some(ServerResponse::new(
                "SIT_DOWN_SUCCESS",
                serde_json::json!({
                    "table_id": table_id,
                    "seat_no": session.seat_no(),
                }),
            )),
            Err(e) => Some(table_error(e)),
        }
    }

    async fn stand_up(&self, session: &PlayerSession) -> Option<ServerResponse> {
        let Some(table_id) = session.table_id() else {
            return Some(ServerResponse::error("not_at_table", "not at any table"));
        };
        let Some(handle) = self.tables.get(&table_id) else {
            return Some(ServerResponse::error("not_at_table", "table not found"));
        };
        let player = session.player_id().to_string();
        match handle
            .submit(|reply| TableCommand::StandUp {
                player_id: player,
                reply: Some(reply),
            })
            .await
        {
            Ok(outcome) => Some(ServerResponse::new(
                "STAND_UP_SUCCESS",
                serde_json::json!({
                    "table_id": table_id,
                    "was_in_hand": outcome.was_in_hand,
                }),
            )),
            Err(e) => Some(table_error(e)),
        }
    }

    async fn game_action(
        &self,
        session: &PlayerSession,
        request: &ClientRequest,
    ) -> Option<ServerResponse> {
        let Some(table_id) = session.table_id() else {
            return Some(ServerResponse::error("not_at_table", "not at any table"));
        };
        let Some(kind) = request.game_action else {
            return Some(ServerResponse::error(
                "invalid_request",
                "game_action required",
            ));
        };
        let Some(handle) = self.tables.get(&table_id) else {
            return Some(ServerResponse::error("not_at_table", "table not found"));
        };
        let player = session.player_id().to_string();
        let amount = request.amount.unwrap_or(0);
        match handle
            .submit(|reply| TableCommand::Action {
                player_id: player,
                kind,
                amount,
                reply: Some(reply),
            })
            .await
        {
            // Successful actions surface through the table's broadcasts.
            Ok(_) => None,
            Err(e) => Some(table_error(e)),
        }
    }

    async fn get_balance(&self, session: &PlayerSession) -> Option<ServerResponse> {
        match self.game.player_balance(session.player_id()).await {
            Ok(wallet) => Some(ServerResponse::new(
                "BALANCE_INFO",
                serde_json::json!({
                    "wallet_balance": wallet.balance,
                    "locked_balance": wallet.locked_balance,
                    "current_chips": session.chips(),
                    "total_balance": wallet.total_balance(),
                    "currency": wallet.currency,
                }),
            )),
            Err(e) => Some(store_error(e)),
        }
    }
}
