use super::messages::ServerResponse;
use pkr_core::Chips;
use pkr_core::ID;
use pkr_core::CLEANUP_INTERVAL;
use pkr_core::SESSION_TIMEOUT;
use pkr_engine::TableCommand;
use pkr_engine::TableEvent;
use pkr_wallet::GameService;
use pkr_wallet::GameSession;
use pkr_wallet::PlayerProfile;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::time::Duration;
use std::time::Instant;
use tokio::sync::mpsc;

/// Narrow interface the session layer uses to signal tables about
/// connection changes; wired to the table manager at startup so neither
/// layer depends on the other directly.
pub type TableNotifier = Arc<dyn Fn(&str, TableCommand) + Send + Sync>;

#[derive(Debug, Clone)]
struct SessionState {
    table_id: Option<String>,
    seat_no: Option<usize>,
    game_session: Option<ID<GameSession>>,
    chips: Chips,
    connected: bool,
    last_activity: Instant,
}

/// One authenticated player's connection-side state.
pub struct PlayerSession {
    player_id: ID<PlayerProfile>,
    username: String,
    outbound: mpsc::Sender<String>,
    state: Mutex<SessionState>,
}

impl PlayerSession {
    pub fn new(
        player_id: ID<PlayerProfile>,
        username: String,
        outbound: mpsc::Sender<String>,
    ) -> Self {
        Self {
            player_id,
            username,
            outbound,
            state: Mutex::new(SessionState {
                table_id: None,
                seat_no: None,
                game_session: None,
                chips: 0,
                connected: true,
                last_activity: Instant::now(),
            }),
        }
    }
    pub fn player_id(&self) -> ID<PlayerProfile> {
        self.player_id
    }
    pub fn username(&self) -> &str {
        &self.username
    }
    pub fn touch(&self) {
        self.state.lock().expect("session lock").last_activity = Instant::now();
    }
    pub fn table_id(&self) -> Option<String> {
        self.state.lock().expect("session lock").table_id.clone()
    }
    pub fn seat_no(&self) -> Option<usize> {
        self.state.lock().expect("session lock").seat_no
    }
    pub fn set_table(&self, table_id: &str, seat_no: usize) {
        let mut state = self.state.lock().expect("session lock");
        state.table_id = Some(table_id.to_string());
        state.seat_no = Some(seat_no);
    }
    pub fn clear_table(&self) {
        let mut state = self.state.lock().expect("session lock");
        state.table_id = None;
        state.seat_no = None;
    }
    pub fn game_session(&self) -> Option<ID<GameSession>> {
        self.state.lock().expect("session lock").game_session
    }
    pub fn set_game_session(&self, id: ID<GameSession>, chips: Chips) {
        let mut state = self.state.lock().expect("session lock");
        state.game_session = Some(id);
        state.chips = chips;
    }
    pub fn clear_game_session(&self) {
        let mut state = self.state.lock().expect("session lock");
        state.game_session = None;
        state.chips = 0;
    }
    pub fn chips(&self) -> Chips {
        self.state.lock().expect("session lock").chips
    }
    pub fn set_chips(&self, chips: Chips) {
        self.state.lock().expect("session lock").chips = chips;
    }
    pub fn is_connected(&self) -> bool {
        self.state.lock().expect("session lock").connected
    }
    pub fn disconnect(&self) {
        let mut state = self.state.lock().expect("session lock");
        state.connected = false;
        state.last_activity = Instant::now();
    }
    fn idle_for(&self) -> Duration {
        self.state
            .lock()
            .expect("session lock")
            .last_activity
            .elapsed()
    }
    /// Queues a frame onto the connection's outbound buffer. Never blocks;
    /// a full buffer drops the frame with a warning.
    pub fn send(&self, frame: &ServerResponse) {
        if self.outbound.try_send(frame.to_json()).is_err() {
            log::warn!(
                "[session] dropping frame for {}: buffer full or closed",
                self.player_id
            );
        }
    }
}

/// At most one live session per player; the authoritative cohort list for
/// table broadcasts; evicts abandoned sessions and cashes them out.
pub struct SessionManager {
    sessions: Mutex<HashMap<ID<PlayerProfile>, Arc<PlayerSession>>>,
    game: Arc<GameService>,
    notifier: OnceLock<TableNotifier>,
    session_timeout: Duration,
    shutdown: tokio::sync::Notify,
}

impl SessionManager {
    pub fn new(game: Arc<GameService>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            game,
            notifier: OnceLock::new(),
            session_timeout: SESSION_TIMEOUT,
            shutdown: tokio::sync::Notify::new(),
        }
    }
    /// Injects the table notifier; call once at startup.
    pub fn set_notifier(&self, notifier: TableNotifier) {
        let _ = self.notifier.set(notifier);
    }
    fn notify_table(&self, table_id: &str, command: TableCommand) {
        if let Some(notifier) = self.notifier.get() {
            notifier(table_id, command);
        }
    }

    /// Adds a session, displacing any previous one for the same player.
    /// Table and game-session context carries over so a reconnecting player
    /// resumes where they left off.
    pub fn add(&self, session: Arc<PlayerSession>) {
        let player_id = session.player_id();
        let mut reconnect_table = None;
        {
            let mut sessions = self.sessions.lock().expect("sessions lock");
            if let Some(old) = sessions.get(&player_id) {
                log::warn!("[session] replacing existing session for {}", player_id);
                let old_state = old.state.lock().expect("session lock").clone();
                old.disconnect();
                let mut state = session.state.lock().expect("session lock");
                state.table_id = old_state.table_id.clone();
                state.seat_no = old_state.seat_no;
                state.game_session = old_state.game_session;
                state.chips = old_state.chips;
                reconnect_table = old_state.table_id;
            }
            sessions.insert(player_id, session.clone());
        }
        if let Some(table_id) = reconnect_table {
            self.notify_table(
                &table_id,
                TableCommand::Reconnect {
                    player_id: player_id.to_string(),
                },
            );
        }
        log::info!("[session] added session for {}", player_id);
    }

    pub fn get(&self, player_id: ID<PlayerProfile>) -> Option<Arc<PlayerSession>> {
        self.sessions
            .lock()
            .expect("sessions lock")
            .get(&player_id)
            .cloned()
    }

    pub fn remove(&self, player_id: ID<PlayerProfile>) {
        if let Some(session) = self
            .sessions
            .lock()
            .expect("sessions lock")
            .remove(&player_id)
        {
            session.disconnect();
            log::info!("[session] removed session for {}", player_id);
        }
    }

    /// Marks the session disconnected and relays the signal to its table.
    /// The session stays around for the reconnect window.
    pub fn handle_disconnect(&self, player_id: ID<PlayerProfile>) {
        let Some(session) = self.get(player_id) else {
            return;
        };
        session.disconnect();
        if let Some(table_id) = session.table_id() {
            log::info!(
                "[session] {} disconnected while at table {}",
                player_id,
                table_id
            );
            self.notify_table(
                &table_id,
                TableCommand::Disconnect {
                    player_id: player_id.to_string(),
                },
            );
        }
    }

    /// Fan-out of a table event: targeted events route by player id,
    /// broadcasts go to everyone seated at the table.
    pub fn dispatch(self: &Arc<Self>, event: TableEvent) {
        self.record_stats(&event);
        let frame = ServerResponse::from_event(&event);
        match &event.target {
            Some(player_id) => {
                self.send_to_player_str(player_id, &frame);
            }
            None => self.broadcast_to_table(&event.table_id, &frame),
        }
    }

    /// Folds hand outcomes into the player profiles: one hand played per
    /// participant, a win plus gross winnings per pot taken down.
    fn record_stats(self: &Arc<Self>, event: &TableEvent) {
        use pkr_engine::EventPayload;
        let mut deltas: Vec<(String, i32, i32, Chips)> = Vec::new();
        match &event.payload {
            EventPayload::WinByFold { player_id, amount } => {
                deltas.push((player_id.clone(), 0, 1, *amount));
            }
            EventPayload::ShowdownResult { pots } => {
                for pot in pots {
                    for winner in &pot.winners {
                        deltas.push((winner.player_id.clone(), 0, 1, winner.amount));
                    }
                }
            }
            EventPayload::HandEnd { players } => {
                for player in players {
                    deltas.push((player.player_id.clone(), 1, 0, 0));
                }
            }
            _ => return,
        }
        for (player_id, hands, wins, winnings) in deltas {
            let Ok(id) = uuid::Uuid::parse_str(&player_id) else {
                continue;
            };
            let game = self.game.clone();
            tokio::spawn(async move {
                if let Err(e) = game
                    .record_hand_result(ID::from(id), hands, wins, winnings)
                    .await
                {
                    log::error!("[session] stat update failed for {}: {}", player_id, e);
                }
            });
        }
    }

    pub fn broadcast_to_table(&self, table_id: &str, frame: &ServerResponse) {
        let sessions = self.sessions.lock().expect("sessions lock");
        let mut count = 0;
        for session in sessions.values() {
            if session.is_connected() && session.table_id().as_deref() == Some(table_id) {
                session.send(frame);
                count += 1;
            }
        }
        log::debug!("[session] broadcast {} to {} players", frame.kind, count);
    }

    pub fn send_to_player(&self, player_id: ID<PlayerProfile>, frame: &ServerResponse) -> bool {
        match self.get(player_id) {
            Some(session) if session.is_connected() => {
                session.send(frame);
                true
            }
            _ => false,
        }
    }

    fn send_to_player_str(&self, player_id: &str, frame: &ServerResponse) -> bool {
        match uuid::Uuid::parse_str(player_id) {
            Ok(id) => self.send_to_player(ID::from(id), frame),
            Err(_) => false,
        }
    }

    /// Applies an end-of-hand chip snapshot: updates the in-memory mirrors
    /// and fires the database sync for each player, off the table's path.
    pub fn sync_chips(self: &Arc<Self>, table_id: &str, chips: &HashMap<String, Chips>) {
        for (player_id, chips) in chips {
            let Ok(id) = uuid::Uuid::parse_str(player_id) else {
                continue;
            };
            let Some(session) = self.get(ID::from(id)) else {
                continue;
            };
            session.set_chips(*chips);
            let Some(game_session) = session.game_session() else {
                continue;
            };
            let game = self.game.clone();
            let chips = *chips;
            let table = table_id.to_string();
            tokio::spawn(async move {
                if let Err(e) = game.update_session_chips(game_session, chips).await {
                    log::error!(
                        "[session] chip sync failed for {} at {}: {}",
                        game_session,
                        table,
                        e
                    );
                }
            });
        }
    }

    /// Periodic eviction of sessions disconnected past the timeout; any
    /// still-open game session is cashed out on the player's behalf.
    pub fn spawn_cleanup(self: &Arc<Self>) {
        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                let Some(manager) = manager.upgrade() else {
                    return;
                };
                tokio::select! {
                    _ = tick.tick() => manager.cleanup_expired(),
                    _ = manager.shutdown.notified() => return,
                }
            }
        });
    }

    fn cleanup_expired(self: &Arc<Self>) {
        let expired = {
            let sessions = self.sessions.lock().expect("sessions lock");
            sessions
                .values()
                .filter(|s| !s.is_connected() && s.idle_for() > self.session_timeout)
                .cloned()
                .collect::<Vec<_>>()
        };
        for session in expired {
            let player_id = session.player_id();
            log::info!("[session] evicting expired session for {}", player_id);
            self.sessions
                .lock()
                .expect("sessions lock")
                .remove(&player_id);
            if let Some(game_session) = session.game_session() {
                let game = self.game.clone();
                let chips = session.chips();
                tokio::spawn(async move {
                    match game.cash_out(player_id, game_session, chips).await {
                        Ok(receipt) => log::info!(
                            "[session] auto cash-out for {}: {} chips",
                            player_id,
                            receipt.cash_out_amount
                        ),
                        Err(e) => log::error!(
                            "[session] auto cash-out failed for {}: {}",
                            player_id,
                            e
                        ),
                    }
                });
            }
        }
    }

    /// Stops the cleanup loop and disconnects everyone.
    pub fn stop(&self) {
        self.shutdown.notify_waiters();
        let mut sessions = self.sessions.lock().expect("sessions lock");
        for session in sessions.values() {
            session.disconnect();
        }
        sessions.clear();
        log::info!("[session] manager stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SessionManager paths that need a database are covered by the wallet
    // integration tests; the connection-side state lives in PlayerSession.

    #[tokio::test]
    async fn session_state_tracking() {
        let (tx, mut rx) = mpsc::channel(4);
        let session = PlayerSession::new(ID::default(), "alice".into(), tx);
        assert!(session.is_connected());
        assert_eq!(session.table_id(), None);

        session.set_table("t1", 3);
        assert_eq!(session.table_id().as_deref(), Some("t1"));
        assert_eq!(session.seat_no(), Some(3));

        session.set_game_session(ID::default(), 5_000);
        assert_eq!(session.chips(), 5_000);

        session.send(&ServerResponse::error("x", "y"));
        assert!(rx.recv().await.unwrap().contains("ERROR"));

        session.disconnect();
        assert!(!session.is_connected());

        session.clear_table();
        session.clear_game_session();
        assert_eq!(session.table_id(), None);
        assert_eq!(session.chips(), 0);
    }
}
