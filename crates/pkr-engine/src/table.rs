use super::command::ActionKind;
use super::command::Outcome;
use super::command::Reply;
use super::command::TableCommand;
use super::distributor::distribute;
use super::distributor::payouts;
use super::error::TableError;
use super::event::BlindPost;
use super::event::ChipAward;
use super::event::EventPayload;
use super::event::EventSink;
use super::event::HandCompleteFn;
use super::event::PotPayout;
use super::event::SeatSnapshot;
use super::event::TableEvent;
use super::player::Player;
use super::player::PlayerStatus;
use super::pot::PotManager;
use pkr_cards::Card;
use pkr_cards::Deck;
use pkr_core::Chips;
use pkr_core::Position;
use pkr_core::ACTION_TIMEOUT;
use pkr_core::COMMAND_QUEUE;
use pkr_core::COMMAND_TIMEOUT;
use pkr_core::DEFAULT_B_BLIND;
use pkr_core::DISCONNECT_TIMEOUT;
use pkr_core::FALLBACK_B_BLIND;
use pkr_core::FALLBACK_S_BLIND;
use pkr_core::MAX_SEATS;
use pkr_core::MIN_PLAYERS;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Where the hand currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Idle,
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl GamePhase {
    fn street(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PreFlop => "preflop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
        }
    }
    fn is_betting(&self) -> bool {
        matches!(self, Self::PreFlop | Self::Flop | Self::Turn | Self::River)
    }
}

/// Single-writer actor owning one table's hand state.
///
/// Exactly one task mutates a Table: its own scheduling loop, which drains
/// the command channel, ticks once a second for deadline sweeps and hand
/// auto-start, and exits on the close signal. Everything outside talks to it
/// through [`TableHandle`]; events flow the other way through the registered
/// sink, which must never block.
pub struct Table {
    id: String,
    phase: GamePhase,
    pots: PotManager,
    deck: Deck,
    community: Vec<Card>,
    dealer_pos: Position,
    current_pos: Position,
    min_bet: Chips,
    big_blind: Chips,
    min_players: usize,
    seats: [Option<String>; MAX_SEATS],
    players: HashMap<String, Player>,
    disconnected: HashMap<String, Instant>,
    pending_removal: HashSet<String>,
    action_deadline: Option<Instant>,
    action_timeout: Duration,
    disconnect_timeout: Duration,
    sink: EventSink,
    on_hand_complete: Option<HandCompleteFn>,
}

/// Cheap cloneable handle for submitting commands to a running table.
#[derive(Clone)]
pub struct TableHandle {
    id: String,
    commands: mpsc::Sender<TableCommand>,
    close: std::sync::Arc<std::sync::Mutex<Option<oneshot::Sender<()>>>>,
}

impl TableHandle {
    pub fn id(&self) -> &str {
        &self.id
    }
    /// Non-blocking submission. A saturated channel surfaces as QueueFull
    /// so the caller can tell the client to retry.
    pub fn try_send(&self, command: TableCommand) -> Result<(), TableError> {
        self.commands.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TableError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => TableError::TableClosed,
        })
    }
    /// Submits a command built around a fresh reply channel and awaits the
    /// result. The table is never cancelled; on timeout the reply is simply
    /// no longer awaited.
    pub async fn submit<F>(&self, make: F) -> Result<Outcome, TableError>
    where
        F: FnOnce(Reply) -> TableCommand,
    {
        let (tx, rx) = oneshot::channel();
        self.try_send(make(tx))?;
        match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TableError::TableClosed),
            Err(_) => Err(TableError::CommandTimeout),
        }
    }
    /// Signals the scheduling loop to exit. Idempotent.
    pub fn close(&self) {
        if let Some(tx) = self.close.lock().expect("close lock").take() {
            let _ = tx.send(());
        }
    }
}

impl Table {
    pub fn new(id: impl Into<String>, sink: EventSink) -> Self {
        Self {
            id: id.into(),
            phase: GamePhase::Idle,
            pots: PotManager::new(),
            deck: Deck::new(),
            community: Vec::new(),
            dealer_pos: 0,
            current_pos: 0,
            min_bet: 0,
            big_blind: DEFAULT_B_BLIND,
            min_players: MIN_PLAYERS,
            seats: Default::default(),
            players: HashMap::new(),
            disconnected: HashMap::new(),
            pending_removal: HashSet::new(),
            action_deadline: None,
            action_timeout: ACTION_TIMEOUT,
            disconnect_timeout: DISCONNECT_TIMEOUT,
            sink,
            on_hand_complete: None,
        }
    }
    pub fn with_stakes(mut self, big_blind: Chips) -> Self {
        self.big_blind = big_blind;
        self
    }
    pub fn with_min_players(mut self, min_players: usize) -> Self {
        self.min_players = min_players.max(MIN_PLAYERS);
        self
    }
    pub fn with_timeouts(mut self, action: Duration, disconnect: Duration) -> Self {
        self.action_timeout = action;
        self.disconnect_timeout = disconnect;
        self
    }
    pub fn on_hand_complete(mut self, callback: HandCompleteFn) -> Self {
        self.on_hand_complete = Some(callback);
        self
    }

    /// Moves the table onto its own task and returns the handle.
    pub fn spawn(self) -> TableHandle {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let (close_tx, close_rx) = oneshot::channel();
        let handle = TableHandle {
            id: self.id.clone(),
            commands: tx,
            close: std::sync::Arc::new(std::sync::Mutex::new(Some(close_tx))),
        };
        tokio::spawn(self.run(rx, close_rx));
        handle
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<TableCommand>,
        mut close: oneshot::Receiver<()>,
    ) {
        log::info!("[table {}] started", self.id);
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            self.sweep_action_deadline();
            self.sweep_disconnects();
            self.try_start_hand();
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = tick.tick() => {}
                _ = &mut close => break,
            }
        }
        log::info!("[table {}] stopped", self.id);
    }

    fn handle(&mut self, mut command: TableCommand) {
        let reply = command.take_reply();
        let result = match command {
            TableCommand::Join { player, seat, .. } => {
                self.join(player, seat).map(|_| Outcome::default())
            }
            TableCommand::Leave { player_id, .. } => {
                self.leave(&player_id).map(|_| Outcome::default())
            }
            TableCommand::SitDown { player_id, .. } => {
                self.sit_down(&player_id).map(|_| Outcome::default())
            }
            TableCommand::StandUp { player_id, .. } => self
                .stand_up(&player_id)
                .map(|was_in_hand| Outcome { was_in_hand }),
            TableCommand::Disconnect { player_id } => {
                self.disconnect(&player_id);
                Ok(Outcome::default())
            }
            TableCommand::Reconnect { player_id } => {
                self.reconnect(&player_id);
                Ok(Outcome::default())
            }
            TableCommand::Action {
                player_id,
                kind,
                amount,
                ..
            } => self
                .game_action(&player_id, kind, amount)
                .map(|_| Outcome::default()),
        };
        if let Err(e) = &result {
            log::debug!("[table {}] command rejected: {}", self.id, e);
        }
        if let Some(reply) = reply {
            let _ = reply.send(result);
        }
    }

    // ------------------------------------------------------------------
    // connection / seating commands
    // ------------------------------------------------------------------

    fn join(&mut self, mut player: Player, seat: Position) -> Result<(), TableError> {
        if seat >= MAX_SEATS {
            return Err(TableError::SeatOutOfRange);
        }
        if self.seats[seat].is_some() {
            return Err(TableError::SeatOccupied);
        }
        if self.players.contains_key(&player.id) {
            return Err(TableError::DuplicatePlayer);
        }
        player.seat_index = seat as i32;
        player.status = PlayerStatus::SittingOut;
        player.current_bet = 0;
        player.has_acted = false;
        player.hole_cards.clear();
        log::info!(
            "[table {}] {} joined at seat {} with {} chips",
            self.id,
            player.id,
            seat,
            player.chips
        );
        self.seats[seat] = Some(player.id.clone());
        self.players.insert(player.id.clone(), player);
        self.emit_state();
        Ok(())
    }

    fn leave(&mut self, player_id: &str) -> Result<(), TableError> {
        let status = self
            .players
            .get(player_id)
            .ok_or(TableError::PlayerNotFound)?
            .status;
        match status {
            PlayerStatus::AllIn => return Err(TableError::CannotLeaveAllIn),
            PlayerStatus::Playing if self.phase != GamePhase::Idle => {
                // Mid-hand: fold and tombstone the seat but keep the player
                // so their committed bets still reach the pot.
                let seat = {
                    let player = self.players.get_mut(player_id).expect("checked above");
                    player.status = PlayerStatus::Folded;
                    player.hole_cards.clear();
                    player.has_acted = true;
                    std::mem::replace(&mut player.seat_index, -1)
                };
                if seat >= 0 {
                    self.seats[seat as usize] = None;
                }
                self.pending_removal.insert(player_id.to_string());
                log::info!("[table {}] {} left mid-hand", self.id, player_id);
                self.after_departure(player_id);
            }
            _ => {
                self.remove_player(player_id);
                log::info!("[table {}] {} left", self.id, player_id);
            }
        }
        self.emit_state();
        Ok(())
    }

    fn remove_player(&mut self, player_id: &str) {
        if let Some(player) = self.players.remove(player_id) {
            if player.seat_index >= 0 {
                self.seats[player.seat_index as usize] = None;
            }
        }
        self.disconnected.remove(player_id);
        self.pending_removal.remove(player_id);
    }

    fn sit_down(&mut self, player_id: &str) -> Result<(), TableError> {
        self.players
            .get_mut(player_id)
            .ok_or(TableError::PlayerNotFound)?
            .sit_down()?;
        self.emit_state();
        Ok(())
    }

    fn stand_up(&mut self, player_id: &str) -> Result<bool, TableError> {
        let mid_hand = self.phase != GamePhase::Idle;
        let folded = self
            .players
            .get_mut(player_id)
            .ok_or(TableError::PlayerNotFound)?
            .stand_up()?;
        let was_in_hand = folded && mid_hand;
        if was_in_hand {
            self.after_departure(player_id);
        }
        self.emit_state();
        Ok(was_in_hand)
    }

    fn disconnect(&mut self, player_id: &str) {
        if self.players.contains_key(player_id) {
            log::info!("[table {}] {} disconnected", self.id, player_id);
            self.disconnected
                .insert(player_id.to_string(), Instant::now());
        }
    }

    fn reconnect(&mut self, player_id: &str) {
        if self.disconnected.remove(player_id).is_some() {
            log::info!("[table {}] {} reconnected", self.id, player_id);
        }
    }

    // ------------------------------------------------------------------
    // betting
    // ------------------------------------------------------------------

    fn game_action(
        &mut self,
        player_id: &str,
        kind: ActionKind,
        amount: Chips,
    ) -> Result<(), TableError> {
        if !self.phase.is_betting() {
            return Err(TableError::NotYourTurn);
        }
        if self.seats[self.current_pos].as_deref() != Some(player_id) {
            return Err(TableError::NotYourTurn);
        }
        let min_bet = self.min_bet;
        let player = self
            .players
            .get_mut(player_id)
            .ok_or(TableError::PlayerNotFound)?;
        let mut raised_to = None;
        let applied = match kind {
            ActionKind::Fold => {
                player.status = PlayerStatus::Folded;
                player.has_acted = true;
                0
            }
            ActionKind::Check => {
                if player.current_bet < min_bet {
                    return Err(TableError::CannotCheck);
                }
                player.has_acted = true;
                0
            }
            ActionKind::Call => {
                let to_call = (min_bet - player.current_bet).min(player.chips);
                player.chips -= to_call;
                player.current_bet += to_call;
                player.has_acted = true;
                if player.chips == 0 {
                    player.status = PlayerStatus::AllIn;
                }
                to_call
            }
            ActionKind::Bet | ActionKind::Raise => {
                if amount < min_bet {
                    return Err(TableError::BetTooLow);
                }
                let diff = amount - player.current_bet;
                if diff > player.chips {
                    return Err(TableError::InsufficientChips);
                }
                player.chips -= diff;
                player.current_bet = amount;
                player.has_acted = true;
                if player.chips == 0 {
                    player.status = PlayerStatus::AllIn;
                }
                raised_to = Some(amount);
                amount
            }
            ActionKind::AllIn => {
                if player.chips == 0 {
                    return Err(TableError::AlreadyAllIn);
                }
                let total = player.current_bet + player.chips;
                player.chips = 0;
                player.current_bet = total;
                player.status = PlayerStatus::AllIn;
                player.has_acted = true;
                if total > min_bet {
                    raised_to = Some(total);
                }
                total
            }
        };
        if let Some(new_min) = raised_to {
            self.min_bet = new_min;
            self.reset_has_acted_except(player_id);
        }
        log::debug!(
            "[table {}] {} {} {}",
            self.id,
            player_id,
            kind,
            applied
        );
        self.emit(TableEvent::broadcast(
            &self.id,
            EventPayload::PlayerAction {
                player_id: player_id.to_string(),
                action: kind,
                amount: applied,
                pot_total: self.live_pot(),
            },
        ));
        self.advance_after_action();
        Ok(())
    }

    fn reset_has_acted_except(&mut self, player_id: &str) {
        for player in self.players.values_mut() {
            if player.id != player_id && player.status == PlayerStatus::Playing {
                player.has_acted = false;
            }
        }
    }

    /// Pot plus every bet still sitting in front of a player.
    fn live_pot(&self) -> Chips {
        self.pots.total() + self.players.values().map(|p| p.current_bet).sum::<Chips>()
    }

    /// Players contesting the current hand. A Playing player without hole
    /// cards sat down mid-hand and waits for the next deal.
    fn active_players(&self) -> usize {
        self.players
            .values()
            .filter(|p| p.is_active() && p.in_hand())
            .count()
    }

    /// The betting round ends when every player still able to act has both
    /// acted and matched the current bet.
    fn is_round_complete(&self) -> bool {
        self.players
            .values()
            .filter(|p| p.status == PlayerStatus::Playing && p.in_hand())
            .all(|p| p.has_acted && p.current_bet == self.min_bet)
    }

    fn seat_can_act(&self, seat: Position) -> bool {
        self.seats[seat]
            .as_ref()
            .and_then(|id| self.players.get(id))
            .map(|p| p.can_act() && p.in_hand())
            .unwrap_or(false)
    }

    fn advance_after_action(&mut self) {
        if self.phase == GamePhase::Idle {
            return;
        }
        if self.active_players() <= 1 || self.is_round_complete() {
            self.next_street();
        } else {
            self.advance_turn();
        }
    }

    /// Turn bookkeeping after a fold that came in from the side (leave,
    /// stand-up, disconnect) rather than as the current player's action.
    fn after_departure(&mut self, player_id: &str) {
        if self.phase == GamePhase::Idle {
            return;
        }
        if self.active_players() <= 1 || self.is_round_complete() {
            self.next_street();
            return;
        }
        if !self.seat_can_act(self.current_pos)
            || self.seats[self.current_pos].as_deref() == Some(player_id)
        {
            self.advance_turn();
        }
    }

    fn advance_turn(&mut self) {
        for _ in 0..MAX_SEATS {
            self.current_pos = (self.current_pos + 1) % MAX_SEATS;
            if self.seat_can_act(self.current_pos) {
                self.schedule_action();
                return;
            }
        }
    }

    fn schedule_action(&mut self) {
        self.action_deadline = Some(Instant::now() + self.action_timeout);
        let deadline = epoch_now() + self.action_timeout.as_secs() as i64;
        if let Some(player_id) = self.seats[self.current_pos].clone() {
            self.emit(TableEvent::targeted(
                &self.id,
                &player_id,
                EventPayload::YourTurn { deadline },
            ));
        }
    }

    // ------------------------------------------------------------------
    // hand lifecycle
    // ------------------------------------------------------------------

    fn try_start_hand(&mut self) {
        if self.phase != GamePhase::Idle {
            return;
        }
        let ready = self
            .seats
            .iter()
            .flatten()
            .filter_map(|id| self.players.get(id))
            .filter(|p| p.status == PlayerStatus::Playing && p.chips > 0)
            .count();
        if ready >= self.min_players {
            log::info!("[table {}] auto-starting hand with {} players", self.id, ready);
            self.start_hand();
        }
    }

    fn start_hand(&mut self) {
        self.deck = Deck::shuffled();
        self.community.clear();
        self.pots = PotManager::new();
        self.phase = GamePhase::PreFlop;
        let mut big = self.big_blind;
        let mut small = big / 2;
        if small == 0 {
            small = FALLBACK_S_BLIND;
            big = FALLBACK_B_BLIND;
        }
        self.min_bet = big;

        // Participants in seat order, then make sure the button sits on one.
        let participants = self.participant_seats();
        if !participants.contains(&self.dealer_pos) {
            self.dealer_pos = self
                .next_seat_in(&participants, self.dealer_pos)
                .unwrap_or(self.dealer_pos);
        }

        for seat in &participants {
            let id = self.seats[*seat].clone().expect("participant seat");
            let cards = self.deck.draw(2);
            if let Some(player) = self.players.get_mut(&id) {
                player.hole_cards = cards;
                player.current_bet = 0;
                player.has_acted = false;
            }
        }

        self.emit(TableEvent::broadcast(
            &self.id,
            EventPayload::HandStart {
                dealer: self.dealer_pos,
                players: self.seat_snapshots(),
            },
        ));
        for seat in &participants {
            if let Some(id) = self.seats[*seat].clone() {
                let cards = self.players[&id].hole_cards.clone();
                self.emit(TableEvent::targeted(
                    &self.id,
                    &id,
                    EventPayload::HoleCards { cards },
                ));
            }
        }

        let big_blind_seat = self.post_blinds(&participants, small, big);

        // Heads-up the dealer is the small blind and opens the betting;
        // three-handed and up the first seat after the big blind opens.
        let first = if participants.len() == 2 {
            self.first_actor_from(self.dealer_pos)
        } else {
            big_blind_seat.and_then(|seat| self.first_actor_after(seat))
        };
        self.begin_round(first);
    }

    /// Seats whose occupants take part in the next hand, in seat order.
    fn participant_seats(&self) -> Vec<Position> {
        self.seats
            .iter()
            .enumerate()
            .filter(|(_, id)| {
                id.as_ref()
                    .and_then(|id| self.players.get(id))
                    .map(|p| p.status == PlayerStatus::Playing && p.chips > 0)
                    .unwrap_or(false)
            })
            .map(|(seat, _)| seat)
            .collect()
    }

    fn next_seat_in(&self, seats: &[Position], from: Position) -> Option<Position> {
        (1..=MAX_SEATS)
            .map(|i| (from + i) % MAX_SEATS)
            .find(|seat| seats.contains(seat))
    }

    /// Posts blinds and returns the big blind seat. A short stack posts what
    /// it has and goes all-in.
    fn post_blinds(
        &mut self,
        participants: &[Position],
        small: Chips,
        big: Chips,
    ) -> Option<Position> {
        if participants.len() < MIN_PLAYERS {
            return None;
        }
        let (small_seat, big_seat) = if participants.len() == 2 {
            let other = participants
                .iter()
                .copied()
                .find(|seat| *seat != self.dealer_pos)?;
            (self.dealer_pos, other)
        } else {
            let small_seat = self.next_seat_in(participants, self.dealer_pos)?;
            let big_seat = self.next_seat_in(participants, small_seat)?;
            (small_seat, big_seat)
        };
        let mut posts = Vec::new();
        for (seat, kind, amount) in [(small_seat, "small", small), (big_seat, "big", big)] {
            if let Some(id) = self.seats[seat].clone() {
                if let Some(player) = self.players.get_mut(&id) {
                    let posted = amount.min(player.chips);
                    player.chips -= posted;
                    player.current_bet = posted;
                    if player.chips == 0 {
                        player.status = PlayerStatus::AllIn;
                    }
                    log::debug!(
                        "[table {}] {} posts {} blind {} ({} behind)",
                        self.id,
                        id,
                        kind,
                        posted,
                        player.chips
                    );
                    posts.push(BlindPost {
                        player_id: id,
                        kind,
                        amount: posted,
                    });
                }
            }
        }
        self.emit(TableEvent::broadcast(
            &self.id,
            EventPayload::BlindsPosted { posts },
        ));
        Some(big_seat)
    }

    fn first_actor_from(&self, seat: Position) -> Option<Position> {
        (0..MAX_SEATS)
            .map(|i| (seat + i) % MAX_SEATS)
            .find(|pos| self.seat_can_act(*pos))
    }

    fn first_actor_after(&self, seat: Position) -> Option<Position> {
        self.first_actor_from((seat + 1) % MAX_SEATS)
    }

    /// Hands the action to `first`, or runs the board out when nobody can
    /// act any more (everyone all-in).
    fn begin_round(&mut self, first: Option<Position>) {
        match first {
            Some(pos) if !self.is_round_complete() => {
                self.current_pos = pos;
                self.schedule_action();
            }
            _ => self.next_street(),
        }
    }

    /// Closes the current betting round: folds bets into the pots and either
    /// settles the hand or deals the next street.
    fn next_street(&mut self) {
        if self.active_players() <= 1 {
            self.collect_bets();
            let total = self.pots.total();
            if let Some(winner) = self
                .players
                .values()
                .find(|p| p.is_active() && p.in_hand())
                .map(|p| p.id.clone())
            {
                if let Some(player) = self.players.get_mut(&winner) {
                    player.chips += total;
                }
                log::info!(
                    "[table {}] {} wins {} (all others folded)",
                    self.id,
                    winner,
                    total
                );
                self.emit(TableEvent::broadcast(
                    &self.id,
                    EventPayload::WinByFold {
                        player_id: winner,
                        amount: total,
                    },
                ));
            }
            self.end_hand();
            return;
        }
        self.collect_bets();
        for player in self.players.values_mut() {
            player.has_acted = false;
        }
        self.min_bet = 0;
        match self.phase {
            GamePhase::PreFlop => {
                self.phase = GamePhase::Flop;
                self.deal_street(3);
            }
            GamePhase::Flop => {
                self.phase = GamePhase::Turn;
                self.deal_street(1);
            }
            GamePhase::Turn => {
                self.phase = GamePhase::River;
                self.deal_street(1);
            }
            GamePhase::River => {
                self.phase = GamePhase::Showdown;
                self.showdown();
                return;
            }
            GamePhase::Idle | GamePhase::Showdown => return,
        }
        self.begin_round(self.first_actor_after(self.dealer_pos));
    }

    fn collect_bets(&mut self) {
        let bets = self
            .players
            .values()
            .filter(|p| p.current_bet > 0)
            .map(|p| (p.id.clone(), p.current_bet))
            .collect::<BTreeMap<String, Chips>>();
        self.pots.accumulate(&bets);
        for player in self.players.values_mut() {
            player.current_bet = 0;
        }
    }

    /// Burns one card, then reveals `n` to the community.
    fn deal_street(&mut self, n: usize) {
        self.deck.draw(1);
        let cards = self.deck.draw(n);
        self.community.extend_from_slice(&cards);
        log::debug!(
            "[table {}] dealing {}: {}",
            self.id,
            self.phase.street(),
            self.community.iter().map(Card::to_string).collect::<String>()
        );
        self.emit(TableEvent::broadcast(
            &self.id,
            EventPayload::CommunityCards {
                street: self.phase.street(),
                cards,
                board: self.community.clone(),
            },
        ));
    }

    fn showdown(&mut self) {
        let priority = self.payout_priority();
        let results = distribute(self.pots.pots(), &self.players, &self.community, &priority);
        for (id, amount) in payouts(&results) {
            if let Some(player) = self.players.get_mut(&id) {
                player.chips += amount;
                log::info!(
                    "[table {}] {} wins {} at showdown ({} total)",
                    self.id,
                    id,
                    amount,
                    player.chips
                );
            }
        }
        self.emit(TableEvent::broadcast(
            &self.id,
            EventPayload::ShowdownResult {
                pots: results
                    .iter()
                    .map(|r| PotPayout {
                        amount: r.amount,
                        winners: r
                            .winners
                            .iter()
                            .map(|(id, amount)| ChipAward {
                                player_id: id.clone(),
                                amount: *amount,
                            })
                            .collect(),
                    })
                    .collect(),
            },
        ));
        self.end_hand();
    }

    /// Occupied seats clockwise starting left of the dealer; breaks ties in
    /// split pots and orders remainder chips.
    fn payout_priority(&self) -> Vec<String> {
        (1..=MAX_SEATS)
            .map(|i| (self.dealer_pos + i) % MAX_SEATS)
            .filter_map(|seat| self.seats[seat].clone())
            .collect()
    }

    fn end_hand(&mut self) {
        self.rotate_dealer();
        for player in self.players.values_mut() {
            player.hole_cards.clear();
            player.current_bet = 0;
            player.has_acted = false;
            if matches!(player.status, PlayerStatus::Folded | PlayerStatus::AllIn) {
                player.status = if player.chips > 0 {
                    PlayerStatus::Playing
                } else {
                    PlayerStatus::SittingOut
                };
            }
        }
        self.action_deadline = None;
        let snapshot = self
            .players
            .iter()
            .map(|(id, p)| (id.clone(), p.chips))
            .collect::<HashMap<String, Chips>>();
        for player_id in std::mem::take(&mut self.pending_removal) {
            self.players.remove(&player_id);
            self.disconnected.remove(&player_id);
        }
        self.pots = PotManager::new();
        self.phase = GamePhase::Idle;
        log::info!("[table {}] hand complete", self.id);
        self.emit(TableEvent::broadcast(
            &self.id,
            EventPayload::HandEnd {
                players: snapshot
                    .iter()
                    .map(|(id, chips)| ChipAward {
                        player_id: id.clone(),
                        amount: *chips,
                    })
                    .collect(),
            },
        ));
        if let Some(callback) = &self.on_hand_complete {
            callback(self.id.clone(), snapshot);
        }
    }

    /// Button moves to the next seat whose occupant has chips and is not
    /// sitting out. Folded and all-in occupants count; they reset to Playing
    /// before the next deal.
    fn rotate_dealer(&mut self) {
        for i in 1..=MAX_SEATS {
            let pos = (self.dealer_pos + i) % MAX_SEATS;
            let eligible = self.seats[pos]
                .as_ref()
                .and_then(|id| self.players.get(id))
                .map(|p| p.chips > 0 && p.status != PlayerStatus::SittingOut)
                .unwrap_or(false);
            if eligible {
                self.dealer_pos = pos;
                return;
            }
        }
    }

    // ------------------------------------------------------------------
    // timers
    // ------------------------------------------------------------------

    fn sweep_action_deadline(&mut self) {
        if self.phase == GamePhase::Idle {
            return;
        }
        let expired = self
            .action_deadline
            .map(|deadline| Instant::now() > deadline)
            .unwrap_or(false);
        if !expired {
            return;
        }
        self.action_deadline = None;
        let Some(player_id) = self.seats[self.current_pos].clone() else {
            return;
        };
        let can_check = self
            .players
            .get(&player_id)
            .map(|p| p.current_bet >= self.min_bet)
            .unwrap_or(false);
        let kind = if can_check {
            ActionKind::Check
        } else {
            ActionKind::Fold
        };
        log::info!(
            "[table {}] {} timed out, auto {}",
            self.id,
            player_id,
            kind
        );
        let _ = self.game_action(&player_id, kind, 0);
    }

    fn sweep_disconnects(&mut self) {
        let now = Instant::now();
        let expired = self
            .disconnected
            .iter()
            .filter(|(_, since)| now.duration_since(**since) > self.disconnect_timeout)
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();
        for player_id in expired {
            self.disconnected.remove(&player_id);
            log::warn!(
                "[table {}] {} disconnect timeout, removing from play",
                self.id,
                player_id
            );
            if self.phase.is_betting()
                && self.seats[self.current_pos].as_deref() == Some(player_id.as_str())
            {
                let _ = self.game_action(&player_id, ActionKind::Fold, 0);
            }
            match self.players.get(&player_id).map(|p| p.status) {
                None | Some(PlayerStatus::AllIn) => continue,
                Some(_) if self.phase == GamePhase::Idle => self.remove_player(&player_id),
                Some(_) => {
                    // Mid-hand: stand up and release the seat; committed bets
                    // stay behind for pot accounting until the hand ends.
                    let seat = self.players.get_mut(&player_id).map(|player| {
                        let _ = player.stand_up();
                        std::mem::replace(&mut player.seat_index, -1)
                    });
                    if let Some(seat) = seat.filter(|s| *s >= 0) {
                        self.seats[seat as usize] = None;
                    }
                    self.pending_removal.insert(player_id.clone());
                    self.after_departure(&player_id);
                }
            }
            self.emit_state();
        }
    }

    // ------------------------------------------------------------------
    // events
    // ------------------------------------------------------------------

    fn emit(&self, event: TableEvent) {
        log::trace!("[table {}] emit {}", self.id, event);
        (self.sink)(event);
    }

    fn seat_snapshots(&self) -> Vec<SeatSnapshot> {
        let mut snapshots = self
            .players
            .values()
            .map(SeatSnapshot::from)
            .collect::<Vec<_>>();
        snapshots.sort_by_key(|s| s.seat_index);
        snapshots
    }

    fn emit_state(&self) {
        self.emit(TableEvent::broadcast(
            &self.id,
            EventPayload::TableState {
                players: self.seat_snapshots(),
                community_cards: self.community.clone(),
                dealer_pos: self.dealer_pos,
                current_pos: self.current_pos,
                min_bet: self.min_bet,
                pot_total: self.live_pot(),
            },
        ));
    }
}

fn epoch_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    fn sink() -> EventSink {
        Arc::new(|_| {})
    }

    fn collector() -> (EventSink, Arc<Mutex<Vec<TableEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let tap = events.clone();
        let sink: EventSink = Arc::new(move |event| tap.lock().expect("events").push(event));
        (sink, events)
    }

    /// Table with players seated in order and already sitting down.
    fn table_with(stacks: &[(&str, Chips)]) -> Table {
        let mut table = Table::new("t1", sink());
        for (seat, (id, chips)) in stacks.iter().enumerate() {
            table.join(Player::new(*id, *chips), seat).unwrap();
            table.sit_down(id).unwrap();
        }
        table
    }

    fn rig(table: &mut Table, holes: &[(&str, &str)], run_out: &str) {
        for (id, cards) in holes {
            table.players.get_mut(*id).unwrap().hole_cards = Card::parse(cards).unwrap();
        }
        table.deck = Deck::from(Card::parse(run_out).unwrap());
    }

    fn chips(table: &Table, id: &str) -> Chips {
        table.players[id].chips
    }

    fn total_chips(table: &Table) -> Chips {
        table.players.values().map(|p| p.chips).sum::<Chips>() + table.live_pot()
    }

    #[test]
    fn heads_up_full_hand() {
        let mut table = table_with(&[("p1", 1000), ("p2", 1000)]);
        table.try_start_hand();
        assert_eq!(table.phase, GamePhase::PreFlop);
        // Dealer p1 posted the small blind and acts first.
        assert_eq!(chips(&table, "p1"), 990);
        assert_eq!(chips(&table, "p2"), 980);
        assert_eq!(table.current_pos, 0);
        // Burn, flop, burn, turn, burn, river.
        rig(
            &mut table,
            &[("p1", "As Ad"), ("p2", "Ks Kd")],
            "7h 2c 3c 4c 8h 5c 9h 9d",
        );
        let bankroll = total_chips(&table);

        table.game_action("p1", ActionKind::Call, 0).unwrap();
        table.game_action("p2", ActionKind::Check, 0).unwrap();
        assert_eq!(table.phase, GamePhase::Flop);
        assert_eq!(table.community, Card::parse("2c 3c 4c").unwrap());
        // Post-flop the big blind acts first.
        assert_eq!(table.current_pos, 1);

        table.game_action("p2", ActionKind::Check, 0).unwrap();
        table.game_action("p1", ActionKind::Check, 0).unwrap();
        assert_eq!(table.phase, GamePhase::Turn);
        table.game_action("p2", ActionKind::Check, 0).unwrap();
        table.game_action("p1", ActionKind::Check, 0).unwrap();
        assert_eq!(table.phase, GamePhase::River);
        assert_eq!(table.community, Card::parse("2c 3c 4c 5c 9d").unwrap());

        table.game_action("p2", ActionKind::Check, 0).unwrap();
        table.game_action("p1", ActionKind::Bet, 100).unwrap();
        table.game_action("p2", ActionKind::Call, 0).unwrap();

        // p1's wheel beats p2's kings.
        assert_eq!(table.phase, GamePhase::Idle);
        assert_eq!(chips(&table, "p1"), 1120);
        assert_eq!(chips(&table, "p2"), 880);
        assert_eq!(total_chips(&table), bankroll);
    }

    #[test]
    fn all_in_stacks_build_side_pots() {
        let mut table = table_with(&[("p1", 100), ("p2", 200), ("p3", 500)]);
        table.try_start_hand();
        // Three-handed: p2 small blind, p3 big blind, dealer p1 opens.
        assert_eq!(table.current_pos, 0);
        rig(
            &mut table,
            &[("p1", "As Ad"), ("p2", "Ks Kd"), ("p3", "2s 7d")],
            "6h 3c 8d 9h 6s Jc 6c 4s",
        );

        table.game_action("p1", ActionKind::AllIn, 0).unwrap();
        table.game_action("p2", ActionKind::AllIn, 0).unwrap();
        table.game_action("p3", ActionKind::AllIn, 0).unwrap();

        // Board runs out with nobody left to act; pots are 300/200/300 and
        // the aces take the main, the kings the side, p3 only its refund.
        assert_eq!(table.phase, GamePhase::Idle);
        assert_eq!(chips(&table, "p1"), 300);
        assert_eq!(chips(&table, "p2"), 200);
        assert_eq!(chips(&table, "p3"), 300);
    }

    #[test]
    fn win_by_fold_ends_the_hand_early() {
        let mut table = table_with(&[("p1", 1000), ("p2", 1000)]);
        table.try_start_hand();
        let bankroll = total_chips(&table);
        table.game_action("p1", ActionKind::Fold, 0).unwrap();
        assert_eq!(table.phase, GamePhase::Idle);
        assert_eq!(chips(&table, "p1"), 990);
        assert_eq!(chips(&table, "p2"), 1010);
        assert_eq!(total_chips(&table), bankroll);
    }

    #[test]
    fn hand_auto_starts_when_enough_players_ready() {
        let mut table = table_with(&[("p1", 1000), ("p2", 1000), ("p3", 1000)]);
        table.try_start_hand();
        assert_ne!(table.phase, GamePhase::Idle);
        for id in ["p1", "p2", "p3"] {
            assert_eq!(table.players[id].hole_cards.len(), 2);
        }
        // Blinds are on the table.
        assert_eq!(table.live_pot(), 30);
    }

    #[test]
    fn lone_player_does_not_start_a_hand() {
        let mut table = table_with(&[("p1", 1000)]);
        table.try_start_hand();
        assert_eq!(table.phase, GamePhase::Idle);
    }

    #[test]
    fn turn_and_bet_validation() {
        let mut table = table_with(&[("p1", 1000), ("p2", 1000)]);
        table.try_start_hand();
        // p1 (dealer) to act.
        assert_eq!(
            table.game_action("p2", ActionKind::Fold, 0).unwrap_err(),
            TableError::NotYourTurn
        );
        assert_eq!(
            table.game_action("p1", ActionKind::Check, 0).unwrap_err(),
            TableError::CannotCheck
        );
        assert_eq!(
            table.game_action("p1", ActionKind::Raise, 5).unwrap_err(),
            TableError::BetTooLow
        );
        assert_eq!(
            table
                .game_action("p1", ActionKind::Raise, 5000)
                .unwrap_err(),
            TableError::InsufficientChips
        );
        // A valid raise still goes through afterwards.
        table.game_action("p1", ActionKind::Raise, 60).unwrap();
        assert_eq!(chips(&table, "p1"), 940);
    }

    #[test]
    fn short_blind_goes_all_in() {
        let mut table = table_with(&[("p1", 1000), ("p2", 15)]);
        table.try_start_hand();
        // p2 posts the big blind short and is all-in for 15.
        assert_eq!(chips(&table, "p2"), 0);
        assert_eq!(table.players["p2"].status, PlayerStatus::AllIn);
        assert_eq!(table.players["p2"].current_bet, 15);
    }

    #[test]
    fn disconnect_timeout_folds_and_releases_seat() {
        let mut table = table_with(&[("p1", 1000), ("p2", 1000), ("p3", 1000)])
            .with_timeouts(ACTION_TIMEOUT, Duration::ZERO);
        table.try_start_hand();
        assert_eq!(table.current_pos, 0);
        table.disconnect("p1");
        let backdated = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .unwrap_or_else(Instant::now);
        table.disconnected.insert("p1".into(), backdated);

        table.sweep_disconnects();

        let p1 = &table.players["p1"];
        assert_eq!(p1.status, PlayerStatus::SittingOut);
        assert_eq!(p1.seat_index, -1);
        assert!(table.seats[0].is_none());
        assert!(table.pending_removal.contains("p1"));
        // Hand goes on between the other two; the blinds stay in the pot.
        assert_ne!(table.phase, GamePhase::Idle);
        assert_eq!(table.live_pot(), 30);
        assert_ne!(table.current_pos, 0);
    }

    #[test]
    fn action_timeout_checks_when_possible_else_folds() {
        let mut table = table_with(&[("p1", 1000), ("p2", 1000)]);
        table.try_start_hand();
        // p1 owes chips to the big blind: timeout folds them.
        table.action_deadline = Instant::now().checked_sub(Duration::from_secs(1));
        table.sweep_action_deadline();
        assert_eq!(table.phase, GamePhase::Idle);
        assert_eq!(chips(&table, "p2"), 1010);
    }

    #[test]
    fn leave_mid_hand_keeps_bet_in_pot_and_removes_at_hand_end() {
        let mut table = table_with(&[("p1", 1000), ("p2", 1000), ("p3", 1000)]);
        table.try_start_hand();
        // p2 posted the small blind; leaving forfeits it into the pot.
        table.leave("p2").unwrap();
        assert!(table.seats[1].is_none());
        assert_eq!(table.players["p2"].seat_index, -1);
        assert_eq!(table.live_pot(), 30);
        // p1 folds, p3 collects, and p2's tombstone is gone.
        table.game_action("p1", ActionKind::Fold, 0).unwrap();
        assert_eq!(table.phase, GamePhase::Idle);
        assert!(!table.players.contains_key("p2"));
        assert_eq!(chips(&table, "p3"), 1010);
    }

    #[test]
    fn leave_rejected_while_all_in() {
        let mut table = table_with(&[("p1", 1000), ("p2", 1000)]);
        table.try_start_hand();
        table.game_action("p1", ActionKind::AllIn, 0).unwrap();
        assert_eq!(
            table.leave("p1").unwrap_err(),
            TableError::CannotLeaveAllIn
        );
    }

    #[test]
    fn join_validates_seats_and_identity() {
        let mut table = table_with(&[("p1", 1000)]);
        assert_eq!(
            table.join(Player::new("p2", 500), 0).unwrap_err(),
            TableError::SeatOccupied
        );
        assert_eq!(
            table.join(Player::new("p1", 500), 1).unwrap_err(),
            TableError::DuplicatePlayer
        );
        assert_eq!(
            table.join(Player::new("p2", 500), MAX_SEATS).unwrap_err(),
            TableError::SeatOutOfRange
        );
        assert!(table.join(Player::new("p2", 500), 1).is_ok());
    }

    #[test]
    fn sitting_down_mid_hand_waits_for_next_deal() {
        let mut table = table_with(&[("p1", 1000), ("p2", 1000)]);
        table.try_start_hand();
        table.join(Player::new("p3", 1000), 2).unwrap();
        table.sit_down("p3").unwrap();
        // p3 is Playing but not dealt in; the round completes without them.
        table.game_action("p1", ActionKind::Call, 0).unwrap();
        table.game_action("p2", ActionKind::Check, 0).unwrap();
        assert_eq!(table.phase, GamePhase::Flop);
        assert!(table.players["p3"].hole_cards.is_empty());
    }

    #[test]
    fn back_to_back_hands_alternate_blinds_and_conserve_chips() {
        let mut table = table_with(&[("p1", 1000), ("p2", 1000)]);
        table.try_start_hand();
        let bankroll = total_chips(&table);
        // Hand one: dealer p1 posts small and folds it away.
        table.game_action("p1", ActionKind::Fold, 0).unwrap();
        assert_eq!(table.dealer_pos, 1);
        // Hand two: the button has passed, so p2 posts small and folds.
        table.try_start_hand();
        assert_eq!(table.phase, GamePhase::PreFlop);
        assert_eq!(table.players["p2"].current_bet, 10);
        assert_eq!(table.players["p1"].current_bet, 20);
        assert_eq!(table.current_pos, 1);
        table.game_action("p2", ActionKind::Fold, 0).unwrap();
        assert_eq!(chips(&table, "p1"), 1000);
        assert_eq!(chips(&table, "p2"), 1000);
        assert_eq!(table.dealer_pos, 0);
        assert_eq!(total_chips(&table), bankroll);
    }

    #[test]
    fn dealer_rotates_between_hands() {
        let mut table = table_with(&[("p1", 1000), ("p2", 1000)]);
        table.try_start_hand();
        assert_eq!(table.dealer_pos, 0);
        table.game_action("p1", ActionKind::Fold, 0).unwrap();
        assert_eq!(table.dealer_pos, 1);
    }

    #[test]
    fn hand_complete_callback_receives_chip_snapshot() {
        let snapshot = Arc::new(Mutex::new(HashMap::new()));
        let tap = snapshot.clone();
        let mut table = table_with(&[("p1", 1000), ("p2", 1000)]).on_hand_complete(Arc::new(
            move |_, chips| {
                *tap.lock().expect("snapshot") = chips;
            },
        ));
        table.try_start_hand();
        table.game_action("p1", ActionKind::Fold, 0).unwrap();
        let snapshot = snapshot.lock().expect("snapshot");
        assert_eq!(snapshot["p1"], 990);
        assert_eq!(snapshot["p2"], 1010);
    }

    #[test]
    fn events_follow_the_hand() {
        let (sink, events) = collector();
        let mut table = Table::new("t1", sink);
        table.join(Player::new("p1", 1000), 0).unwrap();
        table.join(Player::new("p2", 1000), 1).unwrap();
        table.sit_down("p1").unwrap();
        table.sit_down("p2").unwrap();
        table.try_start_hand();
        table.game_action("p1", ActionKind::Fold, 0).unwrap();

        let kinds = events
            .lock()
            .expect("events")
            .iter()
            .map(|e| e.kind())
            .collect::<Vec<_>>();
        for expected in [
            "HAND_START",
            "HOLE_CARDS",
            "BLINDS_POSTED",
            "YOUR_TURN",
            "PLAYER_ACTION",
            "WIN_BY_FOLD",
            "HAND_END",
        ] {
            assert!(kinds.contains(&expected), "missing {}", expected);
        }
        // Hole cards go to their owner only.
        let events = events.lock().expect("events");
        for event in events.iter() {
            if matches!(event.payload, EventPayload::HoleCards { .. }) {
                assert!(event.target.is_some());
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn actor_auto_starts_over_its_command_channel() {
        let (sink, events) = collector();
        let handle = Table::new("t1", sink)
            .with_timeouts(ACTION_TIMEOUT, DISCONNECT_TIMEOUT)
            .spawn();
        for (id, seat) in [("p1", 0), ("p2", 1)] {
            handle
                .submit(|reply| TableCommand::Join {
                    player: Player::new(id, 1000),
                    seat,
                    reply: Some(reply),
                })
                .await
                .unwrap();
            handle
                .submit(|reply| TableCommand::SitDown {
                    player_id: id.into(),
                    reply: Some(reply),
                })
                .await
                .unwrap();
        }
        // One tick is enough for the scheduling loop to open the hand.
        tokio::time::sleep(Duration::from_secs(2)).await;
        let kinds = events
            .lock()
            .expect("events")
            .iter()
            .map(|e| e.kind())
            .collect::<Vec<_>>();
        assert!(kinds.contains(&"HAND_START"));
        assert!(kinds.contains(&"BLINDS_POSTED"));
        handle.close();
    }

    #[tokio::test]
    async fn actor_rejects_conflicting_joins() {
        let handle = Table::new("t1", sink()).spawn();
        handle
            .submit(|reply| TableCommand::Join {
                player: Player::new("p1", 1000),
                seat: 0,
                reply: Some(reply),
            })
            .await
            .unwrap();
        let err = handle
            .submit(|reply| TableCommand::Join {
                player: Player::new("p2", 1000),
                seat: 0,
                reply: Some(reply),
            })
            .await
            .unwrap_err();
        assert_eq!(err, TableError::SeatOccupied);
        handle.close();
    }
}
