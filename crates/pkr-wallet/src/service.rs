use super::error::StoreError;
use super::models::GameSession;
use super::models::PlayerProfile;
use super::models::TransactionType;
use super::models::Wallet;
use super::repository::ProfileRepository;
use super::repository::SessionRepository;
use super::repository::WalletRepository;
use super::Db;
use pkr_core::Chips;
use pkr_core::ID;

/// Receipt for a completed buy-in.
#[derive(Debug, Clone)]
pub struct BuyInReceipt {
    pub session_id: ID<GameSession>,
    pub player_id: ID<PlayerProfile>,
    pub table_id: String,
    pub chips: Chips,
    pub wallet_balance: Chips,
}

/// Receipt for a completed cash-out.
#[derive(Debug, Clone)]
pub struct CashOutReceipt {
    pub session_id: ID<GameSession>,
    pub player_id: ID<PlayerProfile>,
    pub buy_in_amount: Chips,
    pub cash_out_amount: Chips,
    pub profit: Chips,
    pub wallet_balance: Chips,
}

/// Money orchestration between wallets and game sessions.
///
/// Buy-in and cash-out each run in one database transaction with the wallet
/// row locked for the duration; the idempotency keys make retries after
/// ambiguous failures safe.
pub struct GameService {
    db: Db,
    currency: String,
}

impl GameService {
    pub fn new(db: Db, currency: impl Into<String>) -> Self {
        Self {
            db,
            currency: currency.into(),
        }
    }

    /// Debits the wallet and opens a game session, atomically.
    pub async fn buy_in(
        &self,
        player_id: ID<PlayerProfile>,
        table_id: &str,
        amount: Chips,
    ) -> Result<BuyInReceipt, StoreError> {
        if amount <= 0 {
            return Err(StoreError::InvalidAmount);
        }
        let mut client = self.db.lock().await;
        client
            .profile_by_id(player_id)
            .await?
            .ok_or(StoreError::PlayerNotFound)?;
        if client.active_session_by_player(player_id).await?.is_some() {
            log::warn!("[game] {} already has an active session", player_id);
            return Err(StoreError::SessionAlreadyActive);
        }
        let tx = client.transaction().await?;
        let wallet = tx.wallet_with_lock(player_id).await?;
        if !wallet.can_debit(amount) {
            return Err(StoreError::InsufficientBalance);
        }
        let key = format!("buyin-{}-{}-{}", player_id, table_id, nanos());
        tx.debit(
            player_id,
            amount,
            TransactionType::BuyIn,
            &format!("Buy-in to table {}", table_id),
            &key,
            None,
        )
        .await?;
        let session = GameSession::new(player_id, table_id.to_string(), amount);
        tx.create_session(&session).await?;
        let balance = tx
            .wallet_by_player(player_id)
            .await?
            .ok_or(StoreError::WalletNotFound)?
            .balance;
        tx.commit().await?;
        log::info!(
            "[game] buy-in ok: player {} table {} amount {} balance {}",
            player_id,
            table_id,
            amount,
            balance
        );
        Ok(BuyInReceipt {
            session_id: session.id,
            player_id,
            table_id: table_id.to_string(),
            chips: amount,
            wallet_balance: balance,
        })
    }

    /// Credits the final chips back to the wallet and ends the session,
    /// atomically. `chips` may be zero when the player busted.
    pub async fn cash_out(
        &self,
        player_id: ID<PlayerProfile>,
        session_id: ID<GameSession>,
        chips: Chips,
    ) -> Result<CashOutReceipt, StoreError> {
        if chips < 0 {
            return Err(StoreError::InvalidAmount);
        }
        let mut client = self.db.lock().await;
        let session = client
            .session_by_id(session_id)
            .await?
            .ok_or(StoreError::SessionNotFound)?;
        if session.player_id != player_id {
            return Err(StoreError::SessionNotOwned);
        }
        if session.status != super::models::SessionStatus::Active {
            return Err(StoreError::SessionNotActive);
        }
        let tx = client.transaction().await?;
        if chips > 0 {
            let key = format!("cashout-{}-{}-{}", player_id, session_id, nanos());
            tx.credit(
                player_id,
                chips,
                TransactionType::CashOut,
                &format!("Cash-out from table {}", session.table_id),
                &key,
                Some(session_id),
            )
            .await?;
        }
        tx.end_session(session_id, chips).await?;
        let balance = tx
            .wallet_by_player(player_id)
            .await?
            .ok_or(StoreError::WalletNotFound)?
            .balance;
        tx.commit().await?;
        let profit = chips - session.buy_in_amount;
        log::info!(
            "[game] cash-out ok: player {} session {} chips {} profit {}",
            player_id,
            session_id,
            chips,
            profit
        );
        Ok(CashOutReceipt {
            session_id,
            player_id,
            buy_in_amount: session.buy_in_amount,
            cash_out_amount: chips,
            profit,
            wallet_balance: balance,
        })
    }

    /// Mirrors in-memory chips onto the session row. Not money movement;
    /// callers fire it asynchronously and only log failures.
    pub async fn update_session_chips(
        &self,
        session_id: ID<GameSession>,
        chips: Chips,
    ) -> Result<(), StoreError> {
        let client = self.db.lock().await;
        client.update_session_chips(session_id, chips).await
    }

    /// Applies per-hand stat deltas to a player profile.
    pub async fn record_hand_result(
        &self,
        player_id: ID<PlayerProfile>,
        hands_played: i32,
        hands_won: i32,
        winnings: Chips,
    ) -> Result<(), StoreError> {
        let client = self.db.lock().await;
        client
            .update_profile_stats(player_id, hands_played, hands_won, winnings)
            .await
    }

    /// Idempotent wallet provisioning; no ledger entry.
    pub async fn ensure_wallet_exists(
        &self,
        player_id: ID<PlayerProfile>,
    ) -> Result<(), StoreError> {
        let client = self.db.lock().await;
        if client.wallet_by_player(player_id).await?.is_some() {
            return Ok(());
        }
        let wallet = Wallet::new(player_id, self.currency.clone());
        client.create_wallet(&wallet).await?;
        log::info!("[game] wallet created for player {}", player_id);
        Ok(())
    }

    pub async fn player_balance(
        &self,
        player_id: ID<PlayerProfile>,
    ) -> Result<Wallet, StoreError> {
        let client = self.db.lock().await;
        client
            .wallet_by_player(player_id)
            .await?
            .ok_or(StoreError::WalletNotFound)
    }

    pub async fn active_session(
        &self,
        player_id: ID<PlayerProfile>,
    ) -> Result<GameSession, StoreError> {
        let client = self.db.lock().await;
        client
            .active_session_by_player(player_id)
            .await?
            .ok_or(StoreError::SessionNotFound)
    }
}

fn nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}
