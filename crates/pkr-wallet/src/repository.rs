use super::error::StoreError;
use super::models::Account;
use super::models::AccountStatus;
use super::models::GameSession;
use super::models::PlayerProfile;
use super::models::SessionStatus;
use super::models::TransactionType;
use super::models::Wallet;
use super::models::WalletTransaction;
use super::schema::ACCOUNTS;
use super::schema::GAME_SESSIONS;
use super::schema::PLAYERS;
use super::schema::TRANSACTIONS;
use super::schema::WALLETS;
use chrono::DateTime;
use chrono::Utc;
use const_format::concatcp;
use pkr_core::Chips;
use pkr_core::ID;
use tokio_postgres::GenericClient;
use tokio_postgres::Row;

// Repository traits are implemented for every GenericClient so the same SQL
// runs against a bare connection or inside a transaction with the row lock
// held.

fn account_from(row: &Row) -> Account {
    Account {
        id: ID::from(row.get::<_, uuid::Uuid>(0)),
        username: row.get(1),
        email: row.get(2),
        password_hash: row.get(3),
        status: AccountStatus::from(row.get::<_, &str>(4)),
        email_verified: row.get(5),
        failed_login_attempts: row.get(6),
        locked_until: row.get(7),
        last_login_at: row.get(8),
        last_login_ip: row.get(9),
    }
}

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, status, email_verified, \
     failed_login_attempts, locked_until, last_login_at, last_login_ip";

/// Account persistence used by registration and login.
#[allow(async_fn_in_trait)]
pub trait AccountRepository {
    async fn create_account(&self, account: &Account) -> Result<(), StoreError>;
    async fn account_by_id(&self, id: ID<Account>) -> Result<Option<Account>, StoreError>;
    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;
    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    async fn update_last_login(&self, id: ID<Account>, ip: &str) -> Result<(), StoreError>;
    /// Returns the new failure count so the caller can decide on a lockout.
    async fn bump_failed_logins(&self, id: ID<Account>) -> Result<i32, StoreError>;
    async fn reset_failed_logins(&self, id: ID<Account>) -> Result<(), StoreError>;
    async fn lock_account(
        &self,
        id: ID<Account>,
        until: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

impl<C: GenericClient + Sync> AccountRepository for C {
    async fn create_account(&self, account: &Account) -> Result<(), StoreError> {
        self.execute(
            concatcp!(
                "INSERT INTO ",
                ACCOUNTS,
                " (id, username, email, password_hash, status, email_verified) \
                 VALUES ($1, $2, $3, $4, $5, $6)"
            ),
            &[
                &account.id.inner(),
                &account.username,
                &account.email,
                &account.password_hash,
                &account.status.as_str(),
                &account.email_verified,
            ],
        )
        .await?;
        Ok(())
    }

    async fn account_by_id(&self, id: ID<Account>) -> Result<Option<Account>, StoreError> {
        Ok(self
            .query_opt(
                concatcp!("SELECT ", ACCOUNT_COLUMNS, " FROM ", ACCOUNTS, " WHERE id = $1"),
                &[&id.inner()],
            )
            .await?
            .map(|row| account_from(&row)))
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .query_opt(
                concatcp!(
                    "SELECT ",
                    ACCOUNT_COLUMNS,
                    " FROM ",
                    ACCOUNTS,
                    " WHERE username = $1"
                ),
                &[&username],
            )
            .await?
            .map(|row| account_from(&row)))
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .query_opt(
                concatcp!(
                    "SELECT ",
                    ACCOUNT_COLUMNS,
                    " FROM ",
                    ACCOUNTS,
                    " WHERE email = $1"
                ),
                &[&email],
            )
            .await?
            .map(|row| account_from(&row)))
    }

    async fn update_last_login(&self, id: ID<Account>, ip: &str) -> Result<(), StoreError> {
        self.execute(
            concatcp!(
                "UPDATE ",
                ACCOUNTS,
                " SET last_login_at = now(), last_login_ip = $2, updated_at = now() \
                 WHERE id = $1"
            ),
            &[&id.inner(), &ip],
        )
        .await?;
        Ok(())
    }

    async fn bump_failed_logins(&self, id: ID<Account>) -> Result<i32, StoreError> {
        let row = self
            .query_one(
                concatcp!(
                    "UPDATE ",
                    ACCOUNTS,
                    " SET failed_login_attempts = failed_login_attempts + 1, updated_at = now() \
                     WHERE id = $1 RETURNING failed_login_attempts"
                ),
                &[&id.inner()],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn reset_failed_logins(&self, id: ID<Account>) -> Result<(), StoreError> {
        self.execute(
            concatcp!(
                "UPDATE ",
                ACCOUNTS,
                " SET failed_login_attempts = 0, locked_until = NULL, updated_at = now() \
                 WHERE id = $1"
            ),
            &[&id.inner()],
        )
        .await?;
        Ok(())
    }

    async fn lock_account(
        &self,
        id: ID<Account>,
        until: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.execute(
            concatcp!(
                "UPDATE ",
                ACCOUNTS,
                " SET locked_until = $2, updated_at = now() WHERE id = $1"
            ),
            &[&id.inner(), &until],
        )
        .await?;
        Ok(())
    }
}

fn profile_from(row: &Row) -> PlayerProfile {
    PlayerProfile {
        id: ID::from(row.get::<_, uuid::Uuid>(0)),
        account_id: ID::from(row.get::<_, uuid::Uuid>(1)),
        display_name: row.get(2),
        hands_played: row.get(3),
        hands_won: row.get(4),
        total_winnings: row.get(5),
    }
}

const PROFILE_COLUMNS: &str =
    "id, account_id, display_name, hands_played, hands_won, total_winnings";

/// Player profile persistence, including running stats.
#[allow(async_fn_in_trait)]
pub trait ProfileRepository {
    async fn create_profile(&self, profile: &PlayerProfile) -> Result<(), StoreError>;
    async fn profile_by_id(
        &self,
        id: ID<PlayerProfile>,
    ) -> Result<Option<PlayerProfile>, StoreError>;
    async fn profile_by_account(
        &self,
        account_id: ID<Account>,
    ) -> Result<Option<PlayerProfile>, StoreError>;
    /// Applies per-hand deltas to the running totals.
    async fn update_profile_stats(
        &self,
        id: ID<PlayerProfile>,
        hands_played: i32,
        hands_won: i32,
        winnings: Chips,
    ) -> Result<(), StoreError>;
    async fn top_profiles_by_winnings(
        &self,
        limit: i64,
    ) -> Result<Vec<PlayerProfile>, StoreError>;
}

impl<C: GenericClient + Sync> ProfileRepository for C {
    async fn create_profile(&self, profile: &PlayerProfile) -> Result<(), StoreError> {
        self.execute(
            concatcp!(
                "INSERT INTO ",
                PLAYERS,
                " (id, account_id, display_name) VALUES ($1, $2, $3)"
            ),
            &[
                &profile.id.inner(),
                &profile.account_id.inner(),
                &profile.display_name,
            ],
        )
        .await?;
        Ok(())
    }

    async fn profile_by_id(
        &self,
        id: ID<PlayerProfile>,
    ) -> Result<Option<PlayerProfile>, StoreError> {
        Ok(self
            .query_opt(
                concatcp!("SELECT ", PROFILE_COLUMNS, " FROM ", PLAYERS, " WHERE id = $1"),
                &[&id.inner()],
            )
            .await?
            .map(|row| profile_from(&row)))
    }

    async fn profile_by_account(
        &self,
        account_id: ID<Account>,
    ) -> Result<Option<PlayerProfile>, StoreError> {
        Ok(self
            .query_opt(
                concatcp!(
                    "SELECT ",
                    PROFILE_COLUMNS,
                    " FROM ",
                    PLAYERS,
                    " WHERE account_id = $1"
                ),
                &[&account_id.inner()],
            )
            .await?
            .map(|row| profile_from(&row)))
    }

    async fn update_profile_stats(
        &self,
        id: ID<PlayerProfile>,
        hands_played: i32,
        hands_won: i32,
        winnings: Chips,
    ) -> Result<(), StoreError> {
        self.execute(
            concatcp!(
                "UPDATE ",
                PLAYERS,
                " SET hands_played = hands_played + $2, hands_won = hands_won + $3, \
                 total_winnings = total_winnings + $4, updated_at = now() WHERE id = $1"
            ),
            &[&id.inner(), &hands_played, &hands_won, &winnings],
        )
        .await?;
        Ok(())
    }

    async fn top_profiles_by_winnings(
        &self,
        limit: i64,
    ) -> Result<Vec<PlayerProfile>, StoreError> {
        Ok(self
            .query(
                concatcp!(
                    "SELECT ",
                    PROFILE_COLUMNS,
                    " FROM ",
                    PLAYERS,
                    " ORDER BY total_winnings DESC LIMIT $1"
                ),
                &[&limit],
            )
            .await?
            .iter()
            .map(profile_from)
            .collect())
    }
}

fn wallet_from(row: &Row) -> Wallet {
    Wallet {
        id: ID::from(row.get::<_, uuid::Uuid>(0)),
        player_id: ID::from(row.get::<_, uuid::Uuid>(1)),
        balance: row.get(2),
        locked_balance: row.get(3),
        currency: row.get(4),
        version: row.get(5),
    }
}

const WALLET_COLUMNS: &str = "id, player_id, balance, locked_balance, currency, version";

/// Wallet persistence. All monetary mutations are expected to run on a
/// transaction with the wallet row locked; the idempotency key is the
/// authoritative replay boundary.
#[allow(async_fn_in_trait)]
pub trait WalletRepository {
    async fn create_wallet(&self, wallet: &Wallet) -> Result<(), StoreError>;
    async fn wallet_by_player(
        &self,
        player_id: ID<PlayerProfile>,
    ) -> Result<Option<Wallet>, StoreError>;
    /// Reads the wallet under `FOR UPDATE`; call inside a transaction.
    async fn wallet_with_lock(
        &self,
        player_id: ID<PlayerProfile>,
    ) -> Result<Wallet, StoreError>;
    async fn credit(
        &self,
        player_id: ID<PlayerProfile>,
        amount: Chips,
        kind: TransactionType,
        description: &str,
        idempotency_key: &str,
        game_session_id: Option<ID<GameSession>>,
    ) -> Result<(), StoreError>;
    async fn debit(
        &self,
        player_id: ID<PlayerProfile>,
        amount: Chips,
        kind: TransactionType,
        description: &str,
        idempotency_key: &str,
        game_session_id: Option<ID<GameSession>>,
    ) -> Result<(), StoreError>;
    /// Moves chips from the spendable to the locked balance.
    async fn lock_balance(
        &self,
        player_id: ID<PlayerProfile>,
        amount: Chips,
    ) -> Result<(), StoreError>;
    async fn unlock_balance(
        &self,
        player_id: ID<PlayerProfile>,
        amount: Chips,
    ) -> Result<(), StoreError>;
}

/// One balance movement plus its ledger row, deduplicated by key.
async fn apply<C>(
    db: &C,
    player_id: ID<PlayerProfile>,
    signed: Chips,
    kind: TransactionType,
    description: &str,
    idempotency_key: &str,
    game_session_id: Option<ID<GameSession>>,
) -> Result<(), StoreError>
where
    C: GenericClient + Sync,
{
    let replay = db
        .query_opt(
            concatcp!(
                "SELECT 1 FROM ",
                TRANSACTIONS,
                " WHERE idempotency_key = $1"
            ),
            &[&idempotency_key],
        )
        .await?
        .is_some();
    if replay {
        log::debug!("[wallet] replayed idempotency key {}, skipping", idempotency_key);
        return Ok(());
    }
    let row = db
        .query_opt(
            concatcp!(
                "SELECT id, balance FROM ",
                WALLETS,
                " WHERE player_id = $1 FOR UPDATE"
            ),
            &[&player_id.inner()],
        )
        .await?
        .ok_or(StoreError::WalletNotFound)?;
    let wallet_id: uuid::Uuid = row.get(0);
    let before: Chips = row.get(1);
    let after = before + signed;
    if after < 0 {
        return Err(StoreError::InsufficientBalance);
    }
    db.execute(
        concatcp!(
            "UPDATE ",
            WALLETS,
            " SET balance = $2, version = version + 1, updated_at = now() WHERE id = $1"
        ),
        &[&wallet_id, &after],
    )
    .await?;
    db.execute(
        concatcp!(
            "INSERT INTO ",
            TRANSACTIONS,
            " (id, wallet_id, type, amount, balance_before, balance_after, description, \
             idempotency_key, game_session_id) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ),
        &[
            &uuid::Uuid::now_v7(),
            &wallet_id,
            &kind.as_str(),
            &signed.abs(),
            &before,
            &after,
            &description,
            &idempotency_key,
            &game_session_id.map(|id| id.inner()),
        ],
    )
    .await?;
    Ok(())
}

impl<C: GenericClient + Sync> WalletRepository for C {
    async fn create_wallet(&self, wallet: &Wallet) -> Result<(), StoreError> {
        self.execute(
            concatcp!(
                "INSERT INTO ",
                WALLETS,
                " (id, player_id, balance, locked_balance, currency, version) \
                 VALUES ($1, $2, $3, $4, $5, $6)"
            ),
            &[
                &wallet.id.inner(),
                &wallet.player_id.inner(),
                &wallet.balance,
                &wallet.locked_balance,
                &wallet.currency,
                &wallet.version,
            ],
        )
        .await?;
        Ok(())
    }

    async fn wallet_by_player(
        &self,
        player_id: ID<PlayerProfile>,
    ) -> Result<Option<Wallet>, StoreError> {
        Ok(self
            .query_opt(
                concatcp!(
                    "SELECT ",
                    WALLET_COLUMNS,
                    " FROM ",
                    WALLETS,
                    " WHERE player_id = $1"
                ),
                &[&player_id.inner()],
            )
            .await?
            .map(|row| wallet_from(&row)))
    }

    async fn wallet_with_lock(
        &self,
        player_id: ID<PlayerProfile>,
    ) -> Result<Wallet, StoreError> {
        self.query_opt(
            concatcp!(
                "SELECT ",
                WALLET_COLUMNS,
                " FROM ",
                WALLETS,
                " WHERE player_id = $1 FOR UPDATE"
            ),
            &[&player_id.inner()],
        )
        .await?
        .map(|row| wallet_from(&row))
        .ok_or(StoreError::WalletNotFound)
    }

    async fn credit(
        &self,
        player_id: ID<PlayerProfile>,
        amount: Chips,
        kind: TransactionType,
        description: &str,
        idempotency_key: &str,
        game_session_id: Option<ID<GameSession>>,
    ) -> Result<(), StoreError> {
        if amount <= 0 {
            return Err(StoreError::InvalidAmount);
        }
        apply(
            self,
            player_id,
            amount,
            kind,
            description,
            idempotency_key,
            game_session_id,
        )
        .await
    }

    async fn debit(
        &self,
        player_id: ID<PlayerProfile>,
        amount: Chips,
        kind: TransactionType,
        description: &str,
        idempotency_key: &str,
        game_session_id: Option<ID<GameSession>>,
    ) -> Result<(), StoreError> {
        if amount <= 0 {
            return Err(StoreError::InvalidAmount);
        }
        apply(
            self,
            player_id,
            -amount,
            kind,
            description,
            idempotency_key,
            game_session_id,
        )
        .await
    }

    async fn lock_balance(
        &self,
        player_id: ID<PlayerProfile>,
        amount: Chips,
    ) -> Result<(), StoreError> {
        let moved = self
            .execute(
                concatcp!(
                    "UPDATE ",
                    WALLETS,
                    " SET balance = balance - $2, locked_balance = locked_balance + $2, \
                     version = version + 1, updated_at = now() \
                     WHERE player_id = $1 AND balance >= $2"
                ),
                &[&player_id.inner(), &amount],
            )
            .await?;
        match moved {
            0 => Err(StoreError::InsufficientBalance),
            _ => Ok(()),
        }
    }

    async fn unlock_balance(
        &self,
        player_id: ID<PlayerProfile>,
        amount: Chips,
    ) -> Result<(), StoreError> {
        let moved = self
            .execute(
                concatcp!(
                    "UPDATE ",
                    WALLETS,
                    " SET balance = balance + $2, locked_balance = locked_balance - $2, \
                     version = version + 1, updated_at = now() \
                     WHERE player_id = $1 AND locked_balance >= $2"
                ),
                &[&player_id.inner(), &amount],
            )
            .await?;
        match moved {
            0 => Err(StoreError::InsufficientBalance),
            _ => Ok(()),
        }
    }
}

fn session_from(row: &Row) -> GameSession {
    GameSession {
        id: ID::from(row.get::<_, uuid::Uuid>(0)),
        player_id: ID::from(row.get::<_, uuid::Uuid>(1)),
        table_id: row.get(2),
        buy_in_amount: row.get(3),
        current_chips: row.get(4),
        status: SessionStatus::from(row.get::<_, &str>(5)),
        started_at: row.get(6),
        ended_at: row.get(7),
    }
}

const SESSION_COLUMNS: &str =
    "id, player_id, table_id, buy_in_amount, current_chips, status, started_at, ended_at";

/// Game-session persistence. At most one active session per player.
#[allow(async_fn_in_trait)]
pub trait SessionRepository {
    async fn create_session(&self, session: &GameSession) -> Result<(), StoreError>;
    async fn session_by_id(
        &self,
        id: ID<GameSession>,
    ) -> Result<Option<GameSession>, StoreError>;
    async fn active_session_by_player(
        &self,
        player_id: ID<PlayerProfile>,
    ) -> Result<Option<GameSession>, StoreError>;
    async fn update_session_chips(
        &self,
        id: ID<GameSession>,
        chips: Chips,
    ) -> Result<(), StoreError>;
    async fn end_session(
        &self,
        id: ID<GameSession>,
        final_chips: Chips,
    ) -> Result<(), StoreError>;
}

impl<C: GenericClient + Sync> SessionRepository for C {
    async fn create_session(&self, session: &GameSession) -> Result<(), StoreError> {
        self.execute(
            concatcp!(
                "INSERT INTO ",
                GAME_SESSIONS,
                " (id, player_id, table_id, buy_in_amount, current_chips, status, started_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)"
            ),
            &[
                &session.id.inner(),
                &session.player_id.inner(),
                &session.table_id,
                &session.buy_in_amount,
                &session.current_chips,
                &session.status.as_str(),
                &session.started_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn session_by_id(
        &self,
        id: ID<GameSession>,
    ) -> Result<Option<GameSession>, StoreError> {
        Ok(self
            .query_opt(
                concatcp!(
                    "SELECT ",
                    SESSION_COLUMNS,
                    " FROM ",
                    GAME_SESSIONS,
                    " WHERE id = $1"
                ),
                &[&id.inner()],
            )
            .await?
            .map(|row| session_from(&row)))
    }

    async fn active_session_by_player(
        &self,
        player_id: ID<PlayerProfile>,
    ) -> Result<Option<GameSession>, StoreError> {
        Ok(self
            .query_opt(
                concatcp!(
                    "SELECT ",
                    SESSION_COLUMNS,
                    " FROM ",
                    GAME_SESSIONS,
                    " WHERE player_id = $1 AND status = 'active'"
                ),
                &[&player_id.inner()],
            )
            .await?
            .map(|row| session_from(&row)))
    }

    async fn update_session_chips(
        &self,
        id: ID<GameSession>,
        chips: Chips,
    ) -> Result<(), StoreError> {
        let updated = self
            .execute(
                concatcp!(
                    "UPDATE ",
                    GAME_SESSIONS,
                    " SET current_chips = $2, updated_at = now() WHERE id = $1"
                ),
                &[&id.inner(), &chips],
            )
            .await?;
        match updated {
            0 => Err(StoreError::SessionNotFound),
            _ => Ok(()),
        }
    }

    async fn end_session(
        &self,
        id: ID<GameSession>,
        final_chips: Chips,
    ) -> Result<(), StoreError> {
        let updated = self
            .execute(
                concatcp!(
                    "UPDATE ",
                    GAME_SESSIONS,
                    " SET status = 'ended', current_chips = $2, ended_at = now(), \
                     updated_at = now() WHERE id = $1 AND status = 'active'"
                ),
                &[&id.inner(), &final_chips],
            )
            .await?;
        match updated {
            0 => Err(StoreError::SessionNotActive),
            _ => Ok(()),
        }
    }
}

fn transaction_from(row: &Row) -> WalletTransaction {
    WalletTransaction {
        id: ID::from(row.get::<_, uuid::Uuid>(0)),
        wallet_id: ID::from(row.get::<_, uuid::Uuid>(1)),
        kind: row.get(2),
        amount: row.get(3),
        balance_before: row.get(4),
        balance_after: row.get(5),
        description: row.get(6),
        idempotency_key: row.get(7),
        game_session_id: row.get::<_, Option<uuid::Uuid>>(8).map(ID::from),
        created_at: row.get(9),
    }
}

const TRANSACTION_COLUMNS: &str = "id, wallet_id, type, amount, balance_before, balance_after, \
     description, idempotency_key, game_session_id, created_at";

/// Ledger queries.
#[allow(async_fn_in_trait)]
pub trait TransactionRepository {
    async fn transaction_by_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<WalletTransaction>, StoreError>;
    async fn transactions_by_wallet(
        &self,
        wallet_id: ID<Wallet>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, StoreError>;
}

impl<C: GenericClient + Sync> TransactionRepository for C {
    async fn transaction_by_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<WalletTransaction>, StoreError> {
        Ok(self
            .query_opt(
                concatcp!(
                    "SELECT ",
                    TRANSACTION_COLUMNS,
                    " FROM ",
                    TRANSACTIONS,
                    " WHERE idempotency_key = $1"
                ),
                &[&idempotency_key],
            )
            .await?
            .map(|row| transaction_from(&row)))
    }

    async fn transactions_by_wallet(
        &self,
        wallet_id: ID<Wallet>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, StoreError> {
        Ok(self
            .query(
                concatcp!(
                    "SELECT ",
                    TRANSACTION_COLUMNS,
                    " FROM ",
                    TRANSACTIONS,
                    " WHERE wallet_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
                ),
                &[&wallet_id.inner(), &limit, &offset],
            )
            .await?
            .iter()
            .map(transaction_from)
            .collect())
    }
}
