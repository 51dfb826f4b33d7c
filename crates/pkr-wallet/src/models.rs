use chrono::DateTime;
use chrono::Utc;
use pkr_core::Chips;
use pkr_core::Unique;
use pkr_core::ID;

/// A registered account (credentials and standing).
#[derive(Debug, Clone)]
pub struct Account {
    pub id: ID<Account>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub status: AccountStatus,
    pub email_verified: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Suspended,
    Banned,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Banned => "banned",
        }
    }
}

impl From<&str> for AccountStatus {
    fn from(s: &str) -> Self {
        match s {
            "suspended" => Self::Suspended,
            "banned" => Self::Banned,
            _ => Self::Active,
        }
    }
}

impl Account {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: ID::default(),
            username,
            email,
            password_hash,
            status: AccountStatus::Active,
            email_verified: false,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            last_login_ip: None,
        }
    }
    /// Locked out by too many failed logins.
    pub fn is_locked(&self) -> bool {
        self.locked_until.map(|until| until > Utc::now()).unwrap_or(false)
    }
}

impl Unique for Account {
    fn id(&self) -> ID<Account> {
        self.id
    }
}

/// A player's public profile and running stats.
#[derive(Debug, Clone)]
pub struct PlayerProfile {
    pub id: ID<PlayerProfile>,
    pub account_id: ID<Account>,
    pub display_name: String,
    pub hands_played: i32,
    pub hands_won: i32,
    pub total_winnings: Chips,
}

impl PlayerProfile {
    pub fn new(account_id: ID<Account>, display_name: String) -> Self {
        Self {
            id: ID::default(),
            account_id,
            display_name,
            hands_played: 0,
            hands_won: 0,
            total_winnings: 0,
        }
    }
}

impl Unique for PlayerProfile {
    fn id(&self) -> ID<PlayerProfile> {
        self.id
    }
}

/// A player's wallet. All amounts in the smallest currency unit.
#[derive(Debug, Clone)]
pub struct Wallet {
    pub id: ID<Wallet>,
    pub player_id: ID<PlayerProfile>,
    pub balance: Chips,
    pub locked_balance: Chips,
    pub currency: String,
    pub version: i64,
}

impl Wallet {
    pub fn new(player_id: ID<PlayerProfile>, currency: String) -> Self {
        Self {
            id: ID::default(),
            player_id,
            balance: 0,
            locked_balance: 0,
            currency,
            version: 1,
        }
    }
    pub fn total_balance(&self) -> Chips {
        self.balance + self.locked_balance
    }
    pub fn can_debit(&self, amount: Chips) -> bool {
        self.balance >= amount
    }
}

impl Unique for Wallet {
    fn id(&self) -> ID<Wallet> {
        self.id
    }
}

/// Ledger entry types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    BuyIn,
    CashOut,
    Deposit,
    Withdraw,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuyIn => "buy_in",
            Self::CashOut => "cash_out",
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Refund => "refund",
        }
    }
}

/// One ledger row. `balance_after = balance_before + signed amount`; the
/// idempotency key, when present, is unique at the storage layer.
#[derive(Debug, Clone)]
pub struct WalletTransaction {
    pub id: ID<WalletTransaction>,
    pub wallet_id: ID<Wallet>,
    pub kind: String,
    pub amount: Chips,
    pub balance_before: Chips,
    pub balance_after: Chips,
    pub description: String,
    pub idempotency_key: Option<String>,
    pub game_session_id: Option<ID<GameSession>>,
    pub created_at: DateTime<Utc>,
}

/// One buy-in to cash-out span at a table.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub id: ID<GameSession>,
    pub player_id: ID<PlayerProfile>,
    pub table_id: String,
    pub buy_in_amount: Chips,
    pub current_chips: Chips,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }
}

impl From<&str> for SessionStatus {
    fn from(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            _ => Self::Ended,
        }
    }
}

impl GameSession {
    pub fn new(player_id: ID<PlayerProfile>, table_id: String, buy_in: Chips) -> Self {
        Self {
            id: ID::default(),
            player_id,
            table_id,
            buy_in_amount: buy_in,
            current_chips: buy_in,
            status: SessionStatus::Active,
            started_at: Utc::now(),
            ended_at: None,
        }
    }
    pub fn net_profit(&self) -> Chips {
        self.current_chips - self.buy_in_amount
    }
}

impl Unique for GameSession {
    fn id(&self) -> ID<GameSession> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_debit_guard() {
        let mut wallet = Wallet::new(ID::default(), "USD".into());
        wallet.balance = 100;
        wallet.locked_balance = 50;
        assert!(wallet.can_debit(100));
        assert!(!wallet.can_debit(101));
        assert_eq!(wallet.total_balance(), 150);
    }

    #[test]
    fn account_lock_expiry() {
        let mut account = Account::new("a".into(), "a@b.c".into(), "hash".into());
        assert!(!account.is_locked());
        account.locked_until = Some(Utc::now() + chrono::Duration::minutes(30));
        assert!(account.is_locked());
        account.locked_until = Some(Utc::now() - chrono::Duration::minutes(1));
        assert!(!account.is_locked());
    }

    #[test]
    fn session_profit() {
        let mut session = GameSession::new(ID::default(), "t1".into(), 10_000);
        session.current_chips = 12_500;
        assert_eq!(session.net_profit(), 2_500);
    }

    #[test]
    fn status_strings_roundtrip() {
        assert_eq!(AccountStatus::from("banned").as_str(), "banned");
        assert_eq!(SessionStatus::from("active"), SessionStatus::Active);
        assert_eq!(TransactionType::BuyIn.as_str(), "buy_in");
    }
}
