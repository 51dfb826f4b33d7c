use thiserror::Error;

/// Failures from the wallet and session stores.
///
/// Integrity errors (insufficient balance) fail the enclosing operation and
/// roll the transaction back; nothing partial persists.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid amount")]
    InvalidAmount,
    #[error("player not found")]
    PlayerNotFound,
    #[error("wallet not found")]
    WalletNotFound,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("session not found")]
    SessionNotFound,
    #[error("session does not belong to player")]
    SessionNotOwned,
    #[error("session is not active")]
    SessionNotActive,
    #[error("player already has an active session")]
    SessionAlreadyActive,
    #[error("database error: {0}")]
    Db(#[from] tokio_postgres::Error),
}

impl StoreError {
    /// Stable snake_case code for the wire ERROR payload.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "invalid_amount",
            Self::PlayerNotFound => "player_not_found",
            Self::WalletNotFound => "wallet_not_found",
            Self::InsufficientBalance => "insufficient_balance",
            Self::SessionNotFound => "session_not_found",
            Self::SessionNotOwned => "session_not_owned",
            Self::SessionNotActive => "session_not_active",
            Self::SessionAlreadyActive => "already_in_game",
            Self::Db(_) => "internal_error",
        }
    }
}
