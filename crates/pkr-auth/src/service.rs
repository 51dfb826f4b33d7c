use chrono::Duration;
use chrono::Utc;
use pkr_wallet::Account;
use pkr_wallet::AccountRepository;
use pkr_wallet::AccountStatus;
use pkr_wallet::Db;
use pkr_wallet::PlayerProfile;
use pkr_wallet::ProfileRepository;
use pkr_wallet::StoreError;
use thiserror::Error;

/// Failures lock an account for this long.
const LOCK_MINUTES: i64 = 30;
/// Consecutive failures before the lockout engages.
const MAX_FAILED_ATTEMPTS: i32 = 5;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("account is locked")]
    AccountLocked,
    #[error("account is suspended")]
    AccountSuspended,
    #[error("account is banned")]
    AccountBanned,
    #[error("username already exists")]
    UsernameExists,
    #[error("email already exists")]
    EmailExists,
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Registration and credential checks, with lockout after repeated failures.
pub struct AuthService {
    db: Db,
}

impl AuthService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Creates an account plus its player profile.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(Account, PlayerProfile), AuthError> {
        if username.len() < 3 || username.len() > 32 {
            return Err(AuthError::InvalidInput("username must be 3-32 characters"));
        }
        if !email.contains('@') {
            return Err(AuthError::InvalidInput("invalid email"));
        }
        if password.len() < 8 {
            return Err(AuthError::InvalidInput(
                "password must be at least 8 characters",
            ));
        }
        let client = self.db.lock().await;
        if client.account_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameExists);
        }
        if client.account_by_email(email).await?.is_some() {
            return Err(AuthError::EmailExists);
        }
        let hashword = super::password::hash(password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let account = Account::new(username.to_string(), email.to_string(), hashword);
        client.create_account(&account).await?;
        let profile = PlayerProfile::new(account.id, username.to_string());
        client.create_profile(&profile).await?;
        log::info!(
            "[auth] registered {} (account {}, player {})",
            username,
            account.id,
            profile.id
        );
        Ok((account, profile))
    }

    /// Verifies credentials and account standing; failed attempts count
    /// toward a temporary lockout.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        ip: &str,
    ) -> Result<(Account, PlayerProfile), AuthError> {
        let client = self.db.lock().await;
        let account = client
            .account_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        match account.status {
            AccountStatus::Suspended => return Err(AuthError::AccountSuspended),
            AccountStatus::Banned => return Err(AuthError::AccountBanned),
            AccountStatus::Active => {}
        }
        if account.is_locked() {
            log::warn!("[auth] login attempt on locked account {}", username);
            return Err(AuthError::AccountLocked);
        }
        if !super::password::verify(password, &account.password_hash) {
            log::warn!("[auth] bad password for {} from {}", username, ip);
            let failures = client.bump_failed_logins(account.id).await?;
            if failures >= MAX_FAILED_ATTEMPTS {
                let until = Utc::now() + Duration::minutes(LOCK_MINUTES);
                client.lock_account(account.id, until).await?;
                log::warn!("[auth] {} locked until {}", username, until);
            }
            return Err(AuthError::InvalidCredentials);
        }
        if account.failed_login_attempts > 0 {
            client.reset_failed_logins(account.id).await?;
        }
        if let Err(e) = client.update_last_login(account.id, ip).await {
            // Metadata only; the login still succeeds.
            log::error!("[auth] failed to record last login for {}: {}", username, e);
        }
        let profile = client
            .profile_by_account(account.id)
            .await?
            .ok_or_else(|| AuthError::Internal("account has no player profile".into()))?;
        log::info!("[auth] {} authenticated from {}", username, ip);
        Ok((account, profile))
    }
}
