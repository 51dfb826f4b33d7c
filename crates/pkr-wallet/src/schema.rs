use super::error::StoreError;
use tokio_postgres::Client;

/// Table for registered accounts.
#[rustfmt::skip]
pub const ACCOUNTS:      &str = "accounts";
/// Table for player profiles and stats.
#[rustfmt::skip]
pub const PLAYERS:       &str = "players";
/// Table for wallets.
#[rustfmt::skip]
pub const WALLETS:       &str = "wallets";
/// Table for the wallet ledger.
#[rustfmt::skip]
pub const TRANSACTIONS:  &str = "transactions";
/// Table for buy-in/cash-out spans.
#[rustfmt::skip]
pub const GAME_SESSIONS: &str = "game_sessions";
/// Reserved: per-hand archival. No write path yet.
#[rustfmt::skip]
pub const HAND_HISTORIES: &str = "hand_histories";
/// Reserved: audit trail. No write path yet.
#[rustfmt::skip]
pub const AUDIT_LOGS:    &str = "audit_logs";

const CREATES: &[&str] = &[
    const_format::concatcp!(
        "CREATE TABLE IF NOT EXISTS ",
        ACCOUNTS,
        " (
            id                    UUID PRIMARY KEY,
            username              TEXT NOT NULL UNIQUE,
            email                 TEXT NOT NULL UNIQUE,
            password_hash         TEXT NOT NULL,
            status                TEXT NOT NULL DEFAULT 'active',
            email_verified        BOOLEAN NOT NULL DEFAULT FALSE,
            failed_login_attempts INT NOT NULL DEFAULT 0,
            locked_until          TIMESTAMPTZ,
            last_login_at         TIMESTAMPTZ,
            last_login_ip         TEXT,
            created_at            TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at            TIMESTAMPTZ NOT NULL DEFAULT now()
        );"
    ),
    const_format::concatcp!(
        "CREATE TABLE IF NOT EXISTS ",
        PLAYERS,
        " (
            id             UUID PRIMARY KEY,
            account_id     UUID NOT NULL REFERENCES ",
        ACCOUNTS,
        "(id),
            display_name   TEXT NOT NULL,
            hands_played   INT NOT NULL DEFAULT 0,
            hands_won      INT NOT NULL DEFAULT 0,
            total_winnings BIGINT NOT NULL DEFAULT 0,
            created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
        );"
    ),
    const_format::concatcp!(
        "CREATE TABLE IF NOT EXISTS ",
        WALLETS,
        " (
            id             UUID PRIMARY KEY,
            player_id      UUID NOT NULL UNIQUE REFERENCES ",
        PLAYERS,
        "(id),
            balance        BIGINT NOT NULL DEFAULT 0,
            locked_balance BIGINT NOT NULL DEFAULT 0,
            currency       TEXT NOT NULL DEFAULT 'USD',
            version        BIGINT NOT NULL DEFAULT 1,
            created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
            CHECK (balance >= 0),
            CHECK (locked_balance >= 0)
        );"
    ),
    const_format::concatcp!(
        "CREATE TABLE IF NOT EXISTS ",
        GAME_SESSIONS,
        " (
            id            UUID PRIMARY KEY,
            player_id     UUID NOT NULL REFERENCES ",
        PLAYERS,
        "(id),
            table_id      TEXT NOT NULL,
            buy_in_amount BIGINT NOT NULL,
            current_chips BIGINT NOT NULL,
            status        TEXT NOT NULL DEFAULT 'active',
            started_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
            ended_at      TIMESTAMPTZ,
            created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at    TIMESTAMPTZ NOT NULL DEFAULT now()
        );"
    ),
    const_format::concatcp!(
        "CREATE TABLE IF NOT EXISTS ",
        TRANSACTIONS,
        " (
            id              UUID PRIMARY KEY,
            wallet_id       UUID NOT NULL REFERENCES ",
        WALLETS,
        "(id),
            type            TEXT NOT NULL,
            amount          BIGINT NOT NULL,
            balance_before  BIGINT NOT NULL,
            balance_after   BIGINT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            idempotency_key TEXT,
            game_session_id UUID REFERENCES ",
        GAME_SESSIONS,
        "(id),
            created_at      TIMESTAMPTZ NOT NULL DEFAULT now()
        );"
    ),
    const_format::concatcp!(
        "CREATE UNIQUE INDEX IF NOT EXISTS transactions_idempotency_key ON ",
        TRANSACTIONS,
        " (idempotency_key) WHERE idempotency_key IS NOT NULL;"
    ),
    const_format::concatcp!(
        "CREATE INDEX IF NOT EXISTS game_sessions_active_player ON ",
        GAME_SESSIONS,
        " (player_id) WHERE status = 'active';"
    ),
    const_format::concatcp!(
        "CREATE TABLE IF NOT EXISTS ",
        HAND_HISTORIES,
        " (
            id              UUID PRIMARY KEY,
            game_session_id UUID REFERENCES ",
        GAME_SESSIONS,
        "(id),
            hand_number     INT NOT NULL,
            players_data    JSONB,
            community_cards JSONB,
            actions         JSONB,
            pots            JSONB,
            winners         JSONB,
            created_at      TIMESTAMPTZ NOT NULL DEFAULT now()
        );"
    ),
    const_format::concatcp!(
        "CREATE TABLE IF NOT EXISTS ",
        AUDIT_LOGS,
        " (
            id          UUID PRIMARY KEY,
            user_id     UUID,
            action      TEXT NOT NULL,
            entity_type TEXT,
            entity_id   UUID,
            old_value   JSONB,
            new_value   JSONB,
            ip_address  TEXT,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        );"
    ),
];

/// Creates every table and index if missing. Run once at startup.
pub async fn migrate(client: &Client) -> Result<(), StoreError> {
    for ddl in CREATES {
        client.execute(*ddl, &[]).await?;
    }
    log::info!("[db] schema up to date");
    Ok(())
}
