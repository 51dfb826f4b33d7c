//! Integration tests against a live PostgreSQL instance.
//!
//! Ignored by default; run with `DB_URL` pointing at a scratch database:
//! `DB_URL=postgres://... cargo test -p pkr-wallet -- --ignored`

use pkr_wallet::*;

async fn fresh_player(db: &Db) -> pkr_core::ID<PlayerProfile> {
    let client = db.lock().await;
    let tag = uuid::Uuid::now_v7().simple().to_string();
    let account = Account::new(
        format!("it-{}", tag),
        format!("it-{}@example.com", tag),
        "hash".into(),
    );
    client.create_account(&account).await.unwrap();
    let profile = PlayerProfile::new(account.id, account.username.clone());
    client.create_profile(&profile).await.unwrap();
    profile.id
}

#[tokio::test]
#[ignore = "requires a live database via DB_URL"]
async fn credit_is_idempotent_per_key() {
    let db = connect(&std::env::var("DB_URL").unwrap()).await.unwrap();
    migrate(&*db.lock().await).await.unwrap();
    let player = fresh_player(&db).await;

    let client = db.lock().await;
    let wallet = Wallet::new(player, "USD".into());
    client.create_wallet(&wallet).await.unwrap();
    let key = format!("it-credit-{}", uuid::Uuid::now_v7());
    for _ in 0..2 {
        client
            .credit(player, 10_000, TransactionType::Deposit, "test", &key, None)
            .await
            .unwrap();
    }
    let wallet = client.wallet_by_player(player).await.unwrap().unwrap();
    assert_eq!(wallet.balance, 10_000);

    // Exactly one ledger row exists for the key, with a coherent before/after.
    let entry = client.transaction_by_key(&key).await.unwrap().unwrap();
    assert_eq!(entry.amount, 10_000);
    assert_eq!(entry.balance_after, entry.balance_before + 10_000);
    let entries = client
        .transactions_by_wallet(wallet.id, 10, 0)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
#[ignore = "requires a live database via DB_URL"]
async fn profile_stats_feed_the_leaderboard() {
    let db = connect(&std::env::var("DB_URL").unwrap()).await.unwrap();
    migrate(&*db.lock().await).await.unwrap();
    let player = fresh_player(&db).await;

    let client = db.lock().await;
    client
        .update_profile_stats(player, 3, 1, 12_345_678)
        .await
        .unwrap();
    let profile = client.profile_by_id(player).await.unwrap().unwrap();
    assert_eq!(profile.hands_played, 3);
    assert_eq!(profile.hands_won, 1);
    assert_eq!(profile.total_winnings, 12_345_678);

    let top = client.top_profiles_by_winnings(5).await.unwrap();
    assert!(top.iter().any(|p| p.id == player));
}

#[tokio::test]
#[ignore = "requires a live database via DB_URL"]
async fn buy_in_and_cash_out_roundtrip() {
    let db = connect(&std::env::var("DB_URL").unwrap()).await.unwrap();
    migrate(&*db.lock().await).await.unwrap();
    let player = fresh_player(&db).await;

    let service = GameService::new(db.clone(), "USD");
    service.ensure_wallet_exists(player).await.unwrap();
    {
        let client = db.lock().await;
        let key = format!("it-seed-{}", uuid::Uuid::now_v7());
        client
            .credit(player, 50_000, TransactionType::Deposit, "seed", &key, None)
            .await
            .unwrap();
    }

    let receipt = service.buy_in(player, "it-table", 20_000).await.unwrap();
    assert_eq!(receipt.wallet_balance, 30_000);
    // A second concurrent session is rejected.
    assert!(matches!(
        service.buy_in(player, "it-table", 1_000).await,
        Err(StoreError::SessionAlreadyActive)
    ));

    let receipt = service
        .cash_out(player, receipt.session_id, 25_000)
        .await
        .unwrap();
    assert_eq!(receipt.profit, 5_000);
    assert_eq!(receipt.wallet_balance, 55_000);
    // The session is gone; cashing out again fails.
    assert!(matches!(
        service.cash_out(player, receipt.session_id, 25_000).await,
        Err(StoreError::SessionNotActive)
    ));
}

#[tokio::test]
#[ignore = "requires a live database via DB_URL"]
async fn debit_rejects_overdraft() {
    let db = connect(&std::env::var("DB_URL").unwrap()).await.unwrap();
    migrate(&*db.lock().await).await.unwrap();
    let player = fresh_player(&db).await;

    let client = db.lock().await;
    client
        .create_wallet(&Wallet::new(player, "USD".into()))
        .await
        .unwrap();
    let key = format!("it-debit-{}", uuid::Uuid::now_v7());
    assert!(matches!(
        client
            .debit(player, 1, TransactionType::BuyIn, "test", &key, None)
            .await,
        Err(StoreError::InsufficientBalance)
    ));
}
