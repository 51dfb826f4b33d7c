//! Wallets, game sessions, and the money paths between them.
//!
//! Persistence lives in PostgreSQL. Repository traits are implemented for
//! any [`tokio_postgres::GenericClient`], so the same queries run against a
//! plain connection or inside a transaction holding the wallet row lock.
//!
//! ## Pieces
//!
//! - [`models`] — accounts, profiles, wallets, ledger rows, game sessions
//! - repositories — SQL for each entity, keyed by table-name constants
//! - [`GameService`] — transactional buy-in / cash-out orchestration
//! - [`migrate`] — idempotent schema bootstrap
mod error;
mod models;
mod repository;
mod schema;
mod service;

pub use error::*;
pub use models::*;
pub use repository::*;
pub use schema::*;
pub use service::*;

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_postgres::Client;

/// Shared database handle. The mutex hands out exclusive use of the single
/// connection, which is what makes client-side transactions sound.
pub type Db = Arc<Mutex<Client>>;

/// Establishes the database connection and spawns its driver task.
pub async fn connect(url: &str) -> Result<Db, StoreError> {
    log::info!("[db] connecting");
    let (client, connection) = tokio_postgres::connect(url, tokio_postgres::tls::NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            log::error!("[db] connection task ended: {}", e);
        }
    });
    Ok(Arc::new(Mutex::new(client)))
}
