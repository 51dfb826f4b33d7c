use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;
use thiserror::Error;

/// Ticket length in hex characters: 16 random bytes, 128 bits of entropy.
const TICKET_HEX_LEN: usize = 32;

const TICKET_KEY_PREFIX: &str = "ticket:";

#[derive(Debug, Error)]
pub enum TicketError {
    /// Unknown, expired, and already-used tickets are indistinguishable.
    #[error("invalid ticket")]
    Invalid,
    #[error("ticket store error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for TicketError {
    fn from(e: redis::RedisError) -> Self {
        Self::Backend(e.to_string())
    }
}

/// One-shot connection tickets.
///
/// `generate` mints a token bound to a player id with a TTL; `validate` is
/// an atomic get-and-delete, so every ticket authenticates at most one
/// connection upgrade.
pub enum Tickets {
    Redis(RedisTicketStore),
    Memory(MemoryTicketStore),
}

impl Tickets {
    pub async fn generate(&self, player_id: &str, ttl: Duration) -> Result<String, TicketError> {
        match self {
            Self::Redis(store) => store.generate(player_id, ttl).await,
            Self::Memory(store) => store.generate(player_id, ttl),
        }
    }
    pub async fn validate(&self, ticket: &str) -> Result<String, TicketError> {
        match self {
            Self::Redis(store) => store.validate(ticket).await,
            Self::Memory(store) => store.validate(ticket),
        }
    }
}

/// Redis-backed store; GETDEL makes consumption atomic across processes.
pub struct RedisTicketStore {
    client: redis::Client,
}

impl RedisTicketStore {
    pub fn open(url: &str) -> Result<Self, TicketError> {
        let client = redis::Client::open(url)?;
        Ok(Self { client })
    }
    pub async fn generate(&self, player_id: &str, ttl: Duration) -> Result<String, TicketError> {
        use redis::AsyncCommands;
        let ticket = random_ticket();
        self.client
            .get_multiplexed_async_connection()
            .await?
            .set_ex::<String, &str, ()>(
                format!("{}{}", TICKET_KEY_PREFIX, ticket),
                player_id,
                ttl.as_secs().max(1),
            )
            .await?;
        Ok(ticket)
    }
    pub async fn validate(&self, ticket: &str) -> Result<String, TicketError> {
        use redis::AsyncCommands;
        let player_id: Option<String> = self
            .client
            .get_multiplexed_async_connection()
            .await?
            .get_del(format!("{}{}", TICKET_KEY_PREFIX, ticket))
            .await?;
        player_id.ok_or(TicketError::Invalid)
    }
}

/// In-memory store for development and tests. Expired entries are purged
/// opportunistically on every generate.
#[derive(Default)]
pub struct MemoryTicketStore {
    tickets: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn generate(&self, player_id: &str, ttl: Duration) -> Result<String, TicketError> {
        let ticket = random_ticket();
        let mut tickets = self.tickets.lock().expect("tickets lock");
        let now = Instant::now();
        tickets.retain(|_, (_, expires)| *expires > now);
        tickets.insert(ticket.clone(), (player_id.to_string(), now + ttl));
        Ok(ticket)
    }
    pub fn validate(&self, ticket: &str) -> Result<String, TicketError> {
        let mut tickets = self.tickets.lock().expect("tickets lock");
        let (player_id, expires) = tickets.remove(ticket).ok_or(TicketError::Invalid)?;
        if expires <= Instant::now() {
            return Err(TicketError::Invalid);
        }
        Ok(player_id)
    }
}

fn random_ticket() -> String {
    use rand::Rng;
    let mut bytes = [0u8; TICKET_HEX_LEN / 2];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tickets_are_single_use() {
        let store = MemoryTicketStore::new();
        let ticket = store.generate("p1", Duration::from_secs(30)).unwrap();
        assert_eq!(ticket.len(), TICKET_HEX_LEN);
        assert_eq!(store.validate(&ticket).unwrap(), "p1");
        // The replay fails exactly like an unknown ticket.
        assert!(matches!(store.validate(&ticket), Err(TicketError::Invalid)));
        assert!(matches!(store.validate("feedface"), Err(TicketError::Invalid)));
    }

    #[test]
    fn expired_tickets_rejected() {
        let store = MemoryTicketStore::new();
        let ticket = store.generate("p1", Duration::ZERO).unwrap();
        assert!(matches!(store.validate(&ticket), Err(TicketError::Invalid)));
    }

    #[test]
    fn tickets_do_not_collide() {
        let store = MemoryTicketStore::new();
        let a = store.generate("p1", Duration::from_secs(30)).unwrap();
        let b = store.generate("p1", Duration::from_secs(30)).unwrap();
        assert_ne!(a, b);
    }
}
