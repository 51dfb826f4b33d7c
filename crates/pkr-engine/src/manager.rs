use super::event::EventSink;
use super::event::HandCompleteFn;
use super::table::Table;
use super::table::TableHandle;
use pkr_core::Chips;
use std::collections::HashMap;
use std::sync::RwLock;

/// Owns every running table actor and spawns them on demand.
///
/// The event sink and hand-complete hook are injected once at construction
/// so the engine never learns about sessions or wallets directly; the server
/// wires those closures at startup.
pub struct TableManager {
    tables: RwLock<HashMap<String, TableHandle>>,
    sink: EventSink,
    on_hand_complete: HandCompleteFn,
    big_blind: Chips,
    min_players: usize,
}

impl TableManager {
    pub fn new(sink: EventSink, on_hand_complete: HandCompleteFn) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            sink,
            on_hand_complete,
            big_blind: pkr_core::DEFAULT_B_BLIND,
            min_players: pkr_core::MIN_PLAYERS,
        }
    }
    pub fn with_stakes(mut self, big_blind: Chips) -> Self {
        self.big_blind = big_blind;
        self
    }
    pub fn with_min_players(mut self, min_players: usize) -> Self {
        self.min_players = min_players;
        self
    }
    /// Looks up a running table.
    pub fn get(&self, id: &str) -> Option<TableHandle> {
        self.tables.read().expect("tables lock").get(id).cloned()
    }
    /// Returns the handle for a table, spawning its actor on first use.
    pub fn get_or_create(&self, id: &str) -> TableHandle {
        if let Some(handle) = self.get(id) {
            return handle;
        }
        let mut tables = self.tables.write().expect("tables lock");
        tables
            .entry(id.to_string())
            .or_insert_with(|| {
                log::info!("[tables] spawning table {}", id);
                Table::new(id, self.sink.clone())
                    .with_stakes(self.big_blind)
                    .with_min_players(self.min_players)
                    .on_hand_complete(self.on_hand_complete.clone())
                    .spawn()
            })
            .clone()
    }
    /// Closes every table actor. Used during graceful shutdown.
    pub fn close_all(&self) {
        for handle in self.tables.read().expect("tables lock").values() {
            handle.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn manager() -> TableManager {
        TableManager::new(Arc::new(|_| {}), Arc::new(|_, _| {}))
    }

    #[tokio::test]
    async fn get_or_create_reuses_handles() {
        let manager = manager();
        let a = manager.get_or_create("t1");
        let b = manager.get_or_create("t1");
        assert_eq!(a.id(), b.id());
        assert!(manager.get("t2").is_none());
        manager.close_all();
    }
}
