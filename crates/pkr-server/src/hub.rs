use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc;

/// Outbound buffer size per connection; overflow drops the frame with a
/// warning rather than blocking the sender.
const OUTBOUND_BUFFER: usize = 256;

/// Registry of live connections by player id.
///
/// Each connection owns the receiving half of its outbound buffer; the hub
/// and sessions hold cloneable senders. Sends never block.
#[derive(Default)]
pub struct Hub {
    connections: RwLock<HashMap<String, mpsc::Sender<String>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }
    /// Registers a connection and hands back its outbound receiver.
    pub fn register(&self, player_id: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let replaced = self
            .connections
            .write()
            .expect("connections lock")
            .insert(player_id.to_string(), tx);
        if replaced.is_some() {
            log::warn!("[hub] replaced existing connection for {}", player_id);
        } else {
            log::info!("[hub] {} connected", player_id);
        }
        rx
    }
    pub fn unregister(&self, player_id: &str) {
        if self
            .connections
            .write()
            .expect("connections lock")
            .remove(player_id)
            .is_some()
        {
            log::info!("[hub] {} disconnected", player_id);
        }
    }
    /// Clones the outbound sender for a player's connection.
    pub fn sender(&self, player_id: &str) -> Option<mpsc::Sender<String>> {
        self.connections
            .read()
            .expect("connections lock")
            .get(player_id)
            .cloned()
    }
    pub fn send_to_player(&self, player_id: &str, frame: String) -> bool {
        match self.sender(player_id) {
            Some(tx) => match tx.try_send(frame) {
                Ok(()) => true,
                Err(_) => {
                    log::warn!("[hub] outbound buffer full for {}, dropping frame", player_id);
                    false
                }
            },
            None => false,
        }
    }
    pub fn connected_count(&self) -> usize {
        self.connections.read().expect("connections lock").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_send_unregister() {
        let hub = Hub::new();
        let mut rx = hub.register("p1");
        assert_eq!(hub.connected_count(), 1);
        assert!(hub.send_to_player("p1", "hello".into()));
        assert_eq!(rx.recv().await.unwrap(), "hello");
        hub.unregister("p1");
        assert_eq!(hub.connected_count(), 0);
        assert!(!hub.send_to_player("p1", "gone".into()));
    }

    #[tokio::test]
    async fn full_buffer_drops_frames() {
        let hub = Hub::new();
        let _rx = hub.register("p1");
        for i in 0..OUTBOUND_BUFFER {
            assert!(hub.send_to_player("p1", format!("{}", i)));
        }
        assert!(!hub.send_to_player("p1", "overflow".into()));
    }
}
