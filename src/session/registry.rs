//! Connection registry - outbound channel per connected session

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::game::SessionId;
use crate::ws::protocol::ServerMsg;

/// Tracks live connections and routes outbound events to them
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<SessionId, mpsc::UnboundedSender<ServerMsg>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a fresh session id to a new connection.
    /// Returns the id and the receiving end of its outbound channel.
    pub fn register(&self) -> (SessionId, mpsc::UnboundedReceiver<ServerMsg>) {
        let session_id = SessionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(session_id, tx);

        info!(session_id = %session_id, connections = self.connections.len(), "Connection registered");
        (session_id, rx)
    }

    pub fn unregister(&self, session_id: SessionId) {
        if self.connections.remove(&session_id).is_some() {
            info!(session_id = %session_id, connections = self.connections.len(), "Connection unregistered");
        }
    }

    /// Deliver one event; returns false when the session is gone
    pub fn send(&self, session_id: SessionId, msg: ServerMsg) -> bool {
        let Some(tx) = self.connections.get(&session_id) else {
            debug!(session_id = %session_id, "Dropping event for unknown session");
            return false;
        };

        if tx.send(msg).is_err() {
            debug!(session_id = %session_id, "Outbound channel closed");
            return false;
        }
        true
    }

    #[cfg(test)]
    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.connections.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_distinct_ids() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = registry.register();
        let (b, _rx_b) = registry.register();

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_send_routes_to_session() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx) = registry.register();

        assert!(registry.send(a, ServerMsg::Waiting));
        assert_eq!(rx.try_recv().unwrap(), ServerMsg::Waiting);
    }

    #[test]
    fn test_send_after_unregister_fails() {
        let registry = ConnectionRegistry::new();
        let (a, _rx) = registry.register();

        registry.unregister(a);
        assert!(!registry.contains(&a));
        assert!(!registry.send(a, ServerMsg::NewRound));
        assert!(registry.is_empty());
    }
}
