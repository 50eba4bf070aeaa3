//! Registry of live translation streams

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, error};
use uuid::Uuid;

use crate::infrastructure::observability::set_active_connections;

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection; it stays registered until the guard is dropped
    pub fn register(self: &Arc<Self>) -> ConnectionGuard {
        let id = Uuid::new_v4();

        match self.connections.lock() {
            Ok(mut connections) => {
                connections.insert(id, Utc::now());
                set_active_connections(connections.len());
                debug!(connection_id = %id, active = connections.len(), "Connection registered");
            }
            Err(e) => error!(error = %e, "Connection registry lock poisoned"),
        }

        ConnectionGuard {
            id,
            registry: Arc::clone(self),
        }
    }

    pub fn active(&self) -> usize {
        self.connections.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn release(&self, id: &Uuid) {
        match self.connections.lock() {
            Ok(mut connections) => {
                if connections.remove(id).is_some() {
                    set_active_connections(connections.len());
                    debug!(connection_id = %id, active = connections.len(), "Connection released");
                }
            }
            Err(e) => error!(error = %e, "Connection registry lock poisoned"),
        }
    }
}

/// Deregisters its connection on drop
#[derive(Debug)]
pub struct ConnectionGuard {
    id: Uuid,
    registry: Arc<ConnectionRegistry>,
}

impl ConnectionGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.registry.release(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let registry = Arc::new(ConnectionRegistry::new());

        let first = registry.register();
        let second = registry.register();
        assert_eq!(registry.active(), 2);
        assert_ne!(first.id(), second.id());

        drop(first);
        assert_eq!(registry.active(), 1);
        drop(second);
        assert_eq!(registry.active(), 0);
    }
}
