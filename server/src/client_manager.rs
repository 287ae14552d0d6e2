//! Authenticated client tracking for the word duel server
//!
//! This module keeps the roster of clients that passed the password
//! challenge. Each client is known only by its id and an outbound handle:
//! - Id allocation with an explicit uniqueness check
//! - Registration and removal as connections come and go
//! - Opponent discovery (everyone except the asking client)
//! - Delivery of frames, resolving the live handle at send time
//!
//! Matches refer to participants by id, so a client that disconnects
//! mid-match simply stops resolving here instead of leaving a dangling
//! transport behind.

use log::{debug, info};
use rand::Rng;
use shared::{ClientId, ServerFrame};
use std::collections::BTreeMap;
use std::time::Instant;
use tokio::sync::mpsc;

/// Sending half of a connection's outbound frame queue
pub type Outbound = mpsc::UnboundedSender<ServerFrame>;

/// An authenticated client
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: ClientId,
    /// Queue drained by the connection's writer task
    pub outbound: Outbound,
    /// When the client finished authenticating
    pub connected_at: Instant,
}

impl Client {
    pub fn new(id: ClientId, outbound: Outbound) -> Self {
        Self {
            id,
            outbound,
            connected_at: Instant::now(),
        }
    }
}

/// Roster of authenticated clients
///
/// Ids are kept in a `BTreeMap` so opponent listings come out in ascending
/// order without an extra sort.
#[derive(Debug, Default)]
pub struct ClientManager {
    clients: BTreeMap<ClientId, Client>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: BTreeMap::new(),
        }
    }

    /// Draws a random id that no registered client holds
    pub fn allocate_id<R: Rng + ?Sized>(&self, rng: &mut R) -> ClientId {
        loop {
            let id = rng.gen_range(1..=ClientId::MAX);
            if !self.clients.contains_key(&id) {
                return id;
            }
        }
    }

    /// Adds a client to the roster
    ///
    /// Returns false and leaves the roster untouched if the id is taken.
    pub fn register(&mut self, client: Client) -> bool {
        if self.clients.contains_key(&client.id) {
            return false;
        }

        info!("Client {} registered", client.id);
        self.clients.insert(client.id, client);
        true
    }

    /// Removes a client, dropping its outbound handle
    ///
    /// Returns true if the client was found and removed.
    pub fn remove_client(&mut self, client_id: ClientId) -> bool {
        if let Some(client) = self.clients.remove(&client_id) {
            info!(
                "Client {} removed after {:?}",
                client.id,
                client.connected_at.elapsed()
            );
            true
        } else {
            false
        }
    }

    /// Ids of every registered client except `self_id`, ascending
    pub fn list_others(&self, self_id: ClientId) -> Vec<ClientId> {
        self.clients
            .keys()
            .copied()
            .filter(|id| *id != self_id)
            .collect()
    }

    pub fn find(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    pub fn contains(&self, client_id: ClientId) -> bool {
        self.clients.contains_key(&client_id)
    }

    /// Queues a frame for a client
    ///
    /// Returns false if the client is gone or its writer has shut down.
    pub fn send(&self, client_id: ClientId, frame: ServerFrame) -> bool {
        match self.find(client_id) {
            Some(client) => client.outbound.send(frame).is_ok(),
            None => {
                debug!("Dropping frame for unknown client {}: {}", client_id, frame);
                false
            }
        }
    }

    /// Returns the number of registered clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are registered
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_client(id: ClientId) -> (Client, mpsc::UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Client::new(id, tx), rx)
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new();
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_register_client() {
        let mut manager = ClientManager::new();
        let (client, _rx) = test_client(10);

        assert!(manager.register(client));
        assert_eq!(manager.len(), 1);
        assert!(manager.contains(10));
        assert_eq!(manager.find(10).map(|c| c.id), Some(10));
    }

    #[test]
    fn test_register_duplicate_id_rejected() {
        let mut manager = ClientManager::new();
        let (first, _rx1) = test_client(10);
        let (second, _rx2) = test_client(10);

        assert!(manager.register(first));
        assert!(!manager.register(second));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_client() {
        let mut manager = ClientManager::new();
        let (client, _rx) = test_client(3);
        manager.register(client);

        assert!(manager.remove_client(3));
        assert!(manager.is_empty());
        assert!(manager.find(3).is_none());
    }

    #[test]
    fn test_remove_nonexistent_client() {
        let mut manager = ClientManager::new();
        assert!(!manager.remove_client(999));
    }

    #[test]
    fn test_list_others_excludes_self_and_is_sorted() {
        let mut manager = ClientManager::new();
        let mut receivers = Vec::new();
        for id in [42, 7, 19] {
            let (client, rx) = test_client(id);
            manager.register(client);
            receivers.push(rx);
        }

        assert_eq!(manager.list_others(7), vec![19, 42]);
        assert_eq!(manager.list_others(1000), vec![7, 19, 42]);
    }

    #[test]
    fn test_list_others_alone() {
        let mut manager = ClientManager::new();
        let (client, _rx) = test_client(1);
        manager.register(client);

        assert!(manager.list_others(1).is_empty());
    }

    #[test]
    fn test_allocate_id_skips_taken_ids() {
        let first_draw = StdRng::seed_from_u64(7).gen_range(1..=ClientId::MAX);

        let mut manager = ClientManager::new();
        let (client, _rx) = test_client(first_draw);
        manager.register(client);

        let allocated = manager.allocate_id(&mut StdRng::seed_from_u64(7));
        assert_ne!(allocated, first_draw);
        assert!(allocated >= 1);
        assert!(!manager.contains(allocated));
    }

    #[test]
    fn test_send_reaches_outbound_queue() {
        let mut manager = ClientManager::new();
        let (client, mut rx) = test_client(5);
        manager.register(client);

        assert!(manager.send(5, ServerFrame::Id(5)));
        assert_eq!(rx.try_recv().ok(), Some(ServerFrame::Id(5)));
    }

    #[test]
    fn test_send_to_missing_or_closed_client() {
        let mut manager = ClientManager::new();
        assert!(!manager.send(5, ServerFrame::Id(5)));

        let (client, rx) = test_client(6);
        manager.register(client);
        drop(rx);
        assert!(!manager.send(6, ServerFrame::Id(6)));
    }
}
