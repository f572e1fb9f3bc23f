//! Dashboard connection tracking for the control endpoint
//!
//! This module handles the server-side bookkeeping of attached dashboards:
//! - Connection lifecycle (connect, disconnect, heartbeat timeout)
//! - Duplicate request suppression for retransmitted datagrams
//! - Capacity limits and address tracking for reply routing

use log::info;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// How many recent request ids are remembered per dashboard
const RECENT_REQUEST_WINDOW: usize = 64;

/// Dashboards silent for longer than this are dropped
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected dashboard
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this dashboard
    pub last_seen: Instant,
    /// Most recent request ids, oldest first
    recent_requests: VecDeque<u64>,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            recent_requests: VecDeque::with_capacity(RECENT_REQUEST_WINDOW),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Records a request id, returning false if it was already seen recently
    ///
    /// Ids are not required to arrive in order; only exact repeats inside the
    /// window are rejected.
    pub fn record_request(&mut self, request_id: u64) -> bool {
        self.touch();
        if self.recent_requests.contains(&request_id) {
            return false;
        }
        if self.recent_requests.len() == RECENT_REQUEST_WINDOW {
            self.recent_requests.pop_front();
        }
        self.recent_requests.push_back(request_id);
        true
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all attached dashboards
pub struct ClientManager {
    clients: HashMap<u32, Client>,
    next_client_id: u32,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to register a dashboard
    ///
    /// Returns None if the endpoint is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Dashboard {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Dashboard {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Refreshes a dashboard's activity timestamp
    pub fn touch(&mut self, client_id: u32) -> bool {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.touch();
            true
        } else {
            false
        }
    }

    /// Returns true if the request is new for this dashboard and should be handled
    pub fn record_request(&mut self, client_id: u32, request_id: u64) -> bool {
        self.clients
            .get_mut(&client_id)
            .map(|client| client.record_request(request_id))
            .unwrap_or(false)
    }

    /// Removes dashboards that stopped sending heartbeats
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = Client::new(1, test_addr());
        assert_eq!(client.id, 1);
        assert_eq!(client.addr, test_addr());
        assert!(client.recent_requests.is_empty());
    }

    #[test]
    fn test_duplicate_requests_rejected() {
        let mut client = Client::new(1, test_addr());
        assert!(client.record_request(2));
        assert!(client.record_request(1));
        assert!(!client.record_request(2));
        assert!(client.record_request(3));
    }

    #[test]
    fn test_request_window_forgets_oldest() {
        let mut client = Client::new(1, test_addr());
        for id in 0..RECENT_REQUEST_WINDOW as u64 + 1 {
            assert!(client.record_request(id));
        }
        assert_eq!(client.recent_requests.len(), RECENT_REQUEST_WINDOW);
        // id 0 fell out of the window
        assert!(client.record_request(0));
    }

    #[test]
    fn test_client_timeout() {
        let mut client = Client::new(1, test_addr());
        assert!(!client.is_timed_out(Duration::from_secs(1)));

        client.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(client.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_add_client_max_capacity() {
        let mut manager = ClientManager::new(1);

        assert_eq!(manager.add_client(test_addr()), Some(1));
        assert!(manager.add_client(test_addr2()).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_client() {
        let mut manager = ClientManager::new(2);
        let client_id = manager.add_client(test_addr()).unwrap();

        assert!(manager.remove_client(&client_id));
        assert!(manager.is_empty());
        assert!(!manager.remove_client(&999));
    }

    #[test]
    fn test_find_client_by_addr() {
        let mut manager = ClientManager::new(2);
        let client_id1 = manager.add_client(test_addr()).unwrap();
        let _client_id2 = manager.add_client(test_addr2()).unwrap();

        assert_eq!(manager.find_client_by_addr(test_addr()), Some(client_id1));

        let unknown_addr: SocketAddr = "192.168.1.1:9999".parse().unwrap();
        assert_eq!(manager.find_client_by_addr(unknown_addr), None);
    }

    #[test]
    fn test_record_request_unknown_client() {
        let mut manager = ClientManager::new(2);
        assert!(!manager.record_request(42, 1));
        assert!(!manager.touch(42));
    }

    #[test]
    fn test_check_timeouts() {
        let mut manager = ClientManager::new(2);
        let stale = manager.add_client(test_addr()).unwrap();
        let fresh = manager.add_client(test_addr2()).unwrap();

        manager.clients.get_mut(&stale).unwrap().last_seen =
            Instant::now() - Duration::from_secs(10);

        let removed = manager.check_timeouts(CLIENT_TIMEOUT);
        assert_eq!(removed, vec![stale]);
        assert_eq!(manager.find_client_by_addr(test_addr2()), Some(fresh));
        assert_eq!(manager.len(), 1);
    }
}
