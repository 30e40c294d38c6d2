//! Ping/keep-alive state tracker for subscribed UDP clients.
//!
//! The transport registers every client it subscribes, refreshes it whenever a
//! `PING` datagram arrives from that address and periodically asks which
//! clients went silent. A silent client is treated as disconnected: the caller
//! unsubscribes exactly that client's handle.
//!
//! Design notes:
//! - Time is measured using `std::time::Instant`, which is monotonic and immune to system
//!   clock changes.
//! - The monitor is not synchronized; share it behind a `Mutex`.
//! - Pings from addresses that never subscribed are ignored, so stray traffic
//!   cannot keep phantom clients alive.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Tracks client keep-alive pings and reports clients that exceeded the timeout.
pub struct PingMonitor {
    last_seen: HashMap<SocketAddr, Instant>,
    timeout: Duration,
}

impl PingMonitor {
    /// Monitor with the given silence threshold.
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_seen: HashMap::new(),
            timeout,
        }
    }

    /// Start tracking `addr`, counting the subscription itself as a ping.
    pub fn register(&mut self, addr: SocketAddr) {
        self.last_seen.insert(addr, Instant::now());
    }

    /// Stop tracking `addr`.
    pub fn remove(&mut self, addr: &SocketAddr) -> bool {
        self.last_seen.remove(addr).is_some()
    }

    /// Record a ping. Returns `false` for unknown addresses.
    pub fn update_ping(&mut self, addr: SocketAddr) -> bool {
        match self.last_seen.get_mut(&addr) {
            Some(seen) => {
                *seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Remove and return every client silent for longer than the timeout.
    pub fn check_timeouts(&mut self) -> Vec<SocketAddr> {
        self.expire_at(Instant::now())
    }

    fn expire_at(&mut self, now: Instant) -> Vec<SocketAddr> {
        let timeout = self.timeout;
        let mut timed_out = Vec::new();

        self.last_seen.retain(|addr, seen| {
            if now.saturating_duration_since(*seen) > timeout {
                timed_out.push(*addr);
                false
            } else {
                true
            }
        });
        timed_out
    }

    /// Check whether `addr` is currently tracked.
    pub fn is_client_active(&self, addr: &SocketAddr) -> bool {
        self.last_seen.contains_key(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn unknown_pings_are_ignored() {
        let mut monitor = PingMonitor::new(Duration::from_secs(5));
        assert!(!monitor.update_ping(addr(4000)));
        assert!(!monitor.is_client_active(&addr(4000)));
    }

    #[test]
    fn only_silent_clients_time_out() {
        let mut monitor = PingMonitor::new(Duration::from_secs(5));
        monitor.register(addr(4000));
        monitor.register(addr(4001));

        let later = Instant::now() + Duration::from_secs(6);
        monitor.last_seen.insert(addr(4001), later);

        assert_eq!(monitor.expire_at(later), vec![addr(4000)]);
        assert!(!monitor.is_client_active(&addr(4000)));
        assert!(monitor.is_client_active(&addr(4001)));
        assert!(monitor.expire_at(later).is_empty());
    }

    #[test]
    fn ping_refreshes_registration() {
        let mut monitor = PingMonitor::new(Duration::from_millis(0));
        monitor.register(addr(4000));
        assert!(monitor.update_ping(addr(4000)));
        assert!(monitor.remove(&addr(4000)));
        assert!(!monitor.remove(&addr(4000)));
    }
}
