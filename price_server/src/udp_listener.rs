use crate::ClientEvent;
use crossbeam_channel::Sender;
use log::{debug, warn};
use price_common::net::PING_MESSAGE;
use price_server::model::ping_monitor::PingMonitor;
use std::net::UdpSocket;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Lightweight UDP listener that receives PING datagrams from clients
/// and refreshes the in-memory `PingMonitor` for the sender address.
pub struct UdpPingListener;

impl UdpPingListener {
    /// Spawn a background thread that reads UDP packets from `socket` and,
    /// when a `PING` message is observed, updates `ping_monitor` for the sender.
    pub fn start(socket: Arc<UdpSocket>, ping_monitor: Arc<Mutex<PingMonitor>>) {
        thread::spawn(move || {
            let mut buf = [0u8; 128];
            loop {
                let (size, addr) = match socket.recv_from(&mut buf) {
                    Ok(received) => received,
                    Err(e) => {
                        debug!("UDP receive error: {}", e);
                        continue;
                    }
                };
                if !buf[..size].starts_with(PING_MESSAGE) {
                    continue;
                }
                match ping_monitor.lock() {
                    Ok(mut monitor) => {
                        if monitor.update_ping(addr) {
                            debug!("Received ping from {}", addr);
                        } else {
                            debug!("Ignoring ping from unsubscribed {}", addr);
                        }
                    }
                    Err(e) => warn!("Ping monitor unavailable: {}", e),
                }
            }
        });
    }
}

/// Spawn the checker that reports clients whose pings stopped.
pub fn start_ping_monitor(
    ping_monitor: Arc<Mutex<PingMonitor>>,
    events: Sender<ClientEvent>,
    check_interval: Duration,
) {
    thread::spawn(move || {
        loop {
            thread::sleep(check_interval);
            let timed_out_clients = match ping_monitor.lock() {
                Ok(mut monitor) => monitor.check_timeouts(),
                Err(e) => {
                    warn!("Ping monitor unavailable: {}", e);
                    continue;
                }
            };
            for client_addr in timed_out_clients {
                if events.send(ClientEvent::TimedOut(client_addr)).is_err() {
                    return;
                }
            }
        }
    });
}
