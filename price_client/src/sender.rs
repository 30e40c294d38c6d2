//! Sending commands to the price server.
//!
//! This module provides a small helper for sending the `SUBSCRIBE` command over TCP
//! and for running a background PING loop to keep the subscription alive.
use log::{debug, error, info};
use price_common::Result;
use price_common::command::Command;
use price_common::net::PING_MESSAGE;
use std::io::{ErrorKind, Write};
use std::net::{TcpStream, UdpSocket};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

/// PING interval in milliseconds used by the background thread.
const INTERVAL_MS: u64 = 2000;

/// Helper type for sending commands to the server.
pub struct CommandSender;

impl CommandSender {
    /// Send one JSON command over an established TCP stream.
    pub fn send_command<W: Write>(stream: &mut W, command: &Command) -> Result<()> {
        let payload = serde_json::to_vec(command)?;
        info!(
            "Sending {} for udp://{}:{}",
            command.header, command.address, command.port
        );
        stream.write_all(&payload)?;
        stream.flush()?;
        Ok(())
    }

    /// Connect to `server_addr` and send `command`.
    pub fn subscribe(server_addr: &str, command: &Command) -> Result<()> {
        let mut stream = TcpStream::connect(server_addr)?;
        Self::send_command(&mut stream, command)
    }

    /// Ping `target_addr` from `socket` until `shutdown` is set.
    ///
    /// Pings must leave from the socket prices arrive on: the server matches them
    /// against the subscribed address.
    pub fn start_ping_thread(
        socket: Arc<UdpSocket>,
        target_addr: String,
        shutdown: Arc<AtomicBool>,
    ) {
        info!("Ping thread started. Target: {}", target_addr);
        thread::spawn(move || {
            let interval = Duration::from_millis(INTERVAL_MS);
            while !shutdown.load(Ordering::Relaxed) {
                thread::sleep(interval);
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                match socket.send_to(PING_MESSAGE, &target_addr) {
                    Ok(_) => debug!("PING sent to {}", target_addr),
                    Err(ref e) if e.kind() == ErrorKind::ConnectionReset => {
                        continue;
                    }
                    Err(e) => {
                        error!("PING THREAD ERROR: Failed to send PING: {}", e);
                    }
                }
            }
            info!("Ping thread stopping...");
        });
    }
}
