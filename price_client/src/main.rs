//! Price Client — a UDP client that subscribes to the synthetic price stream and prints
//! received quotes. It sends a `SUBSCRIBE` command to the server over TCP, keeps the
//! subscription alive with periodic `PING`s from the same UDP socket, and listens for
//! JSON `PricePayload` datagrams until Ctrl+C.
//!
//! Usage example (CLI):
//! ```bash
//! price_client --server-ip 192.168.0.10 --listen-port 55555 --assets WTI,SP500
//! ```
#![warn(missing_docs)]
mod args;
mod sender;

use crate::args::Args;
use crate::sender::CommandSender;
use clap::Parser;
use log::{debug, error, info, warn};
use price_common::command::Command;
use price_common::net::{COMMAND_PORT, DATA_PORT, addr};
use price_common::{PriceError, PricePayload, Result};
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

/// Runs a blocking loop that receives `PricePayload` messages from the given UDP `socket`
/// and logs the ones accepted by `args`. Returns an error if receiving fails.
fn start_receiver_loop(
    socket: Arc<UdpSocket>,
    args: &Args,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    info!("Price receiver running on: {}", socket.local_addr()?);
    let mut buf = [0u8; 2048];

    while !shutdown.load(Ordering::Relaxed) {
        match socket.recv(&mut buf) {
            Ok(size) => match PricePayload::from_json_bytes(&buf[..size]) {
                Ok(payload) if args.wants(&payload.asset) => {
                    info!(
                        "{} {:<6} bid={} ask={} last={}",
                        payload.timestamp, payload.asset, payload.bid, payload.ask, payload.last
                    );
                }
                Ok(_) => {}
                Err(_) => {
                    debug!(
                        "Received non-JSON message: {}",
                        String::from_utf8_lossy(&buf[..size])
                    );
                }
            },
            Err(e) => {
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut {
                    continue;
                }
                error!("Receive data error: {}", e);
                return Err(PriceError::Io(e));
            }
        }
    }
    info!("Receiver loop stopping...");
    Ok(())
}

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down client...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(shutdown_handler_error)?;
    }

    let server_ip = args.server_ip.trim().replace('"', "");
    let listen_port = args.listen_port.trim().replace('"', "");

    let server_command_address = addr(&server_ip, COMMAND_PORT);
    let server_udp_address = addr(&server_ip, DATA_PORT);
    let mut listen_address = format!("0.0.0.0:{}", listen_port);
    if listen_port == DATA_PORT.to_string() {
        warn!(
            "--listen-port={} matches DATA_PORT ({}); a free local port will be selected.",
            listen_port, DATA_PORT
        );
        listen_address = "0.0.0.0:0".to_string();
    }

    let client_udp_socket = Arc::new(UdpSocket::bind(&listen_address)?);
    client_udp_socket.set_read_timeout(Some(Duration::from_secs(5)))?;
    let client_local_addr = client_udp_socket.local_addr()?;
    info!("UDP client listening on: {}", client_local_addr);

    let command = Command::new(
        &client_local_addr.ip().to_string(),
        &client_local_addr.port().to_string(),
    );
    info!("Connecting to TCP server at {}", server_command_address);
    CommandSender::subscribe(&server_command_address, &command).map_err(|e| {
        error!("Sending error to server: {}", e);
        e
    })?;
    info!("Subscription sent to server {}.", server_command_address);

    CommandSender::start_ping_thread(
        Arc::clone(&client_udp_socket),
        server_udp_address,
        Arc::clone(&shutdown),
    );

    info!("Client is running. Press Ctrl+C to exit.");
    start_receiver_loop(client_udp_socket, &args, shutdown)
}

fn shutdown_handler_error(e: ctrlc::Error) -> PriceError {
    PriceError::Configuration(format!("cannot install Ctrl+C handler: {}", e))
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
