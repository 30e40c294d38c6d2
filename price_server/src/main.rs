//! Synthetic price UDP streaming server.
//!
//! This binary is the transport around the `price_server` core. It wires together:
//!
//! - `EmissionScheduler` — one periodic worker per subscribed client, all moving the same
//!   shared `InstrumentRegistry`.
//! - `CommandReceiver` — accepts `SUBSCRIBE` commands over TCP and resolves the client's
//!   UDP address.
//! - Per‑client stream thread — drains that client's bounded `ChannelSink` queue and sends
//!   every `PriceUpdate` as a JSON `PricePayload` datagram.
//! - `UdpPingListener` + ping checker — detect clients that stopped pinging.
//!
//! Concurrency and shutdown:
//! - Crossbeam `select!` multiplexes commands, client timeouts and Ctrl+C in the main loop.
//! - A timed-out client is unsubscribed through its own handle only; every other client
//!   keeps streaming. Its scheduler worker exits, the sink is dropped and the stream thread
//!   ends when its queue disconnects.
//! - Ctrl+C calls `stop_all` and returns.
//!
//! Network protocol (high‑level):
//! - TCP `0.0.0.0:8080`: one JSON `Command` (`SUBSCRIBE`, UDP port) per connection.
//! - UDP `0.0.0.0:8081`: clients send `PING` datagrams from the socket they receive on.
#![warn(missing_docs)]
use crate::args::Args;
use crate::receiver::CommandReceiver;
use crate::udp_listener::{UdpPingListener, start_ping_monitor};
use clap::Parser;
use crossbeam_channel::{Receiver, Sender, select, unbounded};
use log::{debug, error, info, warn};
use price_common::command::Command;
use price_common::{PriceError, Result};
use price_server::model::instrument::parse_instruments;
use price_server::model::ping_monitor::PingMonitor;
use price_server::{
    ChannelSink, EmissionScheduler, InstrumentConfig, InstrumentRegistry, PriceUpdate,
    SubscriptionHandle, default_instruments,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::net::{SocketAddr, UdpSocket};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

mod args;
mod receiver;
mod udp_listener;

/// Events reported to the main loop by background threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// The client stopped pinging.
    TimedOut(SocketAddr),
}

/// Stream task for a single client.
///
/// Forwards every update from `data_rx` to `target_addr` as JSON. Send failures are logged
/// and skipped; disconnects are detected by the ping monitor, not here. The task ends when
/// the subscription's sink is dropped and `data_rx` disconnects.
pub fn handle_client_stream(
    socket: Arc<UdpSocket>,
    target_addr: SocketAddr,
    data_rx: Receiver<PriceUpdate>,
) {
    for update in data_rx.iter() {
        let data = match update.to_json_bytes() {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to serialize update to JSON: {}", e);
                continue;
            }
        };
        if let Err(e) = socket.send_to(&data, target_addr) {
            warn!("Failed to send UDP packet to {}: {}", target_addr, e);
        }
    }
    debug!("Stream for {} drained", target_addr);
}

struct Server {
    scheduler: EmissionScheduler,
    socket: Arc<UdpSocket>,
    ping_monitor: Arc<Mutex<PingMonitor>>,
    queue_capacity: usize,
    active_streams: HashMap<SocketAddr, SubscriptionHandle>,
}

impl Server {
    fn subscribe_client(&mut self, cmd: Command, target_addr: SocketAddr) -> Result<()> {
        if let Some(previous) = self.active_streams.remove(&target_addr) {
            info!("{} re-subscribed; replacing its stream", target_addr);
            self.scheduler.unsubscribe(&previous);
        }

        let (sink, data_rx) = ChannelSink::bounded(self.queue_capacity);
        let handle = self.scheduler.subscribe(sink)?;
        self.ping_monitor.lock()?.register(target_addr);
        self.active_streams.insert(target_addr, handle);

        let socket = Arc::clone(&self.socket);
        thread::Builder::new()
            .name(format!("stream-{}", target_addr))
            .spawn(move || handle_client_stream(socket, target_addr, data_rx))?;
        info!(
            "A stream has been created for the client on a UDP address: {} ({} transport)",
            target_addr, cmd.connection
        );
        Ok(())
    }

    fn drop_client(&mut self, client_addr: SocketAddr) {
        match self.active_streams.remove(&client_addr) {
            Some(handle) => {
                self.scheduler.unsubscribe(&handle);
                info!("Stream for {} closed: ping timeout", client_addr);
            }
            None => debug!("Timeout for unknown client {}", client_addr),
        }
        if let Ok(mut monitor) = self.ping_monitor.lock() {
            monitor.remove(&client_addr);
        }
    }
}

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    let configs = match &args.instruments {
        Some(path) => load_instruments(path)?,
        None => default_instruments(),
    };
    let registry = Arc::new(InstrumentRegistry::new(configs)?);
    for instrument in registry.list()? {
        info!(
            "Instrument {}: s0={} spread={} ({} decimals)",
            instrument.id(),
            instrument.config.s0,
            instrument.config.spread,
            instrument.decimal_places()
        );
    }
    let scheduler = EmissionScheduler::new(registry, args.scheduler_config()?);

    let udp_socket = Arc::new(UdpSocket::bind(format!("0.0.0.0:{}", args.data_port))?);
    info!("UDP socket created on: {}", udp_socket.local_addr()?);

    let ping_monitor = Arc::new(Mutex::new(PingMonitor::new(args.ping_timeout())));
    UdpPingListener::start(Arc::clone(&udp_socket), Arc::clone(&ping_monitor));

    let (event_tx, event_rx) = unbounded::<ClientEvent>();
    start_ping_monitor(Arc::clone(&ping_monitor), event_tx, Duration::from_secs(1));

    let (cmd_tx, cmd_rx) = unbounded::<(Command, SocketAddr)>();
    let tcp_receiver = CommandReceiver::new(&format!("0.0.0.0:{}", args.command_port))?;
    thread::spawn(move || {
        if let Err(e) = tcp_receiver.receive_loop_with_channel(cmd_tx) {
            error!("Receiver loop failed: {}", e);
        }
    });

    let shutdown_rx = install_shutdown_handler()?;

    let mut server = Server {
        scheduler,
        socket: udp_socket,
        ping_monitor,
        queue_capacity: args.queue_capacity,
        active_streams: HashMap::new(),
    };

    loop {
        select! {
            recv(cmd_rx) -> msg => match msg {
                Ok((cmd, target_udp_addr)) => {
                    if let Err(e) = server.subscribe_client(cmd, target_udp_addr) {
                        error!("Failed to subscribe client {}: {}", target_udp_addr, e);
                    }
                }
                Err(_) => {
                    error!("Command receiver stopped");
                    break;
                }
            },
            recv(event_rx) -> event => if let Ok(ClientEvent::TimedOut(client_addr)) = event {
                server.drop_client(client_addr);
            },
            recv(shutdown_rx) -> _ => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    let stopped = server.scheduler.stop_all();
    info!("Server stopped ({} active streams closed)", stopped);
    Ok(())
}

fn load_instruments(path: &Path) -> Result<Vec<InstrumentConfig>> {
    let file = File::open(path)
        .map_err(|e| PriceError::Configuration(format!("cannot open {}: {}", path.display(), e)))?;
    parse_instruments(BufReader::new(file))
}

fn install_shutdown_handler() -> Result<Receiver<()>> {
    let (shutdown_tx, shutdown_rx): (Sender<()>, Receiver<()>) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })
    .map_err(|e| PriceError::Configuration(format!("cannot install Ctrl+C handler: {}", e)))?;
    Ok(shutdown_rx)
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use price_common::PricePayload;
    use price_server::{SchedulerConfig, SubscriptionState};

    fn server() -> Server {
        let registry = Arc::new(InstrumentRegistry::with_defaults().unwrap());
        let config = SchedulerConfig {
            period: Duration::from_millis(10),
            ..SchedulerConfig::default()
        };
        let monitor = PingMonitor::new(Duration::from_secs(5));
        Server {
            scheduler: EmissionScheduler::new(registry, config),
            socket: Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap()),
            ping_monitor: Arc::new(Mutex::new(monitor)),
            queue_capacity: 64,
            active_streams: HashMap::new(),
        }
    }

    fn udp_client() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let timeout = Some(Duration::from_secs(2));
        socket.set_read_timeout(timeout).unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    fn subscribe_command(addr: SocketAddr) -> Command {
        Command::new(&addr.ip().to_string(), &addr.port().to_string())
    }

    /// Discards queued datagrams, leaving the socket non-blocking.
    fn drain(socket: &UdpSocket) -> usize {
        socket.set_nonblocking(true).unwrap();
        let mut buf = [0u8; 512];
        let mut count = 0;
        while socket.recv(&mut buf).is_ok() {
            count += 1;
        }
        count
    }

    #[test]
    fn timed_out_client_is_dropped_alone() {
        let mut server = server();
        let (a_socket, a) = udp_client();
        let (b_socket, b) = udp_client();
        server.subscribe_client(subscribe_command(a), a).unwrap();
        server.subscribe_client(subscribe_command(b), b).unwrap();
        let a_handle = server.active_streams[&a].clone();

        let dropped_at = Utc::now();
        server.drop_client(a);

        assert_eq!(a_handle.state(), SubscriptionState::Stopped);
        assert!(!server.active_streams.contains_key(&a));
        assert!(server.active_streams[&b].is_active());
        assert_eq!(server.scheduler.active_count(), 1);
        assert!(!server.ping_monitor.lock().unwrap().is_client_active(&a));

        // b still gets updates produced after a was dropped
        let mut buf = [0u8; 512];
        loop {
            let size = b_socket.recv(&mut buf).unwrap();
            let payload = PricePayload::from_json_bytes(&buf[..size]).unwrap();
            if payload.parsed_timestamp().unwrap() > dropped_at {
                break;
            }
        }

        thread::sleep(Duration::from_millis(100));
        drain(&a_socket);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(drain(&a_socket), 0);
    }

    #[test]
    fn resubscribe_replaces_previous_stream() {
        let mut server = server();
        let (socket, addr) = udp_client();
        server.subscribe_client(subscribe_command(addr), addr).unwrap();
        let first = server.active_streams[&addr].clone();
        server.subscribe_client(subscribe_command(addr), addr).unwrap();
        let second = server.active_streams[&addr].clone();

        assert_eq!(first.state(), SubscriptionState::Stopped);
        assert_eq!(second.state(), SubscriptionState::Active);
        assert_ne!(first.id(), second.id());
        assert_eq!(server.active_streams.len(), 1);
        assert_eq!(server.scheduler.active_count(), 1);
        assert!(server.ping_monitor.lock().unwrap().is_client_active(&addr));

        let mut buf = [0u8; 512];
        assert!(socket.recv(&mut buf).is_ok());
    }

    #[test]
    fn client_stream_sends_json_payloads() {
        let (client, target) = udp_client();
        let server_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());

        let registry = Arc::new(InstrumentRegistry::with_defaults().unwrap());
        let scheduler = EmissionScheduler::new(
            registry,
            SchedulerConfig {
                period: Duration::from_millis(10),
                ..SchedulerConfig::default()
            },
        );
        let (sink, data_rx) = ChannelSink::bounded(64);
        let handle = scheduler.subscribe(sink).unwrap();
        let stream = thread::spawn(move || handle_client_stream(server_socket, target, data_rx));

        let mut buf = [0u8; 512];
        let size = client.recv(&mut buf).unwrap();
        let payload = PricePayload::from_json_bytes(&buf[..size]).unwrap();
        assert_eq!(payload.asset, "WTI");
        assert!((payload.bid - (payload.last - 0.1)).abs() < 1e-9);
        assert!(payload.parsed_timestamp().is_ok());

        scheduler.unsubscribe(&handle);
        stream.join().unwrap();
    }

    #[test]
    fn missing_instrument_file_is_a_configuration_error() {
        let missing = Path::new("/definitely/not/here.json");
        assert!(matches!(
            load_instruments(missing),
            Err(PriceError::Configuration(_))
        ));
    }
}
