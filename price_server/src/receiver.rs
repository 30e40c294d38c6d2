use crossbeam_channel::Sender;
use log::{debug, info, warn};
use price_common::command::{Command, CommandKind};
use price_common::{PriceError, Result};
use std::io::Read;
use std::net::{SocketAddr, TcpListener, TcpStream};

/// TCP command receiver that accepts client subscription requests.
///
/// Each connection carries a single JSON `Command`. For every valid
/// `SUBSCRIBE`, the receiver emits the command together with the client's UDP
/// `SocketAddr` (TCP peer IP, advertised port) into the provided channel.
/// A bad command only costs that one connection; the listener keeps serving.
pub struct CommandReceiver {
    /// The underlying TCP listening socket.
    pub(crate) socket: TcpListener,
}

impl CommandReceiver {
    /// Bind a new TCP receiver to the provided `bind_addr` (e.g., `0.0.0.0:8080`).
    pub fn new(bind_addr: &str) -> Result<Self> {
        let socket = TcpListener::bind(bind_addr)?;
        Ok(Self { socket })
    }

    /// Blocking loop that accepts TCP connections and forwards decoded
    /// subscriptions to `commands`. Returns only when `commands` is disconnected.
    pub(crate) fn receive_loop_with_channel(
        self,
        commands: Sender<(Command, SocketAddr)>,
    ) -> Result<()> {
        info!("Command TCP server is started on {}", self.socket.local_addr()?);

        for stream in self.socket.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("TCP connection error: {}", e);
                    continue;
                }
            };
            match Self::read_subscription(stream) {
                Ok(subscription) => {
                    commands
                        .send(subscription)
                        .map_err(|e| PriceError::ChannelSend(e.to_string()))?;
                }
                Err(e) => warn!("Rejected command: {}", e),
            }
        }
        Ok(())
    }

    fn read_subscription(mut stream: TcpStream) -> Result<(Command, SocketAddr)> {
        let client_tcp_addr = stream.peer_addr()?;
        debug!("client_tcp_addr: {:?}", &client_tcp_addr);

        let mut buf = [0u8; 1024];
        let size = stream.read(&mut buf)?;
        let cmd = parse_command(&buf[..size])?;
        info!("Received command {:?}", cmd);

        let target_udp_addr = SocketAddr::new(client_tcp_addr.ip(), cmd.udp_port()?);
        Ok((cmd, target_udp_addr))
    }
}

/// Decode one command and require it to be a subscription.
pub(crate) fn parse_command(bytes: &[u8]) -> Result<Command> {
    let cmd: Command = serde_json::from_slice(bytes)?;
    if cmd.header != CommandKind::Subscribe {
        return Err(PriceError::Format(format!(
            "expected {} over TCP, got {}",
            CommandKind::Subscribe,
            cmd.header
        )));
    }
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::io::Write;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn accepts_subscribe_only() {
        let subscribe = serde_json::to_vec(&Command::new("127.0.0.1", "40000")).unwrap();
        let cmd = parse_command(&subscribe).unwrap();
        assert_eq!(cmd.udp_port().unwrap(), 40000);

        let ping = serde_json::to_vec(&Command::new_ping("127.0.0.1", "40000")).unwrap();
        assert!(matches!(parse_command(&ping), Err(PriceError::Format(_))));
        assert!(matches!(
            parse_command(b"{not json"),
            Err(PriceError::SerdeJson(_))
        ));
    }

    #[test]
    fn bad_client_does_not_stop_the_listener() {
        let receiver = CommandReceiver::new("127.0.0.1:0").unwrap();
        let addr = receiver.socket.local_addr().unwrap();
        let (tx, rx) = unbounded();
        thread::spawn(move || receiver.receive_loop_with_channel(tx));

        let mut bad = TcpStream::connect(addr).unwrap();
        bad.write_all(b"garbage").unwrap();
        let good = serde_json::to_vec(&Command::new("127.0.0.1", "40001")).unwrap();
        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(&good).unwrap();

        let (cmd, target) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(cmd.header, CommandKind::Subscribe);
        assert_eq!(target, "127.0.0.1:40001".parse().unwrap());
    }
}
