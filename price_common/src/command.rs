//! Shared protocol command type used by client and server.
//!
//! A `Command` is either a subscription request (`SUBSCRIBE`) carrying the UDP
//! port the client listens on, or a keep-alive `PING`. Commands travel as JSON.
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::PriceError;

/// Transport kind (currently UDP).
pub const CONNECTION: &str = "udp";

/// Command kinds understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum CommandKind {
    /// Start streaming prices to the given address.
    Subscribe,
    /// Keep an existing subscription alive.
    Ping,
}

/// Command payload sent between client and server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Command kind.
    pub header: CommandKind,
    /// Transport protocol name (e.g., `udp`).
    pub connection: String,
    /// IP address.
    pub address: String,
    /// Port as a string.
    pub port: String,
}

impl Command {
    /// Creates a new subscription command.
    pub fn new(address: &str, port: &str) -> Self {
        Command {
            header: CommandKind::Subscribe,
            connection: String::from(CONNECTION),
            address: String::from(address),
            port: String::from(port),
        }
    }

    /// Creates a new keep-alive `PING` command.
    pub fn new_ping(address: &str, port: &str) -> Self {
        Command {
            header: CommandKind::Ping,
            ..Command::new(address, port)
        }
    }

    /// Parse the UDP port the client listens on.
    pub fn udp_port(&self) -> Result<u16, PriceError> {
        self.port
            .trim()
            .parse()
            .map_err(|e| PriceError::Format(format!("Invalid UDP port {:?}: {}", self.port, e)))
    }

    /// Build UDP socket address from the fields.
    pub fn get_udp_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.address, self.port).parse()
    }
}
