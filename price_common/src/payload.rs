//! Wire schema of a single price update.
//!
//! Every update leaves the server as one JSON object:
//!
//! ```json
//! { "asset": "WTI", "bid": 69.9, "ask": 70.1, "last": 70.0, "timestamp": "2024-05-01 13:45:10.250" }
//! ```
//!
//! `timestamp` is always UTC and rendered with [`TIMESTAMP_FORMAT`].
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PriceError;

/// `YYYY-MM-DD HH:mm:ss.SSS`, UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// JSON payload produced per instrument per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePayload {
    /// Instrument identifier.
    pub asset: String,
    /// `last - spread`.
    pub bid: f64,
    /// `last + spread`.
    pub ask: f64,
    /// Last simulated price.
    pub last: f64,
    /// UTC emission time, see [`TIMESTAMP_FORMAT`].
    pub timestamp: String,
}

impl PricePayload {
    /// Encode the payload to JSON bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, PriceError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a payload from JSON bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, PriceError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Parse `timestamp` back into a UTC instant.
    pub fn parsed_timestamp(&self) -> Result<DateTime<Utc>, PriceError> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| PriceError::Format(format!("bad timestamp {:?}: {}", self.timestamp, e)))
    }
}

/// Render an instant in the wire format.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}
