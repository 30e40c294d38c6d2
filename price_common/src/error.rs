//! Error types shared between client and server.
//!
//! The `PriceError` enum carries the three failure classes of the streaming core
//! (configuration, invalid prices and sink delivery) next to the ambient I/O,
//! serialization and channel failures of the transport, so every crate can
//! propagate a single error type.
//!
//! Only `Configuration` is fatal; the others are contained by whoever hits them.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by client and server.
#[derive(Error, Debug)]
pub enum PriceError {
    /// Invalid instrument definitions or server settings. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A price that is non-finite or not strictly positive.
    #[error("Invalid price for {id}: {price}")]
    InvalidPrice {
        /// Instrument the price was computed for.
        id: String,
        /// Offending value.
        price: f64,
    },

    /// A subscriber's sink refused an update; contains a short context string.
    #[error("Sink delivery failed: {0}")]
    SinkDelivery(String),

    /// Lookup of an instrument id that the registry does not hold.
    #[error("Instrument not found: {0}")]
    InstrumentNotFound(String),

    /// I/O error originating from the standard library or sockets/files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl<T> From<PoisonError<T>> for PriceError {
    fn from(err: PoisonError<T>) -> Self {
        PriceError::MutexLock(err.to_string())
    }
}
