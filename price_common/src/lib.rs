//!
//! Common types and utilities shared by the price server and client.
//!
//! This crate aggregates:
//! - `error` — unified error type `PriceError` used across the workspace.
//! - `result` — handy `Result<T, PriceError>` alias.
//! - `payload` — the JSON wire schema of a single price update.
//! - `command` — TCP command payloads exchanged between client and server.
//! - `net` — networking constants and small helpers.
#![warn(missing_docs)]
pub mod command;
pub mod error;
pub mod net;
pub mod payload;
pub mod result;

pub use command::{Command, CommandKind};
pub use error::PriceError;
pub use payload::PricePayload;
pub use result::Result;
