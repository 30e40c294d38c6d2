//! Domain models of the price server.
//!
//! - `instrument` — instrument definitions, defaults and precision rules.
//! - `registry` — the shared, per-instrument locked instrument store.
//! - `simulator` — the stochastic step function and draw sources.
//! - `update` — the `PriceUpdate` value and its wire conversion.
//! - `sink` — the delivery capability transports implement.
//! - `scheduler` — per-subscription periodic emission.
//! - `ping_monitor` — keep-alive tracker used to detect client disconnects.

pub mod instrument;
pub mod ping_monitor;
pub mod registry;
pub mod scheduler;
pub mod simulator;
pub mod sink;
pub mod update;
