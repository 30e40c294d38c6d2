//! Synthetic price streaming core.
//!
//! The crate simulates a fixed set of instruments and streams bid/ask/last
//! quotes to any number of independent subscribers:
//!
//! - `InstrumentRegistry` holds every instrument's last price, one lock per
//!   instrument, shared by all subscriptions.
//! - `PriceSimulator` computes the next price from a uniform draw.
//! - `EmissionScheduler` runs one periodic worker per subscription and pushes
//!   each `PriceUpdate` into that subscription's `Sink`.
//!
//! Transports only need `subscribe`/`unsubscribe` and the `PricePayload`
//! schema from `price_common`.
//!
//! ```no_run
//! use price_server::{ChannelSink, EmissionScheduler, InstrumentRegistry, SchedulerConfig};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(InstrumentRegistry::with_defaults()?);
//! let scheduler = EmissionScheduler::new(registry, SchedulerConfig::default());
//! let (sink, updates) = ChannelSink::bounded(64);
//! let handle = scheduler.subscribe(sink)?;
//! let first = updates.recv().expect("scheduler running");
//! println!("{}", String::from_utf8_lossy(&first.to_json_bytes()?));
//! scheduler.unsubscribe(&handle);
//! # Ok::<(), price_common::PriceError>(())
//! ```
#![warn(missing_docs)]
pub mod model;

pub use model::instrument::{Instrument, InstrumentConfig, default_instruments};
pub use model::registry::InstrumentRegistry;
pub use model::scheduler::{
    DrawFactory, EmissionScheduler, SchedulerConfig, SubscriptionHandle, SubscriptionState,
};
pub use model::simulator::{
    DrawSource, FixedDraw, NonPositivePolicy, PriceSimulator, SequenceDraw, UniformDraw,
};
pub use model::sink::{ChannelSink, Sink};
pub use model::update::PriceUpdate;
