//! Delivery capability implemented by transports.
//!
//! The scheduler pushes one `PriceUpdate` at a time into a `Sink`. A failing
//! push is logged and dropped by the scheduler; it never stops the
//! subscription.
//!
//! `ChannelSink` is the bounded-queue adapter used by the UDP transport: the
//! scheduler's worker only ever does a non-blocking `try_send`, and the
//! transport drains the queue on its own thread.

use crate::model::update::PriceUpdate;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use price_common::{PriceError, Result};

/// Receiver of price updates for one subscription.
///
/// A sink is moved into its subscription's worker thread and only used there,
/// so it must be `Send` but never needs to be `Sync`.
pub trait Sink: Send + 'static {
    /// Deliver one update.
    fn push(&self, update: &PriceUpdate) -> Result<()>;
}

impl<F> Sink for F
where
    F: Fn(&PriceUpdate) -> Result<()> + Send + 'static,
{
    fn push(&self, update: &PriceUpdate) -> Result<()> {
        self(update)
    }
}

/// Sink backed by a bounded crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<PriceUpdate>,
}

impl ChannelSink {
    /// Create a sink together with the receiving end of its queue.
    pub fn bounded(capacity: usize) -> (Self, Receiver<PriceUpdate>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }
}

impl Sink for ChannelSink {
    fn push(&self, update: &PriceUpdate) -> Result<()> {
        self.tx.try_send(update.clone()).map_err(|e| match e {
            TrySendError::Full(dropped) => PriceError::SinkDelivery(format!(
                "queue full, dropped {} update",
                dropped.instrument_id
            )),
            TrySendError::Disconnected(dropped) => PriceError::SinkDelivery(format!(
                "receiver gone, dropped {} update",
                dropped.instrument_id
            )),
        })
    }
}
