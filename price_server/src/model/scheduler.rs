//! Per-subscription periodic emission.
//!
//! Every `subscribe` call spawns one worker thread driven by a crossbeam
//! `tick` channel. On each tick the worker walks the registry in order and, for
//! each instrument, draws a random sample, advances the price under that
//! instrument's lock, builds the `PriceUpdate` while still holding it, then
//! releases the lock and pushes the update to its own sink.
//!
//! Concurrency and shutdown:
//! - Workers share the `InstrumentRegistry`, so all subscriptions move the same
//!   price path. Per-instrument locks serialize their read-modify-write steps.
//! - Each subscription owns a private stop channel and a stopped flag. There is
//!   no shared control channel: `unsubscribe` touches exactly one worker.
//! - The stopped flag is re-checked before every instrument, so once
//!   `unsubscribe` returns at most the update already being built is delivered.
//! - Sink pushes happen outside every lock. A failed push is logged and the
//!   subscription carries on.
//! - However a worker exits (cancelled, or its sink panicked), it marks its
//!   handle stopped and removes its own entry from the active table.

use crate::model::registry::InstrumentRegistry;
use crate::model::simulator::{DrawSource, PriceSimulator, UniformDraw};
use crate::model::sink::Sink;
use crate::model::update::PriceUpdate;
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, bounded, select, tick};
use log::{debug, error, info, trace, warn};
use price_common::{PriceError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Default tick period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(200);

/// Builds the draw source for a new subscription from its id.
pub type DrawFactory = Arc<dyn Fn(u64) -> Box<dyn DrawSource> + Send + Sync>;

/// Scheduler settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    /// Time between two ticks of one subscription.
    pub period: Duration,
    /// Step function and its non-positive policy.
    pub simulator: PriceSimulator,
    /// When set, subscription `n` draws from `StdRng` seeded with `seed + n`.
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            simulator: PriceSimulator::default(),
            seed: None,
        }
    }
}

/// Lifecycle of one subscription. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Ticking.
    Active,
    /// Cancelled or its worker has exited.
    Stopped,
}

/// Opaque reference to one emission stream.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: u64,
    stopped: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    /// Unique id within the scheduler.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SubscriptionState {
        if self.stopped.load(Ordering::Acquire) {
            SubscriptionState::Stopped
        } else {
            SubscriptionState::Active
        }
    }

    /// Shorthand for `state() == Active`.
    pub fn is_active(&self) -> bool {
        self.state() == SubscriptionState::Active
    }
}

struct ActiveSubscription {
    stop_tx: Sender<()>,
    stopped: Arc<AtomicBool>,
}

type ActiveTable = Mutex<HashMap<u64, ActiveSubscription>>;

impl ActiveSubscription {
    fn cancel(self) {
        self.stopped.store(true, Ordering::Release);
        // A full buffer means a stop is already pending; dropping the sender
        // disconnects the channel either way.
        let _ = self.stop_tx.try_send(());
    }
}

fn take_entry(active: &ActiveTable, id: u64) -> Option<ActiveSubscription> {
    match active.lock() {
        Ok(mut active) => active.remove(&id),
        Err(poisoned) => poisoned.into_inner().remove(&id),
    }
}

/// Runs when the worker exits, panics included: marks the handle stopped, then
/// drops the subscription's entry from the active table.
struct ExitGuard {
    id: u64,
    stopped: Arc<AtomicBool>,
    active: Arc<ActiveTable>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        if take_entry(&self.active, self.id).is_some() {
            debug!("Subscription {} removed itself from the active table", self.id);
        }
    }
}

/// Drives periodic price emission for any number of independent subscriptions.
pub struct EmissionScheduler {
    registry: Arc<InstrumentRegistry>,
    config: SchedulerConfig,
    draw_factory: DrawFactory,
    next_id: AtomicU64,
    active: Arc<ActiveTable>,
}

impl EmissionScheduler {
    /// Scheduler over a shared registry.
    pub fn new(registry: Arc<InstrumentRegistry>, config: SchedulerConfig) -> Self {
        let seed = config.seed;
        let draw_factory: DrawFactory = Arc::new(move |id: u64| -> Box<dyn DrawSource> {
            match seed {
                Some(seed) => Box::new(UniformDraw::seeded(seed.wrapping_add(id))),
                None => Box::new(UniformDraw::new()),
            }
        });
        Self {
            registry,
            config,
            draw_factory,
            next_id: AtomicU64::new(1),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Replace how subscriptions obtain their random draws.
    pub fn with_draw_factory(mut self, draw_factory: DrawFactory) -> Self {
        self.draw_factory = draw_factory;
        self
    }

    /// Shared registry.
    pub fn registry(&self) -> &Arc<InstrumentRegistry> {
        &self.registry
    }

    /// Scheduler settings.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Start an independent periodic stream into `sink`.
    pub fn subscribe<S: Sink>(&self, sink: S) -> Result<SubscriptionHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let stopped = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let worker = Worker {
            id,
            registry: Arc::clone(&self.registry),
            simulator: self.config.simulator,
            draws: (self.draw_factory)(id),
            sink: Box::new(sink),
            stopped: Arc::clone(&stopped),
            active: Arc::clone(&self.active),
        };
        let period = self.config.period;

        // Register before spawning so an immediate unsubscribe always finds it.
        self.active.lock()?.insert(
            id,
            ActiveSubscription {
                stop_tx,
                stopped: Arc::clone(&stopped),
            },
        );

        let spawned = thread::Builder::new()
            .name(format!("subscription-{}", id))
            .spawn(move || worker.run(period, stop_rx));

        if let Err(e) = spawned {
            if let Some(entry) = take_entry(&self.active, id) {
                entry.cancel();
            }
            return Err(PriceError::Io(e));
        }

        info!("Subscription {} started (period {:?})", id, period);
        Ok(SubscriptionHandle { id, stopped })
    }

    /// Stop one subscription. Calling it again, or on a handle whose worker is
    /// already gone, does nothing.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        handle.stopped.store(true, Ordering::Release);
        if let Some(entry) = take_entry(&self.active, handle.id) {
            entry.cancel();
            info!("Subscription {} stopped", handle.id);
        }
    }

    /// Stop every subscription. Meant for process shutdown.
    pub fn stop_all(&self) -> usize {
        let drained: Vec<(u64, ActiveSubscription)> = match self.active.lock() {
            Ok(mut active) => active.drain().collect(),
            Err(poisoned) => poisoned.into_inner().drain().collect(),
        };
        let count = drained.len();
        for (_, entry) in drained {
            entry.cancel();
        }
        if count > 0 {
            info!("Stopped all subscriptions ({})", count);
        }
        count
    }

    /// Number of subscriptions still ticking.
    pub fn active_count(&self) -> usize {
        match self.active.lock() {
            Ok(active) => active
                .values()
                .filter(|entry| !entry.stopped.load(Ordering::Acquire))
                .count(),
            Err(_) => 0,
        }
    }

    /// `true` while `handle`'s worker is registered and ticking.
    pub fn is_active(&self, handle: &SubscriptionHandle) -> bool {
        handle.is_active()
            && self
                .active
                .lock()
                .map(|active| active.contains_key(&handle.id))
                .unwrap_or(false)
    }
}

impl Drop for EmissionScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

struct Worker {
    id: u64,
    registry: Arc<InstrumentRegistry>,
    simulator: PriceSimulator,
    draws: Box<dyn DrawSource>,
    sink: Box<dyn Sink>,
    stopped: Arc<AtomicBool>,
    active: Arc<ActiveTable>,
}

impl Worker {
    fn run(mut self, period: Duration, stop_rx: Receiver<()>) {
        let _guard = ExitGuard {
            id: self.id,
            stopped: Arc::clone(&self.stopped),
            active: Arc::clone(&self.active),
        };
        let ticker = tick(period);
        let mut ticks: u64 = 0;

        loop {
            select! {
                recv(stop_rx) -> _ => break,
                recv(ticker) -> _ => {
                    if self.is_stopped() {
                        break;
                    }
                    ticks += 1;
                    self.emit_tick(ticks);
                }
            }
        }
        debug!("Subscription {} worker exiting after {} ticks", self.id, ticks);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn emit_tick(&mut self, tick_no: u64) {
        trace!("Subscription {} tick {}", self.id, tick_no);
        for position in 0..self.registry.len() {
            if self.is_stopped() {
                return;
            }
            let draw = self.draws.draw();
            let simulator = self.simulator;
            let stepped = self.registry.advance(position, |instrument| {
                match simulator.step(instrument, draw) {
                    Ok(price) => instrument.last_price = price,
                    Err(e) => warn!("Keeping previous price for {}: {}", instrument.id(), e),
                }
                PriceUpdate::from_instrument(instrument, Utc::now())
            });

            match stepped {
                Ok(update) => {
                    if let Err(e) = self.sink.push(&update) {
                        warn!(
                            "Subscription {}: dropped {} update: {}",
                            self.id, update.instrument_id, e
                        );
                    }
                }
                Err(e) => error!("Subscription {}: registry step failed: {}", self.id, e),
            }
        }
    }
}
