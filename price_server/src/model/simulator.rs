//! Stochastic price step.
//!
//! `PriceSimulator::next_price` computes
//!
//! ```text
//! S' = S * (1 + mu*dt + sigma*sqrt(dt)*draw)
//! ```
//!
//! with `draw` sampled uniformly from `[0, 1)`. The formula looks like a
//! geometric Brownian motion step, but the draw is deliberately *not* a
//! standard-normal sample; with a non-negative drift the path can only climb.
//!
//! The result is rounded to the instrument's precision (see
//! `Instrument::decimal_places`) and then checked: a non-finite value is always
//! rejected, a non-positive one is handled by the configured
//! [`NonPositivePolicy`].
//!
//! Randomness is injected through [`DrawSource`] so tests can pin the draws.

use crate::model::instrument::Instrument;
use price_common::{PriceError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Trading days per year.
pub const TRADING_DAYS: f64 = 252.0;
/// One trading day as a fraction of a year.
pub const DEFAULT_DT: f64 = 1.0 / TRADING_DAYS;
/// Price substituted for non-positive results under the default policy.
pub const DEFAULT_FLOOR: f64 = 0.01;

/// Supplier of random draws in `[0, 1)`.
pub trait DrawSource: Send {
    /// Next draw.
    fn draw(&mut self) -> f64;
}

/// Uniform draws backed by `StdRng`.
pub struct UniformDraw {
    rng: StdRng,
}

impl UniformDraw {
    /// Seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformDraw {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawSource for UniformDraw {
    fn draw(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Always returns the same draw.
#[derive(Debug, Clone, Copy)]
pub struct FixedDraw(pub f64);

impl DrawSource for FixedDraw {
    fn draw(&mut self) -> f64 {
        self.0
    }
}

/// Cycles through a fixed list of draws.
#[derive(Debug, Clone)]
pub struct SequenceDraw {
    draws: Vec<f64>,
    cursor: usize,
}

impl SequenceDraw {
    /// `draws` must not be empty.
    pub fn new(draws: Vec<f64>) -> Result<Self> {
        if draws.is_empty() {
            return Err(PriceError::Configuration(
                "draw sequence must not be empty".to_string(),
            ));
        }
        Ok(Self { draws, cursor: 0 })
    }
}

impl DrawSource for SequenceDraw {
    fn draw(&mut self) -> f64 {
        let value = self.draws[self.cursor];
        self.cursor = (self.cursor + 1) % self.draws.len();
        value
    }
}

/// What to do with a step that lands at or below zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NonPositivePolicy {
    /// Replace the result with `floor` (must be finite and > 0).
    Clamp {
        /// Substitute price.
        floor: f64,
    },
    /// Fail the step with `PriceError::InvalidPrice`.
    Reject,
}

impl Default for NonPositivePolicy {
    fn default() -> Self {
        NonPositivePolicy::Clamp {
            floor: DEFAULT_FLOOR,
        }
    }
}

/// Stateless price step function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSimulator {
    dt: f64,
    policy: NonPositivePolicy,
}

impl Default for PriceSimulator {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            policy: NonPositivePolicy::default(),
        }
    }
}

impl PriceSimulator {
    /// Simulator with a custom time step and policy.
    pub fn new(dt: f64, policy: NonPositivePolicy) -> Result<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(PriceError::Configuration(format!(
                "dt must be > 0, got {}",
                dt
            )));
        }
        if let NonPositivePolicy::Clamp { floor } = policy {
            if !floor.is_finite() || floor <= 0.0 {
                return Err(PriceError::Configuration(format!(
                    "clamp floor must be a finite price > 0, got {}",
                    floor
                )));
            }
        }
        Ok(Self { dt, policy })
    }

    /// Configured time step.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Configured policy.
    pub fn policy(&self) -> NonPositivePolicy {
        self.policy
    }

    /// Next price for `instrument` using the configured `dt`.
    pub fn step(&self, instrument: &Instrument, draw: f64) -> Result<f64> {
        self.next_price(instrument, self.dt, draw)
    }

    /// Next price for `instrument` over `dt` with the given `draw`.
    ///
    /// Pure: the instrument is not modified.
    pub fn next_price(&self, instrument: &Instrument, dt: f64, draw: f64) -> Result<f64> {
        let config = &instrument.config;
        let raw =
            instrument.last_price * (1.0 + config.mu * dt + config.sigma * dt.sqrt() * draw);
        let rounded = round_to(raw, instrument.decimal_places());

        if !rounded.is_finite() {
            return Err(PriceError::InvalidPrice {
                id: config.id.clone(),
                price: rounded,
            });
        }
        if rounded > 0.0 {
            return Ok(rounded);
        }
        match self.policy {
            NonPositivePolicy::Clamp { floor } => Ok(floor),
            NonPositivePolicy::Reject => Err(PriceError::InvalidPrice {
                id: config.id.clone(),
                price: rounded,
            }),
        }
    }
}

/// Round `value` to `places` decimal digits, half away from zero.
pub fn round_to(value: f64, places: usize) -> f64 {
    let factor = 10f64.powi(places as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}
