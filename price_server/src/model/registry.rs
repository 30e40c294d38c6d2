//! Shared, ordered store of simulated instruments.
//!
//! The registry is the single source of truth for every instrument's last
//! price. It is built once from configuration, wrapped in an `Arc`, and then
//! read and written concurrently by every subscription's worker thread.
//!
//! Design notes:
//! - Each instrument sits behind its own `Mutex`, so read-modify-write steps on
//!   one instrument are serialized while different instruments never contend.
//! - The instrument list itself is fixed after construction; only the contents
//!   of each slot change. Iteration order is insertion order.
//! - `list` clones each instrument under its lock; callers get a snapshot and
//!   can never observe a half-applied update.

use crate::model::instrument::{
    Instrument, InstrumentConfig, default_instruments, validate_spread,
};
use price_common::{PriceError, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Ordered, concurrently shared instrument store.
#[derive(Debug)]
pub struct InstrumentRegistry {
    slots: Vec<Mutex<Instrument>>,
    index: HashMap<String, usize>,
}

impl InstrumentRegistry {
    /// Build a registry, rejecting invalid or duplicate definitions.
    pub fn new(configs: Vec<InstrumentConfig>) -> Result<Self> {
        let mut slots = Vec::with_capacity(configs.len());
        let mut index = HashMap::with_capacity(configs.len());

        for config in configs {
            config.validate()?;
            if index.contains_key(&config.id) {
                return Err(PriceError::Configuration(format!(
                    "duplicate instrument id: {}",
                    config.id
                )));
            }
            index.insert(config.id.clone(), slots.len());
            slots.push(Mutex::new(Instrument::new(config)));
        }

        Ok(Self { slots, index })
    }

    /// Registry seeded with the default instrument set.
    pub fn with_defaults() -> Result<Self> {
        Self::new(default_instruments())
    }

    /// Number of instruments.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` when the registry holds no instruments.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Snapshot of every instrument, in registry order.
    pub fn list(&self) -> Result<Vec<Instrument>> {
        self.slots
            .iter()
            .map(|slot| -> Result<Instrument> { Ok(slot.lock()?.clone()) })
            .collect()
    }

    /// Snapshot of a single instrument.
    pub fn get(&self, id: &str) -> Result<Instrument> {
        Ok(self.slot(id)?.lock()?.clone())
    }

    /// Overwrite an instrument's last price.
    ///
    /// Non-finite or non-positive prices are rejected and the stored price is
    /// left untouched.
    pub fn update_price(&self, id: &str, new_price: f64) -> Result<()> {
        let slot = self.slot(id)?;
        if !new_price.is_finite() || new_price <= 0.0 {
            return Err(PriceError::InvalidPrice {
                id: id.to_string(),
                price: new_price,
            });
        }
        slot.lock()?.last_price = new_price;
        Ok(())
    }

    /// Reconfigure an instrument's spread. The rounding precision follows on
    /// the next step.
    pub fn update_spread(&self, id: &str, spread: f64) -> Result<()> {
        let slot = self.slot(id)?;
        validate_spread(id, spread)?;
        slot.lock()?.config.spread = spread;
        Ok(())
    }

    /// Run `step` against the instrument at `position` while holding its lock.
    ///
    /// This is the only read-modify-write path used by the scheduler.
    pub(crate) fn advance<T>(
        &self,
        position: usize,
        step: impl FnOnce(&mut Instrument) -> T,
    ) -> Result<T> {
        let Some(slot) = self.slots.get(position) else {
            return Err(PriceError::InstrumentNotFound(position.to_string()));
        };
        let mut instrument = slot.lock()?;
        Ok(step(&mut instrument))
    }

    fn slot(&self, id: &str) -> Result<&Mutex<Instrument>> {
        self.index
            .get(id)
            .map(|&position| &self.slots[position])
            .ok_or_else(|| PriceError::InstrumentNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn registry() -> InstrumentRegistry {
        InstrumentRegistry::with_defaults().unwrap()
    }

    #[test]
    fn list_keeps_insertion_order() {
        let ids: Vec<String> = registry()
            .list()
            .unwrap()
            .iter()
            .map(|i| i.id().to_string())
            .collect();
        assert_eq!(ids, ["WTI", "SOY", "YPF", "SP500"]);
    }

    #[test]
    fn duplicate_id_is_a_configuration_error() {
        let result = InstrumentRegistry::new(vec![
            InstrumentConfig::new("WTI", 0.06, 0.47, 70.0, 0.1),
            InstrumentConfig::new("WTI", 0.01, 0.2, 71.0, 0.1),
        ]);
        assert!(matches!(result, Err(PriceError::Configuration(_))));
    }

    #[test]
    fn non_positive_s0_is_a_configuration_error() {
        let zero = InstrumentRegistry::new(vec![InstrumentConfig::new("X", 0.1, 0.1, 0.0, 1.0)]);
        assert!(matches!(zero, Err(PriceError::Configuration(_))));

        let negative_sigma =
            InstrumentRegistry::new(vec![InstrumentConfig::new("X", 0.1, -0.1, 10.0, 1.0)]);
        assert!(matches!(negative_sigma, Err(PriceError::Configuration(_))));
    }

    #[test]
    fn update_price_overwrites_last_price() {
        let registry = registry();
        registry.update_price("YPF", 26.5).unwrap();
        assert_eq!(registry.get("YPF").unwrap().last_price, 26.5);
    }

    #[test]
    fn invalid_price_leaves_state_untouched() {
        let registry = registry();
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = registry.update_price("WTI", bad).unwrap_err();
            assert!(matches!(err, PriceError::InvalidPrice { .. }));
        }
        assert_eq!(registry.get("WTI").unwrap().last_price, 70.0);
    }

    #[test]
    fn unknown_instrument_is_reported() {
        let registry = registry();
        assert!(matches!(
            registry.update_price("BTC", 1.0),
            Err(PriceError::InstrumentNotFound(_))
        ));
        assert!(matches!(
            registry.get("BTC"),
            Err(PriceError::InstrumentNotFound(_))
        ));
    }

    #[test]
    fn spread_change_changes_precision() {
        let registry = registry();
        assert_eq!(registry.get("SP500").unwrap().decimal_places(), 0);
        registry.update_spread("SP500", 0.125).unwrap();
        assert_eq!(registry.get("SP500").unwrap().decimal_places(), 3);
        assert!(matches!(
            registry.update_spread("SP500", -1.0),
            Err(PriceError::Configuration(_))
        ));
    }

    #[test]
    fn list_is_a_snapshot() {
        let registry = registry();
        let before = registry.list().unwrap();
        registry.update_price("WTI", 80.0).unwrap();
        assert_eq!(before[0].last_price, 70.0);
        assert_eq!(registry.list().unwrap()[0].last_price, 80.0);
    }

    #[test]
    fn concurrent_advances_do_not_lose_updates() {
        let counter = InstrumentConfig::new("CNT", 0.0, 0.0, 1.0, 1.0);
        let registry = Arc::new(InstrumentRegistry::new(vec![counter]).unwrap());
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        registry
                            .advance(0, |instrument| instrument.last_price += 1.0)
                            .unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(registry.get("CNT").unwrap().last_price, 8_001.0);
    }
}
