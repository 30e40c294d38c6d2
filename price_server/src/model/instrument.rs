//! Simulated instrument definitions and their mutable state.
//!
//! An `InstrumentConfig` is what gets configured (and loaded from JSON); an
//! `Instrument` is the registry's live record: the configuration plus the last
//! simulated price.

use price_common::{PriceError, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Static parameters of one simulated instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Unique identifier, emitted as `asset` on the wire.
    pub id: String,
    /// Drift per unit of time.
    pub mu: f64,
    /// Volatility, never negative.
    pub sigma: f64,
    /// Initial price, strictly positive.
    pub s0: f64,
    /// Half-width between bid and ask. Also fixes the rounding precision.
    pub spread: f64,
}

impl InstrumentConfig {
    /// Shorthand constructor.
    pub fn new(id: &str, mu: f64, sigma: f64, s0: f64, spread: f64) -> Self {
        Self {
            id: id.to_string(),
            mu,
            sigma,
            s0,
            spread,
        }
    }

    /// Check the definition on its own (duplicates are the registry's business).
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(PriceError::Configuration(
                "instrument id is empty".to_string(),
            ));
        }
        if !self.s0.is_finite() || self.s0 <= 0.0 {
            return Err(PriceError::Configuration(format!(
                "{}: s0 must be a finite price > 0, got {}",
                self.id, self.s0
            )));
        }
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(PriceError::Configuration(format!(
                "{}: sigma must be finite and >= 0, got {}",
                self.id, self.sigma
            )));
        }
        if !self.mu.is_finite() {
            return Err(PriceError::Configuration(format!(
                "{}: mu must be finite, got {}",
                self.id, self.mu
            )));
        }
        validate_spread(&self.id, self.spread)
    }
}

pub(crate) fn validate_spread(id: &str, spread: f64) -> Result<()> {
    if !spread.is_finite() || spread < 0.0 {
        return Err(PriceError::Configuration(format!(
            "{}: spread must be finite and >= 0, got {}",
            id, spread
        )));
    }
    Ok(())
}

/// The four instruments streamed when no instrument file is configured.
pub fn default_instruments() -> Vec<InstrumentConfig> {
    vec![
        InstrumentConfig::new("WTI", 0.06, 0.47, 70.0, 0.1),
        InstrumentConfig::new("SOY", 0.08, 0.14, 995.0, 0.25),
        InstrumentConfig::new("YPF", 0.16, 0.46, 25.0, 0.5),
        InstrumentConfig::new("SP500", 0.1, 0.12, 5700.0, 5.0),
    ]
}

/// Read a JSON array of instrument definitions.
///
/// Malformed input is a configuration error; semantic checks happen when the
/// registry is built.
pub fn parse_instruments<R: Read>(reader: R) -> Result<Vec<InstrumentConfig>> {
    serde_json::from_reader(reader)
        .map_err(|e| PriceError::Configuration(format!("invalid instrument file: {}", e)))
}

/// Live registry record.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    /// Configured parameters.
    pub config: InstrumentConfig,
    /// Last simulated price. Always finite and > 0.
    pub last_price: f64,
}

impl Instrument {
    /// Start an instrument at its initial price.
    pub fn new(config: InstrumentConfig) -> Self {
        let last_price = config.s0;
        Self { config, last_price }
    }

    /// Instrument identifier.
    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// Rounding precision, derived from the current spread on every call.
    pub fn decimal_places(&self) -> usize {
        decimal_places(self.config.spread)
    }
}

/// Number of digits after the decimal point in the shortest representation of
/// `spread`: `0.1` gives 1, `0.25` gives 2, `5` gives 0.
///
/// `f64`'s `Display` never switches to exponent notation, so the digit count
/// is read straight off the formatted string.
pub fn decimal_places(spread: f64) -> usize {
    let rendered = spread.abs().to_string();
    rendered
        .split_once('.')
        .map(|(_, fraction)| fraction.len())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_follows_spread_digits() {
        assert_eq!(decimal_places(0.1), 1);
        assert_eq!(decimal_places(5.0), 0);
        assert_eq!(decimal_places(0.25), 2);
        assert_eq!(decimal_places(0.5), 1);
        assert_eq!(decimal_places(0.0), 0);
        assert_eq!(decimal_places(0.0001), 4);
    }

    #[test]
    fn instrument_starts_at_s0() {
        let instrument = Instrument::new(InstrumentConfig::new("WTI", 0.06, 0.47, 70.0, 0.1));
        assert_eq!(instrument.last_price, 70.0);
        assert_eq!(instrument.id(), "WTI");
        assert_eq!(instrument.decimal_places(), 1);
    }

    #[test]
    fn precision_tracks_spread_changes() {
        let mut soy = Instrument::new(InstrumentConfig::new("SOY", 0.08, 0.14, 995.0, 0.25));
        assert_eq!(soy.decimal_places(), 2);
        soy.config.spread = 1.0;
        assert_eq!(soy.decimal_places(), 0);
    }

    #[test]
    fn rejects_bad_definitions() {
        let bad = [
            InstrumentConfig::new("A", 0.1, 0.1, 0.0, 0.1),
            InstrumentConfig::new("B", 0.1, 0.1, -3.0, 0.1),
            InstrumentConfig::new("C", 0.1, -0.1, 10.0, 0.1),
            InstrumentConfig::new("D", 0.1, 0.1, 10.0, -0.1),
            InstrumentConfig::new("E", f64::NAN, 0.1, 10.0, 0.1),
            InstrumentConfig::new(" ", 0.1, 0.1, 10.0, 0.1),
            InstrumentConfig::new("F", 0.1, 0.1, f64::INFINITY, 0.1),
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(PriceError::Configuration(_))),
                "{:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn defaults_are_valid_and_ordered() {
        let defaults = default_instruments();
        let ids: Vec<&str> = defaults.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["WTI", "SOY", "YPF", "SP500"]);
        assert!(defaults.iter().all(|c| c.validate().is_ok()));
    }

    #[test]
    fn config_loads_from_json() {
        let json = r#"[{"id":"GOLD","mu":0.02,"sigma":0.15,"s0":2300.0,"spread":0.5}]"#;
        let configs = parse_instruments(json.as_bytes()).unwrap();
        let gold = InstrumentConfig::new("GOLD", 0.02, 0.15, 2300.0, 0.5);
        assert_eq!(configs, vec![gold]);
    }

    #[test]
    fn malformed_file_is_a_configuration_error() {
        let json = r#"[{"id":"GOLD","mu":0.02}]"#;
        assert!(matches!(
            parse_instruments(json.as_bytes()),
            Err(PriceError::Configuration(_))
        ));
    }
}
