//! Price update emitted for one instrument on one tick.

use crate::model::instrument::Instrument;
use chrono::{DateTime, Utc};
use price_common::Result;
use price_common::payload::{PricePayload, format_timestamp};

/// Immutable quote built while the instrument's lock is held.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceUpdate {
    /// Instrument identifier.
    pub instrument_id: String,
    /// `last - spread`.
    pub bid: f64,
    /// `last + spread`.
    pub ask: f64,
    /// Price written to the registry on this tick.
    pub last: f64,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
}

impl PriceUpdate {
    /// Quote the instrument's current price with its current spread.
    pub fn from_instrument(instrument: &Instrument, timestamp: DateTime<Utc>) -> Self {
        let last = instrument.last_price;
        let spread = instrument.config.spread;
        Self {
            instrument_id: instrument.config.id.clone(),
            bid: last - spread,
            ask: last + spread,
            last,
            timestamp,
        }
    }

    /// Wire representation.
    pub fn to_payload(&self) -> PricePayload {
        PricePayload {
            asset: self.instrument_id.clone(),
            bid: self.bid,
            ask: self.ask,
            last: self.last,
            timestamp: format_timestamp(&self.timestamp),
        }
    }

    /// Encode the wire representation to JSON bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        self.to_payload().to_json_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::instrument::InstrumentConfig;
    use chrono::TimeZone;

    #[test]
    fn bid_and_ask_straddle_last_by_spread() {
        let mut soy = Instrument::new(InstrumentConfig::new("SOY", 0.08, 0.14, 995.0, 0.25));
        soy.last_price = 1004.08;
        let update = PriceUpdate::from_instrument(&soy, Utc::now());

        assert_eq!(update.instrument_id, "SOY");
        assert_eq!(update.last, 1004.08);
        assert_eq!(update.bid, 1004.08 - 0.25);
        assert_eq!(update.ask, 1004.08 + 0.25);
    }

    #[test]
    fn payload_carries_formatted_timestamp() {
        let instrument = Instrument::new(InstrumentConfig::new("SP500", 0.1, 0.12, 5700.0, 5.0));
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let payload = PriceUpdate::from_instrument(&instrument, at).to_payload();

        assert_eq!(payload.asset, "SP500");
        assert_eq!(payload.bid, 5695.0);
        assert_eq!(payload.ask, 5705.0);
        assert_eq!(payload.last, 5700.0);
        assert_eq!(payload.timestamp, "2024-01-02 03:04:05.000");
    }
}
