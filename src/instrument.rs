// 5.0 instrument.rs: the option series and its per-round fingerprint.
// a series is immutable once created; positions reference it by value.

use crate::types::{OptionKind, Price, Quote, StrikeLevel, Timestamp, UnderlyingId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSeries {
    pub underlying: UnderlyingId,
    pub kind: OptionKind,
    pub strike: Price,
    pub level: StrikeLevel,
    pub expiry: Timestamp,
}

// strikes are fixed per round, so (underlying, kind, level) identifies a
// series uniquely until rollover. this is the netting fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionKey {
    pub underlying: UnderlyingId,
    pub kind: OptionKind,
    pub level: StrikeLevel,
}

impl OptionSeries {
    pub fn key(&self) -> OptionKey {
        OptionKey {
            underlying: self.underlying,
            kind: self.kind,
            level: self.level,
        }
    }

    pub fn intrinsic(&self, spot: Price) -> Quote {
        intrinsic(self.kind, spot, self.strike)
    }
}

/// Exercise value of one unit at the given spot. Never negative.
pub fn intrinsic(kind: OptionKind, spot: Price, strike: Price) -> Quote {
    let value = match kind {
        OptionKind::Call => (spot.value() - strike.value()).max(Decimal::ZERO),
        OptionKind::Put => (strike.value() - spot.value()).max(Decimal::ZERO),
    };
    Quote::new(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn p(v: Decimal) -> Price {
        Price::new_unchecked(v)
    }

    #[test]
    fn call_intrinsic() {
        assert_eq!(intrinsic(OptionKind::Call, p(dec!(2000)), p(dec!(1500))).value(), dec!(500));
        assert_eq!(intrinsic(OptionKind::Call, p(dec!(1000)), p(dec!(1500))).value(), dec!(0));
    }

    #[test]
    fn put_intrinsic() {
        assert_eq!(intrinsic(OptionKind::Put, p(dec!(1000)), p(dec!(1500))).value(), dec!(500));
        assert_eq!(intrinsic(OptionKind::Put, p(dec!(2000)), p(dec!(1500))).value(), dec!(0));
    }

    #[test]
    fn key_ignores_expiry() {
        let series = OptionSeries {
            underlying: UnderlyingId(1),
            kind: OptionKind::Call,
            strike: p(dec!(1500)),
            level: StrikeLevel::new(7).unwrap(),
            expiry: Timestamp::from_millis(1_000_000),
        };
        let other = OptionSeries {
            expiry: Timestamp::from_millis(2_000_000),
            ..series
        };
        assert_eq!(series.key(), other.key());
    }
}
