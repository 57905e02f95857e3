// 7.0 strikes.rs: deterministic spot -> strike menu mapping.
// 32 breakpoint bands cover [1, 200000) quote units with a 1/1.5/2/3/5/7.5
// ladder per decade. a band's 11 strikes start at its lower bound and step
// by a tenth of the band width, so the top strike lands on the next bound.

use crate::types::{Price, STRIKE_LEVELS};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

pub const BANDS: usize = 32;

// lower bounds of the 32 bands; the extra entry is the global upper bound.
const BREAKPOINTS: [Decimal; BANDS + 1] = [
    dec!(1),
    dec!(1.5),
    dec!(2),
    dec!(3),
    dec!(5),
    dec!(7.5),
    dec!(10),
    dec!(15),
    dec!(20),
    dec!(30),
    dec!(50),
    dec!(75),
    dec!(100),
    dec!(150),
    dec!(200),
    dec!(300),
    dec!(500),
    dec!(750),
    dec!(1000),
    dec!(1500),
    dec!(2000),
    dec!(3000),
    dec!(5000),
    dec!(7500),
    dec!(10000),
    dec!(15000),
    dec!(20000),
    dec!(30000),
    dec!(50000),
    dec!(75000),
    dec!(100000),
    dec!(150000),
    dec!(200000),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StrikeError {
    // only reachable if an underlying was bootstrapped with a price the
    // breakpoint table was never sized for
    #[error("spot {0} outside supported strike range")]
    SpotOutOfRange(Decimal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrikeBand {
    pub lower: Decimal,
    pub upper: Decimal,
    pub increment: Decimal,
}

/// Locate the [lower, upper) band containing `spot`.
pub fn locate_band(spot: Price) -> Result<StrikeBand, StrikeError> {
    let s = spot.value();
    if s < BREAKPOINTS[0] || s >= BREAKPOINTS[BANDS] {
        return Err(StrikeError::SpotOutOfRange(s));
    }
    for i in 0..BANDS {
        if s < BREAKPOINTS[i + 1] {
            let lower = BREAKPOINTS[i];
            let upper = BREAKPOINTS[i + 1];
            return Ok(StrikeBand {
                lower,
                upper,
                increment: (upper - lower) / Decimal::from(STRIKE_LEVELS as u32 - 1),
            });
        }
    }
    Err(StrikeError::SpotOutOfRange(s))
}

/// The eleven strikes for a spot: band lower bound plus 0..=10 increments.
pub fn strike_menu(spot: Price) -> Result<[Price; STRIKE_LEVELS], StrikeError> {
    let band = locate_band(spot)?;
    let mut menu = [spot; STRIKE_LEVELS];
    for (i, slot) in menu.iter_mut().enumerate() {
        *slot = Price::new_unchecked(band.lower + band.increment * Decimal::from(i as u32));
    }
    Ok(menu)
}
