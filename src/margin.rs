// 8.0 margin.rs: per-unit margin heuristics, regulation-T style.
// long margin follows the mark price but is capped by a spot percentage;
// short margin scales with how far out of the money the strike sits, with a
// hard floor. every result is floored again by the alternative minimum so a
// deep-OTM short can never post near-zero collateral.

use crate::types::{Bps, OptionKind, Price, Quote};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginKind {
    Initial,
    Maintenance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginParams {
    // long side: min(mark, pct * spot)
    pub long_initial_pct: Decimal,
    pub long_maintenance_pct: Decimal,
    // short side: max((base - otm/spot) * spot, floor * spot)
    pub short_initial_base: Decimal,
    pub short_initial_floor: Decimal,
    pub short_maintenance_base: Decimal,
    pub short_maintenance_floor: Decimal,
    // short puts additionally capped by this fraction of strike
    pub put_strike_cap: Decimal,
    // global floor: spot * fraction
    pub alternative_minimum: Bps,
}

impl Default for MarginParams {
    fn default() -> Self {
        Self {
            long_initial_pct: dec!(0.10),
            long_maintenance_pct: dec!(0.065),
            short_initial_base: dec!(0.20),
            short_initial_floor: dec!(0.125),
            short_maintenance_base: dec!(0.10),
            short_maintenance_floor: dec!(0.08),
            put_strike_cap: dec!(0.50),
            alternative_minimum: Bps::new(100), // 1% of spot
        }
    }
}

/// Floor applied to every computed margin: spot scaled by the configured bps.
pub fn alternative_minimum(spot: Price, minimum: Bps) -> Quote {
    Quote::new(spot.value() * minimum.as_fraction())
}

/// Margin for one unit of exposure.
pub fn unit_margin(
    option: OptionKind,
    is_buyer: bool,
    level: MarginKind,
    spot: Price,
    strike: Price,
    mark: Price,
    params: &MarginParams,
) -> Quote {
    let computed = if is_buyer {
        long_margin(level, spot, mark, params)
    } else {
        short_margin(option, level, spot, strike, params)
    };
    let floor = alternative_minimum(spot, params.alternative_minimum);
    if computed < floor {
        floor
    } else {
        computed
    }
}

fn long_margin(level: MarginKind, spot: Price, mark: Price, params: &MarginParams) -> Quote {
    let pct = match level {
        MarginKind::Initial => params.long_initial_pct,
        MarginKind::Maintenance => params.long_maintenance_pct,
    };
    Quote::new(mark.value().min(pct * spot.value()))
}

fn short_margin(
    option: OptionKind,
    level: MarginKind,
    spot: Price,
    strike: Price,
    params: &MarginParams,
) -> Quote {
    let (base, floor) = match level {
        MarginKind::Initial => (params.short_initial_base, params.short_initial_floor),
        MarginKind::Maintenance => (params.short_maintenance_base, params.short_maintenance_floor),
    };

    let otm_amount = match option {
        OptionKind::Call => (strike.value() - spot.value()).max(Decimal::ZERO),
        OptionKind::Put => (spot.value() - strike.value()).max(Decimal::ZERO),
    };

    // (base - otm/spot) * spot == base * spot - otm_amount
    let scaled = (base * spot.value() - otm_amount).max(floor * spot.value());

    let capped = match option {
        OptionKind::Call => scaled,
        OptionKind::Put => scaled.min(params.put_strike_cap * strike.value()),
    };

    Quote::new(capped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(v: Decimal) -> Price {
        Price::new_unchecked(v)
    }

    fn params() -> MarginParams {
        MarginParams::default()
    }

    #[test]
    fn alternative_minimum_example() {
        // 1 unit spot, 100 bps -> 0.01
        let m = alternative_minimum(p(dec!(1)), Bps::new(100));
        assert_eq!(m.value(), dec!(0.01));
    }

    #[test]
    fn long_margin_follows_cheap_mark() {
        // mark below the 10% cap: margin equals the mark
        let im = unit_margin(
            OptionKind::Call,
            true,
            MarginKind::Initial,
            p(dec!(1500)),
            p(dec!(1850)),
            p(dec!(60)),
            &params(),
        );
        assert_eq!(im.value(), dec!(60));
    }

    #[test]
    fn long_margin_capped_by_spot_pct() {
        // mark above 10% of spot: margin capped at 150
        let im = unit_margin(
            OptionKind::Call,
            true,
            MarginKind::Initial,
            p(dec!(1500)),
            p(dec!(1500)),
            p(dec!(400)),
            &params(),
        );
        assert_eq!(im.value(), dec!(150));
    }

    #[test]
    fn short_call_atm() {
        // at the money: (0.20 - 0) * 1500 = 300 vs floor 187.5
        let im = unit_margin(
            OptionKind::Call,
            false,
            MarginKind::Initial,
            p(dec!(1500)),
            p(dec!(1500)),
            p(dec!(100)),
            &params(),
        );
        assert_eq!(im.value(), dec!(300));
    }

    #[test]
    fn short_call_otm_hits_floor() {
        // otm by 350: 0.20*1500 - 350 = -50 -> floor 12.5% * 1500 = 187.5
        let im = unit_margin(
            OptionKind::Call,
            false,
            MarginKind::Initial,
            p(dec!(1500)),
            p(dec!(1850)),
            p(dec!(40)),
            &params(),
        );
        assert_eq!(im.value(), dec!(187.5));
    }

    #[test]
    fn short_put_capped_by_strike() {
        // tiny strike: cap at 50% of strike beats the spot-scaled floor
        let im = unit_margin(
            OptionKind::Put,
            false,
            MarginKind::Initial,
            p(dec!(1999)),
            p(dec!(1500)),
            p(dec!(5)),
            &params(),
        );
        // 0.20*1999 - 499 = -99.2 -> floor 249.875, cap 750 -> 249.875
        assert_eq!(im.value(), dec!(249.875));
    }

    #[test]
    fn initial_never_below_maintenance() {
        let cases = [
            (OptionKind::Call, true),
            (OptionKind::Call, false),
            (OptionKind::Put, true),
            (OptionKind::Put, false),
        ];
        for (kind, is_buyer) in cases {
            for strike in [dec!(1000), dec!(1500), dec!(1850), dec!(2000)] {
                let im = unit_margin(
                    kind,
                    is_buyer,
                    MarginKind::Initial,
                    p(dec!(1500)),
                    p(strike),
                    p(dec!(80)),
                    &params(),
                );
                let mm = unit_margin(
                    kind,
                    is_buyer,
                    MarginKind::Maintenance,
                    p(dec!(1500)),
                    p(strike),
                    p(dec!(80)),
                    &params(),
                );
                assert!(im >= mm, "IM {im} < MM {mm} for {kind:?} buyer={is_buyer}");
            }
        }
    }

    #[test]
    fn alternative_minimum_floors_deep_otm_short() {
        // very deep otm call: both terms small, floor = 1% of spot
        let mut prm = params();
        prm.short_initial_floor = dec!(0.005); // push the floor below the alt minimum
        let im = unit_margin(
            OptionKind::Call,
            false,
            MarginKind::Initial,
            p(dec!(1000)),
            p(dec!(1500)),
            p(dec!(1)),
            &prm,
        );
        assert_eq!(im.value(), dec!(10)); // 1% of 1000
    }
}
