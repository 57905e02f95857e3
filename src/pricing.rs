// 4.0 pricing.rs: Black-Scholes price, vega, and implied volatility.
// all arithmetic stays in Decimal through the checked kernel; a negative
// derived price or a non-converging solve is a hard error, never a clamp.

use crate::fixed::{self, NumericError};
use crate::gauss;
use crate::types::{OptionKind, Price};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SECONDS_PER_YEAR: i64 = 31_536_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error(transparent)]
    Numeric(#[from] NumericError),

    #[error("derived option price is negative")]
    NegativePrice,

    #[error("time to expiry must be positive")]
    NonPositiveTau,

    #[error("volatility must be positive")]
    NonPositiveVol,

    #[error("call trade price at or above strike cannot imply a volatility")]
    PremiumAboveStrike,

    #[error("implied volatility did not converge within {iterations} iterations")]
    NotConverged { iterations: u32 },
}

/// Solver knobs. Callers pick Newton for a small iteration budget and
/// bisection when robustness matters more than speed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvParams {
    pub max_iterations: u32,
    pub tolerance: Decimal,
    pub vega_floor: Decimal,
    pub initial_guess: Decimal,
    pub bracket_low: Decimal,
    pub bracket_high: Decimal,
}

impl Default for IvParams {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            tolerance: dec!(0.000001),
            vega_floor: dec!(0.0001),
            initial_guess: dec!(1),
            bracket_low: dec!(0.0001),
            bracket_high: dec!(10),
        }
    }
}

fn tau_years(tau_secs: i64) -> Result<Decimal, PricingError> {
    if tau_secs <= 0 {
        return Err(PricingError::NonPositiveTau);
    }
    Ok(Decimal::from(tau_secs) / Decimal::from(SECONDS_PER_YEAR))
}

fn d1_d2(
    spot: Price,
    strike: Price,
    sigma: Decimal,
    tau: Decimal,
    rate: Decimal,
) -> Result<(Decimal, Decimal), PricingError> {
    if sigma <= Decimal::ZERO {
        return Err(PricingError::NonPositiveVol);
    }
    let sqrt_tau = fixed::sqrt(tau)?;
    let vol_sqrt_tau = sigma * sqrt_tau;
    let log_moneyness = fixed::ln(spot.value() / strike.value())?;
    let drift = (rate + sigma * sigma / dec!(2)) * tau;
    let d1 = fixed::div(log_moneyness + drift, vol_sqrt_tau)?;
    Ok((d1, d1 - vol_sqrt_tau))
}

/// Black-Scholes price of one unit.
pub fn price(
    kind: OptionKind,
    spot: Price,
    strike: Price,
    sigma: Decimal,
    tau_secs: i64,
    rate: Decimal,
) -> Result<Price, PricingError> {
    let tau = tau_years(tau_secs)?;
    let (d1, d2) = d1_d2(spot, strike, sigma, tau, rate)?;
    let discount = fixed::exp(-rate * tau)?;

    let value = match kind {
        OptionKind::Call => {
            spot.value() * gauss::cdf(d1)? - strike.value() * discount * gauss::cdf(d2)?
        }
        OptionKind::Put => {
            strike.value() * discount * gauss::cdf(-d2)? - spot.value() * gauss::cdf(-d1)?
        }
    };

    if value < Decimal::ZERO {
        return Err(PricingError::NegativePrice);
    }
    Ok(Price::new_unchecked(value.max(dec!(0.000000000001))))
}

/// dPrice/dSigma. Identical for calls and puts.
pub fn vega(
    spot: Price,
    strike: Price,
    sigma: Decimal,
    tau_secs: i64,
    rate: Decimal,
) -> Result<Decimal, PricingError> {
    let tau = tau_years(tau_secs)?;
    let (d1, _) = d1_d2(spot, strike, sigma, tau, rate)?;
    Ok(spot.value() * fixed::sqrt(tau)? * gauss::pdf(d1)?)
}

// a call is worth less than its strike when rates are non-negative, so a
// premium at or above strike has no root. checked before burning iterations.
fn check_call_premium(
    kind: OptionKind,
    strike: Price,
    trade_price: Price,
) -> Result<(), PricingError> {
    if kind.is_call() && trade_price.value() >= strike.value() {
        return Err(PricingError::PremiumAboveStrike);
    }
    Ok(())
}

/// Newton-Raphson implied volatility. Fast near the money; the vega floor
/// keeps deep-OTM steps from blowing up the divide.
pub fn implied_vol_newton(
    kind: OptionKind,
    spot: Price,
    strike: Price,
    trade_price: Price,
    tau_secs: i64,
    rate: Decimal,
    params: &IvParams,
) -> Result<Decimal, PricingError> {
    check_call_premium(kind, strike, trade_price)?;

    let mut sigma = params.initial_guess;
    for _ in 0..params.max_iterations {
        let p = price(kind, spot, strike, sigma, tau_secs, rate)?;
        let diff = p.value() - trade_price.value();
        if diff.abs() <= params.tolerance {
            return Ok(sigma);
        }
        let v = vega(spot, strike, sigma, tau_secs, rate)?.max(params.vega_floor);
        sigma = (sigma - diff / v)
            .max(params.bracket_low)
            .min(params.bracket_high);
    }

    Err(PricingError::NotConverged {
        iterations: params.max_iterations,
    })
}

/// Bisection fallback over a fixed volatility bracket. Price is monotone in
/// sigma, so the bracket halves every step.
pub fn implied_vol_bisection(
    kind: OptionKind,
    spot: Price,
    strike: Price,
    trade_price: Price,
    tau_secs: i64,
    rate: Decimal,
    params: &IvParams,
) -> Result<Decimal, PricingError> {
    check_call_premium(kind, strike, trade_price)?;

    let mut lo = params.bracket_low;
    let mut hi = params.bracket_high;

    for _ in 0..params.max_iterations {
        let mid = (lo + hi) / dec!(2);
        let p = price(kind, spot, strike, mid, tau_secs, rate)?;
        let diff = p.value() - trade_price.value();
        if diff.abs() <= params.tolerance {
            return Ok(mid);
        }
        if diff > Decimal::ZERO {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    Err(PricingError::NotConverged {
        iterations: params.max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEAR: i64 = SECONDS_PER_YEAR;

    fn p(v: Decimal) -> Price {
        Price::new_unchecked(v)
    }

    #[test]
    fn atm_call_known_value() {
        // S=K=100, sigma=20%, tau=1y, r=0 -> ~7.9656
        let c = price(OptionKind::Call, p(dec!(100)), p(dec!(100)), dec!(0.2), YEAR, dec!(0))
            .unwrap();
        assert!((c.value() - dec!(7.9656)).abs() < dec!(0.001), "got {c}");
    }

    #[test]
    fn atm_put_call_parity_at_zero_rate() {
        let c = price(OptionKind::Call, p(dec!(100)), p(dec!(100)), dec!(0.2), YEAR, dec!(0))
            .unwrap();
        let q = price(OptionKind::Put, p(dec!(100)), p(dec!(100)), dec!(0.2), YEAR, dec!(0))
            .unwrap();
        assert!((c.value() - q.value()).abs() < dec!(0.0001));
    }

    #[test]
    fn itm_call_exceeds_intrinsic() {
        let c = price(OptionKind::Call, p(dec!(120)), p(dec!(100)), dec!(0.3), YEAR, dec!(0))
            .unwrap();
        assert!(c.value() > dec!(20));
    }

    #[test]
    fn vega_positive_and_known() {
        // d1 = 0.1 at the money, phi(0.1) ~ 0.39695, vega ~ 39.695
        let v = vega(p(dec!(100)), p(dec!(100)), dec!(0.2), YEAR, dec!(0)).unwrap();
        assert!((v - dec!(39.695)).abs() < dec!(0.01), "got {v}");
    }

    #[test]
    fn zero_tau_rejected() {
        let err = price(OptionKind::Call, p(dec!(100)), p(dec!(100)), dec!(0.2), 0, dec!(0));
        assert_eq!(err, Err(PricingError::NonPositiveTau));
    }

    #[test]
    fn newton_recovers_sigma() {
        let sigma = dec!(0.45);
        let c = price(OptionKind::Call, p(dec!(1500)), p(dec!(1600)), sigma, YEAR / 2, dec!(0))
            .unwrap();
        let solved = implied_vol_newton(
            OptionKind::Call,
            p(dec!(1500)),
            p(dec!(1600)),
            c,
            YEAR / 2,
            dec!(0),
            &IvParams::default(),
        )
        .unwrap();
        assert!((solved - sigma).abs() < dec!(0.001), "got {solved}");
    }

    #[test]
    fn bisection_recovers_sigma() {
        let sigma = dec!(0.9);
        let q = price(OptionKind::Put, p(dec!(1500)), p(dec!(1400)), sigma, YEAR / 4, dec!(0))
            .unwrap();
        let solved = implied_vol_bisection(
            OptionKind::Put,
            p(dec!(1500)),
            p(dec!(1400)),
            q,
            YEAR / 4,
            dec!(0),
            &IvParams::default(),
        )
        .unwrap();
        assert!((solved - sigma).abs() < dec!(0.001), "got {solved}");
    }

    #[test]
    fn call_premium_at_strike_rejected() {
        for solve in [implied_vol_newton, implied_vol_bisection] {
            let err = solve(
                OptionKind::Call,
                p(dec!(1500)),
                p(dec!(1000)),
                p(dec!(1000)),
                YEAR,
                dec!(0),
                &IvParams::default(),
            );
            assert_eq!(err, Err(PricingError::PremiumAboveStrike));
        }
    }
}
