// 2.0 fixed.rs: checked arithmetic kernel over rust_decimal.
// every transcendental op validates its domain before calling into the maths
// feature, so a bad market state surfaces as a NumericError instead of a panic
// or a silently wrapped value. all pricing math goes through this module.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use thiserror::Error;

// exp() overflows the 96-bit mantissa somewhere past e^65; everything the
// pricing stack feeds in is far below this.
const EXP_ARG_MAX: Decimal = dec!(60);

// rust_decimal supports at most 28 fractional digits.
const MAX_SCALE: u32 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NumericError {
    #[error("ln of non-positive value")]
    LogDomain,

    #[error("sqrt of negative value")]
    SqrtDomain,

    #[error("exp argument out of range")]
    ExpOverflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("probability outside (0, 1)")]
    ProbabilityDomain,

    #[error("power of non-positive base")]
    PowDomain,

    #[error("token decimals {0} exceed supported scale")]
    ScaleOverflow(u32),
}

pub fn ln(x: Decimal) -> Result<Decimal, NumericError> {
    if x <= Decimal::ZERO {
        return Err(NumericError::LogDomain);
    }
    Ok(x.ln())
}

pub fn exp(x: Decimal) -> Result<Decimal, NumericError> {
    if x > EXP_ARG_MAX {
        return Err(NumericError::ExpOverflow);
    }
    if x < -EXP_ARG_MAX {
        // underflows to zero well before the mantissa runs out
        return Ok(Decimal::ZERO);
    }
    Ok(x.exp())
}

pub fn sqrt(x: Decimal) -> Result<Decimal, NumericError> {
    x.sqrt().ok_or(NumericError::SqrtDomain)
}

// x^y for positive x, via exp(y * ln x). fractional exponents on a
// non-positive base have no real value.
pub fn pow(x: Decimal, y: Decimal) -> Result<Decimal, NumericError> {
    if x <= Decimal::ZERO {
        return Err(NumericError::PowDomain);
    }
    exp(y * ln(x)?)
}

pub fn div(num: Decimal, den: Decimal) -> Result<Decimal, NumericError> {
    if den.is_zero() {
        return Err(NumericError::DivisionByZero);
    }
    Ok(num / den)
}

// 2.1: token-unit scaling. collateral tokens quote integer amounts with a
// decimals() exponent; everything inside the ledger is plain Decimal.
pub fn from_token_units(raw: i128, decimals: u32) -> Result<Decimal, NumericError> {
    if decimals > MAX_SCALE {
        return Err(NumericError::ScaleOverflow(decimals));
    }
    Ok(Decimal::from_i128_with_scale(raw, decimals))
}

pub fn to_token_units(amount: Decimal, decimals: u32) -> Result<i128, NumericError> {
    if decimals > MAX_SCALE {
        return Err(NumericError::ScaleOverflow(decimals));
    }
    let mut scaled = amount;
    scaled.rescale(decimals);
    Ok(scaled.mantissa())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ln_rejects_non_positive() {
        assert_eq!(ln(dec!(0)), Err(NumericError::LogDomain));
        assert_eq!(ln(dec!(-3)), Err(NumericError::LogDomain));
        assert!(ln(dec!(1)).unwrap().abs() < dec!(0.0000001));
    }

    #[test]
    fn sqrt_rejects_negative() {
        assert_eq!(sqrt(dec!(-1)), Err(NumericError::SqrtDomain));
        assert_eq!(sqrt(dec!(4)).unwrap(), dec!(2));
    }

    #[test]
    fn exp_bounds() {
        assert_eq!(exp(dec!(100)), Err(NumericError::ExpOverflow));
        assert_eq!(exp(dec!(-100)).unwrap(), Decimal::ZERO);
        let e1 = exp(dec!(1)).unwrap();
        assert!((e1 - dec!(2.718281828)).abs() < dec!(0.000001));
    }

    #[test]
    fn pow_matches_integer_powers() {
        let x = pow(dec!(2), dec!(10)).unwrap();
        assert!((x - dec!(1024)).abs() < dec!(0.001));
        assert_eq!(pow(dec!(0), dec!(2)), Err(NumericError::PowDomain));
    }

    #[test]
    fn token_unit_round_trip() {
        // 1.5 tokens at 18 decimals
        let raw = 1_500_000_000_000_000_000i128;
        let amount = from_token_units(raw, 18).unwrap();
        assert_eq!(amount, dec!(1.5));
        assert_eq!(to_token_units(amount, 18).unwrap(), raw);
    }

    #[test]
    fn token_units_truncate_excess_precision() {
        let amount = dec!(0.123456789);
        assert_eq!(to_token_units(amount, 6).unwrap(), 123_457); // banker's rounding
    }

    #[test]
    fn oversized_decimals_rejected() {
        assert_eq!(from_token_units(1, 29), Err(NumericError::ScaleOverflow(29)));
    }
}
