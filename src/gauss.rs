// 3.0 gauss.rs: standard normal pdf/cdf and inverse cdf over Decimal.
// cdf uses the Abramowitz-Stegun 26.2.17 rational approximation (|err| ~ 7.5e-8).
// inverse cdf uses the Beasley-Springer central rational approximation for
// |p - 0.5| <= 0.42 (~1.2e-4) and the Moro tail expansion outside it (~2.5e-5).

use crate::fixed::{self, NumericError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const INV_SQRT_2PI: Decimal = dec!(0.3989422804014327);

// the cdf saturates to machine-indistinguishable 0/1 beyond this
const CDF_CUTOFF: Decimal = dec!(8);

/// phi(x), the standard normal density.
pub fn pdf(x: Decimal) -> Result<Decimal, NumericError> {
    let e = fixed::exp(-x * x / dec!(2))?;
    Ok(INV_SQRT_2PI * e)
}

/// N(x), the standard normal cumulative distribution.
pub fn cdf(x: Decimal) -> Result<Decimal, NumericError> {
    if x >= CDF_CUTOFF {
        return Ok(Decimal::ONE);
    }
    if x <= -CDF_CUTOFF {
        return Ok(Decimal::ZERO);
    }

    let ax = x.abs();
    let t = Decimal::ONE / (Decimal::ONE + dec!(0.2316419) * ax);
    let poly = t
        * (dec!(0.319381530)
            + t * (dec!(-0.356563782)
                + t * (dec!(1.781477937)
                    + t * (dec!(-1.821255978) + t * dec!(1.330274429)))));
    let upper = Decimal::ONE - pdf(ax)? * poly;

    if x >= Decimal::ZERO {
        Ok(upper)
    } else {
        Ok(Decimal::ONE - upper)
    }
}

/// N^-1(p). Requires 0 < p < 1.
pub fn inverse_cdf(p: Decimal) -> Result<Decimal, NumericError> {
    if p <= Decimal::ZERO || p >= Decimal::ONE {
        return Err(NumericError::ProbabilityDomain);
    }

    let q = p - dec!(0.5);
    if q.abs() <= dec!(0.42) {
        return Ok(central_region(q));
    }

    // lower and upper tails share the expansion by symmetry
    let r = if q > Decimal::ZERO { Decimal::ONE - p } else { p };
    let x = tail_region(r)?;
    if q < Decimal::ZERO {
        Ok(-x)
    } else {
        Ok(x)
    }
}

// Beasley-Springer rational approximation around the median.
fn central_region(q: Decimal) -> Decimal {
    const A0: Decimal = dec!(2.50662823884);
    const A1: Decimal = dec!(-18.61500062529);
    const A2: Decimal = dec!(41.39119773534);
    const A3: Decimal = dec!(-25.44106049637);
    const B0: Decimal = dec!(-8.47351093090);
    const B1: Decimal = dec!(23.08336743743);
    const B2: Decimal = dec!(-21.06224101826);
    const B3: Decimal = dec!(3.13082909833);

    let r = q * q;
    let num = q * (((A3 * r + A2) * r + A1) * r + A0);
    let den = (((B3 * r + B2) * r + B1) * r + B0) * r + Decimal::ONE;
    num / den
}

// Moro expansion in s = ln(-ln(r)) for the tail probability r.
fn tail_region(r: Decimal) -> Result<Decimal, NumericError> {
    const C: [Decimal; 9] = [
        dec!(0.3374754822726147),
        dec!(0.9761690190917186),
        dec!(0.1607979714918209),
        dec!(0.0276438810333863),
        dec!(0.0038405729373609),
        dec!(0.0003951896511919),
        dec!(0.0000321767881768),
        dec!(0.0000002888167364),
        dec!(0.0000003960315187),
    ];

    let s = fixed::ln(-fixed::ln(r)?)?;
    let mut x = C[8];
    for c in C[..8].iter().rev() {
        x = *c + s * x;
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn pdf_at_zero() {
        assert!(close(pdf(dec!(0)).unwrap(), INV_SQRT_2PI, dec!(0.000001)));
    }

    #[test]
    fn pdf_symmetric() {
        let a = pdf(dec!(1.3)).unwrap();
        let b = pdf(dec!(-1.3)).unwrap();
        assert!(close(a, b, dec!(0.000001)));
    }

    #[test]
    fn cdf_known_values() {
        assert!(close(cdf(dec!(0)).unwrap(), dec!(0.5), dec!(0.000001)));
        assert!(close(cdf(dec!(1)).unwrap(), dec!(0.8413447), dec!(0.000001)));
        assert!(close(cdf(dec!(-1)).unwrap(), dec!(0.1586553), dec!(0.000001)));
        assert!(close(cdf(dec!(1.96)).unwrap(), dec!(0.9750021), dec!(0.000001)));
    }

    #[test]
    fn cdf_saturates() {
        assert_eq!(cdf(dec!(9)).unwrap(), Decimal::ONE);
        assert_eq!(cdf(dec!(-9)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn inverse_cdf_known_values() {
        assert!(close(inverse_cdf(dec!(0.5)).unwrap(), dec!(0), dec!(0.0002)));
        assert!(close(inverse_cdf(dec!(0.975)).unwrap(), dec!(1.959964), dec!(0.0002)));
        assert!(close(inverse_cdf(dec!(0.025)).unwrap(), dec!(-1.959964), dec!(0.0002)));
        // deep tail
        assert!(close(inverse_cdf(dec!(0.0001)).unwrap(), dec!(-3.719016), dec!(0.0005)));
    }

    #[test]
    fn inverse_cdf_domain() {
        assert_eq!(inverse_cdf(dec!(0)), Err(NumericError::ProbabilityDomain));
        assert_eq!(inverse_cdf(dec!(1)), Err(NumericError::ProbabilityDomain));
        assert_eq!(inverse_cdf(dec!(-0.1)), Err(NumericError::ProbabilityDomain));
    }

    #[test]
    fn cdf_inverse_round_trip() {
        for p in [dec!(0.05), dec!(0.25), dec!(0.5), dec!(0.75), dec!(0.95)] {
            let x = inverse_cdf(p).unwrap();
            let back = cdf(x).unwrap();
            assert!(close(back, p, dec!(0.001)), "p={p} back={back}");
        }
    }
}
