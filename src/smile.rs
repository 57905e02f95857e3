// 6.0 smile.rs: five-point volatility smile keyed by moneyness percent.
// one smile per option fingerprint per round. the opening trade seeds all
// five points with its implied vol; later trades bend the two points that
// bracket their own moneyness via a quantity-weighted running average.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const SMILE_POINTS: usize = 5;

// canonical moneyness grid, spot/strike in percent
pub const SMILE_GRID: [Decimal; SMILE_POINTS] =
    [dec!(50), dec!(75), dec!(100), dec!(125), dec!(150)];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolSmile {
    vols: [Decimal; SMILE_POINTS],
    traded_qty: Decimal,
}

impl VolSmile {
    /// Seed a smile from the first trade of a series: the backed-out implied
    /// vol is fanned across all five canonical points.
    pub fn create(implied_vol: Decimal, quantity: Decimal) -> Self {
        Self {
            vols: [implied_vol; SMILE_POINTS],
            traded_qty: quantity,
        }
    }

    /// Blend a later trade into the two canonical points bracketing its
    /// moneyness, weighted by traded quantity relative to the running total.
    pub fn update(&mut self, moneyness: Decimal, implied_vol: Decimal, quantity: Decimal) {
        let total = self.traded_qty + quantity;
        if total <= Decimal::ZERO {
            return;
        }
        let weight = quantity / total;

        let (lo, hi) = closest_two(&SMILE_GRID, moneyness);
        self.vols[lo] = self.vols[lo] * (Decimal::ONE - weight) + implied_vol * weight;
        if hi != lo {
            self.vols[hi] = self.vols[hi] * (Decimal::ONE - weight) + implied_vol * weight;
        }
        self.traded_qty = total;
    }

    /// Sigma at the given moneyness by linear interpolation on the grid.
    pub fn query(&self, moneyness: Decimal) -> Decimal {
        interpolate(&SMILE_GRID, &self.vols, moneyness)
    }

    pub fn vols(&self) -> &[Decimal; SMILE_POINTS] {
        &self.vols
    }

    pub fn traded_qty(&self) -> Decimal {
        self.traded_qty
    }
}

/// Indices of the two grid points bracketing `q`. Returns equal indices when
/// `q` is below the minimum, above the maximum, or exactly on a grid point.
pub fn closest_two(grid: &[Decimal], q: Decimal) -> (usize, usize) {
    debug_assert!(!grid.is_empty());
    let last = grid.len() - 1;

    if q <= grid[0] {
        return (0, 0);
    }
    if q >= grid[last] {
        return (last, last);
    }
    for i in 0..last {
        if q == grid[i] {
            return (i, i);
        }
        if q < grid[i + 1] {
            if q == grid[i + 1] {
                return (i + 1, i + 1);
            }
            return (i, i + 1);
        }
    }
    (last, last)
}

/// Linear interpolation of `values` over `keys` at `q`. Exact on grid points.
pub fn interpolate(keys: &[Decimal], values: &[Decimal], q: Decimal) -> Decimal {
    debug_assert_eq!(keys.len(), values.len());
    let (lo, hi) = closest_two(keys, q);
    if lo == hi {
        return values[lo];
    }
    let span = keys[hi] - keys[lo];
    let t = (q - keys[lo]) / span;
    values[lo] + (values[hi] - values[lo]) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_two_edges_and_grid() {
        assert_eq!(closest_two(&SMILE_GRID, dec!(40)), (0, 0));
        assert_eq!(closest_two(&SMILE_GRID, dec!(50)), (0, 0));
        assert_eq!(closest_two(&SMILE_GRID, dec!(100)), (2, 2));
        assert_eq!(closest_two(&SMILE_GRID, dec!(150)), (4, 4));
        assert_eq!(closest_two(&SMILE_GRID, dec!(160)), (4, 4));
        assert_eq!(closest_two(&SMILE_GRID, dec!(60)), (0, 1));
        assert_eq!(closest_two(&SMILE_GRID, dec!(130)), (3, 4));
    }

    #[test]
    fn interpolate_exact_on_grid() {
        let values = [dec!(0.9), dec!(0.8), dec!(0.7), dec!(0.75), dec!(0.85)];
        for (i, key) in SMILE_GRID.iter().enumerate() {
            assert_eq!(interpolate(&SMILE_GRID, &values, *key), values[i]);
        }
    }

    #[test]
    fn interpolate_midpoint() {
        let values = [dec!(0.9), dec!(0.8), dec!(0.7), dec!(0.75), dec!(0.85)];
        // halfway between 75 and 100
        let v = interpolate(&SMILE_GRID, &values, dec!(87.5));
        assert_eq!(v, dec!(0.75));
    }

    #[test]
    fn create_fans_out() {
        let smile = VolSmile::create(dec!(0.9), dec!(2));
        assert_eq!(smile.vols(), &[dec!(0.9); 5]);
        assert_eq!(smile.query(dec!(113)), dec!(0.9));
    }

    #[test]
    fn update_bends_bracketing_points() {
        let mut smile = VolSmile::create(dec!(0.8), dec!(1));
        // equal quantity at moneyness 110 -> points 100 and 125 move halfway to 1.0
        smile.update(dec!(110), dec!(1.0), dec!(1));
        assert_eq!(smile.vols()[2], dec!(0.9));
        assert_eq!(smile.vols()[3], dec!(0.9));
        assert_eq!(smile.vols()[0], dec!(0.8));
        assert_eq!(smile.traded_qty(), dec!(2));
    }

    #[test]
    fn update_on_grid_touches_one_point() {
        let mut smile = VolSmile::create(dec!(0.8), dec!(3));
        smile.update(dec!(75), dec!(1.2), dec!(1));
        assert_eq!(smile.vols()[1], dec!(0.9));
        assert_eq!(smile.vols()[2], dec!(0.8));
    }
}
