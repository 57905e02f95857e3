//! Price oracle seam.
//!
//! The ledger consumes two feeds per underlying: the spot price and a mark
//! price per (call/put, strike level). Real deployments proxy external
//! oracles behind the `PriceOracle` trait; `FeedBoard` is the in-memory
//! implementation used by the engine, tests, and the simulator.

use crate::types::{OracleRound, Price, StrikeLevel, Timestamp, UnderlyingId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleQuote {
    pub round: OracleRound,
    pub price: Price,
    pub updated_at: Timestamp,
}

pub trait PriceOracle {
    /// Latest spot quote, or None if no feed is registered for the underlying.
    fn latest_spot(&self, underlying: UnderlyingId) -> Option<OracleQuote>;

    /// Latest option mark quote for (underlying, call/put, strike level).
    fn latest_mark(
        &self,
        underlying: UnderlyingId,
        is_call: bool,
        level: StrikeLevel,
    ) -> Option<OracleQuote>;
}

// in-memory feed store. push methods are the keeper-facing write side;
// the engine only reads through the PriceOracle trait.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedBoard {
    spots: HashMap<UnderlyingId, OracleQuote>,
    marks: HashMap<(UnderlyingId, bool, StrikeLevel), OracleQuote>,
    next_round: u64,
}

impl FeedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_spot(&mut self, underlying: UnderlyingId, price: Price, now: Timestamp) {
        self.next_round += 1;
        self.spots.insert(
            underlying,
            OracleQuote {
                round: OracleRound(self.next_round),
                price,
                updated_at: now,
            },
        );
    }

    pub fn push_mark(
        &mut self,
        underlying: UnderlyingId,
        is_call: bool,
        level: StrikeLevel,
        price: Price,
        now: Timestamp,
    ) {
        self.next_round += 1;
        self.marks.insert(
            (underlying, is_call, level),
            OracleQuote {
                round: OracleRound(self.next_round),
                price,
                updated_at: now,
            },
        );
    }

    pub fn has_spot(&self, underlying: UnderlyingId) -> bool {
        self.spots.contains_key(&underlying)
    }
}

impl PriceOracle for FeedBoard {
    fn latest_spot(&self, underlying: UnderlyingId) -> Option<OracleQuote> {
        self.spots.get(&underlying).copied()
    }

    fn latest_mark(
        &self,
        underlying: UnderlyingId,
        is_call: bool,
        level: StrikeLevel,
    ) -> Option<OracleQuote> {
        self.marks.get(&(underlying, is_call, level)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn spot_feed_round_trips() {
        let mut board = FeedBoard::new();
        let eth = UnderlyingId(1);
        assert!(board.latest_spot(eth).is_none());

        board.push_spot(eth, Price::new_unchecked(dec!(1500)), Timestamp::from_millis(5));
        let quote = board.latest_spot(eth).unwrap();
        assert_eq!(quote.price.value(), dec!(1500));
        assert_eq!(quote.updated_at, Timestamp::from_millis(5));
    }

    #[test]
    fn mark_feed_keyed_by_kind_and_level() {
        let mut board = FeedBoard::new();
        let eth = UnderlyingId(1);
        let level = StrikeLevel::new(7).unwrap();

        board.push_mark(eth, true, level, Price::new_unchecked(dec!(60)), Timestamp::from_millis(1));
        assert!(board.latest_mark(eth, true, level).is_some());
        assert!(board.latest_mark(eth, false, level).is_none());
    }

    #[test]
    fn rounds_increase() {
        let mut board = FeedBoard::new();
        let eth = UnderlyingId(1);
        board.push_spot(eth, Price::new_unchecked(dec!(1)), Timestamp::from_millis(0));
        let first = board.latest_spot(eth).unwrap().round;
        board.push_spot(eth, Price::new_unchecked(dec!(2)), Timestamp::from_millis(1));
        let second = board.latest_spot(eth).unwrap().round;
        assert!(second > first);
    }
}
