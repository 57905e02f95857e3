// 15.0 engine/risk.rs: account-level margin and unrealized payoff.
// margin heuristics read the oracle's mark feed; the smile-derived
// Black-Scholes mark is reserved for liquidation transfers.

use super::core::Engine;
use super::results::EngineError;
use crate::instrument::{OptionKey, OptionSeries};
use crate::margin::{self, MarginKind};
use crate::oracle::PriceOracle;
use crate::position::position_nets;
use crate::pricing;
use crate::types::{moneyness_pct, AccountId, Price, Quote, StrikeLevel, UnderlyingId};
use rust_decimal::Decimal;
use std::collections::HashMap;

impl Engine {
    pub(super) fn spot(&self, underlying: UnderlyingId) -> Result<Price, EngineError> {
        self.oracle
            .latest_spot(underlying)
            .map(|quote| quote.price)
            .ok_or(EngineError::MissingOracle(underlying))
    }

    pub(super) fn oracle_mark(
        &self,
        underlying: UnderlyingId,
        is_call: bool,
        level: StrikeLevel,
    ) -> Result<Price, EngineError> {
        self.oracle
            .latest_mark(underlying, is_call, level)
            .map(|quote| quote.price)
            .ok_or(EngineError::MissingMark(underlying, level))
    }

    /// Fair value of a series from its smile through Black-Scholes. This is
    /// the price a liquidator pays when inheriting a position.
    pub(super) fn smile_mark(&self, series: &OptionSeries) -> Result<Price, EngineError> {
        let spot = self.spot(series.underlying)?;
        let smile = self
            .smiles
            .get(&series.key())
            .ok_or(EngineError::MissingSmile)?;
        let sigma = smile.query(moneyness_pct(spot, series.strike));
        let tau_secs = self.now.seconds_until(series.expiry);
        let mark = pricing::price(
            series.kind,
            spot,
            series.strike,
            sigma,
            tau_secs,
            self.params.risk_free_rate,
        )?;
        Ok(mark)
    }

    /// Total margin requirement across the account's net exposures. Each
    /// position's contribution is `|net| * unit / netted_count`; the division
    /// cancels the duplicate visits of the pairwise netting scan.
    pub fn margin_requirement(
        &self,
        account: AccountId,
        level: MarginKind,
    ) -> Result<Quote, EngineError> {
        let Some(book) = self.accounts.get(&account) else {
            return Ok(Quote::zero());
        };

        let mut total = Quote::zero();
        for net in position_nets(&self.arena, &book.index, account) {
            if net.net_qty.is_zero() {
                continue;
            }
            let Some(position) = self.arena.get(net.slot) else {
                continue;
            };
            let series = &position.series;
            let spot = self.spot(series.underlying)?;
            let mark = self.oracle_mark(series.underlying, series.kind.is_call(), series.level)?;

            let is_buyer = net.net_qty > Decimal::ZERO;
            let unit = margin::unit_margin(
                series.kind,
                is_buyer,
                level,
                spot,
                series.strike,
                mark,
                &self.margin_params,
            );
            let share = net.net_qty.abs() / Decimal::from(net.netted_count as u64);
            total = total.add(unit.mul(share));
        }
        Ok(total)
    }

    /// Mark-to-spot payoff of the account's live positions, bucketed by
    /// option fingerprint. With `only_loss` set, winning buckets are dropped
    /// so the margin check never counts unrealized gains as collateral.
    pub fn unrealized_payoff(
        &self,
        account: AccountId,
        only_loss: bool,
    ) -> Result<Quote, EngineError> {
        let Some(book) = self.accounts.get(&account) else {
            return Ok(Quote::zero());
        };

        let mut buckets: HashMap<OptionKey, Quote> = HashMap::new();
        for slot in book.index.active_slots() {
            let Some(position) = self.arena.get(slot) else {
                continue;
            };
            if !position.is_live() {
                continue;
            }
            let spot = self.spot(position.series.underlying)?;
            let bucket = buckets
                .entry(position.series.key())
                .or_insert_with(Quote::zero);
            *bucket = bucket.add(position.payoff_to(account, spot));
        }

        let total = buckets
            .values()
            .filter(|bucket| !only_loss || bucket.is_negative())
            .sum();
        Ok(total)
    }

    /// The margin check: balance plus unrealized losses must cover the
    /// requirement. Exactly at the boundary counts as satisfied.
    pub fn margin_ok(&self, account: AccountId, level: MarginKind) -> Result<bool, EngineError> {
        let balance = self.balance(account);
        let loss = self.unrealized_payoff(account, true)?;
        let requirement = self.margin_requirement(account, level)?;
        Ok(!balance.add(loss).sub(requirement).is_negative())
    }
}
