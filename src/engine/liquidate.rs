// 18.0 engine/liquidate.rs: position-by-position liquidation with manual
// apply/verify/undo. shorts are seized before longs; every applied step is
// re-verified against the liquidator's own maintenance margin and undone
// exactly if the liquidator would fail it.

use super::core::{Engine, INSURANCE_ACCOUNT};
use super::results::{EngineError, LiquidationOutcome, LiquidationReport};
use crate::account::AccountError;
use crate::events::{EventPayload, LiquidationEvent};
use crate::margin::{self, MarginKind};
use crate::types::{AccountId, Quote};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// penalty split of the seized position's maintenance margin: the target is
// debited up to 35 points, the liquidator keeps 25 of them, insurance the rest
const TARGET_PENALTY_PCT: Decimal = dec!(0.35);
const LIQUIDATOR_REWARD_PCT: Decimal = dec!(0.25);
const INSURANCE_SHARE_PCT: Decimal = dec!(0.10);

impl Engine {
    /// Liquidate `target`, which must currently fail maintenance margin.
    ///
    /// Iterates the target's short positions first, then longs, seizing one
    /// at a time until the target passes the margin check or positions run
    /// out. A position the liquidator cannot afford, or whose seizure would
    /// break the liquidator's own margin, is skipped rather than failing the
    /// whole call.
    pub fn liquidate(
        &mut self,
        caller: AccountId,
        target: AccountId,
    ) -> Result<LiquidationReport, EngineError> {
        if self.paused {
            return Err(EngineError::Paused);
        }
        if caller == target {
            return Err(EngineError::SelfLiquidation);
        }
        if self.margin_ok(target, MarginKind::Maintenance)? {
            return Err(EngineError::NotLiquidatable(target));
        }

        let slots = self.liquidation_order(target);

        let mut outcomes = Vec::with_capacity(slots.len());
        let mut reward = Quote::zero();
        let mut insurance_cut = Quote::zero();
        let mut positions_taken = 0usize;
        let mut positions_netted = 0usize;
        let mut target_recovered = false;

        for slot in slots {
            if self.margin_ok(target, MarginKind::Maintenance)? {
                target_recovered = true;
                break;
            }

            let (outcome, step_reward, step_insurance) =
                self.liquidate_one(caller, target, slot)?;
            match outcome {
                LiquidationOutcome::Transferred { .. } => positions_taken += 1,
                LiquidationOutcome::Netted { .. } => positions_netted += 1,
                LiquidationOutcome::Skipped { .. } | LiquidationOutcome::RolledBack { .. } => {}
            }
            reward = reward.add(step_reward);
            insurance_cut = insurance_cut.add(step_insurance);
            outcomes.push(outcome);
        }

        if !target_recovered {
            target_recovered = self.margin_ok(target, MarginKind::Maintenance)?;
        }

        self.emit_event(EventPayload::Liquidation(LiquidationEvent {
            target,
            liquidator: caller,
            positions_taken,
            positions_netted,
            reward,
            insurance_cut,
        }));

        Ok(LiquidationReport {
            target,
            liquidator: caller,
            outcomes,
            target_recovered,
            reward,
            insurance_cut,
        })
    }

    // the target's live slots, shorts before longs. shorts carry the open
    // tail risk, so seizing them first recovers margin fastest.
    fn liquidation_order(&self, target: AccountId) -> Vec<usize> {
        let Some(book) = self.accounts.get(&target) else {
            return Vec::new();
        };
        let mut shorts = Vec::new();
        let mut longs = Vec::new();
        for slot in book.index.active_slots() {
            let Some(position) = self.arena.get(slot) else {
                continue;
            };
            if !position.is_live() {
                continue;
            }
            if position.seller == target {
                shorts.push(slot);
            } else if position.buyer == target {
                longs.push(slot);
            }
        }
        shorts.extend(longs);
        shorts
    }

    fn liquidate_one(
        &mut self,
        liquidator: AccountId,
        target: AccountId,
        slot: usize,
    ) -> Result<(LiquidationOutcome, Quote, Quote), EngineError> {
        let skipped = (LiquidationOutcome::Skipped { slot }, Quote::zero(), Quote::zero());

        let (series, quantity, buyer, seller, payoff) = {
            let Some(position) = self.arena.get(slot) else {
                return Ok(skipped);
            };
            if !position.is_live() {
                return Ok(skipped);
            }
            let spot = self.spot(position.series.underlying)?;
            (
                position.series,
                position.quantity,
                position.buyer,
                position.seller,
                position.payoff_to(target, spot),
            )
        };

        // a position already paying the target does not need seizing
        if !payoff.is_negative() {
            return Ok(skipped);
        }

        let target_is_buyer = buyer == target;
        let counterparty = if target_is_buyer { seller } else { buyer };

        // maintenance margin of the seized exposure drives the penalty split
        let spot = self.spot(series.underlying)?;
        let oracle_mark =
            self.oracle_mark(series.underlying, series.kind.is_call(), series.level)?;
        let unit_mm = margin::unit_margin(
            series.kind,
            target_is_buyer,
            MarginKind::Maintenance,
            spot,
            series.strike,
            oracle_mark,
            &self.margin_params,
        );
        let position_mm = unit_mm.mul(quantity);

        if counterparty == liquidator {
            self.net_with_counterparty(liquidator, target, slot, payoff, position_mm)
        } else {
            self.transfer_to_liquidator(
                liquidator,
                target,
                slot,
                target_is_buyer,
                quantity,
                position_mm,
            )
        }
    }

    /// Counterparty path: the liquidator already holds the other side, so
    /// the position is cancelled outright. If cancelling leaves the
    /// liquidator owing the target, it pays the netted amount; when the
    /// target is the ower (the common case) cancellation is pure
    /// bookkeeping.
    fn net_with_counterparty(
        &mut self,
        liquidator: AccountId,
        target: AccountId,
        slot: usize,
        target_payoff: Quote,
        position_mm: Quote,
    ) -> Result<(LiquidationOutcome, Quote, Quote), EngineError> {
        let skipped = (LiquidationOutcome::Skipped { slot }, Quote::zero(), Quote::zero());

        let liquidator_payoff = target_payoff.negate();
        let mut paid = Quote::zero();
        if liquidator_payoff.is_negative() {
            let amount = liquidator_payoff.abs();
            match self.accounts.entry(liquidator).or_default().debit(amount) {
                Ok(()) => {}
                Err(AccountError::InsufficientBalance { .. }) => return Ok(skipped),
                Err(err) => return Err(err.into()),
            }
            self.accounts.entry(target).or_default().credit(amount);
            paid = amount;
        }

        {
            let position = self
                .arena
                .get_mut(slot)
                .ok_or(EngineError::AccountNotFound(target))?;
            position.netted = true;
        }

        if !self.margin_ok(liquidator, MarginKind::Maintenance)? {
            // exact inverse of the mutations above
            if let Some(position) = self.arena.get_mut(slot) {
                position.netted = false;
            }
            if paid.value() > Decimal::ZERO {
                self.accounts.entry(target).or_default().debit(paid)?;
                self.accounts.entry(liquidator).or_default().credit(paid);
            }
            return Ok((
                LiquidationOutcome::RolledBack { slot },
                Quote::zero(),
                Quote::zero(),
            ));
        }

        let (reward, insurance) = self.apply_penalty(liquidator, target, position_mm);
        Ok((LiquidationOutcome::Netted { slot, paid }, reward, insurance))
    }

    /// Third-party path: the liquidator pays the smile-derived mark price to
    /// the target and inherits its side of the position.
    fn transfer_to_liquidator(
        &mut self,
        liquidator: AccountId,
        target: AccountId,
        slot: usize,
        target_is_buyer: bool,
        quantity: Decimal,
        position_mm: Quote,
    ) -> Result<(LiquidationOutcome, Quote, Quote), EngineError> {
        let skipped = (LiquidationOutcome::Skipped { slot }, Quote::zero(), Quote::zero());

        let series = match self.arena.get(slot) {
            Some(position) => position.series,
            None => return Ok(skipped),
        };
        let mark = self.smile_mark(&series)?;
        let cost = Quote::new(mark.value() * quantity);

        match self.accounts.entry(liquidator).or_default().debit(cost) {
            Ok(()) => {}
            Err(AccountError::InsufficientBalance { .. }) => return Ok(skipped),
            Err(err) => return Err(err.into()),
        }
        self.accounts.entry(target).or_default().credit(cost);

        {
            let position = self
                .arena
                .get_mut(slot)
                .ok_or(EngineError::AccountNotFound(target))?;
            if target_is_buyer {
                position.buyer = liquidator;
            } else {
                position.seller = liquidator;
            }
        }
        if let Some(book) = self.accounts.get_mut(&target) {
            book.index.deactivate(slot);
        }
        self.accounts.entry(liquidator).or_default().index.push(slot);

        if !self.margin_ok(liquidator, MarginKind::Maintenance)? {
            // exact inverse, reverse order of application
            if let Some(book) = self.accounts.get_mut(&liquidator) {
                book.index.pop_if_last(slot);
            }
            if let Some(book) = self.accounts.get_mut(&target) {
                book.index.reactivate(slot);
            }
            if let Some(position) = self.arena.get_mut(slot) {
                if target_is_buyer {
                    position.buyer = target;
                } else {
                    position.seller = target;
                }
            }
            self.accounts.entry(target).or_default().debit(cost)?;
            self.accounts.entry(liquidator).or_default().credit(cost);
            return Ok((
                LiquidationOutcome::RolledBack { slot },
                Quote::zero(),
                Quote::zero(),
            ));
        }

        let (reward, insurance) = self.apply_penalty(liquidator, target, position_mm);
        Ok((
            LiquidationOutcome::Transferred { slot, paid: cost },
            reward,
            insurance,
        ))
    }

    // the counterparty path credits the target nothing before this debit, so
    // the target may hold less than the full 35 points. the split pays out of
    // what the debit actually recovers: the liquidator's 25 points first, the
    // remainder to insurance. nothing is credited that was not taken.
    fn apply_penalty(
        &mut self,
        liquidator: AccountId,
        target: AccountId,
        position_mm: Quote,
    ) -> (Quote, Quote) {
        let penalty = position_mm.mul(TARGET_PENALTY_PCT);
        let taken = self.accounts.entry(target).or_default().debit_up_to(penalty);

        let reward = position_mm.mul(LIQUIDATOR_REWARD_PCT).min(taken);
        let insurance = taken.sub(reward);
        self.accounts.entry(liquidator).or_default().credit(reward);
        self.accounts
            .entry(INSURANCE_ACCOUNT)
            .or_default()
            .credit(insurance);
        self.insurance_contributed = self.insurance_contributed.add(insurance);

        (reward, insurance)
    }
}
