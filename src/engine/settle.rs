// 17.0 engine/settle.rs: end-of-round settlement. losers pay winners; a
// short balance degrades to partial payment with a capped insurance draw
// rather than stranding the round.

use super::core::{Engine, INSURANCE_ACCOUNT};
use super::results::{EngineError, SettlementSummary};
use crate::events::{EventPayload, SettlementEvent};
use crate::types::{AccountId, Quote};
use rust_decimal::Decimal;

impl Engine {
    /// Settle every live position of the current round at oracle spot.
    ///
    /// For each position the losing side transfers the absolute payoff to
    /// the winning side. If the loser cannot pay in full, the insurance
    /// account covers the shortfall up to `payoff * max_insured_pct`; any
    /// residue past the cap is simply not paid.
    pub fn settle(&mut self, caller: AccountId) -> Result<SettlementSummary, EngineError> {
        if self.paused {
            return Err(EngineError::Paused);
        }
        if self.now < self.round.expiry {
            return Err(EngineError::NotExpired);
        }
        if self.round.settled {
            return Err(EngineError::AlreadySettled);
        }

        let max_insured = self.params.max_insured_pct.as_fraction();
        let mut positions_settled = 0usize;
        let mut insurance_total = Quote::zero();

        for slot in 0..self.arena.len() {
            let (buyer, seller, buyer_payoff) = {
                let Some(position) = self.arena.get(slot) else {
                    continue;
                };
                if !position.is_live() {
                    continue;
                }
                let spot = self.spot(position.series.underlying)?;
                (
                    position.buyer,
                    position.seller,
                    position.payoff_to(position.buyer, spot),
                )
            };

            positions_settled += 1;
            if buyer_payoff.value() == Decimal::ZERO {
                continue;
            }

            let (ower, owee, owed) = if buyer_payoff.is_negative() {
                (buyer, seller, buyer_payoff.abs())
            } else {
                (seller, buyer, buyer_payoff)
            };

            let paid = self.accounts.entry(ower).or_default().debit_up_to(owed);
            let shortfall = owed.sub(paid);

            let mut insured = Quote::zero();
            if shortfall.value() > Decimal::ZERO {
                let cap = owed.mul(max_insured);
                insured = self
                    .accounts
                    .entry(INSURANCE_ACCOUNT)
                    .or_default()
                    .debit_up_to(shortfall.min(cap));
            }

            self.accounts
                .entry(owee)
                .or_default()
                .credit(paid.add(insured));
            insurance_total = insurance_total.add(insured);
        }

        self.insurance_drawn = self.insurance_drawn.add(insurance_total);
        self.round.settled = true;

        let summary = SettlementSummary {
            round: self.round.number,
            positions_settled,
            insurance_drawn: insurance_total,
        };
        self.emit_event(EventPayload::Settlement(SettlementEvent {
            caller,
            round: summary.round,
            positions_settled: summary.positions_settled,
            insurance_drawn: summary.insurance_drawn,
        }));
        Ok(summary)
    }
}
