// 16.0 engine/trades.rs: keeper-driven trade entry. a matched trade becomes
// a position, bends the smile, and must leave both parties above initial
// margin or the whole insertion unwinds.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{EventPayload, PositionRecordedEvent};
use crate::instrument::OptionSeries;
use crate::margin::MarginKind;
use crate::position::Position;
use crate::pricing::{self, PricingError};
use crate::smile::VolSmile;
use crate::types::{moneyness_pct, AccountId, OptionKind, Price, StrikeLevel, UnderlyingId};
use rust_decimal::Decimal;

impl Engine {
    /// Record a matched trade as a position. Returns the arena slot.
    ///
    /// Validation, smile update, and index insertion happen in order; if the
    /// post-insertion margin check fails for either party the smile snapshot
    /// and the freshly pushed entries are rolled back and the trade is
    /// rejected with no residual state.
    #[allow(clippy::too_many_arguments)]
    pub fn record_position(
        &mut self,
        caller: AccountId,
        buyer: AccountId,
        seller: AccountId,
        trade_price: Price,
        quantity: Decimal,
        underlying: UnderlyingId,
        kind: OptionKind,
        level: StrikeLevel,
    ) -> Result<usize, EngineError> {
        self.require_keeper(caller)?;
        if self.paused {
            return Err(EngineError::Paused);
        }
        if quantity <= Decimal::ZERO {
            return Err(EngineError::ZeroQuantity);
        }
        if buyer == seller {
            return Err(EngineError::SelfTrade);
        }
        if self.now >= self.round.expiry {
            return Err(EngineError::RoundExpired);
        }
        if !self.underlyings.contains(&underlying) {
            return Err(EngineError::UnknownUnderlying(underlying));
        }

        let strike = self
            .round
            .menu(underlying)
            .ok_or(EngineError::NoStrikeMenu(underlying))?[level.index()];
        let spot = self.spot(underlying)?;
        let expiry = self.round.expiry;
        let tau_secs = self.now.seconds_until(expiry);
        let rate = self.params.risk_free_rate;

        // back out the trade's implied vol; newton first, bisection if the
        // newton budget runs out
        let iv = match pricing::implied_vol_newton(
            kind,
            spot,
            strike,
            trade_price,
            tau_secs,
            rate,
            &self.params.iv,
        ) {
            Ok(iv) => iv,
            Err(PricingError::NotConverged { .. }) => pricing::implied_vol_bisection(
                kind,
                spot,
                strike,
                trade_price,
                tau_secs,
                rate,
                &self.params.iv,
            )?,
            Err(err) => return Err(err.into()),
        };

        let series = OptionSeries {
            underlying,
            kind,
            strike,
            level,
            expiry,
        };
        let key = series.key();

        // snapshot for the rollback path
        let prior_smile = self.smiles.get(&key).cloned();
        match self.smiles.get_mut(&key) {
            Some(smile) => smile.update(moneyness_pct(spot, strike), iv, quantity),
            None => {
                self.smiles.insert(key, VolSmile::create(iv, quantity));
            }
        }

        let slot = self
            .arena
            .push(Position::new(buyer, seller, trade_price, quantity, series));
        self.accounts.entry(buyer).or_default().index.push(slot);
        self.accounts.entry(seller).or_default().index.push(slot);

        if let Err(err) = self.entry_margin_check(buyer, seller) {
            // undo in reverse order of application
            if let Some(book) = self.accounts.get_mut(&seller) {
                book.index.pop_if_last(slot);
            }
            if let Some(book) = self.accounts.get_mut(&buyer) {
                book.index.pop_if_last(slot);
            }
            self.arena.pop_last();
            match prior_smile {
                Some(smile) => {
                    self.smiles.insert(key, smile);
                }
                None => {
                    self.smiles.remove(&key);
                }
            }
            return Err(err);
        }

        self.emit_event(EventPayload::PositionRecorded(PositionRecordedEvent {
            buyer,
            seller,
            trade_price,
            quantity,
            kind,
            underlying,
            strike_level: level,
            expiry,
        }));
        Ok(slot)
    }

    fn entry_margin_check(&self, buyer: AccountId, seller: AccountId) -> Result<(), EngineError> {
        for party in [buyer, seller] {
            if !self.margin_ok(party, MarginKind::Initial)? {
                return Err(EngineError::InsufficientMargin(party));
            }
        }
        Ok(())
    }
}
