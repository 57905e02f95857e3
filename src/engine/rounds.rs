// 19.0 engine/rounds.rs: the rollover step of the round lifecycle.
// settle() lives in settle.rs; this file only advances a settled round.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{EventPayload, RoundRolledEvent};
use crate::round::{advance_expiry, RoundState};
use crate::strikes;
use crate::types::AccountId;

impl Engine {
    /// Advance to the next round. Requires the current round to be settled
    /// and its expiry elapsed.
    ///
    /// `cleanup` names the accounts whose per-round position indices are
    /// cleared. An omitted account keeps stale index entries pointing into
    /// the emptied arena; the netting scan tolerates them, so this is an
    /// operational hazard rather than a correctness one.
    pub fn rollover(
        &mut self,
        caller: AccountId,
        cleanup: &[AccountId],
    ) -> Result<u64, EngineError> {
        self.require_keeper(caller)?;
        if self.paused {
            return Err(EngineError::Paused);
        }
        if self.now < self.round.expiry {
            return Err(EngineError::NotExpired);
        }
        if !self.round.settled {
            return Err(EngineError::NotSettled);
        }

        let next_number = self.round.number + 1;
        let next_expiry = advance_expiry(self.round.expiry, self.now);
        let mut next = RoundState::new(next_number, next_expiry);

        // regenerate every active underlying's menu from the current spot
        for underlying in self.underlyings.iter().copied() {
            let spot = self.spot(underlying)?;
            next.strike_menus
                .insert(underlying, strikes::strike_menu(spot)?);
        }

        self.arena.clear();
        self.smiles.clear();
        for account in cleanup {
            if let Some(book) = self.accounts.get_mut(account) {
                book.index.clear();
            }
        }
        self.round = next;

        self.emit_event(EventPayload::RoundRolled(RoundRolledEvent {
            round: next_number,
            expiry: next_expiry,
        }));
        Ok(next_number)
    }
}
