// 9.0 position.rs: append-only position arena, per-account soft-delete index,
// and the pairwise netting scan. positions are created by keepers from
// matched trades and only ever leave the arena wholesale at rollover;
// netting and liquidation flip flags instead of compacting.

use crate::instrument::{OptionKey, OptionSeries};
use crate::types::{AccountId, Price, Quote};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub buyer: AccountId,
    pub seller: AccountId,
    pub premium: Price,
    pub quantity: Decimal,
    pub series: OptionSeries,
    // set when exactly offset against an opposing position; the entry stays
    // in the arena but drops out of margin, settlement, and liquidation
    pub netted: bool,
}

impl Position {
    pub fn new(
        buyer: AccountId,
        seller: AccountId,
        premium: Price,
        quantity: Decimal,
        series: OptionSeries,
    ) -> Self {
        Self {
            buyer,
            seller,
            premium,
            quantity,
            series,
            netted: false,
        }
    }

    pub fn is_live(&self) -> bool {
        !self.netted && self.quantity > Decimal::ZERO
    }

    pub fn involves(&self, account: AccountId) -> bool {
        self.buyer == account || self.seller == account
    }

    /// Quantity signed from `account`'s perspective: positive for the buyer,
    /// negative for the seller, zero for strangers.
    pub fn signed_qty(&self, account: AccountId) -> Decimal {
        if self.buyer == account {
            self.quantity
        } else if self.seller == account {
            -self.quantity
        } else {
            Decimal::ZERO
        }
    }

    /// Exercise payoff net of premium from `account`'s perspective.
    pub fn payoff_to(&self, account: AccountId, spot: Price) -> Quote {
        let per_unit = self.series.intrinsic(spot).value() - self.premium.value();
        Quote::new(per_unit * self.signed_qty(account))
    }
}

// 9.1: per-account index into the arena. soft deletes keep slots stable for
// the liquidation rollback path; compaction waits for rollover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub slot: usize,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIndex {
    entries: Vec<IndexEntry>,
    live: usize,
}

impl AccountIndex {
    pub fn push(&mut self, slot: usize) {
        self.entries.push(IndexEntry { slot, active: true });
        self.live += 1;
    }

    /// Deactivate the first active entry pointing at `slot`.
    pub fn deactivate(&mut self, slot: usize) -> bool {
        for entry in self.entries.iter_mut() {
            if entry.active && entry.slot == slot {
                entry.active = false;
                self.live -= 1;
                return true;
            }
        }
        false
    }

    /// Reactivate an entry, used only by the liquidation undo path.
    pub fn reactivate(&mut self, slot: usize) -> bool {
        for entry in self.entries.iter_mut() {
            if !entry.active && entry.slot == slot {
                entry.active = true;
                self.live += 1;
                return true;
            }
        }
        false
    }

    /// Drop the most recent entry for `slot` entirely (trade-entry rollback).
    pub fn pop_if_last(&mut self, slot: usize) -> bool {
        if let Some(last) = self.entries.last() {
            if last.slot == slot {
                if last.active {
                    self.live -= 1;
                }
                self.entries.pop();
                return true;
            }
        }
        false
    }

    pub fn active_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().filter(|e| e.active).map(|e| e.slot)
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.live = 0;
    }
}

// 9.2: arena. positions are only appended within a round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionArena {
    positions: Vec<Position>,
}

impl PositionArena {
    pub fn push(&mut self, position: Position) -> usize {
        self.positions.push(position);
        self.positions.len() - 1
    }

    /// Remove the most recent position; only valid as the inverse of the
    /// push that just happened (trade-entry rollback).
    pub fn pop_last(&mut self) -> Option<Position> {
        self.positions.pop()
    }

    pub fn get(&self, slot: usize) -> Option<&Position> {
        self.positions.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Position> {
        self.positions.get_mut(slot)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Position)> {
        self.positions.iter().enumerate()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

/// Net exposure of one of an account's positions against every sibling
/// sharing the same option fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionNet {
    pub slot: usize,
    pub key: OptionKey,
    /// buy-minus-sell quantity across all duplicates, signed for the account
    pub net_qty: Decimal,
    /// duplicates participating in the net, including this position
    pub netted_count: usize,
}

/// The netting scan: for each live indexed position, sum the account's signed
/// quantity over every live indexed position with the identical fingerprint.
/// Quadratic in the account's position count by design; margin accumulation
/// divides by `netted_count` to cancel the duplicate visits.
pub fn position_nets(
    arena: &PositionArena,
    index: &AccountIndex,
    account: AccountId,
) -> Vec<PositionNet> {
    let mut nets = Vec::with_capacity(index.live_count());

    for slot in index.active_slots() {
        let Some(position) = arena.get(slot) else {
            continue;
        };
        if !position.is_live() {
            continue;
        }

        let key = position.series.key();
        let mut net_qty = Decimal::ZERO;
        let mut netted_count = 0usize;

        for other_slot in index.active_slots() {
            let Some(other) = arena.get(other_slot) else {
                continue;
            };
            if !other.is_live() || other.series.key() != key {
                continue;
            }
            net_qty += other.signed_qty(account);
            netted_count += 1;
        }

        nets.push(PositionNet {
            slot,
            key,
            net_qty,
            netted_count,
        });
    }

    nets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OptionKind, StrikeLevel, Timestamp, UnderlyingId};
    use rust_decimal_macros::dec;

    const ALICE: AccountId = AccountId(1);
    const BOB: AccountId = AccountId(2);
    const CAROL: AccountId = AccountId(3);

    fn series(level: u8) -> OptionSeries {
        OptionSeries {
            underlying: UnderlyingId(1),
            kind: OptionKind::Call,
            strike: Price::new_unchecked(dec!(1850)),
            level: StrikeLevel::new(level).unwrap(),
            expiry: Timestamp::from_millis(1_000_000),
        }
    }

    fn record(
        arena: &mut PositionArena,
        indices: &mut std::collections::HashMap<AccountId, AccountIndex>,
        buyer: AccountId,
        seller: AccountId,
        qty: Decimal,
        level: u8,
    ) -> usize {
        let slot = arena.push(Position::new(
            buyer,
            seller,
            Price::new_unchecked(dec!(10)),
            qty,
            series(level),
        ));
        indices.entry(buyer).or_default().push(slot);
        indices.entry(seller).or_default().push(slot);
        slot
    }

    #[test]
    fn signed_qty_by_role() {
        let pos = Position::new(ALICE, BOB, Price::new_unchecked(dec!(10)), dec!(5), series(7));
        assert_eq!(pos.signed_qty(ALICE), dec!(5));
        assert_eq!(pos.signed_qty(BOB), dec!(-5));
        assert_eq!(pos.signed_qty(CAROL), dec!(0));
    }

    #[test]
    fn payoff_sign_flips_between_sides() {
        let pos = Position::new(ALICE, BOB, Price::new_unchecked(dec!(10)), dec!(2), series(7));
        let spot = Price::new_unchecked(dec!(2000)); // intrinsic 150
        assert_eq!(pos.payoff_to(ALICE, spot).value(), dec!(280));
        assert_eq!(pos.payoff_to(BOB, spot).value(), dec!(-280));
    }

    #[test]
    fn index_soft_delete_bookkeeping() {
        let mut index = AccountIndex::default();
        index.push(0);
        index.push(3);
        assert_eq!(index.live_count(), 2);

        assert!(index.deactivate(0));
        assert_eq!(index.live_count(), 1);
        assert_eq!(index.len(), 2);
        assert_eq!(index.active_slots().collect::<Vec<_>>(), vec![3]);

        assert!(index.reactivate(0));
        assert_eq!(index.live_count(), 2);
        assert!(!index.deactivate(9));
    }

    #[test]
    fn opposing_positions_fully_net() {
        let mut arena = PositionArena::default();
        let mut indices = std::collections::HashMap::new();
        record(&mut arena, &mut indices, ALICE, BOB, dec!(5), 7);
        record(&mut arena, &mut indices, BOB, ALICE, dec!(5), 7);

        for net in position_nets(&arena, &indices[&ALICE], ALICE) {
            assert_eq!(net.net_qty, dec!(0));
            assert_eq!(net.netted_count, 2);
        }
    }

    #[test]
    fn partial_netting_leaves_difference() {
        let mut arena = PositionArena::default();
        let mut indices = std::collections::HashMap::new();
        record(&mut arena, &mut indices, ALICE, BOB, dec!(5), 7);
        record(&mut arena, &mut indices, BOB, ALICE, dec!(2), 7);

        let nets = position_nets(&arena, &indices[&ALICE], ALICE);
        assert_eq!(nets.len(), 2);
        for net in nets {
            assert_eq!(net.net_qty, dec!(3));
            assert_eq!(net.netted_count, 2);
        }
    }

    #[test]
    fn different_levels_do_not_net() {
        let mut arena = PositionArena::default();
        let mut indices = std::collections::HashMap::new();
        record(&mut arena, &mut indices, ALICE, BOB, dec!(5), 7);
        record(&mut arena, &mut indices, BOB, ALICE, dec!(5), 8);

        let nets = position_nets(&arena, &indices[&ALICE], ALICE);
        assert_eq!(nets.len(), 2);
        assert_eq!(nets[0].net_qty, dec!(5));
        assert_eq!(nets[1].net_qty, dec!(-5));
        assert_eq!(nets[0].netted_count, 1);
    }

    #[test]
    fn netted_positions_drop_out() {
        let mut arena = PositionArena::default();
        let mut indices = std::collections::HashMap::new();
        let slot = record(&mut arena, &mut indices, ALICE, BOB, dec!(5), 7);
        arena.get_mut(slot).unwrap().netted = true;

        assert!(position_nets(&arena, &indices[&ALICE], ALICE).is_empty());
    }
}
