//! Collateral transfer seam (mocked).
//!
//! The actual token contract lives outside this system; the engine only needs
//! pull/push transfers and the token's decimals() to scale raw amounts. The
//! engine wraps every gate call in a non-reentrant lock because the external
//! transfer is the one place a re-entrant callback could observe half-applied
//! balances.

use crate::types::AccountId;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TransferError {
    #[error("token transfer from {0:?} failed")]
    PullFailed(AccountId),

    #[error("token transfer to {0:?} failed")]
    PushFailed(AccountId),
}

pub trait CollateralGate: fmt::Debug {
    /// Fractional digits of the collateral token.
    fn decimals(&self) -> u32;

    /// Pull `raw` token units from the holder into the ledger's custody.
    fn pull(&mut self, from: AccountId, raw: i128) -> Result<(), TransferError>;

    /// Push `raw` token units from custody back to the holder.
    fn push(&mut self, to: AccountId, raw: i128) -> Result<(), TransferError>;
}

/// In-memory token vault for tests and the simulator.
#[derive(Debug, Clone)]
pub struct MockVault {
    decimals: u32,
    wallets: HashMap<AccountId, i128>,
    custody: i128,
}

impl MockVault {
    pub fn new(decimals: u32) -> Self {
        Self {
            decimals,
            wallets: HashMap::new(),
            custody: 0,
        }
    }

    pub fn mint(&mut self, holder: AccountId, raw: i128) {
        *self.wallets.entry(holder).or_insert(0) += raw;
    }

    pub fn wallet(&self, holder: AccountId) -> i128 {
        self.wallets.get(&holder).copied().unwrap_or(0)
    }

    pub fn custody_total(&self) -> i128 {
        self.custody
    }
}

impl CollateralGate for MockVault {
    fn decimals(&self) -> u32 {
        self.decimals
    }

    fn pull(&mut self, from: AccountId, raw: i128) -> Result<(), TransferError> {
        let wallet = self.wallets.entry(from).or_insert(0);
        if *wallet < raw {
            return Err(TransferError::PullFailed(from));
        }
        *wallet -= raw;
        self.custody += raw;
        Ok(())
    }

    fn push(&mut self, to: AccountId, raw: i128) -> Result<(), TransferError> {
        if self.custody < raw {
            return Err(TransferError::PushFailed(to));
        }
        self.custody -= raw;
        *self.wallets.entry(to).or_insert(0) += raw;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_and_push() {
        let mut vault = MockVault::new(6);
        let alice = AccountId(1);
        vault.mint(alice, 5_000_000);

        vault.pull(alice, 2_000_000).unwrap();
        assert_eq!(vault.wallet(alice), 3_000_000);
        assert_eq!(vault.custody_total(), 2_000_000);

        vault.push(alice, 1_000_000).unwrap();
        assert_eq!(vault.wallet(alice), 4_000_000);
    }

    #[test]
    fn pull_rejects_overdraw() {
        let mut vault = MockVault::new(6);
        let alice = AccountId(1);
        vault.mint(alice, 100);
        assert!(vault.pull(alice, 200).is_err());
        assert_eq!(vault.wallet(alice), 100);
    }
}
