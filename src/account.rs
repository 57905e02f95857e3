// 10.0 account.rs: collateral balances and the per-account position index.
// balances never go negative; settlement and liquidation only move value
// between accounts already in the book (plus the insurance account).

use crate::position::AccountIndex;
use crate::types::Quote;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    pub balance: Quote,
    pub index: AccountIndex,
}

impl Account {
    pub fn credit(&mut self, amount: Quote) {
        debug_assert!(!amount.is_negative());
        self.balance = self.balance.add(amount);
    }

    pub fn debit(&mut self, amount: Quote) -> Result<(), AccountError> {
        debug_assert!(!amount.is_negative());
        if amount > self.balance {
            return Err(AccountError::InsufficientBalance {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance = self.balance.sub(amount);
        Ok(())
    }

    /// Debit up to `amount`, returning what was actually taken. Used by the
    /// settlement path where a short balance degrades to partial payment.
    pub fn debit_up_to(&mut self, amount: Quote) -> Quote {
        let taken = amount.min(self.balance);
        self.balance = self.balance.sub(taken);
        taken
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountError {
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Quote, available: Quote },

    #[error("deposit would exceed the account balance cap {cap}")]
    BalanceCapExceeded { cap: Quote },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn credit_debit_round_trip() {
        let mut account = Account::default();
        account.credit(Quote::new(dec!(100)));
        assert_eq!(account.balance.value(), dec!(100));

        account.debit(Quote::new(dec!(40))).unwrap();
        assert_eq!(account.balance.value(), dec!(60));

        let err = account.debit(Quote::new(dec!(100)));
        assert!(matches!(err, Err(AccountError::InsufficientBalance { .. })));
        assert_eq!(account.balance.value(), dec!(60));
    }

    #[test]
    fn debit_up_to_clamps() {
        let mut account = Account::default();
        account.credit(Quote::new(dec!(30)));

        let taken = account.debit_up_to(Quote::new(dec!(50)));
        assert_eq!(taken.value(), dec!(30));
        assert_eq!(account.balance.value(), dec!(0));
    }
}
