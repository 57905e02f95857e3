// 12.0 config.rs: engine-wide settings. margin percentages live in
// margin::MarginParams; everything else the admin can touch is here.

use crate::pricing::IvParams;
use crate::types::{Bps, Quote};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    // ceiling on an insurance draw per settled position, as a fraction of
    // the unpaid payoff. 5000 bps = 50%
    pub max_insured_pct: Bps,
    // optional per-account balance ceiling; the insurance account is exempt
    pub max_account_balance: Option<Quote>,
    // hard-coded to zero upstream; kept as a parameter so the term structure
    // stays testable
    pub risk_free_rate: Decimal,
    // implied-vol solver budget shared by trade entry and mark pricing
    pub iv: IvParams,
    // event ring size
    pub max_events: usize,
    pub verbose: bool,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            max_insured_pct: Bps::new(5000),
            max_account_balance: None,
            risk_free_rate: dec!(0),
            iv: IvParams::default(),
            max_events: 10_000,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let params = EngineParams::default();
        assert_eq!(params.max_insured_pct.as_fraction(), dec!(0.5));
        assert_eq!(params.risk_free_rate, Decimal::ZERO);
        assert!(params.max_account_balance.is_none());
    }
}
