// 14.0.2: result types and errors for engine operations.

use crate::account::AccountError;
use crate::custody::TransferError;
use crate::fixed::NumericError;
use crate::pricing::PricingError;
use crate::strikes::StrikeError;
use crate::types::{AccountId, Quote, StrikeLevel, UnderlyingId};

/// Per-position outcome of a liquidation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiquidationOutcome {
    /// third-party liquidator paid the mark price and inherited the position
    Transferred { slot: usize, paid: Quote },
    /// counterparty liquidator cancelled the position outright
    Netted { slot: usize, paid: Quote },
    /// liquidating would not have improved the target's margin
    Skipped { slot: usize },
    /// applied, then undone because the liquidator failed its own margin check
    RolledBack { slot: usize },
}

#[derive(Debug, Clone)]
pub struct LiquidationReport {
    pub target: AccountId,
    pub liquidator: AccountId,
    pub outcomes: Vec<LiquidationOutcome>,
    /// whether the target passed maintenance margin when the pass ended
    pub target_recovered: bool,
    pub reward: Quote,
    pub insurance_cut: Quote,
}

#[derive(Debug, Clone)]
pub struct SettlementSummary {
    pub round: u64,
    pub positions_settled: usize,
    pub insurance_drawn: Quote,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    // validation
    #[error("amount must be positive")]
    ZeroAmount,

    #[error("quantity must be positive")]
    ZeroQuantity,

    #[error("buyer and seller must be distinct accounts")]
    SelfTrade,

    #[error("account {0:?} not found")]
    AccountNotFound(AccountId),

    #[error("caller {0:?} is not a keeper")]
    NotKeeper(AccountId),

    #[error("caller {0:?} is not the administrator")]
    NotAdmin(AccountId),

    #[error("engine is paused")]
    Paused,

    #[error("no oracle registered for underlying {0:?}")]
    MissingOracle(UnderlyingId),

    #[error("underlying {0:?} is not active")]
    UnknownUnderlying(UnderlyingId),

    #[error("no strike menu for underlying {0:?}")]
    NoStrikeMenu(UnderlyingId),

    #[error("no mark price for underlying {0:?} level {1}")]
    MissingMark(UnderlyingId, StrikeLevel),

    #[error("no volatility smile recorded for the series")]
    MissingSmile,

    #[error("round has expired; trade entry closed until rollover")]
    RoundExpired,

    #[error("round expiry has not been reached")]
    NotExpired,

    #[error("round already settled")]
    AlreadySettled,

    #[error("round must be settled before rollover")]
    NotSettled,

    #[error("collateral gate not configured")]
    GateMissing,

    #[error("re-entrant transfer rejected")]
    ReentrantTransfer,

    // margin
    #[error("account {0:?} fails the margin check")]
    InsufficientMargin(AccountId),

    #[error("account {0:?} passes maintenance margin; nothing to liquidate")]
    NotLiquidatable(AccountId),

    #[error("an account cannot liquidate itself")]
    SelfLiquidation,

    // numerical / pass-through
    #[error("numeric error: {0}")]
    Numeric(#[from] NumericError),

    #[error("pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("strike error: {0}")]
    Strike(#[from] StrikeError),

    #[error("account error: {0}")]
    Account(#[from] AccountError),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),
}
