// 14.0: the ledger engine. coordinates accounts, trade entry, margin checks,
// settlement, liquidation, and the round lifecycle over a single mutable
// store. deterministic and event-driven with no external I/O.

mod core;
mod liquidate;
mod results;
mod risk;
mod rounds;
mod settle;
mod trades;

pub use core::{Engine, INSURANCE_ACCOUNT};
pub use results::{EngineError, LiquidationOutcome, LiquidationReport, SettlementSummary};
