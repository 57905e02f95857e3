// options-ledger: margin, pricing, and liquidation engine for an
// options-settlement ledger. trade matching and price discovery happen
// outside; this crate owns collateral requirements, expiry settlement, and
// the liquidation of under-collateralized accounts.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AccountId, Price, Quote, Bps, StrikeLevel
//   2.x  fixed.rs: checked Decimal kernel: ln, exp, sqrt, pow, token scaling
//   3.x  gauss.rs: normal pdf, cdf, inverse cdf
//   4.x  pricing.rs: Black-Scholes price, vega, implied vol solvers
//   5.x  instrument.rs: option series, netting fingerprint, intrinsic value
//   6.x  smile.rs: five-point volatility smile per option fingerprint
//   7.x  strikes.rs: spot -> 11-strike menu via the 32-band breakpoint table
//   8.x  margin.rs: long/short margin heuristics, alternative minimum
//   9.x  position.rs: position arena, soft-delete index, netting scan
//   10.x account.rs: collateral balances
//   11.x events.rs: state transition events for audit
//   12.x config.rs: engine-wide parameters
//   13.x round.rs: round state and the weekly expiry calendar
//   14.x engine/: the engine: trades, risk, settlement, liquidation, rounds

// numerical kernel
pub mod fixed;
pub mod gauss;
pub mod pricing;

// market structure
pub mod instrument;
pub mod margin;
pub mod position;
pub mod smile;
pub mod strikes;
pub mod types;

// ledger state
pub mod account;
pub mod config;
pub mod engine;
pub mod events;
pub mod round;

// external seams (mocked)
pub mod custody;
pub mod oracle;

// re exports for convenience
pub use account::*;
pub use config::*;
pub use engine::*;
pub use events::*;
pub use instrument::*;
pub use margin::*;
pub use position::*;
pub use round::*;
pub use smile::*;
pub use strikes::*;
pub use types::*;
pub use custody::{CollateralGate, MockVault, TransferError};
pub use oracle::{FeedBoard, OracleQuote, PriceOracle};
pub use pricing::{IvParams, PricingError};
