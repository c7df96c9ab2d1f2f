//! # cryptofolio
//!
//! Deterministic target-weight rebalancing for a basket of crypto assets.
//!
//! Given target weights ([`PortfolioSpec`]) and a point-in-time view of
//! holdings ([`PortfolioSnapshot`]), [`compute_trades`] returns the
//! quote-denominated buys and sells that bring every asset back within a
//! deviation tolerance of its target. The computation is a pure function:
//! fetching prices, submitting orders and scheduling live in the
//! `cryptofolio-broker` and `cryptofolio-rebalancer` crates.
//!
//! ## Quick Start
//!
//! ```
//! use cryptofolio::{
//!     compute_trades, AssetAllocation, Holding, PortfolioSnapshot, PortfolioSpec, Side, Symbol,
//! };
//!
//! let usd = Symbol::new("USD");
//! let spec = PortfolioSpec::new(vec![
//!     AssetAllocation::new(Symbol::new("BTC"), usd, 0.6),
//!     AssetAllocation::new(Symbol::new("ETH"), usd, 0.4),
//! ])
//! .unwrap();
//!
//! let snapshot = PortfolioSnapshot::new(
//!     10_000.0,
//!     vec![
//!         Holding::new(Symbol::new("BTC"), usd, 0.125, 32_000.0), // 4000
//!         Holding::new(Symbol::new("ETH"), usd, 3.0, 2_000.0),    // 6000
//!     ],
//! );
//!
//! let trades = compute_trades(&spec, &snapshot, 0.01).unwrap();
//! assert_eq!(trades.len(), 2);
//! assert_eq!(trades[0].side, Side::Buy);
//! assert_eq!(trades[0].quote_amount, 2_000.0);
//! assert_eq!(trades[1].side, Side::Sell);
//! assert_eq!(trades[1].quote_amount, 2_000.0);
//! ```
//!
//! ## Tolerance
//!
//! An asset is traded only when `|current - target| / total_value` reaches the
//! tolerance, so small drift from price noise does not churn the book.
//!
//! ## Unlisted holdings
//!
//! Held assets with no target allocation are sold down to zero by default
//! ([`UnlistedPolicy::Liquidate`]); set [`UnlistedPolicy::Keep`] or list them
//! in [`RebalancePolicy::excluded`] to leave them alone.

pub mod allocation;
pub mod drift;
pub mod error;
pub mod fees;
pub mod rebalance;
pub mod side;
pub mod snapshot;
pub mod types;

pub use allocation::{AssetAllocation, PortfolioSpec, WEIGHT_SUM_TOLERANCE};
pub use drift::{drift_report, DriftEntry, DriftReport};
pub use error::RebalanceError;
pub use fees::{FeeEstimate, FeeModel};
pub use rebalance::{
    compute_trades, RebalancePolicy, Rebalancer, TradeInstruction, TradeReason, UnlistedPolicy,
};
pub use side::Side;
pub use snapshot::{Holding, PortfolioSnapshot};
pub use types::Symbol;
