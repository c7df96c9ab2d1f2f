//! Broker boundary for cryptofolio.
//!
//! The rebalancing core never talks to an exchange. It receives a
//! [`PortfolioSnapshot`] from a [`MarketData`] source and hands each
//! [`TradeInstruction`] to an [`Execution`] sink. Implementations:
//!
//! - [`mock::MockBroker`]: canned responses and recorded submissions for tests
//! - [`paper::PaperBroker`]: simulated fills against in-memory balances

pub mod error;
pub mod mock;
pub mod paper;
pub mod types;

pub use error::BrokerError;
pub use types::*;

use cryptofolio::{PortfolioSnapshot, TradeInstruction};

/// Source of current holdings and prices.
pub trait MarketData {
    /// Read a fresh snapshot. Fails with [`BrokerError::DataUnavailable`] when
    /// positions or prices cannot be obtained; callers skip the cycle.
    fn get_snapshot(&self) -> Result<PortfolioSnapshot, BrokerError>;
}

/// Sink for trade instructions.
///
/// No retries happen behind this trait; a failed submission is reported once.
pub trait Execution {
    fn submit(&self, trade: &TradeInstruction) -> Result<ExecutionResult, BrokerError>;
}
