//! Shared broker types: order ids and execution results.

use std::fmt;

use cryptofolio::{Side, Symbol};

/// Opaque order ID returned by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}

/// Final state of a submitted instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Filled,
    PartiallyFilled,
    Rejected,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Filled => "FILLED",
            ExecutionStatus::PartiallyFilled => "PARTIAL",
            ExecutionStatus::Rejected => "REJECTED",
        };
        f.pad(s)
    }
}

/// What the execution venue did with one instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub status: ExecutionStatus,
    /// Quote currency actually traded.
    pub filled_quote: f64,
    /// Base units actually traded.
    pub filled_quantity: f64,
    pub avg_price: f64,
    /// Fee charged, in quote currency.
    pub fee: f64,
    /// Venue-supplied explanation for rejections.
    pub message: Option<String>,
}

impl ExecutionResult {
    /// A rejection with nothing filled.
    pub fn rejected(
        order_id: OrderId,
        symbol: Symbol,
        side: Side,
        message: impl Into<String>,
    ) -> Self {
        Self {
            order_id,
            symbol,
            side,
            status: ExecutionStatus::Rejected,
            filled_quote: 0.0,
            filled_quantity: 0.0,
            avg_price: 0.0,
            fee: 0.0,
            message: Some(message.into()),
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(
            self.status,
            ExecutionStatus::Filled | ExecutionStatus::PartiallyFilled
        )
    }
}
