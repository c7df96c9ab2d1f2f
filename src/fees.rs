//! Transaction fee estimates for a set of trade instructions.

use std::fmt;

use crate::rebalance::TradeInstruction;

/// Flat percentage fee model, expressed in basis points of traded notional,
/// with an optional per-trade minimum (in quote currency).
///
/// ```
/// use cryptofolio::FeeModel;
///
/// // 0.1% taker fee
/// let model = FeeModel { fee_bps: 10, slippage_bps: 0, min_fee: 0.0 };
/// assert_eq!(model.cost(2_000.0), 2.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeeModel {
    /// Exchange fee in basis points (1 bps = 0.01%)
    pub fee_bps: u32,
    /// Slippage estimate in basis points
    pub slippage_bps: u32,
    /// Minimum fee per trade
    pub min_fee: f64,
}

impl FeeModel {
    /// A zero-cost model (no fees, no slippage).
    pub fn zero() -> Self {
        Self {
            fee_bps: 0,
            slippage_bps: 0,
            min_fee: 0.0,
        }
    }

    /// Exchange fee alone for a trade of `quote_amount`.
    pub fn fee(&self, quote_amount: f64) -> f64 {
        let bps = quote_amount.abs() * self.fee_bps as f64 / 10_000.0;
        bps.max(self.min_fee)
    }

    /// Estimated slippage for a trade of `quote_amount`.
    pub fn slippage(&self, quote_amount: f64) -> f64 {
        quote_amount.abs() * self.slippage_bps as f64 / 10_000.0
    }

    /// Total expected cost (fee plus slippage) of one trade.
    pub fn cost(&self, quote_amount: f64) -> f64 {
        self.fee(quote_amount) + self.slippage(quote_amount)
    }

    /// Sum fees and slippage over a set of instructions.
    pub fn estimate(&self, trades: &[TradeInstruction]) -> FeeEstimate {
        trades.iter().fold(FeeEstimate::default(), |acc, t| FeeEstimate {
            fees: acc.fees + self.fee(t.quote_amount),
            slippage: acc.slippage + self.slippage(t.quote_amount),
        })
    }
}

impl Default for FeeModel {
    fn default() -> Self {
        Self::zero()
    }
}

/// Aggregate estimated execution cost, in quote currency.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FeeEstimate {
    pub fees: f64,
    pub slippage: f64,
}

impl FeeEstimate {
    pub fn total(&self) -> f64 {
        self.fees + self.slippage
    }
}

impl fmt::Display for FeeEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} fees + {:.2} slippage = {:.2}",
            self.fees,
            self.slippage,
            self.total()
        )
    }
}
