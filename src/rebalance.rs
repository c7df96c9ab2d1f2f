//! Target-weight trade computation.
//!
//! Turns a [`PortfolioSpec`] and a [`PortfolioSnapshot`] into the list of
//! quote-denominated trades that moves each asset back to its target weight.
//! Pure: no I/O, no state kept between calls.

use std::fmt;

use crate::allocation::PortfolioSpec;
use crate::error::{RebalanceError, Result};
use crate::side::Side;
use crate::snapshot::PortfolioSnapshot;
use crate::types::Symbol;

/// What to do with held assets that have no target allocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum UnlistedPolicy {
    /// Sell them down to zero.
    #[default]
    Liquidate,
    /// Leave them untouched.
    Keep,
}

/// Parameters of the rebalance decision that are not part of the target weights.
#[derive(Clone, Debug, PartialEq)]
pub struct RebalancePolicy {
    /// Minimum `|current - target| / total` before an asset is traded.
    pub tolerance: f64,
    pub unlisted: UnlistedPolicy,
    /// Held symbols never liquidated, whatever `unlisted` says.
    pub excluded: Vec<Symbol>,
    /// Instructions smaller than this (in quote currency) are dropped.
    pub min_trade_value: f64,
}

impl Default for RebalancePolicy {
    fn default() -> Self {
        Self {
            tolerance: 0.0,
            unlisted: UnlistedPolicy::Liquidate,
            excluded: Vec::new(),
            min_trade_value: 0.0,
        }
    }
}

impl RebalancePolicy {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_unlisted(mut self, unlisted: UnlistedPolicy) -> Self {
        self.unlisted = unlisted;
        self
    }

    pub fn with_excluded(mut self, excluded: Vec<Symbol>) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn with_min_trade_value(mut self, min_trade_value: f64) -> Self {
        self.min_trade_value = min_trade_value;
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(RebalanceError::InvalidConfiguration(format!(
                "tolerance must be a finite value >= 0, got {}",
                self.tolerance
            )));
        }
        if !self.min_trade_value.is_finite() || self.min_trade_value < 0.0 {
            return Err(RebalanceError::InvalidConfiguration(format!(
                "min_trade_value must be a finite value >= 0, got {}",
                self.min_trade_value
            )));
        }
        Ok(())
    }
}

/// Why an instruction was generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TradeReason {
    /// Buying an asset not currently held.
    Open,
    /// Buying more of a held asset.
    Increase,
    /// Selling part of a held asset.
    Decrease,
    /// Selling a configured asset whose target is zero.
    Close,
    /// Selling a held asset that is not configured.
    Liquidate,
}

impl fmt::Display for TradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeReason::Open => "open",
            TradeReason::Increase => "increase",
            TradeReason::Decrease => "decrease",
            TradeReason::Close => "close",
            TradeReason::Liquidate => "liquidate",
        };
        f.pad(s)
    }
}

/// A single buy or sell, denominated in the asset's quote currency.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TradeInstruction {
    pub symbol: Symbol,
    pub quote: Symbol,
    pub side: Side,
    /// Amount to trade in quote currency. Always positive.
    pub quote_amount: f64,
    /// Estimated base quantity at the snapshot price, if a price was known.
    pub quantity: Option<f64>,
    pub reason: TradeReason,
}

impl TradeInstruction {
    /// `+quote_amount` for buys, `-quote_amount` for sells.
    pub fn signed_amount(&self) -> f64 {
        self.side.sign() * self.quote_amount
    }
}

impl fmt::Display for TradeInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.2} {}",
            self.side, self.symbol, self.quote_amount, self.quote
        )?;
        if let Some(qty) = self.quantity {
            write!(f, " (~{qty:.8} {})", self.symbol)?;
        }
        Ok(())
    }
}

/// Stateless rebalance decision procedure.
#[derive(Clone, Debug, Default)]
pub struct Rebalancer {
    policy: RebalancePolicy,
}

impl Rebalancer {
    pub fn new(policy: RebalancePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RebalancePolicy {
        &self.policy
    }

    /// Compute the trades that bring `snapshot` back within tolerance of `spec`.
    ///
    /// Configured assets come first in declaration order, then liquidations of
    /// unlisted holdings in snapshot order.
    pub fn compute_trades(
        &self,
        spec: &PortfolioSpec,
        snapshot: &PortfolioSnapshot,
    ) -> Result<Vec<TradeInstruction>> {
        self.policy.validate()?;

        let total = snapshot.total_value;
        if !total.is_finite() || total <= 0.0 {
            return Err(RebalanceError::EmptyPortfolio);
        }

        let mut trades = Vec::with_capacity(spec.len());

        // 1. Move each configured asset toward its target
        for alloc in spec.assets() {
            let holding = snapshot.holding(alloc.symbol);
            let current = holding.map_or(0.0, |h| h.value());
            let target = alloc.weight * total;

            if !self.exceeds_tolerance(current, target, total) {
                continue;
            }

            let (side, amount) = if current > target {
                (Side::Sell, current - target)
            } else {
                (Side::Buy, target - current)
            };

            let reason = match side {
                Side::Buy if current > 0.0 => TradeReason::Increase,
                Side::Buy => TradeReason::Open,
                Side::Sell if alloc.weight == 0.0 => TradeReason::Close,
                Side::Sell => TradeReason::Decrease,
            };

            trades.push(TradeInstruction {
                symbol: alloc.symbol,
                quote: alloc.quote,
                side,
                quote_amount: amount,
                quantity: estimate_quantity(amount, holding.map(|h| h.price)),
                reason,
            });
        }

        // 2. Liquidate holdings with no target allocation
        if self.policy.unlisted == UnlistedPolicy::Liquidate {
            for holding in &snapshot.holdings {
                if spec.contains(holding.symbol) || self.policy.excluded.contains(&holding.symbol)
                {
                    continue;
                }
                let current = holding.value();
                if current <= 0.0 || !self.exceeds_tolerance(current, 0.0, total) {
                    continue;
                }
                trades.push(TradeInstruction {
                    symbol: holding.symbol,
                    quote: holding.quote,
                    side: Side::Sell,
                    quote_amount: current,
                    quantity: Some(holding.quantity),
                    reason: TradeReason::Liquidate,
                });
            }
        }

        trades.retain(|t| t.quote_amount >= self.policy.min_trade_value);
        Ok(trades)
    }

    fn exceeds_tolerance(&self, current: f64, target: f64, total: f64) -> bool {
        if current == target {
            return false;
        }
        let deviation = (current - target) / total;
        deviation.abs() >= self.policy.tolerance
    }
}

/// Compute trades with the default policy (liquidate unlisted, no minimum size)
/// and the given deviation tolerance.
pub fn compute_trades(
    spec: &PortfolioSpec,
    snapshot: &PortfolioSnapshot,
    tolerance: f64,
) -> Result<Vec<TradeInstruction>> {
    Rebalancer::new(RebalancePolicy::default().with_tolerance(tolerance))
        .compute_trades(spec, snapshot)
}

fn estimate_quantity(quote_amount: f64, price: Option<f64>) -> Option<f64> {
    match price {
        Some(p) if p > 0.0 && p.is_finite() => Some(quote_amount / p),
        _ => None,
    }
}
