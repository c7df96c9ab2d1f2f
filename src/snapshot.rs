//! Point-in-time view of holdings and prices, read once per rebalance cycle.

use crate::types::Symbol;

/// A single held asset.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Holding {
    pub symbol: Symbol,
    /// Currency `price` is expressed in.
    pub quote: Symbol,
    /// Base units held.
    pub quantity: f64,
    /// Last price per base unit.
    pub price: f64,
}

impl Holding {
    pub fn new(symbol: Symbol, quote: Symbol, quantity: f64, price: f64) -> Self {
        Self {
            symbol,
            quote,
            quantity,
            price,
        }
    }

    /// Mark-to-market value (`quantity * price`).
    #[inline]
    pub fn value(&self) -> f64 {
        self.quantity * self.price
    }
}

/// Current portfolio state as reported by the market/position source.
///
/// Holdings keep the order they were reported in.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioSnapshot {
    /// Value of the whole portfolio (holdings plus cash) in the accounting currency.
    pub total_value: f64,
    pub holdings: Vec<Holding>,
}

impl PortfolioSnapshot {
    /// Snapshot with an externally supplied total value.
    pub fn new(total_value: f64, holdings: Vec<Holding>) -> Self {
        Self {
            total_value,
            holdings,
        }
    }

    /// Snapshot whose total is `cash` plus the value of every holding.
    pub fn with_cash(cash: f64, holdings: Vec<Holding>) -> Self {
        let invested: f64 = holdings.iter().map(Holding::value).sum();
        Self {
            total_value: cash + invested,
            holdings,
        }
    }

    pub fn holding(&self, symbol: Symbol) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    /// Current value of `symbol`, 0 when not held.
    pub fn current_value(&self, symbol: Symbol) -> f64 {
        self.holding(symbol).map_or(0.0, Holding::value)
    }

    /// Portion of `total_value` not held in any asset.
    pub fn cash(&self) -> f64 {
        self.total_value - self.holdings.iter().map(Holding::value).sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd() -> Symbol {
        Symbol::new("USD")
    }

    #[test]
    fn with_cash_sums_holdings() {
        let snap = PortfolioSnapshot::with_cash(
            1_000.0,
            vec![
                Holding::new(Symbol::new("BTC"), usd(), 0.25, 24_000.0),
                Holding::new(Symbol::new("ETH"), usd(), 1.5, 2_000.0),
            ],
        );
        assert_eq!(snap.total_value, 10_000.0);
        assert_eq!(snap.cash(), 1_000.0);
    }

    #[test]
    fn absent_symbol_is_zero() {
        let snap = PortfolioSnapshot::new(100.0, vec![]);
        assert_eq!(snap.current_value(Symbol::new("DOGE")), 0.0);
        assert!(snap.holding(Symbol::new("DOGE")).is_none());
    }

    #[test]
    fn current_value_uses_price() {
        let snap = PortfolioSnapshot::new(
            10_000.0,
            vec![Holding::new(Symbol::new("ETH"), usd(), 3.0, 2_000.0)],
        );
        assert_eq!(snap.current_value(Symbol::new("ETH")), 6_000.0);
    }
}
