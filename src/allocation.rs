//! Target allocation: which assets the basket holds and at what weight.

use crate::error::{RebalanceError, Result};
use crate::types::Symbol;

/// Maximum allowed distance between the weight sum and 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// One asset's share of the basket.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssetAllocation {
    /// Base asset, e.g. `BTC`.
    pub symbol: Symbol,
    /// Currency the asset is priced and traded in, e.g. `USD`.
    pub quote: Symbol,
    /// Target fraction of total portfolio value, in `[0, 1]`.
    pub weight: f64,
}

impl AssetAllocation {
    pub fn new(symbol: Symbol, quote: Symbol, weight: f64) -> Self {
        Self {
            symbol,
            quote,
            weight,
        }
    }
}

/// Validated target portfolio.
///
/// Weights are each in `[0, 1]` and sum to 1.0 within
/// [`WEIGHT_SUM_TOLERANCE`]. Immutable once built; declaration order is the
/// order trade instructions are emitted in.
///
/// ```
/// use cryptofolio::{AssetAllocation, PortfolioSpec, Symbol};
///
/// let usd = Symbol::new("USD");
/// let spec = PortfolioSpec::new(vec![
///     AssetAllocation::new(Symbol::new("BTC"), usd, 0.6),
///     AssetAllocation::new(Symbol::new("ETH"), usd, 0.4),
/// ])
/// .unwrap();
/// assert_eq!(spec.weight_of(Symbol::new("ETH")), Some(0.4));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioSpec {
    assets: Vec<AssetAllocation>,
}

impl PortfolioSpec {
    /// Build and validate a target portfolio.
    pub fn new(assets: Vec<AssetAllocation>) -> Result<Self> {
        if assets.is_empty() {
            return Err(invalid("portfolio has no assets"));
        }

        let mut seen = rustc_hash::FxHashSet::default();
        for a in &assets {
            if !seen.insert(a.symbol) {
                return Err(invalid(format!("duplicate symbol: {}", a.symbol)));
            }
        }

        for a in &assets {
            if !a.weight.is_finite() {
                return Err(invalid(format!("weight for {} is not finite", a.symbol)));
            }
            if !(0.0..=1.0).contains(&a.weight) {
                return Err(invalid(format!(
                    "weight for {} ({}) is outside [0, 1]",
                    a.symbol, a.weight
                )));
            }
        }

        let sum: f64 = assets.iter().map(|a| a.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(invalid(format!("weights sum to {sum:.6}, expected 1.0")));
        }

        Ok(Self { assets })
    }

    /// Configured assets in declaration order.
    pub fn assets(&self) -> &[AssetAllocation] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn allocation(&self, symbol: Symbol) -> Option<&AssetAllocation> {
        self.assets.iter().find(|a| a.symbol == symbol)
    }

    pub fn weight_of(&self, symbol: Symbol) -> Option<f64> {
        self.allocation(symbol).map(|a| a.weight)
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.allocation(symbol).is_some()
    }

    /// Base symbols in declaration order.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.assets.iter().map(|a| a.symbol).collect()
    }
}

fn invalid(msg: impl Into<String>) -> RebalanceError {
    RebalanceError::InvalidConfiguration(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd() -> Symbol {
        Symbol::new("USD")
    }

    fn alloc(sym: &str, weight: f64) -> AssetAllocation {
        AssetAllocation::new(Symbol::new(sym), usd(), weight)
    }

    #[test]
    fn accepts_valid_weights() {
        let spec = PortfolioSpec::new(vec![alloc("BTC", 0.6), alloc("ETH", 0.4)]).unwrap();
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.symbols(), vec![Symbol::new("BTC"), Symbol::new("ETH")]);
        assert_eq!(spec.weight_of(Symbol::new("BTC")), Some(0.6));
        assert_eq!(spec.weight_of(Symbol::new("SOL")), None);
    }

    #[test]
    fn accepts_zero_weight_entry() {
        let spec = PortfolioSpec::new(vec![
            alloc("BTC", 0.6),
            alloc("ETH", 0.4),
            alloc("DOGE", 0.0),
        ])
        .unwrap();
        assert!(spec.contains(Symbol::new("DOGE")));
    }

    #[test]
    fn accepts_float_noise_in_sum() {
        // 0.1 + 0.2 + 0.7 is not exactly 1.0 in binary
        let spec =
            PortfolioSpec::new(vec![alloc("BTC", 0.1), alloc("ETH", 0.2), alloc("SOL", 0.7)]);
        assert!(spec.is_ok());
    }

    #[test]
    fn rejects_sum_099() {
        let err = PortfolioSpec::new(vec![alloc("BTC", 0.59), alloc("ETH", 0.4)]).unwrap_err();
        assert!(matches!(err, RebalanceError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("0.990000"));
    }

    #[test]
    fn rejects_sum_over_one() {
        assert!(PortfolioSpec::new(vec![alloc("BTC", 0.7), alloc("ETH", 0.4)]).is_err());
    }

    #[test]
    fn rejects_negative_weight() {
        let err =
            PortfolioSpec::new(vec![alloc("BTC", 1.2), alloc("ETH", -0.2)]).unwrap_err();
        assert!(err.to_string().contains("outside [0, 1]"));
    }

    #[test]
    fn rejects_nan_weight() {
        assert!(PortfolioSpec::new(vec![alloc("BTC", f64::NAN)]).is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(PortfolioSpec::new(vec![]).is_err());
    }

    #[test]
    fn rejects_duplicate_symbol() {
        let err = PortfolioSpec::new(vec![alloc("BTC", 0.5), alloc("BTC", 0.5)]).unwrap_err();
        assert!(err.to_string().contains("duplicate symbol: BTC"));
    }
}
