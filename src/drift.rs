//! Allocation drift: how far actual weights are from target weights.

use std::fmt;

use crate::allocation::PortfolioSpec;
use crate::error::{RebalanceError, Result};
use crate::snapshot::PortfolioSnapshot;
use crate::types::Symbol;

/// Per-symbol comparison of actual vs target weight plus an overall tracking error.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DriftReport {
    pub entries: Vec<DriftEntry>,
    pub tracking_error_pct: f64,
}

/// One symbol's drift.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DriftEntry {
    pub symbol: Symbol,
    pub target_weight: f64,
    pub actual_weight: f64,
    /// `actual_weight - target_weight`
    pub diff_weight: f64,
    pub current_value: f64,
    pub target_value: f64,
}

impl DriftReport {
    /// Largest `|diff_weight|` across all entries (0 for an empty report).
    pub fn max_abs_deviation(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.diff_weight.abs())
            .fold(0.0, f64::max)
    }

    pub fn entry(&self, symbol: Symbol) -> Option<&DriftEntry> {
        self.entries.iter().find(|e| e.symbol == symbol)
    }
}

/// Compare a snapshot against the target weights.
///
/// Configured symbols come first in declaration order, then held symbols the
/// spec does not mention (target weight 0) in snapshot order.
pub fn drift_report(spec: &PortfolioSpec, snapshot: &PortfolioSnapshot) -> Result<DriftReport> {
    let total = snapshot.total_value;
    if !total.is_finite() || total <= 0.0 {
        return Err(RebalanceError::EmptyPortfolio);
    }

    let configured = spec.assets().iter().map(|a| (a.symbol, a.weight));
    let unlisted = snapshot
        .holdings
        .iter()
        .filter(|h| !spec.contains(h.symbol))
        .map(|h| (h.symbol, 0.0));

    let mut entries = Vec::new();
    let mut sum_sq_diff = 0.0_f64;

    for (symbol, target_weight) in configured.chain(unlisted) {
        let current_value = snapshot.current_value(symbol);
        let actual_weight = current_value / total;
        let diff_weight = actual_weight - target_weight;
        sum_sq_diff += diff_weight * diff_weight;

        entries.push(DriftEntry {
            symbol,
            target_weight,
            actual_weight,
            diff_weight,
            current_value,
            target_value: target_weight * total,
        });
    }

    let tracking_error_pct = (sum_sq_diff / entries.len().max(1) as f64).sqrt() * 100.0;

    Ok(DriftReport {
        entries,
        tracking_error_pct,
    })
}

impl fmt::Display for DriftReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DRIFT:")?;
        writeln!(
            f,
            "  {:8} {:>10} {:>10} {:>10} {:>14} {:>14}",
            "Symbol", "Target%", "Actual%", "Diff%", "Target", "Current"
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "  {:8} {:>9.2}% {:>9.2}% {:>+9.2}% {:>14.2} {:>14.2}",
                e.symbol,
                e.target_weight * 100.0,
                e.actual_weight * 100.0,
                e.diff_weight * 100.0,
                e.target_value,
                e.current_value,
            )?;
        }
        writeln!(f, "\n  Tracking error: {:.3}%", self.tracking_error_pct)?;
        Ok(())
    }
}
