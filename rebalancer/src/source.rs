//! Snapshot source backed by a JSON file.
//!
//! ```json
//! {
//!   "cash": 1000.0,
//!   "holdings": [
//!     { "symbol": "BTC", "quote": "USD", "quantity": 0.125, "price": 32000.0 }
//!   ]
//! }
//! ```
//!
//! `total_value` may be given instead of (or alongside) `cash`; when present it
//! wins. The file is re-read on every `get_snapshot` so an external process can
//! keep it current between cycles.

use std::path::{Path, PathBuf};

use cryptofolio::{Holding, PortfolioSnapshot};
use cryptofolio_broker::{BrokerError, MarketData};
use serde::Deserialize;

/// On-disk snapshot format.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub cash: f64,
    #[serde(default)]
    pub total_value: Option<f64>,
    #[serde(default)]
    pub holdings: Vec<Holding>,
}

impl SnapshotFile {
    /// Parse from a JSON string.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn into_snapshot(self) -> PortfolioSnapshot {
        match self.total_value {
            Some(total) => PortfolioSnapshot::new(total, self.holdings),
            None => PortfolioSnapshot::with_cash(self.cash, self.holdings),
        }
    }
}

/// [`MarketData`] that reads a [`SnapshotFile`] from disk.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    path: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarketData for JsonSnapshotSource {
    fn get_snapshot(&self) -> Result<PortfolioSnapshot, BrokerError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            BrokerError::DataUnavailable(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let file = SnapshotFile::parse(&contents).map_err(|e| {
            BrokerError::DataUnavailable(format!("failed to parse {}: {e}", self.path.display()))
        })?;
        Ok(file.into_snapshot())
    }
}
