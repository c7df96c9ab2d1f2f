//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cryptofolio::{
    AssetAllocation, FeeModel, PortfolioSpec, RebalancePolicy, Symbol, UnlistedPolicy,
};
use serde::Deserialize;

use crate::error::{Error, Result};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub portfolio: PortfolioConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub cost: CostConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_days")]
    pub interval_days: u32,
}

fn default_interval_days() -> u32 {
    1
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_days: default_interval_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioConfig {
    /// Quote currency for assets that do not name their own.
    #[serde(default = "default_quote")]
    pub quote: String,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub unlisted: UnlistedPolicy,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub min_trade_value: f64,
    pub assets: Vec<AssetConfig>,
}

fn default_quote() -> String {
    "USD".into()
}
fn default_tolerance() -> f64 {
    0.01
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    pub symbol: String,
    #[serde(default)]
    pub quote: Option<String>,
    pub weight: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_max_orders")]
    pub max_orders_per_cycle: usize,
    #[serde(default = "default_order_interval")]
    pub order_interval_ms: u64,
    /// Submit sells before buys so proceeds fund the purchases.
    #[serde(default = "default_true")]
    pub sells_first: bool,
}

fn default_max_orders() -> usize {
    20
}
fn default_order_interval() -> u64 {
    100
}
fn default_true() -> bool {
    true
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_orders_per_cycle: default_max_orders(),
            order_interval_ms: default_order_interval(),
            sells_first: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CostConfig {
    #[serde(default = "default_fee_bps")]
    pub fee_bps: u32,
    #[serde(default)]
    pub slippage_bps: u32,
    #[serde(default)]
    pub min_fee: f64,
}

fn default_fee_bps() -> u32 {
    10
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            fee_bps: default_fee_bps(),
            slippage_bps: 0,
            min_fee: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate config from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants, including the portfolio weights.
    fn validate(&self) -> Result<()> {
        if self.schedule.interval_days == 0 {
            return Err(Error::InvalidConfiguration(
                "interval_days must be > 0".into(),
            ));
        }
        if self.execution.max_orders_per_cycle == 0 {
            return Err(Error::InvalidConfiguration(
                "max_orders_per_cycle must be > 0".into(),
            ));
        }
        if !self.cost.min_fee.is_finite() || self.cost.min_fee < 0.0 {
            return Err(Error::InvalidConfiguration("min_fee must be >= 0".into()));
        }
        self.portfolio_spec()?;
        self.policy()?.validate()?;
        Ok(())
    }

    /// Build the validated target portfolio.
    pub fn portfolio_spec(&self) -> Result<PortfolioSpec> {
        let default_quote = parse_symbol(&self.portfolio.quote)?;
        let assets = self
            .portfolio
            .assets
            .iter()
            .map(|a| -> Result<AssetAllocation> {
                let quote = match &a.quote {
                    Some(q) => parse_symbol(q)?,
                    None => default_quote,
                };
                Ok(AssetAllocation::new(parse_symbol(&a.symbol)?, quote, a.weight))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PortfolioSpec::new(assets)?)
    }

    /// Rebalance policy: tolerance, unlisted handling, exclusions, minimum size.
    pub fn policy(&self) -> Result<RebalancePolicy> {
        let excluded = self
            .portfolio
            .exclude
            .iter()
            .map(|s| parse_symbol(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(RebalancePolicy::default()
            .with_tolerance(self.portfolio.tolerance)
            .with_unlisted(self.portfolio.unlisted)
            .with_excluded(excluded)
            .with_min_trade_value(self.portfolio.min_trade_value))
    }

    pub fn fee_model(&self) -> FeeModel {
        FeeModel {
            fee_bps: self.cost.fee_bps,
            slippage_bps: self.cost.slippage_bps,
            min_fee: self.cost.min_fee,
        }
    }

    /// Default quote (accounting) currency.
    pub fn quote(&self) -> Result<Symbol> {
        parse_symbol(&self.portfolio.quote)
    }

    /// Time between rebalance cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.schedule.interval_days) * SECS_PER_DAY)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}

fn parse_symbol(s: &str) -> Result<Symbol> {
    Symbol::try_new(s).ok_or_else(|| {
        Error::InvalidConfiguration(format!(
            "symbol {s:?} must be 1..={} bytes",
            Symbol::MAX_LEN
        ))
    })
}
