//! One rebalance cycle: snapshot → compute → (approve) → submit → report.
//!
//! A cycle either aborts before any submission (no snapshot, empty portfolio,
//! bad configuration, too many orders, not approved) or submits every computed
//! instruction once, in order. Failed submissions are counted, never retried.

use std::fmt;
use std::time::Duration;

use cryptofolio::{
    drift_report, DriftReport, FeeEstimate, FeeModel, PortfolioSnapshot, PortfolioSpec,
    Rebalancer, Side, TradeInstruction,
};
use cryptofolio_broker::{Execution, ExecutionResult, ExecutionStatus, MarketData};
use log::{error, info, warn};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::{Error, Result};

/// Everything a cycle needs that stays fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct CycleContext {
    pub spec: PortfolioSpec,
    pub rebalancer: Rebalancer,
    pub fees: FeeModel,
    pub max_orders_per_cycle: usize,
    pub order_interval: Duration,
    pub sells_first: bool,
}

impl CycleContext {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            spec: config.portfolio_spec()?,
            rebalancer: Rebalancer::new(config.policy()?),
            fees: config.fee_model(),
            max_orders_per_cycle: config.execution.max_orders_per_cycle,
            order_interval: Duration::from_millis(config.execution.order_interval_ms),
            sells_first: config.execution.sells_first,
        })
    }
}

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleOptions {
    /// Compute and log the trades but submit nothing.
    pub dry_run: bool,
    /// Sequence number, for logs and the audit trail.
    pub cycle: u64,
}

/// Outcome of a cycle that got as far as computing trades.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub snapshot: PortfolioSnapshot,
    /// Instructions in submission order.
    pub trades: Vec<TradeInstruction>,
    pub results: Vec<ExecutionResult>,
    pub estimate: FeeEstimate,
    pub submitted: usize,
    pub filled: usize,
    pub partial: usize,
    pub failed: usize,
    pub fees_paid: f64,
    /// Weights after execution, when a fresh snapshot could be read.
    pub drift: Option<DriftReport>,
}

impl CycleReport {
    fn new(
        snapshot: PortfolioSnapshot,
        trades: Vec<TradeInstruction>,
        estimate: FeeEstimate,
    ) -> Self {
        Self {
            snapshot,
            trades,
            results: Vec::new(),
            estimate,
            submitted: 0,
            filled: 0,
            partial: 0,
            failed: 0,
            fees_paid: 0.0,
            drift: None,
        }
    }

    /// True when the portfolio was already within tolerance.
    pub fn is_noop(&self) -> bool {
        self.trades.is_empty()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} trades, {} submitted, {} filled, {} partial, {} failed, fees {:.2}",
            self.trades.len(),
            self.submitted,
            self.filled,
            self.partial,
            self.failed,
            self.fees_paid
        )
    }
}

/// Fetch a snapshot and compute the trades for it, without submitting.
pub fn plan(
    ctx: &CycleContext,
    market: &dyn MarketData,
) -> Result<(PortfolioSnapshot, Vec<TradeInstruction>)> {
    let snapshot = market.get_snapshot()?;
    let trades = ctx.rebalancer.compute_trades(&ctx.spec, &snapshot)?;
    Ok((snapshot, execution_order(trades, ctx.sells_first)))
}

/// Run one cycle with no approval step.
pub fn run_cycle(
    ctx: &CycleContext,
    market: &dyn MarketData,
    exec: &dyn Execution,
    audit: &mut AuditLog,
    opts: &CycleOptions,
) -> Result<CycleReport> {
    execute(ctx, market, exec, audit, opts, None::<Approval>)
}

type Approval = fn(&PortfolioSnapshot, &[TradeInstruction]) -> Result<bool>;

/// Run one cycle, asking `approve` before anything is submitted.
///
/// `approve` sees the snapshot and the instructions in submission order; a
/// `false` answer aborts the cycle with [`Error::Aborted`].
pub fn run_cycle_with<F>(
    ctx: &CycleContext,
    market: &dyn MarketData,
    exec: &dyn Execution,
    audit: &mut AuditLog,
    opts: &CycleOptions,
    approve: F,
) -> Result<CycleReport>
where
    F: FnOnce(&PortfolioSnapshot, &[TradeInstruction]) -> Result<bool>,
{
    execute(ctx, market, exec, audit, opts, Some(approve))
}

fn execute<F>(
    ctx: &CycleContext,
    market: &dyn MarketData,
    exec: &dyn Execution,
    audit: &mut AuditLog,
    opts: &CycleOptions,
    approve: Option<F>,
) -> Result<CycleReport>
where
    F: FnOnce(&PortfolioSnapshot, &[TradeInstruction]) -> Result<bool>,
{
    audit::log_cycle_started(audit, opts.cycle, opts.dry_run)?;

    // 1. Snapshot + trades; any failure here means nothing is submitted
    let (snapshot, trades) = match plan(ctx, market) {
        Ok(planned) => planned,
        Err(e) => {
            audit::log_cycle_skipped(audit, &e.to_string())?;
            return Err(e);
        }
    };
    audit::log_snapshot(audit, &snapshot)?;

    let estimate = ctx.fees.estimate(&trades);
    let mut report = CycleReport::new(snapshot, trades, estimate);

    if report.trades.is_empty() {
        info!("cycle {}: portfolio within tolerance, nothing to trade", opts.cycle);
        audit.log_simple("no_rebalance_needed")?;
        return Ok(report);
    }

    audit::log_trades(audit, &report.trades)?;
    info!(
        "cycle {}: {} trades computed (est. cost {})",
        opts.cycle,
        report.trades.len(),
        report.estimate
    );

    // 2. Guards
    if let Err(e) = enforce_max_orders_per_cycle(report.trades.len(), ctx.max_orders_per_cycle) {
        audit::log_cycle_skipped(audit, &e.to_string())?;
        return Err(e);
    }

    if opts.dry_run {
        info!("cycle {}: dry run, no orders submitted", opts.cycle);
        audit.log_simple("dry_run")?;
        return Ok(report);
    }

    if let Some(approve) = approve {
        if !approve(&report.snapshot, &report.trades)? {
            audit.log("user_confirmed", serde_json::json!({"approved": false}))?;
            return Err(Error::Aborted("rebalance not approved".into()));
        }
        audit.log("user_confirmed", serde_json::json!({"approved": true}))?;
    }

    // 3. Submit in order, once each
    let count = report.trades.len();
    for (i, trade) in report.trades.iter().enumerate() {
        report.submitted += 1;

        match exec.submit(trade) {
            Ok(result) => {
                audit::log_execution(audit, trade, &result)?;
                match result.status {
                    ExecutionStatus::Filled => {
                        info!("[{}/{count}] {trade}: filled", i + 1);
                        report.filled += 1;
                    }
                    ExecutionStatus::PartiallyFilled => {
                        warn!(
                            "[{}/{count}] {trade}: partial fill {:.2}/{:.2} {}",
                            i + 1,
                            result.filled_quote,
                            trade.quote_amount,
                            trade.quote
                        );
                        report.partial += 1;
                    }
                    ExecutionStatus::Rejected => {
                        warn!(
                            "[{}/{count}] {trade}: rejected ({})",
                            i + 1,
                            result.message.as_deref().unwrap_or("no reason given")
                        );
                        report.failed += 1;
                    }
                }
                report.fees_paid += result.fee;
                report.results.push(result);
            }
            Err(e) => {
                error!("[{}/{count}] {trade}: submission failed: {e}", i + 1);
                audit::log_execution_error(audit, trade, &e.to_string())?;
                report.failed += 1;
            }
        }

        // Rate limiting between orders
        if i + 1 < count && !ctx.order_interval.is_zero() {
            std::thread::sleep(ctx.order_interval);
        }
    }

    let settled = report.filled + report.partial;
    audit::log_cycle_completed(audit, report.submitted, settled, report.failed)?;
    info!("cycle {}: {report}", opts.cycle);

    // 4. Post-execution drift
    let drift = market
        .get_snapshot()
        .map_err(Error::from)
        .and_then(|after| Ok(drift_report(&ctx.spec, &after)?));
    match drift {
        Ok(drift) => {
            info!("cycle {}: tracking error {:.3}%", opts.cycle, drift.tracking_error_pct);
            audit::log_drift(audit, &drift)?;
            report.drift = Some(drift);
        }
        Err(e) => warn!("cycle {}: no post-trade drift report: {e}", opts.cycle),
    }

    Ok(report)
}

/// Refuse to submit more than `max` orders in one cycle.
pub fn enforce_max_orders_per_cycle(count: usize, max: usize) -> Result<()> {
    if count > max {
        return Err(Error::Aborted(format!(
            "{count} orders generated but max_orders_per_cycle is {max}"
        )));
    }
    Ok(())
}

/// Submission order: sells ahead of buys when `sells_first`, otherwise as
/// computed. The sort is stable, so declaration order holds within a side.
pub fn execution_order(
    mut trades: Vec<TradeInstruction>,
    sells_first: bool,
) -> Vec<TradeInstruction> {
    if sells_first {
        trades.sort_by_key(|t| match t.side {
            Side::Sell => 0,
            Side::Buy => 1,
        });
    }
    trades
}
