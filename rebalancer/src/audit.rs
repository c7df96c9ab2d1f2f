//! JSONL audit trail logging.
//!
//! Each rebalance cycle appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use cryptofolio::{DriftReport, PortfolioSnapshot, TradeInstruction};
use cryptofolio_broker::ExecutionResult;
use serde::Serialize;

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: Box<dyn Write + Send>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Box::new(BufWriter::new(file)),
        })
    }

    /// An audit log that discards everything (dry runs, tests).
    pub fn sink() -> Self {
        Self {
            writer: Box::new(std::io::sink()),
        }
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

/// Convenience: log a cycle start event.
pub fn log_cycle_started(audit: &mut AuditLog, cycle: u64, dry_run: bool) -> Result<()> {
    audit.log(
        "cycle_started",
        serde_json::json!({
            "cycle": cycle,
            "dry_run": dry_run,
        }),
    )
}

/// Convenience: log the snapshot the cycle works from.
pub fn log_snapshot(audit: &mut AuditLog, snapshot: &PortfolioSnapshot) -> Result<()> {
    let holdings: Vec<_> = snapshot
        .holdings
        .iter()
        .map(|h| {
            serde_json::json!({
                "symbol": h.symbol.as_str(),
                "quote": h.quote.as_str(),
                "qty": h.quantity,
                "price": h.price,
                "value": h.value(),
            })
        })
        .collect();

    audit.log(
        "snapshot_fetched",
        serde_json::json!({
            "holdings": holdings,
            "total_value": snapshot.total_value,
        }),
    )
}

/// Convenience: log computed trades.
pub fn log_trades(audit: &mut AuditLog, trades: &[TradeInstruction]) -> Result<()> {
    let trade_data: Vec<_> = trades.iter().map(trade_json).collect();
    audit.log("trades_computed", serde_json::json!({ "trades": trade_data }))
}

/// Convenience: log one submission and the venue's answer.
pub fn log_execution(
    audit: &mut AuditLog,
    trade: &TradeInstruction,
    result: &ExecutionResult,
) -> Result<()> {
    audit.log(
        "order_result",
        serde_json::json!({
            "trade": trade_json(trade),
            "order_id": result.order_id.0,
            "status": result.status.to_string(),
            "filled_quote": result.filled_quote,
            "filled_qty": result.filled_quantity,
            "avg_price": result.avg_price,
            "fee": result.fee,
            "message": result.message,
        }),
    )
}

/// Convenience: log a submission that errored before the venue answered.
pub fn log_execution_error(
    audit: &mut AuditLog,
    trade: &TradeInstruction,
    error: &str,
) -> Result<()> {
    audit.log(
        "order_error",
        serde_json::json!({
            "trade": trade_json(trade),
            "error": error,
        }),
    )
}

/// Convenience: log cycle completion.
pub fn log_cycle_completed(
    audit: &mut AuditLog,
    submitted: usize,
    filled: usize,
    failed: usize,
) -> Result<()> {
    audit.log(
        "cycle_completed",
        serde_json::json!({
            "submitted": submitted,
            "filled": filled,
            "failed": failed,
        }),
    )
}

/// Convenience: log post-execution weights against targets.
pub fn log_drift(audit: &mut AuditLog, report: &DriftReport) -> Result<()> {
    let entries: Vec<_> = report
        .entries
        .iter()
        .map(|e| {
            serde_json::json!({
                "symbol": e.symbol.as_str(),
                "target_weight": e.target_weight,
                "actual_weight": e.actual_weight,
                "diff_weight": e.diff_weight,
            })
        })
        .collect();

    audit.log(
        "drift",
        serde_json::json!({
            "tracking_error_pct": report.tracking_error_pct,
            "entries": entries,
        }),
    )
}

/// Convenience: log a cycle that ended without trading.
pub fn log_cycle_skipped(audit: &mut AuditLog, reason: &str) -> Result<()> {
    audit.log("cycle_skipped", serde_json::json!({ "reason": reason }))
}

fn trade_json(t: &TradeInstruction) -> serde_json::Value {
    serde_json::json!({
        "symbol": t.symbol.as_str(),
        "quote": t.quote.as_str(),
        "side": t.side.to_string(),
        "quote_amount": t.quote_amount,
        "qty": t.quantity,
        "reason": t.reason.to_string(),
    })
}
