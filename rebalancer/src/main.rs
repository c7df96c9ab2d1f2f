//! CLI entry point for the cryptofolio rebalancer.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use cryptofolio::{drift_report, PortfolioSnapshot, TradeInstruction};
use cryptofolio_broker::paper::PaperBroker;
use cryptofolio_broker::MarketData;
use cryptofolio_rebalancer::audit::AuditLog;
use cryptofolio_rebalancer::config::Config;
use cryptofolio_rebalancer::cycle::{self, CycleContext, CycleOptions};
use cryptofolio_rebalancer::error::{Error, Result};
use cryptofolio_rebalancer::scheduler::{Scheduler, ThreadSleeper};
use cryptofolio_rebalancer::source::JsonSnapshotSource;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Periodic target-weight rebalancer for a crypto basket")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the config and print the target basket
    Check,

    /// Show the trades a cycle would make, without executing
    Plan {
        /// Path to snapshot.json
        snapshot: PathBuf,
    },

    /// Compare current weights against targets
    Drift {
        /// Path to snapshot.json
        snapshot: PathBuf,
    },

    /// Run one cycle against a paper account seeded from the snapshot
    Run {
        /// Path to snapshot.json
        snapshot: PathBuf,

        /// Show plan without executing
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,
    },

    /// Rebalance a paper account on the configured interval
    Schedule {
        /// Path to snapshot.json
        snapshot: PathBuf,

        /// Stop after this many cycles (runs forever if omitted)
        #[arg(long)]
        cycles: Option<u64>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(exit_code(&e));
        }
    };

    let result = match cli.command {
        Command::Check => check(&config),
        Command::Plan { snapshot } => show_plan(&config, &snapshot),
        Command::Drift { snapshot } => show_drift(&config, &snapshot),
        Command::Run {
            snapshot,
            dry_run,
            force,
        } => run_once(&config, &snapshot, dry_run, force),
        Command::Schedule { snapshot, cycles } => run_schedule(&config, &snapshot, cycles),
    };

    if let Err(e) = result {
        match &e {
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(exit_code(&e));
            }
        }
    }
}

fn exit_code(e: &Error) -> i32 {
    match e {
        Error::InvalidConfiguration(_) | Error::ConfigParse(_) => 2,
        _ => 1,
    }
}

fn check(config: &Config) -> Result<()> {
    let spec = config.portfolio_spec()?;
    let policy = config.policy()?;
    println!(
        "Config OK: every {} day(s), tolerance {:.2}%, unlisted holdings: {:?}",
        config.schedule.interval_days,
        policy.tolerance * 100.0,
        policy.unlisted,
    );
    println!("\nTARGET BASKET:");
    for a in spec.assets() {
        println!("  {:8} {:>7.2}%  ({})", a.symbol, a.weight * 100.0, a.quote);
    }
    Ok(())
}

fn show_plan(config: &Config, snapshot_path: &Path) -> Result<()> {
    let ctx = CycleContext::from_config(config)?;
    let source = JsonSnapshotSource::new(snapshot_path);
    let (snapshot, trades) = cycle::plan(&ctx, &source)?;

    display_snapshot(&snapshot);
    if trades.is_empty() {
        println!("\nNo rebalancing needed: portfolio is within tolerance.");
        return Ok(());
    }
    display_plan(&trades, &ctx);
    Ok(())
}

fn show_drift(config: &Config, snapshot_path: &Path) -> Result<()> {
    let spec = config.portfolio_spec()?;
    let snapshot = JsonSnapshotSource::new(snapshot_path).get_snapshot()?;
    let report = drift_report(&spec, &snapshot)?;
    print!("{report}");
    Ok(())
}

fn run_once(config: &Config, snapshot_path: &Path, dry_run: bool, force: bool) -> Result<()> {
    let ctx = CycleContext::from_config(config)?;
    let broker = paper_broker(config, snapshot_path)?;
    let mut audit = AuditLog::open(&config.audit_path())?;
    let opts = CycleOptions { dry_run, cycle: 1 };

    let confirm = |snapshot: &PortfolioSnapshot, trades: &[TradeInstruction]| {
        display_snapshot(snapshot);
        display_plan(trades, &ctx);
        if force {
            return Ok(true);
        }
        dialoguer::Confirm::new()
            .with_prompt("Execute?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))
    };
    let report = cycle::run_cycle_with(&ctx, &broker, &broker, &mut audit, &opts, confirm)?;

    if report.is_noop() {
        println!("\nNo rebalancing needed: portfolio is within tolerance.");
        return Ok(());
    }
    if dry_run {
        display_snapshot(&report.snapshot);
        display_plan(&report.trades, &ctx);
        println!("\n[DRY RUN] No orders submitted.");
        return Ok(());
    }

    println!("\n{report}. Audit logged to {}", config.audit_path().display());
    if let Some(drift) = &report.drift {
        print!("\n{drift}");
    }
    Ok(())
}

fn run_schedule(config: &Config, snapshot_path: &Path, cycles: Option<u64>) -> Result<()> {
    let ctx = CycleContext::from_config(config)?;
    let broker = paper_broker(config, snapshot_path)?;
    let mut audit = AuditLog::open(&config.audit_path())?;
    let scheduler = Scheduler::new(config.interval());

    let summary = scheduler.run(cycles, &mut ThreadSleeper, |n| {
        let opts = CycleOptions {
            dry_run: false,
            cycle: n,
        };
        cycle::run_cycle(&ctx, &broker, &broker, &mut audit, &opts)
    })?;

    audit.log(
        "schedule_finished",
        serde_json::json!({
            "completed": summary.completed,
            "skipped": summary.skipped,
        }),
    )?;
    println!(
        "{} cycle(s) completed, {} skipped",
        summary.completed, summary.skipped
    );
    Ok(())
}

// === Helpers ===

fn paper_broker(config: &Config, snapshot_path: &Path) -> Result<PaperBroker> {
    let snapshot = JsonSnapshotSource::new(snapshot_path).get_snapshot()?;
    Ok(PaperBroker::from_snapshot(
        config.quote()?,
        &snapshot,
        config.fee_model(),
    ))
}

fn display_snapshot(snapshot: &PortfolioSnapshot) {
    println!("CURRENT PORTFOLIO: {:.2} total", snapshot.total_value);
    for h in &snapshot.holdings {
        let weight = if snapshot.total_value > 0.0 {
            h.value() / snapshot.total_value
        } else {
            0.0
        };
        println!(
            "  {:8} {:>14.8} @ {:>12.2} = {:>12.2} {}  ({:.1}%)",
            h.symbol,
            h.quantity,
            h.price,
            h.value(),
            h.quote,
            weight * 100.0,
        );
    }
    println!("  {:8} {:>46.2}", "cash", snapshot.cash());
}

fn display_plan(trades: &[TradeInstruction], ctx: &CycleContext) {
    println!("\nREBALANCE TRADES:");
    println!(
        "  {:>3}  {:5} {:8} {:>14} {:6} {:>16}",
        "#", "Side", "Symbol", "Amount", "Quote", "Est. qty"
    );

    for (i, t) in trades.iter().enumerate() {
        let qty = t
            .quantity
            .map(|q| format!("{q:.8}"))
            .unwrap_or_else(|| "-".into());
        println!(
            "  {:>3}  {:5} {:8} {:>14.2} {:6} {:>16}   ({})",
            i + 1,
            t.side,
            t.symbol,
            t.quote_amount,
            t.quote,
            qty,
            t.reason,
        );
    }

    println!("\nEst. cost: {}", ctx.fees.estimate(trades));
}
