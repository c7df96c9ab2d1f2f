//! Integration tests for full rebalance cycles against mock and paper brokers.

use std::time::Duration;

use cryptofolio::{
    drift_report, AssetAllocation, FeeModel, Holding, PortfolioSpec, RebalancePolicy, Rebalancer,
    Side, Symbol,
};
use cryptofolio_broker::mock::{FillMode, MockBroker, MockBrokerBuilder};
use cryptofolio_broker::paper::PaperBroker;
use cryptofolio_broker::MarketData;
use cryptofolio_rebalancer::audit::AuditLog;
use cryptofolio_rebalancer::config::Config;
use cryptofolio_rebalancer::cycle::{run_cycle, run_cycle_with, CycleContext, CycleOptions};
use cryptofolio_rebalancer::error::Error;
use cryptofolio_rebalancer::scheduler::{Scheduler, Sleeper};

fn btc() -> Symbol {
    Symbol::new("BTC")
}
fn eth() -> Symbol {
    Symbol::new("ETH")
}
fn usd() -> Symbol {
    Symbol::new("USD")
}

/// 50/50 BTC/ETH, 1% tolerance, no fees, no pacing.
fn ctx() -> CycleContext {
    let spec = PortfolioSpec::new(vec![
        AssetAllocation::new(btc(), usd(), 0.5),
        AssetAllocation::new(eth(), usd(), 0.5),
    ])
    .unwrap();
    CycleContext {
        spec,
        rebalancer: Rebalancer::new(RebalancePolicy::default().with_tolerance(0.01)),
        fees: FeeModel::zero(),
        max_orders_per_cycle: 20,
        order_interval: Duration::ZERO,
        sells_first: true,
    }
}

/// BTC worth 3000, ETH worth 7000: needs BUY BTC 2000 / SELL ETH 2000.
fn drifted() -> MockBrokerBuilder {
    MockBroker::builder()
        .with_holding(Holding::new(btc(), usd(), 0.125, 24_000.0))
        .with_holding(Holding::new(eth(), usd(), 3.5, 2_000.0))
}

fn opts(cycle: u64) -> CycleOptions {
    CycleOptions {
        dry_run: false,
        cycle,
    }
}

#[derive(Default)]
struct RecordingSleeper {
    slept: Vec<Duration>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.slept.push(duration);
    }
}

// ============================================================================
// Mock broker
// ============================================================================

#[test]
fn drifted_portfolio_submits_sell_then_buy() {
    let broker = drifted().build();
    let report = run_cycle(&ctx(), &broker, &broker, &mut AuditLog::sink(), &opts(1)).unwrap();

    assert_eq!(report.submitted, 2);
    assert_eq!(report.filled, 2);
    assert_eq!(report.failed, 0);

    let submitted = broker.submitted();
    assert_eq!(submitted[0].symbol, eth());
    assert_eq!(submitted[0].side, Side::Sell);
    assert_eq!(submitted[0].quote_amount, 2_000.0);
    assert_eq!(submitted[1].symbol, btc());
    assert_eq!(submitted[1].side, Side::Buy);
    assert_eq!(submitted[1].quote_amount, 2_000.0);
}

#[test]
fn balanced_portfolio_submits_nothing() {
    let broker = MockBroker::builder()
        .with_holding(Holding::new(btc(), usd(), 0.25, 20_000.0))
        .with_holding(Holding::new(eth(), usd(), 2.5, 2_000.0))
        .build();
    let report = run_cycle(&ctx(), &broker, &broker, &mut AuditLog::sink(), &opts(1)).unwrap();
    assert!(report.is_noop());
    assert!(broker.submitted().is_empty());
}

#[test]
fn data_unavailable_submits_nothing() {
    let broker = drifted().unavailable().build();
    let result = run_cycle(&ctx(), &broker, &broker, &mut AuditLog::sink(), &opts(1));
    assert!(matches!(result, Err(Error::DataUnavailable(_))));
    assert!(broker.submitted().is_empty());
}

#[test]
fn zero_total_is_empty_portfolio() {
    let broker = MockBroker::builder().with_total_value(0.0).build();
    let result = run_cycle(&ctx(), &broker, &broker, &mut AuditLog::sink(), &opts(1));
    assert!(matches!(result, Err(Error::EmptyPortfolio)));
    assert!(broker.submitted().is_empty());
}

#[test]
fn dry_run_computes_but_does_not_submit() {
    let broker = drifted().build();
    let options = CycleOptions {
        dry_run: true,
        cycle: 1,
    };
    let report = run_cycle(&ctx(), &broker, &broker, &mut AuditLog::sink(), &options).unwrap();
    assert_eq!(report.trades.len(), 2);
    assert_eq!(report.submitted, 0);
    assert!(broker.submitted().is_empty());
}

#[test]
fn rejections_are_counted_not_retried() {
    let broker = drifted().fill_mode(FillMode::Reject).build();
    let report = run_cycle(&ctx(), &broker, &broker, &mut AuditLog::sink(), &opts(1)).unwrap();
    assert_eq!(report.submitted, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(broker.submitted().len(), 2);
}

#[test]
fn submission_errors_are_counted_not_retried() {
    let broker = drifted().fill_mode(FillMode::Error).build();
    let report = run_cycle(&ctx(), &broker, &broker, &mut AuditLog::sink(), &opts(1)).unwrap();
    assert_eq!(report.failed, 2);
    assert!(report.results.is_empty());
    assert_eq!(broker.submitted().len(), 2);
}

#[test]
fn partial_fills_are_reported() {
    let broker = drifted().fill_mode(FillMode::ImmediatePartial(0.5)).build();
    let report = run_cycle(&ctx(), &broker, &broker, &mut AuditLog::sink(), &opts(1)).unwrap();
    assert_eq!(report.partial, 2);
    assert_eq!(report.results[0].filled_quote, 1_000.0);
}

#[test]
fn too_many_orders_aborts_before_submitting() {
    let broker = drifted().build();
    let mut context = ctx();
    context.max_orders_per_cycle = 1;
    let result = run_cycle(&context, &broker, &broker, &mut AuditLog::sink(), &opts(1));
    assert!(matches!(result, Err(Error::Aborted(_))));
    assert!(broker.submitted().is_empty());
}

#[test]
fn declined_approval_aborts() {
    let broker = drifted().build();
    let result = run_cycle_with(
        &ctx(),
        &broker,
        &broker,
        &mut AuditLog::sink(),
        &opts(1),
        |snapshot, trades| {
            assert_eq!(snapshot.total_value, 10_000.0);
            assert_eq!(trades[0].side, Side::Sell);
            Ok(false)
        },
    );
    assert!(matches!(result, Err(Error::Aborted(_))));
    assert!(broker.submitted().is_empty());
}

#[test]
fn audit_trail_records_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let broker = drifted().build();
    {
        let mut audit = AuditLog::open(&path).unwrap();
        run_cycle(&ctx(), &broker, &broker, &mut audit, &opts(7)).unwrap();
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    let events: Vec<String> = contents
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["event"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        events,
        vec![
            "cycle_started",
            "snapshot_fetched",
            "trades_computed",
            "order_result",
            "order_result",
            "cycle_completed",
            "drift",
        ]
    );
    assert!(contents.lines().next().unwrap().contains("\"cycle\":7"));
}

#[test]
fn post_trade_snapshot_feeds_drift() {
    let broker = drifted().build();
    let report = run_cycle(&ctx(), &broker, &broker, &mut AuditLog::sink(), &opts(1)).unwrap();
    assert_eq!(broker.snapshot_reads(), 2);
    assert!(report.drift.is_some());
}

// ============================================================================
// Paper broker
// ============================================================================

fn audit_lines(path: &std::path::Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn approved_cycle_records_confirmation_and_drift() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let context = ctx();
    let broker = paper(FeeModel::zero());
    {
        let mut audit = AuditLog::open(&path).unwrap();
        let report =
            run_cycle_with(&context, &broker, &broker, &mut audit, &opts(1), |_, _| Ok(true))
                .unwrap();
        let drift = report.drift.unwrap();
        assert!(drift.tracking_error_pct < 1e-6);
    }

    let lines = audit_lines(&path);
    let events: Vec<&str> = lines.iter().map(|v| v["event"].as_str().unwrap()).collect();
    assert_eq!(
        events,
        vec![
            "cycle_started",
            "snapshot_fetched",
            "trades_computed",
            "user_confirmed",
            "order_result",
            "order_result",
            "cycle_completed",
            "drift",
        ]
    );

    assert_eq!(lines[3]["approved"], true);
    let drift = &lines[7];
    assert!(drift["tracking_error_pct"].as_f64().unwrap() < 1e-6);
    let entries = drift["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["symbol"], "BTC");
    assert_eq!(entries[0]["target_weight"], 0.5);
}

#[test]
fn mixed_quotes_converge_in_paper_account() {
    let usdt = Symbol::new("USDT");
    let mut context = ctx();
    context.spec = PortfolioSpec::new(vec![
        AssetAllocation::new(btc(), usdt, 0.5),
        AssetAllocation::new(eth(), usd(), 0.5),
    ])
    .unwrap();
    let broker = PaperBroker::new(usd(), 10_000.0, FeeModel::zero());
    broker.set_price(btc(), 20_000.0);
    broker.set_price(eth(), 2_000.0);

    let report = run_cycle(&context, &broker, &broker, &mut AuditLog::sink(), &opts(1)).unwrap();
    assert_eq!(report.submitted, 2);
    assert_eq!(report.filled, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(broker.quantity(btc()), 0.25);
    assert_eq!(broker.quantity(eth()), 2.5);

    let again = run_cycle(&context, &broker, &broker, &mut AuditLog::sink(), &opts(2)).unwrap();
    assert!(again.is_noop());
}

fn paper(fees: FeeModel) -> PaperBroker {
    let snapshot = drifted().build().get_snapshot().unwrap();
    PaperBroker::from_snapshot(usd(), &snapshot, fees)
}

#[test]
fn paper_account_converges_and_stays_put() {
    let context = ctx();
    let broker = paper(FeeModel::zero());

    let first = run_cycle(&context, &broker, &broker, &mut AuditLog::sink(), &opts(1)).unwrap();
    assert_eq!(first.filled, 2);

    let after = broker.get_snapshot().unwrap();
    let drift = drift_report(&context.spec, &after).unwrap();
    assert!(drift.max_abs_deviation() < 1e-6);

    let second = run_cycle(&context, &broker, &broker, &mut AuditLog::sink(), &opts(2)).unwrap();
    assert!(second.is_noop());
}

#[test]
fn fees_leave_final_buy_partial() {
    let fees = FeeModel {
        fee_bps: 10,
        slippage_bps: 0,
        min_fee: 0.0,
    };
    let broker = paper(fees);
    let report = run_cycle(&ctx(), &broker, &broker, &mut AuditLog::sink(), &opts(1)).unwrap();

    assert_eq!(report.filled, 1);
    assert_eq!(report.partial, 1);
    assert!(report.fees_paid > 3.9 && report.fees_paid < 4.0);
    assert!(broker.cash() >= 0.0);
}

#[test]
fn scheduled_cycles_follow_price_moves() {
    let context = ctx();
    let broker = paper(FeeModel::zero());
    let scheduler = Scheduler::new(Duration::from_secs(86_400));
    let mut sleeper = RecordingSleeper::default();
    let mut trades_per_cycle = Vec::new();

    let summary = scheduler
        .run(Some(3), &mut sleeper, |n| {
            if n == 3 {
                broker.set_price(btc(), 48_000.0);
            }
            let report = run_cycle(&context, &broker, &broker, &mut AuditLog::sink(), &opts(n))?;
            trades_per_cycle.push(report.trades.len());
            Ok(report)
        })
        .unwrap();

    assert_eq!(summary.completed, 3);
    assert_eq!(trades_per_cycle, vec![2, 0, 2]);
    assert_eq!(sleeper.slept.len(), 2);

    let drift = drift_report(&context.spec, &broker.get_snapshot().unwrap()).unwrap();
    assert!(drift.max_abs_deviation() < 1e-6);
}

#[test]
fn context_from_config() {
    let config = Config::from_toml(
        r#"
[portfolio]
tolerance = 0.05

[[portfolio.assets]]
symbol = "BTC"
weight = 0.5

[[portfolio.assets]]
symbol = "ETH"
weight = 0.5

[execution]
order_interval_ms = 0
"#,
    )
    .unwrap();
    let context = CycleContext::from_config(&config).unwrap();
    assert_eq!(context.order_interval, Duration::ZERO);
    assert_eq!(context.rebalancer.policy().tolerance, 0.05);

    let broker = drifted().build();
    let report = run_cycle(&context, &broker, &broker, &mut AuditLog::sink(), &opts(1)).unwrap();
    assert_eq!(report.submitted, 2);
}
