//! Mock broker for testing: implements [`MarketData`] and [`Execution`] with
//! configurable behavior.
//!
//! Use this in integration tests to simulate broker responses without network calls.
//!
//! ```
//! use cryptofolio::{Holding, PortfolioSnapshot, Symbol};
//! use cryptofolio_broker::mock::{FillMode, MockBroker};
//! use cryptofolio_broker::MarketData;
//!
//! let usd = Symbol::new("USD");
//! let broker = MockBroker::builder()
//!     .fill_mode(FillMode::ImmediateFull)
//!     .with_holding(Holding::new(Symbol::new("BTC"), usd, 0.5, 40_000.0))
//!     .with_cash(5_000.0)
//!     .build();
//!
//! assert_eq!(broker.get_snapshot().unwrap().total_value, 25_000.0);
//! ```

use std::sync::Mutex;

use cryptofolio::{Holding, PortfolioSnapshot, TradeInstruction};

use crate::error::BrokerError;
use crate::types::*;
use crate::{Execution, MarketData};

/// How the mock broker handles submitted instructions.
#[derive(Clone, Debug)]
pub enum FillMode {
    /// Instructions are fully filled at the snapshot price (1.0 if unknown).
    ImmediateFull,
    /// Instructions are partially filled (the given fraction, e.g., 0.5 = 50%).
    ImmediatePartial(f64),
    /// The venue answers with a rejection result.
    Reject,
    /// `submit` itself returns an error.
    Error,
}

/// Builder for `MockBroker`.
pub struct MockBrokerBuilder {
    fill_mode: FillMode,
    holdings: Vec<Holding>,
    cash: f64,
    total_value: Option<f64>,
    unavailable: bool,
}

impl MockBrokerBuilder {
    pub fn fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    pub fn with_holding(mut self, holding: Holding) -> Self {
        self.holdings.push(holding);
        self
    }

    pub fn with_cash(mut self, cash: f64) -> Self {
        self.cash = cash;
        self
    }

    /// Report this total instead of `cash + holdings`.
    pub fn with_total_value(mut self, total_value: f64) -> Self {
        self.total_value = Some(total_value);
        self
    }

    /// Make every `get_snapshot` fail with `DataUnavailable`.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn build(self) -> MockBroker {
        let snapshot = match self.total_value {
            Some(total) => PortfolioSnapshot::new(total, self.holdings),
            None => PortfolioSnapshot::with_cash(self.cash, self.holdings),
        };
        MockBroker {
            fill_mode: self.fill_mode,
            snapshot,
            unavailable: self.unavailable,
            next_order_id: Mutex::new(1),
            submitted: Mutex::new(Vec::new()),
            snapshot_reads: Mutex::new(0),
        }
    }
}

/// A mock broker that records submitted instructions and returns configurable responses.
pub struct MockBroker {
    fill_mode: FillMode,
    snapshot: PortfolioSnapshot,
    unavailable: bool,
    next_order_id: Mutex<u64>,
    submitted: Mutex<Vec<TradeInstruction>>,
    snapshot_reads: Mutex<usize>,
}

impl MockBroker {
    pub fn builder() -> MockBrokerBuilder {
        MockBrokerBuilder {
            fill_mode: FillMode::ImmediateFull,
            holdings: Vec::new(),
            cash: 0.0,
            total_value: None,
            unavailable: false,
        }
    }

    /// All instructions passed to `submit` (for assertion in tests).
    pub fn submitted(&self) -> Vec<TradeInstruction> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// How many times `get_snapshot` was called.
    pub fn snapshot_reads(&self) -> usize {
        self.snapshot_reads.lock().map(|n| *n).unwrap_or_default()
    }

    fn next_id(&self) -> OrderId {
        let mut next = match self.next_order_id.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = OrderId(*next);
        *next += 1;
        id
    }

    fn price_of(&self, trade: &TradeInstruction) -> f64 {
        self.snapshot
            .holding(trade.symbol)
            .map(|h| h.price)
            .filter(|p| *p > 0.0)
            .unwrap_or(1.0)
    }
}

impl MarketData for MockBroker {
    fn get_snapshot(&self) -> Result<PortfolioSnapshot, BrokerError> {
        if let Ok(mut n) = self.snapshot_reads.lock() {
            *n += 1;
        }
        if self.unavailable {
            return Err(BrokerError::DataUnavailable("mock: feed offline".into()));
        }
        Ok(self.snapshot.clone())
    }
}

impl Execution for MockBroker {
    fn submit(&self, trade: &TradeInstruction) -> Result<ExecutionResult, BrokerError> {
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(trade.clone());
        }

        let id = self.next_id();
        let price = self.price_of(trade);

        let (status, fraction) = match &self.fill_mode {
            FillMode::ImmediateFull => (ExecutionStatus::Filled, 1.0),
            FillMode::ImmediatePartial(frac) => (ExecutionStatus::PartiallyFilled, *frac),
            FillMode::Reject => {
                return Ok(ExecutionResult::rejected(
                    id,
                    trade.symbol,
                    trade.side,
                    "mock: order rejected",
                ));
            }
            FillMode::Error => return Err(BrokerError::Order("mock: venue error".into())),
        };

        let filled_quote = trade.quote_amount * fraction;
        Ok(ExecutionResult {
            order_id: id,
            symbol: trade.symbol,
            side: trade.side,
            status,
            filled_quote,
            filled_quantity: filled_quote / price,
            avg_price: price,
            fee: 0.0,
            message: None,
        })
    }
}
