//! Paper trading: instructions fill instantly at the last known price against
//! in-memory cash and positions.
//!
//! Buys that exceed available cash are filled partially; sells are capped at
//! the held quantity. Fees come from a [`FeeModel`] and are taken out of cash.
//!
//! The account keeps a single cash balance. Instructions quoted in another
//! currency (a USDT pair in a USD account) settle against it 1:1.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use cryptofolio::{FeeModel, Holding, PortfolioSnapshot, Side, Symbol, TradeInstruction};
use log::debug;

use crate::error::BrokerError;
use crate::types::*;
use crate::{Execution, MarketData};

/// Fills within this relative distance of the request count as complete.
const FILL_EPSILON: f64 = 1e-9;

struct PaperState {
    cash: f64,
    positions: Vec<Holding>,
    prices: BTreeMap<Symbol, f64>,
    next_order_id: u64,
}

/// Simulated account that implements both broker traits.
pub struct PaperBroker {
    quote: Symbol,
    fees: FeeModel,
    state: Mutex<PaperState>,
}

impl PaperBroker {
    /// New account holding only `cash` in `quote`.
    pub fn new(quote: Symbol, cash: f64, fees: FeeModel) -> Self {
        Self {
            quote,
            fees,
            state: Mutex::new(PaperState {
                cash,
                positions: Vec::new(),
                prices: BTreeMap::new(),
                next_order_id: 1,
            }),
        }
    }

    /// Seed an account from a snapshot: its holdings, their prices, and the
    /// uninvested remainder as cash.
    pub fn from_snapshot(quote: Symbol, snapshot: &PortfolioSnapshot, fees: FeeModel) -> Self {
        let broker = Self::new(quote, snapshot.cash(), fees);
        {
            let mut state = broker.lock();
            for h in &snapshot.holdings {
                state.prices.insert(h.symbol, h.price);
                state.positions.push(*h);
            }
        }
        broker
    }

    /// Set (or move) the price of `symbol`.
    pub fn set_price(&self, symbol: Symbol, price: f64) {
        let mut state = self.lock();
        state.prices.insert(symbol, price);
        if let Some(h) = state.positions.iter_mut().find(|h| h.symbol == symbol) {
            h.price = price;
        }
    }

    /// Currency the cash balance is kept in.
    pub fn quote(&self) -> Symbol {
        self.quote
    }

    pub fn cash(&self) -> f64 {
        self.lock().cash
    }

    /// Held quantity of `symbol` (0 when flat).
    pub fn quantity(&self, symbol: Symbol) -> f64 {
        self.lock()
            .positions
            .iter()
            .find(|h| h.symbol == symbol)
            .map_or(0.0, |h| h.quantity)
    }

    pub fn positions(&self) -> Vec<Holding> {
        self.lock().positions.clone()
    }

    fn lock(&self) -> MutexGuard<'_, PaperState> {
        // State stays consistent between statements, so a poisoned lock is still usable
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn buy(
        &self,
        state: &mut PaperState,
        id: OrderId,
        trade: &TradeInstruction,
        price: f64,
    ) -> ExecutionResult {
        let affordable = state.cash - self.fees.fee(trade.quote_amount);
        let spend = trade.quote_amount.min(affordable);
        if spend <= 0.0 {
            return ExecutionResult::rejected(id, trade.symbol, trade.side, "insufficient cash");
        }

        let fee = self.fees.fee(spend);
        let quantity = spend / price;
        state.cash -= spend + fee;

        match state.positions.iter_mut().find(|h| h.symbol == trade.symbol) {
            Some(h) => h.quantity += quantity,
            None => state
                .positions
                .push(Holding::new(trade.symbol, trade.quote, quantity, price)),
        }

        self.filled(id, trade, spend, quantity, price, fee)
    }

    fn sell(
        &self,
        state: &mut PaperState,
        id: OrderId,
        trade: &TradeInstruction,
        price: f64,
    ) -> ExecutionResult {
        let Some(idx) = state.positions.iter().position(|h| h.symbol == trade.symbol) else {
            return ExecutionResult::rejected(id, trade.symbol, trade.side, "no position");
        };

        let held = state.positions[idx].quantity;
        let wanted = trade.quote_amount / price;
        // Full liquidations can overshoot the holding by float noise
        let quantity = if wanted >= held * (1.0 - FILL_EPSILON) {
            held
        } else {
            wanted
        };
        if quantity <= 0.0 {
            return ExecutionResult::rejected(id, trade.symbol, trade.side, "no position");
        }

        let proceeds = quantity * price;
        let fee = self.fees.fee(proceeds);
        state.cash += proceeds - fee;

        if quantity == held {
            state.positions.remove(idx);
        } else {
            state.positions[idx].quantity -= quantity;
        }

        self.filled(id, trade, proceeds, quantity, price, fee)
    }

    fn filled(
        &self,
        id: OrderId,
        trade: &TradeInstruction,
        filled_quote: f64,
        filled_quantity: f64,
        price: f64,
        fee: f64,
    ) -> ExecutionResult {
        let status = if filled_quote < trade.quote_amount * (1.0 - FILL_EPSILON) {
            ExecutionStatus::PartiallyFilled
        } else {
            ExecutionStatus::Filled
        };
        debug!(
            "paper {id}: {} {filled_quantity:.8} {} @ {price:.2} ({status}, fee {fee:.4})",
            trade.side, trade.symbol
        );
        ExecutionResult {
            order_id: id,
            symbol: trade.symbol,
            side: trade.side,
            status,
            filled_quote,
            filled_quantity,
            avg_price: price,
            fee,
            message: None,
        }
    }
}

impl MarketData for PaperBroker {
    fn get_snapshot(&self) -> Result<PortfolioSnapshot, BrokerError> {
        let state = self.lock();
        let mut holdings = Vec::with_capacity(state.positions.len());
        for h in &state.positions {
            match state.prices.get(&h.symbol) {
                Some(&price) if price > 0.0 && price.is_finite() => {
                    holdings.push(Holding { price, ..*h });
                }
                _ => {
                    return Err(BrokerError::DataUnavailable(format!(
                        "no price for {}",
                        h.symbol
                    )));
                }
            }
        }
        Ok(PortfolioSnapshot::with_cash(state.cash, holdings))
    }
}

impl Execution for PaperBroker {
    fn submit(&self, trade: &TradeInstruction) -> Result<ExecutionResult, BrokerError> {
        if trade.quote != self.quote {
            debug!(
                "paper: settling {}/{} against {} cash at 1:1",
                trade.symbol, trade.quote, self.quote
            );
        }

        let mut state = self.lock();
        let id = OrderId(state.next_order_id);
        state.next_order_id += 1;

        let price = match state.prices.get(&trade.symbol) {
            Some(&p) if p > 0.0 && p.is_finite() => p,
            _ => {
                return Ok(ExecutionResult::rejected(
                    id,
                    trade.symbol,
                    trade.side,
                    format!("no price for {}", trade.symbol),
                ));
            }
        };

        let result = match trade.side {
            Side::Buy => self.buy(&mut state, id, trade, price),
            Side::Sell => self.sell(&mut state, id, trade, price),
        };
        Ok(result)
    }
}
