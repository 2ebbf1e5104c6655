use crate::{
    error::EngineError,
    strategy::signal::{SignalEvent, SignalUrgency},
};
use bourse_data::Tick;
use bourse_execution::{FillEvent, OrderEvent, OrderId};
use bourse_instrument::{Sequence, Side, SignalKind, Symbol};
use fnv::FnvHashMap;
use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use self::trade::{Trade, TradeId};

/// [`Trade`]: a single directional exposure with FIFO lot accounting.
pub mod trade;

/// Per-symbol risk configuration a [`Position`] enforces on itself.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct PositionConfig {
    /// Fraction of equity this position targets when a signal carries no explicit strength.
    pub pct_portfolio: Decimal,
    /// Rebalance period in strategy-frequency bars. Zero disables rebalancing.
    pub rebalance: u64,
    /// Drawdown fraction that forces the position flat. Zero disables the hard stop.
    pub hard_stop: Decimal,
}

/// A security position associated with one symbol.
///
/// Owns the [`Trade`]s that realise the exposure. At most one trade is open at a time; a
/// second trade exists only transiently while a direction reversal is working. The position
/// stages advisory signals in a three-slot urgency buffer and translates the most urgent one
/// into orders against the current exposure.
#[derive(Debug, Clone)]
pub struct Position {
    symbol: Symbol,
    pct_portfolio: Decimal,
    rebalance: u64,
    hard_stop: Decimal,
    tick: Option<Tick>,
    open_trade: Option<TradeId>,
    trades: IndexMap<TradeId, Trade>,
    trade_mapper: FnvHashMap<OrderId, TradeId>,
    signals: [Option<SignalEvent>; 3],
    trade_seq: Sequence,
}

impl Position {
    pub fn new(symbol: Symbol, config: PositionConfig) -> Self {
        Self {
            symbol,
            pct_portfolio: config.pct_portfolio,
            rebalance: config.rebalance,
            hard_stop: config.hard_stop,
            tick: None,
            open_trade: None,
            trades: IndexMap::new(),
            trade_mapper: FnvHashMap::default(),
            signals: [None, None, None],
            trade_seq: Sequence::default(),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn tick(&self) -> Option<&Tick> {
        self.tick.as_ref()
    }

    /// Current stance of the position: `Long`, `Short`, or `Exit` when flat.
    pub fn position(&self) -> SignalKind {
        SignalKind::from_sign(self.quantity())
    }

    pub fn has_position(&self) -> bool {
        !self.trades.is_empty()
    }

    pub fn has_open_orders(&self) -> bool {
        self.open_quantity() != 0
    }

    pub fn has_long(&self) -> bool {
        self.position() == SignalKind::Long
    }

    pub fn has_short(&self) -> bool {
        self.position() == SignalKind::Short
    }

    /// Bars the open trade has observed, zero when no trade is open.
    pub fn t(&self) -> u64 {
        self.open_trade
            .and_then(|id| self.trades.get(&id))
            .map(Trade::t)
            .unwrap_or(0)
    }

    /// Signed net held quantity across trades.
    pub fn quantity(&self) -> i64 {
        self.trades
            .values()
            .map(|trade| trade.side().sign() * trade.quantity())
            .sum()
    }

    /// Total pending quantity across trades, as a magnitude.
    pub fn open_quantity(&self) -> i64 {
        self.trades
            .values()
            .map(|trade| trade.open_quantity().abs())
            .sum()
    }

    /// Signed held-plus-pending exposure of the open trade.
    pub fn total_quantity(&self) -> i64 {
        self.open_trade
            .and_then(|id| self.trades.get(&id))
            .map(|trade| trade.side().sign() * trade.total_quantity())
            .unwrap_or(0)
    }

    pub fn cost(&self) -> Decimal {
        self.trades.values().map(Trade::cost).sum()
    }

    pub fn max_cost(&self) -> Decimal {
        self.trades.values().map(Trade::max_cost).sum()
    }

    /// Current market value of the position.
    pub fn mv(&self) -> Decimal {
        self.trades.values().map(Trade::mv).sum()
    }

    pub fn profit(&self) -> Decimal {
        self.trades.values().map(Trade::profit).sum()
    }

    pub fn max_profit(&self) -> Decimal {
        self.trades.values().map(Trade::max_profit).sum()
    }

    /// Average per-share cost of the held quantity, commission included.
    pub fn cost_basis(&self) -> Decimal {
        let quantity = self.quantity();
        if quantity == 0 {
            Decimal::ZERO
        } else {
            self.cost() / Decimal::from(quantity)
        }
    }

    /// Position return on peak committed capital.
    pub fn r(&self) -> f64 {
        let max_cost = self.max_cost();
        if max_cost.is_zero() {
            f64::NEG_INFINITY
        } else {
            (self.profit() / max_cost)
                .to_f64()
                .unwrap_or(f64::NEG_INFINITY)
        }
    }

    /// Give-back from the profit high-watermark, zero while profit is zero.
    pub fn drawdown(&self) -> Decimal {
        let profit = self.profit();
        self.max_profit()
            .checked_div(profit)
            .map(|ratio| ratio - Decimal::ONE)
            .unwrap_or(Decimal::ZERO)
    }

    /// Observe a new strategy-frequency bar, forwarding the mark to every trade.
    pub fn update_data(&mut self, tick: Tick) {
        for trade in self.trades.values_mut() {
            trade.on_market(tick);
        }
        self.tick = Some(tick);
    }

    /// Stage a signal at the provided urgency. `Exit` signals always carry zero strength; any
    /// other kind defaults to the position's `pct_portfolio`.
    pub fn generate_signal(
        &mut self,
        kind: SignalKind,
        urgency: SignalUrgency,
        strength: Option<Decimal>,
    ) {
        let strength = if kind == SignalKind::Exit {
            Decimal::ZERO
        } else {
            strength.unwrap_or(self.pct_portfolio)
        };

        self.signals[urgency as usize] =
            Some(SignalEvent::pct(self.symbol.clone(), kind, strength));
    }

    /// Run the position's own indicators on the freshly observed bar.
    pub fn calculate_signals(&mut self) {
        if self.has_position() {
            self.check_hard_stop();
            self.check_rebalance();
        }
    }

    /// Max position drawdown hard stop indicator.
    fn check_hard_stop(&mut self) {
        if self.hard_stop.is_zero() {
            return;
        }

        if self.drawdown() >= self.hard_stop {
            debug!(symbol = %self.symbol, drawdown = %self.drawdown(), "hard stop triggered");
            self.generate_signal(SignalKind::Exit, SignalUrgency::HardStop, None);
        }
    }

    /// Fixed-period rebalancing indicator.
    fn check_rebalance(&mut self) {
        if self.rebalance == 0 {
            return;
        }

        if self.t() % self.rebalance == 0 {
            self.generate_signal(self.position(), SignalUrgency::Rebalance, None);
        }
    }

    /// Translate the most urgent staged signal into orders against the current exposure.
    ///
    /// A flat position gets one order for the full target; a same-direction signal trades only
    /// the difference; an opposing signal produces a closing order for the whole exposure
    /// followed by an opening order in the new direction. The signal buffer is cleared
    /// afterwards either way.
    pub fn generate_orders(
        &mut self,
        equity: Decimal,
        ids: &mut Sequence,
    ) -> Vec<(OrderEvent, SignalUrgency)> {
        let mut quantities = Vec::new();

        let selected = SignalUrgency::ALL
            .into_iter()
            .find_map(|urgency| Some((urgency, self.signals[urgency as usize].as_ref()?)));

        if let (Some((urgency, signal)), Some(tick)) = (selected, &self.tick) {
            let target = signal.target_qty(tick.close, equity);
            let current = self.total_quantity();

            if current == 0 {
                quantities.push(target);
            } else if target.signum() == current.signum() {
                quantities.push(target - current);
            } else {
                quantities.push(-current);
                quantities.push(target);
            }

            let orders = quantities
                .into_iter()
                .filter(|quantity| *quantity != 0)
                .map(|quantity| {
                    let side = if quantity > 0 { Side::Buy } else { Side::Sell };
                    (
                        OrderEvent::market(
                            OrderId(ids.next_id()),
                            self.symbol.clone(),
                            quantity.abs(),
                            side,
                        ),
                        urgency,
                    )
                })
                .collect();

            self.signals = [None, None, None];
            return orders;
        }

        self.signals = [None, None, None];
        Vec::new()
    }

    /// Attach a submitted order to the open trade, or open a new trade with it.
    ///
    /// If the order offsets the open trade's whole exposure the trade starts closing and stops
    /// being the open trade, so a subsequent order opens a fresh trade in the new direction.
    pub fn confirm_order(&mut self, order: &OrderEvent) -> Result<(), EngineError> {
        let trade_id = match self
            .open_trade
            .and_then(|id| self.trades.get_mut(&id).map(|trade| (id, trade)))
        {
            Some((id, trade)) => {
                trade.on_order(order.id, order.quantity, order.side);
                if trade.is_closing() {
                    self.open_trade = None;
                }
                id
            }
            None => {
                let tick = self
                    .tick
                    .ok_or_else(|| EngineError::NoMarketData(self.symbol.clone()))?;

                let id = TradeId(self.trade_seq.next_id());
                let trade = Trade::open(id, order.id, order.quantity, order.side, tick);
                self.trades.insert(id, trade);
                self.open_trade = Some(id);
                id
            }
        };

        self.trade_mapper.insert(order.id, trade_id);
        Ok(())
    }

    /// Route a fill to its trade. A trade that closes on this fill leaves the position.
    pub fn on_fill(&mut self, fill: &FillEvent) -> Result<(), EngineError> {
        let trade_id = *self
            .trade_mapper
            .get(&fill.order_id)
            .ok_or(EngineError::UnknownOrder(fill.order_id))?;

        let trade = self
            .trades
            .get_mut(&trade_id)
            .ok_or(EngineError::UnknownOrder(fill.order_id))?;

        trade.on_fill(
            fill.order_id,
            fill.quantity,
            fill.side,
            fill.fill_cost,
            fill.commission,
        )?;

        if trade.is_closed() {
            self.trades.shift_remove(&trade_id);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn open_trade_id(&self) -> Option<TradeId> {
        self.open_trade
    }

    #[cfg(test)]
    pub(crate) fn trades(&self) -> &IndexMap<TradeId, Trade> {
        &self.trades
    }

    #[cfg(test)]
    pub(crate) fn staged_signal(&self, urgency: SignalUrgency) -> Option<&SignalEvent> {
        self.signals[urgency as usize].as_ref()
    }
}
