use crate::{
    error::ExecutionError,
    fill::{FillEvent, FillId},
    order::{OrderEvent, OrderId},
    slippage::ExecutionConfig,
};
use bourse_data::MarketEvent;
use bourse_instrument::{RoutingExchange, Sequence, StrategyId, Symbol};
use fnv::FnvHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Lifecycle of an order resting in a [`SimulatedBook`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub enum FillStatus {
    Submitted,
    Filling,
    Filled,
}

/// An order working in a [`SimulatedBook`], with the fills generated for it so far.
#[derive(Debug, Clone)]
struct Filling {
    order: OrderEvent,
    fills: Vec<FillEvent>,
    open_quantity: i64,
    status: FillStatus,
}

/// Simulated order execution handler.
///
/// Each registered strategy gets its own [`SimulatedBook`], isolating the market impact of one
/// strategy's orders from every other strategy under evaluation.
#[derive(Debug, Default)]
pub struct SimulatedExecution {
    config: ExecutionConfig,
    books: FnvHashMap<StrategyId, SimulatedBook>,
}

impl SimulatedExecution {
    /// Construct a new `SimulatedExecution` handler with the provided slippage constants.
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            books: FnvHashMap::default(),
        }
    }

    /// Create an order book for a newly registered strategy. Re-registering is a no-op.
    pub fn register(&mut self, strategy: StrategyId) {
        info!(%strategy, "strategy registered with execution handler");
        self.books.entry(strategy).or_default();
    }

    /// Drop the order book of a deregistered strategy, discarding any working orders.
    pub fn deregister(&mut self, strategy: &StrategyId) {
        if self.books.remove(strategy).is_some() {
            info!(%strategy, "strategy deregistered from execution handler");
        }
    }

    /// Accept a new order into the strategy's book. It becomes eligible to fill on the next
    /// market update the book receives.
    pub fn on_order(
        &mut self,
        strategy: &StrategyId,
        order: OrderEvent,
    ) -> Result<(), ExecutionError> {
        let book = self
            .books
            .get_mut(strategy)
            .ok_or_else(|| ExecutionError::UnregisteredStrategy(strategy.clone()))?;

        debug!(%strategy, %order, "order accepted");
        book.on_order(order);
        Ok(())
    }

    /// Work the strategy's book against a new bar, returning the fills generated, in
    /// submission order.
    pub fn on_market(
        &mut self,
        strategy: &StrategyId,
        ticks: &MarketEvent,
    ) -> Result<Vec<FillEvent>, ExecutionError> {
        let book = self
            .books
            .get_mut(strategy)
            .ok_or_else(|| ExecutionError::UnregisteredStrategy(strategy.clone()))?;

        Ok(book.on_market(ticks, &self.config))
    }
}

/// Simulated order book for one strategy.
///
/// Orders queue first-in-first-out. On every bar the whole queue is offered liquidity in
/// submission order; whatever does not fill is requeued at the tail and carried to the next
/// bar. `filled_counter` accumulates the volume consumed per symbol within the current bar so
/// several orders on one symbol cannot jointly exceed the volume cap.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBook {
    orders: VecDeque<OrderId>,
    fillings: IndexMap<OrderId, Filling>,
    filled_counter: FnvHashMap<Symbol, i64>,
    fill_seq: Sequence,
}

impl SimulatedBook {
    /// Number of orders still working in this book.
    pub fn open_orders(&self) -> usize {
        self.fillings.len()
    }

    fn on_order(&mut self, order: OrderEvent) {
        let id = order.id;
        self.fillings.entry(id).or_insert_with(|| Filling {
            open_quantity: order.quantity,
            order,
            fills: Vec::new(),
            status: FillStatus::Submitted,
        });
        self.orders.push_back(id);
    }

    fn on_market(&mut self, ticks: &MarketEvent, config: &ExecutionConfig) -> Vec<FillEvent> {
        let mut fills = Vec::new();

        // Offer liquidity to every queued order, in submission order.
        while let Some(id) = self.orders.pop_front() {
            if !self.fillings.contains_key(&id) {
                continue;
            }
            self.place_order(id, ticks, config, &mut fills);
        }

        // Requeue whatever is not yet complete; completed orders leave the book. Deferring the
        // requeue to here (rather than pushing during the fill pass) is what postpones the
        // unfilled remainder to the next bar.
        for (id, filling) in &self.fillings {
            if filling.status != FillStatus::Filled {
                self.orders.push_back(*id);
            }
        }
        self.fillings
            .retain(|_, filling| filling.status != FillStatus::Filled);
        self.filled_counter.clear();

        fills
    }

    fn place_order(
        &mut self,
        id: OrderId,
        ticks: &MarketEvent,
        config: &ExecutionConfig,
        fills: &mut Vec<FillEvent>,
    ) {
        let Some(filling) = self.fillings.get_mut(&id) else {
            return;
        };
        filling.status = FillStatus::Filling;

        let Some(tick) = ticks.tick(&filling.order.symbol) else {
            warn!(order = %filling.order, "no tick for order symbol, deferring");
            return;
        };

        let already_filled = self
            .filled_counter
            .get(&filling.order.symbol)
            .copied()
            .unwrap_or(0);

        let (filled, fill_cost) = config.volume_share(
            tick.hlc3(),
            tick.volume,
            filling.open_quantity,
            filling.order.side,
            already_filled,
        );

        *self
            .filled_counter
            .entry(filling.order.symbol.clone())
            .or_insert(0) += filled;

        if filled > 0 {
            filling.open_quantity -= filled;
            if filling.open_quantity == 0 {
                filling.status = FillStatus::Filled;
            }

            let fill = FillEvent::ib(
                FillId(self.fill_seq.next_id()),
                id,
                filling.order.symbol.clone(),
                RoutingExchange::Smart,
                filled,
                filling.order.side,
                fill_cost,
            );

            debug!(
                fill = %fill.id,
                order = %id,
                quantity = filled,
                open = filling.open_quantity,
                "fill generated"
            );
            filling.fills.push(fill.clone());
            fills.push(fill);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bourse_instrument::Side;
    use chrono::{DateTime, TimeDelta, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn strategy() -> StrategyId {
        StrategyId::new("test-strategy")
    }

    fn market(bar_index: i64, close: Decimal, volume: i64) -> MarketEvent {
        let start: DateTime<Utc> = "2021-03-01T15:00:00Z".parse().unwrap();
        MarketEvent::new(IndexMap::from([(
            Symbol::new("AAPL"),
            bourse_data::Tick::new(
                start + TimeDelta::minutes(bar_index),
                close,
                close,
                close,
                close,
                volume,
            ),
        )]))
    }

    fn handler_with_book() -> SimulatedExecution {
        let mut handler = SimulatedExecution::new(ExecutionConfig::default());
        handler.register(strategy());
        handler
    }

    #[test]
    fn test_unregistered_strategy_is_an_error() {
        let mut handler = SimulatedExecution::new(ExecutionConfig::default());
        let order = OrderEvent::market(OrderId(1), Symbol::new("AAPL"), 100, Side::Buy);

        assert_eq!(
            handler.on_order(&strategy(), order),
            Err(ExecutionError::UnregisteredStrategy(strategy()))
        );
    }

    #[test]
    fn test_small_order_fills_in_one_bar() {
        let mut handler = handler_with_book();
        let order = OrderEvent::market(OrderId(1), Symbol::new("AAPL"), 1_000, Side::Buy);
        handler.on_order(&strategy(), order).unwrap();

        let fills = handler
            .on_market(&strategy(), &market(0, dec!(10), 1_000_000))
            .unwrap();

        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].quantity, 1_000);
        assert_eq!(fills[0].order_id, OrderId(1));
        // hlc3 of a flat bar is the close; minimum impact applies.
        assert_eq!(fills[0].fill_cost, dec!(10.003));

        // Fully filled orders leave the book.
        let fills = handler
            .on_market(&strategy(), &market(1, dec!(10), 1_000_000))
            .unwrap();
        assert!(fills.is_empty());
    }

    #[test]
    fn test_large_order_splits_across_bars() {
        let mut handler = handler_with_book();
        let order = OrderEvent::market(OrderId(1), Symbol::new("AAPL"), 100_000, Side::Buy);
        handler.on_order(&strategy(), order).unwrap();

        // 2.5% of 1m shares = 25k per bar, so four bars drain the order.
        for bar in 0..4 {
            let fills = handler
                .on_market(&strategy(), &market(bar, dec!(10), 1_000_000))
                .unwrap();
            assert_eq!(fills.len(), 1, "bar {bar}");
            assert_eq!(fills[0].quantity, 25_000, "bar {bar}");
        }

        let fills = handler
            .on_market(&strategy(), &market(4, dec!(10), 1_000_000))
            .unwrap();
        assert!(fills.is_empty());
    }

    #[test]
    fn test_same_symbol_orders_share_the_volume_cap() {
        let mut handler = handler_with_book();
        handler
            .on_order(
                &strategy(),
                OrderEvent::market(OrderId(1), Symbol::new("AAPL"), 20_000, Side::Buy),
            )
            .unwrap();
        handler
            .on_order(
                &strategy(),
                OrderEvent::market(OrderId(2), Symbol::new("AAPL"), 10_000, Side::Buy),
            )
            .unwrap();

        let fills = handler
            .on_market(&strategy(), &market(0, dec!(10), 1_000_000))
            .unwrap();

        // First order takes 20k, leaving 5k of the 25k cap for the second.
        assert_eq!(fills.len(), 2);
        assert_eq!((fills[0].order_id, fills[0].quantity), (OrderId(1), 20_000));
        assert_eq!((fills[1].order_id, fills[1].quantity), (OrderId(2), 5_000));

        // The cap resets next bar and the remainder drains.
        let fills = handler
            .on_market(&strategy(), &market(1, dec!(10), 1_000_000))
            .unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!((fills[0].order_id, fills[0].quantity), (OrderId(2), 5_000));
    }

    #[test]
    fn test_zero_volume_bar_defers_the_order() {
        let mut handler = handler_with_book();
        handler
            .on_order(
                &strategy(),
                OrderEvent::market(OrderId(1), Symbol::new("AAPL"), 100, Side::Buy),
            )
            .unwrap();

        let fills = handler
            .on_market(&strategy(), &market(0, dec!(10), 0))
            .unwrap();
        assert!(fills.is_empty());

        let fills = handler
            .on_market(&strategy(), &market(1, dec!(10), 1_000_000))
            .unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].quantity, 100);
    }

    #[test]
    fn test_deregister_discards_working_orders() {
        let mut handler = handler_with_book();
        handler
            .on_order(
                &strategy(),
                OrderEvent::market(OrderId(1), Symbol::new("AAPL"), 100, Side::Buy),
            )
            .unwrap();

        handler.deregister(&strategy());
        assert_eq!(
            handler.on_market(&strategy(), &market(0, dec!(10), 1_000_000)),
            Err(ExecutionError::UnregisteredStrategy(strategy()))
        );
    }

    #[test]
    fn test_sell_fills_below_mid() {
        let mut handler = handler_with_book();
        handler
            .on_order(
                &strategy(),
                OrderEvent::market(OrderId(1), Symbol::new("AAPL"), 1_000, Side::Sell),
            )
            .unwrap();

        let fills = handler
            .on_market(&strategy(), &market(0, dec!(10), 1_000_000))
            .unwrap();
        assert_eq!(fills[0].fill_cost, dec!(9.997));
    }
}
