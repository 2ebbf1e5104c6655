use crate::error::EngineError;
use bourse_data::Tick;
use bourse_execution::OrderId;
use bourse_instrument::Side;
use derive_more::{Constructor, Display, From};
use fnv::FnvHashMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Unique trade identifier, allocated by the owning position.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Deserialize,
    Serialize,
    Display,
    From,
    Constructor,
)]
pub struct TradeId(pub u64);

/// A FIFO lot of filled shares carrying their effective per-share cost, commission included.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct Lot {
    pub quantity: i64,
    pub cost_per_share: Decimal,
}

/// One directional exposure, opened by a first order and closed when fully flattened.
///
/// Quantities are magnitudes in the trade's direction: `quantity` is what is currently held,
/// `open_quantity` is what is pending from unfilled orders (negative when a closing order is
/// pending). Realized P&L is computed lot by lot as closing fills consume the FIFO
/// `share_queue`; `cost` is the remaining lot cost basis sum, with `max_cost` and `max_profit`
/// tracking the high-watermarks observed over the trade's lifetime.
#[derive(Debug, Clone)]
pub struct Trade {
    id: TradeId,
    side: Side,
    t: u64,
    open_quantity: i64,
    quantity: i64,
    realized: Decimal,
    cost: Decimal,
    max_cost: Decimal,
    max_profit: Decimal,
    orders: FnvHashMap<OrderId, i64>,
    share_queue: VecDeque<Lot>,
    tick: Tick,
}

/// Point-in-time summary of a [`Trade`], persisted for the downstream metrics layer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradeSnapshot {
    pub t: u64,
    pub position: i64,
    pub mv: Decimal,
    pub open_quantity: i64,
    pub quantity: i64,
    pub realized: Decimal,
    pub unrealized: Decimal,
    pub cost: Decimal,
    pub max_cost: Decimal,
    pub cost_basis: Decimal,
    pub profit: Decimal,
    pub max_profit: Decimal,
    pub r: f64,
    pub drawdown: Decimal,
    pub is_closed: bool,
}

impl Trade {
    /// Open a new trade from its first order. The order's side fixes the trade direction for
    /// its whole lifetime.
    pub fn open(id: TradeId, order_id: OrderId, quantity: i64, side: Side, tick: Tick) -> Self {
        let mut trade = Self {
            id,
            side,
            t: 1,
            open_quantity: 0,
            quantity: 0,
            realized: Decimal::ZERO,
            cost: Decimal::ZERO,
            max_cost: Decimal::ZERO,
            max_profit: Decimal::ZERO,
            orders: FnvHashMap::default(),
            share_queue: VecDeque::new(),
            tick,
        };
        trade.on_order(order_id, quantity, side);
        trade
    }

    pub fn id(&self) -> TradeId {
        self.id
    }

    /// Direction the trade was opened in.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Bars observed since the trade opened, the opening bar included.
    pub fn t(&self) -> u64 {
        self.t
    }

    /// Shares currently held, as a magnitude in the trade direction.
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Shares pending from unfilled orders. Negative while a closing order works.
    pub fn open_quantity(&self) -> i64 {
        self.open_quantity
    }

    /// Held plus pending shares. Zero while closing and once closed.
    pub fn total_quantity(&self) -> i64 {
        self.quantity + self.open_quantity
    }

    pub fn realized(&self) -> Decimal {
        self.realized
    }

    /// Remaining lot cost basis sum.
    pub fn cost(&self) -> Decimal {
        self.cost
    }

    pub fn max_cost(&self) -> Decimal {
        self.max_cost
    }

    pub fn max_profit(&self) -> Decimal {
        self.max_profit
    }

    pub fn tick(&self) -> &Tick {
        &self.tick
    }

    pub fn has_open_orders(&self) -> bool {
        !self.orders.is_empty()
    }

    /// A trade always opens with an order, so the opening quantity is never zero; once both
    /// held and pending quantities reach zero with no orders outstanding, the trade is closed.
    pub fn is_closed(&self) -> bool {
        self.quantity == 0 && self.open_quantity == 0 && self.orders.is_empty()
    }

    /// True while a pending closing order offsets the whole held quantity.
    pub fn is_closing(&self) -> bool {
        self.total_quantity() == 0 && !self.orders.is_empty()
    }

    /// Average per-share cost of the held shares, commission included.
    pub fn cost_basis(&self) -> Decimal {
        if self.quantity == 0 {
            Decimal::ZERO
        } else {
            self.cost / Decimal::from(self.quantity)
        }
    }

    /// Signed market value of the held shares at the last observed close.
    pub fn mv(&self) -> Decimal {
        Decimal::from(self.side.sign() * self.quantity) * self.tick.close
    }

    pub fn unrealized(&self) -> Decimal {
        Decimal::from(self.side.sign() * self.quantity) * (self.tick.close - self.cost_basis())
    }

    pub fn profit(&self) -> Decimal {
        self.realized + self.unrealized()
    }

    /// Return on the peak capital committed. Negative infinity before anything filled.
    pub fn r(&self) -> f64 {
        if self.max_cost.is_zero() {
            f64::NEG_INFINITY
        } else {
            (self.profit() / self.max_cost)
                .to_f64()
                .unwrap_or(f64::NEG_INFINITY)
        }
    }

    /// Give-back from the profit high-watermark, zero while profit is zero.
    pub fn drawdown(&self) -> Decimal {
        let profit = self.profit();
        self.max_profit
            .checked_div(profit)
            .map(|ratio| ratio - Decimal::ONE)
            .unwrap_or(Decimal::ZERO)
    }

    /// Observe a new bar: refresh the mark and the profit high-watermark.
    pub fn on_market(&mut self, tick: Tick) {
        self.tick = tick;
        self.t += 1;
        self.max_profit = self.max_profit.max(self.profit());
    }

    /// Register a pending order against this trade. An order in the trade direction raises the
    /// pending quantity; a closing order reduces it toward (or below) zero.
    pub fn on_order(&mut self, order_id: OrderId, quantity: i64, side: Side) {
        self.open_quantity += self.side.sign() * side.sign() * quantity;
        self.orders.insert(order_id, quantity);
    }

    /// Apply a fill to this trade's FIFO lot book.
    ///
    /// Opening fills append a lot at the commission-loaded per-share cost. Closing fills
    /// consume lots head-first, realizing P&L per consumed lot. A fill with no matching
    /// pending order, or closing more shares than are held, is an accounting-integrity
    /// failure.
    pub fn on_fill(
        &mut self,
        order_id: OrderId,
        quantity: i64,
        side: Side,
        cost_per_share: Decimal,
        commission: Decimal,
    ) -> Result<(), EngineError> {
        if quantity <= 0 {
            return Ok(());
        }

        let mut need_fill = quantity;
        let sign = Decimal::from(self.side.sign());
        let commission_per_share = commission / Decimal::from(quantity);

        if side == self.side {
            // Opening more: load the commission into the lot's cost basis.
            let lot_cost = cost_per_share + sign * commission_per_share;

            while need_fill > 0 {
                let pending = self
                    .orders
                    .get_mut(&order_id)
                    .ok_or(EngineError::OverFilling("no matching order"))?;

                let take = (*pending).min(need_fill);
                *pending -= take;
                need_fill -= take;
                self.open_quantity -= take;
                self.quantity += take;

                if *pending == 0 {
                    self.orders.remove(&order_id);
                }
            }

            self.cost += Decimal::from(quantity) * lot_cost;
            self.max_cost = self.max_cost.max(self.cost);
            self.share_queue.push_back(Lot {
                quantity,
                cost_per_share: lot_cost,
            });
        } else {
            // Closing: commission reduces the effective realization price.
            let realization = cost_per_share - sign * commission_per_share;

            while need_fill > 0 {
                let pending = self
                    .orders
                    .get_mut(&order_id)
                    .ok_or(EngineError::OverFilling("no matching order"))?;

                let mut lot = self
                    .share_queue
                    .pop_front()
                    .ok_or(EngineError::OverFilling("no more shares to be closed"))?;

                let take = lot.quantity.min(need_fill);
                lot.quantity -= take;
                *pending -= take;
                need_fill -= take;

                self.cost -= Decimal::from(take) * lot.cost_per_share;
                self.realized += sign * Decimal::from(take) * (realization - lot.cost_per_share);
                self.open_quantity += take;
                self.quantity -= take;

                if lot.quantity != 0 {
                    self.share_queue.push_front(lot);
                }
                if self.orders.get(&order_id) == Some(&0) {
                    self.orders.remove(&order_id);
                }
            }
        }

        Ok(())
    }

    /// Serializable summary of the trade's current state.
    pub fn snapshot(&self) -> TradeSnapshot {
        TradeSnapshot {
            t: self.t,
            position: self.side.sign(),
            mv: self.mv(),
            open_quantity: self.open_quantity,
            quantity: self.quantity,
            realized: self.realized,
            unrealized: self.unrealized(),
            cost: self.cost,
            max_cost: self.max_cost,
            cost_basis: self.cost_basis(),
            profit: self.profit(),
            max_profit: self.max_profit,
            r: self.r(),
            drawdown: self.drawdown(),
            is_closed: self.is_closed(),
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_order(&self, order_id: OrderId) -> Option<i64> {
        self.orders.get(&order_id).copied()
    }

    #[cfg(test)]
    pub(crate) fn lots(&self) -> usize {
        self.share_queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    fn tick(day: u32, price: Decimal) -> Tick {
        Tick::new(
            format!("2021-03-{day:02}T15:00:00Z").parse().unwrap(),
            price,
            price,
            price,
            price,
            1_000,
        )
    }

    fn assert_dec_close(actual: Decimal, expected: f64) {
        assert_relative_eq!(actual.to_f64().unwrap(), expected, max_relative = 1e-9);
    }

    #[test]
    fn test_open_long_trade_initial_state() {
        let trade = Trade::open(TradeId(1), OrderId(1), 30, Side::Buy, tick(1, dec!(10)));

        assert_eq!(trade.t(), 1);
        assert!(trade.has_open_orders());
        assert_eq!(trade.pending_order(OrderId(1)), Some(30));
        assert_eq!(trade.lots(), 0);
        assert_eq!(trade.side(), Side::Buy);
        assert_eq!(trade.total_quantity(), 30);
        assert_eq!(trade.open_quantity(), 30);
        assert_eq!(trade.quantity(), 0);
        assert_eq!(trade.max_profit(), Decimal::ZERO);
        assert_eq!(trade.max_cost(), Decimal::ZERO);
        assert_eq!(trade.mv(), Decimal::ZERO);
        assert_eq!(trade.cost(), Decimal::ZERO);
        assert_eq!(trade.cost_basis(), Decimal::ZERO);
        assert_eq!(trade.unrealized(), Decimal::ZERO);
        assert_eq!(trade.realized(), Decimal::ZERO);
        assert_eq!(trade.r(), f64::NEG_INFINITY);
        assert_eq!(trade.drawdown(), Decimal::ZERO);
        assert!(!trade.is_closed());
        assert!(!trade.is_closing());
    }

    #[test]
    fn test_fill_without_matching_order_is_over_filling() {
        let mut trade = Trade::open(TradeId(1), OrderId(1), 30, Side::Buy, tick(1, dec!(10)));

        // Unknown order id fails in both the opening and the closing branch.
        assert_eq!(
            trade.on_fill(OrderId(9), 10, Side::Buy, dec!(10.03), dec!(1)),
            Err(EngineError::OverFilling("no matching order"))
        );
        assert_eq!(
            trade.on_fill(OrderId(9), 10, Side::Sell, dec!(10.03), dec!(1)),
            Err(EngineError::OverFilling("no matching order"))
        );
    }

    #[test]
    fn test_closing_more_than_held_is_over_filling() {
        let mut trade = Trade::open(TradeId(1), OrderId(1), 30, Side::Buy, tick(1, dec!(10)));
        trade
            .on_fill(OrderId(1), 10, Side::Buy, dec!(10), dec!(0))
            .unwrap();

        trade.on_order(OrderId(2), 20, Side::Sell);
        assert_eq!(
            trade.on_fill(OrderId(2), 20, Side::Sell, dec!(10), dec!(0)),
            Err(EngineError::OverFilling("no more shares to be closed"))
        );
    }

    #[test]
    fn test_long_trade_full_lifecycle() {
        let mut trade = Trade::open(TradeId(1), OrderId(1), 30, Side::Buy, tick(1, dec!(10)));

        // Three partial opening fills of 10 shares each, commission 1 per fill.
        trade
            .on_fill(OrderId(1), 10, Side::Buy, dec!(10.03), dec!(1))
            .unwrap();
        assert_eq!(trade.pending_order(OrderId(1)), Some(20));
        assert_eq!(trade.open_quantity(), 20);
        assert_eq!(trade.quantity(), 10);
        assert_eq!(trade.cost(), dec!(101.3));
        assert_eq!(trade.max_cost(), dec!(101.3));
        assert_eq!(trade.realized(), Decimal::ZERO);
        assert_eq!(trade.unrealized(), dec!(-1.3));
        assert_relative_eq!(trade.r(), -1.3 / 101.3, max_relative = 1e-9);
        assert_eq!(trade.lots(), 1);

        trade
            .on_fill(OrderId(1), 10, Side::Buy, dec!(10.05), dec!(1))
            .unwrap();
        assert_eq!(trade.pending_order(OrderId(1)), Some(10));
        assert_eq!(trade.quantity(), 20);
        assert_eq!(trade.cost(), dec!(202.8));
        assert_eq!(trade.unrealized(), dec!(-2.8));
        assert_eq!(trade.lots(), 2);

        trade
            .on_fill(OrderId(1), 10, Side::Buy, dec!(10.10), dec!(1))
            .unwrap();
        assert_eq!(trade.pending_order(OrderId(1)), None);
        assert_eq!(trade.open_quantity(), 0);
        assert_eq!(trade.quantity(), 30);
        assert_eq!(trade.cost(), dec!(304.8));
        assert_eq!(trade.max_cost(), dec!(304.8));
        assert_eq!(trade.unrealized(), dec!(-4.8));
        assert_eq!(trade.lots(), 3);
        assert!(!trade.is_closed());

        // New bar at 11: mark moves, max_profit follows.
        trade.on_market(tick(2, dec!(11)));
        assert_eq!(trade.t(), 2);
        assert_eq!(trade.max_profit(), dec!(25.2));

        // Close the whole trade with one 30-share sell order, filled in three parts.
        trade.on_order(OrderId(2), 30, Side::Sell);
        assert!(trade.is_closing());
        assert_eq!(trade.open_quantity(), -30);

        trade
            .on_fill(OrderId(2), 5, Side::Sell, dec!(10.59), dec!(1))
            .unwrap();
        assert_eq!(trade.pending_order(OrderId(2)), Some(25));
        assert_eq!(trade.open_quantity(), -25);
        assert_eq!(trade.quantity(), 25);
        assert_eq!(trade.cost(), dec!(254.15));
        assert_eq!(trade.max_cost(), dec!(304.8));
        assert_eq!(trade.realized(), dec!(1.3));
        assert_eq!(trade.unrealized(), dec!(20.85));
        assert_relative_eq!(trade.r(), (20.85 + 1.3) / 304.8, max_relative = 1e-9);
        assert_eq!(trade.lots(), 3);

        trade
            .on_fill(OrderId(2), 15, Side::Sell, dec!(10.58), dec!(1))
            .unwrap();
        assert_eq!(trade.pending_order(OrderId(2)), Some(10));
        assert_eq!(trade.open_quantity(), -10);
        assert_eq!(trade.quantity(), 10);
        assert_eq!(trade.cost(), dec!(102));
        assert_dec_close(trade.realized(), 6.85);
        assert_eq!(trade.unrealized(), dec!(8));
        assert_relative_eq!(trade.r(), (8.0 + 6.85) / 304.8, max_relative = 1e-9);
        assert_eq!(trade.lots(), 1);

        trade
            .on_fill(OrderId(2), 10, Side::Sell, dec!(10.58), dec!(1))
            .unwrap();
        assert_eq!(trade.pending_order(OrderId(2)), None);
        assert_eq!(trade.open_quantity(), 0);
        assert_eq!(trade.quantity(), 0);
        assert_eq!(trade.lots(), 0);
        assert!(trade.is_closed());
        assert_eq!(trade.unrealized(), Decimal::ZERO);
        assert_dec_close(trade.realized(), 6.85 + 2.8);
        assert_dec_close(trade.profit(), trade.realized().to_f64().unwrap());
    }

    #[test]
    fn test_short_trade_full_lifecycle() {
        let mut trade = Trade::open(TradeId(1), OrderId(1), 30, Side::Sell, tick(1, dec!(10)));
        assert_eq!(trade.side(), Side::Sell);
        assert_eq!(trade.total_quantity(), 30);

        // Short sale proceeds are reduced by commission: lot cost 9.97 - 0.1 = 9.87.
        trade
            .on_fill(OrderId(1), 10, Side::Sell, dec!(9.97), dec!(1))
            .unwrap();
        assert_eq!(trade.quantity(), 10);
        assert_eq!(trade.cost(), dec!(98.7));
        assert_eq!(trade.unrealized(), dec!(-1.3));
        assert_relative_eq!(trade.r(), -1.3 / 98.7, max_relative = 1e-9);

        trade
            .on_fill(OrderId(1), 10, Side::Sell, dec!(9.95), dec!(1))
            .unwrap();
        assert_eq!(trade.cost(), dec!(197.2));
        assert_eq!(trade.unrealized(), dec!(-2.8));

        trade
            .on_fill(OrderId(1), 10, Side::Sell, dec!(9.9), dec!(1))
            .unwrap();
        assert_eq!(trade.pending_order(OrderId(1)), None);
        assert_eq!(trade.quantity(), 30);
        assert_eq!(trade.cost(), dec!(295.2));
        assert_eq!(trade.unrealized(), dec!(-4.8));
        assert_eq!(trade.lots(), 3);

        trade.on_market(tick(2, dec!(11)));
        assert_eq!(trade.t(), 2);

        // Buying back above the sale price realizes a loss.
        trade.on_order(OrderId(2), 30, Side::Buy);
        assert!(trade.is_closing());

        trade
            .on_fill(OrderId(2), 5, Side::Buy, dec!(10.59), dec!(1))
            .unwrap();
        assert_eq!(trade.open_quantity(), -25);
        assert_eq!(trade.quantity(), 25);
        assert_eq!(trade.cost(), dec!(245.85));
        assert_eq!(trade.max_cost(), dec!(295.2));
        assert_eq!(trade.realized(), dec!(-4.6));
        assert_eq!(trade.unrealized(), dec!(-29.15));
        assert_relative_eq!(trade.r(), (-29.15 - 4.6) / 295.2, max_relative = 1e-9);

        trade
            .on_fill(OrderId(2), 15, Side::Buy, dec!(10.58), dec!(1))
            .unwrap();
        assert_eq!(trade.quantity(), 10);
        assert_eq!(trade.cost(), dec!(98));
        assert_dec_close(trade.realized(), -16.45);
        assert_eq!(trade.unrealized(), dec!(-12));
        assert_eq!(trade.lots(), 1);

        trade
            .on_fill(OrderId(2), 10, Side::Buy, dec!(10.58), dec!(1))
            .unwrap();
        assert_eq!(trade.quantity(), 0);
        assert_eq!(trade.open_quantity(), 0);
        assert_eq!(trade.lots(), 0);
        assert!(trade.is_closed());
    }

    #[test]
    fn test_max_profit_watermark_and_drawdown() {
        let mut trade = Trade::open(TradeId(1), OrderId(1), 30, Side::Buy, tick(1, dec!(10)));
        trade
            .on_fill(OrderId(1), 30, Side::Buy, dec!(10), dec!(0.9))
            .unwrap();
        assert_eq!(trade.cost_basis(), dec!(10.03));

        // Price runs up: profit peaks at 30 * (10.59 - 10.03) = 16.8.
        trade.on_market(tick(2, dec!(10.59)));
        assert_eq!(trade.max_profit(), dec!(16.8));
        assert_eq!(trade.drawdown(), Decimal::ZERO);

        // Price falls back while still profitable: give-back from the peak.
        trade.on_market(tick(3, dec!(10.59)));
        trade.on_market(tick(4, dec!(10.31)));
        assert_eq!(trade.max_profit(), dec!(16.8));
        assert_eq!(trade.profit(), dec!(8.4));
        assert_eq!(trade.drawdown(), dec!(1));

        // A trade that has had no closing fills has realized exactly zero.
        assert_eq!(trade.realized(), Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_mirrors_accessors() {
        let mut trade = Trade::open(TradeId(1), OrderId(1), 30, Side::Buy, tick(1, dec!(10)));
        trade
            .on_fill(OrderId(1), 30, Side::Buy, dec!(10.03), dec!(1))
            .unwrap();

        let snapshot = trade.snapshot();
        assert_eq!(snapshot.position, 1);
        assert_eq!(snapshot.quantity, 30);
        assert_eq!(snapshot.cost, trade.cost());
        assert_eq!(snapshot.unrealized, trade.unrealized());
        assert!(!snapshot.is_closed);
    }
}
