use crate::order::OrderId;
use bourse_instrument::{RoutingExchange, Side, Symbol};
use derive_more::{Constructor, Display, From};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unique fill identifier, allocated by the simulated book that produced the fill.
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
pub struct FillId(pub u64);

/// Journal of work done by the execution handler: a partial or complete fill of one order.
///
/// `fill_cost` is the per-share price paid or received, already including simulated price
/// impact. `commission` is the broker fee for this fill.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct FillEvent {
    pub id: FillId,
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub exchange: RoutingExchange,
    pub quantity: i64,
    pub side: Side,
    pub fill_cost: Decimal,
    pub commission: Decimal,
}

impl FillEvent {
    /// Construct a fill commissioned under the Interactive-Brokers-style schedule.
    pub fn ib(
        id: FillId,
        order_id: OrderId,
        symbol: Symbol,
        exchange: RoutingExchange,
        quantity: i64,
        side: Side,
        fill_cost: Decimal,
    ) -> Self {
        let commission = Self::ib_commission(quantity, fill_cost);
        Self::new(
            id, order_id, symbol, exchange, quantity, side, fill_cost, commission,
        )
    }

    /// US stock commission per the Interactive-Brokers API schedule: USD 0.005 per share,
    /// capped at 0.5% of the trade value. The USD 1.00 minimum per order is not modelled.
    pub fn ib_commission(quantity: i64, fill_cost: Decimal) -> Decimal {
        let per_share = Decimal::new(5, 3);
        let full_cost = per_share * Decimal::from(quantity);
        let max_cost = per_share * fill_cost * Decimal::from(quantity);
        full_cost.min(max_cost)
    }
}
