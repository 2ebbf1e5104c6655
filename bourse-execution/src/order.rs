use bourse_instrument::{Side, Symbol};
use derive_more::{Constructor, Display, From};
use serde::{Deserialize, Serialize};

/// Unique order identifier.
///
/// Ids are allocated from a monotone [`Sequence`](bourse_instrument::Sequence), so sorting
/// orders by id reproduces submission order.
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
pub struct OrderId(pub u64);

/// Type of an [`OrderEvent`] - only market orders are exercised by the simulator.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum OrderKind {
    #[serde(alias = "M", alias = "MKT")]
    Market,
    #[serde(alias = "L", alias = "LMT")]
    Limit,
}

/// Request to trade a quantity of a symbol, sent by a strategy to the execution handler.
///
/// `quantity` is a magnitude; `side` carries the direction.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct OrderEvent {
    pub id: OrderId,
    pub symbol: Symbol,
    pub kind: OrderKind,
    pub quantity: i64,
    pub side: Side,
}

impl OrderEvent {
    /// Construct a market order.
    pub fn market(id: OrderId, symbol: Symbol, quantity: i64, side: Side) -> Self {
        debug_assert!(quantity >= 0, "order quantity is a magnitude");
        Self::new(id, symbol, OrderKind::Market, quantity, side)
    }
}

impl std::fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ id: {}, symbol: {}, kind: {}, quantity: {}, side: {} }}",
            self.id, self.symbol, self.kind, self.quantity, self.side
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_sort_in_submission_order() {
        let mut sequence = bourse_instrument::Sequence::default();
        let first = OrderEvent::market(
            OrderId(sequence.next_id()),
            Symbol::new("AAPL"),
            100,
            Side::Buy,
        );
        let second = OrderEvent::market(
            OrderId(sequence.next_id()),
            Symbol::new("AAPL"),
            200,
            Side::Sell,
        );

        let mut orders = vec![second.clone(), first.clone()];
        orders.sort();
        assert_eq!(orders, vec![first, second]);
    }
}
