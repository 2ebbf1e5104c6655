use bourse_instrument::{SignalKind, Symbol};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Urgency of a staged signal. A position holds at most one signal per urgency per bar, and
/// only the most urgent one is acted on: a hard stop preempts strategy signals, which preempt
/// scheduled rebalancing.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum SignalUrgency {
    HardStop,
    Normal,
    Rebalance,
}

impl SignalUrgency {
    /// All urgencies, most urgent first.
    pub const ALL: [SignalUrgency; 3] = [
        SignalUrgency::HardStop,
        SignalUrgency::Normal,
        SignalUrgency::Rebalance,
    ];
}

impl std::fmt::Display for SignalUrgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SignalUrgency::HardStop => "hard_stop",
                SignalUrgency::Normal => "normal",
                SignalUrgency::Rebalance => "rebalance",
            }
        )
    }
}

/// How a signal's strength translates into a target quantity.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub enum SignalTarget {
    /// Strength is a fraction of equity to deploy.
    Pct { strength: Decimal },
    /// Strength is a fixed dollar target in units of 100.
    Fixed { strength: Decimal },
}

/// Advisory signal a strategy stages for one symbol, interpreted by the position into orders.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct SignalEvent {
    pub symbol: Symbol,
    pub kind: SignalKind,
    pub target: SignalTarget,
}

impl SignalEvent {
    /// Construct a percent-of-equity signal.
    pub fn pct(symbol: Symbol, kind: SignalKind, strength: Decimal) -> Self {
        Self {
            symbol,
            kind,
            target: SignalTarget::Pct { strength },
        }
    }

    /// Construct a dollar-fixed signal.
    pub fn fixed(symbol: Symbol, kind: SignalKind, strength: Decimal) -> Self {
        Self {
            symbol,
            kind,
            target: SignalTarget::Fixed { strength },
        }
    }

    pub fn strength(&self) -> Decimal {
        match self.target {
            SignalTarget::Pct { strength } | SignalTarget::Fixed { strength } => strength,
        }
    }

    /// Signed share quantity this signal targets at the provided price and equity.
    ///
    /// An `Exit` signal always targets zero, regardless of strength.
    pub fn target_qty(&self, price: Decimal, equity: Decimal) -> i64 {
        if price <= Decimal::ZERO {
            return 0;
        }

        let quantity = match self.target {
            SignalTarget::Pct { strength } => (strength * equity / price).floor(),
            SignalTarget::Fixed { strength } => {
                (strength * Decimal::from(100) / price).floor()
            }
        };

        self.kind.sign() * quantity.to_i64().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_target_qty() {
        struct TestCase {
            name: &'static str,
            input: SignalEvent,
            price: Decimal,
            equity: Decimal,
            expected: i64,
        }

        let cases = vec![
            TestCase {
                name: "pct long deploys a fraction of equity",
                input: SignalEvent::pct(Symbol::new("AAPL"), SignalKind::Long, dec!(0.5)),
                price: dec!(10),
                equity: dec!(10000),
                expected: 500,
            },
            TestCase {
                name: "pct short is negative",
                input: SignalEvent::pct(Symbol::new("AAPL"), SignalKind::Short, dec!(0.5)),
                price: dec!(10),
                equity: dec!(10000),
                expected: -500,
            },
            TestCase {
                name: "pct floors fractional shares",
                input: SignalEvent::pct(Symbol::new("AAPL"), SignalKind::Long, dec!(1)),
                price: dec!(10.50),
                equity: dec!(10000),
                expected: 952,
            },
            TestCase {
                name: "exit targets zero regardless of strength",
                input: SignalEvent::pct(Symbol::new("AAPL"), SignalKind::Exit, dec!(1)),
                price: dec!(10),
                equity: dec!(10000),
                expected: 0,
            },
            TestCase {
                name: "fixed target ignores equity",
                input: SignalEvent::fixed(Symbol::new("AAPL"), SignalKind::Long, dec!(2)),
                price: dec!(10),
                equity: dec!(1_000_000),
                expected: 20,
            },
        ];

        for (index, test) in cases.iter().enumerate() {
            assert_eq!(
                test.input.target_qty(test.price, test.equity),
                test.expected,
                "TC{} ({}) failed",
                index,
                test.name
            );
        }
    }

    #[test]
    fn test_urgency_ordering_is_most_urgent_first() {
        assert!(SignalUrgency::HardStop < SignalUrgency::Normal);
        assert!(SignalUrgency::Normal < SignalUrgency::Rebalance);
    }
}
