use crate::strategy::{SignalCtx, Strategy};
use bourse_instrument::{SignalKind, Symbol};
use fnv::FnvHashSet;

/// Goes long (or short) every symbol as soon as a bar is received, and never exits.
///
/// Primarily a testing mechanism for the engine, and a benchmark to compare real strategies
/// against. A symbol knocked out by its hard stop stays flat for the rest of the run.
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    direction: SignalKind,
    hard_stopped: FnvHashSet<Symbol>,
}

impl BuyAndHold {
    pub fn new(direction: SignalKind) -> Self {
        Self {
            direction,
            hard_stopped: FnvHashSet::default(),
        }
    }

    /// The canonical buy-and-hold: long everything.
    pub fn long() -> Self {
        Self::new(SignalKind::Long)
    }
}

impl Default for BuyAndHold {
    fn default() -> Self {
        Self::long()
    }
}

impl Strategy for BuyAndHold {
    fn calculate_signals(&mut self, ctx: &mut SignalCtx<'_>) {
        for symbol in ctx.symbols() {
            if self.hard_stopped.contains(&symbol) || ctx.has_position(&symbol) {
                continue;
            }
            ctx.generate_signal(&symbol, self.direction);
        }
    }

    fn on_hard_stop(&mut self, symbol: &Symbol) {
        self.hard_stopped.insert(symbol.clone());
    }
}
