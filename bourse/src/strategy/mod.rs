use crate::position::Position;
use bourse_data::{MarketEvent, Tick};
use bourse_instrument::{SignalKind, Symbol};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use self::signal::SignalUrgency;

/// Example strategies.
pub mod example;

/// Signal types staged by positions and strategies.
pub mod signal;

/// User-defined strategy logic, driven by the
/// [`StrategyEngine`](crate::engine::StrategyEngine).
///
/// The engine calls [`Strategy::calculate_signals`] once per strategy-frequency bar after the
/// warm-up period. Strategies stage advisory signals through the [`SignalCtx`]; the engine's
/// positions translate them into orders, subject to buying power.
pub trait Strategy {
    /// Inspect the latest market state and stage signals for any symbol.
    fn calculate_signals(&mut self, ctx: &mut SignalCtx<'_>);

    /// Observe every market update, warm-up bars included. Use this to prime indicators.
    fn update_data(&mut self, _market: &MarketEvent) {}

    /// Called when a hard stop forced one of this strategy's positions flat.
    fn on_hard_stop(&mut self, _symbol: &Symbol) {}

    /// Called when a scheduled rebalance adjusted one of this strategy's positions.
    fn on_rebalance(&mut self, _symbol: &Symbol) {}
}

/// View of the engine state a [`Strategy`] works against when staging signals.
#[derive(Debug)]
pub struct SignalCtx<'a> {
    positions: &'a mut IndexMap<Symbol, Position>,
    market: &'a MarketEvent,
    t: u64,
}

impl<'a> SignalCtx<'a> {
    pub(crate) fn new(
        positions: &'a mut IndexMap<Symbol, Position>,
        market: &'a MarketEvent,
        t: u64,
    ) -> Self {
        Self {
            positions,
            market,
            t,
        }
    }

    /// Bars observed since the simulation started, warm-up included.
    pub fn t(&self) -> u64 {
        self.t
    }

    /// The latest strategy-frequency market update.
    pub fn market(&self) -> &MarketEvent {
        self.market
    }

    /// The latest bar for the provided symbol.
    pub fn tick(&self, symbol: &Symbol) -> Option<&Tick> {
        self.market.tick(symbol)
    }

    /// The symbols this strategy holds position configuration for.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.positions.keys().cloned().collect()
    }

    pub fn has_position(&self, symbol: &Symbol) -> bool {
        self.positions
            .get(symbol)
            .map(Position::has_position)
            .unwrap_or(false)
    }

    pub fn has_open_orders(&self, symbol: &Symbol) -> bool {
        self.positions
            .get(symbol)
            .map(Position::has_open_orders)
            .unwrap_or(false)
    }

    pub fn has_long(&self, symbol: &Symbol) -> bool {
        self.positions
            .get(symbol)
            .map(Position::has_long)
            .unwrap_or(false)
    }

    pub fn has_short(&self, symbol: &Symbol) -> bool {
        self.positions
            .get(symbol)
            .map(Position::has_short)
            .unwrap_or(false)
    }

    /// Position return on peak committed capital for the provided symbol.
    pub fn r(&self, symbol: &Symbol) -> Option<f64> {
        self.positions.get(symbol).map(Position::r)
    }

    /// Stage a normal-urgency signal with the position's default strength.
    pub fn generate_signal(&mut self, symbol: &Symbol, kind: SignalKind) {
        self.generate_signal_inner(symbol, kind, None);
    }

    /// Stage a normal-urgency signal with an explicit strength.
    pub fn generate_signal_with_strength(
        &mut self,
        symbol: &Symbol,
        kind: SignalKind,
        strength: Decimal,
    ) {
        self.generate_signal_inner(symbol, kind, Some(strength));
    }

    fn generate_signal_inner(
        &mut self,
        symbol: &Symbol,
        kind: SignalKind,
        strength: Option<Decimal>,
    ) {
        if let Some(position) = self.positions.get_mut(symbol) {
            position.generate_signal(kind, SignalUrgency::Normal, strength);
        }
    }
}
