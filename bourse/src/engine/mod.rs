use crate::{
    error::EngineError,
    position::{Position, PositionConfig},
    strategy::{signal::SignalUrgency, SignalCtx, Strategy},
};
use bourse_data::{
    feed::{DataFeed, Feed, FeedRequest},
    source::BarSource,
    MarketEvent,
};
use bourse_execution::{ExecutionConfig, FillEvent, OrderEvent, SimulatedExecution};
use bourse_instrument::{frequency::Frequency, Sequence, StrategyId, Symbol};
use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Per-symbol position parameters, in trading days where applicable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct PositionSpec {
    /// Fraction of equity this position targets. Defaults to an equal split across positions.
    #[serde(default)]
    pub pct_portfolio: Option<Decimal>,
    /// Rebalance period in trading days. Zero disables rebalancing.
    #[serde(default)]
    pub rebalance: u64,
    /// Drawdown fraction that forces the position flat. Zero disables the hard stop.
    #[serde(default)]
    pub hard_stop: Decimal,
}

/// Construction parameters of a [`StrategyEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Identifier this strategy registers under with the feeder and execution handler.
    pub id: StrategyId,
    /// Symbols the strategy consumes market data for. Symbols named in `positions` are
    /// appended automatically.
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    /// Dollar amount this strategy is allowed to deploy.
    pub allocation: Decimal,
    /// Frequency the strategy consumes bars at.
    pub freq: Frequency,
    /// Per-symbol position parameters.
    pub positions: IndexMap<Symbol, PositionSpec>,
    /// Warm-up length in trading days. Warm-up bars prime indicators but generate no signals.
    #[serde(default)]
    pub warmup: u64,
    /// Requested simulation start (UTC).
    pub start: DateTime<Utc>,
    /// Requested simulation end (UTC); extended to the final instant of that day.
    pub end: DateTime<Utc>,
    /// When true buying power is the static allocation; otherwise it follows net asset value.
    #[serde(default = "default_fixed_allocation")]
    pub fixed_allocation: bool,
}

fn default_fixed_allocation() -> bool {
    true
}

/// Lifecycle of a [`StrategyEngine`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub enum EngineStatus {
    /// Construction in progress.
    Init,
    /// Constructed; feeder and execution registration pending.
    Setup,
    /// Simulation loop live.
    Running,
    /// End of data reached, books deregistered.
    Stopped,
}

/// Per-bar record of the strategy's state, the artifact consumed by the downstream metrics
/// and reporting layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StrategySnapshot {
    pub timestamp: DateTime<Utc>,
    pub t: u64,
    pub cash: Decimal,
    pub commission: Decimal,
    pub nav: Decimal,
    pub positions: IndexMap<Symbol, PositionSnapshot>,
}

/// Per-symbol slice of a [`StrategySnapshot`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PositionSnapshot {
    pub quantity: i64,
    pub mv: Decimal,
}

/// The strategy runtime: owns the positions, drives the simulation loop, and enforces the
/// buying-power gate between signal generation and order submission.
///
/// Each engine instantiates its own execution books and data feed, forming a shared-nothing
/// unit; the only resource shared across engines is the external [`BarSource`].
#[derive(Debug)]
pub struct StrategyEngine<S> {
    id: StrategyId,
    symbols: Vec<Symbol>,
    freq: Frequency,
    /// Warm-up length in strategy-frequency bars.
    warmup: u64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    allocation: Decimal,
    fixed_allocation: bool,
    cash: Decimal,
    commission: Decimal,
    positions: IndexMap<Symbol, Position>,
    market: Option<MarketEvent>,
    t: u64,
    history: Vec<StrategySnapshot>,
    order_seq: Sequence,
    status: EngineStatus,
    execution: SimulatedExecution,
    strategy: S,
}

impl<S> StrategyEngine<S>
where
    S: Strategy,
{
    /// Construct a new `StrategyEngine` in the `Setup` state.
    ///
    /// Day-denominated parameters (`warmup`, per-position `rebalance`) are scaled to
    /// strategy-frequency bars, and the simulation end is extended to the final instant of its
    /// day.
    pub fn new(config: StrategyConfig, execution: ExecutionConfig, strategy: S) -> Self {
        let bars_per_day = config.freq.one_day().ceil() as u64;
        let num_positions = config.positions.len().max(1);
        let default_pct = Decimal::ONE / Decimal::from(num_positions);

        let mut symbols = config.symbols;
        let mut positions = IndexMap::with_capacity(config.positions.len());
        for (symbol, spec) in config.positions {
            // A position implies a data subscription for its symbol.
            if !symbols.contains(&symbol) {
                symbols.push(symbol.clone());
            }
            positions.insert(
                symbol.clone(),
                Position::new(
                    symbol,
                    PositionConfig {
                        pct_portfolio: spec.pct_portfolio.unwrap_or(default_pct),
                        rebalance: spec.rebalance * bars_per_day,
                        hard_stop: spec.hard_stop,
                    },
                ),
            );
        }

        info!(id = %config.id, freq = %config.freq, symbols = symbols.len(), "strategy set up");

        Self {
            id: config.id,
            symbols,
            freq: config.freq,
            warmup: config.warmup * bars_per_day,
            start: config.start,
            end: config.end + TimeDelta::days(1) - TimeDelta::seconds(1),
            allocation: config.allocation,
            fixed_allocation: config.fixed_allocation,
            cash: config.allocation,
            commission: Decimal::ZERO,
            positions,
            market: None,
            t: 0,
            history: Vec::new(),
            order_seq: Sequence::default(),
            status: EngineStatus::Setup,
            execution: SimulatedExecution::new(execution),
            strategy,
        }
    }

    pub fn id(&self) -> &StrategyId {
        &self.id
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    /// Bars observed so far, warm-up included.
    pub fn t(&self) -> u64 {
        self.t
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// Total commission paid so far.
    pub fn commission(&self) -> Decimal {
        self.commission
    }

    /// Net asset value: cash plus the market value of every open position.
    pub fn nav(&self) -> Decimal {
        self.positions.values().map(Position::mv).sum::<Decimal>() + self.cash
    }

    /// Capital currently committed across positions.
    pub fn total_cost(&self) -> Decimal {
        self.positions.values().map(Position::cost).sum()
    }

    /// Total buying power: the static allocation, or net asset value when dynamic.
    pub fn total_bp(&self) -> Decimal {
        if self.fixed_allocation {
            self.allocation
        } else {
            self.nav()
        }
    }

    /// Buying power left to open new exposures.
    pub fn available_bp(&self) -> Decimal {
        self.total_bp() - self.total_cost()
    }

    pub fn position(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Per-bar history recorded since the warm-up completed.
    pub fn history(&self) -> &[StrategySnapshot] {
        &self.history
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Run the simulation to bar-source exhaustion.
    ///
    /// Per base bar the phase order is fixed: the execution books see the bar first and
    /// produce fills for orders submitted on *earlier* bars; only then does the strategy see
    /// the (possibly aggregated) bar and submit new orders, which rest until the next bar.
    pub fn run<B>(&mut self, source: &B) -> Result<(), EngineError>
    where
        B: BarSource,
    {
        let mut feed = DataFeed::new(
            source,
            FeedRequest {
                symbols: self.symbols.clone(),
                freq: self.freq,
                warmup: self.warmup,
                start: self.start,
                end: self.end,
            },
        )?;
        self.execution.register(self.id.clone());
        self.status = EngineStatus::Running;
        info!(id = %self.id, "strategy running");

        for event in feed.warmup_events(source)? {
            self.on_market(event)?;
        }

        loop {
            match feed.next_bar() {
                Feed::Next { base, strategy } => {
                    for fill in self.execution.on_market(&self.id, &base)? {
                        self.on_fill(&fill)?;
                    }
                    if let Some(event) = strategy {
                        self.on_market(event)?;
                    }
                }
                Feed::Finished => break,
            }
        }

        self.on_eod();
        Ok(())
    }

    /// Handle a strategy-frequency market update.
    fn on_market(&mut self, event: MarketEvent) -> Result<(), EngineError> {
        self.update_data(event);

        if self.t < self.warmup {
            return Ok(());
        }

        // User strategy first, then each position's own hard-stop and rebalance indicators.
        if let Some(market) = &self.market {
            let mut ctx = SignalCtx::new(&mut self.positions, market, self.t);
            self.strategy.calculate_signals(&mut ctx);
        }
        for position in self.positions.values_mut() {
            position.calculate_signals();
        }

        // Translate signals into orders under a buying-power snapshot shared by all positions
        // this bar.
        let equity = self.total_bp();
        let mut bp = self.available_bp();

        let mut staged = Vec::new();
        for position in self.positions.values_mut() {
            staged.extend(position.generate_orders(equity, &mut self.order_seq));
        }
        for (order, urgency) in staged {
            let used = self.on_order(order, urgency, bp)?;
            bp -= used;
        }

        self.push_snapshot();
        Ok(())
    }

    /// Store the latest ticks, advance the clock, and forward marks to every position.
    fn update_data(&mut self, event: MarketEvent) {
        self.t += 1;
        for (symbol, position) in self.positions.iter_mut() {
            if let Some(tick) = event.tick(symbol) {
                position.update_data(*tick);
            }
        }
        self.strategy.update_data(&event);
        self.market = Some(event);
    }

    /// Gate one order on the remaining buying power snapshot, returning the buying power used.
    ///
    /// An order the snapshot cannot cover is dropped silently: an expected capacity condition,
    /// not an error.
    fn on_order(
        &mut self,
        order: OrderEvent,
        urgency: SignalUrgency,
        bp: Decimal,
    ) -> Result<Decimal, EngineError> {
        let close = self
            .market
            .as_ref()
            .and_then(|market| market.tick(&order.symbol))
            .map(|tick| tick.close)
            .ok_or_else(|| EngineError::NoMarketData(order.symbol.clone()))?;

        let need_bp = Decimal::from(order.quantity) * close;
        if need_bp > bp {
            debug!(id = %self.id, %order, %need_bp, %bp, "insufficient buying power, order dropped");
            return Ok(Decimal::ZERO);
        }

        match urgency {
            SignalUrgency::HardStop => self.strategy.on_hard_stop(&order.symbol),
            SignalUrgency::Rebalance => self.strategy.on_rebalance(&order.symbol),
            SignalUrgency::Normal => {}
        }

        self.positions
            .get_mut(&order.symbol)
            .ok_or_else(|| EngineError::UnknownSymbol(order.symbol.clone()))?
            .confirm_order(&order)?;

        info!(id = %self.id, %order, %urgency, "order submitted");
        self.execution.on_order(&self.id, order)?;
        Ok(need_bp)
    }

    /// Apply a fill: update the position's lot book, then cash and commission.
    fn on_fill(&mut self, fill: &FillEvent) -> Result<(), EngineError> {
        debug!(id = %self.id, fill = %fill.id, order = %fill.order_id, quantity = fill.quantity, "fill received");

        self.positions
            .get_mut(&fill.symbol)
            .ok_or_else(|| EngineError::UnknownSymbol(fill.symbol.clone()))?
            .on_fill(fill)?;

        let cost = Decimal::from(fill.side.sign()) * fill.fill_cost * Decimal::from(fill.quantity);
        self.commission += fill.commission;
        self.cash -= cost + fill.commission;
        Ok(())
    }

    /// Handle the end-of-data event: deregister and stop.
    fn on_eod(&mut self) {
        self.execution.deregister(&self.id);
        self.status = EngineStatus::Stopped;
        info!(id = %self.id, bars = self.t, "end of data, strategy stopped");
    }

    fn push_snapshot(&mut self) {
        let Some(timestamp) = self.market.as_ref().map(|market| market.timestamp) else {
            return;
        };

        let nav = self.nav();
        let positions = self
            .positions
            .iter()
            .map(|(symbol, position)| {
                (
                    symbol.clone(),
                    PositionSnapshot {
                        quantity: position.quantity(),
                        mv: position.mv(),
                    },
                )
            })
            .collect();

        self.history.push(StrategySnapshot {
            timestamp,
            t: self.t,
            cash: self.cash,
            commission: self.commission,
            nav,
            positions,
        });
    }
}
