use bourse::engine::{PositionSpec, StrategyConfig, StrategyEngine};
use bourse::strategy::example::BuyAndHold;
use bourse_data::source::InMemoryBars;
use bourse_data::Tick;
use bourse_execution::ExecutionConfig;
use bourse_instrument::frequency::Frequency;
use bourse_instrument::{StrategyId, Symbol};
use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;

fn main() {
    // Initialise default non-JSON logging.
    bourse::logging::init_logging();

    // Synthetic tape: one session of minute bars drifting upwards.
    let start: DateTime<Utc> = "2021-03-01T14:31:00Z".parse().unwrap();
    let bars: Vec<Tick> = (0..390)
        .map(|index| {
            let close = Decimal::from(100) + Decimal::new(index, 2);
            Tick::new(
                start + TimeDelta::minutes(index),
                close,
                close + Decimal::ONE,
                close - Decimal::ONE,
                close,
                500_000,
            )
        })
        .collect();
    let source = InMemoryBars::new().with_series("AAPL", bars);

    // Deploy the full allocation into one buy-and-hold position with a 5% hard stop.
    let config = StrategyConfig {
        id: StrategyId::new("buy-and-hold-example"),
        symbols: Vec::new(),
        allocation: Decimal::from(100_000),
        freq: Frequency::M1,
        positions: IndexMap::from([(
            Symbol::new("AAPL"),
            PositionSpec {
                pct_portfolio: None,
                rebalance: 0,
                hard_stop: Decimal::new(5, 2),
            },
        )]),
        warmup: 0,
        start,
        end: "2021-03-01T23:59:59Z".parse().unwrap(),
        fixed_allocation: true,
    };

    let mut engine = StrategyEngine::new(config, ExecutionConfig::default(), BuyAndHold::long());
    engine
        .run(&source)
        .expect("simulation runs to end of data");

    let last = engine.history().last().expect("history is non-empty");
    println!(
        "bars={} nav={} cash={} commission={}",
        engine.t(),
        last.nav,
        last.cash,
        last.commission
    );
}
