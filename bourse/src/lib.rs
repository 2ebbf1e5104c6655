#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Bourse
//! Bourse is an event-driven backtesting engine core for cash equity strategies. It simulates
//! the full lifecycle of a strategy against historical OHLCV bars: market data ingestion,
//! signal generation, order execution with slippage and commission modelling, and lot-based
//! per-position trade accounting.
//!
//! ## Overview
//! At a high level it provides four tightly coupled components that interact via direct method
//! contracts on a single-threaded, deterministic simulation loop:
//! * **Data**: a per-strategy [`DataFeed`](bourse_data::feed::DataFeed) paces base-frequency
//!   bars through the system, supplies warm-up history, and aggregates bars up to the strategy
//!   frequency.
//! * **Execution**: the [`SimulatedExecution`](bourse_execution::SimulatedExecution) handler
//!   keeps one order book per strategy and produces partial fills under a volume-share
//!   slippage model. Orders submitted on bar `t` are only ever filled against bar `t+1` or
//!   later.
//! * **Accounting**: each [`Position`](position::Position) owns one open
//!   [`Trade`](position::trade::Trade) at a time, tracking realized and unrealized P&L over a
//!   FIFO lot queue, and watches its own hard-stop and rebalance triggers.
//! * **Strategy runtime**: the [`StrategyEngine`](engine::StrategyEngine) drives the loop,
//!   dispatches events in a fixed phase order per bar, gates orders on available buying power
//!   and records a per-bar history of the strategy's state for downstream analysis.
//!
//! User strategies implement the [`Strategy`](strategy::Strategy) trait; see
//! [`BuyAndHold`](strategy::example::BuyAndHold) for a minimal example.

/// [`StrategyEngine`](engine::StrategyEngine): the deterministic simulation loop, buying-power
/// gate and per-bar state history.
pub mod engine;

/// All errors generated in the Bourse engine core.
pub mod error;

/// Serializable [`Event`](event::Event) envelope over every event kind in the system.
pub mod event;

/// Logging initialisers.
pub mod logging;

/// [`Position`](position::Position) and [`Trade`](position::trade::Trade) accounting.
pub mod position;

/// The [`Strategy`](strategy::Strategy) interface, signal types and example strategies.
pub mod strategy;

pub use engine::{PositionSpec, StrategyConfig, StrategyEngine};
pub use error::EngineError;
pub use strategy::{SignalCtx, Strategy};
