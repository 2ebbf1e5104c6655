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

//! # Bourse-Execution
//! Simulated order execution for the Bourse backtesting engine. Each registered strategy owns
//! an isolated [`SimulatedBook`](simulator::SimulatedBook) so concurrent strategies never
//! consume each other's liquidity. Fill quantities and prices come from a volume-share
//! [`slippage`] model: the fillable quantity per bar is capped at a fraction of the bar's
//! traded volume, and price impact grows quadratically with the participation rate, so large
//! orders are split into partial fills across bars.

/// Bourse-Execution module specific errors.
pub mod error;

/// [`FillEvent`](fill::FillEvent) and the Interactive-Brokers-style commission schedule.
pub mod fill;

/// [`OrderEvent`](order::OrderEvent) and related identifiers.
pub mod order;

/// Volume-share slippage model and its injected [`ExecutionConfig`](slippage::ExecutionConfig).
pub mod slippage;

/// [`SimulatedExecution`](simulator::SimulatedExecution) handler and the per-strategy
/// [`SimulatedBook`](simulator::SimulatedBook).
pub mod simulator;

pub use error::ExecutionError;
pub use fill::{FillEvent, FillId};
pub use order::{OrderEvent, OrderId, OrderKind};
pub use slippage::ExecutionConfig;
pub use simulator::SimulatedExecution;
