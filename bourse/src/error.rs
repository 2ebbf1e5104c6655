use bourse_data::error::DataError;
use bourse_execution::{ExecutionError, OrderId};
use bourse_instrument::Symbol;
use thiserror::Error;

/// All errors generated in the Bourse engine core.
///
/// `OverFilling` signals corrupted accounting state and is fatal to the simulation; capacity
/// conditions such as insufficient buying power are absorbed as business logic and never
/// surface here.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum EngineError {
    #[error("over-filling: {0}")]
    OverFilling(&'static str),

    #[error("no trade registered for order: {0}")]
    UnknownOrder(OrderId),

    #[error("no position exists for symbol: {0}")]
    UnknownSymbol(Symbol),

    #[error("no market data observed yet for symbol: {0}")]
    NoMarketData(Symbol),

    #[error("data feed failure: {0}")]
    Data(#[from] DataError),

    #[error("execution failure: {0}")]
    Execution(#[from] ExecutionError),
}
