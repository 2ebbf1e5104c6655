use bourse_instrument::StrategyId;
use thiserror::Error;

/// All errors generated in the Bourse-Execution crate.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ExecutionError {
    #[error("strategy is not registered with the execution handler: {0}")]
    UnregisteredStrategy(StrategyId),
}
