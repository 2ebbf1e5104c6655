use bourse_instrument::Symbol;
use thiserror::Error;

/// All errors generated in the Bourse-Data crate.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DataError {
    #[error("no bars available for symbol: {0}")]
    SymbolUnavailable(Symbol),

    #[error("feed requested with an empty symbol list")]
    EmptySymbolList,
}
