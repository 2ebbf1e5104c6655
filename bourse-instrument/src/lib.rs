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

//! # Bourse-Instrument
//! Core symbol, trade direction, bar frequency and market calendar data structures used across
//! the Bourse backtesting engine.

use derive_more::{Constructor, Display, From};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Bar [`Frequency`] definitions and the base feed frequency.
pub mod frequency;

/// Regular Trading Hours calendar for US cash equities (09:30-16:00 New York).
pub mod calendar;

/// Ticker symbol of a cash equity instrument.
///
/// eg/ Symbol::new("AAPL")
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct Symbol(pub SmolStr);

impl Symbol {
    pub fn new<S>(symbol: S) -> Self
    where
        S: Into<SmolStr>,
    {
        Self(symbol.into())
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Unique identifier for a strategy registered with the data feeder and execution handler.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct StrategyId(pub SmolStr);

impl StrategyId {
    pub fn new<S>(id: S) -> Self
    where
        S: Into<SmolStr>,
    {
        Self(id.into())
    }
}

/// [`Side`] of an order or fill - Buy or Sell.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum Side {
    #[serde(alias = "buy", alias = "BUY", alias = "b")]
    Buy,
    #[serde(alias = "sell", alias = "SELL", alias = "s")]
    Sell,
}

impl Side {
    /// Sign convention used throughout the accounting: Buy is +1, Sell is -1.
    pub fn sign(&self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Side::Buy => "buy",
                Side::Sell => "sell",
            }
        )
    }
}

/// Directional stance a signal endorses for a symbol.
///
/// `Exit` flattens any exposure rather than opening one.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum SignalKind {
    #[serde(alias = "long", alias = "L")]
    Long,
    #[serde(alias = "short", alias = "S")]
    Short,
    #[serde(alias = "exit", alias = "E")]
    Exit,
}

impl SignalKind {
    /// Sign convention: Long is +1, Short is -1, Exit is 0.
    pub fn sign(&self) -> i64 {
        match self {
            SignalKind::Long => 1,
            SignalKind::Short => -1,
            SignalKind::Exit => 0,
        }
    }

    /// Construct the [`SignalKind`] endorsing the provided signed quantity.
    pub fn from_sign(quantity: i64) -> Self {
        match quantity {
            q if q > 0 => SignalKind::Long,
            q if q < 0 => SignalKind::Short,
            _ => SignalKind::Exit,
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SignalKind::Long => "long",
                SignalKind::Short => "short",
                SignalKind::Exit => "exit",
            }
        )
    }
}

/// Broker routing destination attached to simulated fills.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Deserialize, Serialize,
)]
pub enum RoutingExchange {
    /// Broker-managed smart routing (the only destination the simulator models).
    #[default]
    #[serde(alias = "S", alias = "smart")]
    Smart,
}

impl std::fmt::Display for RoutingExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "smart")
    }
}

/// Monotone id allocator for order, fill and trade identifiers.
///
/// Ids increase with allocation order, so sorting by id reproduces submission order - no
/// timestamp is embedded.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Default,
    Deserialize,
    Serialize,
    Constructor,
)]
pub struct Sequence(pub u64);

impl Sequence {
    /// Allocate the next id.
    pub fn next_id(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}
