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

//! # Bourse-Data
//! Historical market data plumbing for the Bourse backtesting engine. Provides the [`Tick`]
//! OHLCV bar, the [`MarketEvent`] that carries one bar per symbol through the system, the
//! [`BarSource`](source::BarSource) abstraction over historical bar storage, and the
//! [`DataFeed`](feed::DataFeed) that paces base-frequency bars through warm-up and live
//! simulation, aggregating them up to the strategy frequency.

use bourse_instrument::{calendar, Symbol};
use chrono::{DateTime, NaiveTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Bourse-Data module specific errors.
pub mod error;

/// Per-strategy [`DataFeed`](feed::DataFeed): bar iteration, warm-up windowing and
/// base-to-strategy frequency aggregation.
pub mod feed;

/// [`BarSource`](source::BarSource) abstraction over historical bar storage, plus an in-memory
/// implementation.
pub mod source;

/// Immutable OHLCV bar for one symbol over one time window.
///
/// Invariant: `low <= open, close <= high` and `volume >= 0`. Bars are stamped at their closing
/// boundary.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Deserialize, Serialize)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

impl Tick {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: i64,
    ) -> Self {
        debug_assert!(low <= open && open <= high, "open outside [low, high]");
        debug_assert!(low <= close && close <= high, "close outside [low, high]");
        debug_assert!(volume >= 0, "negative volume");
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Typical price of the bar, used by the execution simulator as a best-effort proxy for the
    /// volume weighted average fill price.
    pub fn hlc3(&self) -> Decimal {
        (self.high + self.low + self.close) / Decimal::from(3)
    }
}

/// Market update carrying one [`Tick`] per symbol, all sharing the same logical timestamp.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct MarketEvent {
    pub timestamp: DateTime<Utc>,
    pub ticks: IndexMap<Symbol, Tick>,
}

impl MarketEvent {
    /// Construct a new `MarketEvent` from a non-empty map of per-symbol [`Tick`]s.
    pub fn new(ticks: IndexMap<Symbol, Tick>) -> Self {
        let timestamp = ticks
            .values()
            .next()
            .expect("MarketEvent requires at least one Tick")
            .timestamp;

        Self { timestamp, ticks }
    }

    /// The [`Tick`] for the provided symbol, if present in this update.
    pub fn tick(&self, symbol: &Symbol) -> Option<&Tick> {
        self.ticks.get(symbol)
    }

    /// Timestamp converted to exchange-local (New York) time.
    pub fn local_ts(&self) -> DateTime<chrono_tz::Tz> {
        calendar::local_ts(self.timestamp)
    }

    /// Exchange-local time of day.
    pub fn time(&self) -> NaiveTime {
        self.local_ts().time()
    }

    /// True once this update has reached the session close.
    pub fn end_of_day(&self) -> bool {
        calendar::end_of_day(self.timestamp)
    }

    /// True on the final session close of the trading week.
    pub fn end_of_week(&self) -> bool {
        calendar::end_of_week(self.timestamp)
    }
}
