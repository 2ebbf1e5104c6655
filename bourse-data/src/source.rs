use crate::{error::DataError, Tick};
use bourse_instrument::Symbol;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Read-only source of historical bars at the base feed frequency.
///
/// Implementations are expected to hand out isolated iterators, so that concurrently running
/// strategies never observe each other's read position.
pub trait BarSource {
    /// Iterator over the bars of one symbol, in ascending timestamp order.
    type Bars: Iterator<Item = Tick>;

    /// The `[first, last]` bar timestamps available for the provided symbol.
    fn available_period(&self, symbol: &Symbol)
        -> Result<(DateTime<Utc>, DateTime<Utc>), DataError>;

    /// Bars for the provided symbol within `[start, end]`, in ascending timestamp order.
    fn bars(
        &self,
        symbol: &Symbol,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self::Bars, DataError>;
}

/// In-memory [`BarSource`] holding a pre-loaded series per symbol.
///
/// Primarily used in tests and examples; a database-backed source implements the same trait.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBars {
    series: IndexMap<Symbol, Vec<Tick>>,
}

impl InMemoryBars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the full bar series for a symbol, replacing any existing series.
    pub fn insert<S>(&mut self, symbol: S, mut bars: Vec<Tick>)
    where
        S: Into<Symbol>,
    {
        bars.sort_by_key(|bar| bar.timestamp);
        self.series.insert(symbol.into(), bars);
    }

    /// Builder-style [`InMemoryBars::insert`].
    pub fn with_series<S>(mut self, symbol: S, bars: Vec<Tick>) -> Self
    where
        S: Into<Symbol>,
    {
        self.insert(symbol, bars);
        self
    }
}

impl BarSource for InMemoryBars {
    type Bars = std::vec::IntoIter<Tick>;

    fn available_period(
        &self,
        symbol: &Symbol,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), DataError> {
        self.series
            .get(symbol)
            .and_then(|bars| Some((bars.first()?.timestamp, bars.last()?.timestamp)))
            .ok_or_else(|| DataError::SymbolUnavailable(symbol.clone()))
    }

    fn bars(
        &self,
        symbol: &Symbol,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self::Bars, DataError> {
        let bars = self
            .series
            .get(symbol)
            .ok_or_else(|| DataError::SymbolUnavailable(symbol.clone()))?;

        Ok(bars
            .iter()
            .filter(|bar| bar.timestamp >= start && bar.timestamp <= end)
            .copied()
            .collect::<Vec<Tick>>()
            .into_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tick(timestamp: &str) -> Tick {
        Tick::new(
            timestamp.parse::<DateTime<Utc>>().unwrap(),
            dec!(10),
            dec!(10),
            dec!(10),
            dec!(10),
            1_000,
        )
    }

    #[test]
    fn test_available_period() {
        let source = InMemoryBars::new().with_series(
            "AAPL",
            vec![
                tick("2021-03-01T15:00:00Z"),
                tick("2021-03-01T15:01:00Z"),
                tick("2021-03-01T15:02:00Z"),
            ],
        );

        let (start, end) = source.available_period(&Symbol::new("AAPL")).unwrap();
        assert_eq!(start, "2021-03-01T15:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(end, "2021-03-01T15:02:00Z".parse::<DateTime<Utc>>().unwrap());

        assert_eq!(
            source.available_period(&Symbol::new("TSLA")),
            Err(DataError::SymbolUnavailable(Symbol::new("TSLA")))
        );
    }

    #[test]
    fn test_bars_filters_requested_range() {
        let source = InMemoryBars::new().with_series(
            "AAPL",
            vec![
                tick("2021-03-01T15:00:00Z"),
                tick("2021-03-01T15:01:00Z"),
                tick("2021-03-01T15:02:00Z"),
            ],
        );

        let bars: Vec<Tick> = source
            .bars(
                &Symbol::new("AAPL"),
                "2021-03-01T15:01:00Z".parse::<DateTime<Utc>>().unwrap(),
                "2021-03-01T15:02:00Z".parse::<DateTime<Utc>>().unwrap(),
            )
            .unwrap()
            .collect();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, "2021-03-01T15:01:00Z".parse::<DateTime<Utc>>().unwrap());
    }
}
