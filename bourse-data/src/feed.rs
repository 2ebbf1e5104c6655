use crate::{error::DataError, source::BarSource, MarketEvent, Tick};
use bourse_instrument::{frequency::Frequency, Symbol};
use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Feed parameters a strategy supplies when its data book is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    /// Symbols the strategy consumes, in a fixed order.
    pub symbols: Vec<Symbol>,
    /// Frequency the strategy consumes bars at.
    pub freq: Frequency,
    /// Warm-up length in strategy-frequency bars.
    pub warmup: u64,
    /// Requested simulation start.
    pub start: DateTime<Utc>,
    /// Requested simulation end.
    pub end: DateTime<Utc>,
}

/// Communicates the state of the [`DataFeed`] as well as the next event.
#[derive(Debug, Clone, PartialEq)]
pub enum Feed {
    /// The next base-frequency bar, plus the strategy-frequency event if the aggregation window
    /// completed on this bar.
    ///
    /// The caller must hand `base` to the execution handler *before* dispatching `strategy`, so
    /// that orders submitted on a bar are only ever filled against later bars.
    Next {
        base: MarketEvent,
        strategy: Option<MarketEvent>,
    },
    /// The underlying bar source is exhausted.
    Finished,
}

/// Per-strategy data book pacing historical bars through the simulation.
///
/// Holds one base-frequency bar iterator per symbol over the period where *all* symbols have
/// data, and aggregates base bars into strategy-frequency bars (`open` = first, `close` = last,
/// `high` = max, `low` = min, `volume` = sum). The aggregation window flushes once it spans a
/// full strategy bar, or early at the session close so partial end-of-day windows are never
/// carried overnight.
#[derive(Debug)]
pub struct DataFeed<Bars> {
    symbols: Vec<Symbol>,
    freq: Frequency,
    warmup: u64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    num_agg: u32,
    streams: IndexMap<Symbol, Bars>,
    buffer: IndexMap<Symbol, Vec<Tick>>,
    window_start: Option<DateTime<Utc>>,
}

impl<Bars> DataFeed<Bars>
where
    Bars: Iterator<Item = Tick>,
{
    /// Construct a new `DataFeed`, intersecting the requested period with the period actually
    /// available for every symbol.
    pub fn new<Source>(source: &Source, request: FeedRequest) -> Result<Self, DataError>
    where
        Source: BarSource<Bars = Bars>,
    {
        if request.symbols.is_empty() {
            return Err(DataError::EmptySymbolList);
        }

        let (mut start, mut end) = (request.start, request.end);
        for symbol in &request.symbols {
            let (available_start, available_end) = source.available_period(symbol)?;
            start = start.max(available_start);
            end = end.min(available_end);
        }

        let streams = request
            .symbols
            .iter()
            .map(|symbol| Ok((symbol.clone(), source.bars(symbol, start, end)?)))
            .collect::<Result<IndexMap<Symbol, Bars>, DataError>>()?;

        info!(
            freq = %request.freq,
            %start,
            %end,
            symbols = request.symbols.len(),
            "created DataFeed"
        );

        Ok(Self {
            symbols: request.symbols,
            freq: request.freq,
            warmup: request.warmup,
            start,
            end,
            num_agg: request.freq.num_agg(),
            streams,
            buffer: IndexMap::default(),
            window_start: None,
        })
    }

    /// Start of the period where all symbols have data.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End of the period where all symbols have data.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Strategy-frequency [`MarketEvent`]s priming the strategy before the simulation starts.
    ///
    /// Bars are greedily fetched from before the simulation start, aligned across symbols
    /// (rows where any symbol is missing are dropped), trimmed to the exact number of base bars
    /// the warm-up needs, and run through the aggregator. A symbol with no data in the warm-up
    /// window skips warm-up entirely rather than failing the run.
    pub fn warmup_events<Source>(&mut self, source: &Source) -> Result<Vec<MarketEvent>, DataError>
    where
        Source: BarSource<Bars = Bars>,
    {
        if self.warmup == 0 {
            return Ok(Vec::new());
        }

        // Computing the precise lookback is expensive, so overfetch and trim to need_bars.
        let lookback_days = (self.warmup as f64 / self.freq.one_day() * 1.5).ceil() as i64;
        let warmup_start = self.start - TimeDelta::days(lookback_days);
        let warmup_end = self.start - TimeDelta::seconds(1);

        let mut rows: BTreeMap<DateTime<Utc>, IndexMap<Symbol, Tick>> = BTreeMap::new();
        for symbol in &self.symbols {
            let bars = match source.bars(symbol, warmup_start, warmup_end) {
                Ok(bars) => bars,
                Err(error) => {
                    warn!(%symbol, %error, "no warm-up data, skipping warm-up");
                    return Ok(Vec::new());
                }
            };

            for tick in bars {
                rows.entry(tick.timestamp)
                    .or_default()
                    .insert(symbol.clone(), tick);
            }
        }

        // The subtracted term leaves the last warm-up bar for new data.
        let need_bars = (self.warmup as f64 / self.freq.one_day().ceil()
            * Frequency::BASE.one_day()
            - Frequency::BASE.one_day() / self.freq.one_day()) as usize;

        let aligned: Vec<IndexMap<Symbol, Tick>> = rows
            .into_values()
            .filter(|row| row.len() == self.symbols.len())
            .collect();

        let skip = aligned.len().saturating_sub(need_bars);
        let mut events = Vec::new();
        for row in aligned.into_iter().skip(skip) {
            let market = MarketEvent::new(row);
            if let Some(aggregated) = self.aggregate_step(&market) {
                events.push(aggregated);
            }
        }

        // Never leak a partial warm-up window into the real simulation.
        self.buffer.clear();
        self.window_start = None;

        debug!(events = events.len(), "prepared warm-up events");
        Ok(events)
    }

    /// Advance every symbol iterator one base bar.
    pub fn next_bar(&mut self) -> Feed {
        let mut ticks = IndexMap::with_capacity(self.streams.len());
        for (symbol, stream) in self.streams.iter_mut() {
            match stream.next() {
                Some(tick) => {
                    ticks.insert(symbol.clone(), tick);
                }
                None => {
                    info!(%symbol, "bar source exhausted, feed finished");
                    return Feed::Finished;
                }
            }
        }

        let base = MarketEvent::new(ticks);
        let strategy = self.aggregate_step(&base);
        Feed::Next { base, strategy }
    }

    /// Push one base bar into the aggregation window, flushing a strategy-frequency event when
    /// the window completes.
    fn aggregate_step(&mut self, market: &MarketEvent) -> Option<MarketEvent> {
        if self.num_agg == 1 {
            return Some(market.clone());
        }

        let window_start = *self.window_start.get_or_insert(market.timestamp);
        for (symbol, tick) in &market.ticks {
            self.buffer.entry(symbol.clone()).or_default().push(*tick);
        }

        let window_complete =
            market.timestamp - window_start >= self.freq.offset() - Frequency::BASE.offset();

        if window_complete || market.end_of_day() {
            Some(self.flush())
        } else {
            None
        }
    }

    /// Aggregate and clear the buffered window.
    fn flush(&mut self) -> MarketEvent {
        let ticks = self
            .buffer
            .iter()
            .filter_map(|(symbol, bars)| {
                let first = bars.first()?;
                let last = bars.last()?;
                Some((
                    symbol.clone(),
                    Tick::new(
                        last.timestamp,
                        first.open,
                        bars.iter().map(|bar| bar.high).max().unwrap_or(first.high),
                        bars.iter().map(|bar| bar.low).min().unwrap_or(first.low),
                        last.close,
                        bars.iter().map(|bar| bar.volume).sum(),
                    ),
                ))
            })
            .collect();

        self.buffer.clear();
        self.window_start = None;
        MarketEvent::new(ticks)
    }
}
