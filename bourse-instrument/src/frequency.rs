use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Bar frequency a strategy consumes market data at.
///
/// Each variant carries the number of bars in one regular trading session (`one_day`), a
/// broker-style bar size label, and the wall-clock span of one bar (`offset`). `one_day` is
/// fractional for `H1` because the 6.5 hour session does not divide evenly into hours.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum Frequency {
    #[serde(alias = "1d", alias = "daily")]
    Daily,
    #[serde(alias = "1h")]
    H1,
    #[serde(alias = "30m")]
    M30,
    #[serde(alias = "10m")]
    M10,
    #[serde(alias = "1m")]
    M1,
}

impl Frequency {
    /// Frequency historical bars are stored and fed at. Coarser strategy frequencies are
    /// aggregated up from this base by the data feeder.
    pub const BASE: Frequency = Frequency::M1;

    /// Number of trading days per year used to annualise bar counts.
    pub const TRADING_DAYS_PER_YEAR: f64 = 250.0;

    /// Bars per regular trading session (09:30-16:00 New York).
    pub fn one_day(&self) -> f64 {
        match self {
            Frequency::Daily => 1.0,
            Frequency::H1 => 6.5,
            Frequency::M30 => 13.0,
            Frequency::M10 => 39.0,
            Frequency::M1 => 390.0,
        }
    }

    /// Broker-style bar size label.
    pub fn bar_size(&self) -> &'static str {
        match self {
            Frequency::Daily => "1 day",
            Frequency::H1 => "1 hour",
            Frequency::M30 => "30 mins",
            Frequency::M10 => "10 mins",
            Frequency::M1 => "1 min",
        }
    }

    /// Wall-clock span of a single bar.
    pub fn offset(&self) -> TimeDelta {
        match self {
            Frequency::Daily => TimeDelta::days(1),
            Frequency::H1 => TimeDelta::hours(1),
            Frequency::M30 => TimeDelta::minutes(30),
            Frequency::M10 => TimeDelta::minutes(10),
            Frequency::M1 => TimeDelta::minutes(1),
        }
    }

    /// Bars per year at this frequency, for the downstream metrics layer.
    pub fn bars_per_year(&self) -> f64 {
        Self::TRADING_DAYS_PER_YEAR * self.one_day()
    }

    /// Number of [`Frequency::BASE`] bars aggregated into one bar at this frequency.
    pub fn num_agg(&self) -> u32 {
        (Self::BASE.one_day() / self.one_day()).round() as u32
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Frequency::Daily => "1d",
                Frequency::H1 => "1h",
                Frequency::M30 => "30m",
                Frequency::M10 => "10m",
                Frequency::M1 => "1m",
            }
        )
    }
}
