use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use std::collections::BTreeSet;

/// Column names every per-symbol table must carry, besides its time axis.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "open",
    "high",
    "low",
    "close",
    "volume",
    "taker_buy_base_asset_volume",
    "number_of_trades",
];

/// One minute bar of a symbol's trading history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub taker_buy_base_asset_volume: f64,
    pub number_of_trades: f64,
}

impl Bar {
    /// True when every numeric field holds a finite value.
    pub fn is_finite(&self) -> bool {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.taker_buy_base_asset_volume,
            self.number_of_trades,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// A calendar month, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// First instant of this month, or None for an out-of-range month.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, 1)?;
        Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
    }

    /// First instant of the following month.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        YearMonth::new(year, month).start()
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Canonical minute series: strictly increasing open times, no duplicates.
///
/// The only way to build one is [`MinuteSeries::from_bars`], which sorts and
/// de-duplicates, so every consumer can rely on the ordering invariant.
#[derive(Debug, Clone, Default)]
pub struct MinuteSeries {
    bars: Vec<Bar>,
}

impl MinuteSeries {
    /// Sorts bars by open time and keeps the first bar for each timestamp.
    /// Returns the series and the number of duplicate rows dropped.
    pub fn from_bars(mut bars: Vec<Bar>) -> (Self, usize) {
        bars.sort_by_key(|b| b.open_time);
        let before = bars.len();
        bars.dedup_by_key(|b| b.open_time);
        let dropped = before - bars.len();
        (Self { bars }, dropped)
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// First and last open time.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.bars.first()?.open_time, self.bars.last()?.open_time))
    }

    /// Calendar years that have at least one bar, ascending.
    pub fn years(&self) -> BTreeSet<i32> {
        self.bars.iter().map(|b| b.open_time.year()).collect()
    }

    /// Contiguous bars whose open time falls in the given month.
    pub fn month_slice(&self, month: YearMonth) -> &[Bar] {
        let (Some(start), Some(end)) = (month.start(), month.end()) else {
            return &[];
        };
        let lo = self.bars.partition_point(|b| b.open_time < start);
        let hi = self.bars.partition_point(|b| b.open_time < end);
        &self.bars[lo..hi]
    }
}
