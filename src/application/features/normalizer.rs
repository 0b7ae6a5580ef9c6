//! Canonicalizes raw per-symbol tables into [`MinuteSeries`].
//!
//! A table is already tidy when its index is a known time-axis label and its
//! column names are unique. Otherwise the index is reset into a column and
//! the `open_time` column becomes the time axis.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

use crate::domain::errors::SeriesError;
use crate::domain::market::raw_table::RawTable;
use crate::domain::market::series::{Bar, MinuteSeries, REQUIRED_COLUMNS};

/// Index names accepted as an already-parsed time axis.
pub const TIME_AXIS_LABELS: &[&str] = &["open_time", "datetime"];

/// Column the time axis is taken from when the table is not tidy.
pub const TIME_COLUMN: &str = "open_time";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// A normalized series plus what normalization had to discard.
#[derive(Debug, Clone)]
pub struct NormalizedSeries {
    pub series: MinuteSeries,
    pub duplicates_dropped: usize,
}

pub struct SeriesNormalizer;

impl SeriesNormalizer {
    pub fn is_tidy(table: &RawTable) -> bool {
        TIME_AXIS_LABELS.contains(&table.index_name.as_str()) && table.has_unique_columns()
    }

    /// Parsed time axis of the table, in row order.
    pub fn time_axis(table: &RawTable) -> Result<Vec<DateTime<Utc>>, SeriesError> {
        resolve(table).map(|(timestamps, _)| timestamps)
    }

    /// Builds the canonical series: parsed timestamps, ascending, one bar per minute.
    pub fn normalize(table: &RawTable) -> Result<NormalizedSeries, SeriesError> {
        let (timestamps, view) = resolve(table)?;

        if !view.has_unique_columns() {
            warn!(
                "Duplicate column names {:?}, using first occurrence",
                view.columns
            );
        }

        let positions = REQUIRED_COLUMNS
            .iter()
            .map(|name| {
                view.column_position(name)
                    .ok_or_else(|| SeriesError::MissingColumn {
                        column: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut bars = Vec::with_capacity(view.nrows());
        for (row_idx, (row, open_time)) in view.rows.iter().zip(timestamps).enumerate() {
            let mut values = [0.0; 7];
            for (slot, (&pos, name)) in positions.iter().zip(REQUIRED_COLUMNS).enumerate() {
                values[slot] = row[pos].as_number().ok_or_else(|| {
                    SeriesError::UnparseableNumber {
                        column: name.to_string(),
                        row: row_idx,
                        value: row[pos].to_string(),
                    }
                })?;
            }
            bars.push(Bar {
                open_time,
                open: values[0],
                high: values[1],
                low: values[2],
                close: values[3],
                volume: values[4],
                taker_buy_base_asset_volume: values[5],
                number_of_trades: values[6],
            });
        }

        let (series, duplicates_dropped) = MinuteSeries::from_bars(bars);
        Ok(NormalizedSeries {
            series,
            duplicates_dropped,
        })
    }
}

/// Time axis plus the table view the bars are read from. A tidy table is
/// borrowed as is; otherwise the index is reset and `open_time` is parsed.
fn resolve(table: &RawTable) -> Result<(Vec<DateTime<Utc>>, Cow<'_, RawTable>), SeriesError> {
    if SeriesNormalizer::is_tidy(table) {
        let timestamps = parse_timestamps(table.index.iter().map(String::as_str))?;
        return Ok((timestamps, Cow::Borrowed(table)));
    }
    let reset = table.reset_index();
    let position = reset
        .column_position(TIME_COLUMN)
        .ok_or_else(|| SeriesError::MissingTimeColumn {
            candidates: TIME_AXIS_LABELS.iter().map(|s| s.to_string()).collect(),
        })?;
    let raw: Vec<String> = reset.rows.iter().map(|r| r[position].to_string()).collect();
    let timestamps = parse_timestamps(raw.iter().map(String::as_str))?;
    Ok((timestamps, Cow::Owned(reset)))
}

fn parse_timestamps<'a>(
    raw: impl Iterator<Item = &'a str>,
) -> Result<Vec<DateTime<Utc>>, SeriesError> {
    raw.enumerate()
        .map(|(row, value)| {
            parse_timestamp(value).ok_or_else(|| SeriesError::UnparseableTimestamp {
                row,
                value: value.to_string(),
            })
        })
        .collect()
}

/// Parses epoch numbers (seconds, milliseconds or microseconds by magnitude),
/// RFC 3339, offset-suffixed and naive date-times (taken as UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(epoch) = value.parse::<i64>() {
        let magnitude = epoch.unsigned_abs();
        return if magnitude >= 100_000_000_000_000 {
            DateTime::from_timestamp_micros(epoch)
        } else if magnitude >= 100_000_000_000 {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
