use chrono::{DateTime, Duration, TimeZone, Utc};
use coinregime::application::features::aggregator::FeatureAggregator;
use coinregime::application::features::extractor::{MonthlyExtraction, MonthlyFeatureExtractor};
use coinregime::domain::features::FeatureRecord;
use coinregime::application::features::normalizer::SeriesNormalizer;
use coinregime::domain::market::raw_table::{Cell, RawTable};
use coinregime::domain::market::series::{Bar, MinuteSeries, REQUIRED_COLUMNS, YearMonth};
use coinregime::domain::run_log::InsufficientMonth;
use coinregime::infrastructure::archive::CsvDirectoryArchive;
use std::fmt::Write as _;
use std::fs;

const JANUARY: YearMonth = YearMonth {
    year: 2024,
    month: 1,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Bars whose log returns are exactly `returns`, one minute apart.
fn bars_from_returns(returns: &[f64]) -> Vec<Bar> {
    let mut close = 100.0;
    let mut bars = vec![bar(0, close, 50.0, 20.0)];
    for (i, r) in returns.iter().enumerate() {
        close *= r.exp();
        bars.push(bar(i as i64 + 1, close, 50.0, 20.0));
    }
    bars
}

fn bar(minute: i64, close: f64, volume: f64, taker: f64) -> Bar {
    Bar {
        open_time: t0() + Duration::minutes(minute),
        open: close,
        high: close * 1.001,
        low: close * 0.999,
        close,
        volume,
        taker_buy_base_asset_volume: taker,
        number_of_trades: 12.0,
    }
}

fn extract(bars: Vec<Bar>) -> FeatureRecord {
    let (series, _) = MinuteSeries::from_bars(bars);
    MonthlyFeatureExtractor::default()
        .extract("TESTUSDT", &series, JANUARY)
        .into_record()
        .expect("month has enough bars")
}

// --- extreme_flag: each side of the threshold on its own ---

#[test]
fn test_extreme_flag_skew_only() {
    // Bernoulli(0.1): skew ~2.7, excess kurtosis ~5
    let returns: Vec<f64> = (0..500).map(|i| if i % 10 == 0 { 0.01 } else { 0.0 }).collect();
    let record = extract(bars_from_returns(&returns));

    assert!(record.return_skew.abs() > 1.5, "skew {}", record.return_skew);
    assert!(record.return_kurtosis <= 100.0, "kurt {}", record.return_kurtosis);
    assert_eq!(record.extreme_flag, 0);
}

#[test]
fn test_extreme_flag_kurtosis_only() {
    // Two symmetric outliers: no skew, excess kurtosis ~250
    let mut returns = vec![0.0; 500];
    returns[100] = 0.05;
    returns[300] = -0.05;
    let record = extract(bars_from_returns(&returns));

    assert!(record.return_skew.abs() <= 1.5, "skew {}", record.return_skew);
    assert!(record.return_kurtosis > 100.0, "kurt {}", record.return_kurtosis);
    assert_eq!(record.extreme_flag, 0);
}

#[test]
fn test_extreme_flag_both() {
    let mut returns = vec![0.0; 499];
    returns[250] = 0.2;
    let record = extract(bars_from_returns(&returns));

    assert!(record.return_skew > 1.5);
    assert!(record.return_kurtosis > 100.0);
    assert_eq!(record.extreme_flag, 1);
}

#[test]
fn test_extreme_flag_neither() {
    let returns: Vec<f64> = (0..500).map(|i| if i % 2 == 0 { 0.001 } else { -0.001 }).collect();
    let record = extract(bars_from_returns(&returns));

    assert!(record.return_skew.abs() < 1e-6);
    assert!(record.return_kurtosis < 0.0);
    assert_eq!(record.extreme_flag, 0);
}

// --- taker_buy_ratio_mean ---

#[test]
fn test_zero_volume_bar_is_skipped_by_taker_ratio() {
    let bars: Vec<Bar> = (0..200)
        .map(|i| {
            let volume = if i == 80 { 0.0 } else { 10.0 + (i % 7) as f64 };
            let taker = volume * (0.3 + 0.01 * (i % 5) as f64);
            bar(i, 100.0 + (i % 3) as f64, volume, taker)
        })
        .collect();
    let without: Vec<Bar> = bars
        .iter()
        .copied()
        .filter(|b| b.volume > 0.0)
        .collect();
    assert_eq!(without.len(), 199);

    let with_zero = extract(bars);
    let removed = extract(without);

    assert!(with_zero.taker_buy_ratio_mean.is_finite());
    assert_eq!(with_zero.taker_buy_ratio_mean, removed.taker_buy_ratio_mean);
}

// --- minimum-bars gate, through an on-disk archive ---

fn write_archive_file(dir: &std::path::Path, name: &str, times: &[DateTime<Utc>]) {
    let mut body = String::from(
        "open_time,open,high,low,close,volume,taker_buy_base_asset_volume,number_of_trades\n",
    );
    for (i, ts) in times.iter().enumerate() {
        let close = 10.0 + (i % 9) as f64 * 0.01;
        writeln!(
            body,
            "{},{},{},{},{},{},{},{}",
            ts.timestamp_millis(),
            close,
            close + 0.02,
            close - 0.02,
            close,
            5 + i % 4,
            2,
            3
        )
        .unwrap();
    }
    fs::write(dir.join(name), body).unwrap();
}

fn minutes_from(start: DateTime<Utc>, count: i64) -> Vec<DateTime<Utc>> {
    (0..count).map(|i| start + Duration::minutes(i)).collect()
}

#[test]
fn test_only_months_with_enough_bars_are_emitted() {
    let dir = tempfile::tempdir().unwrap();
    let mut times = minutes_from(t0(), 150);
    times.extend(minutes_from(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(), 99));
    times.extend(minutes_from(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(), 100));
    write_archive_file(dir.path(), "XUSDT_1m.csv", &times);

    let archive = CsvDirectoryArchive::open(dir.path()).unwrap();
    let aggregation = FeatureAggregator::new(MonthlyFeatureExtractor::default(), true)
        .aggregate(&archive, &["XUSDT".to_string()]);

    let months: Vec<&str> = aggregation
        .table
        .records()
        .iter()
        .map(|r| r.month.as_str())
        .collect();
    assert_eq!(months, vec!["2024-01", "2024-03"]);
    assert_eq!(
        aggregation.run_log.insufficient_months,
        vec![InsufficientMonth {
            symbol: "XUSDT".to_string(),
            month: "2024-02".to_string(),
            bars: 99,
        }]
    );
}

#[test]
fn test_emission_gate_boundary() {
    let closes: Vec<Bar> = (0..100).map(|i| bar(i, 100.0 + (i % 4) as f64, 10.0, 5.0)).collect();
    let (series, _) = MinuteSeries::from_bars(closes.clone());
    let extractor = MonthlyFeatureExtractor::default();
    assert!(matches!(
        extractor.extract("AUSDT", &series, JANUARY),
        MonthlyExtraction::Emitted(_)
    ));

    let (short, _) = MinuteSeries::from_bars(closes[..99].to_vec());
    assert_eq!(
        extractor.extract("AUSDT", &short, JANUARY),
        MonthlyExtraction::Insufficient { bars: 99 }
    );
}

// --- blank cells ---

/// 200 January rows as raw text; row 120 repeats row 119's close.
fn raw_rows() -> (Vec<String>, Vec<Vec<String>>) {
    let mut index = Vec::new();
    let mut rows = Vec::new();
    for i in 0..200i64 {
        let step = if i == 120 { 119 } else { i };
        let close = 10.0 + (step % 9) as f64 * 0.01;
        index.push((t0() + Duration::minutes(i)).timestamp_millis().to_string());
        rows.push(vec![
            close.to_string(),
            (close + 0.02).to_string(),
            (close - 0.02).to_string(),
            close.to_string(),
            (5 + i % 4).to_string(),
            "2".to_string(),
            (3 + i % 2).to_string(),
        ]);
    }
    (index, rows)
}

fn normalized_record(index: Vec<String>, rows: Vec<Vec<String>>) -> FeatureRecord {
    let columns = REQUIRED_COLUMNS.iter().map(|s| s.to_string()).collect();
    let cells = rows
        .iter()
        .map(|row| row.iter().map(|v| Cell::parse(v)).collect::<Vec<_>>())
        .collect();
    let table = RawTable::new("open_time", columns, index, cells).unwrap();
    let series = SeriesNormalizer::normalize(&table).unwrap().series;
    MonthlyFeatureExtractor::default()
        .extract("BLANKUSDT", &series, JANUARY)
        .into_record()
        .unwrap()
}

#[test]
fn test_blank_volume_cell_drops_only_that_row() {
    let (index, mut rows) = raw_rows();
    rows[120][4] = String::new();
    let blank = normalized_record(index, rows);

    let (mut index, mut rows) = raw_rows();
    index.remove(120);
    rows.remove(120);
    let removed = normalized_record(index, rows);

    assert!(blank.volume_std.is_finite());
    assert!(blank.non_finite_features().is_empty());
    assert_eq!(blank, removed);
}
