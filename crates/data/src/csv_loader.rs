use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scanner_core::Candle;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum CsvLoadError {
    #[error("Failed to open CSV: {0}")]
    Open(String),
    #[error("No {0} column found")]
    MissingColumn(&'static str),
    #[error("CSV record error: {0}")]
    Record(String),
    #[error("Failed to parse {field} '{value}'")]
    Field { field: &'static str, value: String },
}

/// Load OHLCV candles from a CSV file.
///
/// Expected columns (case-insensitive, flexible ordering):
/// `timestamp` (or `date`, `datetime`, `start`), `open`, `high`, `low`, `close`,
/// `volume`, and optionally `turnover`.
///
/// Timestamps may be RFC 3339, common date formats, or unix seconds/milliseconds.
pub fn load_candles_from_csv(path: &Path) -> Result<Vec<Candle>, CsvLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| CsvLoadError::Open(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| CsvLoadError::Record(e.to_string()))?
        .clone();

    let col_map = resolve_columns(&headers)?;

    let mut candles = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| CsvLoadError::Record(e.to_string()))?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        candles.push(Candle {
            start: parse_timestamp_millis(field(col_map.timestamp))?,
            open: parse_number(field(col_map.open), "open")?,
            high: parse_number(field(col_map.high), "high")?,
            low: parse_number(field(col_map.low), "low")?,
            close: parse_number(field(col_map.close), "close")?,
            volume: match col_map.volume {
                Some(idx) => parse_number(field(idx), "volume")?,
                None => 0.0,
            },
            turnover: match col_map.turnover {
                Some(idx) => Some(parse_number(field(idx), "turnover")?),
                None => None,
            },
        });
    }

    candles.sort_by_key(|c| c.start);
    Ok(candles)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct ColumnMap {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    turnover: Option<usize>,
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<ColumnMap, CsvLoadError> {
    let timestamp = find_column(headers, &["timestamp", "date", "datetime", "time", "start"])
        .ok_or(CsvLoadError::MissingColumn("timestamp"))?;
    let open = find_column(headers, &["open", "o"]).ok_or(CsvLoadError::MissingColumn("open"))?;
    let high = find_column(headers, &["high", "h"]).ok_or(CsvLoadError::MissingColumn("high"))?;
    let low = find_column(headers, &["low", "l"]).ok_or(CsvLoadError::MissingColumn("low"))?;
    let close = find_column(headers, &["close", "c"]).ok_or(CsvLoadError::MissingColumn("close"))?;

    Ok(ColumnMap {
        timestamp,
        open,
        high,
        low,
        close,
        volume: find_column(headers, &["volume", "vol", "v"]),
        turnover: find_column(headers, &["turnover"]),
    })
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
}

fn parse_number(s: &str, field: &'static str) -> Result<f64, CsvLoadError> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CsvLoadError::Field {
            field,
            value: s.to_string(),
        })
}

/// Anything above this is taken to already be in milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

fn parse_timestamp_millis(s: &str) -> Result<i64, CsvLoadError> {
    let s = s.trim();

    if let Ok(ts) = s.parse::<i64>() {
        return Ok(if ts.abs() >= MILLIS_THRESHOLD { ts } else { ts * 1000 });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).timestamp_millis());
    }

    // Common formats (without timezone, assume UTC)
    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in &formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }

    Err(CsvLoadError::Field {
        field: "timestamp",
        value: s.to_string(),
    })
}
