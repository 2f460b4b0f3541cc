use chrono::{DateTime, Utc};
use scanner_core::{Candle, MalformedSeriesError, RawHistory};

/// Column names in kline row order.
const COLUMNS: [&str; 7] = ["timestamp", "open", "high", "low", "close", "volume", "turnover"];

/// Typed OHLCV columns for one instrument.
///
/// Ascending and strictly increasing by timestamp, holding at most
/// `capacity` candles (the newest ones). Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    symbol: String,
    capacity: usize,
    timestamps: Vec<i64>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
    turnover: Option<Vec<f64>>,
}

impl Series {
    pub const UNBOUNDED: usize = usize::MAX;

    /// Parse a raw kline payload.
    ///
    /// Rows must all be 6 columns wide (no turnover) or all 7 wide, and every
    /// field must be numeric. An empty payload is a valid, empty series.
    pub fn parse(raw: &RawHistory, capacity: usize) -> Result<Self, MalformedSeriesError> {
        let width = match raw.rows.first() {
            Some(row) => row.len(),
            None => return Ok(Self::from_candles(&raw.symbol, Vec::new(), capacity)),
        };

        let mut candles = Vec::with_capacity(raw.rows.len());
        for (i, row) in raw.rows.iter().enumerate() {
            if row.len() != 6 && row.len() != 7 {
                return Err(MalformedSeriesError::ColumnCount {
                    row: i,
                    found: row.len(),
                });
            }
            if row.len() != width {
                return Err(MalformedSeriesError::InconsistentWidth {
                    row: i,
                    expected: width,
                    found: row.len(),
                });
            }
            candles.push(parse_row(i, row)?);
        }

        Ok(Self::from_candles(&raw.symbol, candles, capacity))
    }

    /// Build from already typed candles in any order.
    ///
    /// Candles sharing a timestamp collapse to the last one given.
    pub fn from_candles(symbol: &str, mut candles: Vec<Candle>, capacity: usize) -> Self {
        candles.sort_by_key(|c| c.start);

        let mut unique: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match unique.last_mut() {
                Some(last) if last.start == candle.start => *last = candle,
                _ => unique.push(candle),
            }
        }

        if unique.len() > capacity {
            let excess = unique.len() - capacity;
            unique.drain(..excess);
        }

        let has_turnover = !unique.is_empty() && unique.iter().all(|c| c.turnover.is_some());

        Self {
            symbol: symbol.to_string(),
            capacity,
            timestamps: unique.iter().map(|c| c.start).collect(),
            open: unique.iter().map(|c| c.open).collect(),
            high: unique.iter().map(|c| c.high).collect(),
            low: unique.iter().map(|c| c.low).collect(),
            close: unique.iter().map(|c| c.close).collect(),
            volume: unique.iter().map(|c| c.volume).collect(),
            turnover: has_turnover.then(|| unique.iter().filter_map(|c| c.turnover).collect()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn opens(&self) -> &[f64] {
        &self.open
    }

    pub fn highs(&self) -> &[f64] {
        &self.high
    }

    pub fn lows(&self) -> &[f64] {
        &self.low
    }

    pub fn closes(&self) -> &[f64] {
        &self.close
    }

    pub fn volumes(&self) -> &[f64] {
        &self.volume
    }

    pub fn turnovers(&self) -> Option<&[f64]> {
        self.turnover.as_deref()
    }

    pub fn get(&self, index: usize) -> Option<Candle> {
        Some(Candle {
            start: *self.timestamps.get(index)?,
            open: self.open[index],
            high: self.high[index],
            low: self.low[index],
            close: self.close[index],
            volume: self.volume[index],
            turnover: self.turnover.as_ref().map(|t| t[index]),
        })
    }

    pub fn latest(&self) -> Option<Candle> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn previous(&self) -> Option<Candle> {
        self.len().checked_sub(2).and_then(|i| self.get(i))
    }

    /// Open time of the latest candle.
    pub fn as_of(&self) -> Option<DateTime<Utc>> {
        self.latest().and_then(|c| c.open_time())
    }
}

fn parse_row(row: usize, fields: &[String]) -> Result<Candle, MalformedSeriesError> {
    let invalid = |column: usize| MalformedSeriesError::InvalidField {
        row,
        column: COLUMNS[column],
        value: fields[column].clone(),
    };

    let start = fields[0].trim().parse::<i64>().map_err(|_| invalid(0))?;
    let number = |column: usize| -> Result<f64, MalformedSeriesError> {
        fields[column]
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(column))
    };

    Ok(Candle {
        start,
        open: number(1)?,
        high: number(2)?,
        low: number(3)?,
        close: number(4)?,
        volume: number(5)?,
        turnover: if fields.len() == 7 { Some(number(6)?) } else { None },
    })
}
