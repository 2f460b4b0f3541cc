use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Instrument universe
// ---------------------------------------------------------------------------

/// Product category an instrument is listed under (Bybit v5 naming).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// USDT / USDC settled perpetuals and futures.
    #[default]
    Linear,
    /// Coin-margined contracts.
    Inverse,
    Spot,
    #[serde(rename = "option")]
    Options,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Linear => "linear",
            Category::Inverse => "inverse",
            Category::Spot => "spot",
            Category::Options => "option",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(Category::Linear),
            "inverse" => Ok(Category::Inverse),
            "spot" => Ok(Category::Spot),
            "option" => Ok(Category::Options),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

/// Candle granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    Minute(u32),
    Daily,
    Weekly,
    Monthly,
}

impl Default for Interval {
    fn default() -> Self {
        Interval::Minute(60)
    }
}

impl Interval {
    /// Minute intervals the exchange accepts.
    pub const MINUTES: [u32; 10] = [1, 3, 5, 15, 30, 60, 120, 240, 360, 720];

    /// The exchange's interval code ("60", "D", ...).
    pub fn code(&self) -> String {
        match self {
            Interval::Minute(n) => n.to_string(),
            Interval::Daily => "D".to_string(),
            Interval::Weekly => "W".to_string(),
            Interval::Monthly => "M".to_string(),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl FromStr for Interval {
    type Err = String;

    /// Accepts exchange codes ("60", "D") and the usual shorthands ("1h", "4h", "1d").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let minutes = match s.to_lowercase().as_str() {
            "d" | "1d" => return Ok(Interval::Daily),
            "w" | "1w" => return Ok(Interval::Weekly),
            "m" | "1mo" => return Ok(Interval::Monthly),
            lower => {
                if let Some(h) = lower.strip_suffix('h') {
                    h.parse::<u32>().ok().and_then(|h| h.checked_mul(60))
                } else if let Some(m) = lower.strip_suffix('m') {
                    m.parse::<u32>().ok()
                } else {
                    lower.parse::<u32>().ok()
                }
            }
        };

        match minutes {
            Some(n) if Self::MINUTES.contains(&n) => Ok(Interval::Minute(n)),
            _ => Err(format!("unsupported interval '{}'", s)),
        }
    }
}

impl TryFrom<String> for Interval {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.code()
    }
}

// ---------------------------------------------------------------------------
// Market Data
// ---------------------------------------------------------------------------

/// A single OHLCV candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time in exchange milliseconds.
    pub start: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub turnover: Option<f64>,
}

impl Candle {
    pub fn open_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start)
    }

    /// Render the candle as a kline row in the column order of [`RawHistory`].
    pub fn to_row(&self) -> Vec<String> {
        let mut row = vec![
            self.start.to_string(),
            self.open.to_string(),
            self.high.to_string(),
            self.low.to_string(),
            self.close.to_string(),
            self.volume.to_string(),
        ];
        if let Some(turnover) = self.turnover {
            row.push(turnover.to_string());
        }
        row
    }
}

/// History payload as returned by an [`crate::InstrumentClient`].
///
/// Every row is `[start, open, high, low, close, volume]`, optionally followed
/// by `turnover`. Row order is not guaranteed (Bybit returns newest first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHistory {
    pub symbol: String,
    pub rows: Vec<Vec<String>>,
}

impl RawHistory {
    pub fn from_candles(symbol: &str, candles: &[Candle]) -> Self {
        Self {
            symbol: symbol.to_string(),
            rows: candles.iter().map(Candle::to_row).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Indicators & evaluation
// ---------------------------------------------------------------------------

/// Latest indicator values for one series. `None` means insufficient data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub ma: Option<f64>,
}

/// Values a predicate consumed when deciding a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma: Option<f64>,
}

/// An instrument whose predicate evaluated to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub symbol: String,
    pub details: MatchDetails,
    /// Open time of the latest candle the decision was made on.
    pub as_of: Option<DateTime<Utc>>,
}

/// Outcome of evaluating a single instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub symbol: String,
    pub signal: bool,
    pub details: MatchDetails,
    pub snapshot: IndicatorSnapshot,
    pub as_of: Option<DateTime<Utc>>,
}

impl Analysis {
    pub fn into_match(self) -> Option<MatchResult> {
        self.signal.then_some(MatchResult {
            symbol: self.symbol,
            details: self.details,
            as_of: self.as_of,
        })
    }
}

/// An instrument skipped during a scan, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub symbol: String,
    pub reason: String,
}

/// Aggregate result of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub id: Uuid,
    pub scanned_at: DateTime<Utc>,
    pub predicate: String,
    /// Matches in discovery order.
    pub matches: Vec<MatchResult>,
    pub count: usize,
    /// Instruments fully evaluated, matched or not.
    pub evaluated: usize,
    pub failures: Vec<ScanFailure>,
}

impl ScanResult {
    pub fn new(predicate: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            scanned_at: Utc::now(),
            predicate: predicate.to_string(),
            matches: Vec::new(),
            count: 0,
            evaluated: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_analysis(&mut self, analysis: Analysis) {
        self.evaluated += 1;
        if let Some(m) = analysis.into_match() {
            self.matches.push(m);
            self.count = self.matches.len();
        }
    }

    pub fn record_failure(&mut self, symbol: &str, reason: impl Into<String>) {
        self.failures.push(ScanFailure {
            symbol: symbol.to_string(),
            reason: reason.into(),
        });
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.symbol.as_str()).collect()
    }
}
