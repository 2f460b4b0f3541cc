use crate::models::*;
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Enumerating the instrument universe failed. Fatal to a scan.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("Failed to decode response: {0}")]
    Decode(String),
    #[error("Discovery timed out after {0}s")]
    Timeout(u64),
    #[error("Discovery failed: {0}")]
    Other(String),
}

/// Fetching history for one instrument failed.
#[derive(Debug, thiserror::Error)]
pub enum HistoryFetchError {
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// A history payload did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedSeriesError {
    #[error("Row {row} has {found} columns, expected 6 or 7")]
    ColumnCount { row: usize, found: usize },
    #[error("Row {row} has {found} columns, previous rows have {expected}")]
    InconsistentWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Failed to parse {column} '{value}' in row {row}")]
    InvalidField {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// Any failure while processing a single instrument.
#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    #[error(transparent)]
    HistoryFetch(#[from] HistoryFetchError),
    #[error(transparent)]
    MalformedSeries(#[from] MalformedSeriesError),
}

// ---------------------------------------------------------------------------
// Instrument Client Trait
// ---------------------------------------------------------------------------

/// Source of the instrument universe and per-instrument candle history.
#[async_trait]
pub trait InstrumentClient: Send + Sync {
    /// Enumerate tradable instrument identifiers in `category`.
    async fn list_instruments(&self, category: Category) -> Result<Vec<String>, DiscoveryError>;

    /// Fetch up to `limit` candles for `symbol`.
    async fn get_history(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<RawHistory, HistoryFetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_error_is_transparent() {
        let err: InstrumentError = HistoryFetchError::UnknownInstrument("FOOUSDT".into()).into();
        assert_eq!(err.to_string(), "Unknown instrument: FOOUSDT");

        let err: InstrumentError = MalformedSeriesError::ColumnCount { row: 3, found: 4 }.into();
        assert_eq!(err.to_string(), "Row 3 has 4 columns, expected 6 or 7");
    }
}
