use async_trait::async_trait;
use scanner_core::{
    Candle, Category, DiscoveryError, HistoryFetchError, InstrumentClient, Interval, RawHistory,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Payload {
    Candles(Vec<Candle>),
    Raw(RawHistory),
    Failure(String),
}

#[derive(Debug, Clone)]
struct Entry {
    category: Category,
    payload: Payload,
    delay: Option<Duration>,
}

/// A fixed, in-memory instrument universe.
///
/// Serves history newest-first like the exchange does, and can be told to
/// fail discovery or individual fetches.
#[derive(Debug, Default)]
pub struct MemoryInstrumentClient {
    order: Vec<String>,
    entries: HashMap<String, Entry>,
    discovery_failure: Option<String>,
    fetched: Mutex<Vec<String>>,
}

impl MemoryInstrumentClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, symbol: &str, payload: Payload) {
        if !self.entries.contains_key(symbol) {
            self.order.push(symbol.to_string());
        }
        self.entries.insert(
            symbol.to_string(),
            Entry {
                category: Category::Linear,
                payload,
                delay: None,
            },
        );
    }

    /// Add a linear instrument with the given candles.
    pub fn with_instrument(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.insert(symbol, Payload::Candles(candles));
        self
    }

    /// Add an instrument whose history is served verbatim.
    pub fn with_raw_history(mut self, symbol: &str, raw: RawHistory) -> Self {
        self.insert(symbol, Payload::Raw(raw));
        self
    }

    /// Add an instrument that is listed but whose history fetch fails.
    pub fn with_failing_history(mut self, symbol: &str, reason: &str) -> Self {
        self.insert(symbol, Payload::Failure(reason.to_string()));
        self
    }

    pub fn with_category(mut self, symbol: &str, category: Category) -> Self {
        if let Some(entry) = self.entries.get_mut(symbol) {
            entry.category = category;
        }
        self
    }

    /// Delay history responses for `symbol`.
    pub fn with_delay(mut self, symbol: &str, delay: Duration) -> Self {
        if let Some(entry) = self.entries.get_mut(symbol) {
            entry.delay = Some(delay);
        }
        self
    }

    pub fn with_discovery_failure(mut self, reason: &str) -> Self {
        self.discovery_failure = Some(reason.to_string());
        self
    }

    /// Symbols whose history was requested, in request order.
    pub fn fetched_symbols(&self) -> Vec<String> {
        self.fetched
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl InstrumentClient for MemoryInstrumentClient {
    async fn list_instruments(&self, category: Category) -> Result<Vec<String>, DiscoveryError> {
        if let Some(reason) = &self.discovery_failure {
            return Err(DiscoveryError::Other(reason.clone()));
        }
        Ok(self
            .order
            .iter()
            .filter(|s| self.entries.get(*s).map(|e| e.category) == Some(category))
            .cloned()
            .collect())
    }

    async fn get_history(
        &self,
        symbol: &str,
        _interval: Interval,
        limit: usize,
    ) -> Result<RawHistory, HistoryFetchError> {
        if let Ok(mut fetched) = self.fetched.lock() {
            fetched.push(symbol.to_string());
        }

        let entry = self
            .entries
            .get(symbol)
            .ok_or_else(|| HistoryFetchError::UnknownInstrument(symbol.to_string()))?;

        if let Some(delay) = entry.delay {
            tokio::time::sleep(delay).await;
        }

        match &entry.payload {
            Payload::Candles(candles) => {
                let skip = candles.len().saturating_sub(limit);
                let newest_first: Vec<Candle> = candles[skip..].iter().rev().copied().collect();
                Ok(RawHistory::from_candles(symbol, &newest_first))
            }
            Payload::Raw(raw) => Ok(raw.clone()),
            Payload::Failure(reason) => Err(HistoryFetchError::Transport(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(start: i64, close: f64) -> Candle {
        Candle {
            start,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            turnover: None,
        }
    }

    #[tokio::test]
    async fn test_lists_in_insertion_order_by_category() {
        let client = MemoryInstrumentClient::new()
            .with_instrument("ETHUSDT", vec![])
            .with_instrument("BTCUSD", vec![])
            .with_category("BTCUSD", Category::Inverse)
            .with_instrument("ADAUSDT", vec![]);

        let linear = client.list_instruments(Category::Linear).await.unwrap();
        assert_eq!(linear, vec!["ETHUSDT", "ADAUSDT"]);
        let inverse = client.list_instruments(Category::Inverse).await.unwrap();
        assert_eq!(inverse, vec!["BTCUSD"]);
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_limited() {
        let candles = (1..=5).map(|i| candle(i * 1000, i as f64)).collect();
        let client = MemoryInstrumentClient::new().with_instrument("BTCUSDT", candles);

        let raw = client
            .get_history("BTCUSDT", Interval::Minute(60), 3)
            .await
            .unwrap();
        let starts: Vec<&str> = raw.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(starts, vec!["5000", "4000", "3000"]);
        assert_eq!(client.fetched_symbols(), vec!["BTCUSDT"]);
    }

    #[tokio::test]
    async fn test_unknown_and_failing_instruments() {
        let client = MemoryInstrumentClient::new().with_failing_history("XRPUSDT", "boom");

        let err = client
            .get_history("NOPE", Interval::Minute(60), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryFetchError::UnknownInstrument(_)));

        let err = client
            .get_history("XRPUSDT", Interval::Minute(60), 10)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
