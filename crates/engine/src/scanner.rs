use futures_util::stream::{self, StreamExt};
use scanner_core::*;
use scanner_data::Series;
use scanner_signals::{EvaluationInput, Predicate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Runs a predicate across the instrument universe.
///
/// One instrument failing never aborts a scan; only discovery failing does.
pub struct Scanner {
    client: Arc<dyn InstrumentClient>,
    config: ScannerConfig,
    predicate: Box<dyn Predicate>,
    timeout: Duration,
}

impl Scanner {
    pub fn new(
        client: Arc<dyn InstrumentClient>,
        config: ScannerConfig,
        predicate: Box<dyn Predicate>,
    ) -> Self {
        let timeout = config.request_timeout();
        Self {
            client,
            config,
            predicate,
            timeout,
        }
    }

    /// Override the per-call timeout, which otherwise comes from
    /// `request_timeout_secs`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn predicate_name(&self) -> &str {
        self.predicate.name()
    }

    /// Scan every discovered instrument (up to `max_instruments`) and
    /// collect the matches in discovery order.
    pub async fn scan(&self) -> Result<ScanResult, DiscoveryError> {
        let category = self.config.category;
        let mut symbols = match tokio::time::timeout(
            self.timeout,
            self.client.list_instruments(category),
        )
        .await
        {
            Ok(Ok(symbols)) => symbols,
            Ok(Err(e)) => {
                error!(%category, error = %e, "Instrument discovery failed");
                return Err(e);
            }
            Err(_) => {
                let e = DiscoveryError::Timeout(self.timeout.as_secs());
                error!(%category, error = %e, "Instrument discovery failed");
                return Err(e);
            }
        };

        let discovered = symbols.len();
        if let Some(max) = self.config.max_instruments {
            symbols.truncate(max);
        }

        info!(
            predicate = self.predicate.name(),
            %category,
            discovered,
            scanning = symbols.len(),
            concurrency = self.config.concurrency,
            "Starting scan"
        );

        let outcomes: Vec<(String, Result<Analysis, InstrumentError>)> = stream::iter(symbols)
            .map(|symbol| async move {
                let outcome = self.analyze(&symbol).await;
                (symbol, outcome)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut result = ScanResult::new(self.predicate.name());
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(analysis) => result.record_analysis(analysis),
                Err(e) => {
                    warn!(symbol = %symbol, reason = %e, "Skipping instrument");
                    result.record_failure(&symbol, e.to_string());
                }
            }
        }

        info!(
            scan_id = %result.id,
            matches = result.count,
            evaluated = result.evaluated,
            failed = result.failures.len(),
            "Scan complete"
        );
        Ok(result)
    }

    /// Fetch, parse, and evaluate a single instrument.
    pub async fn analyze(&self, symbol: &str) -> Result<Analysis, InstrumentError> {
        let raw = tokio::time::timeout(
            self.timeout,
            self.client
                .get_history(symbol, self.config.interval, self.config.history_limit),
        )
        .await
        .map_err(|_| HistoryFetchError::Timeout(self.timeout.as_secs()))??;

        let series = Series::parse(&raw, self.config.history_limit)?;
        let input =
            EvaluationInput::from_series(&series, &self.config.indicators, self.config.volume_window);
        let evaluation = self.predicate.evaluate(&input);

        debug!(
            symbol,
            candles = series.len(),
            matched = evaluation.matched,
            "Evaluated instrument"
        );

        Ok(Analysis {
            symbol: symbol.to_string(),
            signal: evaluation.matched,
            details: evaluation.details,
            snapshot: input.snapshot,
            as_of: series.as_of(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanner_data::MemoryInstrumentClient;
    use scanner_signals::{MomentumCrossover, SimpleBreakout};

    const HOUR_MS: i64 = 3_600_000;

    fn candles(closes: &[f64], volumes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (c, v))| Candle {
                start: 1_700_000_000_000 + i as i64 * HOUR_MS,
                open: *c,
                high: *c,
                low: *c,
                close: *c,
                volume: *v,
                turnover: Some(c * v),
            })
            .collect()
    }

    /// Flat price and volume, then a higher close on a volume spike.
    fn breakout() -> Vec<Candle> {
        let mut closes = vec![10.0; 39];
        closes.push(11.0);
        let mut volumes = vec![100.0; 39];
        volumes.push(1_000.0);
        candles(&closes, &volumes)
    }

    fn quiet() -> Vec<Candle> {
        candles(&[10.0; 40], &[100.0; 40])
    }

    fn breakout_scanner(client: MemoryInstrumentClient, config: ScannerConfig) -> Scanner {
        Scanner::new(Arc::new(client), config, Box::new(SimpleBreakout))
    }

    #[tokio::test]
    async fn test_scan_collects_matches_in_discovery_order() {
        let client = MemoryInstrumentClient::new()
            .with_instrument("BBBUSDT", breakout())
            .with_instrument("QUIETUSDT", quiet())
            .with_instrument("AAAUSDT", breakout());

        let result = breakout_scanner(client, ScannerConfig::default())
            .scan()
            .await
            .unwrap();

        assert_eq!(result.symbols(), vec!["BBBUSDT", "AAAUSDT"]);
        assert_eq!(result.count, 2);
        assert_eq!(result.evaluated, 3);
        assert!(result.failures.is_empty());
        assert_eq!(result.predicate, "simple_breakout");
        assert_eq!(result.matches[0].details.price, Some(11.0));
        assert!(result.matches[0].as_of.is_some());
    }

    #[tokio::test]
    async fn test_failed_instrument_is_isolated() {
        let client = MemoryInstrumentClient::new()
            .with_instrument("AAAUSDT", breakout())
            .with_failing_history("BADUSDT", "connection reset")
            .with_raw_history(
                "JUNKUSDT",
                RawHistory {
                    symbol: "JUNKUSDT".into(),
                    rows: vec![vec!["1".into(), "2".into(), "3".into()]],
                },
            )
            .with_instrument("CCCUSDT", breakout());

        let result = breakout_scanner(client, ScannerConfig::default())
            .scan()
            .await
            .unwrap();

        assert_eq!(result.symbols(), vec!["AAAUSDT", "CCCUSDT"]);
        assert_eq!(result.evaluated, 2);
        let failed: Vec<&str> = result.failures.iter().map(|f| f.symbol.as_str()).collect();
        assert_eq!(failed, vec!["BADUSDT", "JUNKUSDT"]);
        assert!(result.failures[0].reason.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_every_instrument_failing_still_yields_result() {
        let client = MemoryInstrumentClient::new()
            .with_failing_history("AUSDT", "down")
            .with_failing_history("BUSDT", "down");

        let result = breakout_scanner(client, ScannerConfig::default())
            .scan()
            .await
            .unwrap();
        assert_eq!(result.count, 0);
        assert!(result.matches.is_empty());
        assert_eq!(result.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_discovery_failure_aborts_scan() {
        let client = MemoryInstrumentClient::new()
            .with_instrument("AAAUSDT", breakout())
            .with_discovery_failure("exchange unavailable");

        let err = breakout_scanner(client, ScannerConfig::default())
            .scan()
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Other(msg) if msg == "exchange unavailable"));
    }

    #[tokio::test]
    async fn test_max_instruments_bounds_fetches() {
        let mut client = MemoryInstrumentClient::new();
        for symbol in ["AUSDT", "BUSDT", "CUSDT", "DUSDT", "EUSDT"] {
            client = client.with_instrument(symbol, breakout());
        }
        let client = Arc::new(client);
        let config = ScannerConfig {
            max_instruments: Some(3),
            ..Default::default()
        };

        let scanner = Scanner::new(client.clone(), config, Box::new(SimpleBreakout));
        let result = scanner.scan().await.unwrap();

        assert_eq!(client.fetched_symbols(), vec!["AUSDT", "BUSDT", "CUSDT"]);
        assert_eq!(result.symbols(), vec!["AUSDT", "BUSDT", "CUSDT"]);
    }

    #[tokio::test]
    async fn test_concurrent_scan_keeps_discovery_order() {
        let client = MemoryInstrumentClient::new()
            .with_instrument("SLOWUSDT", breakout())
            .with_delay("SLOWUSDT", Duration::from_millis(100))
            .with_instrument("FASTUSDT", breakout())
            .with_instrument("MIDUSDT", breakout())
            .with_delay("MIDUSDT", Duration::from_millis(30));
        let config = ScannerConfig {
            concurrency: 3,
            ..Default::default()
        };

        let result = breakout_scanner(client, config).scan().await.unwrap();
        assert_eq!(result.symbols(), vec!["SLOWUSDT", "FASTUSDT", "MIDUSDT"]);
    }

    #[tokio::test]
    async fn test_slow_instrument_times_out() {
        let client = MemoryInstrumentClient::new()
            .with_instrument("SLOWUSDT", breakout())
            .with_delay("SLOWUSDT", Duration::from_millis(500))
            .with_instrument("FASTUSDT", breakout());

        let scanner = breakout_scanner(client, ScannerConfig::default())
            .with_timeout(Duration::from_millis(50));

        let err = scanner.analyze("SLOWUSDT").await.unwrap_err();
        assert!(matches!(
            err,
            InstrumentError::HistoryFetch(HistoryFetchError::Timeout(_))
        ));

        let result = scanner.scan().await.unwrap();
        assert_eq!(result.symbols(), vec!["FASTUSDT"]);
        assert_eq!(result.failures[0].symbol, "SLOWUSDT");
    }

    #[tokio::test]
    async fn test_analyze_unknown_symbol() {
        let scanner = breakout_scanner(MemoryInstrumentClient::new(), ScannerConfig::default());
        let err = scanner.analyze("NOPEUSDT").await.unwrap_err();
        assert!(matches!(
            err,
            InstrumentError::HistoryFetch(HistoryFetchError::UnknownInstrument(s)) if s == "NOPEUSDT"
        ));
    }

    #[tokio::test]
    async fn test_analyze_reports_snapshot_without_match() {
        let client = MemoryInstrumentClient::new().with_instrument("QUIETUSDT", quiet());
        let scanner = Scanner::new(
            Arc::new(client),
            ScannerConfig::default(),
            Box::new(MomentumCrossover::default()),
        );

        let analysis = scanner.analyze("QUIETUSDT").await.unwrap();
        assert!(!analysis.signal);
        assert_eq!(analysis.snapshot.rsi, Some(50.0));
        assert_eq!(analysis.snapshot.ma, Some(10.0));
        assert_eq!(analysis.details.price, Some(10.0));
        assert!(analysis.clone().into_match().is_none());
    }

    #[tokio::test]
    async fn test_history_limit_caps_series() {
        let client = Arc::new(MemoryInstrumentClient::new().with_instrument("AUSDT", quiet()));
        let config = ScannerConfig {
            history_limit: 5,
            ..Default::default()
        };
        let scanner = Scanner::new(client, config, Box::new(MomentumCrossover::default()));

        // Five candles cannot feed RSI(14).
        let analysis = scanner.analyze("AUSDT").await.unwrap();
        assert_eq!(analysis.snapshot.rsi, None);
        assert!(!analysis.signal);
    }
}
