use async_trait::async_trait;
use scanner_core::*;
use std::time::Duration;
use tracing::{debug, info};

use crate::protocol::*;

pub const MAINNET_URL: &str = "https://api.bybit.com";
pub const TESTNET_URL: &str = "https://api-testnet.bybit.com";

/// Instruments requested per discovery page (exchange maximum).
const INSTRUMENTS_PAGE_LIMIT: usize = 1000;
/// Upper bound on discovery pages, in case the cursor never runs out.
const MAX_INSTRUMENT_PAGES: usize = 50;

/// Configuration for connecting to the Bybit v5 REST API.
#[derive(Debug, Clone)]
pub struct BybitConfig {
    pub base_url: String,
    pub credentials: Credentials,
    /// Category history is requested under.
    pub category: Category,
    pub timeout: Duration,
}

impl Default for BybitConfig {
    fn default() -> Self {
        Self {
            base_url: MAINNET_URL.to_string(),
            credentials: Credentials::default(),
            category: Category::Linear,
            timeout: Duration::from_secs(10),
        }
    }
}

impl BybitConfig {
    pub fn from_scanner_config(config: &ScannerConfig) -> Self {
        let base_url = config.base_url.clone().unwrap_or_else(|| {
            if config.testnet {
                TESTNET_URL.to_string()
            } else {
                MAINNET_URL.to_string()
            }
        });
        Self {
            base_url,
            credentials: config.credentials.clone(),
            category: config.category,
            timeout: config.request_timeout(),
        }
    }
}

/// Bybit market-data client.
///
/// Only public market endpoints are used. Credentials, when configured, are
/// attached as the API key header and otherwise left untouched.
pub struct BybitClient {
    config: BybitConfig,
    http: reqwest::Client,
}

impl BybitClient {
    pub fn new(config: BybitConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("scanner/", env!("CARGO_PKG_VERSION")))
            .build()?;
        info!(
            base_url = %config.base_url,
            authenticated = config.credentials.is_present(),
            "Bybit client ready"
        );
        Ok(Self { config, http })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// GET `path` with `query` and return the body text.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, RequestError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let mut request = self.http.get(&url).query(query);
        if let Some(key) = &self.config.credentials.api_key {
            request = request.header("X-BAPI-API-KEY", key);
        }

        let response = request.send().await.map_err(RequestError::from)?;
        let status = response.status();
        let body = response.text().await.map_err(RequestError::from)?;
        if !status.is_success() {
            return Err(RequestError::Status(status.as_u16(), truncate(&body, 200)));
        }
        Ok(body)
    }

    fn timeout_secs(&self) -> u64 {
        self.config.timeout.as_secs()
    }
}

#[async_trait]
impl InstrumentClient for BybitClient {
    async fn list_instruments(&self, category: Category) -> Result<Vec<String>, DiscoveryError> {
        let mut symbols = Vec::new();
        let mut cursor: Option<String> = None;

        for page_no in 0..MAX_INSTRUMENT_PAGES {
            let mut query = vec![
                ("category", category.as_str().to_string()),
                ("limit", INSTRUMENTS_PAGE_LIMIT.to_string()),
            ];
            if let Some(c) = &cursor {
                query.push(("cursor", c.clone()));
            }

            let body = self
                .get("/v5/market/instruments-info", &query)
                .await
                .map_err(|e| e.into_discovery(self.timeout_secs()))?;
            let page = parse_instruments_page(&body)?;

            symbols.extend(
                page.list
                    .iter()
                    .filter(|i| i.is_trading())
                    .map(|i| i.symbol.clone()),
            );
            debug!(page = page_no, total = symbols.len(), "Fetched instruments page");

            match page.next_cursor() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        info!(%category, count = symbols.len(), "Discovered instruments");
        Ok(symbols)
    }

    async fn get_history(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<RawHistory, HistoryFetchError> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let query = [
            ("category", self.config.category.as_str().to_string()),
            ("symbol", symbol.to_string()),
            ("interval", interval.code()),
            ("limit", limit.to_string()),
        ];

        let body = self
            .get("/v5/market/kline", &query)
            .await
            .map_err(|e| e.into_history(self.timeout_secs()))?;
        parse_kline(symbol, &body)
    }
}

/// Transport-level failure shared by both endpoints.
#[derive(Debug)]
enum RequestError {
    Timeout,
    Status(u16, String),
    Transport(String),
}

impl From<reqwest::Error> for RequestError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RequestError::Timeout
        } else {
            RequestError::Transport(e.to_string())
        }
    }
}

impl RequestError {
    fn into_discovery(self, timeout_secs: u64) -> DiscoveryError {
        match self {
            RequestError::Timeout => DiscoveryError::Timeout(timeout_secs),
            RequestError::Status(code, body) => {
                DiscoveryError::Transport(format!("HTTP {}: {}", code, body))
            }
            RequestError::Transport(msg) => DiscoveryError::Transport(msg),
        }
    }

    fn into_history(self, timeout_secs: u64) -> HistoryFetchError {
        match self {
            RequestError::Timeout => HistoryFetchError::Timeout(timeout_secs),
            RequestError::Status(code, body) => {
                HistoryFetchError::Transport(format!("HTTP {}: {}", code, body))
            }
            RequestError::Transport(msg) => HistoryFetchError::Transport(msg),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
