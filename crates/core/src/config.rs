use crate::models::{Category, Interval};
use scanner_indicators::rsi::RsiSmoothing;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Largest kline page the exchange returns in one request.
pub const MAX_HISTORY_LIMIT: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Opaque exchange credentials. Never printed or serialized.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_secret: Option<String>,
}

impl Credentials {
    pub fn new(api_key: Option<String>, api_secret: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_secret: api_secret.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn is_present(&self) -> bool {
        self.api_key.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &redact(&self.api_secret))
            .finish()
    }
}

/// Which entry predicate a scan applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateVariant {
    /// RSI oversold, MACD above signal, close above MA, volume above average.
    #[default]
    MomentumCrossover,
    /// Volume above average and close above the previous close.
    SimpleBreakout,
}

impl PredicateVariant {
    pub const ALL: [PredicateVariant; 2] = [
        PredicateVariant::MomentumCrossover,
        PredicateVariant::SimpleBreakout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateVariant::MomentumCrossover => "momentum_crossover",
            PredicateVariant::SimpleBreakout => "simple_breakout",
        }
    }
}

impl fmt::Display for PredicateVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PredicateVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "momentum_crossover" | "momentum" => Ok(PredicateVariant::MomentumCrossover),
            "simple_breakout" | "breakout" => Ok(PredicateVariant::SimpleBreakout),
            other => Err(format!("unknown predicate '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredicateConfig {
    pub variant: PredicateVariant,
    /// RSI must be strictly below this for a momentum crossover.
    pub rsi_below: f64,
}

impl Default for PredicateConfig {
    fn default() -> Self {
        Self {
            variant: PredicateVariant::MomentumCrossover,
            rsi_below: 30.0,
        }
    }
}

/// Indicator periods used to build a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub rsi_smoothing: RsiSmoothing,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub ma_window: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_smoothing: RsiSmoothing::Wilder,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            ma_window: 20,
        }
    }
}

impl IndicatorParams {
    /// Candles needed before every indicator yields a value.
    pub fn min_history(&self) -> usize {
        (self.rsi_period + 1)
            .max(self.macd_slow + self.macd_signal - 1)
            .max(self.ma_window)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rsi_period == 0 || self.macd_fast == 0 || self.macd_signal == 0 || self.ma_window == 0
        {
            return Err(ConfigError::Invalid("indicator periods must be > 0".into()));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(ConfigError::Invalid(format!(
                "macd_fast ({}) must be less than macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        Ok(())
    }
}

/// Everything a scan needs, constructed once and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub testnet: bool,
    /// Overrides the mainnet/testnet REST endpoint.
    pub base_url: Option<String>,
    pub category: Category,
    pub interval: Interval,
    /// Candles requested per instrument.
    pub history_limit: usize,
    /// Process at most this many discovered instruments. `None` scans all.
    pub max_instruments: Option<usize>,
    /// Instruments processed at once. 1 keeps the scan sequential.
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    /// Trailing candles averaged for volume. `None` averages the whole series.
    pub volume_window: Option<usize>,
    pub predicate: PredicateConfig,
    pub indicators: IndicatorParams,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            testnet: false,
            base_url: None,
            category: Category::Linear,
            interval: Interval::Minute(60),
            history_limit: 100,
            max_instruments: None,
            concurrency: 1,
            request_timeout_secs: 10,
            volume_window: None,
            predicate: PredicateConfig::default(),
            indicators: IndicatorParams::default(),
        }
    }
}

impl ScannerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: ScannerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.indicators.validate()?;

        let min = self.indicators.min_history();
        if self.history_limit < min {
            return Err(ConfigError::Invalid(format!(
                "history_limit {} is below the {} candles the indicators need",
                self.history_limit, min
            )));
        }
        if self.history_limit > MAX_HISTORY_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "history_limit {} exceeds the exchange maximum of {}",
                self.history_limit, MAX_HISTORY_LIMIT
            )));
        }
        if self.max_instruments == Some(0) {
            return Err(ConfigError::Invalid("max_instruments must be > 0".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be > 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be > 0".into()));
        }
        if self.volume_window == Some(0) {
            return Err(ConfigError::Invalid("volume_window must be > 0".into()));
        }
        if !self.predicate.rsi_below.is_finite() {
            return Err(ConfigError::Invalid("rsi_below must be finite".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.indicators.min_history(), 34);
        assert_eq!(config.max_instruments, None);
    }

    #[test]
    fn test_parse_toml() {
        let config = ScannerConfig::from_toml_str(
            r#"
            api_key = "key"
            api_secret = "secret"
            category = "inverse"
            interval = "4h"
            history_limit = 200
            max_instruments = 3

            [predicate]
            variant = "simple_breakout"

            [indicators]
            rsi_smoothing = "simple"
            "#,
        )
        .unwrap();

        assert_eq!(config.credentials.api_key.as_deref(), Some("key"));
        assert_eq!(config.category, Category::Inverse);
        assert_eq!(config.interval, Interval::Minute(240));
        assert_eq!(config.max_instruments, Some(3));
        assert_eq!(config.predicate.variant, PredicateVariant::SimpleBreakout);
        assert_eq!(config.predicate.rsi_below, 30.0);
        assert_eq!(config.indicators.rsi_smoothing, RsiSmoothing::Simple);
        assert_eq!(config.indicators.rsi_period, 14);
    }

    #[test]
    fn test_history_limit_below_indicator_minimum() {
        let config = ScannerConfig {
            history_limit: 20,
            ..Default::default()
        };
        match config.validate() {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("history_limit")),
            other => panic!("Expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn test_credentials_are_redacted() {
        let creds = Credentials::new(Some("abc123".into()), Some("s3cr3t".into()));
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("abc123"));
        assert!(!printed.contains("s3cr3t"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn test_serialized_config_omits_credentials() {
        let config = ScannerConfig {
            credentials: Credentials::new(Some("key-123".into()), Some("secret-456".into())),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("key-123"));
        assert!(!json.contains("secret-456"));
        assert!(!json.contains("api_secret"));
        assert!(json.contains("\"history_limit\":100"));
    }

    #[test]
    fn test_predicate_variant_from_str() {
        assert_eq!(
            "simple-breakout".parse::<PredicateVariant>().unwrap(),
            PredicateVariant::SimpleBreakout
        );
        assert!("moon".parse::<PredicateVariant>().is_err());
    }
}
