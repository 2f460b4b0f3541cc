pub mod csv_loader;
pub mod memory;
pub mod series;

pub use memory::MemoryInstrumentClient;
pub use series::Series;

use async_trait::async_trait;
use scanner_core::{
    Category, DiscoveryError, HistoryFetchError, InstrumentClient, Interval, RawHistory,
};
use std::path::PathBuf;

/// Instrument source backed by a directory of `<SYMBOL>.csv` files.
///
/// The directory is treated as a single category; the interval argument is
/// ignored, files are served as recorded.
pub struct CsvInstrumentClient {
    pub directory: PathBuf,
}

impl CsvInstrumentClient {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl InstrumentClient for CsvInstrumentClient {
    async fn list_instruments(&self, category: Category) -> Result<Vec<String>, DiscoveryError> {
        tracing::debug!(%category, directory = %self.directory.display(), "Listing CSV instruments");

        let entries = std::fs::read_dir(&self.directory)
            .map_err(|e| DiscoveryError::Other(format!("{}: {}", self.directory.display(), e)))?;

        let mut instruments = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| DiscoveryError::Other(e.to_string()))?
                .path();
            if path.extension().map(|e| e == "csv").unwrap_or(false) {
                if let Some(stem) = path.file_stem() {
                    instruments.push(stem.to_string_lossy().to_string());
                }
            }
        }
        instruments.sort();
        Ok(instruments)
    }

    async fn get_history(
        &self,
        symbol: &str,
        _interval: Interval,
        limit: usize,
    ) -> Result<RawHistory, HistoryFetchError> {
        let file_path = self.directory.join(format!("{}.csv", symbol));
        if !file_path.exists() {
            return Err(HistoryFetchError::UnknownInstrument(symbol.to_string()));
        }

        let candles = csv_loader::load_candles_from_csv(&file_path)
            .map_err(|e| HistoryFetchError::Decode(e.to_string()))?;
        let skip = candles.len().saturating_sub(limit);
        Ok(RawHistory::from_candles(symbol, &candles[skip..]))
    }
}
