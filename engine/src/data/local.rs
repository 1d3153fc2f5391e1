// Serves `{dir}/{SYMBOL}.csv` files exported from a provider.
use super::csv_parser::OhlcvCsvParser;
use super::provider::{FetchRequest, MarketDataProvider};
use crate::error::EngineError;
use async_trait::async_trait;
use shared::models::{Candle, DataSource};
use std::path::{Path, PathBuf};

pub struct LocalCsvProvider {
    dir: PathBuf,
}

impl LocalCsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }

    fn load(path: &Path, request: &FetchRequest) -> Result<Vec<Candle>, EngineError> {
        let candles = OhlcvCsvParser::load_candles_from_csv(path, &request.symbol)
            .map_err(|e| EngineError::CsvDataFormatError(e.to_string()))?;
        let (start, end) = (request.start_time(), request.end_time());
        Ok(candles.into_iter().filter(|c| c.timestamp >= start && c.timestamp < end).collect())
    }
}

#[async_trait]
impl MarketDataProvider for LocalCsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn source(&self) -> DataSource {
        DataSource::Csv
    }

    fn supports(&self, symbol: &str, _interval: shared::models::Interval) -> bool {
        self.path_for(symbol).is_file()
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Candle>, EngineError> {
        let path = self.path_for(&request.symbol);
        if !path.is_file() {
            return Err(EngineError::MarketDataError(format!("CSV file not found: {}", path.display())));
        }
        let request = request.clone();
        // CSV parsing is blocking file I/O.
        tokio::task::spawn_blocking(move || Self::load(&path, &request))
            .await
            .map_err(|e| EngineError::ProcessingError(format!("CSV loader task failed: {}", e)))?
    }
}
