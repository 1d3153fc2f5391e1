use super::binance::BinanceProvider;
use super::local::LocalCsvProvider;
use super::provider::{FetchRequest, MarketDataProvider};
use super::synthetic::SyntheticProvider;
use super::yahoo::YahooProvider;
use crate::config::settings::DataSettings;
use crate::error::EngineError;
use shared::models::{Candle, MarketData};
use std::sync::Arc;
use std::time::Duration;

/// Tries each provider in order and falls back to synthetic data when all of them fail.
pub struct DataFetcher {
    providers: Vec<Arc<dyn MarketDataProvider>>,
    fallback: Option<SyntheticProvider>,
}

impl DataFetcher {
    pub fn new(providers: Vec<Arc<dyn MarketDataProvider>>, fallback: Option<SyntheticProvider>) -> Self {
        Self { providers, fallback }
    }

    /// Local CSV (when configured), Yahoo, then Binance for crypto symbols.
    pub fn from_settings(settings: &DataSettings) -> Result<Self, EngineError> {
        let timeout = Duration::from_secs(settings.request_timeout_secs);
        let mut providers: Vec<Arc<dyn MarketDataProvider>> = Vec::new();
        if let Some(dir) = &settings.csv_dir {
            providers.push(Arc::new(LocalCsvProvider::new(dir.clone())));
        }
        providers.push(Arc::new(YahooProvider::new(&settings.yahoo_base_url, timeout)?));
        providers.push(Arc::new(BinanceProvider::new(&settings.binance_base_url, timeout)?));

        let fallback = settings.synthetic_fallback.then(SyntheticProvider::default);
        Ok(Self::new(providers, fallback))
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn fetch(&self, request: &FetchRequest) -> Result<MarketData, EngineError> {
        request.validate()?;
        let mut failures: Vec<String> = Vec::new();

        for provider in &self.providers {
            if !provider.supports(&request.symbol, request.interval) {
                tracing::debug!(provider = provider.name(), symbol = %request.symbol, interval = %request.interval, "Provider skipped");
                continue;
            }
            match provider.fetch(request).await {
                Ok(raw) => {
                    let candles = clean_candles(raw);
                    if validate_data(&candles) {
                        return Ok(MarketData {
                            symbol: request.symbol.clone(),
                            interval: request.interval,
                            source: provider.source(),
                            candles,
                        });
                    }
                    tracing::warn!(provider = provider.name(), symbol = %request.symbol, "Provider returned no usable rows");
                    failures.push(format!("{}: no usable rows", provider.name()));
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), symbol = %request.symbol, error = %e, "Provider failed");
                    failures.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        match &self.fallback {
            Some(synthetic) => {
                tracing::warn!(
                    symbol = %request.symbol,
                    failures = %failures.join("; "),
                    "All market data providers failed, using synthetic sample data."
                );
                let candles = clean_candles(synthetic.fetch(request).await?);
                Ok(MarketData {
                    symbol: request.symbol.clone(),
                    interval: request.interval,
                    source: synthetic.source(),
                    candles,
                })
            }
            None => Err(EngineError::MarketDataError(format!(
                "No market data found for '{}' ({} to {}, {}): {}",
                request.symbol,
                request.start,
                request.end,
                request.interval,
                if failures.is_empty() { "no provider supports this request".to_string() } else { failures.join("; ") }
            ))),
        }
    }
}

/// Sorts by time, drops rows with non-finite values and keeps one bar per timestamp.
pub fn clean_candles(mut candles: Vec<Candle>) -> Vec<Candle> {
    candles.retain(|c| [c.open, c.high, c.low, c.close, c.volume].iter().all(|v| v.is_finite()));
    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    candles
}

/// Non-empty and every bar internally consistent.
pub fn validate_data(candles: &[Candle]) -> bool {
    !candles.is_empty() && candles.iter().all(Candle::is_well_formed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use shared::models::{DataSource, Interval};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FailingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }
        fn source(&self) -> DataSource {
            DataSource::Yahoo
        }
        async fn fetch(&self, _request: &FetchRequest) -> Result<Vec<Candle>, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::provider("failing", "connection refused"))
        }
    }

    struct FixedProvider(Vec<Candle>);

    #[async_trait]
    impl MarketDataProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }
        fn source(&self) -> DataSource {
            DataSource::Csv
        }
        async fn fetch(&self, _request: &FetchRequest) -> Result<Vec<Candle>, EngineError> {
            Ok(self.0.clone())
        }
    }

    fn request() -> FetchRequest {
        FetchRequest::new(
            "AAPL",
            Interval::Day1,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        )
    }

    fn candle(day: u32, close: f64) -> Candle {
        Candle {
            symbol: "AAPL".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10.0,
        }
    }

    #[tokio::test]
    async fn test_fallback_triggers_when_primary_errors() {
        let failing = Arc::new(FailingProvider { calls: AtomicUsize::new(0) });
        let fetcher = DataFetcher::new(vec![failing.clone() as Arc<dyn MarketDataProvider>], Some(SyntheticProvider::default()));

        let data = fetcher.fetch(&request()).await.unwrap();
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(data.source, DataSource::Synthetic);
        assert_eq!(data.candles.len(), 10);
        assert!(validate_data(&data.candles));
    }

    #[tokio::test]
    async fn test_fallback_after_http_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(500)).mount(&server).await;
        let settings = DataSettings {
            yahoo_base_url: server.uri(),
            binance_base_url: server.uri(),
            request_timeout_secs: 5,
            csv_dir: None,
            synthetic_fallback: true,
        };
        let fetcher = DataFetcher::from_settings(&settings).unwrap();
        assert_eq!(fetcher.provider_names(), vec!["yahoo", "binance"]);

        let data = fetcher.fetch(&request()).await.unwrap();
        assert_eq!(data.source, DataSource::Synthetic);
    }

    #[tokio::test]
    async fn test_no_fallback_is_not_found_error() {
        let providers: Vec<Arc<dyn MarketDataProvider>> = vec![Arc::new(FailingProvider { calls: AtomicUsize::new(0) })];
        let fetcher = DataFetcher::new(providers, None);
        let err = fetcher.fetch(&request()).await.unwrap_err();
        assert!(matches!(err, EngineError::MarketDataError(ref m) if m.contains("No market data found")));
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn test_first_successful_provider_wins_and_is_cleaned() {
        let mut bad = candle(3, 5.0);
        bad.close = f64::NAN;
        let fixed = FixedProvider(vec![candle(2, 4.0), candle(1, 3.0), candle(2, 4.5), bad]);
        let providers: Vec<Arc<dyn MarketDataProvider>> =
            vec![Arc::new(FailingProvider { calls: AtomicUsize::new(0) }), Arc::new(fixed)];
        let fetcher = DataFetcher::new(providers, Some(SyntheticProvider::default()));
        let data = fetcher.fetch(&request()).await.unwrap();
        assert_eq!(data.source, DataSource::Csv);
        let closes: Vec<f64> = data.candles.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![3.0, 4.0]);
    }

    #[tokio::test]
    async fn test_empty_provider_result_moves_on() {
        let fetcher = DataFetcher::new(vec![Arc::new(FixedProvider(vec![])) as Arc<dyn MarketDataProvider>], Some(SyntheticProvider::default()));
        let data = fetcher.fetch(&request()).await.unwrap();
        assert_eq!(data.source, DataSource::Synthetic);
    }
}
