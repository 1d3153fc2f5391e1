use crate::error::EngineError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared::models::{Candle, DataSource, Interval};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub symbol: String,
    pub interval: Interval,
    pub start: NaiveDate,
    /// Inclusive: candles on `end` are kept.
    pub end: NaiveDate,
}

impl FetchRequest {
    pub fn new(symbol: &str, interval: Interval, start: NaiveDate, end: NaiveDate) -> Self {
        Self { symbol: symbol.to_uppercase(), interval, start, end }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start.and_hms_opt(0, 0, 0).map(|n| n.and_utc()).unwrap_or_default()
    }

    /// Exclusive upper bound (midnight after `end`).
    pub fn end_time(&self) -> DateTime<Utc> {
        self.end
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|n| n.and_utc())
            .unwrap_or_else(Utc::now)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.symbol.trim().is_empty() {
            return Err(EngineError::MarketDataError("Symbol must not be empty".to_string()));
        }
        if self.start > self.end {
            return Err(EngineError::MarketDataError(format!(
                "Start date {} is after end date {}",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// A source of OHLCV bars.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &str;

    fn source(&self) -> DataSource;

    /// Whether this provider can serve the symbol/interval pair at all.
    fn supports(&self, _symbol: &str, _interval: Interval) -> bool {
        true
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Candle>, EngineError>;
}

/// Crypto tickers are also routed to the exchange provider.
pub fn is_crypto_symbol(symbol: &str) -> bool {
    let upper = symbol.to_uppercase();
    ["BTC", "ETH", "CRYPTO"].iter().any(|prefix| upper.starts_with(prefix))
}
