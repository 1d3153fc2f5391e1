// Yahoo Finance chart API provider
use super::provider::{FetchRequest, MarketDataProvider};
use crate::error::EngineError;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use shared::models::{Candle, DataSource, Interval};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EngineError> {
        let client = Client::builder().timeout(timeout).user_agent("Mozilla/5.0").build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// Tickers tried in order for one requested symbol.
    pub fn symbol_alternatives(symbol: &str) -> Vec<String> {
        match symbol {
            "BTC-USD" => vec!["BTC-USD".into(), "BTCUSD=X".into(), "BTC=F".into()],
            "ETH-USD" => vec!["ETH-USD".into(), "ETHUSD=X".into(), "ETH=F".into()],
            other => vec![other.to_string()],
        }
    }

    fn interval_code(interval: Interval) -> Option<&'static str> {
        match interval {
            Interval::Hour4 => None,
            other => Some(other.as_str()),
        }
    }

    async fn fetch_ticker(&self, ticker: &str, request: &FetchRequest, interval: &str) -> Result<Vec<Candle>, EngineError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let period1 = request.start_time().timestamp().to_string();
        let period2 = request.end_time().timestamp().to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("period1", period1.as_str()), ("period2", period2.as_str()), ("interval", interval)])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: YahooResponse = serde_json::from_str(&body).map_err(|e| {
            EngineError::provider("yahoo", format!("HTTP {} with unreadable body for {}: {}", status, ticker, e))
        })?;
        if let Some(error) = parsed.chart.error {
            return Err(EngineError::provider("yahoo", format!("{} - {}", error.code, error.description)));
        }

        let chart = parsed
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| EngineError::provider("yahoo", format!("No chart result for {}", ticker)))?;
        let timestamps = chart.timestamp.unwrap_or_default();
        let quote = chart
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::provider("yahoo", format!("No quote data for {}", ticker)))?;

        let candles = timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| {
                // Rows with any missing field are dropped.
                let open = quote.open.get(i).copied().flatten()?;
                let high = quote.high.get(i).copied().flatten()?;
                let low = quote.low.get(i).copied().flatten()?;
                let close = quote.close.get(i).copied().flatten()?;
                let volume = quote.volume.get(i).copied().flatten()?;
                let timestamp = DateTime::from_timestamp(*ts, 0)?;
                Some(Candle { symbol: request.symbol.clone(), timestamp, open, high, low, close, volume })
            })
            .collect();
        Ok(candles)
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn source(&self) -> DataSource {
        DataSource::Yahoo
    }

    fn supports(&self, _symbol: &str, interval: Interval) -> bool {
        Self::interval_code(interval).is_some()
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Candle>, EngineError> {
        let interval = Self::interval_code(request.interval).ok_or_else(|| {
            EngineError::provider("yahoo", format!("Interval {} is not served by Yahoo", request.interval))
        })?;

        let mut last_error = None;
        for ticker in Self::symbol_alternatives(&request.symbol) {
            tracing::debug!(symbol = %request.symbol, %ticker, "Trying Yahoo ticker");
            match self.fetch_ticker(&ticker, request, interval).await {
                Ok(candles) if !candles.is_empty() => {
                    tracing::info!(symbol = %request.symbol, %ticker, count = candles.len(), "Fetched data from Yahoo");
                    return Ok(candles);
                }
                Ok(_) => {
                    tracing::warn!(symbol = %request.symbol, %ticker, "Yahoo returned no rows");
                    last_error = Some(EngineError::provider("yahoo", format!("No rows returned for {}", ticker)));
                }
                Err(e) => {
                    tracing::warn!(symbol = %request.symbol, %ticker, error = %e, "Yahoo ticker failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| EngineError::provider("yahoo", "No tickers to try")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(symbol: &str, interval: Interval) -> FetchRequest {
        FetchRequest::new(
            symbol,
            interval,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        )
    }

    fn chart_body() -> serde_json::Value {
        json!({
            "chart": {
                "result": [{
                    "meta": {"symbol": "BTC-USD"},
                    "timestamp": [1704067200, 1704070800, 1704074400],
                    "indicators": {"quote": [{
                        "open":   [100.0, 101.0, null],
                        "high":   [102.0, 103.0, 104.0],
                        "low":    [99.0, 100.0, 101.0],
                        "close":  [101.0, 102.0, 103.0],
                        "volume": [10, 20, 30]
                    }]}
                }],
                "error": null
            }
        })
    }

    fn provider(server: &MockServer) -> YahooProvider {
        YahooProvider::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_parses_and_drops_null_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/BTC-USD"))
            .and(query_param("interval", "1h"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body()))
            .mount(&server)
            .await;

        let candles = provider(&server).fetch(&request("BTC-USD", Interval::Hour1)).await.unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].symbol, "BTC-USD");
        assert_eq!(candles[1].close, 102.0);
        assert_eq!(candles[1].volume, 20.0);
    }

    #[tokio::test]
    async fn test_falls_through_symbol_alternatives() {
        let server = MockServer::start().await;
        let not_found = json!({"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}});
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/BTC-USD"))
            .respond_with(ResponseTemplate::new(404).set_body_json(not_found))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/BTCUSD=X"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body()))
            .mount(&server)
            .await;

        let candles = provider(&server).fetch(&request("BTC-USD", Interval::Hour1)).await.unwrap();
        assert_eq!(candles.len(), 2);
    }

    #[tokio::test]
    async fn test_surfaces_yahoo_error() {
        let server = MockServer::start().await;
        let not_found = json!({"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}});
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(not_found))
            .mount(&server)
            .await;

        let err = provider(&server).fetch(&request("ZZZZ", Interval::Day1)).await.unwrap_err();
        assert!(err.to_string().contains("delisted"));
    }

    #[tokio::test]
    async fn test_four_hour_interval_unsupported() {
        let server = MockServer::start().await;
        let p = provider(&server);
        assert!(!p.supports("AAPL", Interval::Hour4));
        assert!(p.fetch(&request("AAPL", Interval::Hour4)).await.is_err());
    }

    #[test]
    fn test_symbol_alternatives() {
        assert_eq!(YahooProvider::symbol_alternatives("ETH-USD"), vec!["ETH-USD", "ETHUSD=X", "ETH=F"]);
        assert_eq!(YahooProvider::symbol_alternatives("AAPL"), vec!["AAPL"]);
    }
}
