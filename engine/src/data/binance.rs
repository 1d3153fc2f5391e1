// Binance US klines provider, used for crypto symbols
use super::provider::{is_crypto_symbol, FetchRequest, MarketDataProvider};
use crate::error::EngineError;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde_json::Value;
use shared::models::{Candle, DataSource, Interval};
use std::time::Duration;

const KLINE_LIMIT: u32 = 1000;

pub struct BinanceProvider {
    client: Client,
    base_url: String,
}

impl BinanceProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EngineError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// `BTC-USD` -> `BTCUSDT`; USD quotes settle in USDT on the exchange.
    pub fn exchange_symbol(symbol: &str) -> String {
        let upper = symbol.to_uppercase();
        match upper.split_once('-') {
            Some((base, "USD")) => format!("{}USDT", base),
            Some((base, quote)) => format!("{}{}", base, quote),
            None => upper,
        }
    }

    pub fn interval_code(interval: Interval) -> &'static str {
        match interval {
            Interval::Week1 => "1w",
            Interval::Month1 => "1M",
            other => other.as_str(),
        }
    }

    fn parse_price(row: &[Value], idx: usize) -> Option<f64> {
        match row.get(idx)? {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

#[async_trait]
impl MarketDataProvider for BinanceProvider {
    fn name(&self) -> &str {
        "binance"
    }

    fn source(&self) -> DataSource {
        DataSource::Binance
    }

    fn supports(&self, symbol: &str, _interval: Interval) -> bool {
        is_crypto_symbol(symbol)
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Candle>, EngineError> {
        if !is_crypto_symbol(&request.symbol) {
            return Err(EngineError::provider("binance", format!("{} is not a crypto symbol", request.symbol)));
        }
        let url = format!("{}/api/v3/klines", self.base_url);
        let symbol = Self::exchange_symbol(&request.symbol);
        let start_ms = request.start_time().timestamp_millis();
        let end_ms = request.end_time().timestamp_millis();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol.clone()),
                ("interval", Self::interval_code(request.interval).to_string()),
                ("startTime", start_ms.to_string()),
                ("endTime", end_ms.to_string()),
                ("limit", KLINE_LIMIT.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::provider("binance", format!("HTTP {} for {}: {}", status, symbol, body)));
        }

        let rows: Vec<Vec<Value>> = response.json().await?;
        let candles: Vec<Candle> = rows
            .iter()
            .filter_map(|row| {
                let open_time = row.first()?.as_i64()?;
                if open_time >= end_ms {
                    return None;
                }
                Some(Candle {
                    symbol: request.symbol.clone(),
                    timestamp: DateTime::from_timestamp_millis(open_time)?,
                    open: Self::parse_price(row, 1)?,
                    high: Self::parse_price(row, 2)?,
                    low: Self::parse_price(row, 3)?,
                    close: Self::parse_price(row, 4)?,
                    volume: Self::parse_price(row, 5)?,
                })
            })
            .collect();

        tracing::info!(symbol = %request.symbol, exchange_symbol = %symbol, count = candles.len(), "Fetched data from Binance");
        Ok(candles)
    }
}
