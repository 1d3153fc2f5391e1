// In-memory cache of fetched market data, shared across requests.
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use shared::models::{Candle, DataSource, Interval, MarketData};
use std::collections::HashMap;

#[derive(Default)]
pub struct MarketDataStore {
    data: HashMap<String, HashMap<Interval, MarketData>>,
}

impl MarketDataStore {
    pub fn new() -> Self {
        MarketDataStore { data: HashMap::new() }
    }

    /// Merges `new_candles` into the series, keeping it sorted and unique by timestamp.
    /// The latest source wins.
    pub fn add_candles(&mut self, symbol: &str, interval: Interval, source: DataSource, new_candles: Vec<Candle>) -> Result<()> {
        if let Some(bad) = new_candles.iter().find(|c| c.symbol != symbol) {
            bail!("Candle for '{}' cannot be stored under '{}'", bad.symbol, symbol);
        }
        let symbol_data = self.data.entry(symbol.to_string()).or_default();
        let series = symbol_data.entry(interval).or_insert_with(|| MarketData {
            symbol: symbol.to_string(),
            interval,
            source,
            candles: Vec::new(),
        });

        series.source = source;
        // Newer values replace older ones at the same timestamp.
        let mut merged = new_candles;
        merged.extend(series.candles.drain(..));
        merged.sort_by_key(|c| c.timestamp);
        merged.dedup_by_key(|c| c.timestamp);
        series.candles = merged;

        Ok(())
    }

    pub fn get_candles(
        &self,
        symbol: &str,
        interval: Interval,
        from_timestamp: Option<DateTime<Utc>>,
        to_timestamp: Option<DateTime<Utc>>,
    ) -> Option<Vec<Candle>> {
        self.get_series(symbol, interval).map(|series| {
            series
                .candles
                .iter()
                .filter(|c| from_timestamp.map_or(true, |start| c.timestamp >= start))
                .filter(|c| to_timestamp.map_or(true, |end| c.timestamp <= end))
                .cloned()
                .collect()
        })
    }

    pub fn get_series(&self, symbol: &str, interval: Interval) -> Option<&MarketData> {
        self.data.get(symbol).and_then(|symbol_data| symbol_data.get(&interval))
    }

    /// Returns the cached slice when it fully covers `[from, to]`.
    pub fn covering(&self, symbol: &str, interval: Interval, from: DateTime<Utc>, to: DateTime<Utc>) -> Option<MarketData> {
        let series = self.get_series(symbol, interval)?;
        let first = series.candles.first()?;
        let last = series.candles.last()?;
        if first.timestamp > from || last.timestamp + interval.duration() < to {
            return None;
        }
        Some(MarketData {
            symbol: series.symbol.clone(),
            interval,
            source: series.source,
            candles: series
                .candles
                .iter()
                .filter(|c| c.timestamp >= from && c.timestamp <= to)
                .cloned()
                .collect(),
        })
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}
