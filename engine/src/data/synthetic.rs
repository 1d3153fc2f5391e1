// Deterministic sample data used when no real provider answers.
use super::provider::{is_crypto_symbol, FetchRequest, MarketDataProvider};
use crate::error::EngineError;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::models::{Candle, DataSource};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub const MAX_SYNTHETIC_BARS: usize = 5_000;

pub struct SyntheticProvider {
    /// Annualised volatility of the random walk.
    pub annual_volatility: f64,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self { annual_volatility: 0.6 }
    }
}

impl SyntheticProvider {
    fn seed_for(symbol: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        symbol.hash(&mut hasher);
        hasher.finish()
    }

    fn starting_price(symbol: &str, rng: &mut StdRng) -> f64 {
        if symbol.starts_with("BTC") {
            rng.gen_range(25_000.0..65_000.0)
        } else if is_crypto_symbol(symbol) {
            rng.gen_range(1_500.0..4_000.0)
        } else {
            rng.gen_range(20.0..500.0)
        }
    }

    /// Standard normal sample (Box-Muller).
    fn gaussian(rng: &mut StdRng) -> f64 {
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    pub fn generate(&self, request: &FetchRequest) -> Vec<Candle> {
        let mut rng = StdRng::seed_from_u64(Self::seed_for(&request.symbol));
        let step = request.interval.duration();
        let sigma = self.annual_volatility / request.interval.bars_per_year().sqrt();

        let end = request.end_time();
        let mut timestamp = request.start_time();
        let mut price = Self::starting_price(&request.symbol, &mut rng);
        let mut candles = Vec::new();

        while timestamp < end && candles.len() < MAX_SYNTHETIC_BARS {
            let open = price;
            let close = open * (sigma * Self::gaussian(&mut rng)).exp();
            let wick_up = open.max(close) * (1.0 + rng.gen_range(0.0..sigma.max(1e-4)));
            let wick_down = open.min(close) * (1.0 - rng.gen_range(0.0..sigma.max(1e-4)));
            let volume = rng.gen_range(100.0..10_000.0);

            candles.push(Candle {
                symbol: request.symbol.clone(),
                timestamp,
                open,
                high: wick_up,
                low: wick_down.max(open.min(close) * 0.5),
                close,
                volume,
            });
            price = close;
            timestamp += step;
        }
        candles
    }
}

#[async_trait]
impl MarketDataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Candle>, EngineError> {
        let candles = self.generate(request);
        if candles.is_empty() {
            return Err(EngineError::MarketDataError(format!(
                "Cannot generate sample data for an empty range ({} to {})",
                request.start, request.end
            )));
        }
        tracing::info!(symbol = %request.symbol, count = candles.len(), "Generated synthetic market data");
        Ok(candles)
    }
}
