use super::broker::{Broker, ClosedTrade, Execution};
use crate::data::{DataFetcher, FetchRequest};
use crate::error::EngineError;
use crate::strategies::{Strategy, StrategyContext, StrategyRegistry};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{Candle, DataSource, Indicator, Interval, MarketData, TradeSignal};
use std::collections::HashMap;

/// Everything needed to reproduce one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub symbol: String,
    pub interval: Interval,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    /// Fraction of traded value, e.g. 0.001 for 0.1%.
    pub commission: f64,
    pub strategy_name: String,
    #[serde(default)]
    pub strategy_params: HashMap<String, f64>,
    /// Fraction of cash committed by all-in strategies.
    #[serde(default = "default_position_size")]
    pub position_size: f64,
}

fn default_position_size() -> f64 {
    0.95
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.symbol.trim().is_empty() {
            return Err(EngineError::ConfigError("Symbol must not be empty".to_string()));
        }
        if self.start_date > self.end_date {
            return Err(EngineError::ConfigError(format!(
                "Start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(EngineError::ConfigError(format!("Initial capital must be positive, got {}", self.initial_capital)));
        }
        if !(0.0..0.1).contains(&self.commission) {
            return Err(EngineError::ConfigError(format!("Commission must be in [0, 0.1), got {}", self.commission)));
        }
        if !(self.position_size > 0.0 && self.position_size <= 1.0) {
            return Err(EngineError::ConfigError(format!("Position size must be in (0, 1], got {}", self.position_size)));
        }
        Ok(())
    }

    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest::new(&self.symbol, self.interval, self.start_date, self.end_date)
    }

    pub fn for_symbol(&self, symbol: &str) -> Self {
        Self { symbol: symbol.to_string(), ..self.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub cash: f64,
    pub position: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub run_id: String,
    pub config: BacktestConfig,
    /// Parameters after defaults were applied.
    pub resolved_params: HashMap<String, f64>,
    pub source: DataSource,
    pub candles: Vec<Candle>,
    pub trades: Vec<ClosedTrade>,
    pub executions: Vec<Execution>,
    pub signals: Vec<TradeSignal>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_value: f64,
    pub open_position_size: f64,
    pub indicators: Vec<Indicator>,
}

impl BacktestResult {
    pub fn total_return_pct(&self) -> f64 {
        (self.final_value - self.config.initial_capital) / self.config.initial_capital * 100.0
    }

    /// Per-bar simple returns of the equity curve.
    pub fn returns(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.equity_curve.len() + 1);
        values.push(self.config.initial_capital);
        values.extend(self.equity_curve.iter().map(|p| p.value));
        values.windows(2).map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 }).collect()
    }
}

pub struct BacktestEngine;

impl BacktestEngine {
    /// Runs `strategy` over `data`. Orders created on a bar fill at the next bar's open;
    /// anything still pending after the last bar is cancelled and an open position is
    /// valued at the last close.
    pub fn run(config: &BacktestConfig, data: &MarketData, mut strategy: Box<dyn Strategy>) -> Result<BacktestResult, EngineError> {
        config.validate()?;
        let candles = &data.candles;
        if candles.is_empty() {
            return Err(EngineError::SimulationError(format!("No candles to backtest for {}", config.symbol)));
        }

        tracing::info!(
            symbol = %config.symbol,
            strategy = strategy.name(),
            bars = candles.len(),
            capital = config.initial_capital,
            "Starting backtest"
        );
        strategy.init(candles)?;

        let mut broker = Broker::new(config.initial_capital, config.commission);
        let mut signals = Vec::new();
        let mut equity_curve = Vec::with_capacity(candles.len());

        for (bar, candle) in candles.iter().enumerate() {
            broker.process_pending(bar, candle);

            let mut ctx = StrategyContext::new(bar, candles, broker.cash(), broker.position(), config.position_size);
            ctx.has_pending_order = broker.has_pending();
            strategy.on_bar(&mut ctx);
            let (orders, bar_signals) = ctx.into_parts();
            broker.submit(orders);
            signals.extend(bar_signals);

            equity_curve.push(EquityPoint {
                timestamp: candle.timestamp,
                value: broker.value(candle.close),
                cash: broker.cash(),
                position: broker.position(),
            });
        }
        broker.cancel_pending();

        let last_close = candles[candles.len() - 1].close;
        let final_value = broker.value(last_close);
        let open_position_size = broker.position();
        let indicators = strategy.indicators();
        let (executions, trades) = broker.into_records();

        tracing::info!(
            symbol = %config.symbol,
            final_value,
            trades = trades.len(),
            executions = executions.len(),
            signals = signals.len(),
            "Backtest finished"
        );

        Ok(BacktestResult {
            run_id: uuid::Uuid::new_v4().to_string(),
            config: config.clone(),
            resolved_params: HashMap::new(),
            source: data.source,
            candles: candles.clone(),
            trades,
            executions,
            signals,
            equity_curve,
            final_value,
            open_position_size,
            indicators,
        })
    }

    /// Fetches data for `config`, builds the strategy from the registry and runs it.
    pub async fn fetch_and_run(
        config: &BacktestConfig,
        registry: &StrategyRegistry,
        fetcher: &DataFetcher,
    ) -> Result<BacktestResult, EngineError> {
        config.validate()?;
        let (strategy, params) = registry.create(&config.strategy_name, &config.strategy_params)?;
        let data = fetcher.fetch(&config.fetch_request()).await?;
        let mut result = Self::run(config, &data, strategy)?;
        result.resolved_params = params.as_map().iter().map(|(k, v)| (k.clone(), *v)).collect();
        Ok(result)
    }
}

/// Runs `base` once per symbol. A failing symbol does not stop the others.
pub async fn run_batch(
    base: &BacktestConfig,
    symbols: &[String],
    registry: &StrategyRegistry,
    fetcher: &DataFetcher,
) -> Vec<(String, Result<BacktestResult, EngineError>)> {
    let mut results = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let config = base.for_symbol(symbol);
        let result = BacktestEngine::fetch_and_run(&config, registry, fetcher).await;
        if let Err(e) = &result {
            tracing::error!(symbol = %symbol, error = %e, "Backtest failed");
        }
        results.push((symbol.clone(), result));
    }
    results
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::data::synthetic::SyntheticProvider;
    use shared::models::SignalSide;

    struct BuyFirstSellThird;

    impl Strategy for BuyFirstSellThird {
        fn name(&self) -> &str {
            "scripted"
        }
        fn init(&mut self, _candles: &[Candle]) -> Result<(), EngineError> {
            Ok(())
        }
        fn buy_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
            (bar == 0).then(|| "first bar".to_string())
        }
        fn sell_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
            (bar == 2).then(|| "third bar".to_string())
        }
    }

    #[test]
    fn test_orders_fill_at_next_open() {
        let mut data = market_data(&[100.0, 100.0, 120.0, 120.0]);
        data.candles[1].open = 101.0;
        data.candles[3].open = 119.0;
        let mut cfg = config("scripted");
        cfg.commission = 0.0;

        let result = BacktestEngine::run(&cfg, &data, Box::new(BuyFirstSellThird)).unwrap();

        assert_eq!(result.signals.len(), 2);
        assert_eq!(result.signals[0].price, 100.0);
        assert_eq!(result.executions[0].price, 101.0);
        assert_eq!(result.executions[0].bar, 1);
        assert_eq!(result.executions[1].side, SignalSide::Sell);
        assert_eq!(result.executions[1].price, 119.0);

        let size = 10_000.0 * 0.95 / 100.0;
        assert!((result.executions[0].size - size).abs() < 1e-9);
        let expected = 10_000.0 + size * (119.0 - 101.0);
        assert!((result.final_value - expected).abs() < 1e-6);
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.equity_curve.len(), 4);
        assert_eq!(result.open_position_size, 0.0);
    }

    #[test]
    fn test_open_position_is_marked_to_market() {
        struct BuyLast;
        impl Strategy for BuyLast {
            fn name(&self) -> &str {
                "last"
            }
            fn init(&mut self, _candles: &[Candle]) -> Result<(), EngineError> {
                Ok(())
            }
            fn buy_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
                (bar == 0).then(|| "buy".to_string())
            }
            fn sell_reason(&self, _bar: usize, _candles: &[Candle]) -> Option<String> {
                None
            }
        }

        let data = market_data(&[100.0, 100.0, 110.0]);
        let result = BacktestEngine::run(&config("last"), &data, Box::new(BuyLast)).unwrap();
        assert_eq!(result.executions.len(), 1);
        assert!(result.trades.is_empty());
        assert!(result.open_position_size > 0.0);
        let expected = result.equity_curve[2].cash + result.open_position_size * 110.0;
        assert!((result.final_value - expected).abs() < 1e-9);
        assert!(result.final_value > 10_000.0);
    }

    #[test]
    fn test_returns_follow_equity_curve() {
        let data = market_data(&[100.0, 100.0, 120.0, 120.0]);
        let mut cfg = config("scripted");
        cfg.commission = 0.0;
        let result = BacktestEngine::run(&cfg, &data, Box::new(BuyFirstSellThird)).unwrap();
        let returns = result.returns();
        assert_eq!(returns.len(), 4);
        assert_eq!(returns[0], 0.0);
        let compounded: f64 = returns.iter().map(|r| 1.0 + r).product();
        assert!((compounded * 10_000.0 - result.final_value).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_config_and_empty_data() {
        let mut cfg = config("scripted");
        cfg.initial_capital = 0.0;
        assert!(BacktestEngine::run(&cfg, &market_data(&[1.0]), Box::new(BuyFirstSellThird)).is_err());

        let err = BacktestEngine::run(&config("scripted"), &market_data(&[]), Box::new(BuyFirstSellThird)).unwrap_err();
        assert!(matches!(err, EngineError::SimulationError(_)));
    }

    #[tokio::test]
    async fn test_run_batch_keeps_going_per_symbol() {
        let registry = StrategyRegistry::new("unused");
        let fetcher = DataFetcher::new(Vec::new(), Some(SyntheticProvider::default()));
        let mut base = config("SMA Crossover");
        base.end_date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

        let symbols = vec!["AAPL".to_string(), "MSFT".to_string()];
        let results = run_batch(&base, &symbols, &registry, &fetcher).await;
        assert_eq!(results.len(), 2);
        for (symbol, result) in &results {
            let result = result.as_ref().unwrap();
            assert_eq!(&result.config.symbol, symbol);
            assert_eq!(result.source, DataSource::Synthetic);
            assert_eq!(result.resolved_params["sma_period"], 15.0);
        }

        base.strategy_name = "Missing".to_string();
        let results = run_batch(&base, &symbols, &registry, &fetcher).await;
        assert!(results.iter().all(|(_, r)| r.is_err()));
    }
}
