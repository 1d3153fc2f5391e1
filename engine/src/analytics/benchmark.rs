use super::performance::{price_returns, BenchmarkComparison, PerformanceAnalysis, PerformanceAnalyzer, TimedReturn};
use super::stats;
use crate::backtest::BacktestResult;
use crate::data::{DataFetcher, FetchRequest};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::models::{Candle, DataSource, Interval};

const FRONTIER_CORRELATIONS: [f64; 5] = [0.0, 0.3, 0.5, 0.7, 1.0];
const FRONTIER_STEPS: usize = 11;

pub fn benchmark_name(symbol: &str) -> &str {
    match symbol {
        "SPY" => "S&P 500 ETF",
        "QQQ" => "Nasdaq 100 ETF",
        "VTI" => "Total Stock Market ETF",
        "BTC-USD" => "Bitcoin",
        "ETH-USD" => "Ethereum",
        "GLD" => "Gold ETF",
        other => other,
    }
}

/// Index or ETF to compare `symbol` against.
pub fn get_appropriate_benchmark(symbol: &str) -> &'static str {
    let upper = symbol.to_uppercase();
    let contains_any = |needles: &[&str]| needles.iter().any(|n| upper.contains(n));
    if contains_any(&["BTC", "ETH", "CRYPTO"]) {
        "BTC-USD"
    } else if contains_any(&["AAPL", "GOOGL", "MSFT", "NVDA", "TSLA"]) {
        "QQQ"
    } else if contains_any(&["GLD", "GOLD", "SLV"]) {
        "GLD"
    } else {
        "SPY"
    }
}

/// Returns, risk and the per-bar series of one side of a comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnProfile {
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    #[serde(skip)]
    pub returns: Vec<TimedReturn>,
}

impl ReturnProfile {
    pub fn from_analysis(analysis: &PerformanceAnalysis, result: &BacktestResult) -> Self {
        Self {
            total_return: analysis.basic_metrics.total_return,
            annualized_return: analysis.basic_metrics.annualized_return,
            volatility: analysis.risk_metrics.volatility,
            sharpe_ratio: analysis.risk_metrics.sharpe_ratio.unwrap_or(0.0),
            max_drawdown: analysis.risk_metrics.max_drawdown,
            returns: super::performance::timed_returns(result),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuyAndHold {
    pub benchmark_symbol: Option<String>,
    pub benchmark_name: Option<String>,
    pub initial_capital: f64,
    pub shares_bought: f64,
    pub start_price: f64,
    pub end_price: f64,
    pub commission_paid: f64,
    pub period_days: i64,
    pub period_years: f64,
    pub final_value: f64,
    #[serde(flatten)]
    pub profile: ReturnProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BuyAndHold {
    fn empty(initial_capital: f64, error: impl Into<String>) -> Self {
        Self { initial_capital, final_value: initial_capital, error: Some(error.into()), ..Self::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawdownComparison {
    pub strategy_dd: f64,
    pub benchmark_dd: f64,
    pub difference: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub excess_return: f64,
    pub return_ratio: f64,
    pub sharpe_difference: f64,
    pub volatility_ratio: f64,
    pub information_ratio: f64,
    pub drawdown_comparison: DrawdownComparison,
    /// "outperformed" or "underperformed".
    pub return_performance: String,
    /// "more efficient" or "less efficient".
    pub risk_efficiency: String,
    pub strategy: ReturnProfile,
    pub benchmark: ReturnProfile,
    /// Bar-by-bar statistics over the timestamps both series share.
    pub relative: Option<BenchmarkComparison>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub r#return: f64,
    pub volatility: f64,
    pub strategy_weight: f64,
    pub correlation: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EfficientFrontier {
    pub frontier_points: Vec<FrontierPoint>,
    pub optimal_portfolio: Option<FrontierPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkInfo {
    pub symbol: String,
    pub name: String,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub benchmark_info: BenchmarkInfo,
    /// Buy-and-hold of the traded instrument itself.
    pub buy_and_hold: BuyAndHold,
    pub benchmark_performance: BuyAndHold,
    pub comparison_analysis: Option<StrategyComparison>,
    pub efficient_frontier: Option<EfficientFrontier>,
    pub summary: String,
    pub recommendations: Vec<String>,
}

pub struct BenchmarkCalculator {
    analyzer: PerformanceAnalyzer,
}

impl Default for BenchmarkCalculator {
    fn default() -> Self {
        Self { analyzer: PerformanceAnalyzer::default() }
    }
}

impl BenchmarkCalculator {
    pub fn for_interval(interval: Interval) -> Self {
        Self { analyzer: PerformanceAnalyzer::for_interval(interval) }
    }

    /// Buys at the first close and sells at the last, paying commission both ways.
    pub fn calculate_buy_and_hold(&self, candles: &[Candle], initial_capital: f64, commission: f64) -> BuyAndHold {
        let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
            return BuyAndHold::empty(initial_capital, "No data available");
        };
        let shares_bought = initial_capital * (1.0 - commission) / first.close;
        let final_value = shares_bought * last.close * (1.0 - commission);
        let period_days = (last.timestamp - first.timestamp).num_days();
        let period_years = (period_days as f64 / 365.25).max(1.0 / 365.25);

        let returns = price_returns(candles);
        let values: Vec<f64> = returns.iter().map(|(_, r)| *r).collect();
        let ppy = self.analyzer.periods_per_year;
        let growth = final_value / initial_capital;

        BuyAndHold {
            benchmark_symbol: None,
            benchmark_name: None,
            initial_capital,
            shares_bought,
            start_price: first.close,
            end_price: last.close,
            commission_paid: initial_capital * commission + final_value * commission,
            period_days,
            period_years,
            final_value,
            profile: ReturnProfile {
                total_return: (growth - 1.0) * 100.0,
                annualized_return: (growth.powf(1.0 / period_years) - 1.0) * 100.0,
                volatility: stats::std_dev(&values) * ppy.sqrt() * 100.0,
                sharpe_ratio: stats::sharpe_ratio(&values, self.analyzer.risk_free_rate, ppy).unwrap_or(0.0),
                max_drawdown: stats::drawdown(&stats::cumulative(&values)).max_pct,
                returns,
            },
            error: None,
        }
    }

    /// Buy-and-hold of `symbol` over the period. Fetch failures and synthetic fallback data are recorded in `error`.
    #[allow(clippy::too_many_arguments)]
    pub async fn calculate_market_benchmark(
        &self,
        fetcher: &DataFetcher,
        symbol: &str,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
        initial_capital: f64,
        commission: f64,
    ) -> BuyAndHold {
        let request = FetchRequest::new(symbol, interval, start, end);
        let mut result = match fetcher.fetch(&request).await {
            Ok(data) if data.source == DataSource::Synthetic => {
                tracing::warn!(symbol, "Only synthetic data for benchmark, skipping comparison");
                BuyAndHold::empty(initial_capital, format!("No market data available for benchmark {}", symbol))
            }
            Ok(data) if !data.candles.is_empty() => self.calculate_buy_and_hold(&data.candles, initial_capital, commission),
            Ok(_) => BuyAndHold::empty(initial_capital, format!("No data available for {}", symbol)),
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Benchmark data unavailable");
                BuyAndHold::empty(initial_capital, format!("Error calculating benchmark: {}", e))
            }
        };
        result.benchmark_symbol = Some(symbol.to_string());
        result.benchmark_name = Some(benchmark_name(symbol).to_string());
        result
    }

    pub fn compare_with_strategy(&self, strategy: &ReturnProfile, benchmark: &ReturnProfile) -> StrategyComparison {
        let excess_return = strategy.total_return - benchmark.total_return;
        let sharpe_difference = strategy.sharpe_ratio - benchmark.sharpe_ratio;
        let relative = self.analyzer.benchmark_comparison(&strategy.returns, &benchmark.returns);
        StrategyComparison {
            excess_return,
            return_ratio: ratio(strategy.total_return, benchmark.total_return),
            sharpe_difference,
            volatility_ratio: ratio(strategy.volatility, benchmark.volatility),
            information_ratio: relative.as_ref().map(|r| r.information_ratio).unwrap_or(0.0),
            drawdown_comparison: DrawdownComparison {
                strategy_dd: strategy.max_drawdown,
                benchmark_dd: benchmark.max_drawdown,
                difference: strategy.max_drawdown - benchmark.max_drawdown,
            },
            return_performance: if excess_return > 0.0 { "outperformed" } else { "underperformed" }.to_string(),
            risk_efficiency: if sharpe_difference > 0.0 { "more efficient" } else { "less efficient" }.to_string(),
            strategy: strategy.clone(),
            benchmark: benchmark.clone(),
            relative,
        }
    }

    /// Two-asset mixes of strategy and benchmark over a grid of assumed correlations.
    pub fn calculate_efficient_frontier_position(&self, strategy: &ReturnProfile, benchmark: &ReturnProfile) -> EfficientFrontier {
        let (sr, sv) = (strategy.annualized_return / 100.0, strategy.volatility / 100.0);
        let (br, bv) = (benchmark.annualized_return / 100.0, benchmark.volatility / 100.0);

        let mut frontier_points = Vec::with_capacity(FRONTIER_CORRELATIONS.len() * FRONTIER_STEPS);
        for correlation in FRONTIER_CORRELATIONS {
            for step in 0..FRONTIER_STEPS {
                let w = step as f64 / (FRONTIER_STEPS - 1) as f64;
                let port_return = w * sr + (1.0 - w) * br;
                let variance = w * w * sv * sv + (1.0 - w) * (1.0 - w) * bv * bv + 2.0 * w * (1.0 - w) * correlation * sv * bv;
                frontier_points.push(FrontierPoint {
                    r#return: port_return * 100.0,
                    volatility: variance.max(0.0).sqrt() * 100.0,
                    strategy_weight: w,
                    correlation,
                });
            }
        }

        let rf = self.analyzer.risk_free_rate;
        let sharpe = |p: &FrontierPoint| (p.r#return / 100.0 - rf) / (p.volatility / 100.0);
        let optimal_portfolio = frontier_points
            .iter()
            .filter(|p| p.volatility > 0.0)
            .copied()
            .max_by(|a, b| sharpe(a).total_cmp(&sharpe(b)));

        EfficientFrontier { frontier_points, optimal_portfolio }
    }

    /// Picks a benchmark for the run's symbol, fetches it and compares.
    pub async fn create_benchmark_report(
        &self,
        result: &BacktestResult,
        analysis: &PerformanceAnalysis,
        fetcher: &DataFetcher,
    ) -> BenchmarkReport {
        let config = &result.config;
        let symbol = get_appropriate_benchmark(&config.symbol);
        let benchmark = self
            .calculate_market_benchmark(
                fetcher,
                symbol,
                config.interval,
                config.start_date,
                config.end_date,
                config.initial_capital,
                config.commission,
            )
            .await;
        let buy_and_hold = self.calculate_buy_and_hold(&result.candles, config.initial_capital, config.commission);

        let strategy = ReturnProfile::from_analysis(analysis, result);
        let (comparison_analysis, efficient_frontier) = if benchmark.error.is_none() {
            (
                Some(self.compare_with_strategy(&strategy, &benchmark.profile)),
                Some(self.calculate_efficient_frontier_position(&strategy, &benchmark.profile)),
            )
        } else {
            (None, None)
        };

        BenchmarkReport {
            benchmark_info: BenchmarkInfo {
                symbol: symbol.to_string(),
                name: benchmark_name(symbol).to_string(),
                period: format!("{} to {}", config.start_date, config.end_date),
            },
            summary: comparison_summary(comparison_analysis.as_ref()),
            recommendations: comparison_recommendations(comparison_analysis.as_ref()),
            buy_and_hold,
            benchmark_performance: benchmark,
            comparison_analysis,
            efficient_frontier,
        }
    }
}

fn ratio(a: f64, b: f64) -> f64 {
    if b != 0.0 {
        a / b
    } else {
        0.0
    }
}

pub fn comparison_summary(comparison: Option<&StrategyComparison>) -> String {
    let Some(c) = comparison else {
        return "Unable to generate comparison summary.".to_string();
    };
    let excess = c.excess_return;
    let performance = if excess > 5.0 {
        format!("significantly outperformed the benchmark by {:.1}%", excess)
    } else if excess > 0.0 {
        format!("outperformed the benchmark by {:.1}%", excess)
    } else if excess > -5.0 {
        format!("slightly underperformed the benchmark by {:.1}%", excess.abs())
    } else {
        format!("significantly underperformed the benchmark by {:.1}%", excess.abs())
    };
    let risk = match c.sharpe_difference {
        d if d > 0.2 => "with much better risk-adjusted returns",
        d if d > 0.0 => "with better risk-adjusted returns",
        d if d > -0.2 => "with similar risk-adjusted returns",
        _ => "with worse risk-adjusted returns",
    };
    format!("The strategy {} {}.", performance, risk)
}

pub fn comparison_recommendations(comparison: Option<&StrategyComparison>) -> Vec<String> {
    let Some(c) = comparison else {
        return vec!["Unable to generate recommendations due to insufficient data.".to_string()];
    };
    let mut recommendations = Vec::new();
    if c.excess_return <= 0.0 {
        recommendations.push("Consider improving strategy returns as it underperformed the benchmark");
    }
    if c.sharpe_difference <= 0.0 {
        recommendations.push("Focus on improving risk-adjusted returns (Sharpe ratio)");
    }
    if c.volatility_ratio > 1.5 {
        recommendations.push("Strategy has high volatility - consider risk management techniques");
    }
    if c.excess_return > 0.0 && c.sharpe_difference > 0.0 {
        recommendations.push("Strategy shows good performance - consider position sizing optimization");
    }
    recommendations.push("Consider combining strategy with benchmark allocation for portfolio optimization");
    recommendations.into_iter().map(String::from).collect()
}
