use super::stats;
use crate::backtest::{BacktestResult, ClosedTrade};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{Candle, Interval};
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;
pub const DEFAULT_ROLLING_WINDOW: usize = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicMetrics {
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub total_profit_loss: f64,
    pub days_traded: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub volatility: f64,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub max_drawdown: f64,
    pub value_at_risk_95: f64,
    pub expected_shortfall_95: f64,
    pub calmar_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Gross profit over gross loss; `None` without losing trades.
    pub profit_factor: Option<f64>,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub avg_trade_duration: f64,
    pub total_commission: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub mean_return: f64,
    pub std_return: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub min_return: f64,
    pub max_return: f64,
}

impl PeriodStats {
    fn from_returns(returns: &[f64]) -> Option<Self> {
        if returns.is_empty() {
            return None;
        }
        Some(Self {
            mean_return: stats::mean(returns) * 100.0,
            std_return: stats::std_dev(returns) * 100.0,
            skewness: stats::skewness(returns),
            kurtosis: stats::excess_kurtosis(returns),
            min_return: returns.iter().copied().fold(f64::INFINITY, f64::min) * 100.0,
            max_return: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max) * 100.0,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeAnalysis {
    pub per_bar: Option<PeriodStats>,
    pub weekly: Option<PeriodStats>,
    pub monthly: Option<PeriodStats>,
    pub best_period: f64,
    pub worst_period: f64,
    pub positive_periods: usize,
    pub negative_periods: usize,
    pub flat_periods: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSummary {
    pub method: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub outlier_count: usize,
    pub outlier_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionAnalysis {
    /// Keyed `"1%"`, `"5%"`, ... `"99%"`, values in percent.
    pub percentiles: BTreeMap<String, f64>,
    pub skewness: f64,
    pub kurtosis: f64,
    pub outliers: OutlierSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingMetrics {
    pub window: usize,
    pub rolling_return: Vec<Option<f64>>,
    pub rolling_volatility: Vec<Option<f64>>,
    pub rolling_sharpe: Vec<Option<f64>>,
    pub rolling_max_drawdown: Vec<Option<f64>>,
    pub rolling_return_mean: f64,
    pub rolling_volatility_mean: f64,
    pub rolling_sharpe_mean: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStats {
    pub best_month: f64,
    pub worst_month: f64,
    pub positive_months: usize,
    pub negative_months: usize,
    pub avg_monthly_return: f64,
    pub monthly_volatility: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAnalysis {
    /// year -> month (1..=12) -> compounded return in percent.
    pub monthly_matrix: BTreeMap<i32, BTreeMap<u32, f64>>,
    pub monthly_stats: MonthlyStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationAnalysis {
    pub correlation: f64,
    pub beta: f64,
    pub alpha: f64,
    pub r_squared: f64,
    pub tracking_error: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub excess_return: f64,
    pub excess_volatility: f64,
    pub information_ratio: f64,
    pub tracking_error: f64,
    pub hit_rate: f64,
    pub up_capture: f64,
    pub down_capture: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAnalysis {
    pub basic_metrics: BasicMetrics,
    pub risk_metrics: RiskMetrics,
    pub trade_metrics: TradeMetrics,
    pub time_analysis: TimeAnalysis,
    pub distribution_analysis: Option<DistributionAnalysis>,
    pub rolling_metrics: Option<RollingMetrics>,
    pub monthly_analysis: MonthlyAnalysis,
    pub correlations: Option<CorrelationAnalysis>,
}

/// Timestamped per-bar return.
pub type TimedReturn = (DateTime<Utc>, f64);

pub fn timed_returns(result: &BacktestResult) -> Vec<TimedReturn> {
    result.equity_curve.iter().map(|p| p.timestamp).zip(result.returns()).collect()
}

/// Close-to-close returns; the first bar has none.
pub fn price_returns(candles: &[Candle]) -> Vec<TimedReturn> {
    candles
        .windows(2)
        .filter(|w| w[0].close != 0.0)
        .map(|w| (w[1].timestamp, w[1].close / w[0].close - 1.0))
        .collect()
}

/// Pairs up the returns of two series on matching timestamps.
pub fn align(a: &[TimedReturn], b: &[TimedReturn]) -> (Vec<f64>, Vec<f64>) {
    let lookup: HashMap<DateTime<Utc>, f64> = b.iter().copied().collect();
    a.iter().filter_map(|(t, ra)| lookup.get(t).map(|rb| (*ra, *rb))).unzip()
}

pub struct PerformanceAnalyzer {
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
    pub rolling_window: usize,
}

impl Default for PerformanceAnalyzer {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            rolling_window: DEFAULT_ROLLING_WINDOW,
        }
    }
}

impl PerformanceAnalyzer {
    /// Annualises with the number of bars per year of `interval`.
    pub fn for_interval(interval: Interval) -> Self {
        Self { periods_per_year: interval.bars_per_year(), ..Self::default() }
    }

    pub fn analyze(&self, result: &BacktestResult) -> PerformanceAnalysis {
        let timed = timed_returns(result);
        let returns: Vec<f64> = timed.iter().map(|(_, r)| *r).collect();
        let market = price_returns(&result.candles);

        PerformanceAnalysis {
            basic_metrics: self.basic_metrics(result),
            risk_metrics: self.risk_metrics(&returns),
            trade_metrics: trade_metrics(&result.trades),
            time_analysis: time_analysis(&timed),
            distribution_analysis: distribution_analysis(&returns),
            rolling_metrics: self.rolling_metrics(&returns),
            monthly_analysis: monthly_analysis(&timed),
            correlations: self.correlation_analysis(&timed, &market),
        }
    }

    fn basic_metrics(&self, result: &BacktestResult) -> BasicMetrics {
        let initial_value = result.config.initial_capital;
        let final_value = result.final_value;
        let days = match (result.equity_curve.first(), result.equity_curve.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_days(),
            _ => 0,
        };
        let years = (days as f64 / 365.25).max(1.0 / 365.25);
        let growth = final_value / initial_value;
        BasicMetrics {
            initial_value,
            final_value,
            total_return: (growth - 1.0) * 100.0,
            annualized_return: if growth > 0.0 { (growth.powf(1.0 / years) - 1.0) * 100.0 } else { -100.0 },
            total_profit_loss: final_value - initial_value,
            days_traded: days,
        }
    }

    pub fn risk_metrics(&self, returns: &[f64]) -> RiskMetrics {
        if returns.is_empty() {
            return RiskMetrics::default();
        }
        let ppy = self.periods_per_year;
        let max_drawdown = stats::drawdown(&stats::cumulative(returns)).max_pct;
        let var = stats::quantile(returns, 0.05);
        let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= var).collect();
        let annual_mean = stats::mean(returns) * ppy * 100.0;

        RiskMetrics {
            volatility: stats::std_dev(returns) * ppy.sqrt() * 100.0,
            sharpe_ratio: stats::sharpe_ratio(returns, self.risk_free_rate, ppy),
            sortino_ratio: stats::sortino_ratio(returns, self.risk_free_rate, ppy),
            max_drawdown,
            value_at_risk_95: var * 100.0,
            expected_shortfall_95: stats::mean(&tail) * 100.0,
            calmar_ratio: (max_drawdown > 0.0).then(|| annual_mean / max_drawdown),
        }
    }

    fn rolling_metrics(&self, returns: &[f64]) -> Option<RollingMetrics> {
        let window = self.rolling_window;
        if window < 2 || returns.len() < window {
            return None;
        }
        let ppy = self.periods_per_year;
        let windows = |f: &dyn Fn(&[f64]) -> Option<f64>| -> Vec<Option<f64>> {
            (0..returns.len()).map(|i| if i + 1 >= window { f(&returns[i + 1 - window..=i]) } else { None }).collect()
        };
        let rolling_return = windows(&|w| Some(stats::mean(w) * ppy * 100.0));
        let rolling_volatility = windows(&|w| Some(stats::std_dev(w) * ppy.sqrt() * 100.0));
        let rolling_sharpe: Vec<Option<f64>> = rolling_return
            .iter()
            .zip(&rolling_volatility)
            .map(|(r, v)| match (r, v) {
                (Some(r), Some(v)) if *v > 0.0 => Some(r / v),
                _ => None,
            })
            .collect();
        let rolling_max_drawdown = windows(&|w| Some(-stats::drawdown(&stats::cumulative(w)).max_pct));

        let mean_of = |series: &[Option<f64>]| {
            let defined: Vec<f64> = series.iter().flatten().copied().collect();
            stats::mean(&defined)
        };
        Some(RollingMetrics {
            window,
            rolling_return_mean: mean_of(&rolling_return),
            rolling_volatility_mean: mean_of(&rolling_volatility),
            rolling_sharpe_mean: mean_of(&rolling_sharpe),
            rolling_return,
            rolling_volatility,
            rolling_sharpe,
            rolling_max_drawdown,
        })
    }

    /// Strategy returns against the traded instrument's own returns.
    pub fn correlation_analysis(&self, strategy: &[TimedReturn], market: &[TimedReturn]) -> Option<CorrelationAnalysis> {
        let (s, m) = align(strategy, market);
        if s.len() < 2 {
            return None;
        }
        let correlation = stats::correlation(&s, &m);
        let market_var = stats::std_dev(&m).powi(2);
        let beta = if market_var > 0.0 { stats::covariance(&s, &m) / market_var } else { 0.0 };
        let ppy = self.periods_per_year;
        let market_return = stats::mean(&m) * ppy;
        let strategy_return = stats::mean(&s) * ppy;
        let excess: Vec<f64> = s.iter().zip(&m).map(|(a, b)| a - b).collect();
        Some(CorrelationAnalysis {
            correlation,
            beta,
            alpha: strategy_return - (self.risk_free_rate + beta * (market_return - self.risk_free_rate)),
            r_squared: correlation * correlation,
            tracking_error: stats::std_dev(&excess) * ppy.sqrt() * 100.0,
        })
    }

    pub fn benchmark_comparison(&self, strategy: &[TimedReturn], benchmark: &[TimedReturn]) -> Option<BenchmarkComparison> {
        let (s, b) = align(strategy, benchmark);
        if s.is_empty() {
            return None;
        }
        let ppy = self.periods_per_year;
        let excess: Vec<f64> = s.iter().zip(&b).map(|(a, b)| a - b).collect();
        let total = |r: &[f64]| r.iter().map(|x| 1.0 + x).product::<f64>() - 1.0;
        let excess_sd = stats::std_dev(&excess);
        Some(BenchmarkComparison {
            excess_return: (total(&s) - total(&b)) * 100.0,
            excess_volatility: (stats::std_dev(&s) - stats::std_dev(&b)) * ppy.sqrt() * 100.0,
            information_ratio: if excess_sd > 0.0 { stats::mean(&excess) / excess_sd * ppy.sqrt() } else { 0.0 },
            tracking_error: excess_sd * ppy.sqrt() * 100.0,
            hit_rate: excess.iter().filter(|e| **e > 0.0).count() as f64 / excess.len() as f64 * 100.0,
            up_capture: capture_ratio(&s, &b, true),
            down_capture: capture_ratio(&s, &b, false),
        })
    }
}

fn capture_ratio(strategy: &[f64], benchmark: &[f64], up: bool) -> f64 {
    let (s, b): (Vec<f64>, Vec<f64>) = strategy
        .iter()
        .zip(benchmark)
        .filter(|(_, b)| if up { **b > 0.0 } else { **b < 0.0 })
        .map(|(s, b)| (*s, *b))
        .unzip();
    let benchmark_avg = stats::mean(&b);
    if s.is_empty() || benchmark_avg == 0.0 {
        return 0.0;
    }
    stats::mean(&s) / benchmark_avg * 100.0
}

pub fn trade_metrics(trades: &[ClosedTrade]) -> TradeMetrics {
    if trades.is_empty() {
        return TradeMetrics::default();
    }
    let pnls: Vec<f64> = trades.iter().map(|t| t.net_pnl).collect();
    let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p <= 0.0).collect();
    let gross_profit: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().map(|l| l.abs()).sum();

    let (mut max_wins, mut max_losses, mut run_wins, mut run_losses) = (0, 0, 0, 0);
    for pnl in &pnls {
        if *pnl > 0.0 {
            run_wins += 1;
            run_losses = 0;
        } else {
            run_losses += 1;
            run_wins = 0;
        }
        max_wins = max_wins.max(run_wins);
        max_losses = max_losses.max(run_losses);
    }

    TradeMetrics {
        total_trades: trades.len(),
        winning_trades: wins.len(),
        losing_trades: losses.len(),
        win_rate: wins.len() as f64 / trades.len() as f64 * 100.0,
        avg_win: stats::mean(&wins),
        avg_loss: stats::mean(&losses),
        profit_factor: (gross_loss > 0.0).then(|| gross_profit / gross_loss),
        best_trade: pnls.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        worst_trade: pnls.iter().copied().fold(f64::INFINITY, f64::min),
        max_consecutive_wins: max_wins,
        max_consecutive_losses: max_losses,
        avg_trade_duration: trades.iter().map(|t| t.bars_held as f64).sum::<f64>() / trades.len() as f64,
        total_commission: trades.iter().map(|t| t.commission).sum(),
    }
}

/// Sums returns sharing a bucket key, in order of first appearance.
fn bucketed<K: Ord + Copy>(timed: &[TimedReturn], key: impl Fn(&DateTime<Utc>) -> K, combine: impl Fn(&[f64]) -> f64) -> Vec<(K, f64)> {
    let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for (t, r) in timed {
        groups.entry(key(t)).or_default().push(*r);
    }
    groups.into_iter().map(|(k, v)| (k, combine(&v))).collect()
}

fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

fn compound(values: &[f64]) -> f64 {
    values.iter().map(|r| 1.0 + r).product::<f64>() - 1.0
}

pub fn time_analysis(timed: &[TimedReturn]) -> TimeAnalysis {
    let returns: Vec<f64> = timed.iter().map(|(_, r)| *r).collect();
    if returns.is_empty() {
        return TimeAnalysis::default();
    }
    let weekly: Vec<f64> = bucketed(timed, |t| (t.iso_week().year(), t.iso_week().week()), sum).into_iter().map(|(_, r)| r).collect();
    let monthly: Vec<f64> = bucketed(timed, |t| (t.year(), t.month()), sum).into_iter().map(|(_, r)| r).collect();
    TimeAnalysis {
        per_bar: PeriodStats::from_returns(&returns),
        weekly: PeriodStats::from_returns(&weekly),
        monthly: PeriodStats::from_returns(&monthly),
        best_period: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max) * 100.0,
        worst_period: returns.iter().copied().fold(f64::INFINITY, f64::min) * 100.0,
        positive_periods: returns.iter().filter(|r| **r > 0.0).count(),
        negative_periods: returns.iter().filter(|r| **r < 0.0).count(),
        flat_periods: returns.iter().filter(|r| **r == 0.0).count(),
    }
}

pub fn distribution_analysis(returns: &[f64]) -> Option<DistributionAnalysis> {
    if returns.is_empty() {
        return None;
    }
    let percentiles = [1, 5, 25, 50, 75, 95, 99]
        .into_iter()
        .map(|p| (format!("{}%", p), stats::quantile(returns, p as f64 / 100.0) * 100.0))
        .collect();

    let q1 = stats::quantile(returns, 0.25);
    let q3 = stats::quantile(returns, 0.75);
    let iqr = q3 - q1;
    let (lower, upper) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    let outlier_count = returns.iter().filter(|r| **r < lower || **r > upper).count();

    Some(DistributionAnalysis {
        percentiles,
        skewness: stats::skewness(returns),
        kurtosis: stats::excess_kurtosis(returns),
        outliers: OutlierSummary {
            method: "IQR".to_string(),
            lower_bound: lower * 100.0,
            upper_bound: upper * 100.0,
            outlier_count,
            outlier_percentage: outlier_count as f64 / returns.len() as f64 * 100.0,
        },
    })
}

pub fn monthly_analysis(timed: &[TimedReturn]) -> MonthlyAnalysis {
    let monthly = bucketed(timed, |t| (t.year(), t.month()), compound);
    if monthly.is_empty() {
        return MonthlyAnalysis::default();
    }
    let mut monthly_matrix: BTreeMap<i32, BTreeMap<u32, f64>> = BTreeMap::new();
    for ((year, month), r) in &monthly {
        monthly_matrix.entry(*year).or_default().insert(*month, r * 100.0);
    }
    let values: Vec<f64> = monthly.iter().map(|(_, r)| *r).collect();
    MonthlyAnalysis {
        monthly_matrix,
        monthly_stats: MonthlyStats {
            best_month: values.iter().copied().fold(f64::NEG_INFINITY, f64::max) * 100.0,
            worst_month: values.iter().copied().fold(f64::INFINITY, f64::min) * 100.0,
            positive_months: values.iter().filter(|r| **r > 0.0).count(),
            negative_months: values.iter().filter(|r| **r < 0.0).count(),
            avg_monthly_return: stats::mean(&values) * 100.0,
            monthly_volatility: stats::std_dev(&values) * 100.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::engine::test_support::{config, market_data};
    use crate::backtest::BacktestEngine;
    use crate::strategies::StrategyRegistry;
    use chrono::{Duration, TimeZone};

    fn trade(net_pnl: f64, bars_held: usize) -> ClosedTrade {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ClosedTrade {
            entry_time: t,
            exit_time: t,
            entry_price: 100.0,
            exit_price: 100.0,
            size: 1.0,
            gross_pnl: net_pnl,
            commission: 0.5,
            net_pnl,
            return_pct: net_pnl,
            bars_held,
        }
    }

    #[test]
    fn test_trade_metrics() {
        let trades = vec![trade(10.0, 2), trade(20.0, 4), trade(-5.0, 1), trade(-10.0, 3), trade(-1.0, 5), trade(4.0, 1)];
        let m = trade_metrics(&trades);
        assert_eq!(m.total_trades, 6);
        assert_eq!(m.winning_trades, 3);
        assert_eq!(m.win_rate, 50.0);
        assert!((m.profit_factor.unwrap() - 34.0 / 16.0).abs() < 1e-12);
        assert_eq!(m.best_trade, 20.0);
        assert_eq!(m.worst_trade, -10.0);
        assert_eq!(m.max_consecutive_wins, 2);
        assert_eq!(m.max_consecutive_losses, 3);
        assert_eq!(m.avg_trade_duration, 16.0 / 6.0);
        assert_eq!(m.total_commission, 3.0);
        assert_eq!(trade_metrics(&[trade(1.0, 1)]).profit_factor, None);
    }

    #[test]
    fn test_monthly_matrix_compounds_within_month() {
        let jan = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap();
        let timed = vec![(jan, 0.1), (jan + Duration::days(1), 0.1), (feb, -0.05)];
        let monthly = monthly_analysis(&timed);
        assert!((monthly.monthly_matrix[&2024][&1] - 21.0).abs() < 1e-9);
        assert!((monthly.monthly_matrix[&2024][&2] + 5.0).abs() < 1e-9);
        assert_eq!(monthly.monthly_stats.positive_months, 1);
        assert_eq!(monthly.monthly_stats.negative_months, 1);
    }

    #[test]
    fn test_benchmark_comparison_aligns_on_timestamps() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let at = |d: i64| t0 + Duration::days(d);
        let strategy = vec![(at(0), 0.02), (at(1), -0.01), (at(2), 0.03)];
        let benchmark = vec![(at(1), -0.02), (at(2), 0.01), (at(3), 0.05)];
        let cmp = PerformanceAnalyzer::default().benchmark_comparison(&strategy, &benchmark).unwrap();
        assert_eq!(cmp.hit_rate, 100.0);
        assert!((cmp.up_capture - 300.0).abs() < 1e-9);
        assert!((cmp.down_capture - 50.0).abs() < 1e-9);
        assert!(cmp.excess_return > 0.0);
        assert!(PerformanceAnalyzer::default().benchmark_comparison(&strategy, &[]).is_none());
    }

    #[test]
    fn test_analyze_full_run() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + (i as f64 / 6.0).sin() * 8.0 + i as f64 * 0.1).collect();
        let data = market_data(&closes);
        let registry = StrategyRegistry::new("unused");
        let (strategy, _) = registry.create("SMA Crossover", &HashMap::from([("sma_period".to_string(), 10.0)])).unwrap();
        let result = BacktestEngine::run(&config("SMA Crossover"), &data, strategy).unwrap();

        let analysis = PerformanceAnalyzer::for_interval(Interval::Day1).analyze(&result);
        assert!(analysis.trade_metrics.total_trades > 0);
        assert!((analysis.basic_metrics.final_value - result.final_value).abs() < 1e-9);
        assert!(analysis.risk_metrics.max_drawdown >= 0.0);
        assert!(analysis.risk_metrics.value_at_risk_95 <= 0.0);
        let rolling = analysis.rolling_metrics.unwrap();
        assert_eq!(rolling.rolling_return.len(), 120);
        assert!(rolling.rolling_return[28].is_none() && rolling.rolling_return[29].is_some());
        assert_eq!(analysis.distribution_analysis.unwrap().percentiles.len(), 7);
        assert!(analysis.correlations.unwrap().correlation.abs() <= 1.0 + 1e-9);
        let days = analysis.basic_metrics.days_traded;
        assert_eq!(days, 4);
        assert!(serde_json::to_string(&analysis.risk_metrics).is_ok());
    }
}
