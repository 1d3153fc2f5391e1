use super::narrator::{narrate_insights, ReportNarrator};
use crate::analytics::benchmark::BenchmarkReport;
use crate::analytics::performance::trade_metrics;
use crate::analytics::{stats, PerformanceAnalysis, PerformanceAnalyzer, SignalSummary};
use crate::backtest::{BacktestConfig, BacktestResult};
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::models::DataSource;
use shared::utils::{format_currency, format_percent};
use std::collections::BTreeMap;
use std::path::Path;

const VWR_TAU: f64 = 2.0;
const VWR_SDEV_MAX: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicPerformance {
    pub starting_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub total_profit_loss: f64,
    pub strategy_params: BTreeMap<String, f64>,
    pub data_period: String,
    pub interval: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnsMetrics {
    /// Log return over the whole run.
    pub total_return: f64,
    /// Log return per bar.
    pub average_return: f64,
    /// `exp(average_return * bars_per_year) - 1`.
    pub annual_return: f64,
    /// `annual_return` in percent.
    pub annualized_return: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: f64,
    /// Longest drawdown in bars.
    pub max_drawdown_period: usize,
    pub max_drawdown_money: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    pub total_trades: usize,
    pub open_trades: usize,
    pub closed_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemQuality {
    /// System Quality Number; `None` below two closed trades.
    pub sqn: Option<f64>,
    pub sqn_trades: usize,
    /// Variability-Weighted Return.
    pub vwr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub basic_performance: BasicPerformance,
    pub returns: ReturnsMetrics,
    pub risk: RiskSummary,
    pub trades: TradeSummary,
    pub system_quality: SystemQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_return: String,
    pub final_value: String,
    pub total_trades: usize,
    pub win_rate: String,
    pub sharpe_ratio: String,
    pub max_drawdown: String,
}

impl ReportSummary {
    fn rows(&self) -> [(&'static str, String); 6] {
        [
            ("Total Return", self.total_return.clone()),
            ("Final Value", self.final_value.clone()),
            ("Total Trades", self.total_trades.to_string()),
            ("Win Rate", self.win_rate.clone()),
            ("Sharpe Ratio", self.sharpe_ratio.clone()),
            ("Max Drawdown", self.max_drawdown.clone()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingReport {
    pub generated_at: DateTime<Utc>,
    pub configuration: BacktestConfig,
    pub metrics: PerformanceMetrics,
    pub ai_insights: String,
    pub recommendations: Vec<String>,
    pub summary: ReportSummary,
    pub data_source: DataSource,
    /// Who wrote `ai_insights`: `"template"` or the model name.
    pub narrator: String,
    pub analysis: PerformanceAnalysis,
    pub signals: SignalSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkReport>,
}

impl TradingReport {
    pub fn save_report(&self, path: &Path) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), symbol = %self.configuration.symbol, "Report saved");
        Ok(())
    }

    pub fn render_text(&self) -> String {
        let heavy = "=".repeat(60);
        let light = "-".repeat(40);
        let mut out = format!("\n{heavy}\nTRADING STRATEGY PERFORMANCE REPORT\n{heavy}\n");
        out.push_str(&format!("\nGenerated: {}\n", self.generated_at.to_rfc3339()));
        out.push_str(&format!("Strategy: {}\n", self.configuration.strategy_name));
        out.push_str(&format!("Symbol: {} ({})\n", self.configuration.symbol, self.data_source.as_str()));

        out.push_str(&format!("\n📊 EXECUTIVE SUMMARY\n{light}\n"));
        for (label, value) in self.summary.rows() {
            out.push_str(&format!("{}: {}\n", label, value));
        }

        out.push_str(&format!("\n🤖 AI INSIGHTS\n{light}\n{}\n", self.ai_insights));

        out.push_str(&format!("\n💡 RECOMMENDATIONS\n{light}\n"));
        for (i, rec) in self.recommendations.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, rec));
        }
        if let Some(benchmark) = &self.benchmark {
            out.push_str(&format!("\n📈 BENCHMARK ({})\n{light}\n{}\n", benchmark.benchmark_info.symbol, benchmark.summary));
        }
        out.push_str(&format!("\n{heavy}\n"));
        out
    }
}

/// Turns one backtest result into metrics, templated text and the final report.
pub struct ReportGenerator<'a> {
    result: &'a BacktestResult,
    periods_per_year: f64,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(result: &'a BacktestResult) -> Self {
        Self { result, periods_per_year: result.config.interval.bars_per_year() }
    }

    pub fn generate_performance_metrics(&self) -> PerformanceMetrics {
        let result = self.result;
        let config = &result.config;
        let mut values = Vec::with_capacity(result.equity_curve.len() + 1);
        values.push(config.initial_capital);
        values.extend(result.equity_curve.iter().map(|p| p.value));

        let basic_performance = BasicPerformance {
            starting_value: config.initial_capital,
            final_value: result.final_value,
            total_return: result.total_return_pct(),
            total_profit_loss: result.final_value - config.initial_capital,
            strategy_params: result.resolved_params.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            data_period: format!("{} to {}", config.start_date, config.end_date),
            interval: config.interval.to_string(),
        };

        let returns = self.returns_metrics(&values);
        let dd = stats::drawdown(&values);
        let risk = RiskSummary {
            sharpe_ratio: stats::sharpe_ratio(&result.returns(), crate::analytics::performance::DEFAULT_RISK_FREE_RATE, self.periods_per_year),
            max_drawdown: dd.max_pct,
            max_drawdown_period: dd.max_len,
            max_drawdown_money: dd.max_money,
        };

        let closed = trade_metrics(&result.trades);
        let open_trades = usize::from(result.open_position_size > 0.0);
        let trades = TradeSummary {
            total_trades: closed.total_trades + open_trades,
            open_trades,
            closed_trades: closed.total_trades,
            winning_trades: closed.winning_trades,
            losing_trades: closed.losing_trades,
            win_rate: closed.win_rate,
            avg_win: closed.avg_win,
            avg_loss: closed.avg_loss,
            best_trade: if closed.total_trades > 0 { closed.best_trade } else { 0.0 },
            worst_trade: if closed.total_trades > 0 { closed.worst_trade } else { 0.0 },
            max_consecutive_wins: closed.max_consecutive_wins,
            max_consecutive_losses: closed.max_consecutive_losses,
        };

        let system_quality = SystemQuality {
            sqn: system_quality_number(&result.trades.iter().map(|t| t.net_pnl).collect::<Vec<_>>()),
            sqn_trades: result.trades.len(),
            vwr: variability_weighted_return(&values, self.periods_per_year),
        };

        PerformanceMetrics { basic_performance, returns, risk, trades, system_quality }
    }

    fn returns_metrics(&self, values: &[f64]) -> ReturnsMetrics {
        let (Some(first), Some(last)) = (values.first(), values.last()) else {
            return ReturnsMetrics::default();
        };
        let bars = values.len().saturating_sub(1);
        if bars == 0 || *first <= 0.0 || *last <= 0.0 {
            return ReturnsMetrics::default();
        }
        let total_return = (last / first).ln();
        let average_return = total_return / bars as f64;
        let annual_return = (average_return * self.periods_per_year).exp() - 1.0;
        ReturnsMetrics { total_return, average_return, annual_return, annualized_return: annual_return * 100.0 }
    }

    /// Runs the full analysis, asks `narrator` for insights and assembles the report.
    pub async fn generate_full_report(
        &self,
        narrator: Option<&dyn ReportNarrator>,
        benchmark: Option<BenchmarkReport>,
    ) -> TradingReport {
        let metrics = self.generate_performance_metrics();
        let templated = generate_insights(&metrics);
        let narration = narrate_insights(narrator, &self.result.config, &metrics, &templated).await;
        let analysis = PerformanceAnalyzer::for_interval(self.result.config.interval).analyze(self.result);

        TradingReport {
            generated_at: Utc::now(),
            configuration: self.result.config.clone(),
            recommendations: generate_recommendations(&metrics),
            summary: generate_summary(&metrics),
            ai_insights: narration.text,
            narrator: narration.narrator,
            data_source: self.result.source,
            signals: SignalSummary::from_result(self.result),
            analysis,
            benchmark,
            metrics,
        }
    }
}

/// `sqrt(n) * mean / std` of per-trade pnl.
pub fn system_quality_number(pnls: &[f64]) -> Option<f64> {
    if pnls.len() < 2 {
        return None;
    }
    let sd = stats::std_dev(pnls);
    (sd > 0.0).then(|| (pnls.len() as f64).sqrt() * stats::mean(pnls) / sd)
}

/// Annualised return penalised by how far the value path strays from
/// constant compounding at the average log rate.
pub fn variability_weighted_return(values: &[f64], periods_per_year: f64) -> f64 {
    let (Some(&p0), Some(&pn)) = (values.first(), values.last()) else {
        return 0.0;
    };
    let bars = values.len().saturating_sub(1);
    if bars == 0 || p0 <= 0.0 || pn <= 0.0 {
        return 0.0;
    }
    let ravg = (pn / p0).ln() / bars as f64;
    let rnorm100 = ((ravg * periods_per_year).exp() - 1.0) * 100.0;
    let deviations: Vec<f64> = values
        .iter()
        .enumerate()
        .map(|(i, v)| v / (p0 * (ravg * i as f64).exp()) - 1.0)
        .collect();
    let sdev = stats::std_dev(&deviations);
    rnorm100 * (1.0 - (sdev / VWR_SDEV_MAX).powf(VWR_TAU))
}

pub fn generate_insights(metrics: &PerformanceMetrics) -> String {
    let mut insights = Vec::new();
    let total_return = metrics.basic_performance.total_return;
    if total_return > 0.0 {
        insights.push(format!("✅ The strategy generated a positive return of {:.2}%", total_return));
    } else {
        insights.push(format!("⚠️ The strategy resulted in a loss of {:.2}%", total_return.abs()));
    }

    if let Some(sharpe) = metrics.risk.sharpe_ratio.filter(|s| *s > 1.0) {
        insights.push(format!("📊 Good risk-adjusted returns with Sharpe ratio of {:.2}", sharpe));
    }
    if metrics.risk.max_drawdown > 20.0 {
        insights.push(format!("⚠️ High maximum drawdown of {:.2}% indicates significant risk", metrics.risk.max_drawdown));
    }

    let win_rate = metrics.trades.win_rate;
    if win_rate > 60.0 {
        insights.push(format!("🎯 Strong win rate of {:.2}%", win_rate));
    } else if win_rate < 40.0 {
        insights.push(format!("📉 Low win rate of {:.2}% needs improvement", win_rate));
    }
    if metrics.trades.total_trades < 10 {
        insights.push("⚠️ Low number of trades may not be statistically significant".to_string());
    }
    insights.join("\n")
}

pub fn generate_recommendations(metrics: &PerformanceMetrics) -> Vec<String> {
    let mut recommendations = Vec::new();
    if metrics.basic_performance.total_return < 0.0 {
        recommendations.push("Consider adjusting strategy parameters or trying a different strategy");
    }
    if metrics.risk.max_drawdown > 25.0 {
        recommendations.push("Implement stop-loss mechanisms to reduce maximum drawdown");
    }
    if metrics.trades.win_rate < 50.0 {
        recommendations.push("Review entry conditions to improve win rate");
    }
    if metrics.trades.total_trades < 5 {
        recommendations.push("Strategy may be too conservative - consider loosening entry conditions");
    }
    recommendations.into_iter().map(String::from).collect()
}

pub fn generate_summary(metrics: &PerformanceMetrics) -> ReportSummary {
    ReportSummary {
        total_return: format_percent(metrics.basic_performance.total_return),
        final_value: format_currency(metrics.basic_performance.final_value),
        total_trades: metrics.trades.total_trades,
        win_rate: format_percent(metrics.trades.win_rate),
        sharpe_ratio: metrics.risk.sharpe_ratio.map(|s| format!("{:.4}", s)).unwrap_or_else(|| "N/A".to_string()),
        max_drawdown: format_percent(metrics.risk.max_drawdown),
    }
}
