// Results area: charts, summary cards and the tabbed detail views for the selected run.
#![allow(non_snake_case)]
use super::chart::{EquityChart, PriceChart};
use crate::config::AppConfig;
use crate::state::{AppState, ResultsTab};
use chrono::{TimeZone, Utc};
use dioxus::prelude::*;
use engine::report::TradingReport;
use engine::services::{BacktestSummary, Trade};
use shared::utils::{format_currency, format_percent};

pub type MetricRow = (String, String);
pub type MetricSection = (String, Vec<MetricRow>);

fn ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{:.2}", v))
}

fn row(label: &str, value: String) -> MetricRow {
    (label.to_string(), value)
}

pub fn format_timestamp(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis).single().map(|t| t.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_default()
}

/// Headline numbers shown as cards above the tabs.
pub fn summary_cards(summary: &BacktestSummary) -> Vec<MetricRow> {
    vec![
        row("Final Value", format_currency(summary.final_value)),
        row("Total Return", format_percent(summary.total_return_pct)),
        row("Sharpe Ratio", ratio(summary.sharpe_ratio)),
        row("Max Drawdown", format_percent(summary.max_drawdown_pct)),
        row("Trades", summary.total_trades.to_string()),
        row("Win Rate", format_percent(summary.win_rate)),
        row("Profit Factor", ratio(summary.profit_factor)),
        row("SQN", ratio(summary.sqn)),
    ]
}

/// Detail tables built from the decoded report.
pub fn metric_sections(report: &TradingReport) -> Vec<MetricSection> {
    let m = &report.metrics;
    let risk = &report.analysis.risk_metrics;
    let trades = &report.analysis.trade_metrics;

    let mut sections = vec![
        (
            "Returns".to_string(),
            vec![
                row("Starting Value", format_currency(m.basic_performance.starting_value)),
                row("Final Value", format_currency(m.basic_performance.final_value)),
                row("Total Return", format_percent(m.basic_performance.total_return)),
                row("Total P/L", format_currency(m.basic_performance.total_profit_loss)),
                row("Annualized Return", format_percent(m.returns.annualized_return)),
                row("Period", format!("{} ({})", m.basic_performance.data_period, m.basic_performance.interval)),
            ],
        ),
        (
            "Risk".to_string(),
            vec![
                row("Sharpe Ratio", ratio(m.risk.sharpe_ratio)),
                row("Sortino Ratio", ratio(risk.sortino_ratio)),
                row("Calmar Ratio", ratio(risk.calmar_ratio)),
                row("Volatility (annual)", format_percent(risk.volatility)),
                row("Max Drawdown", format_percent(m.risk.max_drawdown)),
                row("Max Drawdown ($)", format_currency(m.risk.max_drawdown_money)),
                row("Longest Drawdown", format!("{} bars", m.risk.max_drawdown_period)),
                row("VaR 95%", format_percent(risk.value_at_risk_95)),
                row("Expected Shortfall 95%", format_percent(risk.expected_shortfall_95)),
            ],
        ),
        (
            "Trades".to_string(),
            vec![
                row("Closed / Open", format!("{} / {}", m.trades.closed_trades, m.trades.open_trades)),
                row("Won / Lost", format!("{} / {}", m.trades.winning_trades, m.trades.losing_trades)),
                row("Win Rate", format_percent(m.trades.win_rate)),
                row("Average Win", format_currency(m.trades.avg_win)),
                row("Average Loss", format_currency(m.trades.avg_loss)),
                row("Profit Factor", ratio(trades.profit_factor)),
                row("Best / Worst", format!("{} / {}", format_currency(m.trades.best_trade), format_currency(m.trades.worst_trade))),
                row(
                    "Max Consecutive W / L",
                    format!("{} / {}", m.trades.max_consecutive_wins, m.trades.max_consecutive_losses),
                ),
                row("Average Duration", format!("{:.1} bars", trades.avg_trade_duration)),
                row("Commission Paid", format_currency(trades.total_commission)),
            ],
        ),
        (
            "System Quality".to_string(),
            vec![
                row("SQN", ratio(m.system_quality.sqn)),
                row("VWR", format!("{:.2}", m.system_quality.vwr)),
            ],
        ),
    ];

    if let Some(benchmark) = &report.benchmark {
        let mut rows = vec![
            row("Buy & Hold Return", format_percent(benchmark.buy_and_hold.profile.total_return)),
            row(
                &format!("{} Return", benchmark.benchmark_info.symbol),
                format_percent(benchmark.benchmark_performance.profile.total_return),
            ),
        ];
        if let Some(comparison) = &benchmark.comparison_analysis {
            rows.push(row("Excess Return", format_percent(comparison.excess_return)));
            rows.push(row("Information Ratio", format!("{:.2}", comparison.information_ratio)));
            rows.push(row("Verdict", format!("{}, {}", comparison.return_performance, comparison.risk_efficiency)));
        }
        sections.push(("Benchmark".to_string(), rows));
    }
    sections
}

#[component]
fn MetricTables(sections: Vec<MetricSection>) -> Element {
    rsx! {
        for (title, rows) in sections.iter() {
            div { key: "{title}",
                h3 { "{title}" }
                table {
                    tbody {
                        for (label, value) in rows.iter() {
                            tr { key: "{label}", td { "{label}" } td { "{value}" } }
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn TradesTable(trades: Vec<Trade>) -> Element {
    if trades.is_empty() {
        return rsx! { div { class: "placeholder", "No closed trades" } };
    }
    let rows: Vec<[String; 7]> = trades
        .iter()
        .map(|t| {
            [
                format_timestamp(t.entry_time),
                format_timestamp(t.exit_time),
                format!("{:.2}", t.entry_price),
                format!("{:.2}", t.exit_price),
                format!("{:.4}", t.size),
                format_currency(t.net_pnl),
                format_percent(t.return_pct),
            ]
        })
        .collect();
    rsx! {
        table {
            thead {
                tr {
                    th { "Entry" } th { "Exit" } th { "Entry Price" } th { "Exit Price" }
                    th { "Size" } th { "Net P/L" } th { "Return" }
                }
            }
            tbody {
                for (i, cells) in rows.iter().enumerate() {
                    tr { key: "{i}",
                        for cell in cells.iter() {
                            td { "{cell}" }
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn AiReport(narrative: String, narrator: String, recommendations: Vec<String>) -> Element {
    rsx! {
        h3 { "Insights" }
        div { class: "report", "{narrative}" }
        p { class: "placeholder", "Written by: {narrator}" }
        h3 { "Recommendations" }
        ol {
            for (i, rec) in recommendations.iter().enumerate() {
                li { key: "{i}", "{rec}" }
            }
        }
    }
}

#[component]
pub fn ResultsPanel() -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let config = use_context::<AppConfig>();
    let read = state.read();

    if read.running {
        return rsx! { div { class: "placeholder", "Running backtest..." } };
    }
    let Some(outcome) = read.current() else {
        return rsx! { div { class: "placeholder", "Configure a backtest in the sidebar and press Execute." } };
    };

    let symbols: Vec<(usize, String, bool)> =
        read.results.iter().enumerate().map(|(i, o)| (i, o.symbol.clone(), i == read.selected)).collect();
    let tab = read.tab;
    let response = match &outcome.response {
        Ok(response) => response.clone(),
        Err(message) => {
            let message = format!("{}: {}", outcome.symbol, message);
            drop(read);
            return rsx! {
                SymbolTabs { symbols }
                div { class: "error", "{message}" }
            };
        }
    };
    let sections = outcome.report.as_ref().map(metric_sections).unwrap_or_default();
    let benchmark_summary =
        outcome.report.as_ref().and_then(|r| r.benchmark.as_ref()).map(|b| b.summary.clone()).unwrap_or_default();
    drop(read);

    let cards = response.summary.as_ref().map(summary_cards).unwrap_or_default();
    let initial_capital = response.summary.as_ref().map_or(0.0, |s| s.initial_capital);
    let header = format!("{} · {} · run {}", response.symbol, response.data_source, response.run_id);
    let tabs: Vec<(ResultsTab, &str, &str)> =
        ResultsTab::ALL.iter().map(|t| (*t, t.label(), if *t == tab { "active" } else { "" })).collect();

    rsx! {
        SymbolTabs { symbols }
        p { class: "placeholder", style: "padding: 0; text-align: left;", "{header}" }
        PriceChart {
            candles: response.candles.clone(),
            signals: response.signals.clone(),
            indicators: response.indicators.clone(),
            chart: config.chart.clone(),
        }
        EquityChart { points: response.equity_curve.clone(), initial_capital, chart: config.chart.clone() }
        div { class: "tabs",
            for (t, label, class) in tabs {
                button {
                    key: "{label}",
                    class: "{class}",
                    onclick: move |_| state.write().tab = t,
                    "{label}"
                }
            }
        }
        {match tab {
            ResultsTab::Summary => rsx! {
                div { class: "cards",
                    for (label, value) in cards.iter() {
                        div { class: "card", key: "{label}",
                            div { class: "label", "{label}" }
                            div { class: "value", "{value}" }
                        }
                    }
                }
                if !benchmark_summary.is_empty() {
                    p { "{benchmark_summary}" }
                }
            },
            ResultsTab::Metrics => {
                if sections.is_empty() {
                    rsx! { div { class: "placeholder", "Detailed metrics are unavailable for this run." } }
                } else {
                    rsx! { MetricTables { sections } }
                }
            }
            ResultsTab::Trades => rsx! { TradesTable { trades: response.trades.clone() } },
            ResultsTab::Report => rsx! {
                AiReport {
                    narrative: response.narrative.clone(),
                    narrator: response.narrator.clone(),
                    recommendations: response.recommendations.clone(),
                }
            },
        }}
    }
}

#[component]
fn SymbolTabs(symbols: Vec<(usize, String, bool)>) -> Element {
    let mut state = use_context::<Signal<AppState>>();
    if symbols.len() < 2 {
        return None;
    }
    rsx! {
        div { class: "tabs",
            for (i, symbol, class) in symbols.into_iter().map(|(i, s, active)| (i, s, if active { "active" } else { "" })) {
                button {
                    key: "{symbol}",
                    class: "{class}",
                    onclick: move |_| state.write().selected = i,
                    "{symbol}"
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_cards_format_values() {
        let summary = BacktestSummary {
            initial_capital: 10_000.0,
            final_value: 11_234.5,
            total_return_pct: 12.346,
            sharpe_ratio: None,
            max_drawdown_pct: 4.2,
            total_trades: 7,
            win_rate: 57.14,
            profit_factor: Some(1.8),
            open_position_size: 0.0,
            sqn: None,
        };
        let cards = summary_cards(&summary);
        assert_eq!(cards[0], ("Final Value".to_string(), "$11,234.50".to_string()));
        assert_eq!(cards[1].1, "12.35%");
        assert_eq!(cards[2].1, "N/A");
        assert_eq!(cards[6].1, "1.80");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_704_067_200_000), "2024-01-01 00:00");
    }
}
