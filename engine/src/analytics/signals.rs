use super::stats;
use crate::backtest::BacktestResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::models::SignalSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    BuyToOpen,
    SellToClose,
}

/// Chart marker for a trade entry or exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeMarker {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub kind: MarkerKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub total_signals: usize,
    /// Signals per bar.
    pub signal_frequency: f64,
    pub avg_signal_price: f64,
    pub buy_executions: usize,
    pub sell_executions: usize,
    pub average_buy_price: f64,
    pub average_sell_price: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub avg_pnl: f64,
    pub total_pnl: f64,
    pub buy_markers: Vec<TradeMarker>,
    pub sell_markers: Vec<TradeMarker>,
}

impl SignalSummary {
    pub fn from_result(result: &BacktestResult) -> Self {
        let count = |side: SignalSide| result.signals.iter().filter(|s| s.side == side).count();
        let buy_signals = count(SignalSide::Buy);
        let sell_signals = count(SignalSide::Sell);
        let total_signals = buy_signals + sell_signals;
        let signal_prices: Vec<f64> = result.signals.iter().map(|s| s.price).collect();

        let fill_prices = |side: SignalSide| -> Vec<f64> {
            result.executions.iter().filter(|e| e.side == side).map(|e| e.price).collect()
        };
        let buys = fill_prices(SignalSide::Buy);
        let sells = fill_prices(SignalSide::Sell);

        let pnls: Vec<f64> = result.trades.iter().map(|t| t.net_pnl).collect();
        let winning_trades = result.trades.iter().filter(|t| t.is_win()).count();
        let total_trades = result.trades.len();

        let buy_markers = result
            .trades
            .iter()
            .map(|t| TradeMarker { timestamp: t.entry_time, price: t.entry_price, kind: MarkerKind::BuyToOpen })
            .collect();
        let sell_markers = result
            .trades
            .iter()
            .map(|t| TradeMarker { timestamp: t.exit_time, price: t.exit_price, kind: MarkerKind::SellToClose })
            .collect();

        Self {
            buy_signals,
            sell_signals,
            total_signals,
            signal_frequency: if result.candles.is_empty() { 0.0 } else { total_signals as f64 / result.candles.len() as f64 },
            avg_signal_price: stats::mean(&signal_prices),
            buy_executions: buys.len(),
            sell_executions: sells.len(),
            average_buy_price: stats::mean(&buys),
            average_sell_price: stats::mean(&sells),
            total_trades,
            winning_trades,
            losing_trades: total_trades - winning_trades,
            win_rate: if total_trades > 0 { winning_trades as f64 / total_trades as f64 * 100.0 } else { 0.0 },
            avg_pnl: stats::mean(&pnls),
            total_pnl: pnls.iter().sum(),
            buy_markers,
            sell_markers,
        }
    }
}
