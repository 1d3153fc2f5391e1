use crate::strategies::OrderRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{Candle, SignalSide};

const EPSILON: f64 = 1e-9;

/// One filled order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub timestamp: DateTime<Utc>,
    pub bar: usize,
    pub side: SignalSide,
    pub price: f64,
    pub size: f64,
    pub value: f64,
    pub commission: f64,
}

/// A round trip from flat to flat, possibly built from several fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    /// Size-weighted average of the buy fills.
    pub entry_price: f64,
    /// Size-weighted average of the sell fills.
    pub exit_price: f64,
    pub size: f64,
    pub gross_pnl: f64,
    pub commission: f64,
    pub net_pnl: f64,
    pub return_pct: f64,
    pub bars_held: usize,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.net_pnl > 0.0
    }
}

#[derive(Debug, Default)]
struct OpenTrade {
    entry_time: Option<DateTime<Utc>>,
    entry_bar: usize,
    bought_size: f64,
    bought_value: f64,
    sold_size: f64,
    sold_value: f64,
    commission: f64,
}

/// Cash and a single long position. Orders wait for the next bar and fill at its open.
#[derive(Debug)]
pub struct Broker {
    cash: f64,
    commission_rate: f64,
    position: f64,
    pending: Vec<OrderRequest>,
    open_trade: OpenTrade,
    executions: Vec<Execution>,
    trades: Vec<ClosedTrade>,
}

impl Broker {
    pub fn new(cash: f64, commission_rate: f64) -> Self {
        Self {
            cash,
            commission_rate,
            position: 0.0,
            pending: Vec::new(),
            open_trade: OpenTrade::default(),
            executions: Vec::new(),
            trades: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn value(&self, price: f64) -> f64 {
        self.cash + self.position * price
    }

    pub fn submit(&mut self, orders: Vec<OrderRequest>) {
        self.pending.extend(orders);
    }

    /// Fills queued orders at `candle.open`, in submission order.
    pub fn process_pending(&mut self, bar: usize, candle: &Candle) {
        for order in std::mem::take(&mut self.pending) {
            match order.side {
                SignalSide::Buy => self.fill_buy(bar, candle, order.size),
                SignalSide::Sell => self.fill_sell(bar, candle, order.size),
            }
        }
    }

    /// Drops orders that never got a next bar.
    pub fn cancel_pending(&mut self) -> usize {
        let cancelled = self.pending.len();
        if cancelled > 0 {
            tracing::info!(cancelled, "Cancelling orders left pending at end of data");
        }
        self.pending.clear();
        cancelled
    }

    fn fill_buy(&mut self, bar: usize, candle: &Candle, size: f64) {
        let price = candle.open;
        let value = size * price;
        let commission = value * self.commission_rate;
        if value + commission > self.cash + EPSILON {
            tracing::warn!(
                bar,
                size,
                price,
                required = value + commission,
                cash = self.cash,
                "Buy order rejected: insufficient cash"
            );
            return;
        }

        self.cash -= value + commission;
        self.position += size;
        let trade = &mut self.open_trade;
        if trade.entry_time.is_none() {
            trade.entry_time = Some(candle.timestamp);
            trade.entry_bar = bar;
        }
        trade.bought_size += size;
        trade.bought_value += value;
        trade.commission += commission;
        self.record(bar, candle, SignalSide::Buy, size, value, commission);
    }

    fn fill_sell(&mut self, bar: usize, candle: &Candle, requested: f64) {
        let size = requested.min(self.position);
        if size <= EPSILON {
            tracing::warn!(bar, requested, "Sell order ignored: no open position");
            return;
        }
        if size < requested - EPSILON {
            tracing::debug!(bar, requested, size, "Sell order clipped to held position");
        }

        let price = candle.open;
        let value = size * price;
        let commission = value * self.commission_rate;
        self.cash += value - commission;
        self.position -= size;
        let trade = &mut self.open_trade;
        trade.sold_size += size;
        trade.sold_value += value;
        trade.commission += commission;
        self.record(bar, candle, SignalSide::Sell, size, value, commission);

        if self.position <= EPSILON {
            self.position = 0.0;
            self.close_trade(bar, candle.timestamp);
        }
    }

    fn record(&mut self, bar: usize, candle: &Candle, side: SignalSide, size: f64, value: f64, commission: f64) {
        tracing::debug!(bar, %side, price = candle.open, size, commission, cash = self.cash, "Order executed");
        self.executions.push(Execution {
            timestamp: candle.timestamp,
            bar,
            side,
            price: candle.open,
            size,
            value,
            commission,
        });
    }

    fn close_trade(&mut self, bar: usize, exit_time: DateTime<Utc>) {
        let trade = std::mem::take(&mut self.open_trade);
        let Some(entry_time) = trade.entry_time else {
            return;
        };
        let gross_pnl = trade.sold_value - trade.bought_value;
        let net_pnl = gross_pnl - trade.commission;
        let closed = ClosedTrade {
            entry_time,
            exit_time,
            entry_price: trade.bought_value / trade.bought_size,
            exit_price: trade.sold_value / trade.sold_size,
            size: trade.bought_size,
            gross_pnl,
            commission: trade.commission,
            net_pnl,
            return_pct: net_pnl / trade.bought_value * 100.0,
            bars_held: bar - trade.entry_bar,
        };
        tracing::info!(gross = closed.gross_pnl, net = closed.net_pnl, bars = closed.bars_held, "Trade closed");
        self.trades.push(closed);
    }

    pub fn executions(&self) -> &[Execution] {
        &self.executions
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    pub fn into_records(self) -> (Vec<Execution>, Vec<ClosedTrade>) {
        (self.executions, self.trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bar(i: i64, open: f64) -> Candle {
        Candle {
            symbol: "TEST".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i),
            open,
            high: open + 1.0,
            low: open - 1.0,
            close: open,
            volume: 1.0,
        }
    }

    fn order(side: SignalSide, size: f64) -> OrderRequest {
        OrderRequest { side, size }
    }

    #[test]
    fn test_round_trip_with_commission() {
        let mut broker = Broker::new(1_000.0, 0.01);
        broker.submit(vec![order(SignalSide::Buy, 5.0)]);
        broker.process_pending(1, &bar(1, 100.0));
        assert_eq!(broker.position(), 5.0);
        assert!((broker.cash() - 495.0).abs() < 1e-9);

        broker.submit(vec![order(SignalSide::Sell, 5.0)]);
        broker.process_pending(4, &bar(4, 110.0));
        assert_eq!(broker.position(), 0.0);
        assert!((broker.cash() - 1039.5).abs() < 1e-9);

        let trade = &broker.trades()[0];
        assert_eq!(trade.entry_price, 100.0);
        assert_eq!(trade.exit_price, 110.0);
        assert!((trade.gross_pnl - 50.0).abs() < 1e-9);
        assert!((trade.commission - 10.5).abs() < 1e-9);
        assert!((trade.net_pnl - 39.5).abs() < 1e-9);
        assert_eq!(trade.bars_held, 3);
        assert!(trade.is_win());
        assert_eq!(broker.executions().len(), 2);
    }

    #[test]
    fn test_buy_over_cash_is_rejected() {
        let mut broker = Broker::new(100.0, 0.001);
        broker.submit(vec![order(SignalSide::Buy, 1.0)]);
        broker.process_pending(1, &bar(1, 100.0));
        assert_eq!(broker.position(), 0.0);
        assert_eq!(broker.cash(), 100.0);
        assert!(broker.executions().is_empty());
        assert!(!broker.has_pending());
    }

    #[test]
    fn test_sell_is_clipped_and_lots_make_one_trade() {
        let mut broker = Broker::new(10_000.0, 0.0);
        broker.submit(vec![order(SignalSide::Buy, 1.0)]);
        broker.process_pending(1, &bar(1, 100.0));
        broker.submit(vec![order(SignalSide::Buy, 1.0)]);
        broker.process_pending(2, &bar(2, 120.0));
        broker.submit(vec![order(SignalSide::Sell, 1.5), order(SignalSide::Sell, 1.5)]);
        broker.process_pending(3, &bar(3, 130.0));

        assert_eq!(broker.position(), 0.0);
        let trades = broker.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].size, 2.0);
        assert_eq!(trades[0].entry_price, 110.0);
        assert!((trades[0].net_pnl - 40.0).abs() < 1e-9);
        assert_eq!(broker.executions()[3].size, 0.5);
    }

    #[test]
    fn test_sell_while_flat_is_ignored_and_cancel_clears() {
        let mut broker = Broker::new(1_000.0, 0.0);
        broker.submit(vec![order(SignalSide::Sell, 1.0)]);
        broker.process_pending(1, &bar(1, 100.0));
        assert!(broker.executions().is_empty());

        broker.submit(vec![order(SignalSide::Buy, 1.0)]);
        assert_eq!(broker.cancel_pending(), 1);
        assert!(!broker.has_pending());
    }
}
