// Trading strategies: the decision side of a backtest.
pub mod builtin;
pub mod custom;
pub mod params;
pub mod registry;

pub use params::StrategyParams;
pub use registry::StrategyRegistry;

use crate::error::EngineError;
use shared::models::{Candle, Indicator, SignalSide, TradeSignal};

/// Order requested by a strategy; filled by the broker at the next bar's open.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub side: SignalSide,
    pub size: f64,
}

/// What a strategy sees and can do on one bar.
pub struct StrategyContext<'a> {
    pub bar: usize,
    pub candles: &'a [Candle],
    pub cash: f64,
    pub position_size: f64,
    pub has_pending_order: bool,
    /// Fraction of cash committed by an all-in buy.
    pub position_fraction: f64,
    orders: Vec<OrderRequest>,
    signals: Vec<TradeSignal>,
}

impl<'a> StrategyContext<'a> {
    pub fn new(bar: usize, candles: &'a [Candle], cash: f64, position_size: f64, position_fraction: f64) -> Self {
        Self {
            bar,
            candles,
            cash,
            position_size,
            has_pending_order: false,
            position_fraction,
            orders: Vec::new(),
            signals: Vec::new(),
        }
    }

    pub fn candle(&self) -> &Candle {
        &self.candles[self.bar]
    }

    pub fn close(&self) -> f64 {
        self.candle().close
    }

    pub fn is_flat(&self) -> bool {
        self.position_size <= 0.0
    }

    pub fn buy(&mut self, size: f64, reason: impl Into<String>) {
        self.submit(SignalSide::Buy, size, reason.into());
    }

    pub fn sell(&mut self, size: f64, reason: impl Into<String>) {
        self.submit(SignalSide::Sell, size, reason.into());
    }

    fn submit(&mut self, side: SignalSide, size: f64, reason: String) {
        if !(size.is_finite() && size > 0.0) {
            tracing::debug!(bar = self.bar, %side, size, "Ignoring order with non-positive size");
            return;
        }
        let price = self.close();
        let timestamp = self.candle().timestamp;
        tracing::debug!(bar = self.bar, %side, price, size, reason = %reason, "Signal");
        self.signals.push(TradeSignal { timestamp, side, price, reason });
        self.orders.push(OrderRequest { side, size });
        self.has_pending_order = true;
    }

    pub fn into_parts(self) -> (Vec<OrderRequest>, Vec<TradeSignal>) {
        (self.orders, self.signals)
    }
}

pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Precomputes indicators over the whole series and resets per-run state.
    fn init(&mut self, candles: &[Candle]) -> Result<(), EngineError>;

    /// Reason to enter at `bar`, if any.
    fn buy_reason(&self, bar: usize, candles: &[Candle]) -> Option<String>;

    /// Reason to exit at `bar`, if any.
    fn sell_reason(&self, bar: usize, candles: &[Candle]) -> Option<String>;

    fn indicators(&self) -> Vec<Indicator> {
        Vec::new()
    }

    /// All-in/all-out: when flat and a buy reason exists, buy `position_fraction` of cash;
    /// when long and a sell reason exists, close the whole position.
    fn on_bar(&mut self, ctx: &mut StrategyContext<'_>) {
        if ctx.has_pending_order {
            return;
        }
        if ctx.is_flat() {
            if let Some(reason) = self.buy_reason(ctx.bar, ctx.candles) {
                let size = ctx.cash * ctx.position_fraction / ctx.close();
                ctx.buy(size, reason);
            }
        } else if let Some(reason) = self.sell_reason(ctx.bar, ctx.candles) {
            let size = ctx.position_size;
            ctx.sell(size, reason);
        }
    }
}

/// Crossing test used by the level-based strategies: `prev_a <= prev_b && a > b`.
pub(crate) fn crossed_above(values: &[Option<f64>], levels: &[Option<f64>], bar: usize) -> bool {
    bar > 0 && matches!(
        (values.get(bar - 1).copied().flatten(), values.get(bar).copied().flatten(), levels.get(bar - 1).copied().flatten(), levels.get(bar).copied().flatten()),
        (Some(a0), Some(a1), Some(b0), Some(b1)) if a0 <= b0 && a1 > b1
    )
}

pub(crate) fn crossed_below(values: &[Option<f64>], levels: &[Option<f64>], bar: usize) -> bool {
    bar > 0 && matches!(
        (values.get(bar - 1).copied().flatten(), values.get(bar).copied().flatten(), levels.get(bar - 1).copied().flatten(), levels.get(bar).copied().flatten()),
        (Some(a0), Some(a1), Some(b0), Some(b1)) if a0 >= b0 && a1 < b1
    )
}

pub(crate) fn closes(candles: &[Candle]) -> Vec<Option<f64>> {
    candles.iter().map(|c| Some(c.close)).collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    pub fn candles_from_closes(values: &[f64]) -> Vec<Candle> {
        values
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                symbol: "TEST".to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i as i64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: 1_000.0,
            })
            .collect()
    }

    /// Runs `on_bar` for every bar with a simplified flat/long book, filling orders
    /// instantly at the close. Returns the signals emitted.
    pub fn drive(strategy: &mut dyn Strategy, candles: &[Candle]) -> Vec<TradeSignal> {
        strategy.init(candles).unwrap();
        let mut cash = 10_000.0;
        let mut position = 0.0;
        let mut all = Vec::new();
        for bar in 0..candles.len() {
            let mut ctx = StrategyContext::new(bar, candles, cash, position, 0.95);
            strategy.on_bar(&mut ctx);
            let (orders, signals) = ctx.into_parts();
            for order in orders {
                let price = candles[bar].close;
                match order.side {
                    SignalSide::Buy => {
                        cash -= order.size * price;
                        position += order.size;
                    }
                    SignalSide::Sell => {
                        let size = order.size.min(position);
                        cash += size * price;
                        position -= size;
                    }
                }
            }
            all.extend(signals);
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    struct Alternating;

    impl Strategy for Alternating {
        fn name(&self) -> &str {
            "alternating"
        }
        fn init(&mut self, _candles: &[Candle]) -> Result<(), EngineError> {
            Ok(())
        }
        fn buy_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
            (bar % 2 == 0).then(|| "even bar".to_string())
        }
        fn sell_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
            (bar % 2 == 1).then(|| "odd bar".to_string())
        }
    }

    #[test]
    fn test_default_on_bar_sizes_buy_from_cash() {
        let candles = candles_from_closes(&[100.0, 110.0]);
        let mut ctx = StrategyContext::new(0, &candles, 10_000.0, 0.0, 0.95);
        Alternating.on_bar(&mut ctx);
        let (orders, signals) = ctx.into_parts();
        assert_eq!(orders, vec![OrderRequest { side: SignalSide::Buy, size: 95.0 }]);
        assert_eq!(signals[0].reason, "even bar");
        assert_eq!(signals[0].price, 100.0);
    }

    #[test]
    fn test_default_on_bar_sells_whole_position() {
        let candles = candles_from_closes(&[100.0, 110.0]);
        let mut ctx = StrategyContext::new(1, &candles, 500.0, 12.5, 0.95);
        Alternating.on_bar(&mut ctx);
        let (orders, _) = ctx.into_parts();
        assert_eq!(orders, vec![OrderRequest { side: SignalSide::Sell, size: 12.5 }]);
    }

    #[test]
    fn test_pending_order_blocks_new_decisions() {
        let candles = candles_from_closes(&[100.0]);
        let mut ctx = StrategyContext::new(0, &candles, 10_000.0, 0.0, 0.95);
        ctx.has_pending_order = true;
        Alternating.on_bar(&mut ctx);
        assert!(ctx.into_parts().0.is_empty());
    }

    #[test]
    fn test_no_sell_signal_while_flat() {
        let signals = drive(&mut Alternating, &candles_from_closes(&[1.0, 1.0, 1.0, 1.0]));
        let sides: Vec<SignalSide> = signals.iter().map(|s| s.side).collect();
        assert_eq!(sides, vec![SignalSide::Buy, SignalSide::Sell, SignalSide::Buy, SignalSide::Sell]);
    }

    #[test]
    fn test_cross_helpers() {
        let a = vec![Some(1.0), Some(3.0), Some(1.0)];
        let b = vec![Some(2.0); 3];
        assert!(crossed_above(&a, &b, 1));
        assert!(crossed_below(&a, &b, 2));
        assert!(!crossed_above(&a, &b, 0));
    }
}
