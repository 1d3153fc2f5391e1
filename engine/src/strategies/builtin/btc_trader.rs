// Lot-based crypto strategy: buys dips below the 24-bar average or pullbacks
// in an uptrend, exits each lot on a volatility-scaled target, a fixed stop
// or fading momentum.
use super::{Lot, LotBook};
use crate::error::EngineError;
use crate::indicators::{Atr, Highest, IndicatorCalculator, Momentum, PriceField, Sma};
use crate::strategies::{Strategy, StrategyContext, StrategyParams};
use shared::models::{Candle, Indicator, ParamSpec, StrategyInfo, StrategyOrigin};

pub const NAME: &str = "BTC Trader";

const DAY_WINDOW: usize = 24;
const MOMENTUM_PERIOD: usize = 3;
const STOP_LOSS_RATIO: f64 = 0.995;
const PULLBACK_RATIO: f64 = 0.98;
const MIN_TARGET_PCT: f64 = 0.3;
const MAX_TARGET_PCT: f64 = 1.5;

pub fn info() -> StrategyInfo {
    StrategyInfo {
        name: NAME.to_string(),
        description: "Buys dips or momentum in dollar chunks and takes profit dynamically based on volatility.".to_string(),
        origin: StrategyOrigin::Builtin,
        params: vec![
            ParamSpec::int("chunk_size", 100, 50, 500, "Dollar value per trade"),
            ParamSpec::int("max_allocation", 1000, 100, 5000, "Maximum capital allocation"),
            ParamSpec::int("atr_period", 14, 5, 50, "ATR period"),
        ],
    }
}

pub fn build(params: &StrategyParams) -> Result<Box<dyn Strategy>, EngineError> {
    Ok(Box::new(BtcTrader::new(
        params.get("chunk_size")?,
        params.get("max_allocation")?,
        params.get_usize("atr_period")?,
    )?))
}

#[derive(Default)]
struct Lines {
    atr: Vec<Option<f64>>,
    high24: Vec<Option<f64>>,
    avg24: Vec<Option<f64>>,
    momentum: Vec<Option<f64>>,
}

struct BarView {
    atr: f64,
    high24: f64,
    avg24: f64,
    momentum: f64,
}

pub struct BtcTrader {
    chunk_size: f64,
    max_allocation: f64,
    atr: Atr,
    lines: Lines,
    book: LotBook,
}

impl BtcTrader {
    pub fn new(chunk_size: f64, max_allocation: f64, atr_period: usize) -> Result<Self, EngineError> {
        Ok(Self { chunk_size, max_allocation, atr: Atr::new(atr_period)?, lines: Lines::default(), book: LotBook::default() })
    }

    fn view(&self, bar: usize) -> Option<BarView> {
        let at = |line: &Vec<Option<f64>>| line.get(bar).copied().flatten();
        Some(BarView {
            atr: at(&self.lines.atr)?,
            high24: at(&self.lines.high24)?,
            avg24: at(&self.lines.avg24)?,
            momentum: at(&self.lines.momentum)?,
        })
    }

    /// First open lot with an exit condition, and the reason.
    fn lot_to_sell(&self, price: f64, momentum: f64) -> Option<(usize, String)> {
        self.book.lots.iter().enumerate().find_map(|(i, lot)| {
            if price >= lot.target_price() {
                Some((i, format!("Profit target {:.2}%", lot.target_pct)))
            } else if price <= lot.entry * STOP_LOSS_RATIO {
                Some((i, "Stop loss hit".to_string()))
            } else if momentum < 0.0 && price > lot.entry {
                Some((i, "Weak momentum".to_string()))
            } else {
                None
            }
        })
    }

    fn profit_target_pct(atr: f64, price: f64) -> f64 {
        (MIN_TARGET_PCT + atr / price * 100.0).clamp(MIN_TARGET_PCT, MAX_TARGET_PCT)
    }
}

impl Strategy for BtcTrader {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&mut self, candles: &[Candle]) -> Result<(), EngineError> {
        self.lines = Lines {
            atr: self.atr.calculate(candles),
            high24: Highest::new(DAY_WINDOW, PriceField::High)?.calculate(candles),
            avg24: Sma::new(DAY_WINDOW)?.calculate(candles),
            momentum: Momentum::new(MOMENTUM_PERIOD)?.calculate(candles),
        };
        self.book.clear();
        Ok(())
    }

    fn buy_reason(&self, bar: usize, candles: &[Candle]) -> Option<String> {
        let view = self.view(bar)?;
        let price = candles.get(bar)?.close;
        let prev_close = candles.get(bar.checked_sub(1)?)?.close;
        let dip = price < view.avg24;
        let momentum = price > prev_close && price <= view.high24 * PULLBACK_RATIO;
        if !(dip || momentum) || self.book.allocated >= self.max_allocation {
            return None;
        }
        Some(if dip { "Buy the dip" } else { "Momentum play" }.to_string())
    }

    fn sell_reason(&self, bar: usize, candles: &[Candle]) -> Option<String> {
        let view = self.view(bar)?;
        self.lot_to_sell(candles.get(bar)?.close, view.momentum).map(|(_, reason)| reason)
    }

    fn indicators(&self) -> Vec<Indicator> {
        let window = serde_json::json!({ "period": DAY_WINDOW });
        vec![
            Indicator { name: self.atr.name().to_string(), parameters: self.atr.parameters(), values: self.lines.atr.clone() },
            Indicator { name: format!("Highest({})", DAY_WINDOW), parameters: window.clone(), values: self.lines.high24.clone() },
            Indicator { name: format!("SMA({})", DAY_WINDOW), parameters: window, values: self.lines.avg24.clone() },
            Indicator {
                name: format!("Momentum({})", MOMENTUM_PERIOD),
                parameters: serde_json::json!({ "period": MOMENTUM_PERIOD }),
                values: self.lines.momentum.clone(),
            },
        ]
    }

    fn on_bar(&mut self, ctx: &mut StrategyContext<'_>) {
        if ctx.has_pending_order {
            return;
        }
        self.book.settle(ctx.position_size);
        let Some(view) = self.view(ctx.bar) else {
            return;
        };
        let price = ctx.close();

        if let Some((index, reason)) = self.lot_to_sell(price, view.momentum) {
            let lot = self.book.close(index);
            ctx.sell(lot.size, reason);
            return;
        }

        if let Some(reason) = self.buy_reason(ctx.bar, ctx.candles) {
            let trade_value = self.chunk_size.min(self.max_allocation - self.book.allocated);
            let size = trade_value / price;
            let target_pct = Self::profit_target_pct(view.atr, price);
            tracing::debug!(price, trade_value, target_pct, "BTC trader adding lot");
            ctx.buy(size, reason);
            self.book.open(Lot { entry: price, size, target_pct });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{candles_from_closes, drive};
    use shared::models::SignalSide;

    fn run(tail: &[f64]) -> (BtcTrader, Vec<shared::models::TradeSignal>) {
        let mut closes = vec![100.0; 30];
        closes.extend_from_slice(tail);
        let candles = candles_from_closes(&closes);
        let mut strategy = BtcTrader::new(100.0, 1000.0, 14).unwrap();
        let signals = drive(&mut strategy, &candles);
        (strategy, signals)
    }

    #[test]
    fn test_dip_buy_then_stop_loss() {
        let (strategy, signals) = run(&[95.0, 94.0]);
        assert_eq!(signals.len(), 2);
        assert_eq!((signals[0].side, signals[0].reason.as_str()), (SignalSide::Buy, "Buy the dip"));
        assert_eq!((signals[1].side, signals[1].reason.as_str()), (SignalSide::Sell, "Stop loss hit"));
        assert!(strategy.book.lots.is_empty());
        assert!(strategy.book.allocated.abs() < 1e-9);
    }

    #[test]
    fn test_volatility_scaled_profit_target() {
        let (_, signals) = run(&[95.0, 97.0]);
        assert_eq!(signals[1].side, SignalSide::Sell);
        assert_eq!(signals[1].reason, "Profit target 1.50%");
    }

    #[test]
    fn test_profit_target_is_clamped() {
        assert_eq!(BtcTrader::profit_target_pct(0.0, 100.0), 0.3);
        assert_eq!(BtcTrader::profit_target_pct(5.0, 100.0), 1.5);
        assert!((BtcTrader::profit_target_pct(0.5, 100.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_flat_market_does_not_trade() {
        let (_, signals) = run(&[100.0, 100.0]);
        assert!(signals.is_empty());
    }

    #[test]
    fn test_unfilled_dip_buy_is_not_sold_later() {
        let mut closes = vec![100.0; 30];
        closes.extend_from_slice(&[95.0, 94.0]);
        let candles = candles_from_closes(&closes);
        let mut strategy = BtcTrader::new(100.0, 1000.0, 14).unwrap();
        strategy.init(&candles).unwrap();

        let mut ctx = StrategyContext::new(30, &candles, 10_000.0, 0.0, 0.95);
        strategy.on_bar(&mut ctx);
        assert_eq!(ctx.into_parts().1[0].reason, "Buy the dip");

        // the dip buy was rejected, so there is no lot to stop out
        let mut ctx = StrategyContext::new(31, &candles, 10_000.0, 0.0, 0.95);
        strategy.on_bar(&mut ctx);
        let (_, signals) = ctx.into_parts();
        assert!(signals.iter().all(|s| s.side == SignalSide::Buy));
        assert!(strategy.book.lots.is_empty());
        assert!((strategy.book.allocated - 100.0).abs() < 1e-9);
    }
}
