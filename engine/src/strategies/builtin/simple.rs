// Scale-in strategy: buys fixed dollar chunks while price holds above the
// weighted average minus one ATR, and takes profit on each lot separately.
use super::{Lot, LotBook};
use crate::error::EngineError;
use crate::indicators::{series, Atr, IndicatorCalculator};
use crate::strategies::{Strategy, StrategyContext, StrategyParams};
use shared::models::{Candle, Indicator, ParamSpec, StrategyInfo, StrategyOrigin};

pub const NAME: &str = "Simple";

/// Dollar chunks tried in order; the first one that fits the remaining allocation is used.
pub const TRADE_SIZES: [f64; 3] = [150.0, 200.0, 300.0];

pub fn info() -> StrategyInfo {
    StrategyInfo {
        name: NAME.to_string(),
        description: "Scales into dollar-sized lots above the ATR downtrend threshold and exits each lot at a fixed profit target."
            .to_string(),
        origin: StrategyOrigin::Builtin,
        params: vec![
            ParamSpec::int("atr_period", 14, 5, 50, "ATR period"),
            ParamSpec::int("weighted_period", 24, 5, 100, "Weighted price average period"),
            ParamSpec::int("max_allocation", 1000, 300, 10000, "Maximum capital allocated across lots"),
            ParamSpec::float("profit_target_percent", 0.5, 0.1, 5.0, 0.1, "Profit target per lot in percent"),
        ],
    }
}

pub fn build(params: &StrategyParams) -> Result<Box<dyn Strategy>, EngineError> {
    Ok(Box::new(SimpleStrategy::new(
        params.get_usize("atr_period")?,
        params.get_usize("weighted_period")?,
        params.get("max_allocation")?,
        params.get("profit_target_percent")?,
    )?))
}

pub struct SimpleStrategy {
    atr: Atr,
    weighted_period: usize,
    max_allocation: f64,
    profit_target_percent: f64,
    atr_line: Vec<Option<f64>>,
    weighted_avg: Vec<Option<f64>>,
    book: LotBook,
}

impl SimpleStrategy {
    pub fn new(atr_period: usize, weighted_period: usize, max_allocation: f64, profit_target_percent: f64) -> Result<Self, EngineError> {
        crate::indicators::ensure_period("Weighted average", weighted_period)?;
        Ok(Self {
            atr: Atr::new(atr_period)?,
            weighted_period,
            max_allocation,
            profit_target_percent,
            atr_line: Vec::new(),
            weighted_avg: Vec::new(),
            book: LotBook::default(),
        })
    }

    fn pick_chunk_size(&self) -> Option<f64> {
        let remaining = self.max_allocation - self.book.allocated;
        TRADE_SIZES.iter().copied().find(|size| *size <= remaining)
    }
}

impl Strategy for SimpleStrategy {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&mut self, candles: &[Candle]) -> Result<(), EngineError> {
        let weighted: Vec<f64> = candles.iter().map(Candle::weighted_price).collect();
        self.weighted_avg = series::sma(&weighted, self.weighted_period);
        self.atr_line = self.atr.calculate(candles);
        self.book.clear();
        Ok(())
    }

    fn buy_reason(&self, _bar: usize, _candles: &[Candle]) -> Option<String> {
        None
    }

    fn sell_reason(&self, _bar: usize, _candles: &[Candle]) -> Option<String> {
        None
    }

    fn indicators(&self) -> Vec<Indicator> {
        vec![
            Indicator { name: self.atr.name().to_string(), parameters: self.atr.parameters(), values: self.atr_line.clone() },
            Indicator {
                name: format!("WeightedSMA({})", self.weighted_period),
                parameters: serde_json::json!({ "period": self.weighted_period }),
                values: self.weighted_avg.clone(),
            },
        ]
    }

    fn on_bar(&mut self, ctx: &mut StrategyContext<'_>) {
        if ctx.has_pending_order {
            return;
        }
        self.book.settle(ctx.position_size);
        let (Some(atr), Some(weighted_avg)) = (
            self.atr_line.get(ctx.bar).copied().flatten(),
            self.weighted_avg.get(ctx.bar).copied().flatten(),
        ) else {
            return;
        };

        let price = ctx.close();
        let mut index = 0;
        while index < self.book.lots.len() {
            if price >= self.book.lots[index].target_price() {
                let lot = self.book.close(index);
                ctx.sell(lot.size, "Profit target hit");
            } else {
                index += 1;
            }
        }

        let downtrend_threshold = weighted_avg - atr;
        if self.book.allocated < self.max_allocation && price >= downtrend_threshold {
            if let Some(trade_value) = self.pick_chunk_size() {
                let size = trade_value / price;
                tracing::debug!(price, trade_value, allocated = self.book.allocated, "Simple strategy adding lot");
                ctx.buy(size, "Price above downtrend threshold");
                self.book.open(Lot { entry: price, size, target_pct: self.profit_target_percent });
            }
        }
    }
}
