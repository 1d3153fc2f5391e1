use crate::error::EngineError;
use crate::indicators::{Highest, IndicatorCalculator, Lowest, PriceField};
use crate::strategies::{Strategy, StrategyParams};
use shared::models::{Candle, Indicator, ParamSpec, StrategyInfo, StrategyOrigin};

pub const NAME: &str = "Fibonacci Retracement";

pub fn info() -> StrategyInfo {
    StrategyInfo {
        name: NAME.to_string(),
        description: "Trades crosses of the 38.2% and 61.8% retracement levels of the recent high/low range."
            .to_string(),
        origin: StrategyOrigin::Builtin,
        params: vec![ParamSpec::int("lookback", 50, 20, 200, "Lookback period for Fibonacci levels")],
    }
}

pub fn build(params: &StrategyParams) -> Result<Box<dyn Strategy>, EngineError> {
    Ok(Box::new(FibonacciRetracement::new(params.get_usize("lookback")?)?))
}

pub struct FibonacciRetracement {
    lookback: usize,
    closes: Vec<f64>,
    level382: Vec<Option<f64>>,
    level618: Vec<Option<f64>>,
}

impl FibonacciRetracement {
    pub fn new(lookback: usize) -> Result<Self, EngineError> {
        crate::indicators::ensure_period("Fibonacci lookback", lookback)?;
        Ok(Self { lookback, closes: Vec::new(), level382: Vec::new(), level618: Vec::new() })
    }

    // Strict on both sides: touching a level is not a cross.
    fn cross(&self, level: &[Option<f64>], bar: usize, above: bool) -> bool {
        if bar == 0 {
            return false;
        }
        let (Some(prev), Some(curr)) = (level.get(bar - 1).copied().flatten(), level.get(bar).copied().flatten()) else {
            return false;
        };
        let (c0, c1) = (self.closes[bar - 1], self.closes[bar]);
        if above {
            c0 < prev && c1 > curr
        } else {
            c0 > prev && c1 < curr
        }
    }

    fn crossed_level(&self, bar: usize, above: bool) -> Option<&'static str> {
        if self.cross(&self.level618, bar, above) {
            Some("61.8")
        } else if self.cross(&self.level382, bar, above) {
            Some("38.2")
        } else {
            None
        }
    }
}

impl Strategy for FibonacciRetracement {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&mut self, candles: &[Candle]) -> Result<(), EngineError> {
        let highest = Highest::new(self.lookback, PriceField::High)?.calculate(candles);
        let lowest = Lowest::new(self.lookback, PriceField::Low)?.calculate(candles);
        let level = |ratio: f64| -> Vec<Option<f64>> {
            highest.iter().zip(&lowest).map(|(h, l)| Some((*h)? - ((*h)? - (*l)?) * ratio)).collect()
        };
        self.level382 = level(0.382);
        self.level618 = level(0.618);
        self.closes = candles.iter().map(|c| c.close).collect();
        Ok(())
    }

    fn buy_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
        self.crossed_level(bar, true).map(|level| format!("Price crossed above Fibonacci {}% level", level))
    }

    fn sell_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
        self.crossed_level(bar, false).map(|level| format!("Price crossed below Fibonacci {}% level", level))
    }

    fn indicators(&self) -> Vec<Indicator> {
        let parameters = serde_json::json!({ "lookback": self.lookback });
        vec![
            Indicator { name: "FIB_38.2".to_string(), parameters: parameters.clone(), values: self.level382.clone() },
            Indicator { name: "FIB_61.8".to_string(), parameters, values: self.level618.clone() },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{candles_from_closes, drive};
    use shared::models::SignalSide;

    #[test]
    fn test_recovery_through_618_level_buys() {
        let candles = candles_from_closes(&[100.0, 100.0, 100.0, 100.0, 90.0, 100.0]);
        let mut strategy = FibonacciRetracement::new(4).unwrap();
        let signals = drive(&mut strategy, &candles);

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].side, SignalSide::Buy);
        assert_eq!(signals[0].price, 100.0);
        assert_eq!(signals[0].reason, "Price crossed above Fibonacci 61.8% level");
    }

    #[test]
    fn test_levels_sit_inside_range() {
        let candles = candles_from_closes(&[100.0, 120.0, 80.0, 110.0, 95.0]);
        let mut strategy = FibonacciRetracement::new(3).unwrap();
        strategy.init(&candles).unwrap();
        for i in 2..candles.len() {
            let (l382, l618) = (strategy.level382[i].unwrap(), strategy.level618[i].unwrap());
            assert!(l618 < l382);
        }
        assert_eq!(strategy.level382[1], None);
    }
}
