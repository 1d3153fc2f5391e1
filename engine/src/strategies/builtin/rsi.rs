use crate::error::EngineError;
use crate::indicators::{IndicatorCalculator, Rsi};
use crate::strategies::{Strategy, StrategyParams};
use shared::models::{Candle, Indicator, ParamSpec, StrategyInfo, StrategyOrigin};

pub const NAME: &str = "RSI";

pub fn info() -> StrategyInfo {
    StrategyInfo {
        name: NAME.to_string(),
        description: "Mean reversion on the Relative Strength Index: buy oversold, sell overbought.".to_string(),
        origin: StrategyOrigin::Builtin,
        params: vec![
            ParamSpec::int("rsi_period", 14, 5, 50, "Period for RSI calculation"),
            ParamSpec::int("rsi_upper", 70, 60, 90, "Overbought threshold"),
            ParamSpec::int("rsi_lower", 30, 10, 40, "Oversold threshold"),
        ],
    }
}

pub fn build(params: &StrategyParams) -> Result<Box<dyn Strategy>, EngineError> {
    Ok(Box::new(RsiStrategy::new(params.get_usize("rsi_period")?, params.get("rsi_lower")?, params.get("rsi_upper")?)?))
}

pub struct RsiStrategy {
    rsi: Rsi,
    lower: f64,
    upper: f64,
    line: Vec<Option<f64>>,
}

impl RsiStrategy {
    pub fn new(period: usize, lower: f64, upper: f64) -> Result<Self, EngineError> {
        if lower >= upper {
            return Err(EngineError::StrategyError(format!(
                "rsi_lower ({}) must be below rsi_upper ({})",
                lower, upper
            )));
        }
        Ok(Self { rsi: Rsi::new(period)?, lower, upper, line: Vec::new() })
    }

    fn value(&self, bar: usize) -> Option<f64> {
        self.line.get(bar).copied().flatten()
    }
}

impl Strategy for RsiStrategy {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&mut self, candles: &[Candle]) -> Result<(), EngineError> {
        self.line = self.rsi.calculate(candles);
        Ok(())
    }

    fn buy_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
        let rsi = self.value(bar)?;
        (rsi < self.lower).then(|| format!("RSI oversold: {:.2} < {}", rsi, self.lower))
    }

    fn sell_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
        let rsi = self.value(bar)?;
        (rsi > self.upper).then(|| format!("RSI overbought: {:.2} > {}", rsi, self.upper))
    }

    fn indicators(&self) -> Vec<Indicator> {
        vec![Indicator { name: self.rsi.name().to_string(), parameters: self.rsi.parameters(), values: self.line.clone() }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{candles_from_closes, drive};
    use shared::models::SignalSide;

    #[test]
    fn test_buys_after_selloff_and_sells_after_rally() {
        let mut closes: Vec<f64> = (0..10).map(|i| 100.0 - i as f64 * 3.0).collect();
        closes.extend((0..12).map(|i| 73.0 + i as f64 * 4.0));
        let candles = candles_from_closes(&closes);
        let signals = drive(&mut RsiStrategy::new(5, 30.0, 70.0).unwrap(), &candles);

        assert_eq!(signals.first().map(|s| s.side), Some(SignalSide::Buy));
        assert!(signals[0].reason.starts_with("RSI oversold"));
        assert!(signals.iter().any(|s| s.side == SignalSide::Sell && s.reason.starts_with("RSI overbought")));
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        assert!(RsiStrategy::new(14, 70.0, 30.0).is_err());
    }
}
