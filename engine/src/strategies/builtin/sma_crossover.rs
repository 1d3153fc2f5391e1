use crate::error::EngineError;
use crate::indicators::{IndicatorCalculator, Sma};
use crate::strategies::{closes, crossed_above, crossed_below, Strategy, StrategyParams};
use shared::models::{Candle, Indicator, ParamSpec, StrategyInfo, StrategyOrigin};

pub const NAME: &str = "SMA Crossover";

pub fn info() -> StrategyInfo {
    StrategyInfo {
        name: NAME.to_string(),
        description: "Buys when the close crosses above its simple moving average and sells on the cross below."
            .to_string(),
        origin: StrategyOrigin::Builtin,
        params: vec![ParamSpec::int("sma_period", 15, 5, 200, "Period for Simple Moving Average")],
    }
}

pub fn build(params: &StrategyParams) -> Result<Box<dyn Strategy>, EngineError> {
    Ok(Box::new(SmaCrossover::new(params.get_usize("sma_period")?)?))
}

pub struct SmaCrossover {
    sma: Sma,
    period: usize,
    closes: Vec<Option<f64>>,
    line: Vec<Option<f64>>,
}

impl SmaCrossover {
    pub fn new(period: usize) -> Result<Self, EngineError> {
        Ok(Self { sma: Sma::new(period)?, period, closes: Vec::new(), line: Vec::new() })
    }
}

impl Strategy for SmaCrossover {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&mut self, candles: &[Candle]) -> Result<(), EngineError> {
        self.closes = closes(candles);
        self.line = self.sma.calculate(candles);
        Ok(())
    }

    fn buy_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
        crossed_above(&self.closes, &self.line, bar).then(|| format!("Price crossed above SMA({})", self.period))
    }

    fn sell_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
        crossed_below(&self.closes, &self.line, bar).then(|| format!("Price crossed below SMA({})", self.period))
    }

    fn indicators(&self) -> Vec<Indicator> {
        vec![Indicator { name: self.sma.name().to_string(), parameters: self.sma.parameters(), values: self.line.clone() }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{candles_from_closes, drive};
    use shared::models::SignalSide;

    #[test]
    fn test_crossovers_generate_buy_then_sell() {
        let candles = candles_from_closes(&[10.0, 10.0, 10.0, 10.0, 10.0, 12.0, 13.0, 12.0, 9.0, 8.0]);
        let mut strategy = SmaCrossover::new(5).unwrap();
        let signals = drive(&mut strategy, &candles);

        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].side, SignalSide::Buy);
        assert_eq!(signals[0].price, 12.0);
        assert_eq!(signals[0].reason, "Price crossed above SMA(5)");
        assert_eq!(signals[1].side, SignalSide::Sell);
        assert_eq!(signals[1].price, 9.0);
    }

    #[test]
    fn test_exposes_indicator_line() {
        let candles = candles_from_closes(&[1.0; 8]);
        let mut strategy = SmaCrossover::new(5).unwrap();
        strategy.init(&candles).unwrap();
        let indicators = strategy.indicators();
        assert_eq!(indicators[0].name, "SMA(5)");
        assert_eq!(indicators[0].values.len(), 8);
    }
}
