use crate::error::EngineError;
use crate::indicators::{crossover, Macd};
use crate::strategies::{Strategy, StrategyParams};
use shared::models::{Candle, Indicator, ParamSpec, StrategyInfo, StrategyOrigin};

pub const NAME: &str = "MACD";

pub fn info() -> StrategyInfo {
    StrategyInfo {
        name: NAME.to_string(),
        description: "Trend following on MACD line / signal line crossovers.".to_string(),
        origin: StrategyOrigin::Builtin,
        params: vec![
            ParamSpec::int("macd_fast", 12, 5, 50, "Fast EMA period"),
            ParamSpec::int("macd_slow", 26, 20, 100, "Slow EMA period"),
            ParamSpec::int("macd_signal", 9, 5, 20, "Signal line period"),
        ],
    }
}

pub fn build(params: &StrategyParams) -> Result<Box<dyn Strategy>, EngineError> {
    let macd = Macd::new(params.get_usize("macd_fast")?, params.get_usize("macd_slow")?, params.get_usize("macd_signal")?)?;
    Ok(Box::new(MacdStrategy { macd, cross: Vec::new(), indicators: Vec::new() }))
}

pub struct MacdStrategy {
    macd: Macd,
    cross: Vec<i8>,
    indicators: Vec<Indicator>,
}

impl Strategy for MacdStrategy {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&mut self, candles: &[Candle]) -> Result<(), EngineError> {
        let lines = self.macd.lines(candles);
        self.cross = crossover(&lines.macd, &lines.signal);
        let Macd { fast, slow, signal } = self.macd;
        let parameters = serde_json::json!({ "fast": fast, "slow": slow, "signal": signal });
        self.indicators = vec![
            Indicator { name: format!("MACD({},{},{})", fast, slow, signal), parameters: parameters.clone(), values: lines.macd },
            Indicator { name: format!("MACD_SIGNAL({},{},{})", fast, slow, signal), parameters, values: lines.signal },
        ];
        Ok(())
    }

    fn buy_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
        (self.cross.get(bar) == Some(&1)).then(|| "MACD crossed above signal line".to_string())
    }

    fn sell_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
        (self.cross.get(bar) == Some(&-1)).then(|| "MACD crossed below signal line".to_string())
    }

    fn indicators(&self) -> Vec<Indicator> {
        self.indicators.clone()
    }
}
