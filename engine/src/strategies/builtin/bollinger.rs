use crate::error::EngineError;
use crate::indicators::{bollinger::Bands, BollingerBands};
use crate::strategies::{Strategy, StrategyParams};
use shared::models::{Candle, Indicator, ParamSpec, StrategyInfo, StrategyOrigin};

pub const NAME: &str = "Bollinger Bands";

pub fn info() -> StrategyInfo {
    StrategyInfo {
        name: NAME.to_string(),
        description: "Buys when price touches the lower band and sells when it touches the upper band.".to_string(),
        origin: StrategyOrigin::Builtin,
        params: vec![
            ParamSpec::int("bb_period", 20, 10, 50, "Period for Bollinger Bands"),
            ParamSpec::float("bb_devfactor", 2.0, 1.0, 3.0, 0.1, "Standard deviation factor"),
        ],
    }
}

pub fn build(params: &StrategyParams) -> Result<Box<dyn Strategy>, EngineError> {
    let bands = BollingerBands::new(params.get_usize("bb_period")?, params.get("bb_devfactor")?)?;
    Ok(Box::new(BollingerStrategy { bands, lines: None }))
}

pub struct BollingerStrategy {
    bands: BollingerBands,
    lines: Option<Bands>,
}

impl BollingerStrategy {
    fn band(&self, bar: usize, pick: fn(&Bands) -> &Vec<Option<f64>>) -> Option<f64> {
        self.lines.as_ref().and_then(|b| pick(b).get(bar).copied().flatten())
    }
}

impl Strategy for BollingerStrategy {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&mut self, candles: &[Candle]) -> Result<(), EngineError> {
        self.lines = Some(self.bands.bands(candles));
        Ok(())
    }

    fn buy_reason(&self, bar: usize, candles: &[Candle]) -> Option<String> {
        let bot = self.band(bar, |b| &b.bot)?;
        let close = candles.get(bar)?.close;
        (close <= bot).then(|| format!("Price touched lower Bollinger Band: {:.2} <= {:.2}", close, bot))
    }

    fn sell_reason(&self, bar: usize, candles: &[Candle]) -> Option<String> {
        let top = self.band(bar, |b| &b.top)?;
        let close = candles.get(bar)?.close;
        (close >= top).then(|| format!("Price touched upper Bollinger Band: {:.2} >= {:.2}", close, top))
    }

    fn indicators(&self) -> Vec<Indicator> {
        let Some(lines) = &self.lines else {
            return Vec::new();
        };
        let parameters = serde_json::json!({ "period": self.bands.period, "devfactor": self.bands.devfactor });
        [("BB_MID", &lines.mid), ("BB_TOP", &lines.top), ("BB_BOT", &lines.bot)]
            .into_iter()
            .map(|(name, values)| Indicator {
                name: format!("{}({},{})", name, self.bands.period, self.bands.devfactor),
                parameters: parameters.clone(),
                values: values.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{candles_from_closes, drive};
    use shared::models::SignalSide;

    #[test]
    fn test_band_touches() {
        let mut closes = vec![100.0, 101.0, 99.0, 100.0, 101.0, 99.0, 100.0, 101.0, 99.0, 100.0];
        closes.push(90.0);
        closes.extend([100.0, 101.0, 99.0, 100.0, 101.0, 99.0, 100.0, 101.0, 99.0]);
        closes.push(115.0);
        let candles = candles_from_closes(&closes);
        let mut strategy = BollingerStrategy { bands: BollingerBands::new(10, 2.0).unwrap(), lines: None };
        let signals = drive(&mut strategy, &candles);

        assert_eq!(signals[0].side, SignalSide::Buy);
        assert_eq!(signals[0].price, 90.0);
        assert!(signals[0].reason.starts_with("Price touched lower Bollinger Band: 90.00 <= "));
        let last = signals.last().unwrap();
        assert_eq!(last.side, SignalSide::Sell);
        assert_eq!(last.price, 115.0);
        assert_eq!(strategy.indicators().len(), 3);
    }
}
