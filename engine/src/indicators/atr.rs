// Average True Range with Wilder smoothing
use super::{ensure_period, series, IndicatorCalculator};
use crate::error::EngineError;
use serde_json::Value;
use shared::models::Candle;

pub struct Atr {
    name: String,
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, EngineError> {
        ensure_period("ATR", period)?;
        Ok(Self { name: format!("ATR({})", period), period })
    }

    /// True range from the second bar on; the first bar has no previous close.
    pub fn true_range(data: &[Candle]) -> Vec<f64> {
        data.windows(2)
            .map(|w| w[1].high.max(w[0].close) - w[1].low.min(w[0].close))
            .collect()
    }
}

impl IndicatorCalculator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period })
    }

    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>> {
        if data.is_empty() {
            return Vec::new();
        }
        let mut out = vec![None];
        out.extend(series::wilder(&Self::true_range(data), self.period));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::candle;

    #[test]
    fn test_true_range_uses_previous_close() {
        let mut a = candle(0, 10.0);
        let mut b = candle(1, 12.0);
        b.high = 13.0;
        b.low = 11.5;
        a.close = 9.0;
        assert_eq!(Atr::true_range(&[a, b]), vec![4.0]);
    }

    #[test]
    fn test_atr_warmup_and_value() {
        let mut data: Vec<Candle> = (0..6).map(|i| candle(i, 10.0)).collect();
        for c in data.iter_mut() {
            c.high = 11.0;
            c.low = 9.0;
        }
        let out = Atr::new(3).unwrap().calculate(&data);
        assert_eq!(out.len(), 6);
        assert_eq!(out[..3], [None, None, None]);
        assert_eq!(out[3], Some(2.0));
        assert_eq!(out[5], Some(2.0));
    }
}
