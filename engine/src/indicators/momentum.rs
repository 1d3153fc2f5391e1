// Momentum: close minus the close `period` bars ago
use super::{ensure_period, IndicatorCalculator};
use crate::error::EngineError;
use serde_json::Value;
use shared::models::Candle;

pub struct Momentum {
    name: String,
    period: usize,
}

impl Momentum {
    pub fn new(period: usize) -> Result<Self, EngineError> {
        ensure_period("Momentum", period)?;
        Ok(Self { name: format!("Momentum({})", period), period })
    }
}

impl IndicatorCalculator for Momentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period })
    }

    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>> {
        (0..data.len())
            .map(|i| (i >= self.period).then(|| data[i].close - data[i - self.period].close))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::closes;

    #[test]
    fn test_momentum() {
        let out = Momentum::new(2).unwrap().calculate(&closes(&[1.0, 2.0, 4.0, 3.0]));
        assert_eq!(out, vec![None, None, Some(3.0), Some(1.0)]);
    }
}
