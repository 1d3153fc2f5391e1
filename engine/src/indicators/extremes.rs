// Rolling highest/lowest values
use super::{ensure_period, series, IndicatorCalculator, PriceField};
use crate::error::EngineError;
use serde_json::Value;
use shared::models::Candle;

pub struct Highest {
    name: String,
    period: usize,
    field: PriceField,
}

impl Highest {
    pub fn new(period: usize, field: PriceField) -> Result<Self, EngineError> {
        ensure_period("Highest", period)?;
        Ok(Self { name: format!("Highest({})", period), period, field })
    }
}

impl IndicatorCalculator for Highest {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period, "field": self.field })
    }

    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>> {
        series::rolling_max(&self.field.extract(data), self.period)
    }
}

pub struct Lowest {
    name: String,
    period: usize,
    field: PriceField,
}

impl Lowest {
    pub fn new(period: usize, field: PriceField) -> Result<Self, EngineError> {
        ensure_period("Lowest", period)?;
        Ok(Self { name: format!("Lowest({})", period), period, field })
    }
}

impl IndicatorCalculator for Lowest {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period, "field": self.field })
    }

    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>> {
        series::rolling_min(&self.field.extract(data), self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::closes;

    #[test]
    fn test_highest_lowest_on_high_low_fields() {
        let mut data = closes(&[5.0, 6.0, 4.0, 7.0]);
        data[1].high = 9.0;
        data[2].low = 1.0;
        let high = Highest::new(2, PriceField::High).unwrap().calculate(&data);
        let low = Lowest::new(2, PriceField::Low).unwrap().calculate(&data);
        assert_eq!(high, vec![None, Some(9.0), Some(9.0), Some(7.0)]);
        assert_eq!(low, vec![None, Some(5.0), Some(1.0), Some(1.0)]);
    }
}
