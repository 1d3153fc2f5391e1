// Exponential Moving Average (EMA) indicator implementation
use super::{ensure_period, series, IndicatorCalculator, PriceField};
use crate::error::EngineError;
use serde_json::Value;
use shared::models::Candle;

pub struct Ema {
    name: String,
    period: usize,
    field: PriceField,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, EngineError> {
        Self::with_field(period, PriceField::Close)
    }

    pub fn with_field(period: usize, field: PriceField) -> Result<Self, EngineError> {
        ensure_period("EMA", period)?;
        Ok(Self { name: format!("EMA({})", period), period, field })
    }
}

impl IndicatorCalculator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period, "field": self.field })
    }

    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>> {
        series::ema(&self.field.extract(data), self.period)
    }
}
