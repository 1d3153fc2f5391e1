// Simple Moving Average (SMA) indicator implementation
use super::{ensure_period, series, IndicatorCalculator, PriceField};
use crate::error::EngineError;
use serde_json::Value;
use shared::models::Candle;

pub struct Sma {
    name: String,
    period: usize,
    field: PriceField,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, EngineError> {
        Self::with_field(period, PriceField::Close)
    }

    pub fn with_field(period: usize, field: PriceField) -> Result<Self, EngineError> {
        ensure_period("SMA", period)?;
        let name = match field {
            PriceField::Close => format!("SMA({})", period),
            other => format!("SMA({}, {:?})", period, other),
        };
        Ok(Self { name, period, field })
    }
}

impl IndicatorCalculator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period, "field": self.field })
    }

    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>> {
        series::sma(&self.field.extract(data), self.period)
    }
}
