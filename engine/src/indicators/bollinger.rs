// Bollinger Bands: SMA mid line with population standard deviation bands
use super::{ensure_period, series, IndicatorCalculator};
use crate::error::EngineError;
use serde_json::Value;
use shared::models::Candle;

#[derive(Debug, Clone, PartialEq)]
pub struct Bands {
    pub mid: Vec<Option<f64>>,
    pub top: Vec<Option<f64>>,
    pub bot: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy)]
pub struct BollingerBands {
    pub period: usize,
    pub devfactor: f64,
}

impl BollingerBands {
    pub fn new(period: usize, devfactor: f64) -> Result<Self, EngineError> {
        ensure_period("Bollinger", period)?;
        if !devfactor.is_finite() || devfactor <= 0.0 {
            return Err(EngineError::IndicatorError(format!("Bollinger devfactor must be positive, got {}", devfactor)));
        }
        Ok(Self { period, devfactor })
    }

    pub fn bands(&self, data: &[Candle]) -> Bands {
        let closes: Vec<f64> = data.iter().map(|c| c.close).collect();
        let mid = series::sma(&closes, self.period);
        let std = series::rolling_std(&closes, self.period);
        let offset = |sign: f64| -> Vec<Option<f64>> {
            mid.iter().zip(&std).map(|(m, s)| Some((*m)? + sign * self.devfactor * (*s)?)).collect()
        };
        let top = offset(1.0);
        let bot = offset(-1.0);
        Bands { mid, top, bot }
    }

    pub fn line(self, name: &str) -> Result<BandLine, EngineError> {
        if !matches!(name, "bb_mid" | "bb_top" | "bb_bot") {
            return Err(EngineError::IndicatorError(format!("Unknown Bollinger line '{}'", name)));
        }
        Ok(BandLine {
            name: format!("{}({},{})", name.to_uppercase(), self.period, self.devfactor),
            line: name.to_string(),
            bands: self,
        })
    }
}

pub struct BandLine {
    name: String,
    line: String,
    bands: BollingerBands,
}

impl IndicatorCalculator for BandLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.bands.period, "devfactor": self.bands.devfactor })
    }

    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>> {
        let bands = self.bands.bands(data);
        match self.line.as_str() {
            "bb_top" => bands.top,
            "bb_bot" => bands.bot,
            _ => bands.mid,
        }
    }
}
