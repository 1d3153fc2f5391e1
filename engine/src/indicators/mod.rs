// Technical indicators module
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod extremes;
pub mod macd;
pub mod momentum;
pub mod rsi;
pub mod series;
pub mod sma;

pub use atr::Atr;
pub use bollinger::BollingerBands;
pub use ema::Ema;
pub use extremes::{Highest, Lowest};
pub use macd::Macd;
pub use momentum::Momentum;
pub use rsi::Rsi;
pub use sma::Sma;

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::{Candle, Indicator};

// Common trait for all indicators
pub trait IndicatorCalculator: Send + Sync {
    fn name(&self) -> &str;
    fn parameters(&self) -> Value;
    /// One value per input candle; `None` during warm-up.
    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>>;

    fn to_indicator(&self, data: &[Candle]) -> Indicator {
        Indicator { name: self.name().to_string(), parameters: self.parameters(), values: self.calculate(data) }
    }
}

/// Which candle field an indicator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    High,
    Low,
    #[default]
    Close,
    Volume,
    /// `(high + low + 2 * close) / 4`
    Weighted,
}

impl PriceField {
    pub fn value(&self, candle: &Candle) -> f64 {
        match self {
            PriceField::Open => candle.open,
            PriceField::High => candle.high,
            PriceField::Low => candle.low,
            PriceField::Close => candle.close,
            PriceField::Volume => candle.volume,
            PriceField::Weighted => candle.weighted_price(),
        }
    }

    pub fn extract(&self, data: &[Candle]) -> Vec<f64> {
        data.iter().map(|c| self.value(c)).collect()
    }
}

pub(crate) fn ensure_period(indicator: &str, period: usize) -> Result<(), EngineError> {
    if period == 0 {
        return Err(EngineError::IndicatorError(format!("{} period must be greater than 0", indicator)));
    }
    Ok(())
}

/// +1 where `a` crosses above `b` at bar i, -1 where it crosses below, 0 otherwise.
/// A cross needs both bars defined on both series.
pub fn crossover(a: &[Option<f64>], b: &[Option<f64>]) -> Vec<i8> {
    let n = a.len().min(b.len());
    let mut out = vec![0i8; n];
    for i in 1..n {
        if let (Some(a0), Some(a1), Some(b0), Some(b1)) = (a[i - 1], a[i], b[i - 1], b[i]) {
            if a0 <= b0 && a1 > b1 {
                out[i] = 1;
            } else if a0 >= b0 && a1 < b1 {
                out[i] = -1;
            }
        }
    }
    out
}

/// Builds an indicator line by name. Multi-line indicators expose each line
/// under its own name (`macd_signal`, `bb_top`, ...).
pub fn create_indicator(name: &str, period: usize, params: &Value) -> Result<Box<dyn IndicatorCalculator>, EngineError> {
    let get = |key: &str, default: f64| params.get(key).and_then(Value::as_f64).unwrap_or(default);
    let field = params
        .get("field")
        .cloned()
        .map(serde_json::from_value::<PriceField>)
        .transpose()
        .map_err(|e| EngineError::IndicatorError(format!("Invalid price field: {}", e)))?
        .unwrap_or_default();

    let indicator: Box<dyn IndicatorCalculator> = match name.to_lowercase().as_str() {
        "sma" => Box::new(Sma::with_field(period, field)?),
        "ema" => Box::new(Ema::with_field(period, field)?),
        "rsi" => Box::new(Rsi::new(period)?),
        "atr" => Box::new(Atr::new(period)?),
        "highest" => Box::new(Highest::new(period, params.get("field").map_or(PriceField::High, |_| field))?),
        "lowest" => Box::new(Lowest::new(period, params.get("field").map_or(PriceField::Low, |_| field))?),
        "momentum" => Box::new(Momentum::new(period)?),
        line @ ("macd" | "macd_signal" | "macd_hist") => {
            let fast = get("fast", 12.0) as usize;
            let slow = get("slow", 26.0) as usize;
            let signal = get("signal", 9.0) as usize;
            Box::new(Macd::new(fast, slow, signal)?.line(line)?)
        }
        line @ ("bb_mid" | "bb_top" | "bb_bot") => {
            let devfactor = get("devfactor", 2.0);
            Box::new(BollingerBands::new(period, devfactor)?.line(line)?)
        }
        other => return Err(EngineError::IndicatorError(format!("Unknown indicator '{}'", other))),
    };
    Ok(indicator)
}

pub const KNOWN_INDICATORS: &[&str] = &[
    "sma", "ema", "rsi", "atr", "highest", "lowest", "momentum", "macd", "macd_signal", "macd_hist", "bb_mid", "bb_top",
    "bb_bot",
];
