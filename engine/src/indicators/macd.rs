// Moving Average Convergence Divergence
use super::{ensure_period, series, IndicatorCalculator};
use crate::error::EngineError;
use serde_json::Value;
use shared::models::Candle;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdLines {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy)]
pub struct Macd {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Macd,
    Signal,
    Histogram,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, EngineError> {
        ensure_period("MACD fast", fast)?;
        ensure_period("MACD slow", slow)?;
        ensure_period("MACD signal", signal)?;
        if fast >= slow {
            return Err(EngineError::IndicatorError(format!(
                "MACD fast period ({}) must be shorter than slow period ({})",
                fast, slow
            )));
        }
        Ok(Self { fast, slow, signal })
    }

    pub fn lines(&self, data: &[Candle]) -> MacdLines {
        let closes: Vec<f64> = data.iter().map(|c| c.close).collect();
        let fast = series::ema(&closes, self.fast);
        let slow = series::ema(&closes, self.slow);
        let macd: Vec<Option<f64>> = fast
            .iter()
            .zip(&slow)
            .map(|(f, s)| Some((*f)? - (*s)?))
            .collect();
        let signal = series::on_defined(&macd, |tail| series::ema(tail, self.signal));
        let histogram = macd
            .iter()
            .zip(&signal)
            .map(|(m, s)| Some((*m)? - (*s)?))
            .collect();
        MacdLines { macd, signal, histogram }
    }

    /// Single-line view for the generic indicator interface.
    pub fn line(self, name: &str) -> Result<MacdLineIndicator, EngineError> {
        let line = match name {
            "macd" => MacdLine::Macd,
            "macd_signal" => MacdLine::Signal,
            "macd_hist" => MacdLine::Histogram,
            other => return Err(EngineError::IndicatorError(format!("Unknown MACD line '{}'", other))),
        };
        Ok(MacdLineIndicator {
            name: format!("{}({},{},{})", name.to_uppercase(), self.fast, self.slow, self.signal),
            macd: self,
            line,
        })
    }
}

pub struct MacdLineIndicator {
    name: String,
    macd: Macd,
    line: MacdLine,
}

impl IndicatorCalculator for MacdLineIndicator {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "fast": self.macd.fast, "slow": self.macd.slow, "signal": self.macd.signal })
    }

    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>> {
        let lines = self.macd.lines(data);
        match self.line {
            MacdLine::Macd => lines.macd,
            MacdLine::Signal => lines.signal,
            MacdLine::Histogram => lines.histogram,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::closes;

    #[test]
    fn test_macd_warmup_lengths() {
        let data = closes(&(0..40).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect::<Vec<_>>());
        let lines = Macd::new(12, 26, 9).unwrap().lines(&data);
        assert_eq!(lines.macd.len(), 40);
        assert_eq!(lines.macd.iter().position(Option::is_some), Some(25));
        assert_eq!(lines.signal.iter().position(Option::is_some), Some(33));
        let i = 35;
        assert!((lines.histogram[i].unwrap() - (lines.macd[i].unwrap() - lines.signal[i].unwrap())).abs() < 1e-12);
    }

    #[test]
    fn test_macd_flat_series_is_zero() {
        let lines = Macd::new(3, 5, 2).unwrap().lines(&closes(&[10.0; 12]));
        assert!(lines.macd.iter().flatten().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_macd_rejects_fast_not_below_slow() {
        assert!(Macd::new(26, 12, 9).is_err());
        assert!(Macd::new(12, 26, 0).is_err());
    }
}
