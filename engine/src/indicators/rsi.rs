// Relative Strength Index (RSI) indicator implementation
use super::{ensure_period, IndicatorCalculator};
use crate::error::EngineError;
use serde_json::Value;
use shared::models::Candle;

pub struct Rsi {
    name: String,
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, EngineError> {
        ensure_period("RSI", period)?;
        Ok(Self { name: format!("RSI({})", period), period })
    }

    fn rsi(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 {
            return 100.0;
        }
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }
}

impl IndicatorCalculator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period })
    }

    fn calculate(&self, data: &[Candle]) -> Vec<Option<f64>> {
        if data.len() <= self.period {
            return vec![None; data.len()];
        }

        let mut results = vec![None; self.period];
        let mut gains = 0.0;
        let mut losses = 0.0;

        for i in 1..=self.period {
            let change = data[i].close - data[i - 1].close;
            if change > 0.0 {
                gains += change;
            } else {
                losses -= change;
            }
        }

        let mut avg_gain = gains / self.period as f64;
        let mut avg_loss = losses / self.period as f64;
        results.push(Some(Self::rsi(avg_gain, avg_loss)));

        // Wilder smoothing for the remaining bars
        for i in (self.period + 1)..data.len() {
            let change = data[i].close - data[i - 1].close;
            let (gain, loss) = if change > 0.0 { (change, 0.0) } else { (0.0, -change) };
            avg_gain = (avg_gain * (self.period - 1) as f64 + gain) / self.period as f64;
            avg_loss = (avg_loss * (self.period - 1) as f64 + loss) / self.period as f64;
            results.push(Some(Self::rsi(avg_gain, avg_loss)));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::closes;

    #[test]
    fn test_rsi_reference_values() {
        let candles = closes(&[
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03, 45.61, 46.28, 46.28,
            46.00, 46.03, 46.41, 46.22, 45.64,
        ]);
        let results = Rsi::new(14).unwrap().calculate(&candles);

        assert!(results[..14].iter().all(Option::is_none));
        let first = results[14].unwrap();
        assert!((first - 70.46).abs() < 0.1, "RSI[14] = {}", first);
        assert!(results[15].unwrap() < first);
        assert!(results.iter().flatten().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let candles = closes(&[1.0; 10]);
        assert_eq!(Rsi::new(14).unwrap().calculate(&candles), vec![None; 10]);
    }

    #[test]
    fn test_rsi_all_gains_and_losses() {
        let up = closes(&(1..=20).map(|i| i as f64).collect::<Vec<_>>());
        let down = closes(&(1..=20).map(|i| 20.0 - i as f64).collect::<Vec<_>>());
        let rsi = Rsi::new(14).unwrap();
        assert!(rsi.calculate(&up)[14..].iter().all(|v| *v == Some(100.0)));
        assert!(rsi.calculate(&down)[14..].iter().all(|v| *v == Some(0.0)));
    }

    #[test]
    fn test_rsi_zero_period() {
        assert!(Rsi::new(0).is_err());
    }
}
