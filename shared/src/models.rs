use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// `(high + low + 2 * close) / 4`
    pub fn weighted_price(&self) -> f64 {
        (self.high + self.low + self.close * 2.0) / 4.0
    }

    /// True when every price is finite and positive and the bar is internally consistent.
    pub fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0)
            && self.volume.is_finite()
            && self.volume >= 0.0
            && self.low <= self.high
            && self.low <= self.open.min(self.close)
            && self.high >= self.open.max(self.close)
    }
}

/// Bar interval, using the provider-style codes ("1m", "1h", "1wk", ...).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Interval {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[default]
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1wk")]
    Week1,
    #[serde(rename = "1mo")]
    Month1,
}

impl Interval {
    pub const ALL: [Interval; 9] = [
        Interval::Minute1,
        Interval::Minute5,
        Interval::Minute15,
        Interval::Minute30,
        Interval::Hour1,
        Interval::Hour4,
        Interval::Day1,
        Interval::Week1,
        Interval::Month1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute1 => "1m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Minute30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Hour4 => "4h",
            Interval::Day1 => "1d",
            Interval::Week1 => "1wk",
            Interval::Month1 => "1mo",
        }
    }

    /// Nominal bar length. Months are treated as 30 days.
    pub fn duration(&self) -> Duration {
        match self {
            Interval::Minute1 => Duration::minutes(1),
            Interval::Minute5 => Duration::minutes(5),
            Interval::Minute15 => Duration::minutes(15),
            Interval::Minute30 => Duration::minutes(30),
            Interval::Hour1 => Duration::hours(1),
            Interval::Hour4 => Duration::hours(4),
            Interval::Day1 => Duration::days(1),
            Interval::Week1 => Duration::weeks(1),
            Interval::Month1 => Duration::days(30),
        }
    }

    /// Bars per year used to annualise per-bar statistics.
    /// Intraday bars assume a market open around the clock.
    pub fn bars_per_year(&self) -> f64 {
        match self {
            Interval::Day1 => 252.0,
            Interval::Week1 => 52.0,
            Interval::Month1 => 12.0,
            intraday => (365.0 * 24.0 * 60.0) / intraday.duration().num_minutes() as f64,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == s.trim())
            .ok_or_else(|| anyhow::anyhow!("Unsupported interval '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Yahoo,
    Binance,
    Csv,
    Synthetic,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Yahoo => "yahoo",
            DataSource::Binance => "binance",
            DataSource::Csv => "csv",
            DataSource::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketData {
    pub symbol: String,
    pub interval: Interval,
    pub source: DataSource,
    pub candles: Vec<Candle>,
}

impl MarketData {
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Int,
    Float,
}

/// Metadata for one tunable strategy parameter, as rendered by the UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_step")]
    pub step: f64,
    #[serde(default)]
    pub description: String,
}

fn default_step() -> f64 {
    1.0
}

impl ParamSpec {
    pub fn int(name: &str, default: i64, min: i64, max: i64, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::Int,
            default: default as f64,
            min: min as f64,
            max: max as f64,
            step: 1.0,
            description: description.to_string(),
        }
    }

    pub fn float(name: &str, default: f64, min: f64, max: f64, step: f64, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::Float,
            default,
            min,
            max,
            step,
            description: description.to_string(),
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        let v = value.clamp(self.min, self.max);
        match self.kind {
            ParamKind::Int => v.round(),
            ParamKind::Float => v,
        }
    }

    pub fn validate(&self, value: f64) -> anyhow::Result<()> {
        if !value.is_finite() {
            anyhow::bail!("Parameter '{}' must be a finite number", self.name);
        }
        if self.kind == ParamKind::Int && value.fract() != 0.0 {
            anyhow::bail!("Parameter '{}' must be an integer, got {}", self.name, value);
        }
        if value < self.min || value > self.max {
            anyhow::bail!(
                "Parameter '{}' = {} is outside the allowed range [{}, {}]",
                self.name, value, self.min, self.max
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyOrigin {
    Builtin,
    Custom { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyInfo {
    pub name: String,
    pub description: String,
    pub origin: StrategyOrigin,
    pub params: Vec<ParamSpec>,
}

impl StrategyInfo {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignalSide {
    Buy,
    Sell,
}

impl fmt::Display for SignalSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSide::Buy => f.write_str("buy"),
            SignalSide::Sell => f.write_str("sell"),
        }
    }
}

/// A decision emitted by a strategy, logged at the bar it was taken.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeSignal {
    pub timestamp: DateTime<Utc>,
    pub side: SignalSide,
    pub price: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Indicator {
    pub name: String,
    pub parameters: serde_json::Value,
    pub values: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_round_trips_through_codes() {
        for interval in Interval::ALL {
            assert_eq!(interval.as_str().parse::<Interval>().unwrap(), interval);
        }
        assert!("2h".parse::<Interval>().is_err());
        assert_eq!(Interval::default(), Interval::Hour1);
    }

    #[test]
    fn test_interval_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Interval::Week1).unwrap(), "\"1wk\"");
        let parsed: Interval = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(parsed, Interval::Minute15);
    }

    #[test]
    fn test_bars_per_year() {
        assert_eq!(Interval::Day1.bars_per_year(), 252.0);
        assert_eq!(Interval::Hour1.bars_per_year(), 8760.0);
    }

    #[test]
    fn test_param_spec_validation() {
        let spec = ParamSpec::int("sma_period", 15, 5, 200, "SMA period");
        assert!(spec.validate(15.0).is_ok());
        assert!(spec.validate(4.0).is_err());
        assert!(spec.validate(15.5).unwrap_err().to_string().contains("integer"));
        assert_eq!(spec.clamp(500.0), 200.0);

        let float_spec = ParamSpec::float("bb_devfactor", 2.0, 1.0, 3.0, 0.1, "Std dev factor");
        assert!(float_spec.validate(2.5).is_ok());
        assert!(float_spec.validate(f64::NAN).is_err());
    }

    #[test]
    fn test_param_spec_json_shape() {
        let json = r#"{"name":"param1","type":"int","default":10,"min":1,"max":100}"#;
        let spec: ParamSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.kind, ParamKind::Int);
        assert_eq!(spec.step, 1.0);
        assert!(spec.description.is_empty());
    }

    #[test]
    fn test_candle_well_formed() {
        let mut candle = Candle {
            symbol: "TEST".to_string(),
            timestamp: Utc::now(),
            open: 10.0,
            high: 12.0,
            low: 9.0,
            close: 11.0,
            volume: 100.0,
        };
        assert!(candle.is_well_formed());
        assert_eq!(candle.weighted_price(), (12.0 + 9.0 + 22.0) / 4.0);
        candle.low = 11.5;
        assert!(!candle.is_well_formed());
    }
}
