use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use shared::models::ParamSpec;
use std::collections::{BTreeMap, HashMap};

/// Parameter values resolved against a strategy's `ParamSpec`s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyParams {
    values: BTreeMap<String, f64>,
}

impl StrategyParams {
    /// Missing names take their default; unknown names and out-of-range values are errors.
    pub fn resolve(specs: &[ParamSpec], provided: &HashMap<String, f64>) -> Result<Self, EngineError> {
        if let Some(unknown) = provided.keys().find(|k| !specs.iter().any(|s| &s.name == *k)) {
            let known: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
            return Err(EngineError::StrategyError(format!(
                "Unknown parameter '{}' (expected one of: {})",
                unknown,
                known.join(", ")
            )));
        }

        let mut values = BTreeMap::new();
        for spec in specs {
            let value = provided.get(&spec.name).copied().unwrap_or(spec.default);
            spec.validate(value).map_err(|e| EngineError::StrategyError(e.to_string()))?;
            values.insert(spec.name.clone(), value);
        }
        Ok(Self { values })
    }

    pub fn defaults(specs: &[ParamSpec]) -> Self {
        Self { values: specs.iter().map(|s| (s.name.clone(), s.default)).collect() }
    }

    pub fn get(&self, name: &str) -> Result<f64, EngineError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::StrategyError(format!("Parameter '{}' is not set", name)))
    }

    pub fn get_usize(&self, name: &str) -> Result<usize, EngineError> {
        let value = self.get(name)?;
        if value < 0.0 {
            return Err(EngineError::StrategyError(format!("Parameter '{}' must be non-negative", name)));
        }
        Ok(value.round() as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.values.iter()
    }

    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.values
    }
}

/// Parses `name=value` pairs as given on the command line.
pub fn parse_assignments<'a, I>(pairs: I) -> Result<HashMap<String, f64>, EngineError>
where
    I: IntoIterator<Item = &'a str>,
{
    pairs
        .into_iter()
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| EngineError::StrategyError(format!("Expected name=value, got '{}'", pair)))?;
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| EngineError::StrategyError(format!("Parameter '{}' has non-numeric value '{}'", name, value)))?;
            Ok((name.trim().to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::int("rsi_period", 14, 5, 50, "RSI period"),
            ParamSpec::float("bb_devfactor", 2.0, 1.0, 3.0, 0.1, "Std dev factor"),
        ]
    }

    #[test]
    fn test_resolve_fills_defaults() {
        let provided = HashMap::from([("rsi_period".to_string(), 21.0)]);
        let params = StrategyParams::resolve(&specs(), &provided).unwrap();
        assert_eq!(params.get_usize("rsi_period").unwrap(), 21);
        assert_eq!(params.get("bb_devfactor").unwrap(), 2.0);
    }

    #[test]
    fn test_resolve_rejects_unknown_and_out_of_range() {
        let unknown = HashMap::from([("period".to_string(), 21.0)]);
        let err = StrategyParams::resolve(&specs(), &unknown).unwrap_err();
        assert!(err.to_string().contains("Unknown parameter 'period'"));

        let out_of_range = HashMap::from([("rsi_period".to_string(), 500.0)]);
        assert!(StrategyParams::resolve(&specs(), &out_of_range).is_err());

        let fractional = HashMap::from([("rsi_period".to_string(), 14.5)]);
        assert!(StrategyParams::resolve(&specs(), &fractional).is_err());
    }

    #[test]
    fn test_parse_assignments() {
        let parsed = parse_assignments(["sma_period=20", " rsi_lower = 25.5"]).unwrap();
        assert_eq!(parsed["sma_period"], 20.0);
        assert_eq!(parsed["rsi_lower"], 25.5);
        assert!(parse_assignments(["oops"]).is_err());
        assert!(parse_assignments(["x=abc"]).is_err());
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let params = StrategyParams::defaults(&specs());
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["rsi_period"], 14.0);
    }
}
