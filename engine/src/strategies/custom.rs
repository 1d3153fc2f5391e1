// Declarative strategies loaded from JSON files in the strategies directory.
use super::{crossed_above, crossed_below, Strategy, StrategyParams};
use crate::error::EngineError;
use crate::indicators::{create_indicator, PriceField, KNOWN_INDICATORS};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::models::{Candle, Indicator, ParamSpec, StrategyInfo, StrategyOrigin};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CUSTOM_PREFIX: &str = "Custom: ";

/// On-disk shape of a custom strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomStrategyFile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    pub buy: Option<RuleSet>,
    pub sell: Option<RuleSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSet {
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl RuleSet {
    pub fn conditions(&self) -> &[Condition] {
        match self {
            RuleSet::All(c) | RuleSet::Any(c) => c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub left: Operand,
    pub op: Comparator,
    pub right: Operand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Gt,
    Lt,
    Ge,
    Le,
    CrossesAbove,
    CrossesBelow,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::CrossesAbove => "crossed above",
            Comparator::CrossesBelow => "crossed below",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Price {
        price: PriceField,
    },
    Indicator {
        indicator: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<NumberOrParam>,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        args: Map<String, Value>,
    },
    Value {
        value: NumberOrParam,
    },
}

/// A literal number or a `"$name"` reference to a declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrParam {
    Number(f64),
    Param(String),
}

impl NumberOrParam {
    fn param_name(&self) -> Option<&str> {
        match self {
            NumberOrParam::Param(s) => Some(s.strip_prefix('$').unwrap_or(s)),
            NumberOrParam::Number(_) => None,
        }
    }

    fn resolve(&self, params: &StrategyParams) -> Result<f64, EngineError> {
        match self {
            NumberOrParam::Number(n) => Ok(*n),
            NumberOrParam::Param(_) => params.get(self.param_name().unwrap_or_default()),
        }
    }
}

fn is_macd_line(indicator: &str) -> bool {
    matches!(indicator, "macd" | "macd_signal" | "macd_hist")
}

impl CustomStrategyFile {
    pub fn registered_name(&self) -> String {
        format!("{}{}", CUSTOM_PREFIX, self.name)
    }

    pub fn info(&self, path: &Path) -> StrategyInfo {
        StrategyInfo {
            name: self.registered_name(),
            description: self.description.clone(),
            origin: StrategyOrigin::Custom { path: path.to_path_buf() },
            params: self.params.clone(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let load_error = |message: String| EngineError::StrategyLoadError { path: path.display().to_string(), message };
        let text = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let file: CustomStrategyFile = serde_json::from_str(&text).map_err(|e| load_error(e.to_string()))?;
        file.validate().map_err(|e| load_error(e.to_string()))?;
        Ok(file)
    }

    /// Checks that the file describes a usable strategy: both rule sets present,
    /// every indicator known and every `$param` declared. Indicators are also
    /// instantiated with the default parameters.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fail = |msg: String| Err(EngineError::StrategyError(msg));
        if self.name.trim().is_empty() {
            return fail("Strategy name must not be empty".to_string());
        }

        let mut declared = HashSet::new();
        for spec in &self.params {
            if !declared.insert(spec.name.as_str()) {
                return fail(format!("Parameter '{}' is declared twice", spec.name));
            }
            if spec.min > spec.max {
                return fail(format!("Parameter '{}' has min greater than max", spec.name));
            }
            spec.validate(spec.default)
                .map_err(|e| EngineError::StrategyError(format!("Default for '{}': {}", spec.name, e)))?;
        }

        for (side, rules) in [("buy", &self.buy), ("sell", &self.sell)] {
            let Some(rules) = rules else {
                return fail(format!("Missing '{}' rules", side));
            };
            if rules.conditions().is_empty() {
                return fail(format!("'{}' rules must contain at least one condition", side));
            }
            for condition in rules.conditions() {
                for operand in [&condition.left, &condition.right] {
                    self.validate_operand(operand, &declared)?;
                }
            }
        }

        let defaults = StrategyParams::defaults(&self.params);
        for rules in [&self.buy, &self.sell].into_iter().flatten() {
            for condition in rules.conditions() {
                for operand in [&condition.left, &condition.right] {
                    if let Operand::Indicator { indicator, period, args } = operand {
                        build_indicator(indicator, period.as_ref(), args, &defaults)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_operand(&self, operand: &Operand, declared: &HashSet<&str>) -> Result<(), EngineError> {
        let check_param = |value: &NumberOrParam| match value.param_name() {
            Some(name) if !declared.contains(name) => {
                Err(EngineError::StrategyError(format!("Reference to undeclared parameter '${}'", name)))
            }
            _ => Ok(()),
        };
        match operand {
            Operand::Price { .. } => Ok(()),
            Operand::Value { value } => check_param(value),
            Operand::Indicator { indicator, period, args } => {
                let lowered = indicator.to_lowercase();
                if !KNOWN_INDICATORS.contains(&lowered.as_str()) {
                    return Err(EngineError::StrategyError(format!(
                        "Unknown indicator '{}' (known: {})",
                        indicator,
                        KNOWN_INDICATORS.join(", ")
                    )));
                }
                match period {
                    Some(p) => check_param(p)?,
                    None if !is_macd_line(&lowered) => {
                        return Err(EngineError::StrategyError(format!("Indicator '{}' needs a period", indicator)));
                    }
                    None => {}
                }
                for value in args.values() {
                    if let Some(reference) = value.as_str().and_then(|s| s.strip_prefix('$')) {
                        if !declared.contains(reference) {
                            return Err(EngineError::StrategyError(format!(
                                "Reference to undeclared parameter '${}'",
                                reference
                            )));
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

fn resolve_args(args: &Map<String, Value>, params: &StrategyParams) -> Result<Value, EngineError> {
    let mut resolved = Map::new();
    for (key, value) in args {
        let value = match value.as_str().and_then(|s| s.strip_prefix('$')) {
            Some(name) => Value::from(params.get(name)?),
            None => value.clone(),
        };
        resolved.insert(key.clone(), value);
    }
    Ok(Value::Object(resolved))
}

fn build_indicator(
    indicator: &str,
    period: Option<&NumberOrParam>,
    args: &Map<String, Value>,
    params: &StrategyParams,
) -> Result<Box<dyn crate::indicators::IndicatorCalculator>, EngineError> {
    let period = match period {
        Some(p) => {
            let value = p.resolve(params)?;
            if value < 1.0 || value.fract() != 0.0 {
                return Err(EngineError::StrategyError(format!(
                    "Indicator '{}' period must be a positive integer, got {}",
                    indicator, value
                )));
            }
            value as usize
        }
        // MACD lines take their periods from args.
        None => 1,
    };
    create_indicator(indicator, period, &resolve_args(args, params)?)
}

/// A condition with both sides evaluated over the whole series.
struct CompiledCondition {
    left: Vec<Option<f64>>,
    right: Vec<Option<f64>>,
    op: Comparator,
    reason: String,
}

impl CompiledCondition {
    fn holds(&self, bar: usize) -> bool {
        match self.op {
            Comparator::CrossesAbove => crossed_above(&self.left, &self.right, bar),
            Comparator::CrossesBelow => crossed_below(&self.left, &self.right, bar),
            op => {
                let (Some(l), Some(r)) = (self.left.get(bar).copied().flatten(), self.right.get(bar).copied().flatten())
                else {
                    return false;
                };
                match op {
                    Comparator::Gt => l > r,
                    Comparator::Lt => l < r,
                    Comparator::Ge => l >= r,
                    _ => l <= r,
                }
            }
        }
    }
}

struct CompiledRules {
    require_all: bool,
    conditions: Vec<CompiledCondition>,
}

impl CompiledRules {
    fn reason(&self, bar: usize) -> Option<String> {
        if self.require_all {
            if self.conditions.iter().all(|c| c.holds(bar)) {
                let parts: Vec<&str> = self.conditions.iter().map(|c| c.reason.as_str()).collect();
                return Some(parts.join(" and "));
            }
            None
        } else {
            self.conditions.iter().find(|c| c.holds(bar)).map(|c| c.reason.clone())
        }
    }
}

pub struct CustomStrategy {
    name: String,
    definition: Arc<CustomStrategyFile>,
    params: StrategyParams,
    buy: Option<CompiledRules>,
    sell: Option<CompiledRules>,
    indicators: Vec<Indicator>,
}

impl CustomStrategy {
    pub fn new(definition: Arc<CustomStrategyFile>, params: StrategyParams) -> Self {
        Self { name: definition.registered_name(), definition, params, buy: None, sell: None, indicators: Vec::new() }
    }

    fn evaluate(&mut self, operand: &Operand, candles: &[Candle]) -> Result<(Vec<Option<f64>>, String), EngineError> {
        match operand {
            Operand::Price { price } => {
                let label = serde_json::to_value(price).ok().and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default();
                Ok((price.extract(candles).into_iter().map(Some).collect(), label))
            }
            Operand::Value { value } => {
                let v = value.resolve(&self.params)?;
                Ok((vec![Some(v); candles.len()], format!("{}", v)))
            }
            Operand::Indicator { indicator, period, args } => {
                let calc = build_indicator(indicator, period.as_ref(), args, &self.params)?;
                let values = calc.calculate(candles);
                let label = calc.name().to_string();
                if !self.indicators.iter().any(|i| i.name == label) {
                    self.indicators.push(Indicator { name: label.clone(), parameters: calc.parameters(), values: values.clone() });
                }
                Ok((values, label))
            }
        }
    }

    fn compile(&mut self, rules: &RuleSet, candles: &[Candle]) -> Result<CompiledRules, EngineError> {
        let mut conditions = Vec::new();
        for condition in rules.conditions() {
            let (left, left_label) = self.evaluate(&condition.left, candles)?;
            let (right, right_label) = self.evaluate(&condition.right, candles)?;
            let reason = condition
                .reason
                .clone()
                .unwrap_or_else(|| format!("{} {} {}", left_label, condition.op, right_label));
            conditions.push(CompiledCondition { left, right, op: condition.op, reason });
        }
        Ok(CompiledRules { require_all: matches!(rules, RuleSet::All(_)), conditions })
    }
}

impl Strategy for CustomStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, candles: &[Candle]) -> Result<(), EngineError> {
        self.indicators.clear();
        let definition = Arc::clone(&self.definition);
        self.buy = definition.buy.as_ref().map(|r| self.compile(r, candles)).transpose()?;
        self.sell = definition.sell.as_ref().map(|r| self.compile(r, candles)).transpose()?;
        Ok(())
    }

    fn buy_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
        self.buy.as_ref()?.reason(bar)
    }

    fn sell_reason(&self, bar: usize, _candles: &[Candle]) -> Option<String> {
        self.sell.as_ref()?.reason(bar)
    }

    fn indicators(&self) -> Vec<Indicator> {
        self.indicators.clone()
    }
}

/// A successfully parsed and validated custom strategy file.
#[derive(Debug, Clone)]
pub struct LoadedStrategy {
    pub path: PathBuf,
    pub definition: Arc<CustomStrategyFile>,
}

/// Scans `dir` for `*.json` files, skipping names that start with `_`.
/// Invalid files are logged and skipped.
pub fn load_custom_strategies(dir: &Path) -> Result<Vec<LoadedStrategy>, EngineError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        tracing::info!(dir = %dir.display(), "Created custom strategies directory");
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "json")
                && path.file_name().and_then(|n| n.to_str()).is_some_and(|n| !n.starts_with('_'))
        })
        .collect();
    paths.sort();

    let mut loaded: Vec<LoadedStrategy> = Vec::new();
    for path in paths {
        match CustomStrategyFile::from_path(&path) {
            Ok(definition) => {
                if loaded.iter().any(|l| l.definition.name == definition.name) {
                    tracing::warn!(path = %path.display(), name = %definition.name, "Duplicate custom strategy name, skipping file");
                    continue;
                }
                tracing::info!(path = %path.display(), name = %definition.registered_name(), "Loaded custom strategy");
                loaded.push(LoadedStrategy { path, definition: Arc::new(definition) });
            }
            Err(e) => tracing::error!(path = %path.display(), error = %e, "Error loading custom strategy"),
        }
    }
    Ok(loaded)
}

/// Example strategy written by `create_template`: SMA(param1) / SMA(param2) crossover.
pub fn template(name: &str) -> CustomStrategyFile {
    let sma = |param: &str| Operand::Indicator {
        indicator: "sma".to_string(),
        period: Some(NumberOrParam::Param(format!("${}", param))),
        args: Map::new(),
    };
    CustomStrategyFile {
        name: name.to_string(),
        description: format!("Custom {} trading strategy", name),
        params: vec![
            ParamSpec::int("param1", 10, 1, 100, "Fast moving average period"),
            ParamSpec::int("param2", 20, 1, 200, "Slow moving average period"),
        ],
        buy: Some(RuleSet::All(vec![Condition {
            left: sma("param1"),
            op: Comparator::CrossesAbove,
            right: sma("param2"),
            reason: None,
        }])),
        sell: Some(RuleSet::All(vec![Condition {
            left: sma("param1"),
            op: Comparator::CrossesBelow,
            right: sma("param2"),
            reason: None,
        }])),
    }
}

/// Writes the template to `{dir}/{name_lower}_strategy.json`; never overwrites.
pub fn create_template(dir: &Path, name: &str) -> Result<PathBuf, EngineError> {
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(EngineError::StrategyError(format!(
            "Invalid strategy name '{}': use letters, digits, '-' or '_'",
            name
        )));
    }
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}_strategy.json", name.to_lowercase()));
    if path.exists() {
        return Err(EngineError::StrategyError(format!("Strategy file {} already exists", path.display())));
    }
    let json = serde_json::to_string_pretty(&template(name))?;
    std::fs::write(&path, json)?;
    tracing::info!(path = %path.display(), "Created custom strategy template");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{candles_from_closes, drive};
    use shared::models::SignalSide;
    use tempfile::tempdir;

    const RSI_FILE: &str = r#"{
        "name": "RsiBand",
        "description": "RSI thresholds from parameters",
        "params": [
            {"name": "period", "type": "int", "default": 5, "min": 2, "max": 50, "description": "RSI period"},
            {"name": "lower", "type": "int", "default": 30, "min": 5, "max": 50, "description": "Oversold"}
        ],
        "buy": {"all": [{"left": {"indicator": "rsi", "period": "$period"}, "op": "lt", "right": {"value": "$lower"}, "reason": "RSI oversold"}]},
        "sell": {"any": [{"left": {"indicator": "rsi", "period": "$period"}, "op": "gt", "right": {"value": 70}}]}
    }"#;

    #[test]
    fn test_parse_operands() {
        let file: CustomStrategyFile = serde_json::from_str(RSI_FILE).unwrap();
        file.validate().unwrap();
        let buy = file.buy.as_ref().unwrap().conditions();
        assert!(matches!(&buy[0].left, Operand::Indicator { indicator, .. } if indicator == "rsi"));
        assert_eq!(buy[0].right, Operand::Value { value: NumberOrParam::Param("$lower".to_string()) });
        let price: Operand = serde_json::from_str(r#"{"price": "high"}"#).unwrap();
        assert_eq!(price, Operand::Price { price: PriceField::High });
    }

    #[test]
    fn test_validation_failures() {
        let mut file: CustomStrategyFile = serde_json::from_str(RSI_FILE).unwrap();
        file.sell = None;
        assert!(file.validate().unwrap_err().to_string().contains("Missing 'sell' rules"));

        let unknown = RSI_FILE.replace("\"rsi\"", "\"vwap\"");
        let file: CustomStrategyFile = serde_json::from_str(&unknown).unwrap();
        assert!(file.validate().unwrap_err().to_string().contains("Unknown indicator 'vwap'"));

        let undeclared = RSI_FILE.replace("\"$lower\"", "\"$floor\"");
        let file: CustomStrategyFile = serde_json::from_str(&undeclared).unwrap();
        assert!(file.validate().unwrap_err().to_string().contains("undeclared parameter '$floor'"));

        let empty = RSI_FILE.replace(r#""any": [{"left": {"indicator": "rsi", "period": "$period"}, "op": "gt", "right": {"value": 70}}]"#, r#""any": []"#);
        let file: CustomStrategyFile = serde_json::from_str(&empty).unwrap();
        assert!(file.validate().is_err());
    }

    #[test]
    fn test_custom_strategy_runs_with_param_overrides() {
        let file: CustomStrategyFile = serde_json::from_str(RSI_FILE).unwrap();
        let mut closes: Vec<f64> = (0..10).map(|i| 100.0 - i as f64 * 3.0).collect();
        closes.extend((0..12).map(|i| 73.0 + i as f64 * 4.0));
        let candles = candles_from_closes(&closes);

        let params = StrategyParams::resolve(&file.params, &[("lower".to_string(), 25.0)].into_iter().collect()).unwrap();
        let mut strategy = CustomStrategy::new(Arc::new(file), params);
        let signals = drive(&mut strategy, &candles);

        assert_eq!(strategy.name(), "Custom: RsiBand");
        assert_eq!(signals[0].side, SignalSide::Buy);
        assert_eq!(signals[0].reason, "RSI oversold");
        let sell = signals.iter().find(|s| s.side == SignalSide::Sell).unwrap();
        assert!(sell.reason.starts_with("RSI(5) > 70"));
        assert_eq!(strategy.indicators().len(), 1);
    }

    #[test]
    fn test_loader_skips_invalid_and_underscored_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("rsi_band.json"), RSI_FILE).unwrap();
        std::fs::write(dir.path().join("_disabled.json"), RSI_FILE).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loaded = load_custom_strategies(dir.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].definition.registered_name(), "Custom: RsiBand");
    }

    #[test]
    fn test_loader_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("custom_strategies");
        assert!(load_custom_strategies(&target).unwrap().is_empty());
        assert!(target.is_dir());
    }

    #[test]
    fn test_template_is_valid_and_never_overwritten() {
        let dir = tempdir().unwrap();
        let path = create_template(dir.path(), "Breakout").unwrap();
        assert_eq!(path.file_name().unwrap(), "breakout_strategy.json");

        let file = CustomStrategyFile::from_path(&path).unwrap();
        assert_eq!(file.params[0].default, 10.0);
        assert_eq!(file.params[1].max, 200.0);

        let err = create_template(dir.path(), "Breakout").unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(create_template(dir.path(), "../escape").is_err());
    }

    #[test]
    fn test_template_trades_sma_cross() {
        let file = template("Cross");
        let params = StrategyParams::resolve(
            &file.params,
            &[("param1".to_string(), 2.0), ("param2".to_string(), 4.0)].into_iter().collect(),
        )
        .unwrap();
        let candles = candles_from_closes(&[10.0, 10.0, 10.0, 10.0, 12.0, 14.0, 12.0, 8.0, 6.0]);
        let signals = drive(&mut CustomStrategy::new(Arc::new(file), params), &candles);
        assert_eq!(signals[0].side, SignalSide::Buy);
        assert_eq!(signals[0].reason, "SMA(2) crossed above SMA(4)");
        assert_eq!(signals[1].side, SignalSide::Sell);
    }
}
