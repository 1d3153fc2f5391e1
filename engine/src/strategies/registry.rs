use super::builtin::{self, Factory};
use super::custom::{self, CustomStrategy, LoadedStrategy};
use super::{Strategy, StrategyParams};
use crate::error::EngineError;
use shared::models::{ParamSpec, StrategyInfo};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

enum Entry {
    Builtin(Factory),
    Custom(LoadedStrategy),
}

/// Built-in strategies plus the custom ones discovered in `strategies_dir`.
pub struct StrategyRegistry {
    strategies_dir: PathBuf,
    infos: Vec<StrategyInfo>,
    entries: HashMap<String, Entry>,
}

impl StrategyRegistry {
    /// Registry with built-ins only; call `load_custom_strategies` to add files.
    pub fn new(strategies_dir: impl Into<PathBuf>) -> Self {
        let mut registry = Self { strategies_dir: strategies_dir.into(), infos: Vec::new(), entries: HashMap::new() };
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        for b in builtin::all() {
            self.entries.insert(b.info.name.clone(), Entry::Builtin(b.factory));
            self.infos.push(b.info);
        }
    }

    pub fn strategies_dir(&self) -> &Path {
        &self.strategies_dir
    }

    /// Adds every valid custom file; returns how many were registered.
    pub fn load_custom_strategies(&mut self) -> Result<usize, EngineError> {
        let mut count = 0;
        for loaded in custom::load_custom_strategies(&self.strategies_dir)? {
            let info = loaded.definition.info(&loaded.path);
            self.infos.retain(|i| i.name != info.name);
            self.entries.insert(info.name.clone(), Entry::Custom(loaded));
            self.infos.push(info);
            count += 1;
        }
        tracing::info!(count, dir = %self.strategies_dir.display(), "Custom strategies loaded");
        Ok(count)
    }

    /// Drops every custom strategy and rescans the directory.
    pub fn reload(&mut self) -> Result<usize, EngineError> {
        self.entries.retain(|_, entry| matches!(entry, Entry::Builtin(_)));
        let entries = &self.entries;
        self.infos.retain(|info| entries.contains_key(&info.name));
        self.load_custom_strategies()
    }

    pub fn list(&self) -> &[StrategyInfo] {
        &self.infos
    }

    pub fn names(&self) -> Vec<&str> {
        self.infos.iter().map(|i| i.name.as_str()).collect()
    }

    pub fn get_info(&self, name: &str) -> Option<&StrategyInfo> {
        self.infos.iter().find(|i| i.name == name)
    }

    pub fn get_params(&self, name: &str) -> Result<&[ParamSpec], EngineError> {
        self.get_info(name).map(|i| i.params.as_slice()).ok_or_else(|| not_found(name))
    }

    /// Resolves `provided` against the strategy's parameter specs and builds a fresh instance.
    pub fn create(&self, name: &str, provided: &HashMap<String, f64>) -> Result<(Box<dyn Strategy>, StrategyParams), EngineError> {
        let specs = self.get_params(name)?;
        let params = StrategyParams::resolve(specs, provided)?;
        let strategy: Box<dyn Strategy> = match self.entries.get(name) {
            Some(Entry::Builtin(factory)) => factory(&params)?,
            Some(Entry::Custom(loaded)) => Box::new(CustomStrategy::new(Arc::clone(&loaded.definition), params.clone())),
            None => return Err(not_found(name)),
        };
        tracing::debug!(strategy = name, params = ?params.as_map(), "Strategy instance created");
        Ok((strategy, params))
    }

    pub fn create_custom_strategy_template(&self, name: &str) -> Result<PathBuf, EngineError> {
        custom::create_template(&self.strategies_dir, name)
    }
}

fn not_found(name: &str) -> EngineError {
    EngineError::StrategyError(format!("Strategy '{}' not found", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_builtins_are_listed_in_order() {
        let registry = StrategyRegistry::new("unused");
        assert_eq!(
            registry.names(),
            vec!["SMA Crossover", "RSI", "MACD", "Fibonacci Retracement", "Bollinger Bands", "Simple", "BTC Trader"]
        );
        assert_eq!(registry.get_params("RSI").unwrap().len(), 3);
    }

    #[test]
    fn test_create_resolves_params() {
        let registry = StrategyRegistry::new("unused");
        let provided = HashMap::from([("sma_period".to_string(), 20.0)]);
        let (strategy, params) = registry.create("SMA Crossover", &provided).unwrap();
        assert_eq!(strategy.name(), "SMA Crossover");
        assert_eq!(params.get("sma_period").unwrap(), 20.0);

        let err = registry.create("Nope", &HashMap::new()).err().unwrap();
        assert_eq!(err.to_string(), "Strategy error: Strategy 'Nope' not found");
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let bad = HashMap::from([("sma_period".to_string(), 1.0)]);
        assert!(registry.create("SMA Crossover", &bad).is_err());
    }

    #[test]
    fn test_template_is_discovered_on_reload() {
        let dir = tempdir().unwrap();
        let mut registry = StrategyRegistry::new(dir.path());
        assert_eq!(registry.load_custom_strategies().unwrap(), 0);

        let path = registry.create_custom_strategy_template("Breakout").unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(registry.reload().unwrap(), 1);
        assert_eq!(registry.reload().unwrap(), 1);
        assert_eq!(registry.list().len(), 8);

        let (strategy, params) = registry.create("Custom: Breakout", &HashMap::new()).unwrap();
        assert_eq!(strategy.name(), "Custom: Breakout");
        assert_eq!(params.get("param2").unwrap(), 20.0);

        std::fs::remove_file(&path).unwrap();
        assert_eq!(registry.reload().unwrap(), 0);
        assert!(registry.get_info("Custom: Breakout").is_none());
    }
}
