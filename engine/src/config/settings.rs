// Engine settings, loaded from a JSON file with environment overrides.
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "SCALPARO_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/engine.json";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EngineSettings {
    pub host: String,
    pub port: u16,
    pub data: DataSettings,
    pub backtest: BacktestDefaults,
    pub strategies_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub narrator: NarratorSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DataSettings {
    pub yahoo_base_url: String,
    pub binance_base_url: String,
    pub request_timeout_secs: u64,
    /// Directory scanned for `{SYMBOL}.csv` files before hitting the network.
    pub csv_dir: Option<PathBuf>,
    /// Generate sample data when every provider fails.
    pub synthetic_fallback: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BacktestDefaults {
    pub initial_capital: f64,
    pub commission: f64,
    pub position_size: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NarratorSettings {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            host: "127.0.0.1".to_string(),
            port: 50051,
            data: DataSettings::default(),
            backtest: BacktestDefaults::default(),
            strategies_dir: PathBuf::from("custom_strategies"),
            reports_dir: PathBuf::from("."),
            narrator: NarratorSettings::default(),
        }
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        DataSettings {
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            binance_base_url: "https://api.binance.us".to_string(),
            request_timeout_secs: 15,
            csv_dir: None,
            synthetic_fallback: true,
        }
    }
}

impl Default for BacktestDefaults {
    fn default() -> Self {
        BacktestDefaults { initial_capital: 10_000.0, commission: 0.001, position_size: 0.95 }
    }
}

impl Default for NarratorSettings {
    fn default() -> Self {
        NarratorSettings {
            enabled: true,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.3,
            max_tokens: 600,
            request_timeout_secs: 30,
            api_key: None,
        }
    }
}

impl NarratorSettings {
    /// Narration only runs when enabled and a key was found.
    pub fn is_active(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl EngineSettings {
    /// Loads from `$SCALPARO_CONFIG`, else `config/engine.json` when present, else defaults,
    /// then applies environment overrides.
    pub fn load() -> Result<Self, EngineError> {
        let mut settings = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?,
            Err(_) => {
                tracing::debug!("No engine config file found, using defaults.");
                Self::default()
            }
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::ConfigError(format!("Cannot read '{}': {}", path.display(), e)))?;
        let settings: EngineSettings = serde_json::from_str(&raw)
            .map_err(|e| EngineError::ConfigError(format!("Invalid config '{}': {}", path.display(), e)))?;
        tracing::info!(path = %path.display(), "Loaded engine configuration.");
        settings.validate()?;
        Ok(settings)
    }

    /// `lookup` abstracts the environment so overrides can be tested without mutating it.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SCALPARO_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("SCALPARO_PORT") {
            self.port = port
                .parse()
                .map_err(|_| EngineError::ConfigError(format!("SCALPARO_PORT '{}' is not a valid port", port)))?;
        }
        if let Some(dir) = lookup("SCALPARO_STRATEGIES_DIR") {
            self.strategies_dir = PathBuf::from(dir);
        }
        self.narrator.api_key = lookup(&self.narrator.api_key_env).filter(|k| !k.trim().is_empty());
        self.validate()
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.backtest.initial_capital <= 0.0 {
            return Err(EngineError::ConfigError("backtest.initial_capital must be positive".to_string()));
        }
        if !(0.0..0.1).contains(&self.backtest.commission) {
            return Err(EngineError::ConfigError("backtest.commission must be in [0, 0.1)".to_string()));
        }
        if self.backtest.position_size <= 0.0 || self.backtest.position_size > 1.0 {
            return Err(EngineError::ConfigError("backtest.position_size must be in (0, 1]".to_string()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.port, 50051);
        assert_eq!(settings.backtest.initial_capital, 10_000.0);
        assert_eq!(settings.backtest.commission, 0.001);
        assert_eq!(settings.strategies_dir, PathBuf::from("custom_strategies"));
        assert!(settings.data.synthetic_fallback);
        assert!(!settings.narrator.is_active());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 6000, "backtest": {{"commission": 0.002}}}}"#).unwrap();
        let settings = EngineSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.port, 6000);
        assert_eq!(settings.backtest.commission, 0.002);
        assert_eq!(settings.backtest.initial_capital, 10_000.0);
        assert_eq!(settings.host, "127.0.0.1");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"backtest": {{"initial_capital": -5}}}}"#).unwrap();
        let err = EngineSettings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SCALPARO_PORT", "7001"),
            ("SCALPARO_STRATEGIES_DIR", "/tmp/strats"),
            ("OPENAI_API_KEY", "sk-test"),
        ]
        .into_iter()
        .collect();
        let mut settings = EngineSettings::default();
        settings.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.port, 7001);
        assert_eq!(settings.strategies_dir, PathBuf::from("/tmp/strats"));
        assert!(settings.narrator.is_active());
    }

    #[test]
    fn test_bad_port_override() {
        let mut settings = EngineSettings::default();
        let result = settings.apply_env(|k| (k == "SCALPARO_PORT").then(|| "abc".to_string()));
        assert!(result.is_err());
    }
}
