// GUI configuration, embedded from assets/config/default.json
pub mod theme;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub version: String,
    pub app: AppSettings,
    pub engine: EngineConnSettings,
    pub form: FormDefaults,
    pub chart: ChartConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppSettings {
    pub title: String,
    /// "dark" or "light"
    pub theme: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EngineConnSettings {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    5
}

/// Initial values of the backtest form.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FormDefaults {
    pub symbols: String,
    pub interval: String,
    pub initial_capital: f64,
    /// Percent, as shown on the slider (0.1 = 0.1%).
    pub commission_pct: f64,
    pub strategy: String,
    #[serde(default)]
    pub use_ai: bool,
    #[serde(default)]
    pub include_benchmark: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChartConfig {
    pub width: f64,
    pub price_height: f64,
    pub equity_height: f64,
    pub margin: f64,
    pub background: String,
    pub grid: String,
    pub price_line: String,
    pub equity_line: String,
    pub buy_marker: String,
    pub sell_marker: String,
    pub indicator_colors: Vec<String>,
}

impl AppConfig {
    pub fn load_default() -> Result<Self, anyhow::Error> {
        let config_str = include_str!("../../assets/config/default.json");
        let config: AppConfig = serde_json::from_str(config_str)?;
        Ok(config)
    }

    pub fn engine_endpoint(&self) -> String {
        format!("http://{}:{}", self.engine.host, self.engine.port)
    }
}

impl ChartConfig {
    /// Colour for the `i`-th indicator line, cycling through the palette.
    pub fn indicator_color(&self, i: usize) -> &str {
        if self.indicator_colors.is_empty() {
            return self.price_line.as_str();
        }
        &self.indicator_colors[i % self.indicator_colors.len()]
    }
}
