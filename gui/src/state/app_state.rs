// Global application state for the GUI, shared through a Dioxus context signal.
use crate::config::AppConfig;
use chrono::NaiveDate;
use engine::report::TradingReport;
use engine::services::{BacktestRequest, BacktestResponse, ParamSpec, StrategyInfo};
use shared::models::Interval;
use shared::utils::{default_date_range, parse_symbols};
use std::collections::{BTreeMap, HashMap};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub enum EngineStatus {
    Connecting,
    Connected,
    Offline(String),
}

impl EngineStatus {
    pub fn label(&self) -> String {
        match self {
            EngineStatus::Connecting => "Connecting...".to_string(),
            EngineStatus::Connected => "Engine online".to_string(),
            EngineStatus::Offline(reason) => format!("Engine offline: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsTab {
    Summary,
    Metrics,
    Trades,
    Report,
}

impl ResultsTab {
    pub const ALL: [ResultsTab; 4] = [ResultsTab::Summary, ResultsTab::Metrics, ResultsTab::Trades, ResultsTab::Report];

    pub fn label(&self) -> &'static str {
        match self {
            ResultsTab::Summary => "Summary",
            ResultsTab::Metrics => "Metrics",
            ResultsTab::Trades => "Trades",
            ResultsTab::Report => "AI Report",
        }
    }
}

/// Values currently entered in the sidebar.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestForm {
    pub symbols: String,
    pub start_date: String,
    pub end_date: String,
    pub interval: Interval,
    pub initial_capital: f64,
    /// Percent of traded value, 0..=1.
    pub commission_pct: f64,
    pub strategy: String,
    pub params: BTreeMap<String, f64>,
    pub use_ai: bool,
    pub include_benchmark: bool,
}

impl BacktestForm {
    pub fn from_config(config: &AppConfig, today: NaiveDate) -> Self {
        let defaults = &config.form;
        let (start, end) = default_date_range(today);
        BacktestForm {
            symbols: defaults.symbols.clone(),
            start_date: start.format(DATE_FORMAT).to_string(),
            end_date: end.format(DATE_FORMAT).to_string(),
            interval: defaults.interval.parse().unwrap_or_default(),
            initial_capital: defaults.initial_capital,
            commission_pct: defaults.commission_pct,
            strategy: defaults.strategy.clone(),
            params: BTreeMap::new(),
            use_ai: defaults.use_ai,
            include_benchmark: defaults.include_benchmark,
        }
    }

    /// Switches strategy and resets every parameter to its default.
    pub fn select_strategy(&mut self, info: &StrategyInfo) {
        self.strategy = info.name.clone();
        self.params = info.params.iter().map(|p| (p.name.clone(), p.default_value)).collect();
    }

    /// Clamps to the declared range; integer parameters are rounded.
    pub fn set_param(&mut self, spec: &ParamSpec, value: f64) {
        if !value.is_finite() {
            return;
        }
        let mut value = value.clamp(spec.min, spec.max);
        if spec.kind == "int" {
            value = value.round();
        }
        self.params.insert(spec.name.clone(), value);
    }

    /// One request per entered symbol, or a message describing the first invalid field.
    pub fn requests(&self) -> Result<Vec<BacktestRequest>, String> {
        let symbols = parse_symbols(&self.symbols);
        if symbols.is_empty() {
            return Err("Enter at least one symbol".to_string());
        }
        let start = NaiveDate::parse_from_str(self.start_date.trim(), DATE_FORMAT)
            .map_err(|_| format!("Start date '{}' is not YYYY-MM-DD", self.start_date))?;
        let end = NaiveDate::parse_from_str(self.end_date.trim(), DATE_FORMAT)
            .map_err(|_| format!("End date '{}' is not YYYY-MM-DD", self.end_date))?;
        if start > end {
            return Err("Start date must not be after end date".to_string());
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err("Initial capital must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.commission_pct) {
            return Err("Commission must be between 0% and 1%".to_string());
        }
        if self.strategy.trim().is_empty() {
            return Err("Select a strategy".to_string());
        }

        let params: HashMap<String, f64> = self.params.iter().map(|(k, v)| (k.clone(), *v)).collect();
        Ok(symbols
            .into_iter()
            .map(|symbol| BacktestRequest {
                symbol,
                interval: self.interval.as_str().to_string(),
                start_date: start.format(DATE_FORMAT).to_string(),
                end_date: end.format(DATE_FORMAT).to_string(),
                initial_capital: self.initial_capital,
                commission: Some(self.commission_pct / 100.0),
                strategy_name: self.strategy.clone(),
                strategy_params: params.clone(),
                use_ai: self.use_ai,
                include_benchmark: self.include_benchmark,
            })
            .collect())
    }
}

/// Result of one symbol's run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub symbol: String,
    pub response: Result<BacktestResponse, String>,
    /// Parsed `report_json`; `None` when the run failed or the report could not be decoded.
    pub report: Option<TradingReport>,
}

impl RunOutcome {
    pub fn new(symbol: String, response: Result<BacktestResponse, String>) -> Self {
        let report = response.as_ref().ok().and_then(|r| match serde_json::from_str::<TradingReport>(&r.report_json) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(symbol = %r.symbol, error = %e, "Could not decode report JSON");
                None
            }
        });
        RunOutcome { symbol, response, report }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: EngineStatus,
    pub strategies: Vec<StrategyInfo>,
    pub form: BacktestForm,
    pub results: Vec<RunOutcome>,
    pub selected: usize,
    pub tab: ResultsTab,
    pub running: bool,
    /// Last toolbar message (template created, strategies reloaded, errors).
    pub notice: Option<String>,
    pub form_error: Option<String>,
}

impl AppState {
    pub fn new(config: &AppConfig, today: NaiveDate) -> Self {
        AppState {
            status: EngineStatus::Connecting,
            strategies: Vec::new(),
            form: BacktestForm::from_config(config, today),
            results: Vec::new(),
            selected: 0,
            tab: ResultsTab::Summary,
            running: false,
            notice: None,
            form_error: None,
        }
    }

    /// Replaces the strategy list. The current selection survives when still listed,
    /// keeping entered values for parameters it still declares.
    pub fn set_strategies(&mut self, strategies: Vec<StrategyInfo>) {
        self.strategies = strategies;
        let Some(info) = self.selected_strategy().cloned().or_else(|| self.strategies.first().cloned()) else {
            self.form.params.clear();
            return;
        };
        let previous = std::mem::take(&mut self.form.params);
        self.form.select_strategy(&info);
        for spec in &info.params {
            if let Some(value) = previous.get(&spec.name) {
                self.form.set_param(spec, *value);
            }
        }
    }

    pub fn selected_strategy(&self) -> Option<&StrategyInfo> {
        self.strategies.iter().find(|s| s.name == self.form.strategy)
    }

    pub fn current(&self) -> Option<&RunOutcome> {
        self.results.get(self.selected)
    }

    pub fn finish_run(&mut self, outcomes: Vec<RunOutcome>) {
        self.results = outcomes;
        self.selected = 0;
        self.running = false;
    }
}
