// Optional AI narration of report metrics through an OpenAI-compatible chat API.
use super::generator::PerformanceMetrics;
use crate::backtest::BacktestConfig;
use crate::config::settings::NarratorSettings;
use crate::error::EngineError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const TEMPLATE_NARRATOR: &str = "template";

const SYSTEM_PROMPT: &str = "You are a trading performance analyst. Explain backtest results to a retail trader \
in plain language: what went well, what went badly and what to try next. Use at most six short bullet points \
and do not invent numbers that are not in the data.";

#[async_trait]
pub trait ReportNarrator: Send + Sync {
    /// Shown in the report as the author of the insights.
    fn name(&self) -> &str;

    async fn narrate(&self, prompt: &str) -> Result<String, EngineError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    content: Option<String>,
}

pub struct OpenAiNarrator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiNarrator {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self, EngineError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature: 0.3,
            max_tokens: 600,
        })
    }

    /// `None` when narration is disabled or no API key was found.
    pub fn from_settings(settings: &NarratorSettings) -> Result<Option<Self>, EngineError> {
        if !settings.is_active() {
            tracing::info!(enabled = settings.enabled, key_env = %settings.api_key_env, "AI narration inactive, using templated insights");
            return Ok(None);
        }
        let Some(key) = settings.api_key.as_deref() else {
            return Ok(None);
        };
        let mut narrator = Self::new(&settings.base_url, key, &settings.model, Duration::from_secs(settings.request_timeout_secs))?;
        narrator.temperature = settings.temperature;
        narrator.max_tokens = settings.max_tokens;
        Ok(Some(narrator))
    }
}

#[async_trait]
impl ReportNarrator for OpenAiNarrator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn narrate(&self, prompt: &str) -> Result<String, EngineError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        tracing::debug!(url = %url, model = %self.model, "Requesting narration");

        let response = self.client.post(&url).bearer_auth(&self.api_key).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::NarratorError(format!("API returned {}: {}", status, text)));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| EngineError::NarratorError("Response contained no message content".to_string()))
    }
}

/// Metrics rendered as the user message sent to the model.
pub fn build_prompt(config: &BacktestConfig, metrics: &PerformanceMetrics) -> String {
    let basic = &metrics.basic_performance;
    let params: Vec<String> = basic.strategy_params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    let sharpe = metrics.risk.sharpe_ratio.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "N/A".to_string());
    let sqn = metrics.system_quality.sqn.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "N/A".to_string());
    format!(
        "Backtest of strategy '{strategy}' on {symbol}, {interval} bars from {period}.\n\
         Parameters: {}\n\
         Starting value: {:.2}, final value: {:.2}, total return: {:.2}%, annualized: {:.2}%\n\
         Sharpe ratio: {}, max drawdown: {:.2}% over {} bars\n\
         Trades: {} closed, {} open, win rate {:.2}%, avg win {:.2}, avg loss {:.2}\n\
         Longest streaks: {} wins, {} losses\n\
         SQN: {}, VWR: {:.2}\n\
         Write the insights section of the report.",
        if params.is_empty() { "defaults".to_string() } else { params.join(", ") },
        basic.starting_value,
        basic.final_value,
        basic.total_return,
        metrics.returns.annualized_return,
        sharpe,
        metrics.risk.max_drawdown,
        metrics.risk.max_drawdown_period,
        metrics.trades.closed_trades,
        metrics.trades.open_trades,
        metrics.trades.win_rate,
        metrics.trades.avg_win,
        metrics.trades.avg_loss,
        metrics.trades.max_consecutive_wins,
        metrics.trades.max_consecutive_losses,
        sqn,
        metrics.system_quality.vwr,
        strategy = config.strategy_name,
        symbol = config.symbol,
        interval = config.interval,
        period = basic.data_period,
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Narration {
    pub text: String,
    pub narrator: String,
}

/// Asks `narrator` for insights; any failure, or no narrator, yields `templated`.
pub async fn narrate_insights(
    narrator: Option<&dyn ReportNarrator>,
    config: &BacktestConfig,
    metrics: &PerformanceMetrics,
    templated: &str,
) -> Narration {
    let fallback = || Narration { text: templated.to_string(), narrator: TEMPLATE_NARRATOR.to_string() };
    let Some(narrator) = narrator else {
        return fallback();
    };
    match narrator.narrate(&build_prompt(config, metrics)).await {
        Ok(text) => {
            tracing::info!(narrator = narrator.name(), chars = text.len(), "AI insights generated");
            Narration { text, narrator: narrator.name().to_string() }
        }
        Err(e) => {
            tracing::warn!(narrator = narrator.name(), error = %e, "AI narration failed, using templated insights");
            fallback()
        }
    }
}
