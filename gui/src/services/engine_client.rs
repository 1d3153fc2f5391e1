// gRPC client for the engine's Backtester service.
use crate::state::RunOutcome;
use anyhow::{anyhow, Result};
use engine::services::{
    BacktestRequest, BacktestResponse, BacktesterClient, CreateStrategyTemplateRequest, ListStrategiesRequest,
    ReloadStrategiesRequest, ReloadStrategiesResponse, StrategyInfo,
};
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

fn status_error(status: tonic::Status) -> anyhow::Error {
    anyhow!("{}", status.message())
}

/// Cheap to clone; clones share the underlying channel.
#[derive(Clone)]
pub struct EngineClient {
    client: BacktesterClient<Channel>,
    endpoint: String,
}

impl EngineClient {
    pub async fn connect(endpoint: String, timeout: Duration) -> Result<Self> {
        let channel = Endpoint::from_shared(endpoint.clone())?.connect_timeout(timeout).connect().await?;
        tracing::info!(endpoint = %endpoint, "Connected to engine");
        Ok(Self { client: BacktesterClient::new(channel), endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn list_strategies(&mut self) -> Result<Vec<StrategyInfo>> {
        let response = self.client.list_strategies(ListStrategiesRequest {}).await.map_err(status_error)?;
        Ok(response.into_inner().strategies)
    }

    pub async fn reload_strategies(&mut self) -> Result<ReloadStrategiesResponse> {
        let response = self.client.reload_strategies(ReloadStrategiesRequest {}).await.map_err(status_error)?;
        Ok(response.into_inner())
    }

    /// Returns the path of the written template file.
    pub async fn create_strategy_template(&mut self, name: &str) -> Result<String> {
        let request = CreateStrategyTemplateRequest { name: name.trim().to_string() };
        let response = self.client.create_strategy_template(request).await.map_err(status_error)?;
        Ok(response.into_inner().path)
    }

    pub async fn run_backtest(&mut self, request: BacktestRequest) -> Result<BacktestResponse> {
        let response = self.client.run_backtest(request).await.map_err(status_error)?;
        Ok(response.into_inner())
    }

    /// Runs each request in turn; a failure is recorded for its symbol and the rest still run.
    pub async fn run_batch(&mut self, requests: Vec<BacktestRequest>) -> Vec<RunOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            let symbol = request.symbol.clone();
            let response = self.run_backtest(request).await.map_err(|e| {
                tracing::error!(symbol = %symbol, error = %e, "Backtest request failed");
                e.to_string()
            });
            outcomes.push(RunOutcome::new(symbol, response));
        }
        outcomes
    }
}
