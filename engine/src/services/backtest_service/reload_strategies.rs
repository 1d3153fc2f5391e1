// Handler for the ReloadStrategies RPC
use crate::services::{ReloadStrategiesRequest, ReloadStrategiesResponse};
use crate::strategies::StrategyRegistry;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Response, Status};

pub async fn handle_reload_strategies(
    _req_payload: ReloadStrategiesRequest,
    registry: Arc<RwLock<StrategyRegistry>>,
) -> Result<Response<ReloadStrategiesResponse>, Status> {
    let mut registry = registry.write().await;
    let custom_count = registry.reload()?;
    let total_count = registry.list().len();
    tracing::info!(custom_count, total_count, "Strategies reloaded");
    Ok(Response::new(ReloadStrategiesResponse { custom_count: custom_count as u32, total_count: total_count as u32 }))
}
