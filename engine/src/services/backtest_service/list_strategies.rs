// Handler for the ListStrategies RPC
use super::helpers::to_proto_strategy;
use crate::services::{ListStrategiesRequest, ListStrategiesResponse};
use crate::strategies::StrategyRegistry;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Response, Status};

pub async fn handle_list_strategies(
    _req_payload: ListStrategiesRequest,
    registry: Arc<RwLock<StrategyRegistry>>,
) -> Result<Response<ListStrategiesResponse>, Status> {
    let registry = registry.read().await;
    let strategies: Vec<_> = registry.list().iter().map(to_proto_strategy).collect();
    tracing::debug!(count = strategies.len(), "Listing strategies");
    Ok(Response::new(ListStrategiesResponse { strategies }))
}
