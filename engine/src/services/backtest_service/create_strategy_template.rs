// Handler for the CreateStrategyTemplate RPC
use crate::services::{CreateStrategyTemplateRequest, CreateStrategyTemplateResponse};
use crate::strategies::StrategyRegistry;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Response, Status};

pub async fn handle_create_strategy_template(
    req_payload: CreateStrategyTemplateRequest,
    registry: Arc<RwLock<StrategyRegistry>>,
) -> Result<Response<CreateStrategyTemplateResponse>, Status> {
    let registry = registry.read().await;
    match registry.create_custom_strategy_template(&req_payload.name) {
        Ok(path) => {
            tracing::info!(name = %req_payload.name, path = %path.display(), "Strategy template created");
            Ok(Response::new(CreateStrategyTemplateResponse { path: path.display().to_string() }))
        }
        Err(e) => {
            tracing::error!(name = %req_payload.name, error_detail = ?e, "Failed to create strategy template");
            Err(e.into())
        }
    }
}
