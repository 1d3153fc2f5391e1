// Backtester gRPC service: shared state plus one handler module per RPC.
use super::{
    Backtester, BacktestRequest, BacktestResponse, CreateStrategyTemplateRequest, CreateStrategyTemplateResponse,
    ListStrategiesRequest, ListStrategiesResponse, MarketDataRequest, MarketDataResponse, ReloadStrategiesRequest,
    ReloadStrategiesResponse,
};
use crate::config::settings::BacktestDefaults;
use crate::data::market_data::MarketDataStore;
use crate::data::DataFetcher;
use crate::report::ReportNarrator;
use crate::strategies::StrategyRegistry;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

pub mod create_strategy_template;
pub mod get_market_data;
pub mod helpers;
pub mod list_strategies;
pub mod reload_strategies;
pub mod run_backtest;

/// State shared by every RPC.
#[derive(Clone)]
pub struct ServiceContext {
    pub registry: Arc<RwLock<StrategyRegistry>>,
    pub fetcher: Arc<DataFetcher>,
    pub market_data_store: Arc<RwLock<MarketDataStore>>,
    pub narrator: Option<Arc<dyn ReportNarrator>>,
    pub defaults: BacktestDefaults,
}

pub struct BacktestService {
    ctx: ServiceContext,
}

impl BacktestService {
    pub fn new(ctx: ServiceContext) -> Self {
        BacktestService { ctx }
    }
}

#[tonic::async_trait]
impl Backtester for BacktestService {
    async fn list_strategies(&self, request: Request<ListStrategiesRequest>) -> Result<Response<ListStrategiesResponse>, Status> {
        let req_payload = request.into_inner();
        tracing::info!("Received ListStrategiesRequest");
        list_strategies::handle_list_strategies(req_payload, self.ctx.registry.clone()).await
    }

    async fn reload_strategies(&self, request: Request<ReloadStrategiesRequest>) -> Result<Response<ReloadStrategiesResponse>, Status> {
        let req_payload = request.into_inner();
        tracing::info!("Received ReloadStrategiesRequest");
        reload_strategies::handle_reload_strategies(req_payload, self.ctx.registry.clone()).await
    }

    async fn create_strategy_template(
        &self,
        request: Request<CreateStrategyTemplateRequest>,
    ) -> Result<Response<CreateStrategyTemplateResponse>, Status> {
        let req_payload = request.into_inner();
        tracing::info!(name = %req_payload.name, "Received CreateStrategyTemplateRequest");
        create_strategy_template::handle_create_strategy_template(req_payload, self.ctx.registry.clone()).await
    }

    type GetMarketDataStream = ReceiverStream<Result<MarketDataResponse, Status>>;

    async fn get_market_data(&self, request: Request<MarketDataRequest>) -> Result<Response<Self::GetMarketDataStream>, Status> {
        let req_payload = request.into_inner();
        tracing::info!(
            symbol = %req_payload.symbol,
            interval = %req_payload.interval,
            start = %req_payload.start_date,
            end = %req_payload.end_date,
            "Received GetMarketDataRequest"
        );
        get_market_data::handle_get_market_data(req_payload, self.ctx.clone()).await
    }

    async fn run_backtest(&self, request: Request<BacktestRequest>) -> Result<Response<BacktestResponse>, Status> {
        let req_payload = request.into_inner();
        tracing::info!(
            symbol = %req_payload.symbol,
            strategy = %req_payload.strategy_name,
            interval = %req_payload.interval,
            use_ai = req_payload.use_ai,
            "Received RunBacktestRequest"
        );
        run_backtest::handle_run_backtest(req_payload, self.ctx.clone()).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::data::synthetic::SyntheticProvider;
    use std::path::Path;

    pub fn context(strategies_dir: &Path) -> ServiceContext {
        ServiceContext {
            registry: Arc::new(RwLock::new(StrategyRegistry::new(strategies_dir))),
            fetcher: Arc::new(DataFetcher::new(Vec::new(), Some(SyntheticProvider::default()))),
            market_data_store: Arc::new(RwLock::new(MarketDataStore::new())),
            narrator: None,
            defaults: BacktestDefaults::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::context;
    use super::*;
    use tempfile::tempdir;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_template_then_reload_then_list() {
        let dir = tempdir().unwrap();
        let service = BacktestService::new(context(dir.path()));

        let listed = service.list_strategies(Request::new(ListStrategiesRequest {})).await.unwrap().into_inner();
        assert_eq!(listed.strategies.len(), 7);

        let created = service
            .create_strategy_template(Request::new(CreateStrategyTemplateRequest { name: "Breakout".to_string() }))
            .await
            .unwrap()
            .into_inner();
        assert!(created.path.ends_with("breakout_strategy.json"));

        let reloaded = service.reload_strategies(Request::new(ReloadStrategiesRequest {})).await.unwrap().into_inner();
        assert_eq!(reloaded.custom_count, 1);
        assert_eq!(reloaded.total_count, 8);

        let listed = service.list_strategies(Request::new(ListStrategiesRequest {})).await.unwrap().into_inner();
        let custom = listed.strategies.iter().find(|s| s.name == "Custom: Breakout").unwrap();
        assert_eq!(custom.origin, "custom");
        assert_eq!(custom.params.len(), 2);
    }

    #[tokio::test]
    async fn test_market_data_streams_batches() {
        let dir = tempdir().unwrap();
        let service = BacktestService::new(context(dir.path()));
        let request = MarketDataRequest {
            symbol: "BTC-USD".to_string(),
            interval: "1h".to_string(),
            start_date: "2024-01-01".to_string(),
            end_date: "2024-02-15".to_string(),
        };
        let mut stream = service.get_market_data(Request::new(request)).await.unwrap().into_inner();
        let mut total = 0;
        let mut batches = 0;
        while let Some(batch) = stream.next().await {
            let batch = batch.unwrap();
            assert_eq!(batch.source, "synthetic");
            assert!(batch.candles.len() <= get_market_data::CANDLE_BATCH_SIZE);
            total += batch.candles.len();
            batches += 1;
        }
        assert!(batches > 1);
        assert!(total > get_market_data::CANDLE_BATCH_SIZE);
    }

    #[tokio::test]
    async fn test_run_backtest_rejects_unknown_strategy() {
        let dir = tempdir().unwrap();
        let service = BacktestService::new(context(dir.path()));
        let request = BacktestRequest {
            symbol: "AAPL".to_string(),
            interval: "1d".to_string(),
            start_date: "2024-01-01".to_string(),
            end_date: "2024-03-01".to_string(),
            strategy_name: "Nope".to_string(),
            ..BacktestRequest::default()
        };
        let status = service.run_backtest(Request::new(request)).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::NotFound);
    }
}
