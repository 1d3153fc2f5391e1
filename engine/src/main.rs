// Engine main entry point: serves the Backtester gRPC API.
use engine::config::settings::EngineSettings;
use engine::data::market_data::MarketDataStore;
use engine::data::DataFetcher;
use engine::report::{OpenAiNarrator, ReportNarrator};
use engine::services::backtest_service::ServiceContext;
use engine::services::{BacktestService, BacktesterServer};
use engine::strategies::StrategyRegistry;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Scalparo backtest engine...");

    let settings = EngineSettings::load()?;
    let addr = settings.listen_addr().parse()?;

    let mut registry = StrategyRegistry::new(&settings.strategies_dir);
    registry.load_custom_strategies()?;
    info!(strategies = registry.list().len(), dir = %settings.strategies_dir.display(), "Strategy registry ready");

    let fetcher = DataFetcher::from_settings(&settings.data)?;
    info!(providers = ?fetcher.provider_names(), synthetic_fallback = settings.data.synthetic_fallback, "Market data fetcher ready");

    let narrator: Option<Arc<dyn ReportNarrator>> = match OpenAiNarrator::from_settings(&settings.narrator)? {
        Some(n) => {
            info!(model = %settings.narrator.model, "AI narration enabled");
            Some(Arc::new(n))
        }
        None => None,
    };

    let ctx = ServiceContext {
        registry: Arc::new(RwLock::new(registry)),
        fetcher: Arc::new(fetcher),
        market_data_store: Arc::new(RwLock::new(MarketDataStore::new())),
        narrator,
        defaults: settings.backtest.clone(),
    };

    info!("Engine listening on {}", addr);
    Server::builder()
        .add_service(BacktesterServer::new(BacktestService::new(ctx)))
        .serve(addr)
        .await?;

    Ok(())
}
