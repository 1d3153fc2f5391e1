// Handler for the RunBacktest RPC
use super::helpers::{
    load_market_data, parse_date, parse_interval, to_proto_candle, to_proto_equity, to_proto_indicator, to_proto_signal,
    to_proto_trade,
};
use super::ServiceContext;
use crate::analytics::BenchmarkCalculator;
use crate::analytics::PerformanceAnalyzer;
use crate::backtest::{BacktestConfig, BacktestEngine};
use crate::error::EngineError;
use crate::report::ReportGenerator;
use crate::services::{BacktestRequest, BacktestResponse, BacktestSummary};
use tonic::{Response, Status};

fn to_config(req: &BacktestRequest, ctx: &ServiceContext) -> Result<BacktestConfig, Status> {
    Ok(BacktestConfig {
        symbol: req.symbol.trim().to_uppercase(),
        interval: parse_interval(&req.interval)?,
        start_date: parse_date("start_date", &req.start_date)?,
        end_date: parse_date("end_date", &req.end_date)?,
        initial_capital: if req.initial_capital > 0.0 { req.initial_capital } else { ctx.defaults.initial_capital },
        commission: req.commission.unwrap_or(ctx.defaults.commission),
        strategy_name: req.strategy_name.clone(),
        strategy_params: req.strategy_params.clone(),
        position_size: ctx.defaults.position_size,
    })
}

pub async fn handle_run_backtest(req_payload: BacktestRequest, ctx: ServiceContext) -> Result<Response<BacktestResponse>, Status> {
    let config = to_config(&req_payload, &ctx)?;
    config.validate()?;

    // Registry lock is released before any network I/O.
    let (strategy, params) = {
        let registry = ctx.registry.read().await;
        registry.create(&config.strategy_name, &config.strategy_params)?
    };

    let data = load_market_data(&ctx.market_data_store, &ctx.fetcher, &config.fetch_request()).await?;
    let mut result = BacktestEngine::run(&config, &data, strategy)?;
    result.resolved_params = params.as_map().iter().map(|(k, v)| (k.clone(), *v)).collect();

    let benchmark = if req_payload.include_benchmark {
        let analysis = PerformanceAnalyzer::for_interval(config.interval).analyze(&result);
        let calculator = BenchmarkCalculator::for_interval(config.interval);
        Some(calculator.create_benchmark_report(&result, &analysis, &ctx.fetcher).await)
    } else {
        None
    };

    let narrator = if req_payload.use_ai { ctx.narrator.as_deref() } else { None };
    let report = ReportGenerator::new(&result).generate_full_report(narrator, benchmark).await;
    let report_json = serde_json::to_string(&report).map_err(EngineError::from)?;

    let metrics = &report.metrics;
    let summary = BacktestSummary {
        initial_capital: config.initial_capital,
        final_value: result.final_value,
        total_return_pct: result.total_return_pct(),
        sharpe_ratio: metrics.risk.sharpe_ratio,
        max_drawdown_pct: metrics.risk.max_drawdown,
        total_trades: metrics.trades.closed_trades as u32,
        win_rate: metrics.trades.win_rate,
        profit_factor: report.analysis.trade_metrics.profit_factor,
        open_position_size: result.open_position_size,
        sqn: metrics.system_quality.sqn,
    };

    tracing::info!(
        run_id = %result.run_id,
        symbol = %config.symbol,
        strategy = %config.strategy_name,
        final_value = result.final_value,
        trades = result.trades.len(),
        narrator = %report.narrator,
        "Backtest completed"
    );

    Ok(Response::new(BacktestResponse {
        run_id: result.run_id.clone(),
        symbol: config.symbol.clone(),
        data_source: result.source.as_str().to_string(),
        summary: Some(summary),
        candles: result.candles.iter().map(to_proto_candle).collect(),
        trades: result.trades.iter().map(to_proto_trade).collect(),
        equity_curve: result.equity_curve.iter().map(to_proto_equity).collect(),
        signals: result.signals.iter().map(to_proto_signal).collect(),
        indicators: result.indicators.iter().map(to_proto_indicator).collect(),
        narrative: report.ai_insights.clone(),
        narrator: report.narrator.clone(),
        recommendations: report.recommendations.clone(),
        report_json,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::context;
    use super::*;
    use crate::report::ReportNarrator;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::tempdir;

    struct CannedNarrator;

    #[async_trait]
    impl ReportNarrator for CannedNarrator {
        fn name(&self) -> &str {
            "canned"
        }
        async fn narrate(&self, _prompt: &str) -> Result<String, EngineError> {
            Ok("Narrated insights".to_string())
        }
    }

    fn request(strategy: &str) -> BacktestRequest {
        BacktestRequest {
            symbol: "msft".to_string(),
            interval: "1d".to_string(),
            start_date: "2024-01-01".to_string(),
            end_date: "2024-06-30".to_string(),
            strategy_name: strategy.to_string(),
            strategy_params: HashMap::from([("sma_period".to_string(), 10.0)]),
            ..BacktestRequest::default()
        }
    }

    #[tokio::test]
    async fn test_run_backtest_returns_full_payload() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let response = handle_run_backtest(request("SMA Crossover"), ctx.clone()).await.unwrap().into_inner();

        assert_eq!(response.symbol, "MSFT");
        assert_eq!(response.data_source, "synthetic");
        assert_eq!(response.narrator, "template");
        assert_eq!(response.equity_curve.len(), response.candles.len());
        let summary = response.summary.unwrap();
        assert_eq!(summary.initial_capital, 10_000.0);
        assert_eq!(summary.total_trades as usize, response.trades.len());

        let report: serde_json::Value = serde_json::from_str(&response.report_json).unwrap();
        assert_eq!(report["configuration"]["strategy_params"]["sma_period"], 10.0);
        assert_eq!(response.indicators.len(), 1);
        assert_eq!(ctx.market_data_store.read().await.symbols(), vec!["MSFT".to_string()]);
    }

    #[tokio::test]
    async fn test_ai_flag_selects_narrator() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        ctx.narrator = Some(Arc::new(CannedNarrator));

        let plain = handle_run_backtest(request("SMA Crossover"), ctx.clone()).await.unwrap().into_inner();
        assert_eq!(plain.narrator, "template");

        let mut req = request("SMA Crossover");
        req.use_ai = true;
        let narrated = handle_run_backtest(req, ctx).await.unwrap().into_inner();
        assert_eq!(narrated.narrator, "canned");
        assert_eq!(narrated.narrative, "Narrated insights");
    }

    #[tokio::test]
    async fn test_bad_request_fields() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        let mut req = request("SMA Crossover");
        req.start_date = "yesterday".to_string();
        assert_eq!(handle_run_backtest(req, ctx.clone()).await.unwrap_err().code(), tonic::Code::InvalidArgument);

        let mut req = request("SMA Crossover");
        req.strategy_params.insert("sma_period".to_string(), 1_000.0);
        assert_eq!(handle_run_backtest(req, ctx).await.unwrap_err().code(), tonic::Code::InvalidArgument);
    }
}
