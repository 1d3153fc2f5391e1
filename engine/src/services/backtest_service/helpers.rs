// Conversions between domain and wire types, plus request parsing shared by the handlers.
use crate::backtest::{ClosedTrade, EquityPoint};
use crate::data::market_data::MarketDataStore;
use crate::data::{DataFetcher, FetchRequest};
use crate::error::EngineError;
use crate::services::{
    Candle as ProtoCandle, EquityPoint as ProtoEquityPoint, IndicatorSeries, ParamSpec as ProtoParamSpec, Signal as ProtoSignal,
    StrategyInfo as ProtoStrategyInfo, Trade as ProtoTrade,
};
use chrono::NaiveDate;
use shared::models::{Candle, Indicator, Interval, MarketData, ParamKind, StrategyInfo, StrategyOrigin, TradeSignal};
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::Status;

pub fn to_proto_candle(candle: &Candle) -> ProtoCandle {
    ProtoCandle {
        symbol: candle.symbol.clone(),
        timestamp: candle.timestamp.timestamp_millis(),
        open: candle.open,
        high: candle.high,
        low: candle.low,
        close: candle.close,
        volume: candle.volume,
    }
}

pub fn to_proto_strategy(info: &StrategyInfo) -> ProtoStrategyInfo {
    let (origin, path) = match &info.origin {
        StrategyOrigin::Builtin => ("builtin", String::new()),
        StrategyOrigin::Custom { path } => ("custom", path.display().to_string()),
    };
    ProtoStrategyInfo {
        name: info.name.clone(),
        description: info.description.clone(),
        origin: origin.to_string(),
        path,
        params: info
            .params
            .iter()
            .map(|p| ProtoParamSpec {
                name: p.name.clone(),
                kind: match p.kind {
                    ParamKind::Int => "int",
                    ParamKind::Float => "float",
                }
                .to_string(),
                default_value: p.default,
                min: p.min,
                max: p.max,
                step: p.step,
                description: p.description.clone(),
            })
            .collect(),
    }
}

pub fn to_proto_trade(trade: &ClosedTrade) -> ProtoTrade {
    ProtoTrade {
        entry_time: trade.entry_time.timestamp_millis(),
        exit_time: trade.exit_time.timestamp_millis(),
        entry_price: trade.entry_price,
        exit_price: trade.exit_price,
        size: trade.size,
        gross_pnl: trade.gross_pnl,
        commission: trade.commission,
        net_pnl: trade.net_pnl,
        return_pct: trade.return_pct,
        bars_held: trade.bars_held as u32,
    }
}

pub fn to_proto_equity(point: &EquityPoint) -> ProtoEquityPoint {
    ProtoEquityPoint { timestamp: point.timestamp.timestamp_millis(), value: point.value, cash: point.cash, position: point.position }
}

pub fn to_proto_signal(signal: &TradeSignal) -> ProtoSignal {
    ProtoSignal {
        timestamp: signal.timestamp.timestamp_millis(),
        side: signal.side.to_string(),
        price: signal.price,
        reason: signal.reason.clone(),
    }
}

pub fn to_proto_indicator(indicator: &Indicator) -> IndicatorSeries {
    IndicatorSeries { name: indicator.name.clone(), values: indicator.values.iter().map(|v| v.unwrap_or(f64::NAN)).collect() }
}

/// Empty means the default interval.
pub fn parse_interval(value: &str) -> Result<Interval, Status> {
    if value.trim().is_empty() {
        return Ok(Interval::default());
    }
    value.parse().map_err(|e: anyhow::Error| Status::invalid_argument(e.to_string()))
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, Status> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| Status::invalid_argument(format!("Invalid {} '{}': expected YYYY-MM-DD", field, value)))
}

/// Serves from the store when it already covers the request, otherwise fetches and caches.
pub async fn load_market_data(
    store: &Arc<RwLock<MarketDataStore>>,
    fetcher: &DataFetcher,
    request: &FetchRequest,
) -> Result<MarketData, EngineError> {
    let cached = store.read().await.covering(&request.symbol, request.interval, request.start_time(), request.end_time());
    if let Some(data) = cached.filter(|d| !d.candles.is_empty()) {
        tracing::debug!(symbol = %request.symbol, interval = %request.interval, bars = data.candles.len(), "Market data served from cache");
        return Ok(data);
    }

    let data = fetcher.fetch(request).await?;
    let mut guard = store.write().await;
    guard.add_candles(&data.symbol, data.interval, data.source, data.candles.clone())?;
    tracing::info!(symbol = %data.symbol, interval = %data.interval, source = data.source.as_str(), bars = data.candles.len(), "Market data cached");
    Ok(data)
}
