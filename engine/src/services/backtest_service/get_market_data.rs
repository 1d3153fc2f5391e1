// Handler for the GetMarketData RPC
use super::helpers::{load_market_data, parse_date, parse_interval, to_proto_candle};
use super::ServiceContext;
use crate::data::FetchRequest;
use crate::services::{MarketDataRequest, MarketDataResponse};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Response, Status};

pub const CANDLE_BATCH_SIZE: usize = 500;

pub async fn handle_get_market_data(
    req_payload: MarketDataRequest,
    ctx: ServiceContext,
) -> Result<Response<ReceiverStream<Result<MarketDataResponse, Status>>>, Status> {
    let interval = parse_interval(&req_payload.interval)?;
    let start = parse_date("start_date", &req_payload.start_date)?;
    let end = parse_date("end_date", &req_payload.end_date)?;
    let request = FetchRequest::new(&req_payload.symbol, interval, start, end);

    let data = match load_market_data(&ctx.market_data_store, &ctx.fetcher, &request).await {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(symbol = %req_payload.symbol, error_detail = ?e, "Failed to load market data");
            return Err(e.into());
        }
    };

    let (tx, rx) = mpsc::channel(4);
    let symbol_for_log = data.symbol.clone();

    tokio::spawn(async move {
        let source = data.source.as_str().to_string();
        if data.candles.is_empty() {
            tracing::warn!(symbol = %symbol_for_log, "No market data in the requested range");
            let response = MarketDataResponse { candles: vec![], source };
            if let Err(e) = tx.send(Ok(response)).await {
                tracing::error!(error = ?e, symbol = %symbol_for_log, "Failed to send empty market data to stream");
            }
            return;
        }
        for chunk in data.candles.chunks(CANDLE_BATCH_SIZE) {
            let response = MarketDataResponse { candles: chunk.iter().map(to_proto_candle).collect(), source: source.clone() };
            if let Err(e) = tx.send(Ok(response)).await {
                tracing::error!(error = ?e, symbol = %symbol_for_log, "Client dropped market data stream");
                return;
            }
        }
        tracing::debug!(symbol = %symbol_for_log, count = data.candles.len(), "Market data streamed");
    });

    Ok(Response::new(ReceiverStream::new(rx)))
}
