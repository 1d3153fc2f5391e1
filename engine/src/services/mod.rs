// gRPC surface of the engine. Message and service types are generated from proto/backtester.proto.
tonic::include_proto!("backtester");

pub mod backtest_service;

pub use backtest_service::BacktestService;
pub use backtester_client::BacktesterClient;
pub use backtester_server::{Backtester, BacktesterServer};
