// Engine library root: market data, indicators, strategies, the backtest loop,
// analytics, reporting and the gRPC service built on top of them.

pub mod analytics;
pub mod backtest;
pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod report;
pub mod services;
pub mod strategies;
