pub mod binance;
pub mod csv_parser;
pub mod fetcher;
pub mod local;
pub mod market_data;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use fetcher::DataFetcher;
pub use provider::{FetchRequest, MarketDataProvider};
