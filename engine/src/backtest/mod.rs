// Bar-by-bar simulation: broker bookkeeping plus the driving loop.
pub mod broker;
pub mod engine;

pub use broker::{Broker, ClosedTrade, Execution};
pub use engine::{run_batch, BacktestConfig, BacktestEngine, BacktestResult, EquityPoint};
