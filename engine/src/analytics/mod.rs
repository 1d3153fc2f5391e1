// Post-run analysis: performance statistics, benchmark comparison and signal summaries.
pub mod benchmark;
pub mod performance;
pub mod signals;
pub mod stats;

pub use benchmark::{BenchmarkCalculator, BenchmarkReport, BuyAndHold};
pub use performance::{PerformanceAnalysis, PerformanceAnalyzer};
pub use signals::SignalSummary;
