pub mod generator;
pub mod narrator;

pub use generator::{PerformanceMetrics, ReportGenerator, TradingReport};
pub use narrator::{OpenAiNarrator, ReportNarrator};
