use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("CSV data format error: {0}")]
    CsvDataFormatError(String),

    #[error("Market data error: {0}")]
    MarketDataError(String),

    #[error("Data provider '{provider}' failed: {message}")]
    ProviderError { provider: String, message: String },

    #[error("Indicator calculation error: {0}")]
    IndicatorError(String),

    #[error("Strategy error: {0}")]
    StrategyError(String),

    #[error("Strategy file error ({path}): {message}")]
    StrategyLoadError { path: String, message: String },

    #[error("Backtest simulation error: {0}")]
    SimulationError(String),

    #[error("Report error: {0}")]
    ReportError(String),

    #[error("Narration error: {0}")]
    NarratorError(String),

    #[error("HTTP error: {source}")]
    HttpError {
        #[from]
        source: reqwest::Error,
    },

    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Internal processing error: {0}")]
    ProcessingError(String),

    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

impl EngineError {
    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        EngineError::ProviderError { provider: provider.to_string(), message: message.into() }
    }
}

impl From<EngineError> for tonic::Status {
    fn from(err: EngineError) -> Self {
        tracing::error!("Mapping EngineError to tonic::Status: {:?}", err);
        match err {
            EngineError::ConfigError(msg) => tonic::Status::failed_precondition(format!("Configuration error: {}", msg)),
            EngineError::CsvSystemError { source } => tonic::Status::invalid_argument(format!("CSV parsing system error: {}", source)),
            EngineError::IoError { source } => tonic::Status::internal(format!("I/O error: {}", source)),
            EngineError::CsvDataFormatError(msg) => tonic::Status::invalid_argument(format!("CSV data format error: {}", msg)),
            EngineError::MarketDataError(msg) => {
                if msg.to_lowercase().contains("not found") {
                    tonic::Status::not_found(msg)
                } else {
                    tonic::Status::internal(format!("Market data error: {}", msg))
                }
            }
            EngineError::ProviderError { provider, message } => {
                tonic::Status::unavailable(format!("Data provider '{}' failed: {}", provider, message))
            }
            EngineError::IndicatorError(msg) => tonic::Status::invalid_argument(format!("Indicator calculation error: {}", msg)),
            EngineError::StrategyError(msg) => {
                if msg.to_lowercase().contains("not found") {
                    tonic::Status::not_found(msg)
                } else {
                    tonic::Status::invalid_argument(format!("Strategy error: {}", msg))
                }
            }
            EngineError::StrategyLoadError { path, message } => {
                tonic::Status::failed_precondition(format!("Strategy file error ({}): {}", path, message))
            }
            EngineError::SimulationError(msg) => tonic::Status::internal(format!("Backtest simulation error: {}", msg)),
            EngineError::ReportError(msg) => tonic::Status::internal(format!("Report error: {}", msg)),
            EngineError::NarratorError(msg) => tonic::Status::unavailable(format!("Narration error: {}", msg)),
            EngineError::HttpError { source } => tonic::Status::unavailable(format!("HTTP error: {}", source)),
            EngineError::JsonError { source } => tonic::Status::internal(format!("JSON error: {}", source)),
            EngineError::ProcessingError(msg) => tonic::Status::internal(format!("Processing error: {}", msg)),
            EngineError::AnyhowError(source) => tonic::Status::internal(format!("An internal error occurred: {}", source)),
        }
    }
}
