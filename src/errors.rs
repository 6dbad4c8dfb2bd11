use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataHubError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// 单个数据段抓取失败，由刷新流程就地吞掉并记为 N/A
    #[error("Provider error for {symbol}: {reason}")]
    ProviderError { symbol: String, reason: String },

    #[error("No ticker records in store")]
    EmptyStore,

    #[error("Store read error: {0}")]
    StoreRead(String),

    #[error("Store write error: {0}")]
    StoreWrite(String),

    #[error("Failed to import row {row}: {reason}")]
    RowImport { row: usize, reason: String },

    #[error("Ticker not found: {0}")]
    TickerNotFound(String),

    #[error("Invalid page: {0}")]
    InvalidPage(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, DataHubError>;

impl DataHubError {
    pub fn provider(symbol: &str, reason: impl Into<String>) -> Self {
        DataHubError::ProviderError {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}
