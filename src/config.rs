use crate::errors::{DataHubError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query2.finance.yahoo.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: String,
    pub table_name: String,
    pub exchange_suffix: String,
    pub yahoo_base_url: String,
    pub worker_pool_size: usize,
    pub request_timeout: Duration,
    pub page_size: usize,
}

impl Config {
    pub fn new() -> Self {
        Self {
            data_dir: "data".to_string(),
            table_name: "tickers".to_string(),
            exchange_suffix: ".AX".to_string(),
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            worker_pool_size: 4,
            request_timeout: Duration::from_secs(30),
            page_size: 25,
        }
    }

    /// 从环境变量（以及 .env 文件）读取配置，未设置的项保持默认值
    pub fn from_env() -> Result<Self> {
        // .env 不存在时忽略
        let _ = dotenvy::dotenv();

        let mut config = Self::new();
        if let Ok(dir) = env::var("DATAHUB_DATA_DIR") {
            config = config.with_data_dir(&dir);
        }
        if let Ok(table) = env::var("TICKERS_TABLE") {
            config = config.with_table_name(&table);
        }
        if let Ok(suffix) = env::var("EXCHANGE_SUFFIX") {
            config = config.with_exchange_suffix(&suffix);
        }
        if let Ok(url) = env::var("YAHOO_BASE_URL") {
            config = config.with_yahoo_base_url(&url);
        }
        if let Ok(workers) = env::var("DATAHUB_WORKERS") {
            let workers = workers.parse::<usize>().map_err(|e| {
                DataHubError::ConfigError(format!("DATAHUB_WORKERS={}: {}", workers, e))
            })?;
            config = config.with_worker_pool_size(workers);
        }
        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: &str) -> Self {
        self.data_dir = dir.to_string();
        self
    }

    pub fn with_table_name(mut self, table: &str) -> Self {
        self.table_name = table.to_string();
        self
    }

    pub fn with_exchange_suffix(mut self, suffix: &str) -> Self {
        self.exchange_suffix = suffix.to_string();
        self
    }

    pub fn with_yahoo_base_url(mut self, url: &str) -> Self {
        self.yahoo_base_url = url.trim_end_matches('/').to_string();
        self
    }

    // 线程池至少为 1，否则刷新会永远等不到许可
    pub fn with_worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = size.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// 数据表文件路径
    pub fn table_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(format!("{}.json", self.table_name))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = Config::new()
            .with_data_dir("/tmp/asx")
            .with_table_name("tickers-dev")
            .with_yahoo_base_url("http://localhost:9000/")
            .with_worker_pool_size(0);

        assert_eq!(config.table_path(), PathBuf::from("/tmp/asx/tickers-dev.json"));
        assert_eq!(config.yahoo_base_url, "http://localhost:9000");
        assert_eq!(config.worker_pool_size, 1);
        assert_eq!(config.exchange_suffix, ".AX");
        assert_eq!(config.page_size, 25);
    }
}
