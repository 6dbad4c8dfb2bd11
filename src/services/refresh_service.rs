use crate::config::Config;
use crate::errors::{DataHubError, Result};
use crate::models::ticker::{self, Section, SectionUpdate, TickerRecord};
use crate::scrapers::base::FinanceScraper;
use crate::store::{QueryRequest, SortIndex, TickerStore};
use log::{error, info};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// 一次刷新调用的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshStatus {
    pub status: &'static str,
    pub code: String,
}

/// 刷新服务：挑选最久未更新的股票，并发抓取四个数据段后写回
pub struct RefreshWorker {
    store: Arc<dyn TickerStore + Send + Sync>,
    scraper: Arc<dyn FinanceScraper + Send + Sync>,
    pool: Semaphore,
}

impl RefreshWorker {
    pub fn new(
        config: &Config,
        store: Arc<dyn TickerStore + Send + Sync>,
        scraper: Arc<dyn FinanceScraper + Send + Sync>,
    ) -> Self {
        Self {
            store,
            scraper,
            pool: Semaphore::new(config.worker_pool_size),
        }
    }

    /// Refreshes the record with the oldest `LastUpdated`.
    pub async fn refresh_oldest(&self) -> Result<RefreshStatus> {
        let page = self
            .store
            .query(QueryRequest::new(SortIndex::LastUpdated).with_limit(1))
            .await?;
        let record = page.items.into_iter().next().ok_or(DataHubError::EmptyStore)?;

        self.refresh_record(record).await
    }

    /// 刷新指定股票
    pub async fn refresh_ticker(&self, code: &str) -> Result<RefreshStatus> {
        let code = code.trim().to_uppercase();
        let record = self
            .store
            .get(&code)
            .await?
            .ok_or(DataHubError::TickerNotFound(code))?;

        self.refresh_record(record).await
    }

    async fn refresh_record(&self, record: TickerRecord) -> Result<RefreshStatus> {
        // 写回使用抓取前记录的代码
        let code = record.code;
        let symbol = self.scraper.provider_symbol(&code);
        info!("Fetching data for {} (last updated {})", symbol, record.last_updated);

        let scraper = &self.scraper;
        let (info, cash_flow, income_statement, balance_sheet) = tokio::join!(
            self.fetch_section(&symbol, "info", scraper.fetch_company_info(&symbol)),
            self.fetch_section(&symbol, "cash flow", scraper.fetch_cash_flow(&symbol)),
            self.fetch_section(
                &symbol,
                "income statement",
                scraper.fetch_income_statement(&symbol)
            ),
            self.fetch_section(
                &symbol,
                "balance sheet",
                scraper.fetch_balance_sheet(&symbol)
            ),
        );

        let update = SectionUpdate {
            info,
            cash_flow,
            income_statement,
            balance_sheet,
            last_updated: ticker::next_timestamp(&record.last_updated),
        };
        let updated_at = update.last_updated.clone();

        self.store.update_sections(&code, update).await?;

        info!("Updated {} at {}", code, updated_at);
        Ok(RefreshStatus {
            status: "updated",
            code,
        })
    }

    /// 在线程池许可内执行一次抓取，失败时记为不可用
    async fn fetch_section<T, F>(&self, symbol: &str, section: &str, fetch: F) -> Section<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _permit = match self.pool.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Worker pool closed before fetching {} for {}: {}", section, symbol, e);
                return Section::Unavailable;
            }
        };

        match fetch.await {
            Ok(data) => Section::Available(data),
            Err(e) => {
                error!("Failed to get {} for {}: {}", section, symbol, e);
                Section::Unavailable
            }
        }
    }
}
