use crate::errors::{DataHubError, Result};
use crate::models::ticker::TickerRecord;
use crate::store::{PageKey, QueryRequest, SortIndex, TickerStore};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// (索引, 升序, 页大小) -> 页码 -> 该页返回的续页键
type PageKeyCache = HashMap<(SortIndex, bool, usize), HashMap<usize, PageKey>>;

/// 解析排序方向：asc 为升序，dsc 为降序
pub fn parse_order(order: &str) -> Result<bool> {
    match order {
        "asc" => Ok(true),
        "dsc" => Ok(false),
        _ => Err(DataHubError::ConfigError(format!("Unknown sort order: {}", order))),
    }
}

/// Read side for the presentation layer: point lookups and paginated
/// listings. Continuation keys are remembered per (index, order, limit) so a
/// caller can ask for page N once page N-1 has been read.
pub struct TickerCatalog {
    store: Arc<dyn TickerStore + Send + Sync>,
    page_keys: Mutex<PageKeyCache>,
}

impl TickerCatalog {
    pub fn new(store: Arc<dyn TickerStore + Send + Sync>) -> Self {
        Self {
            store,
            page_keys: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_ticker(&self, code: &str) -> Result<TickerRecord> {
        let code = code.trim().to_uppercase();
        self.store
            .get(&code)
            .await?
            .ok_or(DataHubError::TickerNotFound(code))
    }

    pub async fn search(
        &self,
        index: SortIndex,
        ascending: bool,
        page: usize,
        limit: usize,
    ) -> Result<Vec<TickerRecord>> {
        let scope = (index, ascending, limit);
        let start_key = match page {
            0 => return Err(DataHubError::InvalidPage("pages start at 1".to_string())),
            1 => None,
            n => {
                let keys = self.lock_keys()?;
                let key = keys
                    .get(&scope)
                    .and_then(|pages| pages.get(&(n - 1)))
                    .cloned()
                    .ok_or_else(|| {
                        DataHubError::InvalidPage(format!("page {} not reachable", n))
                    })?;
                Some(key)
            }
        };

        let mut request = QueryRequest::new(index)
            .with_limit(limit)
            .with_start_key(start_key);
        if !ascending {
            request = request.descending();
        }
        let result = self.store.query(request).await?;

        if let Some(key) = result.last_key {
            debug!("Remembering continuation key for page {}", page);
            self.lock_keys()?.entry(scope).or_default().insert(page, key);
        }
        Ok(result.items)
    }

    fn lock_keys(&self) -> Result<MutexGuard<'_, PageKeyCache>> {
        self.page_keys
            .lock()
            .map_err(|e| DataHubError::Unknown(format!("page key cache poisoned: {}", e)))
    }
}
