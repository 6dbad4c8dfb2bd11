pub mod json_file;

use crate::errors::{DataHubError, Result};
use crate::models::ticker::{SectionUpdate, TickerRecord};
use async_trait::async_trait;
use std::cmp::Ordering;

pub use json_file::JsonFileStore;

/// 二级索引：按哪个属性排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortIndex {
    Ticker,
    LastUpdated,
    MarketCap,
    CompanyName,
    Group,
    ListingDate,
}

impl SortIndex {
    /// 解析命令行/页面使用的索引名
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "ticker" => Ok(SortIndex::Ticker),
            "lastUpdated" => Ok(SortIndex::LastUpdated),
            "marketCap" => Ok(SortIndex::MarketCap),
            "companyName" => Ok(SortIndex::CompanyName),
            "group" => Ok(SortIndex::Group),
            "listingDate" => Ok(SortIndex::ListingDate),
            _ => Err(DataHubError::ConfigError(format!("Unknown sort index: {}", name))),
        }
    }

    /// 记录在该索引上的排序值
    pub fn sort_value(&self, record: &TickerRecord) -> SortValue {
        match self {
            SortIndex::Ticker => SortValue::Text(record.code.clone()),
            SortIndex::LastUpdated => SortValue::Text(record.last_updated.clone()),
            SortIndex::MarketCap => SortValue::Number(record.market_cap),
            SortIndex::CompanyName => SortValue::Text(record.company_name.clone()),
            SortIndex::Group => SortValue::Text(record.group.clone()),
            SortIndex::ListingDate => SortValue::Text(record.listing_date.clone()),
        }
    }

    /// Orders two records by this index; ties fall back to the ticker code so
    /// pagination is stable.
    pub fn compare(&self, a: &TickerRecord, b: &TickerRecord) -> Ordering {
        self.sort_value(a)
            .cmp(&self.sort_value(b))
            .then_with(|| a.code.cmp(&b.code))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Number(i64),
    Text(String),
}

/// Opaque continuation key returned by a query page: the index value and
/// code of the last item served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageKey {
    pub(crate) value: SortValue,
    pub(crate) code: String,
}

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub index: SortIndex,
    pub ascending: bool,
    pub limit: usize,
    pub start_key: Option<PageKey>,
}

impl QueryRequest {
    pub fn new(index: SortIndex) -> Self {
        Self {
            index,
            ascending: true,
            limit: 25,
            start_key: None,
        }
    }

    pub fn descending(mut self) -> Self {
        self.ascending = false;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_start_key(mut self, key: Option<PageKey>) -> Self {
        self.start_key = key;
        self
    }
}

#[derive(Debug, Clone)]
pub struct QueryPage {
    pub items: Vec<TickerRecord>,
    /// 还有后续数据时返回，用于请求下一页
    pub last_key: Option<PageKey>,
}

/// Key-value table of ticker records with ordered secondary-index queries.
#[async_trait]
pub trait TickerStore {
    async fn get(&self, code: &str) -> Result<Option<TickerRecord>>;

    /// 按主键整体写入（存在则覆盖）
    async fn put(&self, record: TickerRecord) -> Result<()>;

    /// 按属性更新刷新字段；记录不存在时返回 StoreWrite 错误
    async fn update_sections(&self, code: &str, update: SectionUpdate) -> Result<()>;

    /// 在分区标记下按索引有序查询
    async fn query(&self, request: QueryRequest) -> Result<QueryPage>;
}

/// 在已排序的记录上应用续页键和页大小
///
/// 下一页从续页键位置之后的第一条记录开始，记录在两页之间移动也不影响位置。
pub(crate) fn paginate(sorted: Vec<TickerRecord>, request: &QueryRequest) -> QueryPage {
    let start = match &request.start_key {
        Some(key) => sorted
            .iter()
            .position(|r| {
                let ord = (request.index.sort_value(r), r.code.as_str())
                    .cmp(&(key.value.clone(), key.code.as_str()));
                if request.ascending {
                    ord == Ordering::Greater
                } else {
                    ord == Ordering::Less
                }
            })
            .unwrap_or(sorted.len()),
        None => 0,
    };

    let remaining = sorted.len() - start;
    let items: Vec<TickerRecord> = sorted.into_iter().skip(start).take(request.limit).collect();
    let last_key = if remaining > items.len() {
        items.last().map(|r| PageKey {
            value: request.index.sort_value(r),
            code: r.code.clone(),
        })
    } else {
        None
    };

    QueryPage { items, last_key }
}
