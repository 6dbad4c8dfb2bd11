use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// 所有股票共享的分区标记，用于二级索引全表有序扫描
pub const PARTITION_MARKER: &str = "TICKERS";

/// 数据段不可用时持久化的占位字符串
pub const NOT_AVAILABLE: &str = "N/A";

/// 公司资料：字段名 -> 标量值
pub type CompanyInfo = BTreeMap<String, serde_json::Value>;

/// 财务报表：报告期 -> 科目 -> 整数值
pub type StatementTable = BTreeMap<String, BTreeMap<String, i64>>;

/// One section of a ticker record. Persisted as the section payload, or the
/// string "N/A" when the fetch failed or never ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Available(T),
    Unavailable,
}

impl<T> Section<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Section::Available(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Section::Available(data) => Some(data),
            Section::Unavailable => None,
        }
    }
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Section::Unavailable
    }
}

impl<T> From<Option<T>> for Section<T> {
    fn from(value: Option<T>) -> Self {
        value.map(Section::Available).unwrap_or(Section::Unavailable)
    }
}

impl<T: Serialize> Serialize for Section<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Section::Available(data) => data.serialize(serializer),
            Section::Unavailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Section<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<T> {
            Data(T),
            Sentinel(String),
        }

        Ok(match Repr::<T>::deserialize(deserializer)? {
            Repr::Data(data) => Section::Available(data),
            Repr::Sentinel(_) => Section::Unavailable,
        })
    }
}

/// 单只股票的完整记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerRecord {
    #[serde(rename = "ASX code")]
    pub code: String,
    #[serde(rename = "Company name")]
    pub company_name: String,
    #[serde(rename = "GICs industry group")]
    pub group: String,
    #[serde(rename = "Listing date")]
    pub listing_date: String,
    #[serde(rename = "Market Cap", default)]
    pub market_cap: i64,
    #[serde(rename = "LastUpdated")]
    pub last_updated: String,
    #[serde(rename = "GSI1PK", default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    #[serde(rename = "Info", default)]
    pub info: Section<CompanyInfo>,
    #[serde(rename = "Cash Flow", default)]
    pub cash_flow: Section<StatementTable>,
    #[serde(rename = "Income Statement", default)]
    pub income_statement: Section<StatementTable>,
    #[serde(rename = "Balance Sheet", default)]
    pub balance_sheet: Section<StatementTable>,
}

impl TickerRecord {
    /// 创建只含参考字段的新记录（批量导入时使用）
    pub fn new(
        code: &str,
        company_name: &str,
        group: &str,
        listing_date: &str,
        market_cap: i64,
        last_updated: String,
    ) -> Self {
        Self {
            code: code.to_string(),
            company_name: company_name.to_string(),
            group: group.to_string(),
            listing_date: listing_date.to_string(),
            market_cap,
            last_updated,
            partition: Some(PARTITION_MARKER.to_string()),
            info: Section::Unavailable,
            cash_flow: Section::Unavailable,
            income_statement: Section::Unavailable,
            balance_sheet: Section::Unavailable,
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.partition.as_deref() == Some(PARTITION_MARKER)
    }

    pub fn apply(&mut self, update: SectionUpdate) {
        self.info = update.info;
        self.cash_flow = update.cash_flow;
        self.income_statement = update.income_statement;
        self.balance_sheet = update.balance_sheet;
        self.last_updated = update.last_updated;
    }
}

/// 刷新写回时按属性覆盖的字段集合
#[derive(Debug, Clone, PartialEq)]
pub struct SectionUpdate {
    pub info: Section<CompanyInfo>,
    pub cash_flow: Section<StatementTable>,
    pub income_statement: Section<StatementTable>,
    pub balance_sheet: Section<StatementTable>,
    pub last_updated: String,
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    value.parse::<NaiveDateTime>().ok()
}

/// Current UTC time in the stored ISO-8601 form.
pub fn current_timestamp() -> String {
    format_timestamp(&Utc::now().naive_utc())
}

/// Timestamp for a write that must sort after `previous`.
pub fn next_timestamp(previous: &str) -> String {
    let now = Utc::now().naive_utc();
    match parse_timestamp(previous) {
        Some(prev) if prev >= now => format_timestamp(&(prev + chrono::Duration::microseconds(1))),
        _ => format_timestamp(&now),
    }
}
