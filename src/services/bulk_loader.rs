use crate::errors::{DataHubError, Result};
use crate::models::ticker::{self, TickerRecord};
use crate::store::TickerStore;
use crate::util;
use csv::{ReaderBuilder, StringRecord};
use log::{error, info};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// 批量导入结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSummary {
    pub status: &'static str,
    pub loaded: usize,
    pub skipped: usize,
}

/// 从 ASX 上市公司列表 CSV 初始化数据表
///
/// 列顺序：代码、公司名、行业组、上市日期、市值。首行为表头。
pub struct BulkLoader {
    store: Arc<dyn TickerStore + Send + Sync>,
}

impl BulkLoader {
    pub fn new(store: Arc<dyn TickerStore + Send + Sync>) -> Self {
        Self { store }
    }

    pub async fn load_csv(&self, path: impl AsRef<Path>) -> Result<LoadSummary> {
        let path = path.as_ref();
        info!("Loading reference list from {}", path.display());
        let file = File::open(path)?;
        self.load_reader(file).await
    }

    pub async fn load_reader<R: Read>(&self, reader: R) -> Result<LoadSummary> {
        // 先整体读出，读取器不跨 await 存活
        let rows: Vec<(usize, std::result::Result<StringRecord, csv::Error>)> = {
            let mut csv_reader = ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .from_reader(reader);
            csv_reader
                .records()
                .enumerate()
                .map(|(idx, row)| (idx + 2, row))
                .collect()
        };

        let mut summary = LoadSummary {
            status: "initialized",
            loaded: 0,
            skipped: 0,
        };

        for (line, row) in rows {
            match self.import_row(line, row).await {
                Ok(code) => {
                    info!("Uploaded {} to the database", code);
                    summary.loaded += 1;
                }
                Err(e) => {
                    error!("Failed to upload row {}: {}", line, e);
                    summary.skipped += 1;
                }
            }
        }

        info!("Loaded {} tickers, skipped {} rows", summary.loaded, summary.skipped);
        Ok(summary)
    }

    async fn import_row(
        &self,
        line: usize,
        row: std::result::Result<StringRecord, csv::Error>,
    ) -> Result<String> {
        let row = row.map_err(|e| DataHubError::RowImport {
            row: line,
            reason: e.to_string(),
        })?;
        let record = record_from_row(line, &row)?;
        let code = record.code.clone();

        self.store
            .put(record)
            .await
            .map_err(|e| DataHubError::RowImport {
                row: line,
                reason: e.to_string(),
            })?;
        Ok(code)
    }
}

/// 将一行 CSV 转为记录：空字段记为 "N/A"，市值无法解析时为 0
pub fn record_from_row(line: usize, row: &StringRecord) -> Result<TickerRecord> {
    if row.len() < 5 {
        return Err(DataHubError::RowImport {
            row: line,
            reason: format!("expected 5 columns, found {}", row.len()),
        });
    }

    let code = &row[0];
    if code.is_empty() {
        return Err(DataHubError::RowImport {
            row: line,
            reason: "empty ticker code".to_string(),
        });
    }

    Ok(TickerRecord::new(
        code,
        &util::or_not_available(&row[1]),
        &util::or_not_available(&row[2]),
        &util::or_not_available(&row[3]),
        util::try_int(&row[4]),
        ticker::current_timestamp(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticker::{Section, PARTITION_MARKER};
    use crate::store::JsonFileStore;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    const REFERENCE: &str = "\
ASX code,Company name,GICs industry group,Listing date,Market Cap
ABC,Acme Co,Materials,2000-01-01,
BHP,BHP Group,Materials,1885-08-13,221000000000
SHORT,Missing columns
XYZ,,,,12.5
,No Code Ltd,Banks,2001-01-01,5
";

    #[test]
    fn test_record_from_row_defaults() {
        let row = StringRecord::from(vec!["ABC", "Acme Co", "Materials", "2000-01-01", ""]);
        let record = record_from_row(2, &row).unwrap();

        assert_eq!(record.code, "ABC");
        assert_eq!(record.company_name, "Acme Co");
        assert_eq!(record.group, "Materials");
        assert_eq!(record.listing_date, "2000-01-01");
        assert_eq!(record.market_cap, 0);
        assert_eq!(record.partition.as_deref(), Some(PARTITION_MARKER));
        assert_eq!(record.info, Section::Unavailable);
    }

    #[test]
    fn test_record_from_row_keeps_fields_verbatim() {
        let row = StringRecord::from(vec!["ABC", " Acme Co ", "  ", "2000-01-01", ""]);
        let record = record_from_row(2, &row).unwrap();

        assert_eq!(record.company_name, " Acme Co ");
        assert_eq!(record.group, "  ");
        assert_eq!(record.listing_date, "2000-01-01");
        assert_eq!(record.market_cap, 0);
    }

    #[tokio::test]
    async fn test_load_skips_bad_rows_and_continues() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path().join("tickers.json")).unwrap());
        let loader = BulkLoader::new(store.clone());

        let summary = loader.load_reader(REFERENCE.as_bytes()).await.unwrap();
        assert_eq!(summary, LoadSummary { status: "initialized", loaded: 3, skipped: 2 });

        let bhp = store.get("BHP").await.unwrap().unwrap();
        assert_eq!(bhp.market_cap, 221000000000);

        let xyz = store.get("XYZ").await.unwrap().unwrap();
        assert_eq!(xyz.company_name, "N/A");
        assert_eq!(xyz.group, "N/A");
        assert_eq!(xyz.listing_date, "N/A");
        assert_eq!(xyz.market_cap, 0);

        assert!(store.get("SHORT").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_csv_from_file() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("asx.csv");
        std::fs::write(&csv_path, REFERENCE).unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path().join("tickers.json")).unwrap());

        let summary = BulkLoader::new(store.clone()).load_csv(&csv_path).await.unwrap();
        assert_eq!(summary.loaded, 3);
        assert_eq!(store.len().await, 3);

        let missing = BulkLoader::new(store).load_csv(dir.path().join("missing.csv")).await;
        assert!(matches!(missing, Err(DataHubError::IoError(_))));
    }
}
