use crate::errors::{DataHubError, Result};
use crate::models::ticker::{SectionUpdate, TickerRecord};
use crate::store::{paginate, QueryPage, QueryRequest, TickerStore};
use async_trait::async_trait;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// 以 JSON 文件持久化的股票数据表
///
/// 全部记录常驻内存，按代码为主键；每次写入后整体落盘（先写临时文件再改名）。
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<BTreeMap<String, TickerRecord>>,
}

impl JsonFileStore {
    /// 打开数据表文件，文件不存在时从空表开始
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            info!("Loading ticker table from {}", path.display());
            Self::read_file(&path)?
        } else {
            info!("No ticker table at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn read_file(path: &Path) -> Result<BTreeMap<String, TickerRecord>> {
        let text = fs::read_to_string(path)
            .map_err(|e| DataHubError::StoreRead(format!("{}: {}", path.display(), e)))?;
        let items: Vec<TickerRecord> = serde_json::from_str(&text)
            .map_err(|e| DataHubError::StoreRead(format!("{}: {}", path.display(), e)))?;

        Ok(items.into_iter().map(|r| (r.code.clone(), r)).collect())
    }

    fn write_file(&self, records: &BTreeMap<String, TickerRecord>) -> Result<()> {
        let to_write_err =
            |e: std::io::Error| DataHubError::StoreWrite(format!("{}: {}", self.path.display(), e));

        // 确保目录存在
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(to_write_err)?;
            }
        }

        let items: Vec<&TickerRecord> = records.values().collect();
        let json = serde_json::to_vec_pretty(&items)
            .map_err(|e| DataHubError::StoreWrite(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(to_write_err)?;
        fs::rename(&tmp_path, &self.path).map_err(to_write_err)?;

        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl TickerStore for JsonFileStore {
    async fn get(&self, code: &str) -> Result<Option<TickerRecord>> {
        Ok(self.records.read().await.get(code).cloned())
    }

    async fn put(&self, record: TickerRecord) -> Result<()> {
        let mut records = self.records.write().await;
        let previous = records.insert(record.code.clone(), record.clone());

        if let Err(e) = self.write_file(&records) {
            // 落盘失败时回滚内存状态
            match previous {
                Some(old) => records.insert(record.code.clone(), old),
                None => records.remove(&record.code),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn update_sections(&self, code: &str, update: SectionUpdate) -> Result<()> {
        let mut records = self.records.write().await;
        let previous = match records.get_mut(code) {
            Some(record) => {
                let previous = record.clone();
                record.apply(update);
                previous
            }
            None => {
                return Err(DataHubError::StoreWrite(format!("No record for ticker {}", code)));
            }
        };

        if let Err(e) = self.write_file(&records) {
            records.insert(code.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryPage> {
        let records = self.records.read().await;

        // 只有带分区标记的记录进入二级索引
        let mut sorted: Vec<TickerRecord> = records
            .values()
            .filter(|r| r.is_indexed())
            .cloned()
            .collect();
        sorted.sort_by(|a, b| {
            let ord = request.index.compare(a, b);
            if request.ascending {
                ord
            } else {
                ord.reverse()
            }
        });

        Ok(paginate(sorted, &request))
    }
}
