//! redb 对象存储
//!
//! 每个写操作在单个写事务内完成，批量写入与整表替换保证原子性。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use exhibit_shared::config::LocalStoreConfig;
use exhibit_shared::observability::metrics;
use redb::{Database, ReadableTable, ReadableTableMetadata};
use tracing::{debug, info, instrument};

use crate::error::{Result, StoreError};
use crate::schema::{META, ObjectStore, Record, SCHEMA_VERSION, SCHEMA_VERSION_KEY};

/// 本地对象存储句柄，可廉价克隆
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl LocalStore {
    /// 按配置打开（不存在则创建）数据库
    pub fn open(config: &LocalStoreConfig) -> Result<Self> {
        Self::open_path(&config.path)
    }

    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(&path)?;
        let store = Self {
            db: Arc::new(db),
            path,
        };
        store.upgrade_schema()?;

        info!(schema_version = SCHEMA_VERSION, "Opened local store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 创建缺失的对象仓库并记录模式版本
    fn upgrade_schema(&self) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut meta = write_txn.open_table(META)?;
            let found = meta.get(SCHEMA_VERSION_KEY)?.map(|v| v.value()).unwrap_or(0);
            if found > SCHEMA_VERSION {
                return Err(StoreError::SchemaTooNew {
                    found,
                    supported: SCHEMA_VERSION,
                });
            }

            for store in ObjectStore::ALL {
                write_txn.open_table(store.table())?;
            }

            if found < SCHEMA_VERSION {
                meta.insert(SCHEMA_VERSION_KEY, SCHEMA_VERSION)?;
                debug!(from = found, to = SCHEMA_VERSION, "Local store schema upgraded");
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn schema_version(&self) -> Result<u32> {
        let read_txn = self.db.begin_read()?;
        let meta = read_txn.open_table(META)?;
        Ok(meta.get(SCHEMA_VERSION_KEY)?.map(|v| v.value()).unwrap_or(0))
    }

    /// 写入记录，同键覆盖
    pub fn put<R: Record>(&self, record: &R) -> Result<()> {
        self.put_many(std::slice::from_ref(record)).map(|_| ())
    }

    /// 单事务批量写入
    pub fn put_many<R: Record>(&self, records: &[R]) -> Result<usize> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(R::STORE.table())?;
            for record in records {
                let bytes = serde_json::to_vec(record)?;
                table.insert(record.key(), bytes.as_slice())?;
            }
        }
        write_txn.commit()?;

        metrics::record_store_write(R::STORE.name(), records.len());
        Ok(records.len())
    }

    /// 以服务端快照整体替换仓库内容（单事务：清空 + 写入）
    #[instrument(skip(self, records), fields(store = R::STORE.name(), count = records.len()))]
    pub fn replace_all<R: Record>(&self, records: &[R]) -> Result<usize> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(R::STORE.table())?;
            let keys = collect_keys(&table)?;
            for key in &keys {
                table.remove(key.as_str())?;
            }
            for record in records {
                let bytes = serde_json::to_vec(record)?;
                table.insert(record.key(), bytes.as_slice())?;
            }
        }
        write_txn.commit()?;

        metrics::record_store_write(R::STORE.name(), records.len());
        Ok(records.len())
    }

    pub fn get<R: Record>(&self, key: &str) -> Result<Option<R>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(R::STORE.table())?;

        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// 读取仓库全部记录（按键字典序）
    pub fn get_all<R: Record>(&self) -> Result<Vec<R>> {
        self.get_all_where(|_: &R| true)
    }

    /// 读取满足条件的记录
    pub fn get_all_where<R, F>(&self, predicate: F) -> Result<Vec<R>>
    where
        R: Record,
        F: Fn(&R) -> bool,
    {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(R::STORE.table())?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: R = serde_json::from_slice(value.value())?;
            if predicate(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub fn delete<R: Record>(&self, key: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(R::STORE.table())?;
            table.remove(key)?.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    pub fn count<R: Record>(&self) -> Result<u64> {
        self.count_store(R::STORE)
    }

    pub fn count_store(&self, store: ObjectStore) -> Result<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(store.table())?;
        Ok(table.len()?)
    }

    /// 清空单个仓库，返回删除数
    pub fn clear<R: Record>(&self) -> Result<usize> {
        self.clear_stores(&[R::STORE])
    }

    /// 清空全部仓库（退出登录时调用），模式版本保留
    pub fn clear_all(&self) -> Result<usize> {
        let removed = self.clear_stores(&ObjectStore::ALL)?;
        info!(removed, "Local store cleared");
        Ok(removed)
    }

    fn clear_stores(&self, stores: &[ObjectStore]) -> Result<usize> {
        let write_txn = self.db.begin_write()?;
        let mut removed = 0;
        for store in stores {
            let mut table = write_txn.open_table(store.table())?;
            let keys = collect_keys(&table)?;
            for key in &keys {
                table.remove(key.as_str())?;
            }
            removed += keys.len();
        }
        write_txn.commit()?;
        Ok(removed)
    }
}

fn collect_keys(table: &impl ReadableTable<&'static str, &'static [u8]>) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    for entry in table.iter()? {
        let (key, _) = entry?;
        keys.push(key.value().to_string());
    }
    Ok(keys)
}
