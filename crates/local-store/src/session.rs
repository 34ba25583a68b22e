//! 会话级单例
//!
//! 同一会话内数据库只打开一次，后续调用复用同一句柄。

use exhibit_shared::config::LocalStoreConfig;
use tokio::sync::OnceCell;

use crate::error::{Result, StoreError};
use crate::store::LocalStore;

pub struct SessionStore {
    config: LocalStoreConfig,
    store: OnceCell<LocalStore>,
}

impl SessionStore {
    pub fn new(config: LocalStoreConfig) -> Self {
        Self {
            config,
            store: OnceCell::new(),
        }
    }

    /// 获取存储句柄，首次调用时在阻塞线程池中打开数据库
    pub async fn get(&self) -> Result<&LocalStore> {
        self.store
            .get_or_try_init(|| async {
                let config = self.config.clone();
                tokio::task::spawn_blocking(move || LocalStore::open(&config))
                    .await
                    .map_err(|e| StoreError::Internal(format!("open task failed: {}", e)))?
            })
            .await
    }

    pub fn is_open(&self) -> bool {
        self.store.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_opened_once() {
        let temp_dir = TempDir::new().unwrap();
        let session = SessionStore::new(LocalStoreConfig {
            path: temp_dir.path().join("session.redb").display().to_string(),
        });
        assert!(!session.is_open());

        let first = session.get().await.unwrap() as *const LocalStore;
        let second = session.get().await.unwrap() as *const LocalStore;
        assert!(session.is_open());
        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_open_can_be_retried() {
        let temp_dir = TempDir::new().unwrap();
        // 目录本身不是合法的数据库文件
        let session = SessionStore::new(LocalStoreConfig {
            path: temp_dir.path().display().to_string(),
        });

        assert!(tokio_test::block_on(session.get()).is_err());
        assert!(!session.is_open());
    }
}
