//! 本地存储错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("数据库打开失败: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("事务错误: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("表错误: {0}")]
    Table(#[from] redb::TableError),

    #[error("存储错误: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("提交失败: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("记录序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("本地数据库版本过新: 文件版本 {found}, 当前支持 {supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("内部错误: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Transaction(_) => "TRANSACTION_ERROR",
            Self::Table(_) => "TABLE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Commit(_) => "COMMIT_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::SchemaTooNew { .. } => "SCHEMA_TOO_NEW",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
