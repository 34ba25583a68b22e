//! 对象存储错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("上传失败: key={key}, 原因={reason}")]
    Upload { key: String, reason: String },

    #[error("删除失败: key={key}, 原因={reason}")]
    Delete { key: String, reason: String },

    #[error("对象存储配置错误: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Upload { .. } => "UPLOAD_FAILED",
            Self::Delete { .. } => "DELETE_FAILED",
            Self::Config(_) => "STORAGE_CONFIG_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upload { .. } | Self::Delete { .. })
    }
}
