//! 数据修复错误类型

use exhibit_shared::error::SharedError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Shared(#[from] SharedError),

    #[error("无效参数: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, RepairError>;

impl RepairError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Shared(e) => e.code(),
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
        }
    }

    /// 数据库不可达，任务应当终止而不是跳过当前行
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Self::Database(e) => SharedError::is_connection_failure_kind(e),
            Self::Shared(e) => e.is_connection_failure(),
            Self::InvalidArgument(_) => false,
        }
    }
}
