//! 离线缓存错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("网络请求失败: url={url}, 原因={reason}")]
    Network { url: String, reason: String },

    #[error("无效的路由配置: pattern={pattern}, 原因={reason}")]
    InvalidRoute { pattern: String, reason: String },

    #[error("无效的预缓存清单: {0}")]
    InvalidManifest(String),

    #[error("无效的 URL: {0}")]
    InvalidUrl(String),

    #[error("预缓存失败: url={url}, status={status}")]
    PrecacheFailed { url: String, status: u16 },
}

pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network { .. } => "NETWORK_ERROR",
            Self::InvalidRoute { .. } => "INVALID_ROUTE",
            Self::InvalidManifest(_) => "INVALID_MANIFEST",
            Self::InvalidUrl(_) => "INVALID_URL",
            Self::PrecacheFailed { .. } => "PRECACHE_FAILED",
        }
    }

    /// 网络错误可在下次请求时自然重试，配置错误不可
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::PrecacheFailed { .. })
    }
}
