//! 请求与响应的缓存表示

use chrono::{DateTime, Utc};
use reqwest::Method;
use tokio::task::JoinHandle;

/// 被拦截的请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// 可缓存的响应快照
///
/// status 为 0 表示跨域不透明响应，与浏览器语义保持一致。
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// 响应从网络取回的时间
    pub fetched_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            fetched_at: Utc::now(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 按名称（大小写不敏感）查找响应头
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 响应来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Precache,
    Cache,
    Network,
}

/// 拦截结果
///
/// stale-while-revalidate 命中缓存时携带后台刷新任务句柄，调用方可选择等待。
#[derive(Debug)]
pub struct HandledResponse {
    pub response: CachedResponse,
    pub source: ResponseSource,
    pub revalidation: Option<JoinHandle<()>>,
}

impl HandledResponse {
    pub(crate) fn new(response: CachedResponse, source: ResponseSource) -> Self {
        Self {
            response,
            source,
            revalidation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = CachedResponse::new(200, "ok").with_header("Content-Type", "text/plain");
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.header("etag"), None);
        assert!(response.is_success());
        assert!(!CachedResponse::new(0, Vec::new()).is_success());
    }
}
