//! 网络请求抽象
//!
//! 策略层只依赖 `NetworkFetcher` trait，生产环境使用 reqwest 实现，测试使用 mock。

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{CacheError, Result};
use crate::http::{CachedResponse, FetchRequest};

/// 网络请求发送器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NetworkFetcher: Send + Sync {
    /// 发送请求并完整读取响应体
    ///
    /// 非 2xx 状态码不视为错误，由策略层根据可缓存状态码决定是否写入缓存。
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse>;
}

/// 基于 reqwest 的网络请求发送器
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Network {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NetworkFetcher for HttpFetcher {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse> {
        let network_err = |e: reqwest::Error| CacheError::Network {
            url: request.url.clone(),
            reason: e.to_string(),
        };

        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(network_err)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(network_err)?.to_vec();

        debug!(status, bytes = body.len(), "Network response received");

        Ok(CachedResponse {
            status,
            headers,
            body,
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_maps_to_network_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        // 端口 1 上没有服务监听，连接立即被拒绝
        let url = "http://127.0.0.1:1/api/exhibits";

        let err = fetcher.fetch(&FetchRequest::get(url)).await.unwrap_err();
        match err {
            CacheError::Network { url: failed, reason } => {
                assert_eq!(failed, url);
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_network_error() {
        let fetcher = HttpFetcher::with_client(reqwest::Client::new());
        let err = fetcher.fetch(&FetchRequest::get("not a url")).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.code(), "NETWORK_ERROR");
    }
}
