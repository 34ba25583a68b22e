//! S3 兼容对象存储
//!
//! 上传失败向调用方传播；删除失败只记录日志，孤儿对象由存储侧生命周期规则清理。

use std::time::Instant;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use exhibit_shared::config::ObjectStorageConfig;
use exhibit_shared::observability::metrics;
use tracing::{info, instrument, warn};

use crate::error::{Result, StorageError};

/// 对象存储抽象
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// 上传字节内容，返回公开访问 URL
    async fn upload(&self, body: Vec<u8>, key: &str, content_type: &str) -> Result<String>;

    /// 按对象键或公开 URL 删除对象，失败时仅记录日志
    async fn delete(&self, key_or_url: &str);
}

/// 对象键与公开 URL 之间的换算
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUrls {
    public_base: String,
    /// `{endpoint}/{bucket}`，配置了 CDN 时仍用于识别旧 URL
    bucket_base: String,
}

impl ObjectUrls {
    pub fn new(config: &ObjectStorageConfig) -> Self {
        let bucket_base = format!("{}/{}", config.endpoint.trim_end_matches('/'), config.bucket);
        let public_base = config
            .public_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| bucket_base.clone());
        Self {
            public_base,
            bucket_base,
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key.trim_start_matches('/'))
    }

    /// 从公开 URL 还原对象键；传入的本就是键时原样返回
    pub fn key_from_url<'a>(&self, key_or_url: &'a str) -> &'a str {
        [&self.public_base, &self.bucket_base]
            .iter()
            .find_map(|base| {
                key_or_url
                    .strip_prefix(base.as_str())
                    .and_then(|rest| rest.strip_prefix('/'))
            })
            .unwrap_or(key_or_url)
            .trim_start_matches('/')
    }
}

/// 基于 aws-sdk-s3 的对象存储
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    urls: ObjectUrls,
}

impl S3Storage {
    /// 按配置构建客户端
    ///
    /// 配置了静态密钥时直接使用，否则回退到 AWS 默认凭证链。
    pub async fn new(config: &ObjectStorageConfig) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(StorageError::Config("bucket 不能为空".to_string()));
        }
        if config.endpoint.is_empty() {
            return Err(StorageError::Config("endpoint 不能为空".to_string()));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if !config.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "exhibit-static",
            ));
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(config.endpoint.clone())
            .force_path_style(config.force_path_style)
            .build();

        info!(
            endpoint = %config.endpoint,
            bucket = %config.bucket,
            "Object storage client initialized"
        );

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            urls: ObjectUrls::new(config),
        })
    }

    /// 从 S3_* 环境变量构建
    pub async fn from_env() -> Result<Self> {
        Self::new(&ObjectStorageConfig::from_env()).await
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn public_url(&self, key: &str) -> String {
        self.urls.public_url(key)
    }

    /// 删除对象，错误原样返回
    pub async fn try_delete(&self, key_or_url: &str) -> Result<()> {
        let key = self.urls.key_from_url(key_or_url);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    #[instrument(skip(self, body), fields(bucket = %self.bucket, size = body.len()))]
    async fn upload(&self, body: Vec<u8>, key: &str, content_type: &str) -> Result<String> {
        let start = Instant::now();
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await;

        let elapsed = start.elapsed().as_secs_f64();
        match result {
            Ok(_) => {
                metrics::record_upload("success", elapsed);
                let url = self.urls.public_url(key);
                info!(url = %url, "Object uploaded");
                Ok(url)
            }
            Err(e) => {
                metrics::record_upload("error", elapsed);
                Err(StorageError::Upload {
                    key: key.to_string(),
                    reason: DisplayErrorContext(&e).to_string(),
                })
            }
        }
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn delete(&self, key_or_url: &str) {
        match self.try_delete(key_or_url).await {
            Ok(()) => info!("Object deleted"),
            Err(e) => warn!(error = %e, "Failed to delete object, ignoring"),
        }
    }
}
