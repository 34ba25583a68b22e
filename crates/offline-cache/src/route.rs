//! 路由表
//!
//! 每条路由把一个 URL 正则映射到缓存策略、缓存名和过期策略。
//! 路由按声明顺序匹配，第一条命中的生效。

use regex::Regex;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::expiration::ExpirationPolicy;
use crate::http::FetchRequest;

const DAY_SECS: u64 = 24 * 60 * 60;

/// 缓存策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    /// 有未过期缓存直接返回，否则请求网络并写入缓存
    CacheFirst,
    /// 立即返回缓存，同时在后台刷新
    StaleWhileRevalidate,
}

impl CacheStrategy {
    /// 未显式配置时允许写入缓存的状态码
    pub fn default_cacheable_statuses(&self) -> Vec<u16> {
        match self {
            Self::CacheFirst => vec![200],
            Self::StaleWhileRevalidate => vec![0, 200],
        }
    }
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string()]
}

/// 路由配置（可从配置文件反序列化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub pattern: String,
    pub strategy: CacheStrategy,
    /// 不含前缀的缓存名，编译时拼接为 `{prefix}-{cache_name}`
    pub cache_name: String,
    #[serde(default)]
    pub max_entries: Option<usize>,
    #[serde(default)]
    pub max_age_seconds: Option<u64>,
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    #[serde(default)]
    pub cacheable_statuses: Option<Vec<u16>>,
}

impl RouteConfig {
    pub fn new(pattern: impl Into<String>, strategy: CacheStrategy, cache_name: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            strategy,
            cache_name: cache_name.into(),
            max_entries: None,
            max_age_seconds: None,
            methods: default_methods(),
            cacheable_statuses: None,
        }
    }

    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn max_age_seconds(mut self, seconds: u64) -> Self {
        self.max_age_seconds = Some(seconds);
        self
    }

    pub fn cacheable_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.cacheable_statuses = Some(statuses);
        self
    }
}

/// 编译后的路由
#[derive(Debug, Clone)]
pub struct Route {
    pattern: Regex,
    methods: Vec<Method>,
    pub strategy: CacheStrategy,
    pub cache_name: String,
    pub expiration: ExpirationPolicy,
    pub cacheable_statuses: Vec<u16>,
}

impl Route {
    pub fn compile(config: &RouteConfig, cache_prefix: &str) -> Result<Self> {
        let invalid = |reason: String| CacheError::InvalidRoute {
            pattern: config.pattern.clone(),
            reason,
        };

        let pattern = Regex::new(&config.pattern).map_err(|e| invalid(e.to_string()))?;

        let methods = config
            .methods
            .iter()
            .map(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| invalid(e.to_string()))?;
        if methods.is_empty() {
            return Err(invalid("route must allow at least one method".to_string()));
        }

        let mut expiration = ExpirationPolicy::new();
        if let Some(max_entries) = config.max_entries {
            if max_entries == 0 {
                return Err(invalid("max_entries must be positive".to_string()));
            }
            expiration = expiration.with_max_entries(max_entries);
        }
        if let Some(seconds) = config.max_age_seconds {
            expiration = expiration.with_max_age(Duration::from_secs(seconds));
        }

        let cacheable_statuses = config
            .cacheable_statuses
            .clone()
            .unwrap_or_else(|| config.strategy.default_cacheable_statuses());

        Ok(Self {
            pattern,
            methods,
            strategy: config.strategy,
            cache_name: format!("{}-{}", cache_prefix, config.cache_name),
            expiration,
            cacheable_statuses,
        })
    }

    /// 批量编译路由表
    pub fn compile_all(configs: &[RouteConfig], cache_prefix: &str) -> Result<Vec<Self>> {
        configs
            .iter()
            .map(|config| Self::compile(config, cache_prefix))
            .collect()
    }

    pub fn matches(&self, request: &FetchRequest) -> bool {
        self.methods.contains(&request.method) && self.pattern.is_match(&request.url)
    }

    pub fn is_cacheable(&self, status: u16) -> bool {
        self.cacheable_statuses.contains(&status)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// 应用的默认路由表
///
/// `media_host` 为对象存储公网域名，已上传的展品图片单独走长期缓存。
pub fn default_routes(media_host: Option<&str>) -> Vec<RouteConfig> {
    let mut routes = Vec::new();

    if let Some(host) = media_host {
        routes.push(
            RouteConfig::new(
                format!(r"^https?://{}/", regex::escape(host)),
                CacheStrategy::CacheFirst,
                "media",
            )
            .max_entries(200)
            .max_age_seconds(30 * DAY_SECS),
        );
    }

    routes.push(
        RouteConfig::new(
            r"(?i)\.(?:png|jpe?g|gif|svg|webp|avif|ico)(?:\?.*)?$",
            CacheStrategy::CacheFirst,
            "images",
        )
        .max_entries(100)
        .max_age_seconds(30 * DAY_SECS),
    );

    routes.push(
        RouteConfig::new(
            r"(?i)(?:^https://fonts\.(?:googleapis|gstatic)\.com/)|(?:\.(?:woff2?|ttf|otf|eot)(?:\?.*)?$)",
            CacheStrategy::CacheFirst,
            "fonts",
        )
        .max_entries(30)
        .max_age_seconds(365 * DAY_SECS),
    );

    routes.push(
        RouteConfig::new(r"/api/", CacheStrategy::StaleWhileRevalidate, "api")
            .max_entries(50)
            .max_age_seconds(5 * 60)
            .cacheable_statuses(vec![0, 200]),
    );

    routes.push(
        RouteConfig::new(
            r"(?i)\.(?:js|css)(?:\?.*)?$",
            CacheStrategy::StaleWhileRevalidate,
            "static-resources",
        )
        .max_entries(60)
        .max_age_seconds(7 * DAY_SECS),
    );

    routes
}
