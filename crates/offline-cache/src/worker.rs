//! Service Worker 路由器
//!
//! 拦截请求的顺序：预缓存 -> 路由表（第一条匹配）-> 直连网络。

use std::collections::HashSet;
use std::sync::Arc;

use exhibit_shared::config::OfflineConfig;
use reqwest::Method;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::expiration::ExpirationPolicy;
use crate::fetcher::NetworkFetcher;
use crate::http::{FetchRequest, HandledResponse, ResponseSource};
use crate::precache::{Precache, PrecacheManifest};
use crate::route::{CacheStrategy, Route, default_routes};
use crate::storage::{CacheLookup, CacheStorage};
use crate::strategy;

/// 激活阶段清理结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActivateReport {
    pub removed_precache_entries: usize,
    pub removed_caches: Vec<String>,
}

pub struct ServiceWorker {
    cache_prefix: String,
    routes: Vec<Route>,
    precache: Option<Precache>,
    storage: Arc<CacheStorage>,
    fetcher: Arc<dyn NetworkFetcher>,
}

impl ServiceWorker {
    pub fn new(
        cache_prefix: impl Into<String>,
        routes: Vec<Route>,
        fetcher: Arc<dyn NetworkFetcher>,
    ) -> Self {
        Self {
            cache_prefix: cache_prefix.into(),
            routes,
            precache: None,
            storage: Arc::new(CacheStorage::new()),
            fetcher,
        }
    }

    /// 按配置构建：默认路由表 + 可选预缓存清单
    pub fn from_config(
        config: &OfflineConfig,
        origin: &str,
        manifest: Option<&PrecacheManifest>,
        fetcher: Arc<dyn NetworkFetcher>,
    ) -> Result<Self> {
        let routes = Route::compile_all(
            &default_routes(config.media_host.as_deref()),
            &config.cache_prefix,
        )?;
        let mut worker = Self::new(config.cache_prefix.clone(), routes, fetcher);

        if let Some(manifest) = manifest.filter(|m| !m.is_empty()) {
            worker = worker.with_precache(Precache::new(&config.cache_prefix, origin, manifest)?);
        }
        Ok(worker)
    }

    pub fn with_precache(mut self, precache: Precache) -> Self {
        self.precache = Some(precache);
        self
    }

    /// 共享已有的缓存存储（如 worker 更新后沿用旧缓存）
    pub fn with_storage(mut self, storage: Arc<CacheStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn storage(&self) -> &Arc<CacheStorage> {
        &self.storage
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn find_route(&self, request: &FetchRequest) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(request))
    }

    /// 安装阶段：写入预缓存
    pub async fn install(&self) -> Result<usize> {
        match &self.precache {
            Some(precache) => precache.install(&self.storage, self.fetcher.as_ref()).await,
            None => Ok(0),
        }
    }

    /// 激活阶段：清理旧预缓存条目，删除带本应用前缀但已无路由引用的缓存
    pub fn activate(&self) -> ActivateReport {
        let removed_precache_entries = self
            .precache
            .as_ref()
            .map(|p| p.cleanup(&self.storage))
            .unwrap_or(0);

        let mut in_use: HashSet<&str> = self.routes.iter().map(|r| r.cache_name.as_str()).collect();
        if let Some(precache) = &self.precache {
            in_use.insert(precache.cache_name());
        }

        let owned_prefix = format!("{}-", self.cache_prefix);
        let mut removed_caches = Vec::new();
        for name in self.storage.keys() {
            if name.starts_with(&owned_prefix) && !in_use.contains(name.as_str()) {
                self.storage.delete(&name);
                removed_caches.push(name);
            }
        }

        if !removed_caches.is_empty() {
            info!(caches = ?removed_caches, "Deleted outdated caches");
        }

        ActivateReport {
            removed_precache_entries,
            removed_caches,
        }
    }

    /// 处理一个被拦截的请求
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn handle(&self, request: FetchRequest) -> Result<HandledResponse> {
        if let Some(handled) = self.handle_precached(&request).await? {
            return Ok(handled);
        }

        let Some(route) = self.find_route(&request) else {
            debug!("No route matched, passing through to network");
            let response = self.fetcher.fetch(&request).await?;
            return Ok(HandledResponse::new(response, ResponseSource::Network));
        };

        let cache = self.storage.open(&route.cache_name);
        let fetcher = Arc::clone(&self.fetcher);
        match route.strategy {
            CacheStrategy::CacheFirst => strategy::cache_first(route, cache, fetcher, &request).await,
            CacheStrategy::StaleWhileRevalidate => {
                strategy::stale_while_revalidate(route, cache, fetcher, &request).await
            }
        }
    }

    /// 预缓存资源走 cache-first；缓存缺失（安装未完成或被清理）时回源并补写
    async fn handle_precached(&self, request: &FetchRequest) -> Result<Option<HandledResponse>> {
        if request.method != Method::GET {
            return Ok(None);
        }
        let Some(precache) = &self.precache else {
            return Ok(None);
        };
        let Some(key) = precache.cache_key_for(&request.url) else {
            return Ok(None);
        };

        let cache = self.storage.open(precache.cache_name());
        let unbounded = ExpirationPolicy::new();
        if let CacheLookup::Hit(response) = cache.lookup(key, &unbounded) {
            return Ok(Some(HandledResponse::new(response, ResponseSource::Precache)));
        }

        let response = self.fetcher.fetch(request).await?;
        if response.is_success() {
            cache.put(key, response.clone(), &unbounded);
        }
        Ok(Some(HandledResponse::new(response, ResponseSource::Network)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::fetcher::MockNetworkFetcher;
    use crate::http::CachedResponse;
    use crate::precache::PrecacheEntry;
    use crate::route::RouteConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const API: &str = "https://app.local/api/exhibits/7";
    const IMAGE: &str = "https://app.local/uploads/7.jpg";

    fn routes() -> Vec<Route> {
        let configs = vec![
            RouteConfig::new(r"\.jpg$", CacheStrategy::CacheFirst, "images").max_entries(2),
            RouteConfig::new(r"/api/", CacheStrategy::StaleWhileRevalidate, "api")
                .max_age_seconds(300),
        ];
        Route::compile_all(&configs, "exhibit").unwrap()
    }

    fn worker(fetcher: MockNetworkFetcher) -> ServiceWorker {
        ServiceWorker::new("exhibit", routes(), Arc::new(fetcher))
    }

    fn counting_fetcher(calls: Arc<AtomicUsize>, status: u16) -> MockNetworkFetcher {
        let mut fetcher = MockNetworkFetcher::new();
        fetcher.expect_fetch().returning(move |req| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(CachedResponse::new(status, format!("{}#{}", req.url, n)))
        });
        fetcher
    }

    #[tokio::test]
    async fn test_cache_first_serves_second_request_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sw = worker(counting_fetcher(calls.clone(), 200));

        let first = sw.handle(FetchRequest::get(IMAGE)).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);

        let second = sw.handle(FetchRequest::get(IMAGE)).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.response.body, first.response.body);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_first_does_not_store_uncacheable_status() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sw = worker(counting_fetcher(calls.clone(), 404));

        sw.handle(FetchRequest::get(IMAGE)).await.unwrap();
        let again = sw.handle(FetchRequest::get(IMAGE)).await.unwrap();

        assert_eq!(again.source, ResponseSource::Network);
        assert_eq!(again.response.status, 404);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(sw.storage().open("exhibit-images").is_empty());
    }

    #[tokio::test]
    async fn test_cache_first_respects_max_entries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sw = worker(counting_fetcher(calls, 200));

        for id in 1..=3 {
            sw.handle(FetchRequest::get(format!("https://app.local/uploads/{}.jpg", id)))
                .await
                .unwrap();
        }

        let cache = sw.storage().open("exhibit-images");
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("https://app.local/uploads/1.jpg"));
    }

    #[tokio::test]
    async fn test_cache_first_network_failure_on_miss() {
        let mut fetcher = MockNetworkFetcher::new();
        fetcher.expect_fetch().returning(|req| {
            Err(CacheError::Network {
                url: req.url.clone(),
                reason: "offline".to_string(),
            })
        });
        let sw = worker(fetcher);

        let err = sw.handle(FetchRequest::get(IMAGE)).await.unwrap_err();
        assert!(matches!(err, CacheError::Network { .. }));
    }

    #[tokio::test]
    async fn test_post_response_never_served_to_get() {
        for strategy in [CacheStrategy::CacheFirst, CacheStrategy::StaleWhileRevalidate] {
            let mut config = RouteConfig::new(r"/api/", strategy, "api");
            config.methods = vec!["GET".to_string(), "post".to_string()];
            let routes = Route::compile_all(&[config], "exhibit").unwrap();

            let mut fetcher = MockNetworkFetcher::new();
            fetcher
                .expect_fetch()
                .returning(|req| Ok(CachedResponse::new(200, format!("{} body", req.method))));
            let sw = ServiceWorker::new("exhibit", routes, Arc::new(fetcher));

            let post = sw
                .handle(FetchRequest::new(Method::POST, API))
                .await
                .unwrap();
            assert_eq!(post.source, ResponseSource::Network);
            assert!(sw.storage().open("exhibit-api").is_empty());

            let get = sw.handle(FetchRequest::get(API)).await.unwrap();
            assert_eq!(get.source, ResponseSource::Network);
            assert_eq!(get.response.body, b"GET body");

            // 已缓存的 GET 响应也不会回给 POST
            let post_again = sw
                .handle(FetchRequest::new(Method::POST, API))
                .await
                .unwrap();
            assert_eq!(post_again.source, ResponseSource::Network);
            assert_eq!(post_again.response.body, b"POST body");
        }
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_returns_cached_and_refreshes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sw = worker(counting_fetcher(calls.clone(), 200));

        let miss = sw.handle(FetchRequest::get(API)).await.unwrap();
        assert_eq!(miss.source, ResponseSource::Network);
        assert!(miss.revalidation.is_none());

        let hit = sw.handle(FetchRequest::get(API)).await.unwrap();
        assert_eq!(hit.source, ResponseSource::Cache);
        assert_eq!(hit.response.body, miss.response.body);
        hit.revalidation.expect("background refresh").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // 后台刷新写入的新响应在下次请求时可见
        let after = sw.handle(FetchRequest::get(API)).await.unwrap();
        assert_eq!(after.response.body, format!("{}#1", API).into_bytes());
        after.revalidation.unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_keeps_entry_when_refresh_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut fetcher = MockNetworkFetcher::new();
        let counter = calls.clone();
        fetcher.expect_fetch().returning(move |req| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(CachedResponse::new(200, "fresh"))
            } else {
                Err(CacheError::Network {
                    url: req.url.clone(),
                    reason: "offline".to_string(),
                })
            }
        });
        let sw = worker(fetcher);

        sw.handle(FetchRequest::get(API)).await.unwrap();
        let hit = sw.handle(FetchRequest::get(API)).await.unwrap();
        hit.revalidation.unwrap().await.unwrap();

        let cache = sw.storage().open("exhibit-api");
        assert_eq!(cache.get(API).unwrap().body, b"fresh");
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_ignores_expired_entry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sw = worker(counting_fetcher(calls.clone(), 200));

        let cache = sw.storage().open("exhibit-api");
        let long_ago = chrono::Utc::now() - chrono::Duration::seconds(600);
        cache.put_at(API, CachedResponse::new(200, "ancient"), &ExpirationPolicy::new(), long_ago);

        let handled = sw.handle(FetchRequest::get(API)).await.unwrap();
        assert_eq!(handled.source, ResponseSource::Network);
        assert_ne!(handled.response.body, b"ancient");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unmatched_request_passes_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sw = worker(counting_fetcher(calls.clone(), 200));

        let request = FetchRequest::new(Method::POST, API);
        let handled = sw.handle(request).await.unwrap();
        assert_eq!(handled.source, ResponseSource::Network);
        assert!(sw.storage().keys().is_empty());
    }

    #[tokio::test]
    async fn test_precache_served_before_routes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manifest = PrecacheManifest::new(vec![PrecacheEntry::new("/index.html", Some("r1"))]);
        let precache = Precache::new("exhibit", "https://app.local/", &manifest).unwrap();
        let sw = worker(counting_fetcher(calls.clone(), 200)).with_precache(precache);

        assert_eq!(sw.install().await.unwrap(), 1);

        let handled = sw.handle(FetchRequest::get("https://app.local/")).await.unwrap();
        assert_eq!(handled.source, ResponseSource::Precache);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_activate_removes_orphaned_caches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sw = worker(counting_fetcher(calls, 200));

        sw.storage().open("exhibit-images");
        sw.storage().open("exhibit-api-v0");
        sw.storage().open("exhibit-precache-v1");
        sw.storage().open("third-party-cache");

        let report = sw.activate();
        assert_eq!(
            report.removed_caches,
            vec!["exhibit-api-v0".to_string(), "exhibit-precache-v1".to_string()]
        );
        assert_eq!(
            sw.storage().keys(),
            vec!["exhibit-images".to_string(), "third-party-cache".to_string()]
        );
    }

    #[test]
    fn test_from_config_builds_default_table() {
        let config = OfflineConfig {
            cache_prefix: "exhibit".to_string(),
            media_host: Some("cdn.example.com".to_string()),
        };
        let sw = ServiceWorker::from_config(
            &config,
            "https://app.local/",
            None,
            Arc::new(MockNetworkFetcher::new()),
        )
        .unwrap();

        let route = sw
            .find_route(&FetchRequest::get("https://cdn.example.com/exhibits/1.png"))
            .unwrap();
        assert_eq!(route.cache_name, "exhibit-media");
    }
}
