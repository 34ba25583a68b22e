//! cache-first 与 stale-while-revalidate 策略实现

use std::sync::Arc;

use exhibit_shared::observability::metrics;
use reqwest::Method;
use tracing::{debug, warn};

use crate::error::Result;
use crate::expiration::ExpirationPolicy;
use crate::fetcher::NetworkFetcher;
use crate::http::{CachedResponse, FetchRequest, HandledResponse, ResponseSource};
use crate::route::Route;
use crate::storage::{CacheLookup, RuntimeCache};

/// 请求网络，GET 且状态码可缓存时写入并执行淘汰
///
/// 缓存只以 URL 为键，其他方法的响应写入后会被同 URL 的 GET 读到。
async fn fetch_and_store(
    cache: &RuntimeCache,
    fetcher: &dyn NetworkFetcher,
    request: &FetchRequest,
    expiration: &ExpirationPolicy,
    cacheable_statuses: &[u16],
) -> Result<CachedResponse> {
    let response = fetcher.fetch(request).await?;

    if request.method == Method::GET && cacheable_statuses.contains(&response.status) {
        let evicted = cache.put(&request.url, response.clone(), expiration);
        metrics::record_cache_eviction(cache.name(), evicted);
    } else {
        debug!(
            cache = %cache.name(),
            url = %request.url,
            status = response.status,
            method = %request.method,
            "Response not cacheable, skipping cache write"
        );
    }

    Ok(response)
}

/// 非 GET 请求既不读也不写缓存
async fn network_only(fetcher: &dyn NetworkFetcher, request: &FetchRequest) -> Result<HandledResponse> {
    let response = fetcher.fetch(request).await?;
    Ok(HandledResponse::new(response, ResponseSource::Network))
}

pub(crate) async fn cache_first(
    route: &Route,
    cache: Arc<RuntimeCache>,
    fetcher: Arc<dyn NetworkFetcher>,
    request: &FetchRequest,
) -> Result<HandledResponse> {
    if request.method != Method::GET {
        return network_only(fetcher.as_ref(), request).await;
    }

    match cache.lookup(&request.url, &route.expiration) {
        CacheLookup::Hit(response) => {
            metrics::record_cache_lookup(cache.name(), "hit");
            return Ok(HandledResponse::new(response, ResponseSource::Cache));
        }
        CacheLookup::Expired => metrics::record_cache_lookup(cache.name(), "expired"),
        CacheLookup::Miss => metrics::record_cache_lookup(cache.name(), "miss"),
    }

    let response = fetch_and_store(
        &cache,
        fetcher.as_ref(),
        request,
        &route.expiration,
        &route.cacheable_statuses,
    )
    .await?;

    Ok(HandledResponse::new(response, ResponseSource::Network))
}

pub(crate) async fn stale_while_revalidate(
    route: &Route,
    cache: Arc<RuntimeCache>,
    fetcher: Arc<dyn NetworkFetcher>,
    request: &FetchRequest,
) -> Result<HandledResponse> {
    if request.method != Method::GET {
        return network_only(fetcher.as_ref(), request).await;
    }

    let cached = match cache.lookup(&request.url, &route.expiration) {
        CacheLookup::Hit(response) => Some(response),
        CacheLookup::Expired | CacheLookup::Miss => None,
    };

    let Some(response) = cached else {
        metrics::record_cache_lookup(cache.name(), "miss");
        let response = fetch_and_store(
            &cache,
            fetcher.as_ref(),
            request,
            &route.expiration,
            &route.cacheable_statuses,
        )
        .await?;
        return Ok(HandledResponse::new(response, ResponseSource::Network));
    };

    metrics::record_cache_lookup(cache.name(), "hit");

    let expiration = route.expiration;
    let statuses = route.cacheable_statuses.clone();
    let request = request.clone();
    let revalidation = tokio::spawn(async move {
        match fetch_and_store(&cache, fetcher.as_ref(), &request, &expiration, &statuses).await {
            Ok(fresh) => {
                metrics::record_revalidation(cache.name(), "ok");
                debug!(cache = %cache.name(), url = %request.url, status = fresh.status, "Cache revalidated");
            }
            Err(e) => {
                metrics::record_revalidation(cache.name(), "failed");
                warn!(cache = %cache.name(), url = %request.url, error = %e, "Background revalidation failed, keeping stale entry");
            }
        }
    });

    Ok(HandledResponse {
        response,
        source: ResponseSource::Cache,
        revalidation: Some(revalidation),
    })
}
