//! 离线缓存层
//!
//! 模拟 Service Worker 的请求拦截：按 URL 正则匹配路由，
//! 对每条路由应用 cache-first 或 stale-while-revalidate 策略，并按条目数/存活时间淘汰。
//! 预缓存清单在安装阶段写入，激活阶段清理过期条目与废弃缓存。

pub mod error;
pub mod expiration;
pub mod fetcher;
pub mod http;
pub mod precache;
pub mod route;
pub mod storage;
mod strategy;
pub mod worker;

pub use error::{CacheError, Result};
pub use expiration::ExpirationPolicy;
pub use fetcher::{HttpFetcher, NetworkFetcher};
pub use http::{CachedResponse, FetchRequest, HandledResponse, ResponseSource};
pub use precache::{Precache, PrecacheEntry, PrecacheManifest};
pub use route::{CacheStrategy, Route, RouteConfig, default_routes};
pub use storage::{CacheLookup, CacheStorage, RuntimeCache};
pub use worker::{ActivateReport, ServiceWorker};
