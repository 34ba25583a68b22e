//! 命名缓存存储
//!
//! `CacheStorage` 按名称管理多个 `RuntimeCache`，对应浏览器的 CacheStorage。
//! 每个条目记录写入时间（用于存活时间判断）和访问序号（用于超量淘汰，最久未使用者先出）。

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::expiration::ExpirationPolicy;
use crate::http::CachedResponse;

struct CacheEntry {
    response: CachedResponse,
    stored_at: DateTime<Utc>,
    last_access: u64,
}

/// 带过期判断的查找结果
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CachedResponse),
    /// 条目存在但已过期，已被删除
    Expired,
    Miss,
}

/// 单个命名缓存
pub struct RuntimeCache {
    name: String,
    entries: Mutex<HashMap<String, CacheEntry>>,
    access_clock: AtomicU64,
}

impl RuntimeCache {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Mutex::new(HashMap::new()),
            access_clock: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn tick(&self) -> u64 {
        self.access_clock.fetch_add(1, Ordering::Relaxed)
    }

    /// 读取条目，不做过期判断
    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let tick = self.tick();
        let mut entries = self.entries.lock();
        entries.get_mut(key).map(|entry| {
            entry.last_access = tick;
            entry.response.clone()
        })
    }

    /// 按策略读取条目，过期条目立即删除
    pub fn lookup(&self, key: &str, policy: &ExpirationPolicy) -> CacheLookup {
        self.lookup_at(key, policy, Utc::now())
    }

    pub fn lookup_at(
        &self,
        key: &str,
        policy: &ExpirationPolicy,
        now: DateTime<Utc>,
    ) -> CacheLookup {
        let tick = self.tick();
        let mut entries = self.entries.lock();

        let fresh = match entries.get(key) {
            None => return CacheLookup::Miss,
            Some(entry) => policy.is_fresh(entry.stored_at, now),
        };

        if !fresh {
            entries.remove(key);
            debug!(cache = %self.name, key, "Expired cache entry removed");
            return CacheLookup::Expired;
        }

        match entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = tick;
                CacheLookup::Hit(entry.response.clone())
            }
            None => CacheLookup::Miss,
        }
    }

    /// 写入条目并执行淘汰，返回被淘汰的条目数
    pub fn put(&self, key: &str, response: CachedResponse, policy: &ExpirationPolicy) -> usize {
        self.put_at(key, response, policy, Utc::now())
    }

    pub fn put_at(
        &self,
        key: &str,
        response: CachedResponse,
        policy: &ExpirationPolicy,
        now: DateTime<Utc>,
    ) -> usize {
        let tick = self.tick();
        {
            let mut entries = self.entries.lock();
            entries.insert(
                key.to_string(),
                CacheEntry {
                    response,
                    stored_at: now,
                    last_access: tick,
                },
            );
        }
        self.expire_at(policy, now)
    }

    /// 执行淘汰：先删除过期条目，再按最久未访问顺序删除超量条目
    pub fn expire(&self, policy: &ExpirationPolicy) -> usize {
        self.expire_at(policy, Utc::now())
    }

    pub fn expire_at(&self, policy: &ExpirationPolicy, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();

        if policy.max_age.is_some() {
            entries.retain(|_, entry| policy.is_fresh(entry.stored_at, now));
        }

        let overflow = policy.overflow(entries.len());
        if overflow > 0 {
            let mut by_access: Vec<(u64, String)> = entries
                .iter()
                .map(|(key, entry)| (entry.last_access, key.clone()))
                .collect();
            by_access.sort_unstable();
            for (_, key) in by_access.into_iter().take(overflow) {
                entries.remove(&key);
            }
        }

        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(cache = %self.name, evicted, remaining = entries.len(), "Cache entries evicted");
        }
        evicted
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 所有键（字典序）
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// 命名缓存集合
#[derive(Default)]
pub struct CacheStorage {
    caches: DashMap<String, Arc<RuntimeCache>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开缓存，不存在则创建
    pub fn open(&self, name: &str) -> Arc<RuntimeCache> {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RuntimeCache::new(name)))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<RuntimeCache>> {
        self.caches.get(name).map(|cache| cache.clone())
    }

    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    pub fn delete(&self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    /// 所有缓存名（字典序）
    pub fn keys(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.iter().map(|c| c.key().clone()).collect();
        names.sort();
        names
    }
}
