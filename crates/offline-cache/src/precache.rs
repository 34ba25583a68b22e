//! 预缓存
//!
//! 构建时生成的清单列出应用外壳资源及其版本号。安装阶段逐条拉取写入预缓存，
//! 缓存键带上版本参数，版本变化即视为新资源；激活阶段删除清单外的旧条目。

use std::collections::HashMap;

use exhibit_shared::observability::metrics;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{CacheError, Result};
use crate::expiration::ExpirationPolicy;
use crate::fetcher::NetworkFetcher;
use crate::http::FetchRequest;
use crate::storage::CacheStorage;

const REVISION_PARAM: &str = "__WB_REVISION__";

/// 清单条目，revision 为空表示 URL 自带内容哈希
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecacheEntry {
    pub url: String,
    #[serde(default)]
    pub revision: Option<String>,
}

impl PrecacheEntry {
    pub fn new(url: impl Into<String>, revision: Option<&str>) -> Self {
        Self {
            url: url.into(),
            revision: revision.map(str::to_string),
        }
    }
}

/// 预缓存清单
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrecacheManifest {
    entries: Vec<PrecacheEntry>,
}

impl PrecacheManifest {
    pub fn new(entries: Vec<PrecacheEntry>) -> Self {
        Self { entries }
    }

    /// 解析 `[{"url": "...", "revision": "..."}]` 格式的清单
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CacheError::InvalidManifest(e.to_string()))
    }

    pub fn entries(&self) -> &[PrecacheEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 预缓存控制器
#[derive(Debug, Clone)]
pub struct Precache {
    cache_name: String,
    /// 去掉版本参数的绝对 URL -> 缓存键
    url_to_key: HashMap<String, String>,
}

impl Precache {
    /// 以应用源（如 `https://app.local/`）解析清单中的相对 URL
    pub fn new(cache_prefix: &str, origin: &str, manifest: &PrecacheManifest) -> Result<Self> {
        let base = Url::parse(origin).map_err(|e| CacheError::InvalidUrl(format!("{origin}: {e}")))?;

        let mut url_to_key = HashMap::with_capacity(manifest.entries().len());
        for entry in manifest.entries() {
            let mut url = base
                .join(&entry.url)
                .map_err(|e| CacheError::InvalidManifest(format!("{}: {}", entry.url, e)))?;
            url.set_fragment(None);
            let plain = url.to_string();

            let key = match &entry.revision {
                Some(revision) => {
                    url.query_pairs_mut().append_pair(REVISION_PARAM, revision);
                    url.to_string()
                }
                None => plain.clone(),
            };

            if let Some(existing) = url_to_key.get(&plain) {
                if existing != &key {
                    return Err(CacheError::InvalidManifest(format!(
                        "conflicting revisions for {}",
                        plain
                    )));
                }
            }
            url_to_key.insert(plain, key);
        }

        Ok(Self {
            cache_name: format!("{}-precache-v2", cache_prefix),
            url_to_key,
        })
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn len(&self) -> usize {
        self.url_to_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.url_to_key.is_empty()
    }

    /// 查找请求 URL 对应的预缓存键
    ///
    /// 依次尝试：去掉跟踪参数后的原 URL、目录补 `index.html`、补 `.html` 扩展名。
    pub fn cache_key_for(&self, request_url: &str) -> Option<&str> {
        let mut url = Url::parse(request_url).ok()?;
        url.set_fragment(None);
        strip_tracking_params(&mut url);

        let mut candidates = vec![url.to_string()];
        if url.query().is_none() {
            let path = url.path().to_string();
            if path.ends_with('/') {
                let mut index = url.clone();
                index.set_path(&format!("{}index.html", path));
                candidates.push(index.to_string());
            } else {
                let mut clean = url.clone();
                clean.set_path(&format!("{}.html", path));
                candidates.push(clean.to_string());
            }
        }

        candidates
            .iter()
            .find_map(|candidate| self.url_to_key.get(candidate))
            .map(String::as_str)
    }

    /// 安装：拉取缺失的清单条目，返回新写入的条目数
    ///
    /// 任一条目返回非 2xx 即安装失败，与浏览器语义一致。
    #[instrument(skip(self, storage, fetcher), fields(cache = %self.cache_name))]
    pub async fn install(&self, storage: &CacheStorage, fetcher: &dyn NetworkFetcher) -> Result<usize> {
        let cache = storage.open(&self.cache_name);
        let mut installed = 0;

        let mut pending: Vec<(&String, &String)> = self
            .url_to_key
            .iter()
            .filter(|(_, key)| !cache.contains(key))
            .collect();
        pending.sort();

        for (url, key) in pending {
            let response = fetcher.fetch(&FetchRequest::get(url.as_str())).await?;
            if !response.is_success() {
                return Err(CacheError::PrecacheFailed {
                    url: url.clone(),
                    status: response.status,
                });
            }
            cache.put(key, response, &ExpirationPolicy::new());
            installed += 1;
            debug!(url = %url, "Precached");
        }

        metrics::record_precache(installed);
        info!(installed, total = self.url_to_key.len(), "Precache installed");
        Ok(installed)
    }

    /// 激活：删除不在当前清单中的预缓存条目，返回删除数
    pub fn cleanup(&self, storage: &CacheStorage) -> usize {
        let Some(cache) = storage.get(&self.cache_name) else {
            return 0;
        };

        let current: std::collections::HashSet<&String> = self.url_to_key.values().collect();
        let mut removed = 0;
        for key in cache.keys() {
            if !current.contains(&key) && cache.delete(&key) {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(cache = %self.cache_name, removed, "Removed outdated precache entries");
        }
        removed
    }
}

fn strip_tracking_params(url: &mut Url) {
    if url.query().is_none() {
        return;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !(name.starts_with("utm_") || name == "fbclid"))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}
