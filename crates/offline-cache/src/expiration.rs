//! 缓存过期策略

use chrono::{DateTime, Utc};
use std::time::Duration;

/// 按条目数与存活时间限制缓存
///
/// 两个上限相互独立，均为 None 时缓存永不淘汰。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirationPolicy {
    pub max_entries: Option<usize>,
    pub max_age: Option<Duration>,
}

impl ExpirationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// 条目在 `now` 时刻是否仍在有效期内
    ///
    /// 存储时间晚于 now（时钟回拨）视为新鲜。
    pub fn is_fresh(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let Some(max_age) = self.max_age else {
            return true;
        };
        match now.signed_duration_since(stored_at).to_std() {
            Ok(age) => age <= max_age,
            Err(_) => true,
        }
    }

    /// 超出条目上限的数量
    pub fn overflow(&self, len: usize) -> usize {
        self.max_entries
            .map(|max| len.saturating_sub(max))
            .unwrap_or(0)
    }
}
