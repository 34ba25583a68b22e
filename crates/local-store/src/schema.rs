//! 本地数据库模式
//!
//! 对象仓库与服务端表一一对应。新增仓库时递增 SCHEMA_VERSION，
//! 打开旧版本文件会补建缺失的表。

use redb::TableDefinition;
use serde::{Serialize, de::DeserializeOwned};

/// 当前模式版本
pub const SCHEMA_VERSION: u32 = 3;

// Key: 配置项名, Value: u32
pub(crate) const META: TableDefinition<&str, u32> = TableDefinition::new("meta");
pub(crate) const SCHEMA_VERSION_KEY: &str = "schema_version";

/// 对象仓库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectStore {
    Exhibits,
    Collections,
    Notifications,
    Messages,
    Profiles,
    Guestbook,
    Wishlist,
    Guilds,
    Duels,
    Trades,
    ApiKeys,
}

impl ObjectStore {
    pub const ALL: [ObjectStore; 11] = [
        Self::Exhibits,
        Self::Collections,
        Self::Notifications,
        Self::Messages,
        Self::Profiles,
        Self::Guestbook,
        Self::Wishlist,
        Self::Guilds,
        Self::Duels,
        Self::Trades,
        Self::ApiKeys,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Exhibits => "exhibits",
            Self::Collections => "collections",
            Self::Notifications => "notifications",
            Self::Messages => "messages",
            Self::Profiles => "profiles",
            Self::Guestbook => "guestbook",
            Self::Wishlist => "wishlist",
            Self::Guilds => "guilds",
            Self::Duels => "duels",
            Self::Trades => "trades",
            Self::ApiKeys => "api_keys",
        }
    }

    // Key: 实体 ID, Value: JSON 编码的记录
    pub(crate) fn table(&self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        TableDefinition::new(self.name())
    }
}

/// 可存入对象仓库的记录
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const STORE: ObjectStore;

    /// 仓库内唯一的主键
    fn key(&self) -> &str;
}
