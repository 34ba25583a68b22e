//! 镜像到本地的服务端实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{ObjectStore, Record};

macro_rules! impl_record {
    ($ty:ty, $store:expr) => {
        impl Record for $ty {
            const STORE: ObjectStore = $store;

            fn key(&self) -> &str {
                &self.id
            }
        }
    };
}

/// 展品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exhibit {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub collection_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub specs: Map<String, Value>,
    #[serde(default)]
    pub comments: Vec<Value>,
    #[serde(default)]
    pub likes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
impl_record!(Exhibit, ObjectStore::Exhibits);

/// 收藏集
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}
impl_record!(Collection, ObjectStore::Collections);

/// 站内通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
impl_record!(Notification, ObjectStore::Notifications);

/// 私信
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
impl_record!(Message, ObjectStore::Messages);

/// 用户资料（id 即用户 ID）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub guild_id: Option<String>,
}
impl_record!(UserProfile, ObjectStore::Profiles);

/// 留言簿条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestbookEntry {
    pub id: String,
    pub profile_id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
impl_record!(GuestbookEntry, ObjectStore::Guestbook);

/// 心愿单条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}
impl_record!(WishlistItem, ObjectStore::Wishlist);

/// 公会
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
    pub name: String,
    pub leader_id: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub xp: u64,
    pub created_at: DateTime<Utc>,
}
impl_record!(Guild, ObjectStore::Guilds);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuelStatus {
    Pending,
    Active,
    Finished,
    Declined,
}

/// 展品对决
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Duel {
    pub id: String,
    pub challenger_id: String,
    pub opponent_id: String,
    pub challenger_exhibit_id: String,
    #[serde(default)]
    pub opponent_exhibit_id: Option<String>,
    pub status: DuelStatus,
    #[serde(default)]
    pub winner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
impl_record!(Duel, ObjectStore::Duels);

impl Duel {
    pub fn involves(&self, user_id: &str) -> bool {
        self.challenger_id == user_id || self.opponent_id == user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

/// 交换请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    #[serde(default)]
    pub offered_exhibit_ids: Vec<String>,
    #[serde(default)]
    pub requested_exhibit_ids: Vec<String>,
    pub status: TradeStatus,
    #[serde(default)]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}
impl_record!(TradeRequest, ObjectStore::Trades);

/// API 密钥（仅保存元信息，不含明文）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: String,
    pub name: String,
    pub prefix: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}
impl_record!(ApiKey, ObjectStore::ApiKeys);
