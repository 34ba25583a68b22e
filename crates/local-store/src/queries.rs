//! 面向页面的常用查询

use tracing::debug;

use crate::error::Result;
use crate::models::{Duel, DuelStatus, Exhibit, Message, Notification, TradeRequest, TradeStatus};
use crate::store::LocalStore;

impl LocalStore {
    /// 收藏集中的展品，按创建时间倒序
    pub fn exhibits_in_collection(&self, collection_id: &str) -> Result<Vec<Exhibit>> {
        let mut exhibits = self.get_all_where(|e: &Exhibit| {
            e.collection_id.as_deref() == Some(collection_id)
        })?;
        exhibits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(exhibits)
    }

    /// 用户的未读通知，最新在前
    pub fn unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let mut unread =
            self.get_all_where(|n: &Notification| n.user_id == user_id && !n.read)?;
        unread.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(unread)
    }

    /// 标记通知为已读，通知不存在返回 false
    pub fn mark_notification_read(&self, id: &str) -> Result<bool> {
        let Some(mut notification) = self.get::<Notification>(id)? else {
            return Ok(false);
        };
        if !notification.read {
            notification.read = true;
            self.put(&notification)?;
            debug!(notification_id = id, "Notification marked read");
        }
        Ok(true)
    }

    /// 两个用户之间的对话，按时间正序
    pub fn conversation(&self, user_a: &str, user_b: &str) -> Result<Vec<Message>> {
        let mut messages = self.get_all_where(|m: &Message| {
            (m.sender_id == user_a && m.recipient_id == user_b)
                || (m.sender_id == user_b && m.recipient_id == user_a)
        })?;
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(messages)
    }

    /// 用户参与且尚未结束的对决
    pub fn open_duels_for(&self, user_id: &str) -> Result<Vec<Duel>> {
        self.get_all_where(|d: &Duel| {
            d.involves(user_id) && matches!(d.status, DuelStatus::Pending | DuelStatus::Active)
        })
    }

    /// 发给用户、等待处理的交换请求
    pub fn pending_trades_for(&self, user_id: &str) -> Result<Vec<TradeRequest>> {
        self.get_all_where(|t: &TradeRequest| {
            t.to_user_id == user_id && t.status == TradeStatus::Pending
        })
    }
}
