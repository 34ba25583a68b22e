//! 本地镜像查询测试

use chrono::{Duration, TimeZone, Utc};
use local_store::{
    Duel, DuelStatus, Exhibit, LocalStore, Message, Notification, TradeRequest, TradeStatus,
};
use serde_json::Map;
use tempfile::TempDir;

fn open() -> (LocalStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::open_path(temp_dir.path().join("mirror.redb")).unwrap();
    (store, temp_dir)
}

fn exhibit(id: &str, collection: Option<&str>, age_days: i64) -> Exhibit {
    let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() - Duration::days(age_days);
    Exhibit {
        id: id.to_string(),
        owner_id: "u1".to_string(),
        collection_id: collection.map(str::to_string),
        title: format!("Экспонат {}", id),
        description: None,
        category: Some("Монеты".to_string()),
        subcategory: None,
        image_urls: vec![],
        specs: Map::new(),
        comments: vec![],
        likes: 0,
        created_at: created,
        updated_at: created,
    }
}

fn message(id: &str, from: &str, to: &str, minute: u32) -> Message {
    Message {
        id: id.to_string(),
        sender_id: from.to_string(),
        recipient_id: to.to_string(),
        body: format!("msg {}", id),
        read: false,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
    }
}

#[test]
fn test_exhibits_in_collection_newest_first() {
    let (store, _temp) = open();
    store
        .put_many(&[
            exhibit("e1", Some("c1"), 5),
            exhibit("e2", Some("c1"), 1),
            exhibit("e3", Some("c2"), 0),
            exhibit("e4", None, 0),
        ])
        .unwrap();

    let ids: Vec<String> = store
        .exhibits_in_collection("c1")
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec!["e2".to_string(), "e1".to_string()]);
}

#[test]
fn test_unread_notifications_and_mark_read() {
    let (store, _temp) = open();
    let base = Utc::now();
    let notifications: Vec<Notification> = (0..3)
        .map(|i| Notification {
            id: format!("n{}", i),
            user_id: (if i < 2 { "u1" } else { "u2" }).to_string(),
            kind: "like".to_string(),
            title: "Новый лайк".to_string(),
            body: None,
            link: None,
            read: false,
            created_at: base + Duration::minutes(i),
        })
        .collect();
    store.put_many(&notifications).unwrap();

    let unread = store.unread_notifications("u1").unwrap();
    assert_eq!(unread.len(), 2);
    assert_eq!(unread[0].id, "n1");

    assert!(store.mark_notification_read("n1").unwrap());
    assert!(!store.mark_notification_read("missing").unwrap());
    assert_eq!(store.unread_notifications("u1").unwrap().len(), 1);
}

#[test]
fn test_conversation_is_chronological_and_bidirectional() {
    let (store, _temp) = open();
    store
        .put_many(&[
            message("m3", "u1", "u2", 30),
            message("m1", "u1", "u2", 10),
            message("m2", "u2", "u1", 20),
            message("m4", "u1", "u3", 15),
        ])
        .unwrap();

    let ids: Vec<String> = store
        .conversation("u2", "u1")
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec!["m1".to_string(), "m2".to_string(), "m3".to_string()]);
}

#[test]
fn test_open_duels_and_pending_trades() {
    let (store, _temp) = open();
    let now = Utc::now();
    let duel = |id: &str, challenger: &str, opponent: &str, status: DuelStatus| Duel {
        id: id.to_string(),
        challenger_id: challenger.to_string(),
        opponent_id: opponent.to_string(),
        challenger_exhibit_id: "e1".to_string(),
        opponent_exhibit_id: None,
        status,
        winner_id: None,
        created_at: now,
    };
    store
        .put_many(&[
            duel("d1", "u1", "u2", DuelStatus::Pending),
            duel("d2", "u3", "u1", DuelStatus::Active),
            duel("d3", "u1", "u2", DuelStatus::Finished),
            duel("d4", "u2", "u3", DuelStatus::Active),
        ])
        .unwrap();
    assert_eq!(store.open_duels_for("u1").unwrap().len(), 2);

    let trade = |id: &str, to: &str, status: TradeStatus| TradeRequest {
        id: id.to_string(),
        from_user_id: "u9".to_string(),
        to_user_id: to.to_string(),
        offered_exhibit_ids: vec!["e7".to_string()],
        requested_exhibit_ids: vec![],
        status,
        message: None,
        created_at: now,
    };
    store
        .put_many(&[
            trade("t1", "u1", TradeStatus::Pending),
            trade("t2", "u1", TradeStatus::Rejected),
            trade("t3", "u2", TradeStatus::Pending),
        ])
        .unwrap();
    let pending = store.pending_trades_for("u1").unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "t1");
}
