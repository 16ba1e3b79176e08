use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::ensure_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn make_test_log(actor: &str, hour: u32) -> ActionLog {
    let ts = NaiveDate::from_ymd_opt(2026, 3, 10)
        .unwrap()
        .and_hms_milli_opt(hour, 0, 0, 125)
        .unwrap();
    ActionLog::new(ActionType::RegisterBatch, actor, ts)
        .with_entity("painted_batch", 7)
        .with_payload(json!({ "piece_stock_before": 20, "piece_stock_after": 10 }))
        .with_detail("Test log")
}

#[test]
fn test_insert_and_find_by_id() {
    let repo = ActionLogRepository::new(setup_test_db());

    let log = make_test_log("user1", 8);
    let id = repo.insert(&log).unwrap();
    assert_eq!(id, log.action_id);

    let found = repo.find_by_id(&id).unwrap().unwrap();
    assert_eq!(found.actor, "user1");
    assert_eq!(found.action_type, "RegisterBatch");
    assert_eq!(found.action_ts, log.action_ts);
    assert_eq!(found.payload_json.unwrap()["piece_stock_after"], 10);
}

#[test]
fn test_find_by_entity_and_count() {
    let shared = setup_test_db();
    let repo = ActionLogRepository::new(shared.clone());

    repo.insert(&make_test_log("user1", 8)).unwrap();
    {
        let mut conn = shared.lock().unwrap();
        let tx = conn.transaction().unwrap();
        ActionLogRepository::insert_tx(&tx, &make_test_log("user2", 9)).unwrap();
        tx.commit().unwrap();
    }

    let logs = repo.find_by_entity("painted_batch", "7").unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].actor, "user1");

    assert_eq!(repo.count_by_action_type("RegisterBatch").unwrap(), 2);
    assert_eq!(repo.find_recent(1).unwrap()[0].actor, "user2");
}

#[test]
fn test_rolled_back_insert_is_not_visible() {
    let shared = setup_test_db();
    {
        let mut conn = shared.lock().unwrap();
        let tx = conn.transaction().unwrap();
        ActionLogRepository::insert_tx(&tx, &make_test_log("user3", 10)).unwrap();
        // 未提交，drop 即回滚
    }
    let repo = ActionLogRepository::new(shared);
    assert_eq!(repo.count_by_action_type("RegisterBatch").unwrap(), 0);
}
