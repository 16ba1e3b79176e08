// ==========================================
// 喷涂线引擎 - 设备告警数据仓储
// ==========================================
// 职责: 告警写入（登记事务内）、未读查询、标记已读（外部界面）
// ==========================================

use crate::db::TS_FORMAT;
use crate::domain::alert::{Alert, AlertDraft};
use crate::domain::types::{AlertSeverity, EquipmentKind, WearLevel};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};

const ALERT_COLUMNS: &str = "alert_id, equipment_kind, equipment_id, equipment_name, alert_kind, \
     message, severity, is_read, created_at, batch_id";

fn map_alert_row(row: &Row) -> SqliteResult<Alert> {
    let kind_raw: String = row.get(1)?;
    let equipment_kind = EquipmentKind::from_db_str(&kind_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("未知设备类型: {}", kind_raw).into(),
        )
    })?;

    let created_raw: String = row.get(8)?;
    let created_at = NaiveDateTime::parse_from_str(&created_raw, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Alert {
        alert_id: row.get(0)?,
        equipment_kind,
        equipment_id: row.get(2)?,
        equipment_name: row.get(3)?,
        alert_kind: WearLevel::from_db_str(&row.get::<_, String>(4)?),
        message: row.get(5)?,
        severity: AlertSeverity::from_db_str(&row.get::<_, String>(6)?),
        is_read: row.get::<_, i64>(7)? != 0,
        created_at,
        batch_id: row.get(9)?,
    })
}

// ==========================================
// AlertRepository - 告警仓储
// ==========================================
pub struct AlertRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AlertRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 事务内写入告警
    pub fn insert_tx(
        tx: &Transaction,
        draft: &AlertDraft,
        batch_id: Option<i64>,
        created_at: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        tx.execute(
            r#"
            INSERT INTO equipment_alert (
                equipment_kind, equipment_id, equipment_name, alert_kind,
                message, severity, is_read, created_at, batch_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8)
            "#,
            params![
                draft.equipment_kind.to_db_str(),
                draft.equipment_id,
                draft.equipment_name,
                draft.level.as_str(),
                draft.message,
                draft.severity.to_db_str(),
                created_at.format(TS_FORMAT).to_string(),
                batch_id,
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }

    /// 查询未读告警（最新在前）
    pub fn list_unread(&self, limit: i64) -> RepositoryResult<Vec<Alert>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM equipment_alert WHERE is_read = 0 \
             ORDER BY created_at DESC, alert_id DESC LIMIT ?1",
            ALERT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let alerts = stmt
            .query_map(params![limit], map_alert_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(alerts)
    }

    /// 查询某批次触发的告警
    pub fn list_by_batch(&self, batch_id: i64) -> RepositoryResult<Vec<Alert>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM equipment_alert WHERE batch_id = ?1 ORDER BY alert_id",
            ALERT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let alerts = stmt
            .query_map(params![batch_id], map_alert_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(alerts)
    }

    /// 统计告警总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM equipment_alert", [], |row| row.get(0))?;
        Ok(n)
    }

    /// 标记已读
    ///
    /// # 返回
    /// - Ok(true): 状态由未读变为已读
    /// - Ok(false): 原本已读
    /// - Err(NotFound): 告警不存在
    pub fn mark_read(&self, alert_id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM equipment_alert WHERE alert_id = ?1",
            params![alert_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepositoryError::not_found("equipment_alert", alert_id));
        }

        let rows = conn.execute(
            "UPDATE equipment_alert SET is_read = 1 WHERE alert_id = ?1 AND is_read = 0",
            params![alert_id],
        )?;
        Ok(rows > 0)
    }
}
