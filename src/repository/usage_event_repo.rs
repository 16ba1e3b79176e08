// ==========================================
// 喷涂线引擎 - 用量事件数据仓储
// ==========================================
// 红线: 只追加，不更新、不删除
// ==========================================

use crate::db::{DATE_FORMAT, TS_FORMAT};
use crate::domain::batch::UsageEvent;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Result as SqliteResult, Transaction};
use std::sync::{Arc, Mutex};

pub struct UsageEventRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UsageEventRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加用量事件
    #[allow(clippy::too_many_arguments)]
    pub fn append_tx(
        tx: &Transaction,
        cabin_id: i64,
        batch_id: i64,
        event_date: NaiveDate,
        pieces_painted: i64,
        hours_worked: f64,
        gas_consumed: f64,
        created_at: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        tx.execute(
            r#"
            INSERT INTO usage_event (
                cabin_id, batch_id, event_date, pieces_painted,
                hours_worked, gas_consumed, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                cabin_id,
                batch_id,
                event_date.format(DATE_FORMAT).to_string(),
                pieces_painted,
                hours_worked,
                gas_consumed,
                created_at.format(TS_FORMAT).to_string(),
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }

    /// 查询喷房某日的用量事件
    pub fn list_by_cabin_and_date(
        &self,
        cabin_id: i64,
        event_date: NaiveDate,
    ) -> RepositoryResult<Vec<UsageEvent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT event_id, cabin_id, batch_id, event_date, pieces_painted,
                   hours_worked, gas_consumed, created_at
            FROM usage_event
            WHERE cabin_id = ?1 AND event_date = ?2
            ORDER BY event_id
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![cabin_id, event_date.format(DATE_FORMAT).to_string()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, f64>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter()
            .map(
                |(event_id, cabin_id, batch_id, date, pieces, hours, gas, created)| {
                    Ok(UsageEvent {
                        event_id,
                        cabin_id,
                        batch_id,
                        event_date: NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(
                            |e| RepositoryError::FieldValueError {
                                field: "event_date".to_string(),
                                message: e.to_string(),
                            },
                        )?,
                        pieces_painted: pieces,
                        hours_worked: hours,
                        gas_consumed: gas,
                        created_at: NaiveDateTime::parse_from_str(&created, TS_FORMAT).map_err(
                            |e| RepositoryError::FieldValueError {
                                field: "created_at".to_string(),
                                message: e.to_string(),
                            },
                        )?,
                    })
                },
            )
            .collect()
    }
}
