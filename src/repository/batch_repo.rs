// ==========================================
// 喷涂线引擎 - 喷涂批次数据仓储
// ==========================================
// 职责: 批次写入、防重查询（短时间窗）
// 红线: 防重查询必须在已持有写锁的事务内执行
// ==========================================

use crate::db::TS_FORMAT;
use crate::domain::batch::{BatchKey, NewPaintedBatch, PaintedBatch};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};

const BATCH_COLUMNS: &str = "batch_id, piece_id, paint_id, cabin_id, quantity, strategy, \
     consumption_kg, created_at, invoiced_quantity, actor";

fn map_batch_row(row: &Row) -> SqliteResult<PaintedBatch> {
    let created_raw: String = row.get(7)?;
    let created_at = NaiveDateTime::parse_from_str(&created_raw, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(PaintedBatch {
        batch_id: row.get(0)?,
        piece_id: row.get(1)?,
        paint_id: row.get(2)?,
        cabin_id: row.get(3)?,
        quantity: row.get(4)?,
        strategy: row.get(5)?,
        consumption_kg: row.get(6)?,
        created_at,
        invoiced_quantity: row.get(8)?,
        actor: row.get(9)?,
    })
}

fn query_recent_duplicate(
    conn: &Connection,
    key: &BatchKey,
    since: NaiveDateTime,
    until: NaiveDateTime,
) -> RepositoryResult<Option<PaintedBatch>> {
    let sql = format!(
        "SELECT {} FROM painted_batch \
         WHERE piece_id = ?1 AND paint_id = ?2 AND cabin_id = ?3 AND quantity = ?4 \
           AND created_at >= ?5 AND created_at <= ?6 \
         ORDER BY created_at DESC, batch_id DESC \
         LIMIT 1",
        BATCH_COLUMNS
    );
    let batch = conn
        .query_row(
            &sql,
            params![
                key.piece_id,
                key.paint_id,
                key.cabin_id,
                key.quantity,
                since.format(TS_FORMAT).to_string(),
                until.format(TS_FORMAT).to_string(),
            ],
            map_batch_row,
        )
        .optional()?;
    Ok(batch)
}

// ==========================================
// PaintedBatchRepository - 喷涂批次仓储
// ==========================================
pub struct PaintedBatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PaintedBatchRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按主键查询
    pub fn find_by_id(&self, batch_id: i64) -> RepositoryResult<Option<PaintedBatch>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM painted_batch WHERE batch_id = ?1", BATCH_COLUMNS);
        let batch = conn
            .query_row(&sql, params![batch_id], map_batch_row)
            .optional()?;
        Ok(batch)
    }

    /// 统计批次总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM painted_batch", [], |row| row.get(0))?;
        Ok(n)
    }

    /// 时间窗内重复批次的只读探测（不持锁，结果仅作提示）
    pub fn find_recent_duplicate(
        &self,
        key: &BatchKey,
        since: NaiveDateTime,
        until: NaiveDateTime,
    ) -> RepositoryResult<Option<PaintedBatch>> {
        let conn = self.get_conn()?;
        query_recent_duplicate(&conn, key, since, until)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    /// 查找时间窗内的重复批次
    ///
    /// # 参数
    /// - `key`: (工件, 油漆, 喷房, 数量)
    /// - `since`/`until`: 时间窗起止（均含）；晚于 until 的批次不算重复
    ///
    /// # 返回
    /// 最近的一条重复批次（若有）
    pub fn find_recent_duplicate_tx(
        tx: &Transaction,
        key: &BatchKey,
        since: NaiveDateTime,
        until: NaiveDateTime,
    ) -> RepositoryResult<Option<PaintedBatch>> {
        query_recent_duplicate(tx, key, since, until)
    }

    /// 插入批次
    ///
    /// # 返回
    /// 新批次主键
    pub fn insert_tx(tx: &Transaction, batch: &NewPaintedBatch) -> RepositoryResult<i64> {
        tx.execute(
            r#"
            INSERT INTO painted_batch (
                piece_id, paint_id, cabin_id, quantity, strategy,
                consumption_kg, created_at, invoiced_quantity, actor
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)
            "#,
            params![
                batch.piece_id,
                batch.paint_id,
                batch.cabin_id,
                batch.quantity,
                batch.strategy,
                batch.consumption_kg,
                batch.created_at.format(TS_FORMAT).to_string(),
                batch.actor,
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }
}
