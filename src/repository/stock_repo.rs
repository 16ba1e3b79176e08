// ==========================================
// 喷涂线引擎 - 库存数据仓储（工件 + 油漆）
// ==========================================
// 职责: 可用库存查询；事务内的条件扣减
// 红线: 扣减只发生在事务内，且为带条件的原子 UPDATE
//       （WHERE 可用量 >= 扣减量），未命中即报库存不足，绝不扣成负数
// ==========================================

use crate::domain::stock::{Paint, Piece};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};

/// 油漆重量比较容差（kg），吸收浮点累计误差
pub const PAINT_MASS_EPSILON_KG: f64 = 1e-9;

fn map_piece_row(row: &Row) -> SqliteResult<Piece> {
    Ok(Piece {
        piece_id: row.get(0)?,
        client_id: row.get(1)?,
        description: row.get(2)?,
        width_m: row.get(3)?,
        height_m: row.get(4)?,
        total_received: row.get(5)?,
        total_painted: row.get(6)?,
        total_invoiced: row.get(7)?,
    })
}

fn map_paint_row(row: &Row) -> SqliteResult<Paint> {
    Ok(Paint {
        paint_id: row.get(0)?,
        brand: row.get(1)?,
        color: row.get(2)?,
        paint_type: row.get(3)?,
        remaining_kg: row.get(4)?,
    })
}

fn query_piece(conn: &Connection, piece_id: i64) -> RepositoryResult<Option<Piece>> {
    let piece = conn
        .query_row(
            r#"
            SELECT piece_id, client_id, description, width_m, height_m,
                   total_received, total_painted, total_invoiced
            FROM piece
            WHERE piece_id = ?1
            "#,
            params![piece_id],
            map_piece_row,
        )
        .optional()?;
    Ok(piece)
}

fn query_paint(conn: &Connection, paint_id: i64) -> RepositoryResult<Option<Paint>> {
    let paint = conn
        .query_row(
            r#"
            SELECT paint_id, brand, color, paint_type, remaining_kg
            FROM paint
            WHERE paint_id = ?1
            "#,
            params![paint_id],
            map_paint_row,
        )
        .optional()?;
    Ok(paint)
}

// ==========================================
// StockRepository - 库存仓储
// ==========================================
pub struct StockRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StockRepository {
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

    // ==========================================
    // 查询（事务外）
    // ==========================================

    /// 查询工件
    pub fn get_piece(&self, piece_id: i64) -> RepositoryResult<Piece> {
        let conn = self.get_conn()?;
        query_piece(&conn, piece_id)?.ok_or_else(|| RepositoryError::not_found("piece", piece_id))
    }

    /// 查询油漆
    pub fn get_paint(&self, paint_id: i64) -> RepositoryResult<Paint> {
        let conn = self.get_conn()?;
        query_paint(&conn, paint_id)?.ok_or_else(|| RepositoryError::not_found("paint", paint_id))
    }

    /// 工件可用库存（已收货 - 已喷涂）
    pub fn available_piece_stock(&self, piece_id: i64) -> RepositoryResult<i64> {
        Ok(self.get_piece(piece_id)?.stock_available())
    }

    /// 油漆剩余重量 (kg)
    pub fn available_paint_mass(&self, paint_id: i64) -> RepositoryResult<f64> {
        Ok(self.get_paint(paint_id)?.remaining_kg)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    /// 事务内查询工件（锁定后的快照）
    pub fn get_piece_tx(tx: &Transaction, piece_id: i64) -> RepositoryResult<Piece> {
        query_piece(tx, piece_id)?.ok_or_else(|| RepositoryError::not_found("piece", piece_id))
    }

    /// 事务内查询油漆（锁定后的快照）
    pub fn get_paint_tx(tx: &Transaction, paint_id: i64) -> RepositoryResult<Paint> {
        query_paint(tx, paint_id)?.ok_or_else(|| RepositoryError::not_found("paint", paint_id))
    }

    /// 扣减工件库存（累加 total_painted）
    ///
    /// # 返回
    /// - Ok(()): 扣减成功
    /// - Err(InsufficientStock): 可用库存不足，未做任何修改
    pub fn decrement_piece_stock_tx(
        tx: &Transaction,
        piece_id: i64,
        quantity: i64,
    ) -> RepositoryResult<()> {
        let rows = tx.execute(
            r#"
            UPDATE piece
            SET total_painted = total_painted + ?1
            WHERE piece_id = ?2
              AND total_received - total_painted >= ?1
            "#,
            params![quantity, piece_id],
        )?;

        if rows == 0 {
            let piece = Self::get_piece_tx(tx, piece_id)?;
            return Err(RepositoryError::InsufficientStock {
                entity: "piece".to_string(),
                id: piece_id,
                requested: quantity as f64,
                available: piece.stock_available() as f64,
            });
        }
        Ok(())
    }

    /// 扣减油漆剩余重量
    ///
    /// # 返回
    /// - Ok(remaining_kg): 扣减后剩余重量
    /// - Err(InsufficientStock): 剩余重量不足，未做任何修改
    pub fn decrement_paint_tx(
        tx: &Transaction,
        paint_id: i64,
        consumption_kg: f64,
    ) -> RepositoryResult<f64> {
        let rows = tx.execute(
            r#"
            UPDATE paint
            SET remaining_kg = MAX(remaining_kg - ?1, 0)
            WHERE paint_id = ?2
              AND remaining_kg + ?3 >= ?1
            "#,
            params![consumption_kg, paint_id, PAINT_MASS_EPSILON_KG],
        )?;

        let paint = Self::get_paint_tx(tx, paint_id)?;
        if rows == 0 {
            return Err(RepositoryError::InsufficientStock {
                entity: "paint".to_string(),
                id: paint_id,
                requested: consumption_kg,
                available: paint.remaining_kg,
            });
        }
        Ok(paint.remaining_kg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, ensure_schema};

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO piece (piece_id, description, width_m, height_m, total_received, total_painted)
                VALUES (1, 'Portón', 2.0, 1.0, 20, 5);
            INSERT INTO paint (paint_id, brand, color, paint_type, remaining_kg)
                VALUES (1, 'Sherwin', 'Negro', 'Epoxi', 3.0);
            "#,
        )
        .unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn test_available_stock() {
        let repo = StockRepository::new(setup());
        assert_eq!(repo.available_piece_stock(1).unwrap(), 15);
        assert!((repo.available_paint_mass(1).unwrap() - 3.0).abs() < 1e-12);
        assert!(matches!(
            repo.available_piece_stock(2),
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_decrement_success() {
        let shared = setup();
        {
            let mut conn = shared.lock().unwrap();
            let tx = conn.transaction().unwrap();
            StockRepository::decrement_piece_stock_tx(&tx, 1, 15).unwrap();
            let remaining = StockRepository::decrement_paint_tx(&tx, 1, 1.25).unwrap();
            assert!((remaining - 1.75).abs() < 1e-9);
            tx.commit().unwrap();
        }

        let repo = StockRepository::new(shared);
        assert_eq!(repo.available_piece_stock(1).unwrap(), 0);
        assert!((repo.available_paint_mass(1).unwrap() - 1.75).abs() < 1e-9);
    }

    #[test]
    fn test_decrement_rejects_overdraw_without_mutation() {
        let shared = setup();
        {
            let mut conn = shared.lock().unwrap();
            let tx = conn.transaction().unwrap();

            let err = StockRepository::decrement_piece_stock_tx(&tx, 1, 16).unwrap_err();
            match err {
                RepositoryError::InsufficientStock {
                    requested,
                    available,
                    ..
                } => {
                    assert_eq!(requested, 16.0);
                    assert_eq!(available, 15.0);
                }
                other => panic!("unexpected error: {other:?}"),
            }

            let err = StockRepository::decrement_paint_tx(&tx, 1, 3.5).unwrap_err();
            assert!(matches!(err, RepositoryError::InsufficientStock { .. }));
            tx.commit().unwrap();
        }

        let repo = StockRepository::new(shared);
        assert_eq!(repo.available_piece_stock(1).unwrap(), 15);
        assert!((repo.available_paint_mass(1).unwrap() - 3.0).abs() < 1e-12);
    }
}
