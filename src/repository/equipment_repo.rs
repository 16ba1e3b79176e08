// ==========================================
// 喷涂线引擎 - 喷房/设备数据仓储
// ==========================================
// 职责: 喷房、喷枪、烘炉查询；事务内的使用小时累加与当日计数
// 红线: Repository 不含业务逻辑
// 红线: 使用小时只允许原子累加（usage_hours = usage_hours + ?）
// ==========================================

use crate::db::DATE_FORMAT;
use crate::domain::cabin::{Cabin, Gun, Oven};
use crate::domain::types::OperationalStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};

const CABIN_COLUMNS: &str =
    "cabin_id, name, status, max_daily_pieces, pieces_today, last_activity_date";

// 分配有效的设备；`active_only` 时再要求设备自身状态为 ACTIVE
fn cabin_guns_sql(active_only: bool) -> String {
    format!(
        r#"
        SELECT g.gun_id, g.name, g.status, g.usage_hours,
               g.maintenance_interval_hours, g.last_maintenance_date
        FROM gun g
        JOIN cabin_gun cg ON cg.gun_id = g.gun_id
        WHERE cg.cabin_id = ?1 AND cg.active = 1 {}
        ORDER BY g.gun_id
        "#,
        if active_only { "AND g.status = 'ACTIVE'" } else { "" }
    )
}

fn cabin_ovens_sql(active_only: bool) -> String {
    format!(
        r#"
        SELECT o.oven_id, o.name, o.status, o.usage_hours,
               o.maintenance_interval_hours, o.last_maintenance_date,
               o.max_temperature_c, o.gas_per_hour
        FROM oven o
        JOIN cabin_oven co ON co.oven_id = o.oven_id
        WHERE co.cabin_id = ?1 AND co.active = 1 {}
        ORDER BY o.oven_id
        "#,
        if active_only { "AND o.status = 'ACTIVE'" } else { "" }
    )
}

fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}

fn map_cabin_row(row: &Row) -> SqliteResult<Cabin> {
    Ok(Cabin {
        cabin_id: row.get(0)?,
        name: row.get(1)?,
        status: OperationalStatus::from_db_str(&row.get::<_, String>(2)?),
        max_daily_pieces: row.get(3)?,
        pieces_today: row.get(4)?,
        last_activity_date: parse_date(row.get(5)?),
    })
}

fn map_gun_row(row: &Row) -> SqliteResult<Gun> {
    Ok(Gun {
        gun_id: row.get(0)?,
        name: row.get(1)?,
        status: OperationalStatus::from_db_str(&row.get::<_, String>(2)?),
        usage_hours: row.get(3)?,
        maintenance_interval_hours: row.get(4)?,
        last_maintenance_date: parse_date(row.get(5)?),
    })
}

fn map_oven_row(row: &Row) -> SqliteResult<Oven> {
    Ok(Oven {
        oven_id: row.get(0)?,
        name: row.get(1)?,
        status: OperationalStatus::from_db_str(&row.get::<_, String>(2)?),
        usage_hours: row.get(3)?,
        maintenance_interval_hours: row.get(4)?,
        last_maintenance_date: parse_date(row.get(5)?),
        max_temperature_c: row.get(6)?,
        gas_per_hour: row.get(7)?,
    })
}

fn query_cabin(conn: &Connection, cabin_id: i64) -> RepositoryResult<Option<Cabin>> {
    let sql = format!("SELECT {} FROM cabin WHERE cabin_id = ?1", CABIN_COLUMNS);
    let cabin = conn
        .query_row(&sql, params![cabin_id], map_cabin_row)
        .optional()?;
    Ok(cabin)
}

fn query_cabin_guns(conn: &Connection, cabin_id: i64, active_only: bool) -> RepositoryResult<Vec<Gun>> {
    let mut stmt = conn.prepare(&cabin_guns_sql(active_only))?;
    let guns = stmt
        .query_map(params![cabin_id], map_gun_row)?
        .collect::<SqliteResult<Vec<_>>>()?;
    Ok(guns)
}

fn query_cabin_ovens(
    conn: &Connection,
    cabin_id: i64,
    active_only: bool,
) -> RepositoryResult<Vec<Oven>> {
    let mut stmt = conn.prepare(&cabin_ovens_sql(active_only))?;
    let ovens = stmt
        .query_map(params![cabin_id], map_oven_row)?
        .collect::<SqliteResult<Vec<_>>>()?;
    Ok(ovens)
}

// ==========================================
// EquipmentRepository - 喷房/设备仓储
// ==========================================
pub struct EquipmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EquipmentRepository {
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

    /// 查询喷房
    ///
    /// # 返回
    /// - Ok(Cabin): 找到喷房
    /// - Err(NotFound): 喷房不存在
    pub fn get_cabin(&self, cabin_id: i64) -> RepositoryResult<Cabin> {
        let conn = self.get_conn()?;
        query_cabin(&conn, cabin_id)?.ok_or_else(|| RepositoryError::not_found("cabin", cabin_id))
    }

    /// 查询喷房当前分配且运行中的喷枪
    pub fn list_active_guns(&self, cabin_id: i64) -> RepositoryResult<Vec<Gun>> {
        let conn = self.get_conn()?;
        query_cabin_guns(&conn, cabin_id, true)
    }

    /// 查询喷房当前分配且运行中的烘炉
    pub fn list_active_ovens(&self, cabin_id: i64) -> RepositoryResult<Vec<Oven>> {
        let conn = self.get_conn()?;
        query_cabin_ovens(&conn, cabin_id, true)
    }

    /// 查询全部喷枪（维护报表用）
    pub fn list_all_guns(&self) -> RepositoryResult<Vec<Gun>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT gun_id, name, status, usage_hours,
                   maintenance_interval_hours, last_maintenance_date
            FROM gun
            ORDER BY gun_id
            "#,
        )?;
        let guns = stmt
            .query_map([], map_gun_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(guns)
    }

    /// 查询全部烘炉（维护报表用）
    pub fn list_all_ovens(&self) -> RepositoryResult<Vec<Oven>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT oven_id, name, status, usage_hours,
                   maintenance_interval_hours, last_maintenance_date,
                   max_temperature_c, gas_per_hour
            FROM oven
            ORDER BY oven_id
            "#,
        )?;
        let ovens = stmt
            .query_map([], map_oven_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(ovens)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    /// 事务内查询喷房
    pub fn get_cabin_tx(tx: &Transaction, cabin_id: i64) -> RepositoryResult<Cabin> {
        query_cabin(tx, cabin_id)?.ok_or_else(|| RepositoryError::not_found("cabin", cabin_id))
    }

    /// 事务内查询运行中的喷枪（读取累加后的最新小时数）
    pub fn list_active_guns_tx(tx: &Transaction, cabin_id: i64) -> RepositoryResult<Vec<Gun>> {
        query_cabin_guns(tx, cabin_id, true)
    }

    /// 事务内查询运行中的烘炉
    pub fn list_active_ovens_tx(tx: &Transaction, cabin_id: i64) -> RepositoryResult<Vec<Oven>> {
        query_cabin_ovens(tx, cabin_id, true)
    }

    /// 事务内查询分配给喷房的全部喷枪（含维护中/停用，告警评估用）
    pub fn list_assigned_guns_tx(tx: &Transaction, cabin_id: i64) -> RepositoryResult<Vec<Gun>> {
        query_cabin_guns(tx, cabin_id, false)
    }

    /// 事务内查询分配给喷房的全部烘炉
    pub fn list_assigned_ovens_tx(tx: &Transaction, cabin_id: i64) -> RepositoryResult<Vec<Oven>> {
        query_cabin_ovens(tx, cabin_id, false)
    }

    /// 累加喷枪使用小时
    pub fn add_gun_hours_tx(tx: &Transaction, gun_id: i64, hours: f64) -> RepositoryResult<()> {
        let rows = tx.execute(
            "UPDATE gun SET usage_hours = usage_hours + ?1 WHERE gun_id = ?2",
            params![hours, gun_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("gun", gun_id));
        }
        Ok(())
    }

    /// 累加烘炉使用小时
    pub fn add_oven_hours_tx(tx: &Transaction, oven_id: i64, hours: f64) -> RepositoryResult<()> {
        let rows = tx.execute(
            "UPDATE oven SET usage_hours = usage_hours + ?1 WHERE oven_id = ?2",
            params![hours, oven_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("oven", oven_id));
        }
        Ok(())
    }

    /// 记录喷房当日件数（含日期翻转）
    ///
    /// 单条 UPDATE 完成：日期不同则从 0 起算，否则累加。
    ///
    /// # 返回
    /// 更新后的当日件数
    pub fn record_pieces_today_tx(
        tx: &Transaction,
        cabin_id: i64,
        today: NaiveDate,
        quantity: i64,
    ) -> RepositoryResult<i64> {
        let today_str = today.format(DATE_FORMAT).to_string();
        let rows = tx.execute(
            r#"
            UPDATE cabin
            SET pieces_today = CASE
                    WHEN last_activity_date = ?2 THEN pieces_today + ?3
                    ELSE ?3
                END,
                last_activity_date = ?2
            WHERE cabin_id = ?1
            "#,
            params![cabin_id, today_str, quantity],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("cabin", cabin_id));
        }

        let pieces_today: i64 = tx.query_row(
            "SELECT pieces_today FROM cabin WHERE cabin_id = ?1",
            params![cabin_id],
            |row| row.get(0),
        )?;
        Ok(pieces_today)
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
            INSERT INTO cabin (cabin_id, name, status, max_daily_pieces, pieces_today, last_activity_date)
                VALUES (1, 'Cabina 1', 'ACTIVE', 100, 30, '2026-03-09');
            INSERT INTO gun (gun_id, name, status, usage_hours, maintenance_interval_hours)
                VALUES (1, 'Pistola A', 'ACTIVE', 10, 100),
                       (2, 'Pistola B', 'MAINTENANCE', 0, 100),
                       (3, 'Pistola C', 'ACTIVE', 0, 100);
            INSERT INTO oven (oven_id, name, status, usage_hours, maintenance_interval_hours, max_temperature_c, gas_per_hour)
                VALUES (1, 'Horno 1', 'ACTIVE', 5, 500, 220, 2.5);
            INSERT INTO cabin_gun (cabin_id, gun_id, active) VALUES (1, 1, 1), (1, 2, 1), (1, 3, 0);
            INSERT INTO cabin_oven (cabin_id, oven_id, active) VALUES (1, 1, 1);
            "#,
        )
        .unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn test_get_cabin_and_not_found() {
        let repo = EquipmentRepository::new(setup());

        let cabin = repo.get_cabin(1).unwrap();
        assert_eq!(cabin.name, "Cabina 1");
        assert_eq!(cabin.status, OperationalStatus::Active);
        assert_eq!(
            cabin.last_activity_date,
            NaiveDate::from_ymd_opt(2026, 3, 9)
        );

        let err = repo.get_cabin(99).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_active_equipment_filters_assignment_and_status() {
        let repo = EquipmentRepository::new(setup());

        // Pistola B 维护中，Pistola C 分配已停用
        let guns = repo.list_active_guns(1).unwrap();
        assert_eq!(guns.len(), 1);
        assert_eq!(guns[0].name, "Pistola A");

        let ovens = repo.list_active_ovens(1).unwrap();
        assert_eq!(ovens.len(), 1);
        assert!((ovens[0].gas_per_hour - 2.5).abs() < 1e-12);

        assert_eq!(repo.list_all_guns().unwrap().len(), 3);
    }

    #[test]
    fn test_assigned_equipment_includes_maintenance_units() {
        let shared = setup();
        let mut conn = shared.lock().unwrap();
        let tx = conn.transaction().unwrap();

        // Pistola B 维护中仍属于喷房；Pistola C 分配已停用
        let names: Vec<String> = EquipmentRepository::list_assigned_guns_tx(&tx, 1)
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["Pistola A", "Pistola B"]);
        assert_eq!(EquipmentRepository::list_assigned_ovens_tx(&tx, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_hours_and_pieces_today_in_transaction() {
        let shared = setup();
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();

        {
            let mut conn = shared.lock().unwrap();
            let tx = conn.transaction().unwrap();

            EquipmentRepository::add_gun_hours_tx(&tx, 1, 0.5).unwrap();
            EquipmentRepository::add_oven_hours_tx(&tx, 1, 1.0).unwrap();

            // 日期翻转：旧日期的 30 件不计入
            let first = EquipmentRepository::record_pieces_today_tx(&tx, 1, today, 10).unwrap();
            assert_eq!(first, 10);
            let second = EquipmentRepository::record_pieces_today_tx(&tx, 1, today, 5).unwrap();
            assert_eq!(second, 15);

            assert!(EquipmentRepository::add_gun_hours_tx(&tx, 42, 1.0).is_err());
            tx.commit().unwrap();
        }

        let repo = EquipmentRepository::new(shared);
        let gun = repo.list_active_guns(1).unwrap().remove(0);
        assert!((gun.usage_hours - 10.5).abs() < 1e-9);
        let oven = repo.list_active_ovens(1).unwrap().remove(0);
        assert!((oven.usage_hours - 6.0).abs() < 1e-9);
        assert_eq!(repo.get_cabin(1).unwrap().pieces_today, 15);
    }
}
