// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、种子数据（喷房/设备/工件/油漆）、固定时间点
// ==========================================
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use paint_line_engine::api::SessionContext;
use paint_line_engine::db::{ensure_schema, open_sqlite_connection, DATE_FORMAT};
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    ensure_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开已配置 PRAGMA 的测试连接
pub fn open_test_connection(db_path: &str) -> Result<Connection, Box<dyn Error>> {
    Ok(open_sqlite_connection(db_path)?)
}

/// 共享连接（仓储/登记引擎使用）
pub fn shared_connection(db_path: &str) -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(open_test_connection(db_path).unwrap()))
}

// ==========================================
// 时间点
// ==========================================

pub fn test_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
}

/// 测试日的某个时刻
pub fn at(hour: u32, min: u32, sec: u32, milli: u32) -> NaiveDateTime {
    test_day().and_hms_milli_opt(hour, min, sec, milli).unwrap()
}

// ==========================================
// 种子数据
// ==========================================

pub fn seed_cabin(
    conn: &Connection,
    name: &str,
    status: &str,
    max_daily_pieces: i64,
    pieces_today: i64,
    last_activity_date: Option<NaiveDate>,
) -> i64 {
    conn.execute(
        "INSERT INTO cabin (name, status, max_daily_pieces, pieces_today, last_activity_date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            name,
            status,
            max_daily_pieces,
            pieces_today,
            last_activity_date.map(|d| d.format(DATE_FORMAT).to_string()),
        ],
    )
    .unwrap();
    conn.last_insert_rowid()
}

pub fn seed_gun(
    conn: &Connection,
    cabin_id: i64,
    name: &str,
    usage_hours: f64,
    interval_hours: f64,
) -> i64 {
    conn.execute(
        "INSERT INTO gun (name, usage_hours, maintenance_interval_hours) VALUES (?1, ?2, ?3)",
        params![name, usage_hours, interval_hours],
    )
    .unwrap();
    let gun_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO cabin_gun (cabin_id, gun_id, active) VALUES (?1, ?2, 1)",
        params![cabin_id, gun_id],
    )
    .unwrap();
    gun_id
}

pub fn seed_oven(
    conn: &Connection,
    cabin_id: i64,
    name: &str,
    usage_hours: f64,
    interval_hours: f64,
    gas_per_hour: f64,
) -> i64 {
    conn.execute(
        "INSERT INTO oven (name, usage_hours, maintenance_interval_hours, max_temperature_c, gas_per_hour)
         VALUES (?1, ?2, ?3, 220.0, ?4)",
        params![name, usage_hours, interval_hours, gas_per_hour],
    )
    .unwrap();
    let oven_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO cabin_oven (cabin_id, oven_id, active) VALUES (?1, ?2, 1)",
        params![cabin_id, oven_id],
    )
    .unwrap();
    oven_id
}

pub fn seed_piece(conn: &Connection, width_m: f64, height_m: f64, total_received: i64) -> i64 {
    conn.execute(
        "INSERT INTO piece (client_id, description, width_m, height_m, total_received)
         VALUES (1, 'Puerta', ?1, ?2, ?3)",
        params![width_m, height_m, total_received],
    )
    .unwrap();
    conn.last_insert_rowid()
}

pub fn seed_paint(conn: &Connection, remaining_kg: f64) -> i64 {
    conn.execute(
        "INSERT INTO paint (brand, color, paint_type, remaining_kg)
         VALUES ('Akzo', 'RAL 9010', 'Poliester', ?1)",
        params![remaining_kg],
    )
    .unwrap();
    conn.last_insert_rowid()
}

/// 标准测试产线
#[derive(Debug, Clone)]
pub struct TestLine {
    pub cabin_id: i64,
    pub gun_ids: Vec<i64>,
    pub oven_ids: Vec<i64>,
    pub piece_id: i64,
    pub paint_id: i64,
}

/// 喷房配额 100（当日 0 件），2 支喷枪 + 1 台烘炉（燃气 3.0/h），
/// 工件 2m×1m 库存 500，油漆 100kg
pub fn seed_standard_line(conn: &Connection) -> TestLine {
    let cabin_id = seed_cabin(conn, "Cabina Norte", "ACTIVE", 100, 0, None);
    let gun_ids = vec![
        seed_gun(conn, cabin_id, "Pistola A", 0.0, 100.0),
        seed_gun(conn, cabin_id, "Pistola B", 0.0, 100.0),
    ];
    let oven_ids = vec![seed_oven(conn, cabin_id, "Horno 1", 0.0, 100.0, 3.0)];
    let piece_id = seed_piece(conn, 2.0, 1.0, 500);
    let paint_id = seed_paint(conn, 100.0);

    TestLine {
        cabin_id,
        gun_ids,
        oven_ids,
        piece_id,
        paint_id,
    }
}

// ==========================================
// 直接读取（断言用）
// ==========================================

pub fn gun_hours(conn: &Connection, gun_id: i64) -> f64 {
    conn.query_row(
        "SELECT usage_hours FROM gun WHERE gun_id = ?1",
        params![gun_id],
        |row| row.get(0),
    )
    .unwrap()
}

pub fn oven_hours(conn: &Connection, oven_id: i64) -> f64 {
    conn.query_row(
        "SELECT usage_hours FROM oven WHERE oven_id = ?1",
        params![oven_id],
        |row| row.get(0),
    )
    .unwrap()
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })
    .unwrap()
}

/// 拥有全部权限的会话
pub fn operator_session() -> SessionContext {
    SessionContext::new(
        "operario",
        ["production:register", "maintenance:view", "alerts:manage"],
    )
}
