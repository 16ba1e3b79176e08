// ==========================================
// 喷涂线引擎 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 + busy_timeout）
// - 统一建表入口，避免测试/二进制各自维护一份 DDL
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
///
/// 登记事务使用 BEGIN IMMEDIATE 抢占写锁，其他写入方在此时间内排队等待。
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 时间戳存储格式（毫秒精度，字典序即时间序）
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// 日期存储格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
///
/// 所有表使用 IF NOT EXISTS，可在每次启动时调用。
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS piece (
            piece_id INTEGER PRIMARY KEY AUTOINCREMENT,
            client_id INTEGER,
            description TEXT NOT NULL DEFAULT '',
            width_m REAL NOT NULL,
            height_m REAL NOT NULL,
            total_received INTEGER NOT NULL DEFAULT 0,
            total_painted INTEGER NOT NULL DEFAULT 0,
            total_invoiced INTEGER NOT NULL DEFAULT 0,
            CHECK (total_painted <= total_received)
        );

        CREATE TABLE IF NOT EXISTS paint (
            paint_id INTEGER PRIMARY KEY AUTOINCREMENT,
            brand TEXT NOT NULL,
            color TEXT NOT NULL,
            paint_type TEXT NOT NULL,
            remaining_kg REAL NOT NULL DEFAULT 0,
            CHECK (remaining_kg >= 0)
        );

        CREATE TABLE IF NOT EXISTS cabin (
            cabin_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            max_daily_pieces INTEGER NOT NULL DEFAULT 0,
            pieces_today INTEGER NOT NULL DEFAULT 0,
            last_activity_date TEXT
        );

        CREATE TABLE IF NOT EXISTS gun (
            gun_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            usage_hours REAL NOT NULL DEFAULT 0,
            maintenance_interval_hours REAL NOT NULL,
            last_maintenance_date TEXT
        );

        CREATE TABLE IF NOT EXISTS oven (
            oven_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            usage_hours REAL NOT NULL DEFAULT 0,
            maintenance_interval_hours REAL NOT NULL,
            last_maintenance_date TEXT,
            max_temperature_c REAL NOT NULL DEFAULT 0,
            gas_per_hour REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS cabin_gun (
            cabin_id INTEGER NOT NULL REFERENCES cabin(cabin_id),
            gun_id INTEGER NOT NULL REFERENCES gun(gun_id),
            active INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (cabin_id, gun_id)
        );

        CREATE TABLE IF NOT EXISTS cabin_oven (
            cabin_id INTEGER NOT NULL REFERENCES cabin(cabin_id),
            oven_id INTEGER NOT NULL REFERENCES oven(oven_id),
            active INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (cabin_id, oven_id)
        );

        CREATE TABLE IF NOT EXISTS painted_batch (
            batch_id INTEGER PRIMARY KEY AUTOINCREMENT,
            piece_id INTEGER NOT NULL REFERENCES piece(piece_id),
            paint_id INTEGER NOT NULL REFERENCES paint(paint_id),
            cabin_id INTEGER NOT NULL REFERENCES cabin(cabin_id),
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            strategy TEXT NOT NULL,
            consumption_kg REAL NOT NULL,
            created_at TEXT NOT NULL,
            invoiced_quantity INTEGER NOT NULL DEFAULT 0,
            actor TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_batch_dedup
            ON painted_batch(piece_id, paint_id, cabin_id, quantity, created_at);

        CREATE TABLE IF NOT EXISTS usage_event (
            event_id INTEGER PRIMARY KEY AUTOINCREMENT,
            cabin_id INTEGER NOT NULL REFERENCES cabin(cabin_id),
            batch_id INTEGER REFERENCES painted_batch(batch_id),
            event_date TEXT NOT NULL,
            pieces_painted INTEGER NOT NULL,
            hours_worked REAL NOT NULL,
            gas_consumed REAL NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_usage_cabin_date ON usage_event(cabin_id, event_date);

        CREATE TABLE IF NOT EXISTS equipment_alert (
            alert_id INTEGER PRIMARY KEY AUTOINCREMENT,
            equipment_kind TEXT NOT NULL,
            equipment_id INTEGER NOT NULL,
            equipment_name TEXT NOT NULL,
            alert_kind TEXT NOT NULL,
            message TEXT NOT NULL,
            severity TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            batch_id INTEGER REFERENCES painted_batch(batch_id)
        );

        CREATE INDEX IF NOT EXISTS idx_alert_unread ON equipment_alert(is_read, created_at);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            entity TEXT,
            entity_id TEXT,
            payload_json TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_action_ts ON action_log(action_ts);
        CREATE INDEX IF NOT EXISTS idx_action_type_ts ON action_log(action_type, action_ts);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
